//! DTO 模块
//!
//! 包含所有请求和响应的数据传输对象

pub mod request;
pub mod response;

// 重新导出常用类型
pub use request::{
    BannerQueryParams, CategoryQueryParams, CreateCategoryRequest, CreateProductRequest,
    CreateSupplierRequest, GalleryQueryParams, PaginationParams, ProductQueryParams,
    PublicProductQueryParams, ReorderBannersRequest, ReorderCategoriesRequest, ReorderEntry,
    ReorderGalleriesRequest, SupplierQueryParams, UpdateCategoryRequest, UpdateGalleryRequest,
    UpdateProductRequest, UpdateSupplierRequest,
};

pub use response::{
    ApiResponse, BannerDto, CategoryDto, CreatedResponse, DashboardDto, DashboardStats,
    DeletedResponse, GalleryDto, NameCountDto, PageResponse, ProductDetailDto, ProductDto,
    RecentProductDto, SupplierDto,
};
