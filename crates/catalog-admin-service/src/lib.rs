//! 商品目录管理后台服务
//!
//! 提供供应商、商品分类、商品、商品图库和推广 Banner 的管理 REST API，
//! 以及面向前台的公开只读 API。
//!
//! ## 核心功能
//!
//! - **目录管理**：供应商 / 分类 / 商品的 CRUD 操作
//! - **图库管理**：商品图片上传、排序和删除
//! - **Banner 管理**：按供应商维护推广位，支持启用开关和拖拽排序
//! - **排序维护**：分类、图库、Banner 的显示顺序重排
//! - **数据看板**：目录规模统计和分布概览
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `auth`: JWT Token 与密码处理
//! - `middleware`: 认证中间件
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// 重新导出核心类型
pub use dto::{
    ApiResponse, BannerDto, CategoryDto, CreateCategoryRequest, CreateProductRequest,
    CreateSupplierRequest, GalleryDto, PageResponse, PaginationParams, ProductDto,
    ReorderBannersRequest, ReorderCategoriesRequest, ReorderEntry, ReorderGalleriesRequest,
    SupplierDto,
};
pub use error::{AdminError, Result};
