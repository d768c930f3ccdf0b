//! 请求 DTO 定义
//!
//! 所有 REST API 的请求参数和请求体结构

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// 分页参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    /// 计算数据库查询的 offset
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0) * self.page_size
    }

    /// 获取限制条数（最大100）
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100)
    }
}

// ============ 供应商 ============

/// 创建供应商请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255, message = "供应商名称长度必须在 1-255 个字符之间"))]
    pub name: String,
    pub description: Option<String>,
}

/// 更新供应商请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 255, message = "供应商名称长度必须在 1-255 个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// 供应商查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierQueryParams {
    /// 按名称模糊搜索
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

// ============ 商品分类 ============

/// 创建商品分类请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255, message = "分类名称长度必须在 1-255 个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    pub supplier_id: i64,
    #[validate(range(min = 0, message = "排序值必须大于等于 0"))]
    pub sort_order: Option<i32>,
}

/// 更新商品分类请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 255, message = "分类名称长度必须在 1-255 个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub supplier_id: Option<i64>,
    #[validate(range(min = 0, message = "排序值必须大于等于 0"))]
    pub sort_order: Option<i32>,
}

/// 商品分类查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQueryParams {
    pub supplier_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

// ============ 商品 ============

/// 创建商品请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "商品名称长度必须在 1-255 个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    pub supplier_id: i64,
    pub category_id: i64,
}

/// 更新商品请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "商品名称长度必须在 1-255 个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub supplier_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// 商品查询参数（管理端）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQueryParams {
    pub supplier_id: Option<i64>,
    pub category_id: Option<i64>,
    /// 按名称模糊搜索
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

/// 商品查询参数（公开端，参数名沿用前台约定）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProductQueryParams {
    pub supplier: Option<i64>,
    pub category: Option<i64>,
}

// ============ 商品图库 ============

/// 更新图库请求
///
/// 文件内容只在创建时上传；更新只调整归属、路径和排序。
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGalleryRequest {
    #[validate(length(min = 1, max = 255, message = "文件路径长度必须在 1-255 个字符之间"))]
    pub file_path: String,
    pub product_id: i64,
    #[validate(range(min = 0, message = "排序值必须大于等于 0"))]
    pub sort_order: Option<i32>,
}

/// 图库查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryQueryParams {
    pub product_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

// ============ Banner ============

/// Banner 查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerQueryParams {
    pub supplier_id: Option<i64>,
    pub is_active: Option<bool>,
}

// ============ 重排序 ============

/// 重排序条目：目标行 ID 和新的排序值
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    pub id: i64,
    pub sort_order: i32,
}

/// 分类重排序请求（排序值允许 0）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReorderCategoriesRequest {
    #[validate(
        length(min = 1, message = "分类列表不能为空"),
        custom(function = validate_non_negative_orders)
    )]
    pub categories: Vec<ReorderEntry>,
}

/// 图库重排序请求（排序值从 1 开始）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReorderGalleriesRequest {
    #[validate(
        length(min = 1, message = "图库列表不能为空"),
        custom(function = validate_positive_orders)
    )]
    pub galleries: Vec<ReorderEntry>,
}

/// Banner 重排序请求（按供应商限定范围，排序值从 1 开始）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBannersRequest {
    pub supplier_id: i64,
    #[validate(
        length(min = 1, message = "Banner 列表不能为空"),
        custom(function = validate_positive_orders)
    )]
    pub banners: Vec<ReorderEntry>,
}

/// 排序值必须 >= 1
fn validate_positive_orders(entries: &[ReorderEntry]) -> Result<(), ValidationError> {
    if entries.iter().any(|e| e.sort_order < 1) {
        let mut err = ValidationError::new("sort_order");
        err.message = Some("排序值必须大于等于 1".into());
        return Err(err);
    }
    Ok(())
}

/// 排序值必须 >= 0
fn validate_non_negative_orders(entries: &[ReorderEntry]) -> Result<(), ValidationError> {
    if entries.iter().any(|e| e.sort_order < 0) {
        let mut err = ValidationError::new("sort_order");
        err.message = Some("排序值必须大于等于 0".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offset_and_limit() {
        let params = PaginationParams { page: 3, page_size: 10 };
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);

        // 非法页码不产生负 offset，超大 pageSize 被钳制
        let params = PaginationParams { page: 0, page_size: 1000 };
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn test_create_supplier_request_validation() {
        let valid = CreateSupplierRequest {
            name: "测试供应商".to_string(),
            description: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateSupplierRequest {
            name: "".to_string(), // 空名称
            description: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_reorder_banners_request_validation() {
        let valid = ReorderBannersRequest {
            supplier_id: 2,
            banners: vec![
                ReorderEntry { id: 5, sort_order: 2 },
                ReorderEntry { id: 7, sort_order: 1 },
            ],
        };
        assert!(valid.validate().is_ok());

        // 空列表
        let empty = ReorderBannersRequest {
            supplier_id: 2,
            banners: vec![],
        };
        assert!(empty.validate().is_err());

        // 排序值 0 对 banner 非法
        let zero = ReorderBannersRequest {
            supplier_id: 2,
            banners: vec![ReorderEntry { id: 5, sort_order: 0 }],
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_reorder_categories_allows_zero() {
        let req = ReorderCategoriesRequest {
            categories: vec![ReorderEntry { id: 1, sort_order: 0 }],
        };
        assert!(req.validate().is_ok(), "分类排序值允许 0");

        let negative = ReorderCategoriesRequest {
            categories: vec![ReorderEntry { id: 1, sort_order: -1 }],
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_reorder_galleries_requires_positive() {
        let req = ReorderGalleriesRequest {
            galleries: vec![
                ReorderEntry { id: 1, sort_order: 1 },
                ReorderEntry { id: 2, sort_order: 2 },
            ],
        };
        assert!(req.validate().is_ok());

        let zero = ReorderGalleriesRequest {
            galleries: vec![ReorderEntry { id: 1, sort_order: 0 }],
        };
        assert!(zero.validate().is_err(), "图库排序值从 1 开始");
    }
}
