//! 商品图库管理 API 处理器
//!
//! 实现图库的 CRUD 操作：创建走 multipart 文件上传，
//! 删除时一并清理磁盘文件

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, GalleryDto, GalleryQueryParams, PageResponse, UpdateGalleryRequest,
    },
    error::AdminError,
    state::AppState,
};

/// 单个上传文件的大小上限（2 MiB）
pub(crate) const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// 允许上传的图片类型
pub(crate) const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/svg+xml",
    "image/webp",
];

/// 解析出的上传文件
pub(crate) struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 校验上传文件是图片且未超限
pub(crate) fn validate_image(file: &UploadedFile) -> Result<(), AdminError> {
    if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
        return Err(AdminError::Validation(format!(
            "文件必须是图片（jpg、jpeg、png、gif、svg、webp），实际: {}",
            file.content_type
        )));
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AdminError::Validation("文件大小不能超过 2MB".to_string()));
    }
    Ok(())
}

/// 带商品名称的图库查询结果
#[derive(sqlx::FromRow)]
struct GalleryWithProduct {
    id: i64,
    product_id: i64,
    product_name: String,
    file_path: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GalleryWithProduct {
    fn into_dto(self, state: &AppState) -> GalleryDto {
        GalleryDto {
            id: self.id,
            product_id: self.product_id,
            product_name: Some(self.product_name),
            file_url: state.storage.url(&self.file_path),
            file_path: self.file_path,
            sort_order: self.sort_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const GALLERY_SELECT: &str = r#"
    SELECT
        g.id, g.product_id, g.file_path, g.sort_order, g.created_at, g.updated_at,
        p.name AS product_name
    FROM product_galleries g
    INNER JOIN products p ON p.id = g.product_id
"#;

/// 按 ID 查询图库
async fn fetch_gallery(pool: &PgPool, id: i64) -> Result<GalleryWithProduct, AdminError> {
    let sql = format!("{} WHERE g.id = $1", GALLERY_SELECT);
    sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AdminError::GalleryNotFound(id))
}

/// (product_id, sort_order) 的占用检查
///
/// 只在写入时查询一次，不依赖数据库唯一约束——并发写入仍可能产生重复。
async fn ensure_sort_order_free(
    pool: &PgPool,
    product_id: i64,
    sort_order: i32,
    exclude_id: Option<i64>,
) -> Result<(), AdminError> {
    let taken: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM product_galleries
            WHERE product_id = $1 AND sort_order = $2 AND ($3::bigint IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(product_id)
    .bind(sort_order)
    .bind(exclude_id)
    .fetch_one(pool)
    .await?;

    if taken.0 {
        return Err(AdminError::Validation(format!(
            "排序值 {} 已被该商品的其他图片使用，请选择不同的排序值",
            sort_order
        )));
    }
    Ok(())
}

/// 获取图库列表
///
/// GET /api/admin/product-galleries
pub async fn list_galleries(
    State(state): State<AppState>,
    Query(params): Query<GalleryQueryParams>,
) -> Result<Json<ApiResponse<PageResponse<GalleryDto>>>, AdminError> {
    let pool = &state.pool;
    let limit = params.page_size.clamp(1, 100);
    let offset = (params.page - 1).max(0) * params.page_size;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM product_galleries WHERE ($1::bigint IS NULL OR product_id = $1)",
    )
    .bind(params.product_id)
    .fetch_one(pool)
    .await?;

    let sql = format!(
        r#"{}
        WHERE ($1::bigint IS NULL OR g.product_id = $1)
        ORDER BY g.sort_order ASC, g.id ASC
        LIMIT $2 OFFSET $3
        "#,
        GALLERY_SELECT
    );
    let rows: Vec<GalleryWithProduct> = sqlx::query_as(&sql)
        .bind(params.product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let items: Vec<GalleryDto> = rows.into_iter().map(|r| r.into_dto(&state)).collect();

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total.0,
        params.page,
        params.page_size,
    ))))
}

/// 创建图库（multipart 上传）
///
/// POST /api/admin/product-galleries
///
/// 表单字段：file（必填图片）、productId（必填）、sortOrder（必填，>= 1）。
/// 文件先落盘、再写库：写库失败时不回滚已写入的文件。
pub async fn create_gallery(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<GalleryDto>>, AdminError> {
    let mut file: Option<UploadedFile> = None;
    let mut product_id: Option<i64> = None;
    let mut sort_order: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AdminError::FileProcessingError(format!("读取表单失败: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AdminError::FileProcessingError(format!("读取文件失败: {}", e)))?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("productId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AdminError::FileProcessingError(format!("读取表单失败: {}", e)))?;
                product_id = Some(text.parse().map_err(|_| {
                    AdminError::Validation("productId 必须是整数".to_string())
                })?);
            }
            Some("sortOrder") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AdminError::FileProcessingError(format!("读取表单失败: {}", e)))?;
                sort_order = Some(text.parse().map_err(|_| {
                    AdminError::Validation("sortOrder 必须是整数".to_string())
                })?);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AdminError::Validation("file 字段必填".to_string()))?;
    let product_id =
        product_id.ok_or_else(|| AdminError::Validation("productId 字段必填".to_string()))?;
    let sort_order =
        sort_order.ok_or_else(|| AdminError::Validation("sortOrder 字段必填".to_string()))?;

    validate_image(&file)?;
    if sort_order < 1 {
        return Err(AdminError::Validation("排序值必须大于等于 1".to_string()));
    }

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    if !exists.0 {
        return Err(AdminError::Validation(format!(
            "商品不存在: {}",
            product_id
        )));
    }

    ensure_sort_order_free(&state.pool, product_id, sort_order, None).await?;

    let file_path = state
        .storage
        .put("galleries", &file.file_name, &file.bytes)
        .await?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO product_galleries (file_path, product_id, sort_order)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&file_path)
    .bind(product_id)
    .bind(sort_order)
    .fetch_one(&state.pool)
    .await?;

    info!(gallery_id = id, product_id, file_path = %file_path, "Gallery created");

    let dto = fetch_gallery(&state.pool, id).await?.into_dto(&state);
    Ok(Json(ApiResponse::success(dto)))
}

/// 获取图库详情
///
/// GET /api/admin/product-galleries/:id
pub async fn get_gallery(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<GalleryDto>>, AdminError> {
    let dto = fetch_gallery(&state.pool, id).await?.into_dto(&state);
    Ok(Json(ApiResponse::success(dto)))
}

/// 更新图库
///
/// PUT /api/admin/product-galleries/:id
///
/// 文件内容不在此处更换，只调整路径、归属商品和排序
pub async fn update_gallery(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGalleryRequest>,
) -> Result<Json<ApiResponse<GalleryDto>>, AdminError> {
    req.validate()?;

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(req.product_id)
        .fetch_one(&state.pool)
        .await?;
    if !exists.0 {
        return Err(AdminError::Validation(format!(
            "商品不存在: {}",
            req.product_id
        )));
    }

    if let Some(sort_order) = req.sort_order {
        ensure_sort_order_free(&state.pool, req.product_id, sort_order, Some(id)).await?;
    }

    let result = sqlx::query(
        r#"
        UPDATE product_galleries
        SET
            file_path = $2,
            product_id = $3,
            sort_order = COALESCE($4, sort_order),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&req.file_path)
    .bind(req.product_id)
    .bind(req.sort_order)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::GalleryNotFound(id));
    }

    info!(gallery_id = id, "Gallery updated");

    let dto = fetch_gallery(&state.pool, id).await?.into_dto(&state);
    Ok(Json(ApiResponse::success(dto)))
}

/// 删除图库
///
/// DELETE /api/admin/product-galleries/:id
///
/// 先删除磁盘文件再删除数据行
pub async fn delete_gallery(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    let gallery = fetch_gallery(&state.pool, id).await?;

    state.storage.delete(&gallery.file_path).await?;

    sqlx::query("DELETE FROM product_galleries WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    info!(gallery_id = id, "Gallery deleted");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(content_type: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: "test.png".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn test_validate_image_accepts_known_types() {
        for ty in ALLOWED_IMAGE_TYPES {
            assert!(validate_image(&image(ty, 1024)).is_ok(), "应接受 {}", ty);
        }
    }

    #[test]
    fn test_validate_image_rejects_non_image() {
        let err = validate_image(&image("application/pdf", 1024)).unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }

    #[test]
    fn test_validate_image_rejects_oversize() {
        assert!(validate_image(&image("image/png", MAX_UPLOAD_BYTES)).is_ok());
        let err = validate_image(&image("image/png", MAX_UPLOAD_BYTES + 1)).unwrap_err();
        match err {
            AdminError::Validation(msg) => assert!(msg.contains("2MB")),
            other => panic!("期望 Validation，实际: {:?}", other),
        }
    }

    #[test]
    fn test_update_gallery_request_validation() {
        let valid = UpdateGalleryRequest {
            file_path: "galleries/a.png".to_string(),
            product_id: 1,
            sort_order: Some(0),
        };
        assert!(valid.validate().is_ok(), "更新时排序值允许 0");

        let invalid = UpdateGalleryRequest {
            file_path: "".to_string(),
            product_id: 1,
            sort_order: None,
        };
        assert!(invalid.validate().is_err());
    }
}
