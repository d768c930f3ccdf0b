//! Banner 管理 API 处理器
//!
//! 实现推广 Banner 的 CRUD（multipart 图片上传）、按供应商重排序，
//! 以及面向前台的公开查询端点

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{ApiResponse, BannerDto, BannerQueryParams, ReorderBannersRequest},
    error::AdminError,
    handlers::category::ensure_ids_exist,
    handlers::gallery::{validate_image, UploadedFile},
    state::AppState,
};

/// 带供应商名称的 Banner 查询结果
#[derive(sqlx::FromRow)]
struct BannerRow {
    id: i64,
    title: String,
    description: Option<String>,
    image_path: String,
    supplier_id: i64,
    supplier_name: String,
    is_active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BannerRow {
    fn into_dto(self, state: &AppState) -> BannerDto {
        BannerDto {
            id: self.id,
            title: self.title,
            description: self.description,
            image_url: state.storage.url(&self.image_path),
            image_path: self.image_path,
            supplier_id: self.supplier_id,
            supplier_name: self.supplier_name,
            is_active: self.is_active,
            sort_order: self.sort_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const BANNER_SELECT: &str = r#"
    SELECT
        b.id, b.title, b.description, b.image_path, b.supplier_id,
        b.is_active, b.sort_order, b.created_at, b.updated_at,
        s.name AS supplier_name
    FROM banners b
    INNER JOIN suppliers s ON s.id = b.supplier_id
"#;

/// 按 ID 查询 Banner
async fn fetch_banner(pool: &PgPool, id: i64) -> Result<BannerRow, AdminError> {
    let sql = format!("{} WHERE b.id = $1", BANNER_SELECT);
    sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AdminError::BannerNotFound(id))
}

/// 校验供应商存在
async fn ensure_supplier_exists(pool: &PgPool, supplier_id: i64) -> Result<(), AdminError> {
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
        .bind(supplier_id)
        .fetch_one(pool)
        .await?;
    if !exists.0 {
        return Err(AdminError::Validation(format!(
            "供应商不存在: {}",
            supplier_id
        )));
    }
    Ok(())
}

/// (supplier_id, sort_order) 的占用检查
///
/// 只在写入时查询一次，不依赖数据库唯一约束——并发写入仍可能产生重复。
async fn ensure_sort_order_free(
    pool: &PgPool,
    supplier_id: i64,
    sort_order: i32,
    exclude_id: Option<i64>,
) -> Result<(), AdminError> {
    let taken: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM banners
            WHERE supplier_id = $1 AND sort_order = $2 AND ($3::bigint IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(supplier_id)
    .bind(sort_order)
    .bind(exclude_id)
    .fetch_one(pool)
    .await?;

    if taken.0 {
        return Err(AdminError::Validation(format!(
            "排序值 {} 已被该供应商的其他 Banner 使用，请选择不同的排序值",
            sort_order
        )));
    }
    Ok(())
}

/// multipart 表单解析结果（创建和更新共用，字段均可缺省）
#[derive(Default)]
struct BannerForm {
    title: Option<String>,
    description: Option<String>,
    image: Option<UploadedFile>,
    supplier_id: Option<i64>,
    is_active: Option<bool>,
    sort_order: Option<i32>,
}

/// 解析 Banner 的 multipart 表单
async fn parse_banner_form(mut multipart: Multipart) -> Result<BannerForm, AdminError> {
    let mut form = BannerForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AdminError::FileProcessingError(format!("读取表单失败: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AdminError::FileProcessingError(format!("读取文件失败: {}", e)))?;
                form.image = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some(other) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AdminError::FileProcessingError(format!("读取表单失败: {}", e)))?;
                match other {
                    "title" => form.title = Some(text),
                    "description" => form.description = Some(text),
                    "supplierId" => {
                        form.supplier_id = Some(text.parse().map_err(|_| {
                            AdminError::Validation("supplierId 必须是整数".to_string())
                        })?);
                    }
                    "isActive" => {
                        form.is_active = Some(parse_bool(&text).ok_or_else(|| {
                            AdminError::Validation("isActive 必须是布尔值".to_string())
                        })?);
                    }
                    "sortOrder" => {
                        form.sort_order = Some(text.parse().map_err(|_| {
                            AdminError::Validation("sortOrder 必须是整数".to_string())
                        })?);
                    }
                    _ => {}
                }
            }
            None => {}
        }
    }

    Ok(form)
}

/// 解析表单里的布尔值（"true"/"false"/"1"/"0"）
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// 获取 Banner 列表
///
/// GET /api/admin/banners（管理端）
/// GET /api/banners（公开端）
///
/// 可按供应商和启用状态过滤；按 supplier_id、sortOrder 排列
pub async fn list_banners(
    State(state): State<AppState>,
    Query(params): Query<BannerQueryParams>,
) -> Result<Json<ApiResponse<Vec<BannerDto>>>, AdminError> {
    let sql = format!(
        r#"{}
        WHERE ($1::bigint IS NULL OR b.supplier_id = $1)
          AND ($2::boolean IS NULL OR b.is_active = $2)
        ORDER BY b.supplier_id ASC, b.sort_order ASC
        "#,
        BANNER_SELECT
    );
    let rows: Vec<BannerRow> = sqlx::query_as(&sql)
        .bind(params.supplier_id)
        .bind(params.is_active)
        .fetch_all(&state.pool)
        .await?;

    let items: Vec<BannerDto> = rows.into_iter().map(|r| r.into_dto(&state)).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 获取启用中的 Banner
///
/// GET /api/banners/active
pub async fn list_active_banners(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BannerDto>>>, AdminError> {
    let sql = format!(
        "{} WHERE b.is_active = TRUE ORDER BY b.supplier_id ASC, b.sort_order ASC",
        BANNER_SELECT
    );
    let rows: Vec<BannerRow> = sqlx::query_as(&sql).fetch_all(&state.pool).await?;

    let items: Vec<BannerDto> = rows.into_iter().map(|r| r.into_dto(&state)).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 按供应商获取启用中的 Banner
///
/// GET /api/banners/supplier/:supplier_id
pub async fn list_banners_by_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<BannerDto>>>, AdminError> {
    let sql = format!(
        "{} WHERE b.supplier_id = $1 AND b.is_active = TRUE ORDER BY b.sort_order ASC",
        BANNER_SELECT
    );
    let rows: Vec<BannerRow> = sqlx::query_as(&sql)
        .bind(supplier_id)
        .fetch_all(&state.pool)
        .await?;

    let items: Vec<BannerDto> = rows.into_iter().map(|r| r.into_dto(&state)).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 获取 Banner 详情
///
/// GET /api/admin/banners/:id（管理端）
/// GET /api/banners/:id（公开端）
pub async fn get_banner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BannerDto>>, AdminError> {
    let dto = fetch_banner(&state.pool, id).await?.into_dto(&state);
    Ok(Json(ApiResponse::success(dto)))
}

/// 创建 Banner（multipart 上传）
///
/// POST /api/admin/banners
///
/// 表单字段：title（必填）、description、image（必填图片）、
/// supplierId（必填）、isActive（默认 true）、sortOrder（必填，>= 1，
/// 同一供应商内写入时校验唯一）。
/// 文件先落盘、再写库：写库失败时不回滚已写入的文件。
pub async fn create_banner(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<BannerDto>>, AdminError> {
    let form = parse_banner_form(multipart).await?;

    let title = match form.title {
        Some(t) if !t.is_empty() && t.len() <= 255 => t,
        Some(_) => {
            return Err(AdminError::Validation(
                "标题长度必须在 1-255 个字符之间".to_string(),
            ))
        }
        None => return Err(AdminError::Validation("title 字段必填".to_string())),
    };
    let image = form
        .image
        .ok_or_else(|| AdminError::Validation("image 字段必填".to_string()))?;
    let supplier_id = form
        .supplier_id
        .ok_or_else(|| AdminError::Validation("supplierId 字段必填".to_string()))?;
    let sort_order = form
        .sort_order
        .ok_or_else(|| AdminError::Validation("sortOrder 字段必填".to_string()))?;
    let is_active = form.is_active.unwrap_or(true);

    validate_image(&image)?;
    if sort_order < 1 {
        return Err(AdminError::Validation("排序值必须大于等于 1".to_string()));
    }

    ensure_supplier_exists(&state.pool, supplier_id).await?;
    ensure_sort_order_free(&state.pool, supplier_id, sort_order, None).await?;

    let image_path = state
        .storage
        .put("banners", &image.file_name, &image.bytes)
        .await?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO banners (title, description, image_path, supplier_id, is_active, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&title)
    .bind(&form.description)
    .bind(&image_path)
    .bind(supplier_id)
    .bind(is_active)
    .bind(sort_order)
    .fetch_one(&state.pool)
    .await?;

    info!(banner_id = id, supplier_id, title = %title, "Banner created");

    let dto = fetch_banner(&state.pool, id).await?.into_dto(&state);
    Ok(Json(ApiResponse::success(dto)))
}

/// 更新 Banner（multipart，所有字段可选）
///
/// PUT /api/admin/banners/:id
///
/// 上传新图片时替换旧文件（旧文件从磁盘删除）
pub async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<BannerDto>>, AdminError> {
    let current = fetch_banner(&state.pool, id).await?;
    let form = parse_banner_form(multipart).await?;

    if let Some(ref title) = form.title {
        if title.is_empty() || title.len() > 255 {
            return Err(AdminError::Validation(
                "标题长度必须在 1-255 个字符之间".to_string(),
            ));
        }
    }

    let supplier_id = form.supplier_id.unwrap_or(current.supplier_id);
    if form.supplier_id.is_some() {
        ensure_supplier_exists(&state.pool, supplier_id).await?;
    }

    if let Some(sort_order) = form.sort_order {
        if sort_order < 1 {
            return Err(AdminError::Validation("排序值必须大于等于 1".to_string()));
        }
        ensure_sort_order_free(&state.pool, supplier_id, sort_order, Some(id)).await?;
    }

    // 新图片：先删旧文件再落新文件
    let new_image_path = match form.image {
        Some(image) => {
            validate_image(&image)?;
            state.storage.delete(&current.image_path).await?;
            Some(
                state
                    .storage
                    .put("banners", &image.file_name, &image.bytes)
                    .await?,
            )
        }
        None => None,
    };

    sqlx::query(
        r#"
        UPDATE banners
        SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            image_path = COALESCE($4, image_path),
            supplier_id = COALESCE($5, supplier_id),
            is_active = COALESCE($6, is_active),
            sort_order = COALESCE($7, sort_order),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&form.title)
    .bind(&form.description)
    .bind(&new_image_path)
    .bind(form.supplier_id)
    .bind(form.is_active)
    .bind(form.sort_order)
    .execute(&state.pool)
    .await?;

    info!(banner_id = id, "Banner updated");

    let dto = fetch_banner(&state.pool, id).await?.into_dto(&state);
    Ok(Json(ApiResponse::success(dto)))
}

/// 删除 Banner
///
/// DELETE /api/admin/banners/:id
///
/// 先删除磁盘上的图片文件再删除数据行
pub async fn delete_banner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    let banner = fetch_banner(&state.pool, id).await?;

    state.storage.delete(&banner.image_path).await?;

    sqlx::query("DELETE FROM banners WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    info!(banner_id = id, "Banner deleted");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 重排序 Banner
///
/// POST /api/admin/banners/reorder
///
/// 每条 UPDATE 额外限定 supplier_id，不属于该供应商的 Banner 被静默跳过。
/// 所有 UPDATE 在同一事务中执行，中途失败整体回滚；
/// 并发重排序之间不做协调，后写者覆盖先写者。
pub async fn reorder_banners(
    State(state): State<AppState>,
    Json(req): Json<ReorderBannersRequest>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    req.validate()?;

    ensure_supplier_exists(&state.pool, req.supplier_id).await?;

    let ids: Vec<i64> = req.banners.iter().map(|e| e.id).collect();
    ensure_ids_exist(&state.pool, "banners", &ids).await?;

    let mut tx = state.pool.begin().await?;
    for entry in &req.banners {
        sqlx::query(
            r#"
            UPDATE banners
            SET sort_order = $2, updated_at = NOW()
            WHERE id = $1 AND supplier_id = $3
            "#,
        )
        .bind(entry.id)
        .bind(entry.sort_order)
        .bind(req.supplier_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(
        supplier_id = req.supplier_id,
        count = req.banners.len(),
        "Banners reordered"
    );

    Ok(Json(ApiResponse::<()>::success_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ReorderEntry;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
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

        let zero_order = ReorderBannersRequest {
            supplier_id: 2,
            banners: vec![ReorderEntry { id: 5, sort_order: 0 }],
        };
        assert!(zero_order.validate().is_err());
    }
}
