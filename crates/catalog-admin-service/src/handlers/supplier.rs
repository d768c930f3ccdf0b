//! 供应商管理 API 处理器
//!
//! 实现供应商的 CRUD 操作，列表支持按名称模糊搜索

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, CreateSupplierRequest, PageResponse, SupplierDto, SupplierQueryParams,
        UpdateSupplierRequest,
    },
    error::AdminError,
    state::AppState,
};

/// 带商品数量的供应商查询结果
#[derive(sqlx::FromRow)]
struct SupplierRow {
    id: i64,
    name: String,
    description: Option<String>,
    product_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for SupplierDto {
    fn from(row: SupplierRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            product_count: row.product_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 按 ID 查询供应商（带商品数量）
async fn fetch_supplier(pool: &PgPool, id: i64) -> Result<SupplierDto, AdminError> {
    let row: SupplierRow = sqlx::query_as(
        r#"
        SELECT
            s.id, s.name, s.description, s.created_at, s.updated_at,
            COALESCE(p.count, 0) AS product_count
        FROM suppliers s
        LEFT JOIN (
            SELECT supplier_id, COUNT(*) AS count FROM products GROUP BY supplier_id
        ) p ON p.supplier_id = s.id
        WHERE s.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AdminError::SupplierNotFound(id))?;

    Ok(row.into())
}

/// 获取供应商列表
///
/// GET /api/admin/suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(params): Query<SupplierQueryParams>,
) -> Result<Json<ApiResponse<PageResponse<SupplierDto>>>, AdminError> {
    let pool = &state.pool;
    let limit = params.page_size.clamp(1, 100);
    let offset = (params.page - 1).max(0) * params.page_size;

    let keyword = params.keyword.as_ref().map(|k| format!("%{}%", k));

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM suppliers WHERE ($1::text IS NULL OR name ILIKE $1)",
    )
    .bind(&keyword)
    .fetch_one(pool)
    .await?;

    let rows: Vec<SupplierRow> = sqlx::query_as(
        r#"
        SELECT
            s.id, s.name, s.description, s.created_at, s.updated_at,
            COALESCE(p.count, 0) AS product_count
        FROM suppliers s
        LEFT JOIN (
            SELECT supplier_id, COUNT(*) AS count FROM products GROUP BY supplier_id
        ) p ON p.supplier_id = s.id
        WHERE ($1::text IS NULL OR s.name ILIKE $1)
        ORDER BY s.created_at DESC, s.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&keyword)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let items: Vec<SupplierDto> = rows.into_iter().map(SupplierDto::from).collect();

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total.0,
        params.page,
        params.page_size,
    ))))
}

/// 创建供应商
///
/// POST /api/admin/suppliers
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(req): Json<CreateSupplierRequest>,
) -> Result<Json<ApiResponse<SupplierDto>>, AdminError> {
    req.validate()?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO suppliers (name, description)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(&state.pool)
    .await?;

    info!(supplier_id = id, name = %req.name, "Supplier created");

    let dto = fetch_supplier(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// 获取供应商详情
///
/// GET /api/admin/suppliers/:id
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SupplierDto>>, AdminError> {
    let dto = fetch_supplier(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// 更新供应商
///
/// PUT /api/admin/suppliers/:id
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSupplierRequest>,
) -> Result<Json<ApiResponse<SupplierDto>>, AdminError> {
    req.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE suppliers
        SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::SupplierNotFound(id));
    }

    info!(supplier_id = id, "Supplier updated");

    let dto = fetch_supplier(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// 删除供应商
///
/// DELETE /api/admin/suppliers/:id
///
/// 仅允许删除没有关联分类和商品的供应商
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    let (category_count, product_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM product_categories WHERE supplier_id = $1),
            (SELECT COUNT(*) FROM products WHERE supplier_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    if category_count > 0 || product_count > 0 {
        return Err(AdminError::Validation(format!(
            "供应商下存在 {} 个分类和 {} 个商品，无法删除",
            category_count, product_count
        )));
    }

    let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::SupplierNotFound(id));
    }

    info!(supplier_id = id, "Supplier deleted");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_supplier_request_validation() {
        let valid = CreateSupplierRequest {
            name: "新鲜果蔬供应商".to_string(),
            description: Some("主营生鲜".to_string()),
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateSupplierRequest {
            name: "".to_string(),
            description: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_update_supplier_request_allows_partial() {
        let partial = UpdateSupplierRequest {
            name: None,
            description: Some("只改描述".to_string()),
        };
        assert!(partial.validate().is_ok());
    }
}
