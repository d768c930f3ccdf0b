//! 商品分类管理 API 处理器
//!
//! 实现分类的 CRUD 操作和全局重排序

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
        ApiResponse, CategoryDto, CategoryQueryParams, CreateCategoryRequest, PageResponse,
        ReorderCategoriesRequest, UpdateCategoryRequest,
    },
    error::AdminError,
    state::AppState,
};

/// 带供应商名称和商品数量的分类查询结果
#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    supplier_id: i64,
    supplier_name: String,
    sort_order: i32,
    product_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for CategoryDto {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            sort_order: row.sort_order,
            product_count: row.product_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CATEGORY_SELECT: &str = r#"
    SELECT
        c.id, c.name, c.description, c.supplier_id, c.sort_order,
        c.created_at, c.updated_at,
        s.name AS supplier_name,
        COALESCE(p.count, 0) AS product_count
    FROM product_categories c
    INNER JOIN suppliers s ON s.id = c.supplier_id
    LEFT JOIN (
        SELECT category_id, COUNT(*) AS count FROM products GROUP BY category_id
    ) p ON p.category_id = c.id
"#;

/// 按 ID 查询分类
async fn fetch_category(pool: &PgPool, id: i64) -> Result<CategoryDto, AdminError> {
    let sql = format!("{} WHERE c.id = $1", CATEGORY_SELECT);
    let row: CategoryRow = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AdminError::CategoryNotFound(id))?;

    Ok(row.into())
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

/// 获取分类列表
///
/// GET /api/admin/categories
///
/// 按 sortOrder 升序、创建时间倒序排列，可按供应商过滤
pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoryQueryParams>,
) -> Result<Json<ApiResponse<PageResponse<CategoryDto>>>, AdminError> {
    let pool = &state.pool;
    let limit = params.page_size.clamp(1, 100);
    let offset = (params.page - 1).max(0) * params.page_size;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM product_categories WHERE ($1::bigint IS NULL OR supplier_id = $1)",
    )
    .bind(params.supplier_id)
    .fetch_one(pool)
    .await?;

    let sql = format!(
        r#"{}
        WHERE ($1::bigint IS NULL OR c.supplier_id = $1)
        ORDER BY c.sort_order ASC, c.created_at DESC, c.id DESC
        LIMIT $2 OFFSET $3
        "#,
        CATEGORY_SELECT
    );
    let rows: Vec<CategoryRow> = sqlx::query_as(&sql)
        .bind(params.supplier_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let items: Vec<CategoryDto> = rows.into_iter().map(CategoryDto::from).collect();

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total.0,
        params.page,
        params.page_size,
    ))))
}

/// 创建分类
///
/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, AdminError> {
    req.validate()?;
    ensure_supplier_exists(&state.pool, req.supplier_id).await?;

    let sort_order = req.sort_order.unwrap_or(0);

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO product_categories (name, description, supplier_id, sort_order)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.supplier_id)
    .bind(sort_order)
    .fetch_one(&state.pool)
    .await?;

    info!(category_id = id, name = %req.name, "Category created");

    let dto = fetch_category(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// 获取分类详情
///
/// GET /api/admin/categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CategoryDto>>, AdminError> {
    let dto = fetch_category(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// 更新分类
///
/// PUT /api/admin/categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, AdminError> {
    req.validate()?;

    if let Some(supplier_id) = req.supplier_id {
        ensure_supplier_exists(&state.pool, supplier_id).await?;
    }

    let result = sqlx::query(
        r#"
        UPDATE product_categories
        SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            supplier_id = COALESCE($4, supplier_id),
            sort_order = COALESCE($5, sort_order),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.supplier_id)
    .bind(req.sort_order)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::CategoryNotFound(id));
    }

    info!(category_id = id, "Category updated");

    let dto = fetch_category(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// 删除分类
///
/// DELETE /api/admin/categories/:id
///
/// 仅允许删除没有关联商品的分类
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    let product_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;

    if product_count.0 > 0 {
        return Err(AdminError::Validation(format!(
            "分类下存在 {} 个商品，无法删除",
            product_count.0
        )));
    }

    let result = sqlx::query("DELETE FROM product_categories WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::CategoryNotFound(id));
    }

    info!(category_id = id, "Category deleted");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 重排序分类
///
/// POST /api/admin/categories/reorder
///
/// 客户端提交完整的 {id, sortOrder} 列表，逐条写入。
/// 所有 UPDATE 在同一事务中执行，中途失败整体回滚；
/// 并发重排序之间不做协调，后写者覆盖先写者。
pub async fn reorder_categories(
    State(state): State<AppState>,
    Json(req): Json<ReorderCategoriesRequest>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    req.validate()?;

    let ids: Vec<i64> = req.categories.iter().map(|e| e.id).collect();
    ensure_ids_exist(&state.pool, "product_categories", &ids).await?;

    let mut tx = state.pool.begin().await?;
    for entry in &req.categories {
        sqlx::query(
            "UPDATE product_categories SET sort_order = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(entry.id)
        .bind(entry.sort_order)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(count = req.categories.len(), "Categories reordered");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 校验 ID 列表中的每一项都存在于指定表
///
/// 任何一个 ID 不存在都按验证错误处理（对应表单里的 exists 规则）。
pub(crate) async fn ensure_ids_exist(
    pool: &PgPool,
    table: &str,
    ids: &[i64],
) -> Result<(), AdminError> {
    // table 只取自代码内的常量，不拼接用户输入
    let sql = format!("SELECT COUNT(DISTINCT id) FROM {} WHERE id = ANY($1)", table);
    let found: (i64,) = sqlx::query_as(&sql).bind(ids).fetch_one(pool).await?;

    let mut distinct = ids.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    if found.0 != distinct.len() as i64 {
        return Err(AdminError::Validation(
            "列表中包含不存在的记录 ID".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ReorderEntry;

    #[test]
    fn test_create_category_request_validation() {
        let valid = CreateCategoryRequest {
            name: "饮料".to_string(),
            description: None,
            supplier_id: 1,
            sort_order: Some(1),
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateCategoryRequest {
            name: "".to_string(), // 空名称
            description: None,
            supplier_id: 1,
            sort_order: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_reorder_request_rejects_negative_order() {
        let req = ReorderCategoriesRequest {
            categories: vec![ReorderEntry { id: 1, sort_order: -2 }],
        };
        assert!(req.validate().is_err());
    }
}
