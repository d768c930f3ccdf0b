//! 公开商品 API 处理器
//!
//! 面向前台的只读商品查询，不需要认证。
//! 参数名沿用前台约定（supplier / category）。

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};

use crate::{
    dto::{ApiResponse, GalleryDto, ProductDetailDto, PublicProductQueryParams},
    error::AdminError,
    state::AppState,
};

/// 公开查询的商品行
#[derive(sqlx::FromRow)]
struct PublicProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    supplier_id: i64,
    supplier_name: String,
    category_id: i64,
    category_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 图库行
#[derive(sqlx::FromRow)]
struct PublicGalleryRow {
    id: i64,
    product_id: i64,
    file_path: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PublicGalleryRow {
    fn into_dto(self, state: &AppState) -> GalleryDto {
        GalleryDto {
            id: self.id,
            product_id: self.product_id,
            product_name: None,
            file_url: state.storage.url(&self.file_path),
            file_path: self.file_path,
            sort_order: self.sort_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const PUBLIC_PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.description, p.supplier_id, p.category_id,
        p.created_at, p.updated_at,
        s.name AS supplier_name,
        c.name AS category_name
    FROM products p
    INNER JOIN suppliers s ON s.id = p.supplier_id
    INNER JOIN product_categories c ON c.id = p.category_id
"#;

/// 组装商品详情（内嵌按 sortOrder 升序的图库）
async fn assemble_detail(
    state: &AppState,
    row: PublicProductRow,
) -> Result<ProductDetailDto, AdminError> {
    let galleries: Vec<PublicGalleryRow> = sqlx::query_as(
        r#"
        SELECT id, product_id, file_path, sort_order, created_at, updated_at
        FROM product_galleries
        WHERE product_id = $1
        ORDER BY sort_order ASC, id ASC
        "#,
    )
    .bind(row.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ProductDetailDto {
        id: row.id,
        name: row.name,
        description: row.description,
        supplier_id: row.supplier_id,
        supplier_name: row.supplier_name,
        category_id: row.category_id,
        category_name: row.category_name,
        galleries: galleries.into_iter().map(|g| g.into_dto(state)).collect(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// 公开商品列表
///
/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PublicProductQueryParams>,
) -> Result<Json<ApiResponse<Vec<ProductDetailDto>>>, AdminError> {
    let sql = format!(
        r#"{}
        WHERE ($1::bigint IS NULL OR p.supplier_id = $1)
          AND ($2::bigint IS NULL OR p.category_id = $2)
        ORDER BY p.created_at DESC, p.id DESC
        "#,
        PUBLIC_PRODUCT_SELECT
    );
    let rows: Vec<PublicProductRow> = sqlx::query_as(&sql)
        .bind(params.supplier)
        .bind(params.category)
        .fetch_all(&state.pool)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(assemble_detail(&state, row).await?);
    }

    Ok(Json(ApiResponse::success(items)))
}

/// 公开商品详情
///
/// GET /api/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductDetailDto>>, AdminError> {
    let sql = format!("{} WHERE p.id = $1", PUBLIC_PRODUCT_SELECT);
    let row: PublicProductRow = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AdminError::ProductNotFound(id))?;

    let detail = assemble_detail(&state, row).await?;
    Ok(Json(ApiResponse::success(detail)))
}
