//! 商品管理 API 处理器
//!
//! 实现商品的 CRUD 操作、过滤查询和图库重排序

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
        ApiResponse, CreateProductRequest, GalleryDto, PageResponse, ProductDetailDto, ProductDto,
        ProductQueryParams, ReorderGalleriesRequest, UpdateProductRequest,
    },
    error::AdminError,
    handlers::category::ensure_ids_exist,
    state::AppState,
};

/// 带关联名称和图库数量的商品查询结果
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    supplier_id: i64,
    supplier_name: String,
    category_id: i64,
    category_name: String,
    gallery_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductDto {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            category_id: row.category_id,
            category_name: row.category_name,
            gallery_count: row.gallery_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 图库行（商品详情内嵌使用）
#[derive(sqlx::FromRow)]
struct GalleryRow {
    id: i64,
    product_id: i64,
    file_path: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.description, p.supplier_id, p.category_id,
        p.created_at, p.updated_at,
        s.name AS supplier_name,
        c.name AS category_name,
        COALESCE(g.count, 0) AS gallery_count
    FROM products p
    INNER JOIN suppliers s ON s.id = p.supplier_id
    INNER JOIN product_categories c ON c.id = p.category_id
    LEFT JOIN (
        SELECT product_id, COUNT(*) AS count FROM product_galleries GROUP BY product_id
    ) g ON g.product_id = p.id
"#;

/// 构建商品查询的动态 WHERE 子句
///
/// 过滤条件彼此独立，按 AND 组合；全部通过参数绑定防止注入。
fn build_product_where(params: &ProductQueryParams) -> (String, Vec<ProductBind>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(supplier_id) = params.supplier_id {
        binds.push(ProductBind::Id(supplier_id));
        conditions.push(format!("p.supplier_id = ${}", binds.len()));
    }
    if let Some(category_id) = params.category_id {
        binds.push(ProductBind::Id(category_id));
        conditions.push(format!("p.category_id = ${}", binds.len()));
    }
    if let Some(ref keyword) = params.keyword {
        binds.push(ProductBind::Text(format!("%{}%", keyword)));
        conditions.push(format!("p.name ILIKE ${}", binds.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    (where_clause, binds)
}

/// 动态绑定值
enum ProductBind {
    Id(i64),
    Text(String),
}

fn bind_product_query<'q, O>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    binds: &'q [ProductBind],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for bind in binds {
        query = match bind {
            ProductBind::Id(v) => query.bind(*v),
            ProductBind::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

/// 按 ID 查询商品列表项
async fn fetch_product(pool: &PgPool, id: i64) -> Result<ProductDto, AdminError> {
    let sql = format!("{} WHERE p.id = $1", PRODUCT_SELECT);
    let row: ProductRow = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AdminError::ProductNotFound(id))?;

    Ok(row.into())
}

/// 校验商品引用的供应商和分类存在
async fn ensure_references_exist(
    pool: &PgPool,
    supplier_id: Option<i64>,
    category_id: Option<i64>,
) -> Result<(), AdminError> {
    if let Some(supplier_id) = supplier_id {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
                .bind(supplier_id)
                .fetch_one(pool)
                .await?;
        if !exists.0 {
            return Err(AdminError::Validation(format!(
                "供应商不存在: {}",
                supplier_id
            )));
        }
    }

    if let Some(category_id) = category_id {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM product_categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(pool)
                .await?;
        if !exists.0 {
            return Err(AdminError::Validation(format!(
                "分类不存在: {}",
                category_id
            )));
        }
    }

    Ok(())
}

/// 获取商品列表
///
/// GET /api/admin/products
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQueryParams>,
) -> Result<Json<ApiResponse<PageResponse<ProductDto>>>, AdminError> {
    let pool = &state.pool;
    let limit = params.page_size.clamp(1, 100);
    let offset = (params.page - 1).max(0) * params.page_size;

    let (where_clause, binds) = build_product_where(&params);

    let count_sql = format!(
        "SELECT COUNT(*) FROM products p{}",
        where_clause
    );
    let total: (i64,) = bind_product_query(sqlx::query_as(&count_sql), &binds)
        .fetch_one(pool)
        .await?;

    let next_idx = binds.len() + 1;
    let list_sql = format!(
        "{}{} ORDER BY p.created_at DESC, p.id DESC LIMIT ${} OFFSET ${}",
        PRODUCT_SELECT,
        where_clause,
        next_idx,
        next_idx + 1
    );
    let rows: Vec<ProductRow> = bind_product_query(sqlx::query_as(&list_sql), &binds)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let items: Vec<ProductDto> = rows.into_iter().map(ProductDto::from).collect();

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total.0,
        params.page,
        params.page_size,
    ))))
}

/// 创建商品
///
/// POST /api/admin/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<Json<ApiResponse<ProductDto>>, AdminError> {
    req.validate()?;
    ensure_references_exist(&state.pool, Some(req.supplier_id), Some(req.category_id)).await?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO products (name, description, supplier_id, category_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.supplier_id)
    .bind(req.category_id)
    .fetch_one(&state.pool)
    .await?;

    info!(product_id = id, name = %req.name, "Product created");

    let dto = fetch_product(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// 获取商品详情
///
/// GET /api/admin/products/:id
///
/// 内嵌图库列表，按 sortOrder 升序返回
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductDetailDto>>, AdminError> {
    let product = fetch_product(&state.pool, id).await?;

    let gallery_rows: Vec<GalleryRow> = sqlx::query_as(
        r#"
        SELECT id, product_id, file_path, sort_order, created_at, updated_at
        FROM product_galleries
        WHERE product_id = $1
        ORDER BY sort_order ASC, id ASC
        "#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let galleries: Vec<GalleryDto> = gallery_rows
        .into_iter()
        .map(|row| GalleryDto {
            id: row.id,
            product_id: row.product_id,
            product_name: None,
            file_url: state.storage.url(&row.file_path),
            file_path: row.file_path,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect();

    let detail = ProductDetailDto {
        id: product.id,
        name: product.name,
        description: product.description,
        supplier_id: product.supplier_id,
        supplier_name: product.supplier_name,
        category_id: product.category_id,
        category_name: product.category_name,
        galleries,
        created_at: product.created_at,
        updated_at: product.updated_at,
    };

    Ok(Json(ApiResponse::success(detail)))
}

/// 更新商品
///
/// PUT /api/admin/products/:id
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductDto>>, AdminError> {
    req.validate()?;
    ensure_references_exist(&state.pool, req.supplier_id, req.category_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE products
        SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            supplier_id = COALESCE($4, supplier_id),
            category_id = COALESCE($5, category_id),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.supplier_id)
    .bind(req.category_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::ProductNotFound(id));
    }

    info!(product_id = id, "Product updated");

    let dto = fetch_product(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// 删除商品
///
/// DELETE /api/admin/products/:id
///
/// 仅允许删除没有图库的商品（图库需先单独删除，附带清理文件）
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    let gallery_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM product_galleries WHERE product_id = $1")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;

    if gallery_count.0 > 0 {
        return Err(AdminError::Validation(format!(
            "商品下存在 {} 张图库图片，无法删除",
            gallery_count.0
        )));
    }

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::ProductNotFound(id));
    }

    info!(product_id = id, "Product deleted");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 重排序商品图库
///
/// POST /api/admin/products/:id/galleries/reorder
///
/// 每条 UPDATE 额外限定 product_id，不属于该商品的图库条目被静默跳过。
/// 所有 UPDATE 在同一事务中执行，中途失败整体回滚；
/// 并发重排序之间不做协调，后写者覆盖先写者。
pub async fn reorder_galleries(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(req): Json<ReorderGalleriesRequest>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    req.validate()?;

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    if !exists.0 {
        return Err(AdminError::ProductNotFound(product_id));
    }

    let ids: Vec<i64> = req.galleries.iter().map(|e| e.id).collect();
    ensure_ids_exist(&state.pool, "product_galleries", &ids).await?;

    let mut tx = state.pool.begin().await?;
    for entry in &req.galleries {
        sqlx::query(
            r#"
            UPDATE product_galleries
            SET sort_order = $2, updated_at = NOW()
            WHERE id = $1 AND product_id = $3
            "#,
        )
        .bind(entry.id)
        .bind(entry.sort_order)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(
        product_id,
        count = req.galleries.len(),
        "Product galleries reordered"
    );

    Ok(Json(ApiResponse::<()>::success_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ReorderEntry;

    #[test]
    fn test_build_product_where_no_filters() {
        let (where_clause, binds) = build_product_where(&ProductQueryParams::default());
        assert!(where_clause.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn test_build_product_where_combines_filters_with_and() {
        let params = ProductQueryParams {
            supplier_id: Some(3),
            category_id: Some(9),
            keyword: Some("奶茶".to_string()),
            page: 1,
            page_size: 10,
        };
        let (where_clause, binds) = build_product_where(&params);

        assert_eq!(binds.len(), 3);
        assert!(where_clause.contains("p.supplier_id = $1"));
        assert!(where_clause.contains("p.category_id = $2"));
        assert!(where_clause.contains("p.name ILIKE $3"));
        assert_eq!(where_clause.matches(" AND ").count(), 2);
    }

    #[test]
    fn test_build_product_where_keyword_is_wrapped() {
        let params = ProductQueryParams {
            keyword: Some("tea".to_string()),
            ..Default::default()
        };
        let (_clause, binds) = build_product_where(&params);
        match &binds[0] {
            ProductBind::Text(v) => assert_eq!(v.as_str(), "%tea%"),
            ProductBind::Id(v) => panic!("期望文本绑定，实际为 ID 绑定: {}", v),
        }
    }

    #[test]
    fn test_reorder_galleries_request_validation() {
        let valid = ReorderGalleriesRequest {
            galleries: vec![
                ReorderEntry { id: 1, sort_order: 2 },
                ReorderEntry { id: 2, sort_order: 1 },
            ],
        };
        assert!(valid.validate().is_ok());

        let empty = ReorderGalleriesRequest { galleries: vec![] };
        assert!(empty.validate().is_err());
    }
}
