//! 数据看板 API 处理器
//!
//! 提供目录规模统计卡片、供应商/分类商品分布和最近新增商品。
//! 所有数据基于目录各表聚合计算。

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};

use crate::{
    dto::{ApiResponse, DashboardDto, DashboardStats, NameCountDto, RecentProductDto},
    error::AdminError,
    state::AppState,
};

/// 图表数据行
#[derive(sqlx::FromRow)]
struct NameCountRow {
    name: String,
    count: i64,
}

/// 最近商品数据行
#[derive(sqlx::FromRow)]
struct RecentProductRow {
    id: i64,
    name: String,
    supplier_name: String,
    created_at: DateTime<Utc>,
}

/// 获取看板数据
///
/// GET /api/admin/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardDto>>, AdminError> {
    let pool = &state.pool;

    let counts: (i64, i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM products),
            (SELECT COUNT(*) FROM suppliers),
            (SELECT COUNT(*) FROM product_categories),
            (SELECT COUNT(*) FROM product_galleries),
            (SELECT COUNT(*) FROM banners)
        "#,
    )
    .fetch_one(pool)
    .await?;

    // 商品数最多的前 5 个供应商（柱状图）
    let by_supplier: Vec<NameCountRow> = sqlx::query_as(
        r#"
        SELECT s.name, COUNT(p.id) AS count
        FROM suppliers s
        LEFT JOIN products p ON p.supplier_id = s.id
        GROUP BY s.id, s.name
        ORDER BY count DESC, s.name ASC
        LIMIT 5
        "#,
    )
    .fetch_all(pool)
    .await?;

    // 商品数最多的前 5 个分类（饼图）
    let by_category: Vec<NameCountRow> = sqlx::query_as(
        r#"
        SELECT c.name, COUNT(p.id) AS count
        FROM product_categories c
        LEFT JOIN products p ON p.category_id = c.id
        GROUP BY c.id, c.name
        ORDER BY count DESC, c.name ASC
        LIMIT 5
        "#,
    )
    .fetch_all(pool)
    .await?;

    let recent: Vec<RecentProductRow> = sqlx::query_as(
        r#"
        SELECT p.id, p.name, s.name AS supplier_name, p.created_at
        FROM products p
        INNER JOIN suppliers s ON s.id = p.supplier_id
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT 5
        "#,
    )
    .fetch_all(pool)
    .await?;

    let dashboard = DashboardDto {
        stats: DashboardStats {
            products: counts.0,
            suppliers: counts.1,
            categories: counts.2,
            galleries: counts.3,
            banners: counts.4,
        },
        products_by_supplier: by_supplier
            .into_iter()
            .map(|r| NameCountDto {
                name: r.name,
                count: r.count,
            })
            .collect(),
        products_by_category: by_category
            .into_iter()
            .map(|r| NameCountDto {
                name: r.name,
                count: r.count,
            })
            .collect(),
        recent_products: recent
            .into_iter()
            .map(|r| RecentProductDto {
                id: r.id,
                name: r.name,
                supplier_name: r.supplier_name,
                created_at: r.created_at,
            })
            .collect(),
    };

    Ok(Json(ApiResponse::success(dashboard)))
}
