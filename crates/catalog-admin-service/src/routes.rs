//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, state::AppState};

/// 构建认证相关的路由
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::get_current_user))
        .route("/auth/refresh", post(handlers::auth::refresh_token))
}

/// 构建供应商管理路由
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/suppliers", get(handlers::supplier::list_suppliers))
        .route("/suppliers", post(handlers::supplier::create_supplier))
        .route("/suppliers/{id}", get(handlers::supplier::get_supplier))
        .route("/suppliers/{id}", put(handlers::supplier::update_supplier))
        .route(
            "/suppliers/{id}",
            delete(handlers::supplier::delete_supplier),
        )
}

/// 构建商品分类管理路由
///
/// 包含分类 CRUD 和全局重排序
fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(handlers::category::list_categories))
        .route("/categories", post(handlers::category::create_category))
        .route(
            "/categories/reorder",
            post(handlers::category::reorder_categories),
        )
        .route("/categories/{id}", get(handlers::category::get_category))
        .route("/categories/{id}", put(handlers::category::update_category))
        .route(
            "/categories/{id}",
            delete(handlers::category::delete_category),
        )
}

/// 构建商品管理路由
///
/// 包含商品 CRUD 和商品图库重排序
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(handlers::product::list_products))
        .route("/products", post(handlers::product::create_product))
        .route("/products/{id}", get(handlers::product::get_product))
        .route("/products/{id}", put(handlers::product::update_product))
        .route("/products/{id}", delete(handlers::product::delete_product))
        .route(
            "/products/{id}/galleries/reorder",
            post(handlers::product::reorder_galleries),
        )
}

/// 构建商品图库管理路由
fn gallery_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/product-galleries",
            get(handlers::gallery::list_galleries),
        )
        .route(
            "/product-galleries",
            post(handlers::gallery::create_gallery),
        )
        .route(
            "/product-galleries/{id}",
            get(handlers::gallery::get_gallery),
        )
        .route(
            "/product-galleries/{id}",
            put(handlers::gallery::update_gallery),
        )
        .route(
            "/product-galleries/{id}",
            delete(handlers::gallery::delete_gallery),
        )
}

/// 构建 Banner 管理路由
///
/// 包含 Banner CRUD 和按供应商重排序
fn banner_routes() -> Router<AppState> {
    Router::new()
        .route("/banners", get(handlers::banner::list_banners))
        .route("/banners", post(handlers::banner::create_banner))
        .route("/banners/reorder", post(handlers::banner::reorder_banners))
        .route("/banners/{id}", get(handlers::banner::get_banner))
        .route("/banners/{id}", put(handlers::banner::update_banner))
        .route("/banners/{id}", delete(handlers::banner::delete_banner))
}

/// 构建数据看板路由
fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(handlers::dashboard::get_dashboard))
}

/// 构建完整的管理 API 路由
///
/// 返回所有管理后台 API 路由（不含前缀，由调用方在 main.rs 中挂载）
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(supplier_routes())
        .merge(category_routes())
        .merge(product_routes())
        .merge(gallery_routes())
        .merge(banner_routes())
        .merge(dashboard_routes())
}

/// 构建公开 API 路由（无需认证）
///
/// 面向前台的商品和 Banner 只读查询
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(handlers::public_product::list_products))
        .route(
            "/products/{id}",
            get(handlers::public_product::get_product),
        )
        .route("/banners", get(handlers::banner::list_banners))
        .route("/banners/active", get(handlers::banner::list_active_banners))
        .route(
            "/banners/supplier/{supplier_id}",
            get(handlers::banner::list_banners_by_supplier),
        )
        .route("/banners/{id}", get(handlers::banner::get_banner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_construction() {
        let _auth = auth_routes();
        let _supplier = supplier_routes();
        let _category = category_routes();
        let _product = product_routes();
        let _gallery = gallery_routes();
        let _banner = banner_routes();
        let _dashboard = dashboard_routes();
        let _api = api_routes();
        let _public = public_routes();
    }
}
