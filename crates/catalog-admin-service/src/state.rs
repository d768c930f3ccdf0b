//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use catalog_shared::storage::DiskStorage;
use sqlx::PgPool;

use crate::auth::{JwtConfig, JwtManager};

/// Axum 应用共享状态
///
/// 包含数据库连接池、文件存储和 JWT 管理器，通过 Clone 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// 上传文件的磁盘存储
    pub storage: Arc<DiskStorage>,
    /// JWT Token 管理器
    pub jwt_manager: Arc<JwtManager>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(pool: PgPool, storage: Arc<DiskStorage>, jwt_config: JwtConfig) -> Self {
        Self {
            pool,
            storage,
            jwt_manager: Arc::new(JwtManager::new(jwt_config)),
        }
    }
}
