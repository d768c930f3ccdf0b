//! 认证相关的 HTTP 处理器
//!
//! 提供登录、登出、获取当前用户和刷新 Token 的 API

use axum::{
    extract::{Request, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{verify_password, Claims};
use crate::dto::ApiResponse;
use crate::error::{AdminError, Result};
use crate::state::AppState;

/// 连续失败多少次后锁定账号
const MAX_FAILED_ATTEMPTS: i32 = 5;
/// 锁定时长（分钟）
const LOCK_MINUTES: i64 = 30;

/// 登录请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "用户名长度必须在 1-50 之间"))]
    pub username: String,
    #[validate(length(min = 1, max = 100, message = "密码长度必须在 1-100 之间"))]
    pub password: String,
}

/// 登录响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminUserDto,
    pub expires_at: i64,
}

/// Token 刷新响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: i64,
}

/// 管理用户 DTO
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserDto {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub status: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 数据库用户记录
#[derive(Debug, FromRow)]
struct AdminUserRow {
    id: i64,
    username: String,
    password_hash: String,
    display_name: Option<String>,
    status: String,
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// 用户登录
///
/// POST /api/admin/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;

    let user: AdminUserRow = sqlx::query_as(
        r#"
        SELECT id, username, password_hash, display_name, status,
               failed_login_attempts, locked_until, last_login_at, created_at
        FROM admin_users
        WHERE username = $1
        "#,
    )
    .bind(&req.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::InvalidCredentials)?;

    if user.status == "DISABLED" {
        return Err(AdminError::UserDisabled);
    }

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AdminError::UserLocked);
        }
    }

    let password_valid = verify_password(&req.password, &user.password_hash)?;
    if !password_valid {
        // 累计失败次数，达到上限后锁定账号一段时间
        let new_attempts = user.failed_login_attempts + 1;
        let locked_until = if new_attempts >= MAX_FAILED_ATTEMPTS {
            Some(Utc::now() + chrono::Duration::minutes(LOCK_MINUTES))
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE admin_users
            SET failed_login_attempts = $1, locked_until = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(new_attempts)
        .bind(locked_until)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

        if locked_until.is_some() {
            warn!(username = %req.username, "Account locked after repeated login failures");
        }

        return Err(AdminError::InvalidCredentials);
    }

    // 重置失败次数，更新最后登录时间
    sqlx::query(
        r#"
        UPDATE admin_users
        SET failed_login_attempts = 0, locked_until = NULL, last_login_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let (token, expires_at) =
        state
            .jwt_manager
            .generate_token(user.id, &user.username, user.display_name.as_deref())?;

    info!(user_id = user.id, username = %user.username, "User logged in");

    let response = LoginResponse {
        token,
        user: AdminUserDto {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            status: user.status,
            last_login_at: Some(Utc::now()),
            created_at: user.created_at,
        },
        expires_at,
    };

    Ok(Json(ApiResponse::success(response)))
}

/// 用户登出
///
/// POST /api/admin/auth/logout
pub async fn logout() -> Result<Json<ApiResponse<()>>> {
    // JWT 是无状态的，登出只需前端清除 Token
    Ok(Json(ApiResponse::success(())))
}

/// 获取当前用户信息
///
/// GET /api/admin/auth/me
pub async fn get_current_user(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ApiResponse<AdminUserDto>>> {
    // 从请求扩展中获取 Claims（由认证中间件注入）
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AdminError::Unauthorized("未认证".to_string()))?;

    let user_id = claims.user_id()?;

    let user: AdminUserRow = sqlx::query_as(
        r#"
        SELECT id, username, password_hash, display_name, status,
               failed_login_attempts, locked_until, last_login_at, created_at
        FROM admin_users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AdminError::UserNotFound(user_id.to_string()))?;

    Ok(Json(ApiResponse::success(AdminUserDto {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        status: user.status,
        last_login_at: user.last_login_at,
        created_at: user.created_at,
    })))
}

/// 刷新 Token
///
/// POST /api/admin/auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ApiResponse<RefreshResponse>>> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AdminError::Unauthorized("未认证".to_string()))?;

    let (token, expires_at) = state.jwt_manager.refresh_token(claims)?;

    Ok(Json(ApiResponse::success(RefreshResponse {
        token,
        expires_at,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let valid = LoginRequest {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty_username = LoginRequest {
            username: "".to_string(),
            password: "admin123".to_string(),
        };
        assert!(empty_username.validate().is_err());

        let empty_password = LoginRequest {
            username: "admin".to_string(),
            password: "".to_string(),
        };
        assert!(empty_password.validate().is_err());
    }
}
