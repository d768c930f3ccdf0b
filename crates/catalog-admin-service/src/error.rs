//! 管理后台错误类型定义
//!
//! 包含 admin service 特有的错误类型

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog_shared::error::CoreError;
use serde_json::json;

/// 管理后台错误类型
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("用户已被禁用")]
    UserDisabled,
    #[error("用户已被锁定，请稍后重试")]
    UserLocked,
    #[error("用户不存在: {0}")]
    UserNotFound(String),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 资源不存在
    #[error("供应商不存在: {0}")]
    SupplierNotFound(i64),
    #[error("分类不存在: {0}")]
    CategoryNotFound(i64),
    #[error("商品不存在: {0}")]
    ProductNotFound(i64),
    #[error("图库不存在: {0}")]
    GalleryNotFound(i64),
    #[error("Banner 不存在: {0}")]
    BannerNotFound(i64),
    #[error("资源不存在: {0}")]
    NotFound(String),

    // 业务错误
    #[error("文件处理失败: {0}")]
    FileProcessingError(String),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("存储错误: {0}")]
    Storage(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AdminError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UserDisabled | Self::UserLocked => StatusCode::FORBIDDEN,

            Self::Validation(_) => StatusCode::BAD_REQUEST,

            Self::UserNotFound(_)
            | Self::SupplierNotFound(_)
            | Self::CategoryNotFound(_)
            | Self::ProductNotFound(_)
            | Self::GalleryNotFound(_)
            | Self::BannerNotFound(_)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,

            Self::FileProcessingError(_) => StatusCode::UNPROCESSABLE_ENTITY,

            Self::Database(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::UserDisabled => "USER_DISABLED",
            Self::UserLocked => "USER_LOCKED",
            Self::UserNotFound(_) => "USER_NOT_FOUND",

            Self::Validation(_) => "VALIDATION_ERROR",

            Self::SupplierNotFound(_) => "SUPPLIER_NOT_FOUND",
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::GalleryNotFound(_) => "GALLERY_NOT_FOUND",
            Self::BannerNotFound(_) => "BANNER_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",

            Self::FileProcessingError(_) => "FILE_PROCESSING_ERROR",

            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Storage(e) => {
                tracing::error!(error = %e, "文件存储操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从共享基础设施错误转换
impl From<CoreError> for AdminError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => Self::Database(e),
            CoreError::Io(e) => Self::Storage(e.to_string()),
            CoreError::Storage(msg) => Self::Storage(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    /// 构造所有可简单构造的错误变体及其期望的 (StatusCode, error_code) 映射。
    /// 表驱动方式避免逐个变体写重复断言，新增变体时只需在一处维护。
    fn all_error_variants() -> Vec<(AdminError, StatusCode, &'static str)> {
        vec![
            // 认证 & 权限类：状态码决定前端跳转行为，必须精确
            (AdminError::Unauthorized("token expired".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AdminError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            (AdminError::UserDisabled, StatusCode::FORBIDDEN, "USER_DISABLED"),
            (AdminError::UserLocked, StatusCode::FORBIDDEN, "USER_LOCKED"),
            (AdminError::UserNotFound("admin".into()), StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            // 参数校验
            (AdminError::Validation("name is required".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            // 资源不存在类：错误码用于区分具体缺失资源
            (AdminError::SupplierNotFound(10), StatusCode::NOT_FOUND, "SUPPLIER_NOT_FOUND"),
            (AdminError::CategoryNotFound(20), StatusCode::NOT_FOUND, "CATEGORY_NOT_FOUND"),
            (AdminError::ProductNotFound(30), StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND"),
            (AdminError::GalleryNotFound(40), StatusCode::NOT_FOUND, "GALLERY_NOT_FOUND"),
            (AdminError::BannerNotFound(50), StatusCode::NOT_FOUND, "BANNER_NOT_FOUND"),
            (AdminError::NotFound("some resource".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            // 文件处理用 422：请求格式合法但内容无法处理
            (AdminError::FileProcessingError("corrupt image".into()), StatusCode::UNPROCESSABLE_ENTITY, "FILE_PROCESSING_ERROR"),
            // 系统级错误：统一 500
            (AdminError::Storage("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            (AdminError::Internal("unexpected state".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    /// 确保每个错误变体都映射到正确的 HTTP 状态码
    #[test]
    fn test_all_variants_status_code() {
        for (error, expected_status, label) in all_error_variants() {
            assert_eq!(
                error.status_code(),
                expected_status,
                "状态码不匹配: variant={label}"
            );
        }
    }

    /// 错误码是 API 契约的一部分，客户端用它做条件分支，必须逐一锁定
    #[test]
    fn test_all_variants_error_code() {
        for (error, _status, expected_code) in all_error_variants() {
            assert_eq!(
                error.error_code(),
                expected_code,
                "错误码不匹配: expected={expected_code}"
            );
        }
    }

    /// Display 输出直接作为 API 响应的 message 字段返回，
    /// 必须包含关键上下文（ID、字段名），否则用户无法定位问题。
    #[test]
    fn test_display_contains_context() {
        assert!(AdminError::Unauthorized("expired".into()).to_string().contains("expired"));
        assert!(AdminError::Validation("sortOrder 必填".into()).to_string().contains("sortOrder"));
        assert!(AdminError::SupplierNotFound(42).to_string().contains("42"));
        assert!(AdminError::CategoryNotFound(7).to_string().contains("7"));
        assert!(AdminError::ProductNotFound(99).to_string().contains("99"));
        assert!(AdminError::GalleryNotFound(11).to_string().contains("11"));
        assert!(AdminError::BannerNotFound(22).to_string().contains("22"));
        assert!(AdminError::UserNotFound("alice".into()).to_string().contains("alice"));
    }

    /// IntoResponse 是错误到 HTTP 响应的最终出口：
    /// 状态码正确、响应体四字段（success/code/message/data）齐全。
    #[tokio::test]
    async fn test_into_response_body_structure() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let label = format!("{:?}", error);
            let response = error.into_response();

            assert_eq!(response.status(), expected_status, "响应状态码不匹配: {label}");

            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value =
                serde_json::from_slice(&body_bytes).expect("响应体不是合法 JSON");

            assert_eq!(body["success"], json!(false), "success 字段应为 false: {label}");
            assert_eq!(body["code"], json!(expected_code), "code 字段不匹配: {label}");
            assert!(!body["message"].as_str().unwrap_or("").is_empty(), "message 不应为空: {label}");
            assert!(body["data"].is_null(), "data 字段应为 null: {label}");
        }
    }

    /// 系统级错误的响应消息不应泄露内部细节，防止攻击者探测系统架构
    #[tokio::test]
    async fn test_system_errors_hide_internal_details() {
        let system_errors: Vec<(AdminError, &str)> = vec![
            (AdminError::Storage("/var/data/storage write denied".into()), "/var/data"),
            (AdminError::Internal("stack overflow at module X".into()), "stack overflow"),
        ];

        for (error, leaked_detail) in system_errors {
            let response = error.into_response();
            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            let message = body["message"].as_str().unwrap();

            assert!(
                !message.contains(leaked_detail),
                "系统错误消息泄露了内部细节: message={message}, leaked={leaked_detail}"
            );
            assert!(
                message.contains("服务内部错误"),
                "系统错误应返回通用提示，实际: {message}"
            );
        }
    }

    /// 业务错误的响应消息应保留原始描述，帮助用户理解问题
    #[tokio::test]
    async fn test_business_errors_preserve_display_message() {
        let business_errors: Vec<(AdminError, &str)> = vec![
            (AdminError::Unauthorized("token expired".into()), "token expired"),
            (AdminError::BannerNotFound(42), "42"),
            (AdminError::Validation("name is required".into()), "name is required"),
        ];

        for (error, expected_fragment) in business_errors {
            let response = error.into_response();
            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            let message = body["message"].as_str().unwrap();

            assert!(
                message.contains(expected_fragment),
                "业务错误消息应包含上下文: message={message}, expected_fragment={expected_fragment}"
            );
        }
    }

    /// validator 是请求参数校验的统一入口，转换必须把字段级错误信息带入，
    /// 否则用户无法知道哪个字段校验失败。
    #[test]
    fn test_from_validation_errors() {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        let mut field_error = ValidationError::new("length");
        field_error.message = Some("名称长度不能超过 255 个字符".into());
        errors.add("name", field_error);

        let admin_error: AdminError = errors.into();
        match &admin_error {
            AdminError::Validation(msg) => {
                assert!(msg.contains("name"), "转换后应保留字段名: {msg}");
            }
            other => panic!("期望 Validation 变体，实际: {:?}", other),
        }

        assert_eq!(admin_error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(admin_error.error_code(), "VALIDATION_ERROR");
    }

    /// 共享层错误的映射决定了后台能否正确区分「存储故障」和「数据库故障」
    #[test]
    fn test_from_core_error() {
        let err: AdminError = CoreError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, AdminError::Database(_)));
        assert_eq!(err.error_code(), "DATABASE_ERROR");

        let err: AdminError = CoreError::Storage("写入失败".into()).into();
        assert!(matches!(err, AdminError::Storage(_)));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AdminError = CoreError::Io(io).into();
        assert!(matches!(err, AdminError::Storage(_)), "IO 错误应归入存储错误");

        let err: AdminError = CoreError::Internal("x".into()).into();
        assert!(matches!(err, AdminError::Internal(_)));
    }

    /// sqlx::Error 通过 #[from] 自动派生 From，验证转换后类型和状态码正确
    #[test]
    fn test_from_sqlx_error() {
        let admin_err = AdminError::from(sqlx::Error::RowNotFound);
        assert!(matches!(admin_err, AdminError::Database(_)));
        assert_eq!(admin_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(admin_err.error_code(), "DATABASE_ERROR");
    }
}
