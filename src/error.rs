use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
///
/// Every variant carries a stable numeric code and a fixed client-facing
/// message. Internal detail is only ever written to the server log.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("token missing")]
    TokenMissing,

    #[error("token invalid")]
    TokenInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("malformed token")]
    MalformedToken,

    #[error("bad token signature")]
    BadSignature,

    #[error("malformed token payload")]
    MalformedPayload,

    #[error("user not found")]
    UserNotFound,

    #[error("user disabled")]
    UserDisabled,

    #[error("user locked")]
    UserLocked,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid captcha")]
    InvalidCaptcha,

    #[error("permission denied")]
    PermissionDenied,

    #[error("role missing")]
    RoleMissing,

    #[error("tenant not found")]
    TenantNotFound,

    #[error("tenant inactive")]
    TenantInactive,

    #[error("tenant expired")]
    TenantExpired,

    #[error("forbidden tenant")]
    ForbiddenTenant,

    #[error("cyclic parent")]
    CyclicParent,

    #[error("duplicate name")]
    DuplicateName,

    #[error("duplicate path")]
    DuplicatePath,

    #[error("duplicate code")]
    DuplicateCode,

    #[error("in use: {0}")]
    InUse(String),

    #[error("built-in record is immutable")]
    BuiltInImmutable,

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("tree too deep")]
    TreeTooDeep,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl AppError {
    /// Stable error code sent to clients
    pub fn code(&self) -> i32 {
        match self {
            AppError::TokenMissing => 40101,
            AppError::TokenInvalid => 40102,
            AppError::TokenExpired => 40103,
            AppError::MalformedToken => 40104,
            AppError::BadSignature => 40105,
            AppError::MalformedPayload => 40106,
            AppError::UserNotFound => 40107,
            AppError::UserDisabled => 40108,
            AppError::UserLocked => 40109,
            AppError::InvalidCredentials => 40110,
            AppError::PermissionDenied => 40301,
            AppError::ForbiddenTenant => 40302,
            AppError::RoleMissing => 40303,
            AppError::TenantNotFound => 40001,
            AppError::TenantInactive => 40002,
            AppError::TenantExpired => 40003,
            AppError::Validation(_) => 40010,
            AppError::InvalidCaptcha => 40011,
            AppError::CyclicParent => 40020,
            AppError::DuplicateName => 40021,
            AppError::DuplicatePath => 40022,
            AppError::DuplicateCode => 40023,
            AppError::InUse(_) => 40024,
            AppError::BuiltInImmutable => 40025,
            AppError::QuotaExceeded => 40026,
            AppError::NotFound(_) => 40400,
            AppError::Internal(_) => 50001,
            AppError::Database(_) => 50002,
            AppError::TreeTooDeep => 50003,
        }
    }

    /// Client-facing message from the fixed lookup table
    pub fn message(&self) -> &'static str {
        match self {
            AppError::TokenMissing => "access token cannot be empty",
            AppError::TokenInvalid => "access token is invalid",
            AppError::TokenExpired => "access token has expired, please log in again",
            AppError::MalformedToken => "access token format is invalid",
            AppError::BadSignature => "access token signature is invalid",
            AppError::MalformedPayload => "access token payload is invalid",
            AppError::UserNotFound => "user does not exist or has been deleted",
            AppError::UserDisabled => "user account has been disabled",
            AppError::UserLocked => "user account has been locked",
            AppError::InvalidCredentials => "username or password is incorrect",
            AppError::InvalidCaptcha => "captcha is incorrect or has expired",
            AppError::PermissionDenied => "you do not have permission to access this resource",
            AppError::RoleMissing => "user has no active role assigned",
            AppError::TenantNotFound => "tenant does not exist",
            AppError::TenantInactive => "tenant is not active",
            AppError::TenantExpired => "tenant has expired",
            AppError::ForbiddenTenant => "you are not allowed to access this tenant",
            AppError::CyclicParent => "a menu cannot be placed under itself or its descendants",
            AppError::DuplicateName => "name already exists",
            AppError::DuplicatePath => "path already exists",
            AppError::DuplicateCode => "code already exists",
            AppError::InUse(_) => "record is still in use",
            AppError::BuiltInImmutable => "built-in records cannot be modified or deleted",
            AppError::QuotaExceeded => "tenant user quota has been reached",
            AppError::TreeTooDeep => "menu hierarchy is too deep or inconsistent",
            AppError::NotFound(_) => "resource not found",
            AppError::Validation(_) => "request validation failed",
            AppError::Internal(_) => "internal server error",
            AppError::Database(_) => "internal server error",
        }
    }

    /// HTTP status for the error envelope
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::TokenMissing
            | AppError::TokenInvalid
            | AppError::TokenExpired
            | AppError::MalformedToken
            | AppError::BadSignature
            | AppError::MalformedPayload
            | AppError::UserNotFound
            | AppError::UserDisabled
            | AppError::UserLocked
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied | AppError::ForbiddenTenant | AppError::RoleMissing => {
                StatusCode::FORBIDDEN
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Database(_) | AppError::TreeTooDeep => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the error belongs to authentication or authorization
    pub fn is_security(&self) -> bool {
        let status = self.status();
        status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::InUse(msg) => {
                Some(msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                None
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                None
            }
            AppError::TreeTooDeep => {
                tracing::error!("Menu tree exceeded depth limit or contains a cycle");
                None
            }
            _ => None,
        };

        let body = ErrorResponse {
            code: self.code(),
            message: self.message().to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for application
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting Option to AppError::NotFound
pub trait OptionExt<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("password hashing failed: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
