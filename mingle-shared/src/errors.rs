use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::clients::store::StoreError;
use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth token errors
/// - E2xxx: Social errors (profiles, posts, threads, follows, notifications)
/// - E3xxx: Feed errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,
    UpstreamError,
    Conflict,

    // Auth (E1xxx)
    TokenExpired,
    TokenInvalid,

    // Social (E2xxx)
    ProfileNotFound,
    PostNotFound,
    CommentNotFound,
    ReplyNotFound,
    NotAuthor,
    CannotFollowSelf,
    MediaUploadFailed,
    EmptyText,
    NotificationNotFound,
    FollowPartiallyApplied,
    UnsupportedMedia,

    // Feed (E3xxx)
    InvalidFilter,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",
            Self::UpstreamError => "E0010",
            Self::Conflict => "E0011",

            // Auth
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",

            // Social
            Self::ProfileNotFound => "E2001",
            Self::PostNotFound => "E2002",
            Self::CommentNotFound => "E2003",
            Self::ReplyNotFound => "E2004",
            Self::NotAuthor => "E2005",
            Self::CannotFollowSelf => "E2006",
            Self::MediaUploadFailed => "E2007",
            Self::EmptyText => "E2008",
            Self::NotificationNotFound => "E2009",
            Self::FollowPartiallyApplied => "E2010",
            Self::UnsupportedMedia => "E2011",

            // Feed
            Self::InvalidFilter => "E3001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamError | Self::FollowPartiallyApplied => StatusCode::BAD_GATEWAY,
            Self::ValidationError | Self::BadRequest | Self::EmptyText
            | Self::InvalidFilter | Self::MediaUploadFailed | Self::UnsupportedMedia => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::PostNotFound
            | Self::CommentNotFound | Self::ReplyNotFound | Self::NotificationNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotAuthor | Self::CannotFollowSelf => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code this error reports to clients.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Store(StoreError::NotFound { .. }) => ErrorCode::NotFound,
            AppError::Store(StoreError::AlreadyExists { .. }) => ErrorCode::Conflict,
            AppError::Store(_) => ErrorCode::UpstreamError,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "document store error");
                match err {
                    StoreError::NotFound { .. } => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    StoreError::AlreadyExists { .. } => (
                        StatusCode::CONFLICT,
                        ApiErrorResponse::new("E0011", "resource already exists"),
                    ),
                    _ => (
                        StatusCode::BAD_GATEWAY,
                        ApiErrorResponse::new("E0010", "document store unavailable"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
