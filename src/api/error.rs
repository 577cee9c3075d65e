// HTTP error envelope and the mapping from core errors to status codes.
//
// Internal failures (storage, backend) are logged here and reach the caller
// only as a generic "service temporarily unavailable".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core::audit::AuditError;
use crate::core::identity::IdentityError;
use crate::core::moderation::ModerationError;
use crate::core::rate_limit::RateLimitError;

/// Error codes following the pattern E{area}{sequence}.
/// E0xxx are shared codes, E6xxx are moderation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    AlreadyReviewed,
    DispositionInProgress,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::AlreadyReviewed => "E6003",
            Self::DispositionInProgress => "E6004",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::AlreadyReviewed | Self::DispositionInProgress => StatusCode::CONFLICT,
        }
    }
}

const UNAVAILABLE: &str = "service temporarily unavailable";

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn unavailable() -> Self {
        Self::new(ErrorCode::ServiceUnavailable, UNAVAILABLE)
    }
}

impl From<ModerationError> for ApiError {
    fn from(e: ModerationError) -> Self {
        match e {
            ModerationError::Validation(msg) => Self::new(ErrorCode::ValidationError, msg),
            ModerationError::Unauthorized => Self::unauthorized("authentication required"),
            e @ ModerationError::RateLimitExceeded { .. } => {
                Self::new(ErrorCode::RateLimited, e.to_string())
            }
            e @ ModerationError::NotFound { .. } => Self::not_found(e.to_string()),
            e @ ModerationError::AlreadyReviewed(_) => {
                Self::new(ErrorCode::AlreadyReviewed, e.to_string())
            }
            e @ ModerationError::DispositionInProgress(_) => {
                Self::new(ErrorCode::DispositionInProgress, e.to_string())
            }
            ModerationError::StorageError(msg) | ModerationError::DependencyFailure(msg) => {
                tracing::error!(error = %msg, "Request failed on an internal dependency");
                Self::unavailable()
            }
        }
    }
}

impl From<AuditError> for ApiError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::Validation(msg) => Self::new(ErrorCode::ValidationError, msg),
            AuditError::StorageError(msg) => {
                tracing::error!(target: "audit", error = %msg, "Audit log read failed");
                Self::unavailable()
            }
        }
    }
}

impl From<RateLimitError> for ApiError {
    fn from(e: RateLimitError) -> Self {
        ModerationError::from(e).into()
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        tracing::debug!(error = %e, "Authentication failed");
        match e {
            IdentityError::MissingCredentials => Self::unauthorized("missing authorization header"),
            IdentityError::Expired => Self::unauthorized("token has expired"),
            IdentityError::InvalidToken(_) => Self::unauthorized("invalid token"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorResponse {
    success: bool,
    error: ApiErrorDetail,
}

#[derive(Debug, Serialize)]
struct ApiErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            success: false,
            error: ApiErrorDetail {
                code: self.code.code(),
                message: self.message,
            },
        };
        (self.code.status_code(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(e: ModerationError) -> (StatusCode, &'static str) {
        let api = ApiError::from(e);
        (api.code.status_code(), api.code.code())
    }

    #[test]
    fn test_moderation_errors_map_to_statuses() {
        assert_eq!(
            status_of(ModerationError::Validation("bad".into())),
            (StatusCode::BAD_REQUEST, "E0002")
        );
        assert_eq!(
            status_of(ModerationError::Unauthorized),
            (StatusCode::UNAUTHORIZED, "E0004")
        );
        assert_eq!(
            status_of(ModerationError::RateLimitExceeded {
                max_actions: 10,
                window_hours: 24
            }),
            (StatusCode::TOO_MANY_REQUESTS, "E0006")
        );
        assert_eq!(
            status_of(ModerationError::flag_not_found(Uuid::new_v4())),
            (StatusCode::NOT_FOUND, "E0003")
        );
        assert_eq!(
            status_of(ModerationError::AlreadyReviewed(Uuid::new_v4())),
            (StatusCode::CONFLICT, "E6003")
        );
        assert_eq!(
            status_of(ModerationError::DispositionInProgress(Uuid::new_v4())),
            (StatusCode::CONFLICT, "E6004")
        );
        assert_eq!(
            status_of(ModerationError::DependencyFailure("timeout".into())),
            (StatusCode::SERVICE_UNAVAILABLE, "E0007")
        );
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let api = ApiError::from(ModerationError::StorageError(
            "database is locked: /var/lib/moderation.db".into(),
        ));
        assert_eq!(api.message, "service temporarily unavailable");
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let response = ApiError::forbidden("moderator access required").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": { "code": "E0005", "message": "moderator access required" }
            })
        );
    }
}
