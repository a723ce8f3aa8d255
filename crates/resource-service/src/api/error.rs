//! HTTP mapping of request failures.
//!
//! | Failure | Status | Body |
//! |---------|--------|------|
//! | validation | 400 | `{"errors": [{"field", "reason"}, ...]}` |
//! | malformed body | 400 | `{"reason"}` |
//! | bad or unknown token, anonymous write | 401 | `{"reason"}` |
//! | permission | 403 | `{"reason"}` |
//! | not found | 404 | `{"reason"}` |
//! | duplicate | 409 | `{"errors": [{"field", "reason"}]}` |
//! | store unavailable | 503 | `{"reason"}` |
//! | internal | 500 | `{"reason"}` |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use resource_framework::{FieldError, Rejection};
use serde_json::json;
use tracing::error;

/// Everything a route can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("Not found.")]
    NotFound,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejected(rejection) => match rejection {
                Rejection::Validation(_) => StatusCode::BAD_REQUEST,
                Rejection::NotFound { .. } => StatusCode::NOT_FOUND,
                Rejection::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                Rejection::Permission(_) => StatusCode::FORBIDDEN,
                Rejection::Duplicate { .. } => StatusCode::CONFLICT,
                Rejection::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                Rejection::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Rejected(Rejection::Validation(errors)) => json!({ "errors": errors.errors() }),
            ApiError::Rejected(rejection @ Rejection::Duplicate { field, .. }) => {
                let error = FieldError {
                    field: field.to_string(),
                    reason: rejection.to_string(),
                };
                json!({ "errors": [error] })
            }
            ApiError::Rejected(Rejection::NotFound { .. }) | ApiError::NotFound => {
                json!({ "reason": "Not found." })
            }
            other => {
                if status.is_server_error() {
                    error!(status = status.as_u16(), error = %other, "Request failed");
                }
                json!({ "reason": other.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}
