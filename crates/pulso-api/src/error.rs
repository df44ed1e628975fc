use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// The failures that cross the router boundary. Storage and gateway
/// problems never appear here; they are absorbed into empty results and
/// fallback strings further down.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    Validation(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("unknown procedure: {0}")]
    NotFound(String),
    #[error("internal error")]
    Internal,
}

impl RpcError {
    pub fn code(&self) -> &'static str {
        match self {
            RpcError::Validation(_) => "VALIDATION_ERROR",
            RpcError::Unauthorized => "UNAUTHORIZED",
            RpcError::NotFound(_) => "NOT_FOUND",
            RpcError::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Validation(_) => StatusCode::BAD_REQUEST,
            RpcError::Unauthorized => StatusCode::UNAUTHORIZED,
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
