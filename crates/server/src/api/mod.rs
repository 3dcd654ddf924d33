//! Domain-focused API endpoint modules.
//!
//! Shared error type lives here in mod.rs.

pub mod doc;
mod health;
mod query;
mod tools;

pub use health::{config, health, HealthResponse};
pub use query::{query, QueryRequest, QueryResponse};
pub use tools::tools;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use relay_tool_runtime::{ConnectionError, ResolveError};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// A status code plus a message, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        let status = match &err {
            ResolveError::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
            ResolveError::ModelCall(_) | ResolveError::EmptyResponse => StatusCode::BAD_GATEWAY,
            ResolveError::ToolInvocation { .. } | ResolveError::CycleLimitExceeded(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<ConnectionError> for ApiError {
    fn from(err: ConnectionError) -> Self {
        let status = match &err {
            ConnectionError::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
            ConnectionError::InvalidServerType(_) => StatusCode::BAD_REQUEST,
            ConnectionError::Launch(_) | ConnectionError::CatalogFetch(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}
