//! Health and config endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether a tool session is live.
    pub connected: bool,
    /// Number of tools in the current catalog.
    pub tools: usize,
}

/// Liveness plus session status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let lifecycle = state.lifecycle.lock().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connected: lifecycle.is_connected(),
        tools: lifecycle.catalog().map(|c| c.len()).unwrap_or(0),
    })
}

/// Effective configuration with secrets removed.
#[utoipa::path(
    get,
    path = "/config",
    tag = "Health",
    responses((status = 200, description = "Redacted configuration"))
)]
pub async fn config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.config_summary.clone())
}
