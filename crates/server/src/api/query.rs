//! Query resolution endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use relay_tool_runtime::Message;

use crate::state::AppState;

use super::{ApiError, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    /// The full resolved conversation, starting with the user query.
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<Message>,
}

/// Resolve a query against the connected tool session.
///
/// Resolutions are serialized; a second request waits for the first.
#[utoipa::path(
    post,
    path = "/query",
    tag = "Query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Resolved conversation", body = QueryResponse),
        (status = 400, description = "Empty query", body = ErrorResponse),
        (status = 500, description = "Tool failure or cycle limit", body = ErrorResponse),
        (status = 502, description = "Model call failed", body = ErrorResponse),
        (status = 503, description = "No live tool session", body = ErrorResponse)
    )
)]
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }

    let _turn = state.resolve_lock.lock().await;
    let resolver = state
        .lifecycle
        .lock()
        .await
        .resolver(state.model.clone())?
        .with_max_cycles(state.max_cycles);

    let conversation = resolver.resolve(&req.query).await?;
    info!(messages = conversation.len(), "Query answered");

    Ok(Json(QueryResponse {
        messages: conversation.into_messages(),
    }))
}
