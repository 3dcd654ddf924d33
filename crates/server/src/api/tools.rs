use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use relay_tool_runtime::{ConnectionError, ToolDescriptor};

use crate::state::AppState;

use super::{ApiError, ErrorResponse};

/// The tool catalog fetched when the session connected.
#[utoipa::path(
    get,
    path = "/tools",
    tag = "Tools",
    responses(
        (status = 200, description = "Tool descriptors in server order"),
        (status = 503, description = "No live tool session", body = ErrorResponse)
    )
)]
pub async fn tools(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ToolDescriptor>>, ApiError> {
    let catalog = state
        .lifecycle
        .lock()
        .await
        .catalog()
        .ok_or(ConnectionError::NotConnected)?;
    Ok(Json(catalog.descriptors()))
}
