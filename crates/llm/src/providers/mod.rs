pub mod claude;

use std::sync::Arc;

use relay_core::config::LlmConfig;
use relay_tool_runtime::{LlmError, ModelEndpoint};

/// Create the model endpoint described by config.
pub fn create_endpoint(llm_config: &LlmConfig) -> Result<Arc<dyn ModelEndpoint>, LlmError> {
    let endpoint = claude::ClaudeEndpoint::from_config(llm_config)?;
    tracing::info!(model = %endpoint.model(), "Using Claude endpoint");
    Ok(Arc::new(endpoint))
}
