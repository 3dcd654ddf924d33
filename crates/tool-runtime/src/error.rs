//! Error taxonomy for connecting and resolving.

use crate::provider::LlmError;
use crate::tool::SessionError;

/// Failures while bringing a tool session up (or using it when it's down).
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The script suffix maps to no known launcher. Raised before any
    /// transport is touched.
    #[error("Server script must be a .py or .js file: {0}")]
    InvalidServerType(String),

    /// Spawning the provider or the protocol handshake failed.
    #[error("Failed to launch tool provider: {0}")]
    Launch(#[source] SessionError),

    /// Connected, but the initial `list_tools` failed.
    #[error("Failed to fetch tool catalog: {0}")]
    CatalogFetch(#[source] SessionError),

    #[error("Not connected to MCP server")]
    NotConnected,
}

/// Failures that abort a query resolution. None are retried.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Not connected to MCP server")]
    NotConnected,

    #[error("Tool '{tool}' failed: {source}")]
    ToolInvocation {
        tool: String,
        #[source]
        source: SessionError,
    },

    #[error("Model call failed: {0}")]
    ModelCall(#[from] LlmError),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Resolution exceeded {0} model calls")]
    CycleLimitExceeded(usize),
}

/// Non-fatal: closing the session failed, resources were released anyway.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Failed to close session: {0}")]
pub struct CleanupWarning(#[source] pub SessionError);
