//! Error types for the MCP crate.

use relay_tool_runtime::SessionError;

/// Errors that can occur while talking to an MCP server.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Failed to parse or encode JSON.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Transport I/O error.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The server answered with a JSON-RPC error object.
    #[error("Server error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A response arrived but its shape was wrong.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The transport reached end-of-stream or was closed locally.
    #[error("Connection closed")]
    Closed,

    /// The MCP server process could not be started or reached.
    #[error("Server unavailable: {0}")]
    ServerUnavailable(String),
}

impl From<McpError> for SessionError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::Rpc { code, message } => SessionError::Remote { code, message },
            McpError::Closed => SessionError::Closed,
            McpError::Transport(e) => SessionError::Transport(e.to_string()),
            McpError::ServerUnavailable(msg) => SessionError::Transport(msg),
            e @ (McpError::JsonParse(_) | McpError::InvalidResponse(_)) => {
                SessionError::Protocol(e.to_string())
            }
        }
    }
}
