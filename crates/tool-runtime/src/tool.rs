use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Describes a tool's interface for LLM consumption.
/// Maps to Claude's tool format and MCP's `tools/list` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name within a catalog (e.g., "list_files")
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// JSON Schema describing the expected arguments
    pub parameter_schema: Value,
}

/// What a tool session hands back from a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Raw result content, passed through to the model untouched
    pub payload: Value,
    /// Whether the provider flagged this result as a tool-level error
    pub is_error: bool,
}

impl ToolOutput {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            is_error: false,
        }
    }
}

/// Live connection to a process that executes named tools.
///
/// The resolver only talks to tools through this trait, so tests can swap in
/// deterministic fakes. Implementations must be safe to share behind an
/// `Arc`; calls arrive strictly one at a time per resolution.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Fetch the provider's tool descriptors.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError>;

    /// Run one tool with the given JSON arguments.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, SessionError>;

    /// Orderly shutdown of the protocol session.
    async fn close(&self) -> Result<(), SessionError>;

    /// Release transport resources (pipes, child processes). Runs after
    /// `close`, even when `close` failed, and must not fail.
    async fn release(&self) {}
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Remote error {code}: {message}")]
    Remote { code: i64, message: String },
    #[error("Session closed")]
    Closed,
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}
