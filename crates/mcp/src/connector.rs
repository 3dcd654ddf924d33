//! Launching MCP servers as child processes.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use relay_tool_runtime::{LaunchSpec, SessionConnector, SessionError, ToolSession};

use crate::client::McpClient;
use crate::error::McpError;
use crate::transport::ChildTransport;

/// Spawns the launcher for a script with piped stdio and runs the MCP
/// handshake over it.
///
/// The child is spawned with `kill_on_drop`, so a session dropped without
/// `release` (or a failed handshake) never leaves the server running.
#[derive(Debug, Default, Clone)]
pub struct StdioConnector;

impl StdioConnector {
    pub fn new() -> Self {
        Self
    }

    pub async fn spawn(&self, launch: &LaunchSpec) -> Result<McpClient, McpError> {
        tracing::info!(
            program = %launch.program,
            script = %launch.script.display(),
            "Spawning MCP server process"
        );

        let mut child = Command::new(&launch.program)
            .args(&launch.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::ServerUnavailable(format!("{}: {e}", launch.program)))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            McpError::ServerUnavailable("Failed to capture server stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::ServerUnavailable("Failed to capture server stdout".to_string())
        })?;

        let client = McpClient::connect(ChildTransport::new(stdout, stdin)).await?;
        Ok(client.with_child(child))
    }
}

#[async_trait]
impl SessionConnector for StdioConnector {
    async fn connect(&self, launch: &LaunchSpec) -> Result<Arc<dyn ToolSession>, SessionError> {
        let client = self.spawn(launch).await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_tool_runtime::ServerKind;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_missing_launcher_is_transport_error() {
        let launch = LaunchSpec {
            kind: ServerKind::Python,
            program: "relay-test-no-such-launcher".to_string(),
            args: vec!["server.py".to_string()],
            script: PathBuf::from("server.py"),
        };
        let err = StdioConnector::new().connect(&launch).await.err().unwrap();
        assert!(matches!(err, SessionError::Transport(msg) if msg.contains("relay-test-no-such-launcher")));
    }
}
