//! MCP client implementation.
//!
//! Speaks JSON-RPC 2.0 to a tool server over an [`McpTransport`], performs
//! the initialize handshake, and exposes the server's tools through the
//! [`ToolSession`] trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;

use relay_tool_runtime::{SessionError, ToolDescriptor, ToolOutput, ToolSession};

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

/// How long `release` waits for the server to exit on its own after stdin
/// is closed before killing it.
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// An MCP client session.
///
/// Requests are serialized on the transport: the lock is held from sending
/// a request until its response has been read.
pub struct McpClient {
    transport: Mutex<Box<dyn McpTransport>>,
    next_id: AtomicI64,
    child: Mutex<Option<Child>>,
    server_info: Option<ServerInfo>,
}

impl McpClient {
    /// Wrap a transport without performing the handshake.
    pub fn new(transport: impl McpTransport + 'static) -> Self {
        Self {
            transport: Mutex::new(Box::new(transport)),
            next_id: AtomicI64::new(1),
            child: Mutex::new(None),
            server_info: None,
        }
    }

    /// Wrap a transport and run the initialize handshake.
    pub async fn connect(transport: impl McpTransport + 'static) -> Result<Self, McpError> {
        let mut client = Self::new(transport);
        client.initialize().await?;
        Ok(client)
    }

    /// Attach the server process so `release` can reap it.
    pub fn with_child(mut self, child: Child) -> Self {
        self.child = Mutex::new(Some(child));
        self
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Perform MCP initialization handshake.
    pub async fn initialize(&mut self) -> Result<&ServerInfo, McpError> {
        let params = serde_json::to_value(InitializeParams::current())?;
        let result: InitializeResult = self.request("initialize", Some(params)).await?;

        if result.protocol_version != PROTOCOL_VERSION {
            tracing::warn!(
                server = %result.protocol_version,
                client = PROTOCOL_VERSION,
                "MCP protocol version differs from ours"
            );
        }

        self.notify("notifications/initialized", None).await?;

        if let Some(instructions) = &result.instructions {
            tracing::debug!(%instructions, "MCP server instructions");
        }

        tracing::info!(
            server = %result.server_info.name,
            version = result.server_info.version.as_deref().unwrap_or("unknown"),
            protocol = %result.protocol_version,
            "MCP client initialized"
        );
        Ok(self.server_info.insert(result.server_info))
    }

    /// Fetch every tool the server offers, following pagination cursors.
    ///
    /// Stops at the first cursor the server has already handed out.
    pub async fn list_tool_infos(&self) -> Result<Vec<ToolInfo>, McpError> {
        let mut tools = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = serde_json::to_value(ListToolsParams { cursor: cursor.take() })?;
            let page: ListToolsResult = self.request("tools/list", Some(params)).await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !seen.insert(next.clone()) => {
                    tracing::warn!(cursor = %next, "tools/list cursor repeated, stopping pagination");
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        tracing::debug!(count = tools.len(), "Tool discovery complete");
        Ok(tools)
    }

    /// Call a tool on the remote MCP server.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })?;
        self.request("tools/call", Some(params)).await
    }

    /// Send a request and wait for the response carrying the same id.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, McpError> {
        let id = RpcId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = JsonRpcRequest::new(id.clone(), method, params);
        let json = serde_json::to_string(&request)?;

        let mut transport = self.transport.lock().await;
        tracing::debug!(method = %method, id = %id, "Sending request");
        transport.send(&json).await?;

        loop {
            let line = transport.receive().await?.ok_or(McpError::Closed)?;
            let response = match Incoming::parse(&line) {
                Ok(Incoming::Response(response)) => response,
                Ok(Incoming::Method { method: other, id: Some(other_id) }) => {
                    tracing::debug!(method = %other, id = %other_id, "Answering server request");
                    let reply = serde_json::to_string(&answer_server_request(&other, other_id))?;
                    transport.send(&reply).await?;
                    continue;
                }
                Ok(Incoming::Method { method: other, id: None }) => {
                    tracing::debug!(method = %other, "Skipping server notification");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(error = %e, line = %line, "Skipping unparseable line");
                    continue;
                }
            };

            if response.id != id {
                tracing::debug!(expected = %id, got = %response.id, "Skipping response for another request");
                continue;
            }

            if let Some(err) = response.error {
                return Err(McpError::Rpc {
                    code: err.code,
                    message: err.message,
                });
            }
            let result = response
                .result
                .ok_or_else(|| McpError::InvalidResponse(format!("{method}: missing result")))?;
            return Ok(serde_json::from_value(result)?);
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let notif = JsonRpcNotification::new(method, params);
        let json = serde_json::to_string(&notif)?;
        self.transport.lock().await.send(&json).await
    }
}

/// Reply to a request the server sent us. Only `ping` is supported; the
/// client advertises no other capabilities.
fn answer_server_request(method: &str, id: RpcId) -> JsonRpcResponse {
    match method {
        "ping" => JsonRpcResponse::success(id, Value::Object(Default::default())),
        other => JsonRpcResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    }
}

#[async_trait]
impl ToolSession for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError> {
        let infos = self.list_tool_infos().await?;
        Ok(infos.into_iter().map(ToolDescriptor::from).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, SessionError> {
        Ok(self.call(name, arguments).await?.into())
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.transport.lock().await.close().await?;
        Ok(())
    }

    async fn release(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "MCP server exited"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to wait for MCP server"),
            Err(_) => {
                tracing::warn!("MCP server did not exit after stdin closed, killing it");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill MCP server");
                }
            }
        }
    }
}
