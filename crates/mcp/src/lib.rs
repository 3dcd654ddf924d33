//! MCP (Model Context Protocol) client for mcp-relay.
//!
//! Implements the client side of MCP over JSON-RPC 2.0, so a relay can
//! drive any stdio tool server through the `ToolSession` trait.
//!
//! # Architecture
//!
//! - **types**: JSON-RPC 2.0 and MCP-specific protocol types
//! - **transport**: Pluggable transport layer (child pipes, channels)
//! - **client**: `McpClient`, a `ToolSession` over any transport
//! - **connector**: `StdioConnector`, spawns the server and hands back a session
//! - **error**: Unified error types
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use relay_mcp::StdioConnector;
//! use relay_tool_runtime::SessionLifecycle;
//!
//! # async fn example() {
//! let mut lifecycle = SessionLifecycle::new(Arc::new(StdioConnector::new()));
//! lifecycle.connect("servers/files.py").await.unwrap();
//! println!("{} tools", lifecycle.catalog().map(|c| c.len()).unwrap_or(0));
//! lifecycle.cleanup().await;
//! # }
//! ```

pub mod client;
pub mod connector;
pub mod error;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use connector::StdioConnector;
pub use error::McpError;
pub use transport::{ChannelTransport, ChildTransport, LineTransport, McpTransport};
pub use types::*;
