//! Query resolution between a language model and a tool session.
//!
//! - **conversation**: messages, content blocks and the append-only store
//! - **tool**: tool descriptors and the `ToolSession` capability
//! - **provider**: the `ModelEndpoint` capability and model responses
//! - **catalog**: the per-connection tool snapshot
//! - **launch** / **lifecycle**: starting, owning and tearing down a session
//! - **resolver**: the model ↔ tool loop

pub mod catalog;
pub mod conversation;
pub mod error;
pub mod launch;
pub mod lifecycle;
pub mod provider;
pub mod resolver;
pub mod tool;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use catalog::ToolCatalog;
pub use conversation::{ContentBlock, Conversation, Message, MessageContent, Role};
pub use error::{CleanupWarning, ConnectionError, ResolveError};
pub use launch::{LaunchSpec, ServerKind};
pub use lifecycle::{ConnectedSession, SessionConnector, SessionLifecycle, SessionState};
pub use provider::{LlmError, ModelEndpoint, ModelResponse, StopReason};
pub use resolver::{is_terminal, QueryResolver, ResolverState, Step};
pub use tool::{SessionError, ToolDescriptor, ToolOutput, ToolSession};
