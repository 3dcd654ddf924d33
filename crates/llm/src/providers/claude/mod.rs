//! Claude (Anthropic API) implementation of [`ModelEndpoint`].
//!
//! Translates between the relay's [`Message`] / [`ContentBlock`] types and
//! the Anthropic Messages API format.
//!
//! [`ModelEndpoint`]: relay_tool_runtime::ModelEndpoint
//! [`Message`]: relay_tool_runtime::Message
//! [`ContentBlock`]: relay_tool_runtime::ContentBlock

mod endpoint;
mod translate;

pub use self::endpoint::ClaudeEndpoint;
