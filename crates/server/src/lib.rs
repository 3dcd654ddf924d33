//! HTTP and command-line surface for mcp-relay.

pub mod api;
pub mod cli;
pub mod commands;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
