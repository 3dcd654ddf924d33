pub mod providers;

pub use providers::claude::ClaudeEndpoint;
pub use providers::create_endpoint;
