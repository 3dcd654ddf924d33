use std::sync::Arc;

use tokio::sync::Mutex;

use relay_tool_runtime::{ModelEndpoint, SessionLifecycle};

/// Shared state behind every handler.
pub struct AppState {
    /// The one tool session this process owns.
    pub lifecycle: Mutex<SessionLifecycle>,
    pub model: Arc<dyn ModelEndpoint>,
    /// Cap on model calls per resolution; `None` is unbounded.
    pub max_cycles: Option<usize>,
    /// Held for the whole of a resolution so a session never sees two at once.
    pub resolve_lock: Mutex<()>,
    /// Redacted config, served at `/config`.
    pub config_summary: serde_json::Value,
}

impl AppState {
    pub fn new(
        lifecycle: SessionLifecycle,
        model: Arc<dyn ModelEndpoint>,
        max_cycles: Option<usize>,
    ) -> Self {
        Self {
            lifecycle: Mutex::new(lifecycle),
            model,
            max_cycles,
            resolve_lock: Mutex::new(()),
            config_summary: serde_json::Value::Null,
        }
    }

    pub fn with_config_summary(mut self, summary: serde_json::Value) -> Self {
        self.config_summary = summary;
        self
    }
}
