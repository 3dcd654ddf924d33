//! Subcommand bodies. Each one owns the session for its whole run and
//! disconnects on the way out.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use relay_core::Config;
use relay_tool_runtime::{
    Conversation, ModelEndpoint, SessionConnector, SessionLifecycle, ToolDescriptor,
};

use crate::router::build_router;
use crate::state::AppState;

/// Connect, serve the HTTP API until Ctrl-C, then disconnect.
///
/// Once connected, the session is cleaned up whether serving ends normally
/// or fails (including a port that cannot be bound).
pub async fn serve(
    config: &Config,
    connector: Arc<dyn SessionConnector>,
    model: Arc<dyn ModelEndpoint>,
    script: &Path,
) -> anyhow::Result<()> {
    let mut lifecycle = SessionLifecycle::new(connector);
    lifecycle.connect(script).await?;

    let state = Arc::new(
        AppState::new(lifecycle, model, config.resolver.cycle_limit())
            .with_config_summary(config.redacted_summary()),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let served = run_http(&addr, state.clone()).await;

    if let Some(warning) = state.lifecycle.lock().await.cleanup().await {
        warn!(warning = %warning, "Session closed with a warning");
    }
    served
}

async fn run_http(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

/// Resolve one query inside a scoped session.
pub async fn ask(
    connector: Arc<dyn SessionConnector>,
    model: Arc<dyn ModelEndpoint>,
    script: &Path,
    query: &str,
    max_cycles: Option<usize>,
) -> anyhow::Result<Conversation> {
    let mut lifecycle = SessionLifecycle::new(connector);
    lifecycle
        .scoped(script, |session| async move {
            let conversation = session
                .resolver(model)
                .with_max_cycles(max_cycles)
                .resolve(query)
                .await?;
            Ok::<_, anyhow::Error>(conversation)
        })
        .await
}

/// Connect, snapshot the catalog, disconnect.
pub async fn list_tools(
    connector: Arc<dyn SessionConnector>,
    script: &Path,
) -> anyhow::Result<Vec<ToolDescriptor>> {
    let mut lifecycle = SessionLifecycle::new(connector);
    lifecycle
        .scoped(script, |session| async move { Ok::<_, anyhow::Error>(session.catalog.descriptors()) })
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C; shutting down"),
    }
}
