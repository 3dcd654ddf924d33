//! Connect/disconnect of the tool session.
//!
//! [`SessionLifecycle`] is the only owner of the live session handle. It
//! validates the provider script, asks a [`SessionConnector`] to start and
//! initialize the provider, fetches the catalog, and tears everything down
//! again in `cleanup`. A failed connect never leaves a half-built session
//! behind.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::catalog::ToolCatalog;
use crate::error::{CleanupWarning, ConnectionError};
use crate::launch::LaunchSpec;
use crate::provider::ModelEndpoint;
use crate::resolver::QueryResolver;
use crate::tool::{SessionError, ToolSession};

/// Starts a tool provider and returns an initialized session.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, launch: &LaunchSpec) -> Result<Arc<dyn ToolSession>, SessionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Closed,
}

/// A live session together with the catalog fetched for it.
#[derive(Clone)]
pub struct ConnectedSession {
    pub session: Arc<dyn ToolSession>,
    pub catalog: Arc<ToolCatalog>,
}

impl ConnectedSession {
    /// Build a resolver bound to this session and catalog.
    pub fn resolver(&self, model: Arc<dyn ModelEndpoint>) -> QueryResolver {
        QueryResolver::new(model, self.session.clone(), self.catalog.clone())
    }
}

pub struct SessionLifecycle {
    connector: Arc<dyn SessionConnector>,
    active: Option<ConnectedSession>,
    state: SessionState,
}

impl SessionLifecycle {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            connector,
            active: None,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    pub fn catalog(&self) -> Option<Arc<ToolCatalog>> {
        self.active.as_ref().map(|a| a.catalog.clone())
    }

    /// The live session and its catalog.
    pub fn session(&self) -> Result<ConnectedSession, ConnectionError> {
        self.active.clone().ok_or(ConnectionError::NotConnected)
    }

    /// Build a resolver against the live session.
    pub fn resolver(&self, model: Arc<dyn ModelEndpoint>) -> Result<QueryResolver, ConnectionError> {
        Ok(self.session()?.resolver(model))
    }

    /// Launch the provider for `script`, initialize it and fetch its catalog.
    ///
    /// Any failure is logged and returned; nothing stays reachable.
    pub async fn connect(&mut self, script: impl AsRef<Path>) -> Result<(), ConnectionError> {
        let script = script.as_ref();
        let launch = LaunchSpec::for_script(script).map_err(|e| {
            error!(error = %e, "Failed to connect to MCP server");
            e
        })?;

        if self.active.is_some() {
            debug!("Replacing existing session");
            if let Some(warning) = self.cleanup().await {
                warn!(warning = %warning, "Previous session did not close cleanly");
            }
        }

        info!(program = %launch.program, script = %script.display(), "Launching tool provider");
        let session = self.connector.connect(&launch).await.map_err(|e| {
            error!(error = %e, "Failed to connect to MCP server");
            ConnectionError::Launch(e)
        })?;

        let catalog = match ToolCatalog::fetch(session.as_ref()).await {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(error = %e, "Failed to get tools from MCP server");
                Self::shutdown(session.as_ref()).await;
                return Err(ConnectionError::CatalogFetch(e));
            }
        };

        info!(tools = catalog.len(), "Connected to MCP server successfully.");
        self.active = Some(ConnectedSession {
            session,
            catalog: Arc::new(catalog),
        });
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Re-list the tools of the live session and swap in the new snapshot.
    ///
    /// Resolvers built earlier keep the catalog they were built with.
    pub async fn refresh(&mut self) -> Result<Arc<ToolCatalog>, ConnectionError> {
        let active = self.active.as_mut().ok_or_else(|| {
            error!("Failed to get tools: not connected to MCP server");
            ConnectionError::NotConnected
        })?;

        let catalog = ToolCatalog::fetch(active.session.as_ref()).await.map_err(|e| {
            error!(error = %e, "Failed to get tools from MCP server");
            ConnectionError::CatalogFetch(e)
        })?;

        active.catalog = Arc::new(catalog);
        Ok(active.catalog.clone())
    }

    /// Close the session, then release its transport, in that order.
    ///
    /// A close failure is logged and returned as a warning; release still
    /// runs. Calling this with no live session is a no-op.
    pub async fn cleanup(&mut self) -> Option<CleanupWarning> {
        let Some(active) = self.active.take() else {
            debug!("Cleanup requested with no live session");
            return None;
        };

        let warning = Self::shutdown(active.session.as_ref()).await;
        self.state = SessionState::Closed;
        info!("Disconnected from MCP server.");
        warning
    }

    /// Connect, run `work` against the live session, and clean up on every
    /// return path.
    ///
    /// Cleanup is skipped only if the enclosing task is dropped mid-await;
    /// transports are expected to release their resources on drop for that case.
    pub async fn scoped<F, Fut, T, E>(&mut self, script: impl AsRef<Path>, work: F) -> Result<T, E>
    where
        F: FnOnce(ConnectedSession) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ConnectionError>,
    {
        self.connect(script).await?;
        let active = self.session()?;
        let result = work(active).await;
        if let Some(warning) = self.cleanup().await {
            warn!(warning = %warning, "Session closed with a warning");
        }
        result
    }

    async fn shutdown(session: &dyn ToolSession) -> Option<CleanupWarning> {
        let warning = match session.close().await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Failed to close session");
                Some(CleanupWarning(e))
            }
        };
        session.release().await;
        warning
    }
}
