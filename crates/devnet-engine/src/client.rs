//! Runtime client handle.
//!
//! [`RuntimeClient`] is the context object every lifecycle component holds.
//! It creates the engine connection on first use and hands out the same
//! connection for the rest of its lifetime. Clones share the connection.

use std::fmt;
use std::sync::Arc;

use devnet_common::{DevnetError, DevnetResult, EngineConfig, EngineError, EngineResult};
use once_cell::sync::OnceCell;

use crate::docker::DockerEngine;
use crate::engine::ContainerEngine;

type Connector = dyn Fn(&EngineConfig) -> EngineResult<Arc<dyn ContainerEngine>> + Send + Sync;

struct Inner {
    config: EngineConfig,
    engine: OnceCell<Arc<dyn ContainerEngine>>,
    connector: Option<Box<Connector>>,
}

/// Lazily-initialized, shared handle to the container engine.
#[derive(Clone)]
pub struct RuntimeClient {
    inner: Arc<Inner>,
}

impl RuntimeClient {
    /// Create a handle that connects to Docker on first use.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_connector(config, |config| {
            let engine: Arc<dyn ContainerEngine> = Arc::new(DockerEngine::connect(config)?);
            Ok(engine)
        })
    }

    /// Create a handle with a custom connection function.
    #[must_use]
    pub fn with_connector<F>(config: EngineConfig, connector: F) -> Self
    where
        F: Fn(&EngineConfig) -> EngineResult<Arc<dyn ContainerEngine>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                config,
                engine: OnceCell::new(),
                connector: Some(Box::new(connector)),
            }),
        }
    }

    /// Wrap an already connected engine.
    #[must_use]
    pub fn from_engine(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: EngineConfig::default(),
                engine: OnceCell::with_value(engine),
                connector: None,
            }),
        }
    }

    /// Engine connection settings.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Whether the connection has been created.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.engine.get().is_some()
    }

    /// Get the engine connection, creating it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::ClientInit`] if the connection cannot be
    /// created. This is fatal: nothing can run without a client.
    pub fn get(&self) -> DevnetResult<Arc<dyn ContainerEngine>> {
        let inner = &self.inner;
        inner
            .engine
            .get_or_try_init(|| {
                tracing::debug!(
                    host = %inner.config.host,
                    client_version = %inner.config.api_version,
                    "Creating engine client"
                );
                match &inner.connector {
                    Some(connect) => connect(&inner.config),
                    None => Err(EngineError::Transport {
                        message: "no engine connector configured".to_string(),
                    }),
                }
            })
            .cloned()
            .map_err(|source| {
                tracing::error!(
                    error = %source,
                    client_version = %inner.config.api_version,
                    "Cannot get engine client"
                );
                DevnetError::ClientInit {
                    version: inner.config.api_version.to_string(),
                    source,
                }
            })
    }

    /// Check that the engine answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created or the engine does not respond.
    pub async fn ping(&self) -> DevnetResult<()> {
        let engine = self.get()?;
        engine.ping().await.map_err(|source| {
            tracing::error!(error = %source, host = %self.inner.config.host, "Engine is not reachable");
            DevnetError::Unreachable { source }
        })
    }
}

impl fmt::Debug for RuntimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeClient")
            .field("config", &self.inner.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
