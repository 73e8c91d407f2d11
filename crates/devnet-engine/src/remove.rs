//! Container removal.

use devnet_common::{DevnetError, DevnetResult};

use crate::client::RuntimeClient;

/// Force-removes containers together with their volumes.
#[derive(Debug, Clone)]
pub struct ContainerRemover {
    client: RuntimeClient,
}

impl ContainerRemover {
    /// Create a remover.
    #[must_use]
    pub const fn new(client: RuntimeClient) -> Self {
        Self { client }
    }

    /// Remove a container by name, even if it is running.
    ///
    /// Removing a container that no longer exists is an error; callers that
    /// want idempotent cleanup should check [`DevnetError::engine_error`].
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::ContainerRemove`] if the engine refuses.
    pub async fn remove(&self, container: &str) -> DevnetResult<()> {
        let engine = self.client.get()?;

        if let Err(source) = engine.remove_container(container, true, true).await {
            tracing::warn!(error = %source, service = container, "Service could not be removed");
            return Err(DevnetError::ContainerRemove {
                container: container.to_string(),
                source,
            });
        }

        tracing::info!(service = container, "Service has been removed");
        Ok(())
    }
}
