//! Managed network lifecycle.
//!
//! The managed network is an internal, attachable bridge identified by a
//! well-known name. [`NetworkManager::ensure`] creates it on first demand and
//! reuses it afterwards; [`NetworkManager::remove`] tears it down once every
//! container has left.
//!
//! `ensure` is inspect-then-create and therefore not atomic. Two concurrent
//! callers may both see the network as absent; the engine's duplicate check
//! rejects the second create, which is then answered by re-inspecting.

use std::collections::BTreeMap;

use devnet_common::{DevnetError, DevnetResult, EngineError, NetworkSettings};

use crate::client::RuntimeClient;
use crate::engine::{NetworkCreateRequest, NetworkDescriptor};

/// Creates, inspects and removes the managed network.
#[derive(Debug, Clone)]
pub struct NetworkManager {
    pub(crate) client: RuntimeClient,
    settings: NetworkSettings,
}

impl NetworkManager {
    /// Create a manager for the given network settings.
    #[must_use]
    pub const fn new(client: RuntimeClient, settings: NetworkSettings) -> Self {
        Self { client, settings }
    }

    /// Name of the managed network.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Managed network settings.
    #[must_use]
    pub const fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    /// Return the managed network, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// See [`NetworkManager::ensure`].
    pub async fn get_dev_network(&self) -> DevnetResult<NetworkDescriptor> {
        self.ensure(&self.settings.name).await
    }

    /// Return the named network, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::NetworkInspect`] if inspection fails for a
    /// reason other than absence, and [`DevnetError::NetworkCreate`] if the
    /// network is absent and cannot be created. Both are fatal.
    pub async fn ensure(&self, name: &str) -> DevnetResult<NetworkDescriptor> {
        let engine = self.client.get()?;

        match engine.inspect_network(name).await {
            Ok(network) => {
                tracing::debug!(network = name, id = %network.id, "Reusing existing network");
                return Ok(network);
            }
            Err(source) if !source.is_not_found() => {
                return Err(inspect_failed(name, source));
            }
            Err(_) => {
                tracing::warn!(network = name, "Network not found! Creating it now.");
            }
        }

        let request = self.create_request(name);
        match engine.create_network(&request).await {
            Ok(id) => {
                tracing::debug!(network = name, id = %id, "Network has been created");
            }
            Err(source) if source.is_conflict() => {
                tracing::info!(network = name, "Network was created concurrently, reusing it");
            }
            Err(source) => return Err(create_failed(name, source)),
        }

        self.inspect_present(name).await
    }

    /// Create the named network with the managed attributes and the labels
    /// from [`NetworkSettings`].
    ///
    /// # Errors
    ///
    /// See [`NetworkManager::create_with_labels`].
    pub async fn create(&self, name: &str) -> DevnetResult<NetworkDescriptor> {
        self.create_with_labels(name, self.settings.labels.clone())
            .await
    }

    /// Create the named network with the managed attributes and `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::NetworkCreate`] if the engine rejects the
    /// request, including when a network with that name already exists.
    pub async fn create_with_labels(
        &self,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> DevnetResult<NetworkDescriptor> {
        let engine = self.client.get()?;
        let request = NetworkCreateRequest::isolated_bridge(name, labels);

        let id = engine
            .create_network(&request)
            .await
            .map_err(|source| create_failed(name, source))?;
        tracing::debug!(network = name, id = %id, "Network has been created");

        self.inspect_present(name).await
    }

    /// Inspect the named network; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::NetworkInspect`] for failures other than absence.
    pub async fn inspect(&self, name: &str) -> DevnetResult<Option<NetworkDescriptor>> {
        let engine = self.client.get()?;
        match engine.inspect_network(name).await {
            Ok(network) => Ok(Some(network)),
            Err(source) if source.is_not_found() => Ok(None),
            Err(source) => Err(inspect_failed(name, source)),
        }
    }

    /// Remove the managed network.
    ///
    /// # Errors
    ///
    /// See [`NetworkManager::remove`].
    pub async fn remove_dev(&self) -> DevnetResult<()> {
        self.remove(&self.settings.name).await
    }

    /// Remove the named network.
    ///
    /// Containers must be removed or disconnected first; the engine refuses
    /// to remove a network with active endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::NetworkRemove`] if the engine refuses.
    pub async fn remove(&self, name: &str) -> DevnetResult<()> {
        let engine = self.client.get()?;

        tracing::debug!(network = name, "Removing network...");
        engine.remove_network(name).await.map_err(|source| {
            tracing::warn!(network = name, error = %source, "Network could not be removed");
            DevnetError::NetworkRemove {
                network: name.to_string(),
                source,
            }
        })?;

        tracing::debug!(network = name, "Network has been removed");
        Ok(())
    }

    fn create_request(&self, name: &str) -> NetworkCreateRequest {
        NetworkCreateRequest::isolated_bridge(name, self.settings.labels.clone())
    }

    /// Inspect a network that must exist after a successful create.
    async fn inspect_present(&self, name: &str) -> DevnetResult<NetworkDescriptor> {
        let engine = self.client.get()?;
        engine
            .inspect_network(name)
            .await
            .map_err(|source| inspect_failed(name, source))
    }
}

fn inspect_failed(name: &str, source: EngineError) -> DevnetError {
    tracing::error!(network = name, error = %source, "Cannot inspect network");
    DevnetError::NetworkInspect {
        network: name.to_string(),
        source,
    }
}

fn create_failed(name: &str, source: EngineError) -> DevnetError {
    tracing::error!(
        network = name,
        error = %source,
        "Cannot create network, which is necessary"
    );
    DevnetError::NetworkCreate {
        network: name.to_string(),
        source,
    }
}
