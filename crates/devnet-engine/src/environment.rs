//! One-stop wiring of the lifecycle components.

use devnet_common::{DevnetConfig, DevnetResult};

use crate::client::RuntimeClient;
use crate::exec::CommandExecutor;
use crate::inspect::ContainerInspector;
use crate::network::NetworkManager;
use crate::remove::ContainerRemover;

/// The client and every lifecycle component, sharing one engine connection.
#[derive(Debug, Clone)]
pub struct DevEnvironment {
    client: RuntimeClient,
    network: NetworkManager,
    executor: CommandExecutor,
    inspector: ContainerInspector,
    remover: ContainerRemover,
}

impl DevEnvironment {
    /// Build the components for `config` on top of `client`.
    #[must_use]
    pub fn new(client: RuntimeClient, config: &DevnetConfig) -> Self {
        Self {
            network: NetworkManager::new(client.clone(), config.network.clone()),
            executor: CommandExecutor::new(client.clone()),
            inspector: ContainerInspector::new(client.clone(), config.services.owner.clone()),
            remover: ContainerRemover::new(client.clone()),
            client,
        }
    }

    /// Build the components with a Docker client for `config.engine`.
    ///
    /// The connection is created on first use.
    #[must_use]
    pub fn connect(config: &DevnetConfig) -> Self {
        Self::new(RuntimeClient::new(config.engine.clone()), config)
    }

    /// The shared client handle.
    #[must_use]
    pub const fn client(&self) -> &RuntimeClient {
        &self.client
    }

    /// Network lifecycle and attachment.
    #[must_use]
    pub const fn network(&self) -> &NetworkManager {
        &self.network
    }

    /// Command execution.
    #[must_use]
    pub const fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Label-based discovery.
    #[must_use]
    pub const fn inspector(&self) -> &ContainerInspector {
        &self.inspector
    }

    /// Container removal.
    #[must_use]
    pub const fn remover(&self) -> &ContainerRemover {
        &self.remover
    }

    /// Remove `containers`, then the managed network.
    ///
    /// Stops at the first failure, leaving the network in place if any
    /// container could not be removed.
    ///
    /// # Errors
    ///
    /// Returns the first container or network removal error.
    pub async fn teardown<S: AsRef<str>>(&self, containers: &[S]) -> DevnetResult<()> {
        tracing::info!(
            network = %self.network.name(),
            containers = containers.len(),
            "Tearing down dev environment"
        );

        for container in containers {
            self.remover.remove(container.as_ref()).await?;
        }
        self.network.remove_dev().await
    }
}
