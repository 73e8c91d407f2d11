//! Container attachment to the managed network.

use devnet_common::{DevnetError, DevnetResult};

use crate::network::NetworkManager;

impl NetworkManager {
    /// Connect a container to the managed network under the given aliases.
    ///
    /// Nothing is checked up front; an unknown container, a missing network
    /// or an endpoint that already exists is reported by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::Attach`] if the engine rejects the connection.
    pub async fn attach<I, S>(&self, container: &str, aliases: I) -> DevnetResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let network = self.name().to_string();
        self.attach_to(&network, container, aliases).await
    }

    /// Connect a container to a named network under the given aliases.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::Attach`] if the engine rejects the connection.
    pub async fn attach_to<I, S>(&self, network: &str, container: &str, aliases: I) -> DevnetResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let aliases: Vec<String> = aliases.into_iter().map(Into::into).collect();
        let engine = self.client.get()?;

        engine
            .connect_network(network, container, &aliases)
            .await
            .map_err(|source| {
                tracing::warn!(
                    network,
                    container,
                    ?aliases,
                    error = %source,
                    "Could not attach container to network"
                );
                DevnetError::Attach {
                    container: container.to_string(),
                    network: network.to_string(),
                    source,
                }
            })?;

        tracing::debug!(network, container, ?aliases, "Container attached to network");
        Ok(())
    }
}
