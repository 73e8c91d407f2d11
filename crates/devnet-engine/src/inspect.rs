//! Label-based container discovery.
//!
//! Service containers are found by their `service.owner` and
//! `service.container.name` labels rather than by ID. When several containers
//! carry the same labels the first one listed by the engine wins; list order
//! is not a stable tie-break, so labels should be kept unique upstream.

use devnet_common::{DevnetError, DevnetResult, LabelSelector};

use crate::client::RuntimeClient;
use crate::engine::ContainerRecord;

/// Finds service containers by label.
#[derive(Debug, Clone)]
pub struct ContainerInspector {
    client: RuntimeClient,
    owner: String,
}

impl ContainerInspector {
    /// Create an inspector for containers owned by `owner`.
    #[must_use]
    pub fn new(client: RuntimeClient, owner: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
        }
    }

    /// Owner label value used by [`ContainerInspector::find`].
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Find a service container owned by the configured owner.
    ///
    /// # Errors
    ///
    /// See [`ContainerInspector::find_by_selector`].
    pub async fn find(&self, name: &str) -> DevnetResult<Option<ContainerRecord>> {
        self.find_by_labels(&self.owner, name).await
    }

    /// Find a container by `service.owner` and `service.container.name`.
    ///
    /// # Errors
    ///
    /// See [`ContainerInspector::find_by_selector`].
    pub async fn find_by_labels(
        &self,
        owner: &str,
        name: &str,
    ) -> DevnetResult<Option<ContainerRecord>> {
        self.find_by_selector(&LabelSelector::service(owner, name))
            .await
    }

    /// Inspect the first container, running or stopped, matching `selector`.
    ///
    /// Returns `None` when no container matches.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::ContainerList`] (fatal) if containers cannot be
    /// listed, and [`DevnetError::ContainerInspect`] if the match cannot be
    /// inspected.
    pub async fn find_by_selector(
        &self,
        selector: &LabelSelector,
    ) -> DevnetResult<Option<ContainerRecord>> {
        let engine = self.client.get()?;

        let containers = engine
            .list_containers(selector, true)
            .await
            .map_err(|source| {
                tracing::error!(error = %source, labels = %selector, "Cannot list containers");
                DevnetError::ContainerList {
                    selector: selector.to_string(),
                    source,
                }
            })?;

        // Engines that ignore unknown filters would return everything.
        let mut matching = containers
            .into_iter()
            .filter(|c| selector.matches(&c.labels));

        let Some(first) = matching.next() else {
            tracing::debug!(labels = %selector, "No container matches labels");
            return Ok(None);
        };

        let extra = matching.count();
        if extra > 0 {
            tracing::warn!(
                labels = %selector,
                matches = extra + 1,
                id = %first.id,
                "Several containers match labels, using the first one listed"
            );
        }

        let record = engine
            .inspect_container(&first.id)
            .await
            .map_err(|source| {
                tracing::warn!(id = %first.id, error = %source, "Cannot inspect container");
                DevnetError::ContainerInspect {
                    container: first.id.clone(),
                    source,
                }
            })?;

        Ok(Some(record))
    }
}
