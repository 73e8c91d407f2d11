//! The container engine seam.
//!
//! [`ContainerEngine`] is the narrow set of engine calls the lifecycle
//! components need. The production implementation is
//! [`DockerEngine`](crate::docker::DockerEngine); tests substitute an
//! in-memory double. Each call maps to exactly one engine request, so any
//! atomicity comes from the engine itself.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use devnet_common::{EngineResult, LabelSelector};
use serde::{Deserialize, Serialize};

/// Network driver for every managed network.
pub const BRIDGE_DRIVER: &str = "bridge";

/// A network as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// Engine-assigned network ID.
    pub id: String,
    /// Network name.
    pub name: String,
    /// Network driver.
    pub driver: String,
    /// Whether the network is isolated from external routing.
    pub internal: bool,
    /// Whether containers can join after creation.
    pub attachable: bool,
    /// Whether IPv6 is enabled.
    pub enable_ipv6: bool,
    /// Network labels.
    pub labels: BTreeMap<String, String>,
    /// IDs of containers currently attached.
    pub containers: Vec<String>,
}

/// Parameters for a network create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCreateRequest {
    /// Network name.
    pub name: String,
    /// Network driver.
    pub driver: String,
    /// Reject the request if a network with this name exists.
    pub check_duplicate: bool,
    /// Isolate the network from external routing.
    pub internal: bool,
    /// Enable IPv6.
    pub enable_ipv6: bool,
    /// Allow containers to join after creation.
    pub attachable: bool,
    /// Network labels.
    pub labels: BTreeMap<String, String>,
}

impl NetworkCreateRequest {
    /// An internal, attachable, IPv4-only bridge network with duplicate checking.
    #[must_use]
    pub fn isolated_bridge(name: &str, labels: BTreeMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            driver: BRIDGE_DRIVER.to_string(),
            check_duplicate: true,
            internal: true,
            enable_ipv6: false,
            attachable: true,
            labels,
        }
    }
}

/// A container as returned by a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Container ID.
    pub id: String,
    /// Container names.
    pub names: Vec<String>,
    /// Container labels.
    pub labels: HashMap<String, String>,
}

/// Container state from an inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    /// Engine status string (`running`, `exited`, ...).
    pub status: String,
    /// Whether the container is running.
    pub running: bool,
    /// Exit code of the last run, if any.
    pub exit_code: Option<i64>,
}

/// One network attachment of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    /// Network ID.
    pub network_id: String,
    /// DNS aliases on that network.
    pub aliases: Vec<String>,
    /// IPv4 address on that network.
    pub ip_address: Option<String>,
}

/// Full inspection record of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Container ID.
    pub id: String,
    /// Container name, without the leading slash.
    pub name: String,
    /// Image the container was created from.
    pub image: String,
    /// Container labels.
    pub labels: HashMap<String, String>,
    /// Runtime state.
    pub state: ContainerState,
    /// Attachments keyed by network name.
    pub networks: BTreeMap<String, EndpointRecord>,
}

/// Exec create parameters. Streams are never attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecSpec {
    /// User to run as.
    pub user: String,
    /// Argument vector.
    pub cmd: Vec<String>,
    /// Allocate a TTY.
    pub tty: bool,
    /// Whether the start phase will detach.
    pub detach: bool,
}

/// Progress of an exec instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecStatus {
    /// Whether the command is still running.
    pub running: bool,
    /// Exit code, once the command has finished.
    pub exit_code: Option<i64>,
}

/// Engine operations used by the lifecycle components.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check that the engine answers.
    async fn ping(&self) -> EngineResult<()>;

    /// Inspect a network by name, including attached containers.
    async fn inspect_network(&self, name: &str) -> EngineResult<NetworkDescriptor>;

    /// Create a network, returning its ID.
    async fn create_network(&self, request: &NetworkCreateRequest) -> EngineResult<String>;

    /// Remove a network by name.
    async fn remove_network(&self, name: &str) -> EngineResult<()>;

    /// Connect a container to a network under the given aliases.
    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        aliases: &[String],
    ) -> EngineResult<()>;

    /// List containers matching a selector; `all` includes stopped ones.
    async fn list_containers(
        &self,
        selector: &LabelSelector,
        all: bool,
    ) -> EngineResult<Vec<ContainerSummary>>;

    /// Inspect a container by name or ID.
    async fn inspect_container(&self, container: &str) -> EngineResult<ContainerRecord>;

    /// Remove a container.
    async fn remove_container(
        &self,
        container: &str,
        force: bool,
        remove_volumes: bool,
    ) -> EngineResult<()>;

    /// Create an exec instance, returning its ID.
    async fn create_exec(&self, container: &str, spec: &ExecSpec) -> EngineResult<String>;

    /// Start an exec instance. When not detached, resolves once the command exits.
    async fn start_exec(&self, exec_id: &str, detach: bool) -> EngineResult<()>;

    /// Inspect an exec instance.
    async fn inspect_exec(&self, exec_id: &str) -> EngineResult<ExecStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_bridge_attributes() {
        let labels = BTreeMap::from([("project".to_string(), "observability".to_string())]);
        let request = NetworkCreateRequest::isolated_bridge("elastic-dev-network", labels.clone());

        assert_eq!(request.name, "elastic-dev-network");
        assert_eq!(request.driver, "bridge");
        assert!(request.check_duplicate);
        assert!(request.internal);
        assert!(!request.enable_ipv6);
        assert!(request.attachable);
        assert_eq!(request.labels, labels);
    }
}
