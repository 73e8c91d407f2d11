//! Docker engine backend.
//!
//! Implements [`ContainerEngine`] over the Docker Engine API via bollard. The
//! client is pinned to the configured API version instead of negotiating one.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions, RemoveContainerOptions};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::models::{ContainerInspectResponse, EndpointSettings, Network};
use bollard::network::{ConnectNetworkOptions, CreateNetworkOptions, InspectNetworkOptions};
use bollard::{ClientVersion, Docker};
use devnet_common::{EngineConfig, EngineError, EngineResult, LabelSelector};
use futures::StreamExt;

use crate::engine::{
    ContainerEngine, ContainerRecord, ContainerState, ContainerSummary, EndpointRecord,
    ExecSpec, ExecStatus, NetworkCreateRequest, NetworkDescriptor,
};

/// Interval between exec inspections while waiting for a command to exit.
const EXEC_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// [`ContainerEngine`] backed by a Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Build a client for the configured host and API version.
    ///
    /// This does not contact the daemon; use [`ContainerEngine::ping`] for that.
    ///
    /// # Errors
    ///
    /// Returns an error if the host address cannot be used.
    pub fn connect(config: &EngineConfig) -> EngineResult<Self> {
        let version = ClientVersion {
            major_version: config.api_version.major,
            minor_version: config.api_version.minor,
        };
        let host = config.host.as_str();

        let docker = if host.starts_with("tcp://") || host.starts_with("http://") {
            Docker::connect_with_http(host, config.timeout_secs, &version)
        } else {
            Docker::connect_with_local(host, config.timeout_secs, &version)
        }
        .map_err(engine_error)?;

        tracing::debug!(host, version = %config.api_version, "Docker client created");
        Ok(Self { docker })
    }
}

/// Classify a bollard error.
fn engine_error(err: DockerError) -> EngineError {
    match err {
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::from_status(status_code, message),
        other => EngineError::Transport {
            message: other.to_string(),
        },
    }
}

/// Classify a network removal error.
///
/// The daemon reports a network that still has endpoints as 403 on current
/// API versions and as 409 on some older ones.
fn remove_network_error(err: DockerError) -> EngineError {
    match engine_error(err) {
        EngineError::Api { status: 403, message } => EngineError::InUse { message },
        EngineError::Api { message, .. } | EngineError::Conflict { message }
            if message.contains("active endpoints") =>
        {
            EngineError::InUse { message }
        }
        other => other,
    }
}

/// Exec create options: no stream is attached to the command.
fn create_exec_options(spec: &ExecSpec) -> CreateExecOptions<&str> {
    CreateExecOptions {
        user: Some(spec.user.as_str()),
        cmd: Some(spec.cmd.iter().map(String::as_str).collect()),
        tty: Some(spec.tty),
        attach_stdin: Some(false),
        attach_stdout: Some(false),
        attach_stderr: Some(false),
        ..Default::default()
    }
}

/// Poll an exec instance until it is no longer running.
async fn wait_for_exit<F, Fut>(interval: Duration, mut poll: F) -> EngineResult<ExecStatus>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<ExecStatus>>,
{
    loop {
        let status = poll().await?;
        if !status.running {
            return Ok(status);
        }
        tokio::time::sleep(interval).await;
    }
}

fn network_descriptor(network: Network) -> NetworkDescriptor {
    let mut containers: Vec<String> = network
        .containers
        .map(|attached| attached.into_keys().collect())
        .unwrap_or_default();
    containers.sort();

    NetworkDescriptor {
        id: network.id.unwrap_or_default(),
        name: network.name.unwrap_or_default(),
        driver: network.driver.unwrap_or_default(),
        internal: network.internal.unwrap_or(false),
        attachable: network.attachable.unwrap_or(false),
        enable_ipv6: network.enable_ipv6.unwrap_or(false),
        labels: network.labels.unwrap_or_default().into_iter().collect(),
        containers,
    }
}

fn container_record(response: ContainerInspectResponse) -> ContainerRecord {
    let state = response
        .state
        .map(|state| ContainerState {
            status: state.status.map(|s| s.to_string()).unwrap_or_default(),
            running: state.running.unwrap_or(false),
            exit_code: state.exit_code,
        })
        .unwrap_or_default();

    let (image, labels) = response
        .config
        .map(|config| {
            (
                config.image.unwrap_or_default(),
                config.labels.unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    let networks = response
        .network_settings
        .and_then(|settings| settings.networks)
        .map(|networks| {
            networks
                .into_iter()
                .map(|(name, endpoint)| {
                    let record = EndpointRecord {
                        network_id: endpoint.network_id.unwrap_or_default(),
                        aliases: endpoint.aliases.unwrap_or_default(),
                        ip_address: endpoint.ip_address.filter(|ip| !ip.is_empty()),
                    };
                    (name, record)
                })
                .collect()
        })
        .unwrap_or_default();

    ContainerRecord {
        id: response.id.unwrap_or_default(),
        name: response
            .name
            .map(|name| name.trim_start_matches('/').to_string())
            .unwrap_or_default(),
        image,
        labels,
        state,
        networks,
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn ping(&self) -> EngineResult<()> {
        self.docker.ping().await.map_err(engine_error)?;
        Ok(())
    }

    async fn inspect_network(&self, name: &str) -> EngineResult<NetworkDescriptor> {
        let options = InspectNetworkOptions {
            verbose: true,
            scope: "local",
        };
        let network = self
            .docker
            .inspect_network(name, Some(options))
            .await
            .map_err(engine_error)?;
        Ok(network_descriptor(network))
    }

    async fn create_network(&self, request: &NetworkCreateRequest) -> EngineResult<String> {
        let labels: HashMap<&str, &str> = request
            .labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let options = CreateNetworkOptions {
            name: request.name.as_str(),
            check_duplicate: request.check_duplicate,
            driver: request.driver.as_str(),
            internal: request.internal,
            attachable: request.attachable,
            enable_ipv6: request.enable_ipv6,
            labels,
            ..Default::default()
        };

        let response = self
            .docker
            .create_network(options)
            .await
            .map_err(engine_error)?;

        // Older API models report the ID as optional.
        let id: Option<String> = response.id.into();
        id.filter(|id| !id.is_empty())
            .ok_or_else(|| EngineError::Api {
                status: 201,
                message: format!("no ID returned for network {}", request.name),
            })
    }

    async fn remove_network(&self, name: &str) -> EngineResult<()> {
        self.docker
            .remove_network(name)
            .await
            .map_err(remove_network_error)
    }

    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        aliases: &[String],
    ) -> EngineResult<()> {
        let options = ConnectNetworkOptions {
            container,
            endpoint_config: EndpointSettings {
                aliases: Some(aliases.to_vec()),
                ..Default::default()
            },
        };
        self.docker
            .connect_network(network, options)
            .await
            .map_err(engine_error)
    }

    async fn list_containers(
        &self,
        selector: &LabelSelector,
        all: bool,
    ) -> EngineResult<Vec<ContainerSummary>> {
        let options = ListContainersOptions::<String> {
            all,
            filters: selector.to_filters(),
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(engine_error)?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn inspect_container(&self, container: &str) -> EngineResult<ContainerRecord> {
        let response = self
            .docker
            .inspect_container(container, None::<InspectContainerOptions>)
            .await
            .map_err(engine_error)?;
        Ok(container_record(response))
    }

    async fn remove_container(
        &self,
        container: &str,
        force: bool,
        remove_volumes: bool,
    ) -> EngineResult<()> {
        let options = RemoveContainerOptions {
            force,
            v: remove_volumes,
            ..Default::default()
        };
        self.docker
            .remove_container(container, Some(options))
            .await
            .map_err(engine_error)
    }

    async fn create_exec(&self, container: &str, spec: &ExecSpec) -> EngineResult<String> {
        let options = create_exec_options(spec);
        let created = self
            .docker
            .create_exec(container, options)
            .await
            .map_err(engine_error)?;
        Ok(created.id)
    }

    async fn start_exec(&self, exec_id: &str, detach: bool) -> EngineResult<()> {
        let options = StartExecOptions {
            detach,
            tty: false,
            ..Default::default()
        };
        let started = self
            .docker
            .start_exec(exec_id, Some(options))
            .await
            .map_err(engine_error)?;

        if let StartExecResults::Attached { mut output, .. } = started {
            while let Some(frame) = output.next().await {
                frame.map_err(engine_error)?;
            }
        }
        if detach {
            return Ok(());
        }

        // Without attached streams the daemon closes the connection as soon
        // as the process starts, so completion is observed by polling.
        let status = wait_for_exit(EXEC_POLL_INTERVAL, || self.inspect_exec(exec_id)).await?;
        tracing::debug!(exec_id, exit_code = ?status.exit_code, "Command has exited");
        Ok(())
    }

    async fn inspect_exec(&self, exec_id: &str) -> EngineResult<ExecStatus> {
        let inspected = self
            .docker
            .inspect_exec(exec_id)
            .await
            .map_err(engine_error)?;
        Ok(ExecStatus {
            running: inspected.running.unwrap_or(false),
            exit_code: inspected.exit_code,
        })
    }
}
