//! In-memory [`ContainerEngine`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devnet_common::{EngineError, EngineResult, LabelSelector};
use devnet_engine::{
    ContainerEngine, ContainerRecord, ContainerState, ContainerSummary, EndpointRecord, ExecSpec,
    ExecStatus, NetworkCreateRequest, NetworkDescriptor, RuntimeClient,
};
use parking_lot::Mutex;
use tokio::time::Instant;

/// Engine calls, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `ping`
    Ping,
    /// `inspect_network`
    InspectNetwork,
    /// `create_network`
    CreateNetwork,
    /// `remove_network`
    RemoveNetwork,
    /// `connect_network`
    ConnectNetwork,
    /// `list_containers`
    ListContainers,
    /// `inspect_container`
    InspectContainer,
    /// `remove_container`
    RemoveContainer,
    /// `create_exec`
    CreateExec,
    /// `start_exec`
    StartExec,
    /// `inspect_exec`
    InspectExec,
}

/// A container known to the mock engine.
#[derive(Debug, Clone)]
pub struct MockContainer {
    /// Container ID.
    pub id: String,
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Labels.
    pub labels: HashMap<String, String>,
    /// Whether the container is running.
    pub running: bool,
}

#[derive(Debug)]
struct MockNetwork {
    id: String,
    request: NetworkCreateRequest,
    /// Container ID -> aliases.
    endpoints: BTreeMap<String, Vec<String>>,
}

#[derive(Debug)]
struct MockExec {
    container_id: String,
    spec: ExecSpec,
    started_at: Option<Instant>,
    duration: Duration,
}

#[derive(Debug)]
struct Fault {
    error: EngineError,
    once: bool,
}

#[derive(Debug, Default)]
struct State {
    networks: BTreeMap<String, MockNetwork>,
    containers: Vec<MockContainer>,
    execs: HashMap<String, MockExec>,
    faults: HashMap<Operation, Fault>,
    calls: Vec<Operation>,
    network_requests: Vec<NetworkCreateRequest>,
    exec_duration: Duration,
    ignore_filters: bool,
}

impl State {
    fn enter(&mut self, op: Operation) -> EngineResult<()> {
        self.calls.push(op);
        match self.faults.get(&op) {
            Some(fault) if fault.once => {
                let error = fault.error.clone();
                self.faults.remove(&op);
                Err(error)
            }
            Some(fault) => Err(fault.error.clone()),
            None => Ok(()),
        }
    }

    fn network(&self, name_or_id: &str) -> Option<&MockNetwork> {
        self.networks
            .get(name_or_id)
            .or_else(|| self.networks.values().find(|n| n.id == name_or_id))
    }

    fn container(&self, name_or_id: &str) -> Option<&MockContainer> {
        self.containers
            .iter()
            .find(|c| c.id == name_or_id || c.name == name_or_id)
    }

    fn descriptor(network: &MockNetwork) -> NetworkDescriptor {
        NetworkDescriptor {
            id: network.id.clone(),
            name: network.request.name.clone(),
            driver: network.request.driver.clone(),
            internal: network.request.internal,
            attachable: network.request.attachable,
            enable_ipv6: network.request.enable_ipv6,
            labels: network.request.labels.clone(),
            containers: network.endpoints.keys().cloned().collect(),
        }
    }
}

fn not_found(message: String) -> EngineError {
    EngineError::NotFound { message }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// In-memory container engine.
#[derive(Debug, Default)]
pub struct MockEngine {
    state: Mutex<State>,
}

impl MockEngine {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A client handle already connected to this engine.
    #[must_use]
    pub fn client(self: &Arc<Self>) -> RuntimeClient {
        let engine: Arc<dyn ContainerEngine> = Arc::clone(self) as Arc<dyn ContainerEngine>;
        RuntimeClient::from_engine(engine)
    }

    /// Add a running container, returning its ID.
    pub fn add_container(&self, name: &str, image: &str, labels: &[(&str, &str)]) -> String {
        let id = new_id();
        self.state.lock().containers.push(MockContainer {
            id: id.clone(),
            name: name.to_string(),
            image: image.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            running: true,
        });
        id
    }

    /// Mark a container as stopped.
    pub fn stop_container(&self, name: &str) {
        let mut state = self.state.lock();
        if let Some(container) = state.containers.iter_mut().find(|c| c.name == name) {
            container.running = false;
        }
    }

    /// Add a network without going through `create_network`, returning its ID.
    pub fn add_network(&self, request: NetworkCreateRequest) -> String {
        let id = new_id();
        self.state.lock().networks.insert(
            request.name.clone(),
            MockNetwork {
                id: id.clone(),
                request,
                endpoints: BTreeMap::new(),
            },
        );
        id
    }

    /// Fail every call to `op` with `error`.
    pub fn fail(&self, op: Operation, error: EngineError) {
        self.state
            .lock()
            .faults
            .insert(op, Fault { error, once: false });
    }

    /// Fail the next call to `op` with `error`.
    pub fn fail_once(&self, op: Operation, error: EngineError) {
        self.state
            .lock()
            .faults
            .insert(op, Fault { error, once: true });
    }

    /// Remove an injected failure.
    pub fn clear_fault(&self, op: Operation) {
        self.state.lock().faults.remove(&op);
    }

    /// How long started commands take to finish.
    pub fn set_exec_duration(&self, duration: Duration) {
        self.state.lock().exec_duration = duration;
    }

    /// Return every container from `list_containers`, ignoring label filters.
    pub fn ignore_label_filters(&self) {
        self.state.lock().ignore_filters = true;
    }

    /// Number of calls made to `op`.
    #[must_use]
    pub fn calls(&self, op: Operation) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Every call made, in order.
    #[must_use]
    pub fn call_log(&self) -> Vec<Operation> {
        self.state.lock().calls.clone()
    }

    /// Network create requests received, in order.
    #[must_use]
    pub fn network_requests(&self) -> Vec<NetworkCreateRequest> {
        self.state.lock().network_requests.clone()
    }

    /// Whether a network with this name exists.
    #[must_use]
    pub fn has_network(&self, name: &str) -> bool {
        self.state.lock().networks.contains_key(name)
    }

    /// Whether a container with this name exists.
    #[must_use]
    pub fn has_container(&self, name: &str) -> bool {
        self.state.lock().container(name).is_some()
    }

    /// Aliases of `container` on `network`, if attached.
    #[must_use]
    pub fn aliases(&self, network: &str, container: &str) -> Option<Vec<String>> {
        let state = self.state.lock();
        let id = state.container(container)?.id.clone();
        state.network(network)?.endpoints.get(&id).cloned()
    }

    /// The exec spec submitted for an exec ID.
    #[must_use]
    pub fn exec_spec(&self, exec_id: &str) -> Option<ExecSpec> {
        self.state
            .lock()
            .execs
            .get(exec_id)
            .map(|exec| exec.spec.clone())
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn ping(&self) -> EngineResult<()> {
        self.state.lock().enter(Operation::Ping)
    }

    async fn inspect_network(&self, name: &str) -> EngineResult<NetworkDescriptor> {
        let mut state = self.state.lock();
        state.enter(Operation::InspectNetwork)?;
        state
            .network(name)
            .map(State::descriptor)
            .ok_or_else(|| not_found(format!("network {name} not found")))
    }

    async fn create_network(&self, request: &NetworkCreateRequest) -> EngineResult<String> {
        let mut state = self.state.lock();
        state.enter(Operation::CreateNetwork)?;
        state.network_requests.push(request.clone());

        if request.check_duplicate && state.networks.contains_key(&request.name) {
            return Err(EngineError::Conflict {
                message: format!("network with name {} already exists", request.name),
            });
        }

        let id = new_id();
        state.networks.insert(
            request.name.clone(),
            MockNetwork {
                id: id.clone(),
                request: request.clone(),
                endpoints: BTreeMap::new(),
            },
        );
        tracing::trace!(network = %request.name, id = %id, "mock network created");
        Ok(id)
    }

    async fn remove_network(&self, name: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.enter(Operation::RemoveNetwork)?;

        let network = state
            .network(name)
            .ok_or_else(|| not_found(format!("network {name} not found")))?;
        if !network.endpoints.is_empty() {
            return Err(EngineError::InUse {
                message: format!(
                    "error while removing network: network {name} id {} has active endpoints",
                    network.id
                ),
            });
        }

        let key = network.request.name.clone();
        state.networks.remove(&key);
        Ok(())
    }

    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        aliases: &[String],
    ) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.enter(Operation::ConnectNetwork)?;

        let container_id = state
            .container(container)
            .map(|c| c.id.clone())
            .ok_or_else(|| not_found(format!("No such container: {container}")))?;
        let network_name = state
            .network(network)
            .map(|n| n.request.name.clone())
            .ok_or_else(|| not_found(format!("network {network} not found")))?;

        let endpoints = &mut state
            .networks
            .get_mut(&network_name)
            .ok_or_else(|| not_found(format!("network {network} not found")))?
            .endpoints;
        if endpoints.contains_key(&container_id) {
            return Err(EngineError::Conflict {
                message: format!("endpoint with name {container} already exists in network {network}"),
            });
        }
        endpoints.insert(container_id, aliases.to_vec());
        Ok(())
    }

    async fn list_containers(
        &self,
        selector: &LabelSelector,
        all: bool,
    ) -> EngineResult<Vec<ContainerSummary>> {
        let mut state = self.state.lock();
        state.enter(Operation::ListContainers)?;

        Ok(state
            .containers
            .iter()
            .filter(|c| all || c.running)
            .filter(|c| state.ignore_filters || selector.matches(&c.labels))
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                names: vec![format!("/{}", c.name)],
                labels: c.labels.clone(),
            })
            .collect())
    }

    async fn inspect_container(&self, container: &str) -> EngineResult<ContainerRecord> {
        let mut state = self.state.lock();
        state.enter(Operation::InspectContainer)?;

        let found = state
            .container(container)
            .ok_or_else(|| not_found(format!("No such container: {container}")))?;

        let networks = state
            .networks
            .values()
            .filter_map(|network| {
                network.endpoints.get(&found.id).map(|aliases| {
                    let endpoint = EndpointRecord {
                        network_id: network.id.clone(),
                        aliases: aliases.clone(),
                        ip_address: None,
                    };
                    (network.request.name.clone(), endpoint)
                })
            })
            .collect();

        Ok(ContainerRecord {
            id: found.id.clone(),
            name: found.name.clone(),
            image: found.image.clone(),
            labels: found.labels.clone(),
            state: ContainerState {
                status: if found.running { "running" } else { "exited" }.to_string(),
                running: found.running,
                exit_code: Some(0),
            },
            networks,
        })
    }

    async fn remove_container(
        &self,
        container: &str,
        force: bool,
        _remove_volumes: bool,
    ) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.enter(Operation::RemoveContainer)?;

        let found = state
            .container(container)
            .ok_or_else(|| not_found(format!("No such container: {container}")))?;
        if found.running && !force {
            return Err(EngineError::Conflict {
                message: format!("You cannot remove a running container {container}"),
            });
        }

        let id = found.id.clone();
        state.containers.retain(|c| c.id != id);
        for network in state.networks.values_mut() {
            network.endpoints.remove(&id);
        }
        Ok(())
    }

    async fn create_exec(&self, container: &str, spec: &ExecSpec) -> EngineResult<String> {
        let mut state = self.state.lock();
        state.enter(Operation::CreateExec)?;

        let found = state
            .container(container)
            .ok_or_else(|| not_found(format!("No such container: {container}")))?;
        if !found.running {
            return Err(EngineError::Conflict {
                message: format!("Container {container} is not running"),
            });
        }

        let id = new_id();
        let exec = MockExec {
            container_id: found.id.clone(),
            spec: spec.clone(),
            started_at: None,
            duration: state.exec_duration,
        };
        state.execs.insert(id.clone(), exec);
        Ok(id)
    }

    async fn start_exec(&self, exec_id: &str, detach: bool) -> EngineResult<()> {
        let duration = {
            let mut state = self.state.lock();
            state.enter(Operation::StartExec)?;

            let exec = state
                .execs
                .get_mut(exec_id)
                .ok_or_else(|| not_found(format!("No such exec instance: {exec_id}")))?;
            exec.started_at = Some(Instant::now());
            tracing::trace!(exec_id, container = %exec.container_id, detach, "mock exec started");
            exec.duration
        };

        if !detach {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }

    async fn inspect_exec(&self, exec_id: &str) -> EngineResult<ExecStatus> {
        let mut state = self.state.lock();
        state.enter(Operation::InspectExec)?;

        let exec = state
            .execs
            .get(exec_id)
            .ok_or_else(|| not_found(format!("No such exec instance: {exec_id}")))?;

        Ok(match exec.started_at {
            Some(started) if started.elapsed() >= exec.duration => ExecStatus {
                running: false,
                exit_code: Some(0),
            },
            Some(_) => ExecStatus {
                running: true,
                exit_code: None,
            },
            None => ExecStatus::default(),
        })
    }
}
