//! # devnet-engine
//!
//! Dev network and service container lifecycle for integration-test runs.
//!
//! devnet-engine provides:
//! - A lazily-connected, shared handle to the Docker engine
//! - Idempotent provisioning and teardown of an isolated bridge network
//! - Attachment of service containers under network aliases
//! - Two-phase command execution inside containers
//! - Label-based container discovery and forced removal
//!
//! All components take a [`RuntimeClient`] and share its connection.

#![warn(missing_docs)]

pub mod attach;
pub mod client;
pub mod docker;
pub mod engine;
pub mod environment;
pub mod exec;
pub mod inspect;
pub mod network;
pub mod remove;

pub use client::RuntimeClient;
pub use docker::DockerEngine;
pub use engine::{
    ContainerEngine, ContainerRecord, ContainerState, ContainerSummary, EndpointRecord, ExecSpec,
    ExecStatus, NetworkCreateRequest, NetworkDescriptor,
};
pub use environment::DevEnvironment;
pub use exec::{CommandExecutor, ExecHandle, ExecRequest};
pub use inspect::ContainerInspector;
pub use network::NetworkManager;
pub use remove::ContainerRemover;

pub use tokio_util::sync::CancellationToken;
