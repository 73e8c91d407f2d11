//! Error types for the devnet workspace.
//!
//! Two layers live here. [`EngineError`] classifies a raw failure reported by
//! the container engine, so callers can tell "not found" apart from a broken
//! connection. [`DevnetError`] adds the operation and identifiers that failed
//! and decides whether the failure is fatal for a test run.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`DevnetError`].
pub type DevnetResult<T> = Result<T, DevnetError>;

/// Result type alias using [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;

/// A failure reported by the container engine, classified by kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The addressed object does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Engine message.
        message: String,
    },

    /// The request conflicts with existing state (duplicate name, alias, ...).
    #[error("conflict: {message}")]
    Conflict {
        /// Engine message.
        message: String,
    },

    /// The object is still referenced (e.g. a network with active endpoints).
    #[error("in use: {message}")]
    InUse {
        /// Engine message.
        message: String,
    },

    /// Any other error response from the engine.
    #[error("engine responded {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Engine message.
        message: String,
    },

    /// The engine could not be reached or the response could not be read.
    #[error("transport error: {message}")]
    Transport {
        /// Underlying error message.
        message: String,
    },
}

impl EngineError {
    /// Classify an engine error response by HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound { message },
            409 => Self::Conflict { message },
            _ => Self::Api { status, message },
        }
    }

    /// Whether the addressed object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the request collided with existing state.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Errors raised by devnet operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DevnetError {
    /// The engine client could not be constructed.
    #[error("Cannot create engine client (API {version}): {source}")]
    #[diagnostic(
        code(devnet::client::init),
        help("Check that the Docker daemon is running and the host setting is correct")
    )]
    ClientInit {
        /// Protocol version the client was bound to.
        version: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// Inspecting a network failed for a reason other than absence.
    #[error("Cannot inspect network {network}: {source}")]
    #[diagnostic(code(devnet::network::inspect))]
    NetworkInspect {
        /// Network name.
        network: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// The dev network could not be created.
    #[error("Cannot create network {network}, which is necessary: {source}")]
    #[diagnostic(code(devnet::network::create))]
    NetworkCreate {
        /// Network name.
        network: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// The network could not be removed.
    #[error("Cannot remove network {network}: {source}")]
    #[diagnostic(
        code(devnet::network::remove),
        help("Remove or disconnect attached containers before removing the network")
    )]
    NetworkRemove {
        /// Network name.
        network: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// A container could not be connected to the network.
    #[error("Cannot attach container {container} to network {network}: {source}")]
    #[diagnostic(code(devnet::network::attach))]
    Attach {
        /// Container name or ID.
        container: String,
        /// Network name.
        network: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// The exec instance could not be created.
    #[error("Cannot create command {command:?} in container {container}: {source}")]
    #[diagnostic(code(devnet::exec::create))]
    ExecCreate {
        /// Container name.
        container: String,
        /// Command vector.
        command: Vec<String>,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// The exec instance could not be started.
    #[error("Cannot start command {command:?} in container {container}: {source}")]
    #[diagnostic(code(devnet::exec::start))]
    ExecStart {
        /// Container name.
        container: String,
        /// Command vector.
        command: Vec<String>,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// The exec instance could not be inspected.
    #[error("Cannot inspect exec {exec_id}: {source}")]
    #[diagnostic(code(devnet::exec::inspect))]
    ExecInspect {
        /// Exec ID.
        exec_id: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled: {operation}")]
    #[diagnostic(
        code(devnet::cancelled),
        help("The process inside the container may still be running")
    )]
    Cancelled {
        /// The operation that was cancelled.
        operation: String,
    },

    /// Containers could not be listed.
    #[error("Cannot list containers matching {selector}: {source}")]
    #[diagnostic(code(devnet::container::list))]
    ContainerList {
        /// Label selector used for the listing.
        selector: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// A container could not be inspected.
    #[error("Cannot inspect container {container}: {source}")]
    #[diagnostic(code(devnet::container::inspect))]
    ContainerInspect {
        /// Container name or ID.
        container: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// A container could not be removed.
    #[error("Service {container} could not be removed: {source}")]
    #[diagnostic(code(devnet::container::remove))]
    ContainerRemove {
        /// Container name.
        container: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// The engine is not reachable.
    #[error("Engine is not reachable: {source}")]
    #[diagnostic(code(devnet::client::ping))]
    Unreachable {
        /// Underlying error.
        #[source]
        source: EngineError,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(devnet::config))]
    Config {
        /// The error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(devnet::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(devnet::serialization))]
    Serialization(String),
}

impl DevnetError {
    /// Whether this error represents a missing environment prerequisite.
    ///
    /// Fatal errors abort the test run: there is no valid way to continue
    /// without an engine client, the dev network, or container visibility.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ClientInit { .. }
                | Self::NetworkInspect { .. }
                | Self::NetworkCreate { .. }
                | Self::ContainerList { .. }
                | Self::Unreachable { .. }
        )
    }

    /// The engine error behind this failure, if any.
    #[must_use]
    pub const fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::ClientInit { source, .. }
            | Self::NetworkInspect { source, .. }
            | Self::NetworkCreate { source, .. }
            | Self::NetworkRemove { source, .. }
            | Self::Attach { source, .. }
            | Self::ExecCreate { source, .. }
            | Self::ExecStart { source, .. }
            | Self::ExecInspect { source, .. }
            | Self::ContainerList { source, .. }
            | Self::ContainerInspect { source, .. }
            | Self::ContainerRemove { source, .. }
            | Self::Unreachable { source } => Some(source),
            Self::Cancelled { .. } | Self::Config { .. } | Self::Io(_) | Self::Serialization(_) => {
                None
            }
        }
    }
}

impl From<serde_json::Error> for DevnetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DevnetError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(EngineError::from_status(404, "no such network").is_not_found());
        assert!(EngineError::from_status(409, "already exists").is_conflict());
        assert_eq!(
            EngineError::from_status(500, "boom"),
            EngineError::Api {
                status: 500,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn fatal_taxonomy() {
        let create = DevnetError::NetworkCreate {
            network: "elastic-dev-network".to_string(),
            source: EngineError::from_status(500, "boom"),
        };
        assert!(create.is_fatal());

        let remove = DevnetError::NetworkRemove {
            network: "elastic-dev-network".to_string(),
            source: EngineError::InUse {
                message: "has active endpoints".to_string(),
            },
        };
        assert!(!remove.is_fatal());
        assert!(matches!(remove.engine_error(), Some(EngineError::InUse { .. })));

        let cancelled = DevnetError::Cancelled {
            operation: "exec".to_string(),
        };
        assert!(!cancelled.is_fatal());
        assert!(cancelled.engine_error().is_none());
    }

    #[test]
    fn error_display() {
        let err = DevnetError::ContainerRemove {
            container: "mysql".to_string(),
            source: EngineError::from_status(404, "No such container: mysql"),
        };
        assert_eq!(
            err.to_string(),
            "Service mysql could not be removed: not found: No such container: mysql"
        );
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DevnetError = io_err.into();
        assert!(matches!(err, DevnetError::Io(_)));
    }
}
