//! Command execution inside running containers.
//!
//! Execution is two-phase: an exec instance is created with the command and
//! user, then started. When the request is not detached, the start phase
//! resolves only once the command has exited.
//!
//! Cancelling the token aborts the call but does not stop a command that the
//! engine has already started inside the container.

use devnet_common::{DevnetError, DevnetResult};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::RuntimeClient;
use crate::engine::{ExecSpec, ExecStatus};

/// A command to run inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecRequest {
    /// Target container name.
    pub container: String,
    /// User to run as; empty means the image default.
    pub user: String,
    /// Argument vector.
    pub cmd: Vec<String>,
    /// Return as soon as the engine acknowledges the start.
    pub detach: bool,
}

impl ExecRequest {
    /// Run `cmd` in `container` as the default user, waiting for completion.
    #[must_use]
    pub fn new<I, S>(container: impl Into<String>, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            container: container.into(),
            user: String::new(),
            cmd: cmd.into_iter().map(Into::into).collect(),
            detach: false,
        }
    }

    /// Run as the given user.
    #[must_use]
    pub fn as_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the detach flag.
    #[must_use]
    pub const fn detached(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }
}

/// Reference to a started exec instance, usable for polling its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecHandle {
    /// Engine-assigned exec ID.
    pub id: String,
    /// Container the command runs in.
    pub container: String,
    /// Whether the start call returned without waiting.
    pub detached: bool,
}

/// Runs commands inside containers.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    client: RuntimeClient,
}

impl CommandExecutor {
    /// Create an executor.
    #[must_use]
    pub const fn new(client: RuntimeClient) -> Self {
        Self { client }
    }

    /// Execute a command in a container.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::ExecCreate`] or [`DevnetError::ExecStart`] if
    /// the engine rejects a phase, and [`DevnetError::Cancelled`] if `cancel`
    /// fires first.
    pub async fn exec(
        &self,
        cancel: &CancellationToken,
        request: &ExecRequest,
    ) -> DevnetResult<ExecHandle> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::warn!(
                    container = %request.container,
                    command = ?request.cmd,
                    detach = request.detach,
                    "Command execution cancelled"
                );
                Err(DevnetError::Cancelled {
                    operation: format!("exec {:?} in {}", request.cmd, request.container),
                })
            }
            result = self.run(request) => result,
        }
    }

    async fn run(&self, request: &ExecRequest) -> DevnetResult<ExecHandle> {
        let engine = self.client.get()?;
        let container = request.container.as_str();

        tracing::debug!(
            container,
            command = ?request.cmd,
            detach = request.detach,
            tty = false,
            "Creating command to be executed in container"
        );

        let spec = ExecSpec {
            user: request.user.clone(),
            cmd: request.cmd.clone(),
            tty: false,
            detach: request.detach,
        };
        let exec_id = engine.create_exec(container, &spec).await.map_err(|source| {
            tracing::warn!(
                container,
                command = ?request.cmd,
                error = %source,
                detach = request.detach,
                tty = false,
                "Could not create command in container"
            );
            DevnetError::ExecCreate {
                container: container.to_string(),
                command: request.cmd.clone(),
                source,
            }
        })?;

        tracing::debug!(
            container,
            command = ?request.cmd,
            id = %exec_id,
            detach = request.detach,
            "Command to be executed in container created"
        );

        engine
            .start_exec(&exec_id, request.detach)
            .await
            .map_err(|source| {
                tracing::warn!(
                    container,
                    command = ?request.cmd,
                    id = %exec_id,
                    error = %source,
                    detach = request.detach,
                    "Could not start command in container"
                );
                DevnetError::ExecStart {
                    container: container.to_string(),
                    command: request.cmd.clone(),
                    source,
                }
            })?;

        tracing::debug!(
            container,
            command = ?request.cmd,
            id = %exec_id,
            detach = request.detach,
            "Command successfully executed in container"
        );

        Ok(ExecHandle {
            id: exec_id,
            container: container.to_string(),
            detached: request.detach,
        })
    }

    /// Poll an exec instance for completion and exit code.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::ExecInspect`] if the exec instance is unknown.
    pub async fn status(&self, handle: &ExecHandle) -> DevnetResult<ExecStatus> {
        let engine = self.client.get()?;
        engine
            .inspect_exec(&handle.id)
            .await
            .map_err(|source| DevnetError::ExecInspect {
                exec_id: handle.id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder() {
        let request = ExecRequest::new("metricbeat", ["metricbeat", "-e"])
            .as_user("root")
            .detached(true);

        assert_eq!(request.container, "metricbeat");
        assert_eq!(request.user, "root");
        assert_eq!(request.cmd, vec!["metricbeat", "-e"]);
        assert!(request.detach);
    }

    #[test]
    fn request_defaults_wait_for_completion() {
        let request = ExecRequest::new("mysql", vec!["true".to_string()]);
        assert!(!request.detach);
        assert!(request.user.is_empty());
    }
}
