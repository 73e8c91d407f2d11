//! devnet CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use devnet_common::{DevnetConfig, DevnetError, DevnetResult, NetworkSettings};
use devnet_engine::{CancellationToken, DevEnvironment, ExecRequest};

/// devnet - dev network and service containers for integration tests
#[derive(Parser, Debug)]
#[command(name = "devnet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a devnet.toml configuration file
    #[arg(short, long, env = "DEVNET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Engine address (unix://, tcp:// or http://)
    #[arg(long, env = "DEVNET_HOST")]
    pub host: Option<String>,

    /// Built-in network profile (observability, metricbeat)
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// devnet commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the dev network
    Network {
        /// The network action.
        #[command(subcommand)]
        action: NetworkAction,
    },

    /// Attach a container to the dev network
    Attach {
        /// Network aliases for the container
        #[arg(short, long = "alias")]
        aliases: Vec<String>,

        /// Container name or ID
        container: String,
    },

    /// Execute a command in a running container
    Exec {
        /// Return once the command has started
        #[arg(short, long)]
        detach: bool,

        /// User to run the command as
        #[arg(short, long, default_value = "")]
        user: String,

        /// Container name
        container: String,

        /// Command and arguments
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Inspect a service container found by its labels
    Inspect {
        /// Owner label value (defaults to the configured owner)
        #[arg(long)]
        owner: Option<String>,

        /// Service name label value
        service: String,
    },

    /// Force-remove a container and its volumes
    Rm {
        /// Container name
        container: String,
    },

    /// Remove containers, then the dev network
    Teardown {
        /// Containers to remove first
        containers: Vec<String>,
    },
}

/// Dev network actions.
#[derive(Subcommand, Debug)]
pub enum NetworkAction {
    /// Create the dev network if it does not exist and print its ID
    Up,

    /// Remove the dev network
    Down,

    /// Print the dev network as JSON
    Inspect,
}

impl Cli {
    /// Resolve configuration from the file, profile and host flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file or profile is invalid.
    pub fn load_config(&self) -> DevnetResult<DevnetConfig> {
        let mut config = match &self.config {
            Some(path) => DevnetConfig::from_file(path)?,
            None => DevnetConfig::default(),
        };
        if let Some(profile) = &self.profile {
            config = config.with_network(NetworkSettings::profile(profile)?);
        }
        if let Some(host) = &self.host {
            config = config.with_host(host.clone());
        }
        Ok(config)
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the command.
    pub async fn execute(self) -> DevnetResult<ExitCode> {
        let config = self.load_config()?;
        let env = DevEnvironment::connect(&config);
        env.client().ping().await?;

        match self.command {
            Commands::Network { action } => match action {
                NetworkAction::Up => {
                    let network = env.network().get_dev_network().await?;
                    println!("{}", network.id);
                }
                NetworkAction::Down => {
                    env.network().remove_dev().await?;
                    println!("Removed {}", env.network().name());
                }
                NetworkAction::Inspect => {
                    let name = env.network().name().to_string();
                    match env.network().inspect(&name).await? {
                        Some(network) => println!("{}", serde_json::to_string_pretty(&network)?),
                        None => {
                            eprintln!("Network {name} does not exist");
                            return Ok(ExitCode::FAILURE);
                        }
                    }
                }
            },

            Commands::Attach { aliases, container } => {
                env.network().attach(&container, aliases).await?;
                println!("Attached {container} to {}", env.network().name());
            }

            Commands::Exec {
                detach,
                user,
                container,
                command,
            } => {
                let cancel = CancellationToken::new();
                let on_interrupt = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        on_interrupt.cancel();
                    }
                });

                let request = ExecRequest::new(container, command)
                    .as_user(user)
                    .detached(detach);
                let handle = env.executor().exec(&cancel, &request).await?;
                println!("{}", handle.id);

                if !detach {
                    let status = env.executor().status(&handle).await?;
                    if let Some(code) = status.exit_code {
                        println!("exit code: {code}");
                    }
                }
            }

            Commands::Inspect { owner, service } => {
                let owner = owner.unwrap_or_else(|| env.inspector().owner().to_string());
                match env.inspector().find_by_labels(&owner, &service).await? {
                    Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                    None => {
                        eprintln!("No container labelled {owner}/{service}");
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }

            Commands::Rm { container } => {
                env.remover().remove(&container).await?;
                println!("Removed {container}");
            }

            Commands::Teardown { containers } => {
                env.teardown(containers.as_slice()).await?;
                println!("Removed {}", env.network().name());
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Report an error and pick the exit code.
///
/// Fatal errors exit with 2, recoverable ones with 1.
pub fn report(err: DevnetError) -> ExitCode {
    let fatal = err.is_fatal();
    if fatal {
        tracing::error!(error = %err, "Unrecoverable error, aborting");
    } else {
        tracing::warn!(error = %err, "Command failed");
    }
    eprintln!("{:?}", miette::Report::new(err));

    if fatal {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exec() {
        let cli = Cli::try_parse_from([
            "devnet", "exec", "--detach", "--user", "root", "metricbeat", "metricbeat", "-e",
        ])
        .unwrap();

        match cli.command {
            Commands::Exec {
                detach,
                user,
                container,
                command,
            } => {
                assert!(detach);
                assert_eq!(user, "root");
                assert_eq!(container, "metricbeat");
                assert_eq!(command, vec!["metricbeat", "-e"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_attach_aliases() {
        let cli = Cli::try_parse_from([
            "devnet", "attach", "-a", "mysql", "--alias", "db", "mysql-5.7",
        ])
        .unwrap();

        match cli.command {
            Commands::Attach { aliases, container } => {
                assert_eq!(aliases, vec!["mysql", "db"]);
                assert_eq!(container, "mysql-5.7");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_overrides() {
        let cli = Cli::try_parse_from([
            "devnet",
            "--profile",
            "metricbeat",
            "--host",
            "tcp://127.0.0.1:2375",
            "network",
            "up",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.network.name, "metricbeat-devnet");
        assert_eq!(config.engine.host, "tcp://127.0.0.1:2375");
    }

    #[test]
    fn unknown_profile() {
        let cli = Cli::try_parse_from(["devnet", "--profile", "nope", "network", "up"]).unwrap();
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn exit_codes() {
        let fatal = DevnetError::NetworkCreate {
            network: "elastic-dev-network".to_string(),
            source: devnet_common::EngineError::Transport {
                message: "boom".to_string(),
            },
        };
        assert_eq!(report(fatal), ExitCode::from(2));

        let recoverable = DevnetError::Cancelled {
            operation: "exec".to_string(),
        };
        assert_eq!(report(recoverable), ExitCode::FAILURE);
    }
}
