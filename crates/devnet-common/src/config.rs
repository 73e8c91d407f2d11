//! Configuration for the engine connection, the dev network and services.
//!
//! Every field has a default matching the built-in constants, so an empty
//! TOML document (or no file at all) yields a working configuration:
//!
//! ```toml
//! [engine]
//! host = "unix:///var/run/docker.sock"
//! api_version = "1.39"
//! timeout_secs = 120
//!
//! [network]
//! name = "elastic-dev-network"
//! labels = { project = "observability" }
//!
//! [services]
//! owner = "co.elastic.observability"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DevnetError, DevnetResult};
use crate::labels::DEFAULT_OWNER;

/// Name of the dev network shared by observability scenarios.
pub const DEV_NETWORK_NAME: &str = "elastic-dev-network";

/// Name of the network used by the metricbeat test suite.
pub const METRICBEAT_NETWORK_NAME: &str = "metricbeat-devnet";

/// Default local engine socket.
pub const DEFAULT_HOST: &str = "unix:///var/run/docker.sock";

/// Engine API version the client is pinned to.
pub const DEFAULT_API_VERSION: ApiVersion = ApiVersion::new(1, 39);

/// Engine API version, `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion {
    /// Major version.
    pub major: usize,
    /// Minor version.
    pub minor: usize,
}

impl ApiVersion {
    /// Create a version.
    #[must_use]
    pub const fn new(major: usize, minor: usize) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = DevnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DevnetError::Config {
            message: format!("Invalid API version '{s}': expected major.minor"),
        };
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = DevnetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.to_string()
    }
}

/// Engine connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine address: `unix://`, `tcp://` or `http://`.
    pub host: String,
    /// Pinned API version.
    pub api_version: ApiVersion,
    /// Request timeout (seconds).
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_version: DEFAULT_API_VERSION,
            timeout_secs: 120,
        }
    }
}

/// Managed network settings.
///
/// Only the name and labels vary; driver, isolation and attachability are
/// fixed for every managed network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Network name.
    pub name: String,
    /// Ownership labels applied at creation.
    pub labels: BTreeMap<String, String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self::observability()
    }
}

impl NetworkSettings {
    /// The shared observability dev network.
    #[must_use]
    pub fn observability() -> Self {
        Self {
            name: DEV_NETWORK_NAME.to_string(),
            labels: BTreeMap::from([("project".to_string(), "observability".to_string())]),
        }
    }

    /// The metricbeat test-suite network.
    #[must_use]
    pub fn metricbeat() -> Self {
        Self {
            name: METRICBEAT_NETWORK_NAME.to_string(),
            labels: BTreeMap::from([
                ("project".to_string(), "metricbeat".to_string()),
                ("runtime".to_string(), "test".to_string()),
            ]),
        }
    }

    /// Look up a built-in profile by name.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown profile.
    pub fn profile(name: &str) -> DevnetResult<Self> {
        match name {
            "observability" => Ok(Self::observability()),
            "metricbeat" => Ok(Self::metricbeat()),
            other => Err(DevnetError::Config {
                message: format!("Unknown network profile '{other}'"),
            }),
        }
    }
}

/// Service container settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Value of the `service.owner` label on harness containers.
    pub owner: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
        }
    }
}

/// Top-level devnet configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevnetConfig {
    /// Engine connection.
    pub engine: EngineConfig,
    /// Managed network.
    pub network: NetworkSettings,
    /// Service containers.
    pub services: ServiceSettings,
}

impl DevnetConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or has invalid values.
    pub fn from_toml_str(content: &str) -> DevnetResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> DevnetResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Self::from_toml_str(&content)
    }

    /// Set the engine host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.engine.host = host.into();
        self
    }

    /// Set the pinned API version.
    #[must_use]
    pub const fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.engine.api_version = version;
        self
    }

    /// Replace the managed network settings.
    #[must_use]
    pub fn with_network(mut self, network: NetworkSettings) -> Self {
        self.network = network;
        self
    }

    /// Set the service owner label value.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.services.owner = owner.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DevnetConfig::default();
        assert_eq!(config.engine.host, DEFAULT_HOST);
        assert_eq!(config.engine.api_version.to_string(), "1.39");
        assert_eq!(config.network.name, "elastic-dev-network");
        assert_eq!(
            config.network.labels.get("project").map(String::as_str),
            Some("observability")
        );
        assert_eq!(config.services.owner, "co.elastic.observability");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = DevnetConfig::from_toml_str("").unwrap();
        assert_eq!(config, DevnetConfig::default());
    }

    #[test]
    fn partial_document() {
        let config = DevnetConfig::from_toml_str(
            r#"
            [engine]
            api_version = "1.41"

            [network]
            name = "custom-net"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.api_version, ApiVersion::new(1, 41));
        assert_eq!(config.engine.timeout_secs, 120);
        assert_eq!(config.network.name, "custom-net");
        assert_eq!(config.network.labels, NetworkSettings::observability().labels);
    }

    #[test]
    fn invalid_api_version() {
        assert!("1".parse::<ApiVersion>().is_err());
        assert!("one.two".parse::<ApiVersion>().is_err());
        assert!(DevnetConfig::from_toml_str("[engine]\napi_version = \"x\"").is_err());
    }

    #[test]
    fn profiles() {
        let metricbeat = NetworkSettings::profile("metricbeat").unwrap();
        assert_eq!(metricbeat.name, "metricbeat-devnet");
        assert_eq!(metricbeat.labels.len(), 2);
        assert!(NetworkSettings::profile("nope").is_err());
    }

    #[test]
    fn builder_pattern() {
        let config = DevnetConfig::default()
            .with_host("tcp://127.0.0.1:2375")
            .with_api_version(ApiVersion::new(1, 43))
            .with_network(NetworkSettings::metricbeat())
            .with_owner("me");

        assert_eq!(config.engine.host, "tcp://127.0.0.1:2375");
        assert_eq!(config.engine.api_version, ApiVersion::new(1, 43));
        assert_eq!(config.network.name, "metricbeat-devnet");
        assert_eq!(config.services.owner, "me");
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devnet.toml");
        std::fs::write(&path, "[services]\nowner = \"someone\"\n").unwrap();

        let config = DevnetConfig::from_file(&path).unwrap();
        assert_eq!(config.services.owner, "someone");
        assert!(DevnetConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
