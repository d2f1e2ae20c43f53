/*!
 * Hub configuration: node list, API key, listener and pacing settings
 */

use crate::error::{Error, Result};
use rchub_connect::Node;
use rchub_server::{ServerConfig, StreamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Top-level configuration file
///
/// ```json
/// {
///     "nodes": [{"id": "home-nas", "name": "Home NAS", "ip": "100.64.0.7", "port": 55743}],
///     "api_key": "optional-secret"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Agents the hub may talk to, in display order
    pub nodes: Vec<Node>,

    /// Shared secret for `X-API-Key`; absent or empty leaves the API open
    pub api_key: Option<String>,

    pub server: ServerSection,

    /// SQLite database path
    pub database: String,

    pub stream: StreamSection,

    /// Default timeout for remote-control calls, in seconds
    pub rc_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

/// Stats stream pacing, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    pub interval_secs: u64,
    pub stats_timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            api_key: None,
            server: ServerSection::default(),
            database: default_database(),
            stream: StreamSection::default(),
            rc_timeout_secs: default_rc_timeout_secs(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
        }
    }
}

impl Default for StreamSection {
    fn default() -> Self {
        let defaults = StreamConfig::default();
        Self {
            interval_secs: defaults.interval.as_secs(),
            stats_timeout_secs: defaults.stats_timeout.as_secs(),
        }
    }
}

fn default_database() -> String {
    "hub.db".to_string()
}

fn default_rc_timeout_secs() -> u64 {
    300
}

impl HubConfig {
    /// Load configuration from a JSON or TOML file
    ///
    /// A missing file is not an error: the hub starts with no nodes and no
    /// API key. Files ending in `.toml` are parsed as TOML, anything else as
    /// JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, starting with no nodes",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = if is_toml(path) {
            Self::from_toml(&contents).map_err(|source| Error::ConfigToml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::from_json(&contents).map_err(|source| Error::ConfigJson {
                path: path.to_path_buf(),
                source,
            })?
        };

        debug!(
            "Loaded {} node(s) from {}",
            config.nodes.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_json(contents: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
        }
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            interval: Duration::from_secs(self.stream.interval_secs),
            stats_timeout: Duration::from_secs(self.stream.stats_timeout_secs),
        }
    }

    pub fn rc_timeout(&self) -> Duration {
        Duration::from_secs(self.rc_timeout_secs)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
