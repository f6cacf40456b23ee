//! Plugin configuration.
//!
//! Loaded once per invocation from a JSON file and passed by reference into
//! the lifecycle orchestrator. Field names follow the PascalCase layout that
//! existing deployments already ship:
//!
//! ```json
//! {
//!   "LogFile": "/var/log/openvpn/radius-plugin.log",
//!   "ServerInfo": { "Identifier": "OpenVPN", "IpAddress": "192.168.1.12",
//!                   "PortType": "5", "ServiceType": "5" },
//!   "Radius": {
//!     "AuthenticationOnly": false,
//!     "Authentication": { "Server": "10.0.0.1:1812", "Secret": "s3cr3t" },
//!     "Accounting":     { "Server": "10.0.0.1:1813", "Secret": "s3cr3t" }
//!   }
//! }
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RadiusError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/openvpn/plugin/config.json";
pub const DEFAULT_DATABASE_PATH: &str = "/etc/openvpn/plugin/db/ovpn-radius.db";
pub const DEFAULT_RADCLIENT_PATH: &str = "/usr/bin/radclient";
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub log_file: PathBuf,
    pub server_info: ServerInfo,
    pub radius: RadiusConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "default_radclient_path")]
    pub radclient_path: PathBuf,
}

/// NAS attributes describing this OpenVPN server to the RADIUS peer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerInfo {
    pub identifier: String,
    pub ip_address: String,
    pub port_type: String,
    pub service_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RadiusConfig {
    /// Skip session record creation after a successful Access-Accept.
    #[serde(default)]
    pub authentication_only: bool,
    pub authentication: RadiusServer,
    pub accounting: RadiusServer,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RadiusServer {
    pub server: String,
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_radclient_path() -> PathBuf {
    PathBuf::from(DEFAULT_RADCLIENT_PATH)
}

fn default_lock_timeout_secs() -> u64 {
    DEFAULT_LOCK_TIMEOUT_SECS
}

impl Config {
    /// Reads, parses and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).map_err(|source| RadiusError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content).map_err(|err| match err {
            RadiusError::ConfigParse { source, .. } => RadiusError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(content).map_err(|source| RadiusError::ConfigParse {
                path: PathBuf::new(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.log_file.as_os_str().is_empty() {
            return Err(RadiusError::ConfigInvalid("LogFile is empty".to_string()));
        }
        for (name, server) in [
            ("Authentication", &self.radius.authentication),
            ("Accounting", &self.radius.accounting),
        ] {
            if server.server.trim().is_empty() {
                return Err(RadiusError::ConfigInvalid(format!(
                    "Radius.{name}.Server is empty"
                )));
            }
            if server.secret.is_empty() {
                return Err(RadiusError::ConfigInvalid(format!(
                    "Radius.{name}.Secret is empty"
                )));
            }
        }
        if self.database.lock_timeout_secs == 0 {
            return Err(RadiusError::ConfigInvalid(
                "Database.LockTimeoutSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Lock file guarding store writers, kept next to the database.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.database.path.clone().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}

#[cfg(test)]
pub(crate) fn test_config(db_path: &Path) -> Config {
    Config {
        log_file: PathBuf::from("/tmp/ovpn-radius-test.log"),
        server_info: ServerInfo {
            identifier: "OpenVPN".to_string(),
            ip_address: "192.168.1.12".to_string(),
            port_type: "5".to_string(),
            service_type: "5".to_string(),
        },
        radius: RadiusConfig {
            authentication_only: false,
            authentication: RadiusServer {
                server: "10.0.0.1:1812".to_string(),
                secret: "s3cr3t".to_string(),
            },
            accounting: RadiusServer {
                server: "10.0.0.1:1813".to_string(),
                secret: "s3cr3t".to_string(),
            },
        },
        database: DatabaseConfig {
            path: db_path.to_path_buf(),
            lock_timeout_secs: 2,
        },
        radclient_path: default_radclient_path(),
    }
}
