//! ---
//! udap_section: "01-core-functionality"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "Shared configuration and logging primitives."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Standard UDAP port.
pub const DEFAULT_UDAP_PORT: u16 = 17784;

/// Smallest datagram that can hold a packet header.
const MIN_RECV_BUFFER: usize = 27;

fn default_interface() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_broadcast() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

fn default_port() -> u16 {
    DEFAULT_UDAP_PORT
}

fn default_discover_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_request_timeout() -> Duration {
    Duration::from_millis(500)
}

fn default_recv_buffer() -> usize {
    1024
}

/// Top-level configuration for UDAP tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "UDAP_CONFIG";

    /// Load configuration from disk, respecting the `UDAP_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from `UDAP_CONFIG` or the first existing candidate.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Some(path) = Self::env_path() {
            let config = Self::from_path(&path)?;
            return Ok(LoadedAppConfig {
                config,
                source: Some(path),
            });
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Like [`AppConfig::load_with_source`] but falls back to defaults when
    /// neither the override nor any candidate exists.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        let found = Self::env_path().is_some() || candidates.iter().any(|c| c.as_ref().exists());
        if found {
            return Self::load_with_source(candidates);
        }
        debug!("no configuration file found, using defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn env_path() -> Option<PathBuf> {
        std::env::var(Self::ENV_CONFIG_PATH)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Where and how UDAP datagrams are exchanged.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Local IPv4 address of the interface used to send broadcasts.
    #[serde(default = "default_interface")]
    pub interface: Ipv4Addr,
    #[serde(default = "default_broadcast")]
    pub broadcast: Ipv4Addr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_discover_timeout", rename = "discover_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub discover_timeout: Duration,
    #[serde(default = "default_request_timeout", rename = "request_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
    #[serde(default = "default_recv_buffer")]
    pub recv_buffer: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            broadcast: default_broadcast(),
            port: default_port(),
            discover_timeout: default_discover_timeout(),
            request_timeout: default_request_timeout(),
            recv_buffer: default_recv_buffer(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("network.port must be non-zero"));
        }
        if self.discover_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(anyhow!("network timeouts must be greater than zero"));
        }
        if self.recv_buffer < MIN_RECV_BUFFER {
            return Err(anyhow!(
                "network.recv_buffer must hold at least {MIN_RECV_BUFFER} bytes"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log file. No file is written when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.network.port, 17784);
        assert_eq!(config.network.request_timeout, Duration::from_millis(500));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn network_section_overrides() {
        let config: AppConfig = r#"
            [network]
            interface = "192.168.1.10"
            broadcast = "192.168.1.255"
            discover_timeout_ms = 1500

            [logging]
            format = "structured-json"
            directory = "target/logs"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.network.interface, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(config.network.broadcast, Ipv4Addr::new(192, 168, 1, 255));
        assert_eq!(config.network.discover_timeout, Duration::from_millis(1500));
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert_eq!(config.logging.directory, Some(PathBuf::from("target/logs")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!("[network]\nport = 0".parse::<AppConfig>().is_err());
        assert!("[network]\nrequest_timeout_ms = 0".parse::<AppConfig>().is_err());
        assert!("[network]\nrecv_buffer = 8".parse::<AppConfig>().is_err());
    }

    #[test]
    fn load_picks_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("udap.toml");
        fs::write(&present, "[network]\nport = 17785\n").unwrap();

        let loaded = AppConfig::load_with_source(&[&missing, &present]).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(present.as_path()));
        assert_eq!(loaded.config.network.port, 17785);
    }

    #[test]
    fn load_or_default_without_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let loaded = AppConfig::load_or_default(&[&missing]).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config, AppConfig::default());
        assert!(AppConfig::load(&[&missing]).is_err());
    }
}
