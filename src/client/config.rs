//! Session configuration loaded from TOML

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::connection::{DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_HEARTBEAT_TIMEOUT_MS};
use crate::protocol::{ConnectionConfig, PROTOCOL_VERSION};
use crate::sync::manager::DEFAULT_PERIODIC_SYNC_TICKS;

fn default_protocol_version() -> i32 {
    PROTOCOL_VERSION
}

fn default_heartbeat_interval() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}

fn default_heartbeat_timeout() -> u64 {
    DEFAULT_HEARTBEAT_TIMEOUT_MS
}

fn default_periodic_sync_ticks() -> u64 {
    DEFAULT_PERIODIC_SYNC_TICKS
}

fn default_world_update_interval() -> u64 {
    10_000
}

fn default_player_sync_interval() -> u64 {
    100
}

fn default_world_request_interval() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level(), json_format: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_protocol_version")]
    pub protocol_version: i32,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Silence after which the remote peer is considered gone
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ms: u64,
    /// Fixed updates between periodic object syncs
    #[serde(default = "default_periodic_sync_ticks")]
    pub periodic_sync_ticks: u64,
    /// Host broadcast of time and weather
    #[serde(default = "default_world_update_interval")]
    pub world_update_interval_ms: u64,
    #[serde(default = "default_player_sync_interval")]
    pub player_sync_interval_ms: u64,
    /// Joiner re-asks for the world snapshot this often while loading
    #[serde(default = "default_world_request_interval")]
    pub world_request_interval_ms: u64,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            periodic_sync_ticks: default_periodic_sync_ticks(),
            world_update_interval_ms: default_world_update_interval(),
            player_sync_interval_ms: default_player_sync_interval(),
            world_request_interval_ms: default_world_request_interval(),
            logging: LoggingSettings::default(),
        }
    }
}

impl SessionConfig {
    /// `<config dir>/mscmp/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mscmp").join("config.toml"))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `path`, or the default location; a missing file means defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            protocol_version: self.protocol_version,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            heartbeat_timeout_ms: self.heartbeat_timeout_ms,
        }
    }
}
