//! Configuration management
//!
//! Config file is stored next to the executable as `config.toml`.
//! Every field has a default so a missing or partial file still yields a
//! usable configuration; CLI flags override whatever was loaded.

use crate::constants::{
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LISTEN_PORT, DEFAULT_PREVIEW_BYTES, DEFAULT_UPSTREAM_HOST,
    DEFAULT_UPSTREAM_PORT,
};
use crate::error::{Result, TapError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

// =============================================================================
// Transport Selection
// =============================================================================

/// Which transport the relay intercepts
///
/// The game speaks the same framed protocol over both; only the socket
/// handling differs. UDP mode never terminates the tunneled transport, it
/// just sniffs datagram headers for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Stream relay: one session per accepted connection
    #[default]
    Tcp,
    /// Datagram relay: single loop, one remembered client address
    Udp,
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Transport to intercept
    pub transport: Transport,

    /// Port to listen on for game clients
    pub listen_port: u16,

    /// Upstream (real) server host
    pub upstream_host: String,

    /// Upstream (real) server port
    pub upstream_port: u16,

    /// Idle-connection timeout in seconds
    ///
    /// Surfaced to session handling; the relay core itself does not enforce
    /// idle disconnection beyond what its reads naturally provide.
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Payload bytes shown per frame in hex previews
    pub preview_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp,
            listen_port: DEFAULT_LISTEN_PORT,
            upstream_host: DEFAULT_UPSTREAM_HOST.to_string(),
            upstream_port: DEFAULT_UPSTREAM_PORT,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            preview_bytes: DEFAULT_PREVIEW_BYTES,
        }
    }
}

impl RelayConfig {
    /// Upstream address as `host:port`
    pub fn upstream_addr(&self) -> String {
        format!("{}:{}", self.upstream_host, self.upstream_port)
    }
}

// =============================================================================
// Load / Save
// =============================================================================

/// Get the default config file path (config.toml next to the executable)
pub fn config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| TapError::ConfigRead {
        path: PathBuf::from("executable"),
        source: e,
    })?;
    let exe_dir = exe.parent().ok_or_else(|| TapError::ConfigValidation {
        field: "exe_path",
        reason: "no parent directory".into(),
    })?;
    Ok(exe_dir.join("config.toml"))
}

/// Load config from the given path (or the default location), falling back
/// to defaults on any error
pub fn load(path: Option<&Path>) -> Config {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to determine config path: {}, using defaults", e);
                return Config::default();
            }
        },
    };

    if !path.exists() {
        return Config::default();
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config parse error in {:?}: {}, using defaults", path, e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config {:?}: {}, using defaults", path, e);
            Config::default()
        }
    }
}

/// Save config to file
pub fn save(config: &Config, path: &Path) -> Result<()> {
    // Config is always serializable (all fields are serde-compatible)
    let content = toml::to_string_pretty(config).expect("Config serialization failed");
    fs::write(path, content).map_err(|e| TapError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
