//! Centralized error types for the relay
//!
//! All relay-level errors are represented by the `TapError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, TapError>`.
//! The codec modules carry their own error enums so truncation stays
//! distinguishable from corruption for streaming callers.

use std::fmt;
use std::path::PathBuf;

/// All relay errors
#[derive(Debug)]
pub enum TapError {
    // === Network ===
    /// Failed to bind the TCP listen socket
    TcpBind { port: u16, source: std::io::Error },
    /// Failed to connect to the upstream server (either transport)
    UpstreamConnect {
        addr: String,
        source: std::io::Error,
    },
    /// Failed to bind a UDP socket
    UdpBind { port: u16, source: std::io::Error },

    // === Config ===
    /// Failed to read a config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl std::error::Error for TapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TcpBind { source, .. }
            | Self::UpstreamConnect { source, .. }
            | Self::UdpBind { source, .. }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            Self::ConfigValidation { .. } => None,
        }
    }
}

impl fmt::Display for TapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TcpBind { port, .. } => write!(f, "Cannot bind TCP port {}", port),
            Self::UpstreamConnect { addr, .. } => {
                write!(f, "Cannot connect to upstream {}", addr)
            }
            Self::UdpBind { port, .. } => write!(f, "Cannot bind UDP port {}", port),
            Self::ConfigRead { path, .. } => {
                write!(f, "Cannot read config: {}", path.display())
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

/// Alias for Result with TapError
pub type Result<T> = std::result::Result<T, TapError>;
