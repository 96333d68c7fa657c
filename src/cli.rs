//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.
//! Flags override values loaded from the config file.

use crate::config::{Config, Transport};
use clap::Parser;
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Intercepting relay for the game wire protocol
#[derive(Parser, Debug, Default)]
#[command(name = "pkt-tap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output (per-frame logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to config file (default: config.toml next to the executable)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Port to listen on for game clients (overrides config)
    #[arg(long, value_name = "PORT")]
    pub listen_port: Option<u16>,

    /// Upstream server host (overrides config)
    #[arg(long, value_name = "HOST")]
    pub upstream_host: Option<String>,

    /// Upstream server port (overrides config)
    #[arg(long, value_name = "PORT")]
    pub upstream_port: Option<u16>,

    /// Transport to intercept (overrides config)
    #[arg(long, value_enum)]
    pub transport: Option<Transport>,
}

impl Cli {
    /// Apply CLI overrides on top of a loaded config
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(port) = self.listen_port {
            config.relay.listen_port = port;
        }
        if let Some(ref host) = self.upstream_host {
            config.relay.upstream_host = host.clone();
        }
        if let Some(port) = self.upstream_port {
            config.relay.upstream_port = port;
        }
        if let Some(transport) = self.transport {
            config.relay.transport = transport;
        }
        config
    }
}

// =============================================================================
// Tests
// =============================================================================
