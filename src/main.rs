//! pkt-tap - intercepting relay for the game wire protocol
//!
//! Usage:
//!   pkt-tap                          Relay TCP with config.toml defaults
//!   pkt-tap --transport udp          Relay UDP instead
//!   pkt-tap -v                       Log every forwarded frame
//!   pkt-tap --listen-port 6000 --upstream-host play.example.net

use anyhow::Result;
use clap::Parser;
use packet_tap::cli::Cli;
use packet_tap::{config, relay};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; the verbose flag only picks the fallback level
    let fallback = if cli.verbose {
        "packet_tap=debug,pkt_tap=debug"
    } else {
        "packet_tap=info,pkt_tap=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .init();

    let config = cli.apply(config::load(cli.config.as_deref()));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: config::Config) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).unwrap();
            let mut sigint =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).unwrap();

            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
            shutdown_clone.store(true, Ordering::SeqCst);
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown_clone.store(true, Ordering::SeqCst);
        });
    }

    relay::run(config, shutdown).await?;
    Ok(())
}
