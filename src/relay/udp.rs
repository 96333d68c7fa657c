//! UDP datagram relay
//!
//! Single loop alternating short readiness polls between the listen socket
//! and the upstream socket. Datagrams are forwarded whole and unmodified;
//! only the first header byte is sniffed to classify the tunneled transport
//! for logging.
//!
//! One client address is remembered, the most recent sender on the listen
//! socket. Upstream datagrams that arrive before any client has spoken are
//! dropped. A second client taking over mid-session simply steals the
//! return path.

use super::Direction;
use crate::config::Config;
use crate::constants::{
    MAX_SOCKET_RETRY_ATTEMPTS, POLL_TIMEOUT_MS, RETRY_BASE_DELAY_MS, UDP_BUFFER_SIZE,
};
use crate::error::{Result, TapError};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Relay datagrams between one game client and the upstream server
pub async fn run(config: &Config, shutdown: Arc<AtomicBool>) -> Result<()> {
    let port = config.relay.listen_port;
    let listen = bind_reusable_udp(port)?;

    let upstream = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| TapError::UdpBind { port: 0, source: e })?;
    let upstream_addr = config.relay.upstream_addr();
    upstream
        .connect(&upstream_addr)
        .await
        .map_err(|e| TapError::UpstreamConnect {
            addr: upstream_addr.clone(),
            source: e,
        })?;

    info!(port, upstream = %upstream_addr, "UDP relay listening");

    let mut client: Option<SocketAddr> = None;
    let mut buf = vec![0u8; UDP_BUFFER_SIZE];
    let poll = Duration::from_millis(POLL_TIMEOUT_MS);

    while !shutdown.load(Ordering::Relaxed) {
        // Client side
        match timeout(poll, listen.recv_from(&mut buf)).await {
            Ok(Ok((len, addr))) => {
                if client != Some(addr) {
                    info!(%addr, "tracking client");
                    client = Some(addr);
                }
                debug!(
                    direction = %Direction::ClientToUpstream,
                    len,
                    kind = describe_datagram(&buf[..len]),
                    "datagram"
                );
                if let Err(e) = upstream.send(&buf[..len]).await {
                    warn!(error = %e, "upstream send failed");
                }
            }
            Ok(Err(e)) => debug!(error = %e, "listen recv failed"),
            Err(_) => {}
        }

        // Upstream side
        match timeout(poll, upstream.recv(&mut buf)).await {
            Ok(Ok(len)) => match client {
                Some(addr) => {
                    debug!(
                        direction = %Direction::UpstreamToClient,
                        len,
                        kind = describe_datagram(&buf[..len]),
                        "datagram"
                    );
                    if let Err(e) = listen.send_to(&buf[..len], addr).await {
                        warn!(error = %e, "client send failed");
                    }
                }
                None => debug!(len, "dropping upstream datagram, no client yet"),
            },
            Ok(Err(e)) => debug!(error = %e, "upstream recv failed"),
            Err(_) => {}
        }
    }

    info!("UDP relay stopped");
    Ok(())
}

/// Classify a datagram from its first header byte, for logging only
///
/// The tunneled transport marks long-header packets with the top bit and
/// carries the packet type in bits 4-5; short-header packets set only the
/// second bit.
pub(crate) fn describe_datagram(data: &[u8]) -> &'static str {
    let Some(&first) = data.first() else {
        return "empty";
    };
    if first & 0x80 != 0 {
        match (first >> 4) & 0x03 {
            0 => "long-header initial",
            1 => "long-header 0-rtt",
            2 => "long-header handshake",
            _ => "long-header retry",
        }
    } else if first & 0x40 != 0 {
        "short-header"
    } else {
        "unknown"
    }
}

/// Bind the listen socket with SO_REUSEADDR, retrying while a previous
/// instance's socket drains
fn bind_reusable_udp(port: u16) -> Result<UdpSocket> {
    let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], port));
    let map_err = |e| TapError::UdpBind { port, source: e };

    for attempt in 0..MAX_SOCKET_RETRY_ATTEMPTS {
        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(map_err)?;
        socket.set_reuse_address(true).map_err(map_err)?;
        socket.set_nonblocking(true).map_err(map_err)?;

        match socket.bind(&addr.into()) {
            Ok(()) => {
                let std_socket: std::net::UdpSocket = socket.into();
                return UdpSocket::from_std(std_socket).map_err(map_err);
            }
            Err(_) if attempt < MAX_SOCKET_RETRY_ATTEMPTS - 1 => {
                // Backoff: 200ms, 400ms, 800ms, 1600ms
                std::thread::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << attempt)));
            }
            Err(e) => return Err(map_err(e)),
        }
    }

    Err(TapError::UdpBind {
        port,
        source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "failed after retries"),
    })
}

// =============================================================================
// Tests
// =============================================================================
