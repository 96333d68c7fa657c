//! TCP stream relay
//!
//! Accept loop plus one session per connection. Each session dials the
//! upstream server, splits both streams, and runs one forwarding task per
//! direction. Bytes are written through before the copy is parsed, so the
//! tunnel stays transparent even when the protocol state is corrupt.
//!
//! Frame reassembly state is per direction; interleaving of the two streams
//! can never corrupt either parser.

use super::{log_frames, Direction};
use crate::codec::frame::FrameParser;
use crate::config::Config;
use crate::constants::{READ_BUFFER_SIZE, STREAM_POLL_TIMEOUT_MS};
use crate::error::{Result, TapError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Accept game clients and relay each to the upstream server
pub async fn run(config: &Config, shutdown: Arc<AtomicBool>) -> Result<()> {
    let port = config.relay.listen_port;
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| TapError::TcpBind { port, source: e })?;

    info!(
        port,
        upstream = %config.relay.upstream_addr(),
        "TCP relay listening"
    );

    while !shutdown.load(Ordering::Relaxed) {
        // Short accept timeout so the shutdown flag is observed promptly
        match timeout(
            Duration::from_millis(STREAM_POLL_TIMEOUT_MS),
            listener.accept(),
        )
        .await
        {
            Ok(Ok((stream, peer))) => {
                info!(%peer, "client connected");
                let upstream_addr = config.relay.upstream_addr();
                let preview = config.logs.preview_bytes;
                let session_shutdown = shutdown.clone();
                tokio::spawn(async move {
                    match run_session(stream, peer, &upstream_addr, preview, session_shutdown)
                        .await
                    {
                        Ok(()) => info!(%peer, "session closed"),
                        Err(e) => warn!(%peer, error = %e, "session failed"),
                    }
                });
            }
            Ok(Err(e)) => warn!(error = %e, "accept failed"),
            Err(_) => {}
        }
    }

    info!("TCP relay stopped");
    Ok(())
}

/// Relay one client connection until either side closes
async fn run_session(
    client: TcpStream,
    peer: SocketAddr,
    upstream_addr: &str,
    preview: usize,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let upstream = TcpStream::connect(upstream_addr)
        .await
        .map_err(|e| TapError::UpstreamConnect {
            addr: upstream_addr.to_string(),
            source: e,
        })?;
    debug!(%peer, upstream = upstream_addr, "upstream connected");

    // The protocol is latency-sensitive; never batch small writes
    let _ = client.set_nodelay(true);
    let _ = upstream.set_nodelay(true);

    let (client_read, client_write) = client.into_split();
    let (upstream_read, upstream_write) = upstream.into_split();

    let mut up = tokio::spawn(forward(
        client_read,
        upstream_write,
        Direction::ClientToUpstream,
        preview,
        shutdown.clone(),
    ));
    let mut down = tokio::spawn(forward(
        upstream_read,
        client_write,
        Direction::UpstreamToClient,
        preview,
        shutdown,
    ));

    // Either direction ending tears down the whole session
    tokio::select! {
        r = &mut up => {
            down.abort();
            let _ = r;
        }
        r = &mut down => {
            up.abort();
            let _ = r;
        }
    }

    Ok(())
}

/// Copy bytes one way, feeding a parser copy for frame logging
///
/// Forwarding happens before parsing; a malformed stream keeps flowing even
/// while its frames fail to reassemble.
async fn forward<R, W>(
    mut reader: R,
    mut writer: W,
    direction: Direction,
    preview: usize,
    shutdown: Arc<AtomicBool>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut parser = FrameParser::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    while !shutdown.load(Ordering::Relaxed) {
        let n = match timeout(
            Duration::from_millis(STREAM_POLL_TIMEOUT_MS),
            reader.read(&mut buf),
        )
        .await
        {
            Ok(Ok(0)) => {
                debug!(%direction, "stream closed");
                break;
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                debug!(%direction, error = %e, "read failed");
                break;
            }
            Err(_) => continue,
        };

        if let Err(e) = writer.write_all(&buf[..n]).await {
            debug!(%direction, error = %e, "write failed");
            break;
        }

        log_frames(&mut parser, &buf[..n], direction, preview);
    }

    if parser.corrupted_frames() > 0 {
        warn!(
            %direction,
            corrupted = parser.corrupted_frames(),
            "stream carried oversized frame headers"
        );
    }
    let _ = writer.shutdown().await;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::frame::encode_frame;
    use std::sync::atomic::AtomicBool;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_forward_copies_bytes_through() {
        let (client, mut client_far) = duplex(1024);
        let (upstream, mut upstream_far) = duplex(1024);
        let shutdown = Arc::new(AtomicBool::new(false));

        let (read_half, _keep_write) = tokio::io::split(client);
        let (_keep_read, write_half) = tokio::io::split(upstream);
        let task = tokio::spawn(forward(
            read_half,
            write_half,
            Direction::ClientToUpstream,
            32,
            shutdown.clone(),
        ));

        let bytes = encode_frame(42, b"ping");
        client_far.write_all(&bytes).await.unwrap();

        let mut received = vec![0u8; bytes.len()];
        upstream_far.read_exact(&mut received).await.unwrap();
        assert_eq!(received, bytes);

        shutdown.store(true, Ordering::Relaxed);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_forward_passes_garbage_unmodified() {
        // Bytes that are not valid frames must still flow through untouched
        let (client, mut client_far) = duplex(1024);
        let (upstream, mut upstream_far) = duplex(1024);
        let shutdown = Arc::new(AtomicBool::new(false));

        let (read_half, _keep_write) = tokio::io::split(client);
        let (_keep_read, write_half) = tokio::io::split(upstream);
        let task = tokio::spawn(forward(
            read_half,
            write_half,
            Direction::UpstreamToClient,
            32,
            shutdown.clone(),
        ));

        let garbage = [0xDEu8, 0xAD, 0xBE, 0xEF, 0x01, 0x02];
        client_far.write_all(&garbage).await.unwrap();

        let mut received = vec![0u8; garbage.len()];
        upstream_far.read_exact(&mut received).await.unwrap();
        assert_eq!(received, garbage);

        shutdown.store(true, Ordering::Relaxed);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_forward_stops_on_eof() {
        let (client, client_far) = duplex(1024);
        let (upstream, _upstream_far) = duplex(1024);
        let shutdown = Arc::new(AtomicBool::new(false));

        let (read_half, _keep_write) = tokio::io::split(client);
        let (_keep_read, write_half) = tokio::io::split(upstream);
        let task = tokio::spawn(forward(
            read_half,
            write_half,
            Direction::ClientToUpstream,
            32,
            shutdown,
        ));

        drop(client_far);
        // Task must end on its own without the shutdown flag
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("forward task did not stop on EOF")
            .unwrap();
    }
}
