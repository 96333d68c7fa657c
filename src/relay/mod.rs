//! Transport relays
//!
//! The relay sits between the game client and the real server, forwarding
//! bytes unmodified in both directions while decoding a copy of the traffic
//! for logging. Observation never alters, delays, or filters what passes
//! through.
//!
//! Two modes, selected by configuration: the TCP relay reassembles and logs
//! protocol frames per connection, the UDP relay shuttles whole datagrams
//! and sniffs their headers.

use crate::codec::frame::FrameParser;
use crate::config::{Config, Transport};
use crate::error::Result;
use std::fmt;
use std::fmt::Write as _;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

pub mod tcp;
pub mod udp;

/// Which way traffic is flowing through the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToUpstream,
    UpstreamToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientToUpstream => write!(f, "client->upstream"),
            Self::UpstreamToClient => write!(f, "upstream->client"),
        }
    }
}

/// Run the relay selected by the configuration until the shutdown flag trips
pub async fn run(config: Config, shutdown: Arc<AtomicBool>) -> Result<()> {
    match config.relay.transport {
        Transport::Tcp => tcp::run(&config, shutdown).await,
        Transport::Udp => udp::run(&config, shutdown).await,
    }
}

/// Hex dump of the first `limit` bytes, with a count of what was elided
pub(crate) fn hex_preview(data: &[u8], limit: usize) -> String {
    let shown = data.len().min(limit);
    let mut out = String::with_capacity(shown * 3 + 12);
    for (i, byte) in data[..shown].iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // Writing hex into a String cannot fail
        let _ = write!(out, "{:02X}", byte);
    }
    if data.len() > shown {
        let _ = write!(out, " (+{} more)", data.len() - shown);
    }
    out
}

/// Feed forwarded bytes to a direction's parser and log every completed frame
pub(crate) fn log_frames(
    parser: &mut FrameParser,
    data: &[u8],
    direction: Direction,
    preview: usize,
) {
    parser.feed(data);
    while let Some(frame) = parser.next_frame() {
        debug!(
            %direction,
            packet_id = frame.packet_id,
            len = frame.payload.len(),
            payload = %hex_preview(&frame.payload, preview),
            "frame"
        );
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::frame::encode_frame;

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::ClientToUpstream.to_string(), "client->upstream");
        assert_eq!(Direction::UpstreamToClient.to_string(), "upstream->client");
    }

    #[test]
    fn test_hex_preview_short_payload() {
        assert_eq!(hex_preview(&[0x01, 0xAB, 0xFF], 32), "01 AB FF");
        assert_eq!(hex_preview(&[], 32), "");
    }

    #[test]
    fn test_hex_preview_elides_past_limit() {
        let data = [0u8; 40];
        let preview = hex_preview(&data, 4);
        assert_eq!(preview, "00 00 00 00 (+36 more)");
    }

    #[test]
    fn test_log_frames_drains_parser() {
        let mut parser = FrameParser::new();
        let mut bytes = encode_frame(1, b"a");
        bytes.extend_from_slice(&encode_frame(2, b"bb"));

        log_frames(&mut parser, &bytes, Direction::ClientToUpstream, 32);
        assert_eq!(parser.buffered(), 0);
    }
}
