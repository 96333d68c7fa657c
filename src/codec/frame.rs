//! Length-prefixed frame transport codec
//!
//! Wire layout, all little-endian:
//!
//! ```text
//! offset 0..4   length     payload byte count (header excluded)
//! offset 4..8   packet_id
//! offset 8..    payload    `length` bytes
//! ```
//!
//! `FrameParser` reassembles a byte stream fed in arbitrary chunks into
//! discrete frames. A declared length above [`MAX_PAYLOAD_LEN`] means the
//! stream's byte alignment cannot be trusted anymore, so the whole buffer is
//! discarded.

use bytes::{Buf, BytesMut};
use tracing::warn;

/// Frame header size: length (4) + packet id (4)
pub const HEADER_SIZE: usize = 8;

/// Maximum accepted payload length (~1.6 GiB)
///
/// A frame declaring more signals a corrupted or desynchronized stream.
pub const MAX_PAYLOAD_LEN: u32 = 1_677_721_600;

/// A fully reassembled frame
///
/// The payload is an independently owned copy; it stays valid across later
/// `feed`/`next_frame` calls and never aliases the reassembly buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_id: u32,
    pub payload: Vec<u8>,
}

/// Encode a frame: 8-byte header followed by the payload
pub fn encode_frame(packet_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&packet_id.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Incremental frame reassembler for one stream direction
///
/// Owns its buffer exclusively; feed bytes as they arrive and drain complete
/// frames with [`FrameParser::next_frame`].
pub struct FrameParser {
    buffer: BytesMut,
    corrupted: u64,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            corrupted: 0,
        }
    }

    /// Append incoming bytes to the reassembly buffer
    ///
    /// Never blocks, never fails; absorbs input up to memory limits.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Extract the next complete frame, if one is buffered
    ///
    /// Returns `None` while fewer than `8 + length` bytes are available. If
    /// the header declares a payload above [`MAX_PAYLOAD_LEN`], the buffer is
    /// cleared entirely (the stream cannot be resynchronized byte-wise) and
    /// `None` is returned; a subsequent valid frame parses normally.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.buffer.len() < HEADER_SIZE {
            return None;
        }

        let length = u32::from_le_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]);
        let packet_id = u32::from_le_bytes([
            self.buffer[4],
            self.buffer[5],
            self.buffer[6],
            self.buffer[7],
        ]);

        if length > MAX_PAYLOAD_LEN {
            warn!(
                length,
                buffered = self.buffer.len(),
                "frame length exceeds maximum, discarding buffer"
            );
            self.corrupted += 1;
            self.buffer.clear();
            return None;
        }

        let total = HEADER_SIZE + length as usize;
        if self.buffer.len() < total {
            return None;
        }

        let payload = self.buffer[HEADER_SIZE..total].to_vec();
        self.buffer.advance(total);
        Some(Frame { packet_id, payload })
    }

    /// Discard all buffered bytes (corruption or connection restart)
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes currently awaiting reassembly
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of oversized headers seen since creation
    pub fn corrupted_frames(&self) -> u64 {
        self.corrupted
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_known_vector() {
        // length=4, id=123, payload "test"
        let bytes = encode_frame(123, b"test");
        assert_eq!(
            bytes,
            vec![0x04, 0x00, 0x00, 0x00, 0x7B, 0x00, 0x00, 0x00, b't', b'e', b's', b't']
        );
    }

    #[test]
    fn encode_empty_payload() {
        let bytes = encode_frame(7, b"");
        assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn parse_whole_frame_at_once() {
        let mut parser = FrameParser::new();
        parser.feed(&encode_frame(123, b"test"));

        let frame = parser.next_frame().expect("frame");
        assert_eq!(frame.packet_id, 123);
        assert_eq!(frame.payload, b"test");
        assert_eq!(parser.buffered(), 0);
        assert!(parser.next_frame().is_none());
    }

    #[test]
    fn parse_one_byte_at_a_time() {
        let bytes = encode_frame(99, b"payload");
        let mut parser = FrameParser::new();

        for (i, &byte) in bytes.iter().enumerate() {
            // No frame may appear before the final byte
            assert!(parser.next_frame().is_none(), "early frame at byte {}", i);
            parser.feed(&[byte]);
        }

        let frame = parser.next_frame().expect("frame");
        assert_eq!(frame.packet_id, 99);
        assert_eq!(frame.payload, b"payload");
    }

    #[test]
    fn parse_multiple_frames_in_one_feed() {
        let mut bytes = encode_frame(1, b"a");
        bytes.extend_from_slice(&encode_frame(2, b"bb"));
        bytes.extend_from_slice(&encode_frame(3, b""));

        let mut parser = FrameParser::new();
        parser.feed(&bytes);

        assert_eq!(parser.next_frame().unwrap().packet_id, 1);
        let second = parser.next_frame().unwrap();
        assert_eq!(second.packet_id, 2);
        assert_eq!(second.payload, b"bb");
        let third = parser.next_frame().unwrap();
        assert_eq!(third.packet_id, 3);
        assert!(third.payload.is_empty());
        assert!(parser.next_frame().is_none());
    }

    #[test]
    fn partial_header_waits() {
        let mut parser = FrameParser::new();
        parser.feed(&[0x04, 0x00, 0x00]);
        assert!(parser.next_frame().is_none());
        assert_eq!(parser.buffered(), 3);
    }

    #[test]
    fn oversized_length_clears_buffer() {
        let mut parser = FrameParser::new();
        let bad = (MAX_PAYLOAD_LEN + 1).to_le_bytes();
        parser.feed(&bad);
        parser.feed(&42u32.to_le_bytes());
        parser.feed(b"garbage that will never complete");

        assert!(parser.next_frame().is_none());
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.corrupted_frames(), 1);

        // A fresh valid frame parses with no residual corruption state
        parser.feed(&encode_frame(5, b"ok"));
        let frame = parser.next_frame().expect("frame after recovery");
        assert_eq!(frame.packet_id, 5);
        assert_eq!(frame.payload, b"ok");
    }

    #[test]
    fn payload_survives_later_feeds() {
        let mut parser = FrameParser::new();
        parser.feed(&encode_frame(1, b"first"));
        let frame = parser.next_frame().unwrap();

        // Mutating the parser afterwards must not touch the extracted payload
        parser.feed(&encode_frame(2, b"second"));
        let _ = parser.next_frame().unwrap();
        parser.feed(&[0xFF; 64]);
        parser.reset();

        assert_eq!(frame.payload, b"first");
    }

    #[test]
    fn reset_discards_partial_data() {
        let mut parser = FrameParser::new();
        parser.feed(&encode_frame(1, b"abc")[..6]);
        parser.reset();
        assert_eq!(parser.buffered(), 0);

        parser.feed(&encode_frame(9, b"xyz"));
        assert_eq!(parser.next_frame().unwrap().packet_id, 9);
    }

    proptest! {
        #[test]
        fn prop_reassembly_chunk_invariant(
            packet_id in any::<u32>(),
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            chunk in 1usize..16,
        ) {
            let bytes = encode_frame(packet_id, &payload);

            // All at once
            let mut whole = FrameParser::new();
            whole.feed(&bytes);
            let a = whole.next_frame().expect("whole frame");

            // In fixed-size chunks
            let mut split = FrameParser::new();
            for piece in bytes.chunks(chunk) {
                split.feed(piece);
            }
            let b = split.next_frame().expect("chunked frame");

            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.packet_id, packet_id);
            prop_assert_eq!(a.payload, payload);
        }
    }
}
