//! Variable-length integer and string primitives
//!
//! A varint is a signed 32-bit value reinterpreted as unsigned and encoded
//! 7 bits per byte, least-significant group first, with the top bit of each
//! byte flagging continuation. Maximum 5 bytes. A varstring is a varint
//! byte-length followed by that many raw bytes.
//!
//! Pure functions over byte buffers; no I/O. Decoding signals "need more
//! data" distinctly from malformed input so streaming callers can keep
//! buffering.

use std::fmt;

/// Maximum encoded length of a varint (5 * 7 bits covers 32)
pub const MAX_VARINT_LEN: usize = 5;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The buffer ends mid-encoding (continuation bit set on the last byte)
    Incomplete,
    /// More than 5 continuation bytes: not a valid 32-bit varint
    TooLong,
}

impl fmt::Display for VarintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => write!(f, "varint incomplete, need more bytes"),
            Self::TooLong => write!(f, "varint exceeds {} bytes", MAX_VARINT_LEN),
        }
    }
}

impl std::error::Error for VarintError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarstringError {
    /// The length prefix itself is cut short
    Incomplete,
    /// The prefix decoded but fewer than `needed` payload bytes remain
    Truncated { needed: usize, have: usize },
    /// The length prefix decoded below zero
    NegativeLength(i32),
    /// The length prefix is not a valid varint
    BadPrefix,
}

impl fmt::Display for VarstringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => write!(f, "varstring length prefix incomplete"),
            Self::Truncated { needed, have } => {
                write!(f, "varstring truncated: need {} bytes, have {}", needed, have)
            }
            Self::NegativeLength(len) => write!(f, "varstring length is negative: {}", len),
            Self::BadPrefix => write!(f, "varstring length prefix is malformed"),
        }
    }
}

impl std::error::Error for VarstringError {}

// =============================================================================
// Varint
// =============================================================================

/// Number of bytes the canonical encoding of `value` occupies
pub fn varint_len(value: i32) -> usize {
    let mut v = value as u32;
    let mut len = 1;
    while v >= 0x80 {
        v >>= 7;
        len += 1;
    }
    len
}

/// Append the canonical (shortest) encoding of `value` to `out`
pub fn encode_varint(value: i32, out: &mut Vec<u8>) {
    let mut v = value as u32;
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Decode a varint from the front of `buf`
///
/// Returns the value and the number of bytes consumed. Tolerates any valid
/// encoding, canonical or not.
pub fn decode_varint(buf: &[u8]) -> Result<(i32, usize), VarintError> {
    let mut value: u32 = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(VarintError::TooLong);
        }
        value |= u32::from(byte & 0x7F) << (7 * i as u32);
        if byte & 0x80 == 0 {
            return Ok((value as i32, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(VarintError::TooLong)
    } else {
        Err(VarintError::Incomplete)
    }
}

// =============================================================================
// Varstring
// =============================================================================

/// Append a varint length prefix followed by the raw bytes of `data`
pub fn encode_varstring(data: &[u8], out: &mut Vec<u8>) {
    encode_varint(data.len() as i32, out);
    out.extend_from_slice(data);
}

/// Decode a varstring from the front of `buf`
///
/// Returns the payload slice and the total number of bytes consumed
/// (prefix included). No encoding validation beyond the length.
pub fn decode_varstring(buf: &[u8]) -> Result<(&[u8], usize), VarstringError> {
    let (len, prefix) = decode_varint(buf).map_err(|e| match e {
        VarintError::Incomplete => VarstringError::Incomplete,
        VarintError::TooLong => VarstringError::BadPrefix,
    })?;
    if len < 0 {
        return Err(VarstringError::NegativeLength(len));
    }
    let len = len as usize;
    if buf.len() < prefix + len {
        return Err(VarstringError::Truncated {
            needed: len,
            have: buf.len() - prefix,
        });
    }
    Ok((&buf[prefix..prefix + len], prefix + len))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(value, &mut out);
        out
    }

    #[test]
    fn encode_single_byte_values() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(1), vec![0x01]);
        assert_eq!(encoded(127), vec![0x7F]);
    }

    #[test]
    fn encode_multi_byte_values() {
        assert_eq!(encoded(128), vec![0x80, 0x01]);
        assert_eq!(encoded(300), vec![0xAC, 0x02]);
        assert_eq!(encoded(16384), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn encode_negative_uses_five_bytes() {
        // -1 reinterprets as u32::MAX
        assert_eq!(encoded(-1), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(encoded(i32::MIN), vec![0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn varint_len_matches_encoding() {
        for v in [0, 1, 127, 128, 300, 16384, i32::MAX, -1, i32::MIN] {
            assert_eq!(varint_len(v), encoded(v).len(), "value {}", v);
        }
    }

    #[test]
    fn decode_boundary_values() {
        for v in [0, 1, 127, 128, 16383, 16384, i32::MAX, -1, i32::MIN] {
            let bytes = encoded(v);
            assert_eq!(decode_varint(&bytes), Ok((v, bytes.len())), "value {}", v);
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut bytes = encoded(300);
        let len = bytes.len();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(decode_varint(&bytes), Ok((300, len)));
    }

    #[test]
    fn decode_tolerates_non_canonical_encoding() {
        // 0 padded with a continuation byte
        assert_eq!(decode_varint(&[0x80, 0x00]), Ok((0, 2)));
        // 1 padded to three bytes
        assert_eq!(decode_varint(&[0x81, 0x80, 0x00]), Ok((1, 3)));
    }

    #[test]
    fn decode_incomplete() {
        assert_eq!(decode_varint(&[]), Err(VarintError::Incomplete));
        assert_eq!(decode_varint(&[0x80]), Err(VarintError::Incomplete));
        assert_eq!(
            decode_varint(&[0xFF, 0xFF, 0xFF, 0xFF]),
            Err(VarintError::Incomplete)
        );
    }

    #[test]
    fn decode_too_long() {
        // Five continuation bytes and counting
        assert_eq!(
            decode_varint(&[0x80, 0x80, 0x80, 0x80, 0x80]),
            Err(VarintError::TooLong)
        );
        assert_eq!(
            decode_varint(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00]),
            Err(VarintError::TooLong)
        );
    }

    #[test]
    fn varstring_roundtrip() {
        for s in [&b""[..], b"hi", b"hello world", &[0u8; 200]] {
            let mut out = Vec::new();
            encode_varstring(s, &mut out);
            let (decoded, consumed) = decode_varstring(&out).unwrap();
            assert_eq!(decoded, s);
            assert_eq!(consumed, out.len());
        }
    }

    #[test]
    fn varstring_layout() {
        let mut out = Vec::new();
        encode_varstring(b"hi", &mut out);
        assert_eq!(out, vec![0x02, b'h', b'i']);
    }

    #[test]
    fn varstring_truncated() {
        // Claims 5 bytes but only carries 2
        let buf = [0x05, b'h', b'i'];
        assert_eq!(
            decode_varstring(&buf),
            Err(VarstringError::Truncated { needed: 5, have: 2 })
        );
    }

    #[test]
    fn varstring_incomplete_prefix() {
        assert_eq!(decode_varstring(&[]), Err(VarstringError::Incomplete));
        assert_eq!(decode_varstring(&[0x80]), Err(VarstringError::Incomplete));
    }

    #[test]
    fn varstring_negative_length() {
        let mut buf = Vec::new();
        encode_varint(-1, &mut buf);
        assert_eq!(
            decode_varstring(&buf),
            Err(VarstringError::NegativeLength(-1))
        );
    }

    proptest! {
        #[test]
        fn prop_varint_roundtrip(v in any::<i32>()) {
            let bytes = encoded(v);
            prop_assert!(bytes.len() <= MAX_VARINT_LEN);
            prop_assert_eq!(decode_varint(&bytes), Ok((v, bytes.len())));
        }

        #[test]
        fn prop_varstring_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut out = Vec::new();
            encode_varstring(&data, &mut out);
            let (decoded, consumed) = decode_varstring(&out).unwrap();
            prop_assert_eq!(decoded, &data[..]);
            prop_assert_eq!(consumed, out.len());
        }
    }
}
