//! Wire-format codecs
//!
//! Three layers, leaf-first: `varint` holds the variable-length integer and
//! string primitives used everywhere else, `record` implements the generic
//! nullable-bitfield record layout that every structured payload follows, and
//! `frame` is the length-prefixed transport envelope that reassembles a byte
//! stream into discrete packets.

pub mod frame;
pub mod record;
pub mod varint;
