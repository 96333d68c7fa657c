//! packet-tap - wire-format codec and intercepting relay
//!
//! Library half of the `pkt-tap` binary. The codec modules implement the
//! game's wire primitives (varints, the generic record layout, length-prefixed
//! frames); the relay forwards live traffic between a client and the real
//! server while parsing frames for observability only.

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod relay;
