//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Network
// =============================================================================

/// Default port the relay listens on for game clients
pub const DEFAULT_LISTEN_PORT: u16 = 5520;

/// Default upstream server host
pub const DEFAULT_UPSTREAM_HOST: &str = "127.0.0.1";

/// Default upstream server port
pub const DEFAULT_UPSTREAM_PORT: u16 = 5521;

// =============================================================================
// Timing
// =============================================================================

/// Readiness poll timeout for the datagram relay loop (milliseconds)
pub const POLL_TIMEOUT_MS: u64 = 10;

/// Accept/read poll timeout for the stream relay (milliseconds)
///
/// Short enough that the shutdown flag is observed promptly.
pub const STREAM_POLL_TIMEOUT_MS: u64 = 100;

/// Default idle-connection timeout surfaced to session handling (seconds)
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Retry
// =============================================================================

/// Maximum socket bind retry attempts
pub const MAX_SOCKET_RETRY_ATTEMPTS: u32 = 5;

/// Base delay between retry attempts (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 200;

// =============================================================================
// Buffers
// =============================================================================

/// TCP read buffer size per direction
pub const READ_BUFFER_SIZE: usize = 4096;

/// UDP receive buffer size (large enough for any datagram)
pub const UDP_BUFFER_SIZE: usize = 65536;

// =============================================================================
// Logging
// =============================================================================

/// Default number of payload bytes shown in frame log previews
pub const DEFAULT_PREVIEW_BYTES: usize = 32;
