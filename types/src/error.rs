//! Top-level error type shared across crates.

use thiserror::Error;

/// Parsing and decoding errors for the shared value types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FairdrawError {
    #[error("hash function not supported: {0}")]
    UnsupportedHashFunction(String),

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("invalid length for {what}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unknown draw status: {0}")]
    UnknownStatus(String),

    #[error("{0}")]
    Other(String),
}
