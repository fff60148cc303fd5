//! Error types for the byte codec and message framing layer.

use thiserror::Error;

/// Failures raised by the byte codec and message framing layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A write did not fit in the remaining capacity of the destination buffer.
    #[error("buffer overflow: needed {needed} bytes, {available} available")]
    BufferOverflow {
        /// bytes required by the write
        needed: usize,
        /// bytes remaining in the destination
        available: usize,
    },

    /// A read ran past the end of the source buffer.
    #[error("insufficient data: needed {needed} bytes, {available} available")]
    InsufficientData {
        /// bytes required by the read
        needed: usize,
        /// bytes remaining in the source
        available: usize,
    },

    /// The bytes read do not form a valid value of the expected shape
    /// (e.g. an array length not divisible by its element size, a missing
    /// string terminator).
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// The SOME/IP header failed structural validation (§4.2).
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Result alias used throughout the wire codec.
pub type Result<T> = std::result::Result<T, WireError>;
