//! Error type for segmentation and reassembly operations.

use thiserror::Error;

/// Failures raised by the TP segmenter and reassembler (§4.5, §4.6, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TpError {
    /// The message payload exceeds the configured maximum.
    #[error("message too large: {size} bytes exceeds maximum {max}")]
    MessageTooLarge {
        /// size that was rejected
        size: usize,
        /// configured maximum
        max: usize,
    },

    /// A reassembly buffer exceeded its timeout before completing.
    #[error("reassembly timeout for key {key}")]
    ReassemblyTimeout {
        /// debug-formatted reassembly key
        key: String,
    },

    /// Too many concurrent reassembly buffers are in flight.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A segment's declared total length conflicts with earlier segments,
    /// or its offset/length violate alignment rules.
    #[error("sequence error: {0}")]
    SequenceError(String),

    /// The segment bytes failed basic structural validation.
    #[error("malformed segment: {0}")]
    MalformedSegment(String),

    /// A segment's declared total length is inconsistent with a prior
    /// segment for the same key, or the reassembled message fails
    /// validation (§4.6).
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Result alias used throughout the TP layer.
pub type Result<T> = std::result::Result<T, TpError>;
