//! Error type for Service Discovery codec and state machine operations.

use thiserror::Error;

/// Failures raised by the SD codec and state machines (§4.7, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdError {
    /// A length field claims more bytes than remain in the payload.
    #[error("truncated SD payload: {0}")]
    Truncated(String),

    /// The carrying SOME/IP message does not use SD addressing/framing.
    #[error("invalid SD framing: {0}")]
    InvalidFraming(String),

    /// An entry's option run references an index past the options array.
    #[error("option index {index} out of range for {count} options")]
    OptionIndexOutOfRange {
        /// the out-of-range index
        index: u8,
        /// number of options actually present
        count: usize,
    },

    /// `EntriesLen`/`OptionsLen` exceeds the remaining payload bytes.
    #[error("declared length exceeds remaining payload: {0}")]
    LengthExceedsPayload(String),

    /// The caller asked to operate on a service/instance the role does
    /// not know about.
    #[error("unknown service instance: {0}")]
    UnknownService(String),

    /// A capacity limit (e.g. `max_services`) was reached.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Result alias used throughout the SD crate.
pub type Result<T> = std::result::Result<T, SdError>;

/// Shorthand for a [`SdError::Truncated`] carrying `what`.
pub(crate) fn vec_truncated(what: &str) -> SdError {
    SdError::Truncated(what.to_string())
}
