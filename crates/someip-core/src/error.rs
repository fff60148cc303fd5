//! Aggregate error type tying together each layer's own error enum.

use thiserror::Error;

/// Aggregate error type for the whole stack (§7), wrapping each layer's
/// own error enum.
#[derive(Debug, Error)]
pub enum StackError {
    /// Failure decoding or encoding the SOME/IP header/message (§4.2, §4.3).
    #[error("wire error: {0}")]
    Wire(#[from] someip_wire::WireError),

    /// Failure applying or validating an E2E profile (§4.4).
    #[error("e2e error: {0}")]
    E2e(#[from] someip_e2e::E2eError),

    /// Failure segmenting or reassembling a TP message (§4.5, §4.6).
    #[error("tp error: {0}")]
    Tp(#[from] someip_tp::TpError),

    /// Failure parsing or building an SD message (§4.7, §4.8, §4.9).
    #[error("sd error: {0}")]
    Sd(#[from] someip_sd::SdError),

    /// The destination endpoint for an outbound message is unknown to the
    /// transport.
    #[error("no route to endpoint for service 0x{service_id:04X}")]
    NoRoute {
        /// Service the caller tried to reach.
        service_id: u16,
    },

    /// The underlying transport failed to send or receive.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result alias used throughout the facade.
pub type Result<T> = std::result::Result<T, StackError>;
