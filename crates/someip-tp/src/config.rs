//! Tunables for segmentation and reassembly.

use std::time::Duration;

/// Tunables for segmentation and reassembly (§4.5, §4.6, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TpConfig {
    /// Largest payload chunk carried per segment; capped at 1392 bytes so
    /// the resulting UDP datagram stays at or below 1400 bytes.
    pub max_segment_size: usize,
    /// How long a reassembly buffer may sit incomplete before it is
    /// destroyed and [`crate::error::TpError::ReassemblyTimeout`] reported.
    pub reassembly_timeout: Duration,
    /// Largest total message size the reassembler will allocate for.
    pub max_message_size: usize,
    /// Maximum number of concurrent reassembly buffers.
    pub max_concurrent_reassemblies: usize,
}

/// Hard ceiling on `max_segment_size` imposed by the 1400-byte datagram
/// budget (§4.5).
pub const MAX_SEGMENT_SIZE_CEILING: usize = 1392;

impl Default for TpConfig {
    fn default() -> Self {
        Self {
            max_segment_size: MAX_SEGMENT_SIZE_CEILING,
            reassembly_timeout: Duration::from_millis(5000),
            max_message_size: 1024 * 1024,
            max_concurrent_reassemblies: 64,
        }
    }
}
