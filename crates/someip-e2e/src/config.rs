//! Per-DataID configuration for the reference E2E profile.

use someip_wire::CrcWidth;

/// Per-DataID configuration consulted by the reference profile (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E2eConfig {
    /// Identifies the protected data stream; must match the message's
    /// E2E header on validate.
    pub data_id: u16,
    /// Whether to compute/check the CRC.
    pub enable_crc: bool,
    /// CRC width to use when `enable_crc` is set.
    pub crc_width: CrcWidth,
    /// Whether to advance/check the per-DataID counter.
    pub enable_counter: bool,
    /// Counter wraps to `1` after exceeding this value (`0` is reserved).
    pub max_counter_value: u32,
    /// Whether to check message freshness against the local clock.
    pub enable_freshness: bool,
    /// Tolerance window, in milliseconds, for freshness checks.
    pub freshness_timeout_ms: u16,
    /// Accept re-validation of an already-seen counter value as
    /// idempotent rather than a replay. Matches the spec's reference
    /// behavior; set to `false` for strict monotonicity (§9 open question).
    pub accept_repeated_counter: bool,
}

impl E2eConfig {
    /// A configuration with CRC, counter, and freshness all enabled using
    /// 16-bit CRC, for the given `data_id`.
    pub fn new(data_id: u16) -> Self {
        Self {
            data_id,
            enable_crc: true,
            crc_width: CrcWidth::Crc16,
            enable_counter: true,
            max_counter_value: u32::MAX - 1,
            enable_freshness: true,
            freshness_timeout_ms: 1000,
            accept_repeated_counter: true,
        }
    }
}
