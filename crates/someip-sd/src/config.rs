//! Tunables for the SD server and client state machines.

use std::time::Duration;

/// Tunables for the SD server and client state machines (§4.8, §4.9, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdConfig {
    /// Delay before the first Offer of a newly-offered service (Initial-Wait).
    pub initial_delay: Duration,
    /// Base repetition interval; doubles each repetition up to
    /// `repetition_max`.
    pub repetition_base: Duration,
    /// Ceiling on the repetition interval.
    pub repetition_max: Duration,
    /// Number of repeated Offers sent before entering the Main phase.
    pub repetition_count: u32,
    /// Interval between cyclic Offers once in the Main phase.
    pub cyclic_offer: Duration,
    /// Default TTL, in seconds, applied to Offers and Subscribe-Acks when
    /// the caller does not specify one.
    pub default_ttl_secs: u32,
    /// Maximum number of services a single [`crate::server::SdServer`] may
    /// offer concurrently.
    pub max_services: usize,
    /// If `true`, offering past `max_services` evicts the oldest offer
    /// instead of failing with `ResourceExhausted`.
    pub evict_oldest_on_full: bool,
    /// Small wrap-around window (in counter units) within which a Session
    /// ID regression is treated as a legitimate wrap rather than a reboot
    /// (§4.9, §8).
    pub session_wrap_window: u16,
}

impl Default for SdConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(0),
            repetition_base: Duration::from_millis(200),
            repetition_max: Duration::from_millis(3000),
            repetition_count: 3,
            cyclic_offer: Duration::from_millis(2000),
            default_ttl_secs: 30,
            max_services: 256,
            evict_oldest_on_full: true,
            session_wrap_window: 10,
        }
    }
}
