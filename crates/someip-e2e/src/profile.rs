//! The E2E protection profile trait.

use someip_wire::Message;

use crate::config::E2eConfig;
use crate::error::Result;

/// An E2E protection scheme: computes and checks the 12-byte E2E header
/// attached to a [`Message`] (§4.4).
///
/// Implementations own whatever per-DataID state they need (counters,
/// last-seen freshness) and must be safe to call from multiple threads.
pub trait Profile: Send + Sync {
    /// Stable numeric identity used for [`crate::registry::ProfileRegistry`]
    /// lookups.
    fn id(&self) -> u32;

    /// Human-readable name used for registry lookups.
    fn name(&self) -> &str;

    /// Attaches an E2E header to `message`, mutating its stored per-DataID
    /// counter and freshness state.
    fn protect(&self, message: &mut Message, config: &E2eConfig, now_ms: u64) -> Result<()>;

    /// Validates `message`'s E2E header against `config`, advancing stored
    /// counter state on success.
    fn validate(&self, message: &Message, config: &E2eConfig, now_ms: u64) -> Result<()>;
}
