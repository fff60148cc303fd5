//! Aggregate configuration for the whole stack.

use std::collections::HashMap;

use someip_e2e::E2eConfig;
use someip_sd::SdConfig;
use someip_tp::TpConfig;
use someip_wire::WireConfig;

/// Tunables for every layer of the stack, gathered in one place so
/// applications configure the facade instead of each crate separately.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Per-(`ServiceId`, `MethodId`) E2E presence and message-length rules
    /// (§4.3).
    pub wire: WireConfig,
    /// Per-`DataId` E2E profile configuration, keyed the same way as
    /// `wire.e2e_presence` (§4.4).
    pub e2e: HashMap<(u16, u16), E2eConfig>,
    /// Segmentation and reassembly tunables (§4.5, §4.6).
    pub tp: TpConfig,
    /// Service Discovery tunables (§4.8, §4.9).
    pub sd: SdConfig,
}

impl Config {
    /// Looks up the E2E configuration registered for
    /// (`service_id`, `method_id`), if any.
    #[must_use]
    pub fn e2e_config_for(&self, service_id: u16, method_id: u16) -> Option<&E2eConfig> {
        self.e2e.get(&(service_id, method_id))
    }

    /// Registers an E2E configuration for (`service_id`, `method_id`),
    /// also marking the pair as E2E-present in `wire`.
    pub fn enable_e2e(&mut self, service_id: u16, method_id: u16, config: E2eConfig) {
        self.wire.set_e2e_presence(service_id, method_id, true);
        self.e2e.insert((service_id, method_id), config);
    }
}
