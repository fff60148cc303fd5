//! SD server role: offer scheduling, Find/Subscribe handling (§4.8).
//!
//! Pure state machine: every method takes the current time as a parameter
//! and returns actions for a driver to execute, mirroring the
//! action-returning connection state machines elsewhere in this codebase.
//! No I/O, no stored clock.

use std::collections::HashMap;
use std::ops::Sub;
use std::time::{Duration, Instant};

use crate::config::SdConfig;
use crate::entry::{OptionRun, SdEntry, TTL_INFINITE};
use crate::error::{Result, SdError};
use crate::option::SdOption;

/// Identifies one offered service instance (§3, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    /// Service identity.
    pub service_id: u16,
    /// Instance identity.
    pub instance_id: u16,
    /// Major version.
    pub major_version: u8,
}

#[derive(Debug, Clone, Copy)]
enum Phase<I> {
    InitialWait { since: I },
    Repetition { k: u32, since: I, interval: Duration },
    Main { since: I },
    Removed,
}

struct Offer<I> {
    minor_version: u32,
    ttl_secs: u32,
    endpoint: SdOption,
    phase: Phase<I>,
}

/// An action the driver must execute on behalf of the SD server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdServerAction<Endpoint> {
    /// Send `entries`/`options` to the SD multicast group.
    Multicast {
        /// Entries to send.
        entries: Vec<SdEntry>,
        /// Options referenced by `entries`.
        options: Vec<SdOption>,
    },
    /// Send `entries`/`options` to a single unicast peer (response to
    /// Find/Subscribe).
    Unicast {
        /// Destination.
        to: Endpoint,
        /// Entries to send.
        entries: Vec<SdEntry>,
        /// Options referenced by `entries`.
        options: Vec<SdOption>,
    },
}

/// Offer phase driver for SD-served services: Initial-Wait, Repetition,
/// Main, and responses to Find/Subscribe (§4.8).
pub struct SdServer<Endpoint, I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    config: SdConfig,
    offers: HashMap<ServiceKey, Offer<I>>,
    insertion_order: Vec<ServiceKey>,
    subscriptions: HashMap<(ServiceKey, u16, Endpoint), (u32, I)>,
}

impl<Endpoint, I> SdServer<Endpoint, I>
where
    Endpoint: Clone + Eq + std::hash::Hash,
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Creates a server with no offered services.
    pub fn new(config: SdConfig) -> Self {
        Self {
            config,
            offers: HashMap::new(),
            insertion_order: Vec::new(),
            subscriptions: HashMap::new(),
        }
    }

    /// Offers `key` for advertisement, entering Initial-Wait. Evicts the
    /// oldest offer (or fails with `ResourceExhausted`) if already at
    /// `config.max_services`, per `config.evict_oldest_on_full` (§4.8).
    pub fn offer_service(
        &mut self,
        key: ServiceKey,
        minor_version: u32,
        ttl_secs: u32,
        endpoint: SdOption,
        now: I,
    ) -> Result<()> {
        if !self.offers.contains_key(&key) && self.offers.len() >= self.config.max_services {
            if self.config.evict_oldest_on_full {
                if let Some(oldest) = self.insertion_order.first().cloned() {
                    self.offers.remove(&oldest);
                    self.insertion_order.retain(|k| *k != oldest);
                }
            } else {
                return Err(SdError::ResourceExhausted(format!(
                    "{} services already offered",
                    self.offers.len()
                )));
            }
        }

        self.offers.insert(
            key,
            Offer {
                minor_version,
                ttl_secs,
                endpoint,
                phase: Phase::InitialWait { since: now },
            },
        );
        self.insertion_order.retain(|k| *k != key);
        self.insertion_order.push(key);
        Ok(())
    }

    /// Withdraws `key` immediately, returning the Stop-Offer (`ttl=0`)
    /// multicast action.
    pub fn stop_offer_service(&mut self, key: &ServiceKey) -> Result<SdServerAction<Endpoint>> {
        let offer = self
            .offers
            .get_mut(key)
            .ok_or_else(|| SdError::UnknownService(format!("{key:?}")))?;
        offer.phase = Phase::Removed;
        let entry = offer_entry(*key, offer, 0);
        Ok(SdServerAction::Multicast {
            entries: vec![entry],
            options: vec![offer.endpoint.clone()],
        })
    }

    /// Advances every offered service's phase machine, returning the
    /// Offers due to be (re-)sent at `now` (§4.8).
    pub fn on_timer(&mut self, now: I) -> Vec<SdServerAction<Endpoint>> {
        let mut actions = Vec::new();
        for (key, offer) in &mut self.offers {
            if let Some(entry) = advance_phase(offer, &self.config, now) {
                actions.push(SdServerAction::Multicast {
                    entries: vec![offer_entry(*key, offer, entry)],
                    options: vec![offer.endpoint.clone()],
                });
            }
        }
        actions
    }

    /// Handles an inbound SD message from `from`: Find-Service gets a
    /// unicast Offer, Subscribe-Eventgroup gets a unicast Ack/NACK.
    pub fn on_message(
        &mut self,
        from: Endpoint,
        entries: &[SdEntry],
        now: I,
    ) -> Vec<SdServerAction<Endpoint>> {
        let mut actions = Vec::new();
        for entry in entries {
            match *entry {
                SdEntry::Find { service_id, instance_id, major_version, .. } => {
                    if let Some((key, offer)) =
                        self.find_matching(service_id, instance_id, major_version)
                    {
                        let reply = offer_entry(key, offer, offer.ttl_secs);
                        actions.push(SdServerAction::Unicast {
                            to: from.clone(),
                            entries: vec![reply],
                            options: vec![offer.endpoint.clone()],
                        });
                    }
                }
                SdEntry::SubscribeEventgroup {
                    service_id,
                    instance_id,
                    major_version,
                    ttl,
                    eventgroup_id,
                    ..
                } => {
                    let matched = self.find_matching(service_id, instance_id, major_version);
                    if let Some((key, offer)) = matched {
                        let offer_ttl_secs = offer.ttl_secs;
                        let offer_endpoint = offer.endpoint.clone();
                        let granted_ttl = if ttl == 0 { 0 } else { offer_ttl_secs.min(ttl.max(1)) };
                        if granted_ttl > 0 {
                            self.subscriptions
                                .insert((key, eventgroup_id, from.clone()), (granted_ttl, now));
                        } else {
                            self.subscriptions.remove(&(key, eventgroup_id, from.clone()));
                        }
                        let ack = SdEntry::SubscribeEventgroupAck {
                            service_id,
                            instance_id,
                            major_version,
                            ttl: granted_ttl,
                            eventgroup_id,
                            options: OptionRun::single(0),
                        };
                        actions.push(SdServerAction::Unicast {
                            to: from.clone(),
                            entries: vec![ack],
                            options: vec![offer_endpoint],
                        });
                    } else {
                        let nack = SdEntry::SubscribeEventgroupAck {
                            service_id,
                            instance_id,
                            major_version,
                            ttl: 0,
                            eventgroup_id,
                            options: OptionRun::none(),
                        };
                        actions.push(SdServerAction::Unicast {
                            to: from.clone(),
                            entries: vec![nack],
                            options: vec![],
                        });
                    }
                }
                _ => {}
            }
        }
        actions
    }

    fn find_matching(
        &self,
        service_id: u16,
        instance_id: u16,
        major_version: u8,
    ) -> Option<(ServiceKey, &Offer<I>)> {
        self.offers.iter().find_map(|(key, offer)| {
            let instance_matches = instance_id == 0xFFFF || key.instance_id == instance_id;
            let version_matches = major_version == 0xFF || key.major_version == major_version;
            if key.service_id == service_id
                && instance_matches
                && version_matches
                && !matches!(offer.phase, Phase::Removed)
            {
                Some((*key, offer))
            } else {
                None
            }
        })
    }

    /// Number of eventgroup subscriptions currently tracked.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

fn offer_entry<I>(key: ServiceKey, offer: &Offer<I>, ttl_secs: u32) -> SdEntry {
    SdEntry::Offer {
        service_id: key.service_id,
        instance_id: key.instance_id,
        major_version: key.major_version,
        ttl: ttl_secs,
        minor_version: offer.minor_version,
        options: OptionRun::single(0),
    }
}

/// Advances `offer`'s phase machine past `now`; returns the TTL to
/// advertise if an Offer is due.
fn advance_phase<I>(offer: &mut Offer<I>, config: &SdConfig, now: I) -> Option<u32>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    match offer.phase {
        Phase::Removed => None,
        Phase::InitialWait { since } => {
            if now - since >= config.initial_delay {
                offer.phase = Phase::Repetition {
                    k: 1,
                    since: now,
                    interval: config.repetition_base.min(config.repetition_max),
                };
                Some(offer.ttl_secs)
            } else {
                None
            }
        }
        Phase::Repetition { k, since, interval } => {
            if now - since >= interval {
                if k < config.repetition_count {
                    let next_interval = config
                        .repetition_base
                        .saturating_mul(1 << k)
                        .min(config.repetition_max);
                    offer.phase = Phase::Repetition {
                        k: k + 1,
                        since: now,
                        interval: next_interval,
                    };
                } else {
                    offer.phase = Phase::Main { since: now };
                }
                Some(offer.ttl_secs)
            } else {
                None
            }
        }
        Phase::Main { since } => {
            if now - since >= config.cyclic_offer {
                offer.phase = Phase::Main { since: now };
                Some(offer.ttl_secs)
            } else {
                None
            }
        }
    }
}

/// TTL value meaning "infinite" re-exported for convenience at this layer.
pub const INFINITE_TTL: u32 = TTL_INFINITE;
