//! SD client role: Find repetition, availability tracking, subscription
//! lifecycle, and reboot detection (§4.9).

use std::collections::HashMap;
use std::ops::Sub;
use std::time::{Duration, Instant};

use crate::config::SdConfig;
use crate::entry::{OptionRun, SdEntry, TTL_INFINITE};
use crate::option::SdOption;

/// Identifies one service a client is looking for or has found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    /// Service identity.
    pub service_id: u16,
    /// Instance identity; `0xFFFF` means "any instance" while searching.
    pub instance_id: u16,
    /// Major version requested; `0xFF` means "any version".
    pub major_version: u8,
}

/// Identifies one eventgroup subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventgroupKey {
    /// Service the eventgroup belongs to.
    pub service_id: u16,
    /// Instance the eventgroup belongs to.
    pub instance_id: u16,
    /// Eventgroup identifier.
    pub eventgroup_id: u16,
}

#[derive(Debug, Clone, Copy)]
struct FindState<I> {
    key: ServiceKey,
    next_send: I,
    interval: Duration,
}

#[derive(Debug, Clone)]
struct AvailableService<Endpoint, I> {
    endpoint: Option<Endpoint>,
    ttl_secs: u32,
    last_seen: I,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriptionStatus {
    Pending,
    Acked,
    Nacked,
}

#[derive(Debug, Clone, Copy)]
struct SubscriptionState<I> {
    status: SubscriptionStatus,
    ttl_secs: u32,
    last_renewed: I,
}

/// An action the driver must execute on behalf of the SD client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdClientAction<Endpoint> {
    /// Send a Find-Service entry to the SD multicast group.
    SendFind {
        /// Entry to send.
        entry: SdEntry,
    },
    /// Send a Subscribe-Eventgroup entry to a specific unicast peer.
    SendSubscribe {
        /// Destination offering the service.
        to: Endpoint,
        /// Entry to send.
        entry: SdEntry,
        /// The subscriber's own endpoint option.
        options: Vec<SdOption>,
    },
    /// A service instance became available or unavailable.
    AvailabilityChanged {
        /// Which service.
        key: ServiceKey,
        /// New availability.
        available: bool,
        /// Endpoint, when newly available.
        endpoint: Option<Endpoint>,
    },
    /// A reboot was detected on `from` (§4.9, §8): the caller should treat
    /// every service/subscription previously learned from it as stale.
    RebootDetected {
        /// The peer endpoint that rebooted.
        from: Endpoint,
    },
}

/// Find/subscribe driver for SD-consumed services (§4.9).
pub struct SdClient<Endpoint, I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    config: SdConfig,
    wanted: HashMap<u16, FindState<I>>,
    available: HashMap<ServiceKey, AvailableService<Endpoint, I>>,
    subscriptions: HashMap<EventgroupKey, SubscriptionState<I>>,
    remote_sessions: HashMap<Endpoint, (u16, bool)>,
}

impl<Endpoint, I> SdClient<Endpoint, I>
where
    Endpoint: Clone + Eq + std::hash::Hash,
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Creates a client with nothing requested or known.
    pub fn new(config: SdConfig) -> Self {
        Self {
            config,
            wanted: HashMap::new(),
            available: HashMap::new(),
            subscriptions: HashMap::new(),
            remote_sessions: HashMap::new(),
        }
    }

    /// Starts (or restarts) looking for `key`, returning the first
    /// Find-Service action to send immediately.
    pub fn find_service(&mut self, key: ServiceKey, now: I) -> SdClientAction<Endpoint> {
        self.wanted.insert(
            key.service_id,
            FindState {
                key,
                next_send: now,
                interval: self.config.repetition_base,
            },
        );
        find_action(key)
    }

    /// Stops looking for `service_id`.
    pub fn stop_find_service(&mut self, service_id: u16) {
        self.wanted.remove(&service_id);
    }

    /// Advances Find repetition and TTL countdowns, returning due actions.
    pub fn on_timer(&mut self, now: I) -> Vec<SdClientAction<Endpoint>> {
        let mut actions = Vec::new();

        for state in self.wanted.values_mut() {
            if now >= state.next_send {
                actions.push(find_action(state.key));
                state.next_send = now;
                state.interval = (state.interval * 2).min(self.config.repetition_max);
            }
        }

        let mut expired = Vec::new();
        for (key, service) in &self.available {
            if service.ttl_secs != TTL_INFINITE && now - service.last_seen >= Duration::from_secs(service.ttl_secs.into())
            {
                expired.push(*key);
            }
        }
        for key in expired {
            self.available.remove(&key);
            actions.push(SdClientAction::AvailabilityChanged {
                key,
                available: false,
                endpoint: None,
            });
        }

        let mut lapsed = Vec::new();
        for (key, sub) in &self.subscriptions {
            if sub.ttl_secs != TTL_INFINITE
                && now - sub.last_renewed >= Duration::from_secs(sub.ttl_secs.into())
            {
                lapsed.push(*key);
            }
        }
        for key in lapsed {
            self.subscriptions.remove(&key);
        }

        actions
    }

    /// Processes an inbound SD message from `from` (§4.9): detects reboots
    /// via Session ID regression, then applies Offer/Stop-Offer and
    /// Subscribe-Ack/NACK entries.
    pub fn on_message(
        &mut self,
        from: Endpoint,
        sd_session_id: u16,
        reboot_flag: bool,
        entries: &[SdEntry],
        now: I,
    ) -> Vec<SdClientAction<Endpoint>> {
        let mut actions = Vec::new();

        let rebooted = self.detect_reboot(from.clone(), sd_session_id, reboot_flag);
        if rebooted {
            self.flush_peer(&from, &mut actions);
            actions.push(SdClientAction::RebootDetected { from: from.clone() });
        }

        for entry in entries {
            match *entry {
                SdEntry::Offer { service_id, instance_id, major_version, ttl, .. } => {
                    let key = ServiceKey { service_id, instance_id, major_version };
                    if ttl == 0 {
                        if self.available.remove(&key).is_some() {
                            actions.push(SdClientAction::AvailabilityChanged {
                                key,
                                available: false,
                                endpoint: None,
                            });
                        }
                    } else if self.wanted.contains_key(&service_id) {
                        let already = self.available.contains_key(&key);
                        self.available.insert(
                            key,
                            AvailableService { endpoint: Some(from.clone()), ttl_secs: ttl, last_seen: now },
                        );
                        if !already {
                            actions.push(SdClientAction::AvailabilityChanged {
                                key,
                                available: true,
                                endpoint: Some(from.clone()),
                            });
                        }
                    }
                }
                SdEntry::SubscribeEventgroupAck { service_id, instance_id, eventgroup_id, ttl, .. } => {
                    let key = EventgroupKey { service_id, instance_id, eventgroup_id };
                    if let Some(sub) = self.subscriptions.get_mut(&key) {
                        sub.status = if ttl == 0 { SubscriptionStatus::Nacked } else { SubscriptionStatus::Acked };
                        sub.ttl_secs = ttl;
                        sub.last_renewed = now;
                    }
                }
                _ => {}
            }
        }

        actions
    }

    /// Requests an eventgroup subscription from `to`, the endpoint that
    /// offered the owning service.
    pub fn subscribe_eventgroup(
        &mut self,
        key: EventgroupKey,
        to: Endpoint,
        own_option: SdOption,
        now: I,
    ) -> SdClientAction<Endpoint> {
        self.subscriptions.insert(
            key,
            SubscriptionState {
                status: SubscriptionStatus::Pending,
                ttl_secs: self.config.default_ttl_secs,
                last_renewed: now,
            },
        );
        SdClientAction::SendSubscribe {
            to,
            entry: SdEntry::SubscribeEventgroup {
                service_id: key.service_id,
                instance_id: key.instance_id,
                major_version: 0xFF,
                ttl: self.config.default_ttl_secs,
                eventgroup_id: key.eventgroup_id,
                options: OptionRun::single(0),
            },
            options: vec![own_option],
        }
    }

    /// Withdraws a subscription locally (a `ttl=0` Subscribe-Eventgroup is
    /// the on-wire unsubscribe and is left to the caller to send).
    pub fn unsubscribe_eventgroup(&mut self, key: EventgroupKey) {
        self.subscriptions.remove(&key);
    }

    /// `true` if `key` is currently believed available.
    pub fn is_available(&self, key: &ServiceKey) -> bool {
        self.available.contains_key(key)
    }

    fn detect_reboot(&mut self, from: Endpoint, sd_session_id: u16, reboot_flag: bool) -> bool {
        let window = self.config.session_wrap_window;
        match self.remote_sessions.get(&from).copied() {
            None => {
                self.remote_sessions.insert(from, (sd_session_id, reboot_flag));
                false
            }
            Some((last_session, _)) => {
                let regressed = sd_session_id < last_session && last_session - sd_session_id > window;
                let rebooted = reboot_flag || regressed;
                self.remote_sessions.insert(from, (sd_session_id, reboot_flag));
                rebooted
            }
        }
    }

    fn flush_peer(&mut self, from: &Endpoint, actions: &mut Vec<SdClientAction<Endpoint>>) {
        let stale: Vec<ServiceKey> = self
            .available
            .iter()
            .filter(|(_, svc)| svc.endpoint.as_ref() == Some(from))
            .map(|(key, _)| *key)
            .collect();
        for key in stale {
            self.available.remove(&key);
            actions.push(SdClientAction::AvailabilityChanged {
                key,
                available: false,
                endpoint: None,
            });
        }
    }
}

fn find_action<Endpoint>(key: ServiceKey) -> SdClientAction<Endpoint> {
    SdClientAction::SendFind {
        entry: SdEntry::Find {
            service_id: key.service_id,
            instance_id: key.instance_id,
            major_version: key.major_version,
            ttl: 3,
            minor_version: 0xFFFF_FFFF,
            options: OptionRun::none(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_service(service_id: u16) -> ServiceKey {
        ServiceKey { service_id, instance_id: 0xFFFF, major_version: 0xFF }
    }

    #[test]
    fn offer_for_wanted_service_marks_available() {
        let mut client: SdClient<u32, Instant> = SdClient::new(SdConfig::default());
        let now = Instant::now();
        client.find_service(any_service(0x1234), now);

        let offer = SdEntry::Offer {
            service_id: 0x1234,
            instance_id: 1,
            major_version: 1,
            ttl: 30,
            minor_version: 0,
            options: OptionRun::single(0),
        };
        let actions = client.on_message(7u32, 1, false, &[offer], now);
        assert!(actions
            .iter()
            .any(|a| matches!(a, SdClientAction::AvailabilityChanged { available: true, .. })));
        assert!(client.is_available(&ServiceKey { service_id: 0x1234, instance_id: 1, major_version: 1 }));
    }

    #[test]
    fn stop_offer_marks_unavailable() {
        let mut client: SdClient<u32, Instant> = SdClient::new(SdConfig::default());
        let now = Instant::now();
        client.find_service(any_service(0x1234), now);
        let offer = SdEntry::Offer {
            service_id: 0x1234,
            instance_id: 1,
            major_version: 1,
            ttl: 30,
            minor_version: 0,
            options: OptionRun::single(0),
        };
        client.on_message(7u32, 1, false, &[offer], now);

        let stop = SdEntry::Offer {
            service_id: 0x1234,
            instance_id: 1,
            major_version: 1,
            ttl: 0,
            minor_version: 0,
            options: OptionRun::none(),
        };
        let actions = client.on_message(7u32, 2, false, &[stop], now);
        assert!(actions
            .iter()
            .any(|a| matches!(a, SdClientAction::AvailabilityChanged { available: false, .. })));
    }

    #[test]
    fn session_id_regression_detects_reboot() {
        let mut client: SdClient<u32, Instant> = SdClient::new(SdConfig::default());
        let now = Instant::now();
        client.on_message(7u32, 100, false, &[], now);
        let actions = client.on_message(7u32, 1, false, &[], now);
        assert!(actions.iter().any(|a| matches!(a, SdClientAction::RebootDetected { .. })));
    }

    #[test]
    fn small_session_id_regression_within_window_is_not_a_reboot() {
        let mut client: SdClient<u32, Instant> = SdClient::new(SdConfig::default());
        let now = Instant::now();
        client.on_message(7u32, 65535, false, &[], now);
        let actions = client.on_message(7u32, 5, false, &[], now);
        assert!(!actions.iter().any(|a| matches!(a, SdClientAction::RebootDetected { .. })));
    }

    #[test]
    fn ttl_expiry_marks_unavailable() {
        let mut client: SdClient<u32, Instant> = SdClient::new(SdConfig::default());
        let t0 = Instant::now();
        client.find_service(any_service(0x1234), t0);
        let offer = SdEntry::Offer {
            service_id: 0x1234,
            instance_id: 1,
            major_version: 1,
            ttl: 1,
            minor_version: 0,
            options: OptionRun::single(0),
        };
        client.on_message(7u32, 1, false, &[offer], t0);
        let t1 = t0 + Duration::from_secs(2);
        let actions = client.on_timer(t1);
        assert!(actions
            .iter()
            .any(|a| matches!(a, SdClientAction::AvailabilityChanged { available: false, .. })));
    }
}
