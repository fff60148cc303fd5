//! Top-level facade tying the wire codec, E2E protection, TP
//! segmentation/reassembly, and SD together into one outbound/inbound
//! pipeline (§6).

#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::hash::Hash;
use std::sync::Mutex;

use someip_e2e::{ProfileRegistry, REFERENCE_PROFILE_ID};
use someip_sd::{SdEntry, SdMessage};
use someip_tp::{Reassembler, Segmenter};
use someip_wire::{Message, SD_METHOD_ID, SD_SERVICE_ID};

use crate::config::Config;
use crate::env::Environment;
use crate::error::Result;
use crate::transport::Transport;

/// A fully processed inbound event, ready for application dispatch.
#[derive(Debug, Clone)]
pub enum Inbound<Endpoint> {
    /// A non-SD application message (already reassembled and E2E-checked).
    Message {
        /// The peer that sent it.
        from: Endpoint,
        /// The decoded message.
        message: Message,
    },
    /// A parsed SD message, not yet interpreted by an `SdServer`/`SdClient`.
    ServiceDiscovery {
        /// The peer that sent it.
        from: Endpoint,
        /// The decoded SD message.
        sd: SdMessage,
    },
}

/// Facade combining every protocol layer behind one `send`/`receive` pair.
///
/// Generic over the application `Environment` (clock/RNG) and the
/// transport's endpoint type, so the same facade drives both production
/// sockets and the deterministic simulation harness.
pub struct Stack<E, Endpoint>
where
    E: Environment<Instant = std::time::Instant>,
    Endpoint: Clone + Eq + Hash,
{
    env: E,
    config: Config,
    profiles: ProfileRegistry,
    segmenter: Mutex<Segmenter>,
    reassembler: Mutex<Reassembler<Endpoint>>,
}

impl<E, Endpoint> Stack<E, Endpoint>
where
    E: Environment<Instant = std::time::Instant>,
    Endpoint: Clone + Eq + Hash,
{
    /// Builds a stack using the built-in reference E2E profile only.
    pub fn new(env: E, config: Config) -> Self {
        Self::with_profiles(env, config, ProfileRegistry::with_reference_profile())
    }

    /// Builds a stack with a caller-supplied profile registry, for
    /// applications registering additional E2E profiles.
    pub fn with_profiles(env: E, config: Config, profiles: ProfileRegistry) -> Self {
        let reassembler = Reassembler::new(config.tp.clone());
        Self {
            env,
            config,
            profiles,
            segmenter: Mutex::new(Segmenter::new()),
            reassembler: Mutex::new(reassembler),
        }
    }

    /// Runs the outbound pipeline on `message`: applies E2E protection if
    /// configured for its (`ServiceId`, `MethodId`), segments it if it
    /// exceeds `config.tp.max_segment_size`, and sends every resulting
    /// datagram to `endpoint` via `transport`.
    pub async fn send(
        &self,
        transport: &dyn Transport<Endpoint>,
        endpoint: &Endpoint,
        mut message: Message,
    ) -> Result<()> {
        self.protect(&mut message)?;

        let needs_tp = Segmenter::needs_segmentation(&message, &self.config.tp);

        if needs_tp {
            let segments = {
                let mut segmenter = self.segmenter.lock().expect("segmenter mutex poisoned");
                segmenter.segment(&message, &self.config.tp)?
            };
            tracing::debug!(segments = segments.len(), "message segmented for transmission");
            for segment in &segments {
                transport.send(endpoint, &segment.encode()?).await?;
            }
        } else {
            transport.send(endpoint, &message.serialize()).await?;
        }
        Ok(())
    }

    /// Sends `sd` to the SD multicast group, unsegmented (SD messages are
    /// never TP-segmented per §4.5 Non-goals).
    pub async fn send_sd(&self, transport: &dyn Transport<Endpoint>, sd: &SdMessage) -> Result<()> {
        let message = sd.to_message();
        transport.send_multicast(&message.serialize()).await?;
        Ok(())
    }

    /// Applies the configured E2E profile to `message` in place, if its
    /// (`ServiceId`, `MethodId`) has one registered (§4.4, §4.3).
    fn protect(&self, message: &mut Message) -> Result<()> {
        let header = *message.header();
        let Some(e2e_config) = self.config.e2e_config_for(header.service_id, header.method_id) else {
            return Ok(());
        };
        let profile = self.profiles.lookup_by_id(REFERENCE_PROFILE_ID)?;
        let now_ms = self.env.wall_clock_ms();
        profile.protect(message, e2e_config, now_ms)?;
        Ok(())
    }

    /// Runs the inbound pipeline on one received datagram from `from`:
    /// reassembles it if it is a TP segment, deserializes it, and
    /// validates any E2E header. Returns `None` while a TP message is
    /// still incomplete.
    pub fn receive(&self, from: Endpoint, bytes: &[u8]) -> Result<Option<Inbound<Endpoint>>> {
        let header = someip_wire::header::Header::from_bytes(bytes)?;

        let message = if header.message_type.is_tp() {
            let segment = someip_tp::Segment::decode(bytes)?;
            let now = self.env.now();
            let mut reassembler = self.reassembler.lock().expect("reassembler mutex poisoned");
            match reassembler.process(from.clone(), &segment, now)? {
                Some(message) => message,
                None => return Ok(None),
            }
        } else {
            Message::deserialize_with(bytes, &self.config.wire)?
        };

        let header = *message.header();
        if header.service_id == SD_SERVICE_ID && header.method_id == SD_METHOD_ID {
            let sd = SdMessage::from_message(&message)?;
            return Ok(Some(Inbound::ServiceDiscovery { from, sd }));
        }

        if let Err(err) = self.validate(&message) {
            tracing::warn!(service_id = header.service_id, method_id = header.method_id, %err, "E2E validation failed");
            return Err(err);
        }
        Ok(Some(Inbound::Message { from, message }))
    }

    /// Evicts and reports reassembly buffers that have exceeded
    /// `config.tp.reassembly_timeout` (§4.6).
    pub fn expire_reassemblies(&self) -> Vec<someip_tp::ReassemblyKey<Endpoint>> {
        let now = self.env.now();
        let mut reassembler = self.reassembler.lock().expect("reassembler mutex poisoned");
        reassembler.process_timeouts(now)
    }

    fn validate(&self, message: &Message) -> Result<()> {
        let header = *message.header();
        let Some(e2e_config) = self.config.e2e_config_for(header.service_id, header.method_id) else {
            return Ok(());
        };
        let profile = self.profiles.lookup_by_id(REFERENCE_PROFILE_ID)?;
        let now_ms = self.env.wall_clock_ms();
        profile.validate(message, e2e_config, now_ms)?;
        Ok(())
    }

    /// The environment driving this stack's clock and RNG.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The aggregate configuration this stack was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// `true` if `entries` contains a Find-Service entry, used by drivers to
/// decide whether an inbound SD message should be routed to the server or
/// client role (§4.8, §4.9).
#[must_use]
pub fn contains_find(entries: &[SdEntry]) -> bool {
    entries.iter().any(|e| matches!(e, SdEntry::Find { .. }))
}
