//! SD entries: Find, Offer, Subscribe-Eventgroup, Subscribe-Eventgroup-Ack
//! (§3, §4.7).

use crate::error::{vec_truncated, Result};

/// Size in bytes of one SD entry on the wire.
pub const ENTRY_SIZE: usize = 16;

/// TTL value meaning "never expires" (§3, GLOSSARY).
pub const TTL_INFINITE: u32 = 0x00FF_FFFF;

/// SD entry type bytes (§3).
pub mod entry_type {
    /// Find-Service.
    pub const FIND: u8 = 0x00;
    /// Offer-Service (TTL `0` is Stop-Offer).
    pub const OFFER: u8 = 0x01;
    /// Subscribe-Eventgroup.
    pub const SUBSCRIBE: u8 = 0x06;
    /// Subscribe-Eventgroup-Ack (TTL `0` is a NACK).
    pub const SUBSCRIBE_ACK: u8 = 0x07;
}

/// References a contiguous run of options by index into the payload's
/// flat options array (§3, §4.7). A run with `count == 0` references
/// nothing and is never validated against the options array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptionRun {
    /// Start index of the first run.
    pub index1: u8,
    /// Number of options in the first run.
    pub count1: u8,
    /// Start index of the second run.
    pub index2: u8,
    /// Number of options in the second run.
    pub count2: u8,
}

impl OptionRun {
    /// A run referencing nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// A run referencing a single option at `index`.
    pub fn single(index: u8) -> Self {
        Self {
            index1: index,
            count1: 1,
            index2: 0,
            count2: 0,
        }
    }

    fn validate(&self, option_count: usize) -> Result<()> {
        if self.count1 > 0 && self.index1 as usize + self.count1 as usize > option_count {
            return Err(crate::error::SdError::OptionIndexOutOfRange {
                index: self.index1,
                count: option_count,
            });
        }
        if self.count2 > 0 && self.index2 as usize + self.count2 as usize > option_count {
            return Err(crate::error::SdError::OptionIndexOutOfRange {
                index: self.index2,
                count: option_count,
            });
        }
        Ok(())
    }

    /// Indices of every option this run references, in order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        let first = self.index1..self.index1 + self.count1;
        let second = self.index2..self.index2 + self.count2;
        first.chain(second).map(usize::from)
    }
}

/// One parsed SD entry (§3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdEntry {
    /// Request for instances of `service_id` (Find-Service, `0x00`).
    Find {
        /// Service requested.
        service_id: u16,
        /// Instance requested; `0xFFFF` means "any instance".
        instance_id: u16,
        /// Major version requested.
        major_version: u8,
        /// TTL of the request itself.
        ttl: u32,
        /// Minor version requested.
        minor_version: u32,
        /// Referenced options (normally empty for Find).
        options: OptionRun,
    },
    /// Announcement of a service instance (Offer-Service, `0x01`).
    /// `ttl == 0` is a Stop-Offer withdrawal.
    Offer {
        /// Service offered.
        service_id: u16,
        /// Instance offered.
        instance_id: u16,
        /// Major version offered.
        major_version: u8,
        /// Remaining lifetime in seconds; `0` withdraws, [`TTL_INFINITE`]
        /// never expires.
        ttl: u32,
        /// Minor version offered.
        minor_version: u32,
        /// Endpoint options (typically one `Ipv4Endpoint`/`Ipv6Endpoint`).
        options: OptionRun,
    },
    /// Request to receive an eventgroup's events (`0x06`).
    SubscribeEventgroup {
        /// Service the eventgroup belongs to.
        service_id: u16,
        /// Instance the eventgroup belongs to.
        instance_id: u16,
        /// Major version of the service.
        major_version: u8,
        /// Requested subscription lifetime in seconds.
        ttl: u32,
        /// Eventgroup identifier.
        eventgroup_id: u16,
        /// The subscriber's own endpoint option(s).
        options: OptionRun,
    },
    /// Response to a subscription request (`0x07`). `ttl == 0` is a NACK.
    SubscribeEventgroupAck {
        /// Service the eventgroup belongs to.
        service_id: u16,
        /// Instance the eventgroup belongs to.
        instance_id: u16,
        /// Major version of the service.
        major_version: u8,
        /// Granted lifetime in seconds; `0` denies the subscription.
        ttl: u32,
        /// Eventgroup identifier.
        eventgroup_id: u16,
        /// The publisher's multicast endpoint option, if any.
        options: OptionRun,
    },
}

impl SdEntry {
    /// `true` for an [`SdEntry::Offer`] withdrawing a service (`ttl == 0`).
    pub fn is_stop_offer(&self) -> bool {
        matches!(self, SdEntry::Offer { ttl: 0, .. })
    }

    /// `true` for an [`SdEntry::SubscribeEventgroupAck`] denying a
    /// subscription (`ttl == 0`).
    pub fn is_nack(&self) -> bool {
        matches!(self, SdEntry::SubscribeEventgroupAck { ttl: 0, .. })
    }

    /// The option run this entry references.
    pub fn options(&self) -> OptionRun {
        match self {
            SdEntry::Find { options, .. }
            | SdEntry::Offer { options, .. }
            | SdEntry::SubscribeEventgroup { options, .. }
            | SdEntry::SubscribeEventgroupAck { options, .. } => *options,
        }
    }

    fn type_byte(&self) -> u8 {
        match self {
            SdEntry::Find { .. } => entry_type::FIND,
            SdEntry::Offer { .. } => entry_type::OFFER,
            SdEntry::SubscribeEventgroup { .. } => entry_type::SUBSCRIBE,
            SdEntry::SubscribeEventgroupAck { .. } => entry_type::SUBSCRIBE_ACK,
        }
    }

    /// Encodes this entry to exactly [`ENTRY_SIZE`] bytes.
    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut out = [0u8; ENTRY_SIZE];
        let options = self.options();
        out[0] = self.type_byte();
        out[1] = options.index1;
        out[2] = options.index2;
        out[3] = (options.count1 << 4) | (options.count2 & 0x0F);

        let (service_id, instance_id, major_version, ttl) = match *self {
            SdEntry::Find { service_id, instance_id, major_version, ttl, .. } => {
                (service_id, instance_id, major_version, ttl)
            }
            SdEntry::Offer { service_id, instance_id, major_version, ttl, .. } => {
                (service_id, instance_id, major_version, ttl)
            }
            SdEntry::SubscribeEventgroup { service_id, instance_id, major_version, ttl, .. } => {
                (service_id, instance_id, major_version, ttl)
            }
            SdEntry::SubscribeEventgroupAck { service_id, instance_id, major_version, ttl, .. } => {
                (service_id, instance_id, major_version, ttl)
            }
        };
        out[4..6].copy_from_slice(&service_id.to_be_bytes());
        out[6..8].copy_from_slice(&instance_id.to_be_bytes());
        out[8] = major_version;
        let ttl_bytes = ttl.to_be_bytes();
        out[9..12].copy_from_slice(&ttl_bytes[1..4]);

        match *self {
            SdEntry::Find { minor_version, .. } | SdEntry::Offer { minor_version, .. } => {
                out[12..16].copy_from_slice(&minor_version.to_be_bytes());
            }
            SdEntry::SubscribeEventgroup { eventgroup_id, .. }
            | SdEntry::SubscribeEventgroupAck { eventgroup_id, .. } => {
                out[12..14].copy_from_slice(&[0, 0]);
                out[14..16].copy_from_slice(&eventgroup_id.to_be_bytes());
            }
        }
        out
    }

    /// Decodes one entry from exactly [`ENTRY_SIZE`] bytes, validating its
    /// option run against `option_count` (§4.7, §8).
    pub fn decode(bytes: &[u8], option_count: usize) -> Result<Option<Self>> {
        if bytes.len() < ENTRY_SIZE {
            return Err(vec_truncated("SD entry"));
        }
        let type_byte = bytes[0];
        let options = OptionRun {
            index1: bytes[1],
            count1: bytes[3] >> 4,
            index2: bytes[2],
            count2: bytes[3] & 0x0F,
        };
        options.validate(option_count)?;

        let service_id = u16::from_be_bytes([bytes[4], bytes[5]]);
        let instance_id = u16::from_be_bytes([bytes[6], bytes[7]]);
        let major_version = bytes[8];
        let ttl = u32::from_be_bytes([0, bytes[9], bytes[10], bytes[11]]);

        let entry = match type_byte {
            entry_type::FIND => Some(SdEntry::Find {
                service_id,
                instance_id,
                major_version,
                ttl,
                minor_version: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
                options,
            }),
            entry_type::OFFER => Some(SdEntry::Offer {
                service_id,
                instance_id,
                major_version,
                ttl,
                minor_version: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
                options,
            }),
            entry_type::SUBSCRIBE => Some(SdEntry::SubscribeEventgroup {
                service_id,
                instance_id,
                major_version,
                ttl,
                eventgroup_id: u16::from_be_bytes([bytes[14], bytes[15]]),
                options,
            }),
            entry_type::SUBSCRIBE_ACK => Some(SdEntry::SubscribeEventgroupAck {
                service_id,
                instance_id,
                major_version,
                ttl,
                eventgroup_id: u16::from_be_bytes([bytes[14], bytes[15]]),
                options,
            }),
            other => {
                tracing::warn!(entry_type = other, "unknown SD entry type skipped");
                None
            }
        };
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_round_trips() {
        let entry = SdEntry::Offer {
            service_id: 0x1234,
            instance_id: 0x0001,
            major_version: 1,
            ttl: 30,
            minor_version: 0,
            options: OptionRun::single(0),
        };
        let bytes = entry.encode();
        let decoded = SdEntry::decode(&bytes, 1).unwrap().unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn subscribe_round_trips() {
        let entry = SdEntry::SubscribeEventgroup {
            service_id: 0x1234,
            instance_id: 0x0001,
            major_version: 1,
            ttl: 5,
            eventgroup_id: 0x0010,
            options: OptionRun::single(0),
        };
        let bytes = entry.encode();
        let decoded = SdEntry::decode(&bytes, 1).unwrap().unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn stop_offer_and_nack_flags() {
        let stop = SdEntry::Offer {
            service_id: 1,
            instance_id: 1,
            major_version: 1,
            ttl: 0,
            minor_version: 0,
            options: OptionRun::none(),
        };
        assert!(stop.is_stop_offer());

        let nack = SdEntry::SubscribeEventgroupAck {
            service_id: 1,
            instance_id: 1,
            major_version: 1,
            ttl: 0,
            eventgroup_id: 1,
            options: OptionRun::none(),
        };
        assert!(nack.is_nack());
    }

    #[test]
    fn out_of_range_option_reference_is_rejected() {
        let entry = SdEntry::Offer {
            service_id: 1,
            instance_id: 1,
            major_version: 1,
            ttl: 1,
            minor_version: 0,
            options: OptionRun::single(5),
        };
        let bytes = entry.encode();
        assert!(SdEntry::decode(&bytes, 1).is_err());
    }

    #[test]
    fn unknown_entry_type_is_skipped() {
        let mut bytes = [0u8; ENTRY_SIZE];
        bytes[0] = 0xEE;
        assert_eq!(SdEntry::decode(&bytes, 0).unwrap(), None);
    }

    #[test]
    fn infinite_ttl_round_trips() {
        let entry = SdEntry::Offer {
            service_id: 1,
            instance_id: 1,
            major_version: 1,
            ttl: TTL_INFINITE,
            minor_version: 0,
            options: OptionRun::none(),
        };
        let bytes = entry.encode();
        let decoded = SdEntry::decode(&bytes, 0).unwrap().unwrap();
        assert_eq!(decoded, entry);
    }
}
