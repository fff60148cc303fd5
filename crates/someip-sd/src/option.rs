//! SD options: endpoint and multicast addresses, configuration strings
//! (§4.7, §6).

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;

use crate::error::{vec_truncated, Result};

/// Layer-4 protocol carried by an endpoint option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L4Proto {
    /// TCP (value `0x06`).
    Tcp,
    /// UDP (value `0x11`).
    Udp,
}

impl L4Proto {
    fn from_u8(value: u8) -> Self {
        if value == 0x06 {
            L4Proto::Tcp
        } else {
            L4Proto::Udp
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            L4Proto::Tcp => 0x06,
            L4Proto::Udp => 0x11,
        }
    }
}

/// SD option type bytes (§3, §6).
pub mod option_type {
    /// Configuration string option.
    pub const CONFIGURATION: u8 = 0x01;
    /// IPv4 unicast endpoint option.
    pub const IPV4_ENDPOINT: u8 = 0x04;
    /// IPv6 unicast endpoint option.
    pub const IPV6_ENDPOINT: u8 = 0x06;
    /// IPv4 multicast endpoint option.
    pub const IPV4_MULTICAST: u8 = 0x14;
    /// IPv6 multicast endpoint option.
    pub const IPV6_MULTICAST: u8 = 0x16;
}

/// One entry of the SD Options array (§3, §4.7, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdOption {
    /// A unicast IPv4 endpoint (service reachability).
    Ipv4Endpoint {
        /// Address of the endpoint. `0.0.0.0`/`255.255.255.255` are
        /// accepted with a warning (§4.7).
        address: Ipv4Addr,
        /// Transport protocol used to reach it.
        proto: L4Proto,
        /// Port the service listens on.
        port: u16,
    },
    /// A unicast IPv6 endpoint.
    Ipv6Endpoint {
        /// Address of the endpoint.
        address: Ipv6Addr,
        /// Transport protocol used to reach it.
        proto: L4Proto,
        /// Port the service listens on.
        port: u16,
    },
    /// A multicast IPv4 endpoint (event delivery).
    Ipv4Multicast {
        /// Multicast group address.
        address: Ipv4Addr,
        /// Port events are delivered to.
        port: u16,
    },
    /// A multicast IPv6 endpoint.
    Ipv6Multicast {
        /// Multicast group address.
        address: Ipv6Addr,
        /// Port events are delivered to.
        port: u16,
    },
    /// Free-form UTF-8 configuration string.
    Configuration {
        /// Raw configuration text.
        text: String,
    },
    /// An option type this implementation does not interpret; preserved
    /// so referencing entries keep valid option-array indices (§4.7).
    Unknown {
        /// Raw option type byte.
        option_type: u8,
        /// Raw option data, excluding the `Length`/`Type`/`Reserved` bytes.
        data: Bytes,
    },
}

impl SdOption {
    /// The on-wire option type byte.
    pub fn option_type(&self) -> u8 {
        match self {
            SdOption::Configuration { .. } => option_type::CONFIGURATION,
            SdOption::Ipv4Endpoint { .. } => option_type::IPV4_ENDPOINT,
            SdOption::Ipv6Endpoint { .. } => option_type::IPV6_ENDPOINT,
            SdOption::Ipv4Multicast { .. } => option_type::IPV4_MULTICAST,
            SdOption::Ipv6Multicast { .. } => option_type::IPV6_MULTICAST,
            SdOption::Unknown { option_type, .. } => *option_type,
        }
    }

    fn data_bytes(&self) -> Vec<u8> {
        match self {
            SdOption::Ipv4Endpoint { address, proto, port } => {
                let mut out = Vec::with_capacity(8);
                out.extend_from_slice(&address.octets());
                out.push(0); // reserved
                out.push(proto.to_u8());
                out.extend_from_slice(&port.to_be_bytes());
                out
            }
            SdOption::Ipv6Endpoint { address, proto, port } => {
                let mut out = Vec::with_capacity(20);
                out.extend_from_slice(&address.octets());
                out.push(0); // reserved
                out.push(proto.to_u8());
                out.extend_from_slice(&port.to_be_bytes());
                out
            }
            SdOption::Ipv4Multicast { address, port } => {
                let mut out = Vec::with_capacity(7);
                out.extend_from_slice(&address.octets());
                out.push(0); // reserved
                out.extend_from_slice(&port.to_be_bytes());
                out
            }
            SdOption::Ipv6Multicast { address, port } => {
                let mut out = Vec::with_capacity(19);
                out.extend_from_slice(&address.octets());
                out.push(0); // reserved
                out.extend_from_slice(&port.to_be_bytes());
                out
            }
            SdOption::Configuration { text } => text.as_bytes().to_vec(),
            SdOption::Unknown { data, .. } => data.to_vec(),
        }
    }

    /// Serializes this option's `Length | Type | Reserved | Data` bytes.
    /// `Length` counts everything after itself (Type, Reserved, Data),
    /// matching the convention the on-wire SD format uses throughout.
    pub fn encode(&self) -> Vec<u8> {
        let data = self.data_bytes();
        let length = (2 + data.len()) as u16;
        let mut out = Vec::with_capacity(4 + data.len());
        out.extend_from_slice(&length.to_be_bytes());
        out.push(self.option_type());
        out.push(0); // reserved
        out.extend_from_slice(&data);
        out
    }

    /// Parses one option starting at `bytes[0]`; returns the option and
    /// the total number of bytes it occupied on the wire.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 4 {
            return Err(vec_truncated("option header"));
        }
        let length = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        if length < 2 {
            return Err(vec_truncated("option length field smaller than Type+Reserved"));
        }
        let total = 2 + length;
        if bytes.len() < total {
            return Err(vec_truncated("option data"));
        }
        let option_type = bytes[2];
        let data = &bytes[4..total];

        let option = match option_type {
            option_type::IPV4_ENDPOINT if data.len() == 8 => SdOption::Ipv4Endpoint {
                address: Ipv4Addr::new(data[0], data[1], data[2], data[3]),
                proto: L4Proto::from_u8(data[5]),
                port: u16::from_be_bytes([data[6], data[7]]),
            },
            option_type::IPV6_ENDPOINT if data.len() == 20 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&data[0..16]);
                SdOption::Ipv6Endpoint {
                    address: Ipv6Addr::from(octets),
                    proto: L4Proto::from_u8(data[17]),
                    port: u16::from_be_bytes([data[18], data[19]]),
                }
            }
            option_type::IPV4_MULTICAST if data.len() == 7 => SdOption::Ipv4Multicast {
                address: Ipv4Addr::new(data[0], data[1], data[2], data[3]),
                port: u16::from_be_bytes([data[5], data[6]]),
            },
            option_type::IPV6_MULTICAST if data.len() == 19 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&data[0..16]);
                SdOption::Ipv6Multicast {
                    address: Ipv6Addr::from(octets),
                    port: u16::from_be_bytes([data[17], data[18]]),
                }
            }
            option_type::CONFIGURATION => SdOption::Configuration {
                text: String::from_utf8_lossy(data).into_owned(),
            },
            other => {
                tracing::warn!(option_type = other, "unknown SD option type skipped");
                SdOption::Unknown {
                    option_type: other,
                    data: Bytes::copy_from_slice(data),
                }
            }
        };

        if let SdOption::Ipv4Endpoint { address, .. } = &option {
            if address.is_unspecified() || *address == Ipv4Addr::BROADCAST {
                tracing::warn!(%address, "SD IPv4 endpoint uses a reserved address");
            }
        }

        Ok((option, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_endpoint_round_trips() {
        let opt = SdOption::Ipv4Endpoint {
            address: Ipv4Addr::new(10, 0, 0, 1),
            proto: L4Proto::Udp,
            port: 30500,
        };
        let bytes = opt.encode();
        let (decoded, consumed) = SdOption::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, opt);
    }

    #[test]
    fn ipv4_multicast_round_trips() {
        let opt = SdOption::Ipv4Multicast {
            address: Ipv4Addr::new(239, 0, 0, 1),
            port: 30490,
        };
        let bytes = opt.encode();
        let (decoded, _) = SdOption::decode(&bytes).unwrap();
        assert_eq!(decoded, opt);
    }

    #[test]
    fn configuration_round_trips() {
        let opt = SdOption::Configuration { text: "key=value".into() };
        let bytes = opt.encode();
        let (decoded, _) = SdOption::decode(&bytes).unwrap();
        assert_eq!(decoded, opt);
    }

    #[test]
    fn unknown_option_type_is_preserved() {
        let mut bytes = vec![0x00, 0x04, 0xEE, 0x00];
        bytes.extend_from_slice(&[1, 2]);
        bytes[0..2].copy_from_slice(&4u16.to_be_bytes());
        let (decoded, consumed) = SdOption::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert!(matches!(decoded, SdOption::Unknown { option_type: 0xEE, .. }));
    }

    #[test]
    fn truncated_option_is_rejected() {
        let bytes = [0x00, 0x09, 0x04, 0x00];
        assert!(SdOption::decode(&bytes).is_err());
    }
}
