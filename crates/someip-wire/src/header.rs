//! The fixed 16-byte SOME/IP message header (§3, §4.2).

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Result, WireError};

/// Size in bytes of the fixed SOME/IP header.
pub const HEADER_SIZE: usize = 16;

/// Only protocol version this implementation accepts.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Reserved Interface Version sentinel for "moved from" services.
pub const INTERFACE_VERSION_RESERVED: u8 = 0xFF;

/// Service ID reserved for Service Discovery.
pub const SD_SERVICE_ID: u16 = 0xFFFF;

/// Method ID reserved for Service Discovery.
pub const SD_METHOD_ID: u16 = 0x8100;

/// Bit in the Message Type byte marking a Transport Protocol segment.
pub const TP_FLAG: u8 = 0x20;

/// Wire values for the SOME/IP Message Type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Request expecting a response.
    Request = 0x00,
    /// Fire-and-forget request.
    RequestNoReturn = 0x01,
    /// Event/field notification.
    Notification = 0x02,
    /// Request segment (TP).
    TpRequest = 0x20,
    /// Fire-and-forget request segment (TP).
    TpRequestNoReturn = 0x21,
    /// Notification segment (TP).
    TpNotification = 0x22,
    /// Transport-layer acknowledgement of a request.
    RequestAck = 0x40,
    /// Successful response.
    Response = 0x80,
    /// Error response.
    Error = 0x81,
    /// Transport-layer acknowledgement of a response.
    ResponseAck = 0xC0,
    /// Transport-layer acknowledgement of an error response.
    ErrorAck = 0xC1,
}

impl MessageType {
    /// Parses a raw byte, rejecting values outside the known set.
    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0x00 => MessageType::Request,
            0x01 => MessageType::RequestNoReturn,
            0x02 => MessageType::Notification,
            0x20 => MessageType::TpRequest,
            0x21 => MessageType::TpRequestNoReturn,
            0x22 => MessageType::TpNotification,
            0x40 => MessageType::RequestAck,
            0x80 => MessageType::Response,
            0x81 => MessageType::Error,
            0xC0 => MessageType::ResponseAck,
            0xC1 => MessageType::ErrorAck,
            other => {
                return Err(WireError::MalformedMessage(format!(
                    "unknown message type 0x{other:02X}"
                )))
            }
        })
    }

    /// True if this message is a Transport Protocol (SOME/IP-TP) segment.
    pub fn is_tp(self) -> bool {
        (self as u8) & TP_FLAG != 0
    }

    /// True for REQUEST/REQUEST_NO_RETURN/NOTIFICATION and their TP variants.
    pub fn is_request_like(self) -> bool {
        matches!(
            self,
            MessageType::Request
                | MessageType::RequestNoReturn
                | MessageType::Notification
                | MessageType::TpRequest
                | MessageType::TpRequestNoReturn
                | MessageType::TpNotification
        )
    }

    /// The TP-flagged variant of this type, for the REQUEST/
    /// REQUEST_NO_RETURN/NOTIFICATION family the Transport Protocol
    /// segments (§4.5). `None` for types TP never applies to.
    pub fn to_tp(self) -> Option<MessageType> {
        match self {
            MessageType::Request | MessageType::TpRequest => Some(MessageType::TpRequest),
            MessageType::RequestNoReturn | MessageType::TpRequestNoReturn => {
                Some(MessageType::TpRequestNoReturn)
            }
            MessageType::Notification | MessageType::TpNotification => {
                Some(MessageType::TpNotification)
            }
            _ => None,
        }
    }

    /// The non-TP variant of this type, clearing the TP flag (§4.6
    /// reassembly restores the original message type).
    pub fn from_tp(self) -> MessageType {
        match self {
            MessageType::TpRequest => MessageType::Request,
            MessageType::TpRequestNoReturn => MessageType::RequestNoReturn,
            MessageType::TpNotification => MessageType::Notification,
            other => other,
        }
    }
}

/// The 16-byte fixed SOME/IP header, byte-exact and big-endian on the wire.
///
/// Stored host-native; `to_bytes`/`from_bytes` perform the big-endian
/// conversion explicitly rather than relying on a packed-layout cast, since
/// several fields are validated (not just transported) on every parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Service identity; `0xFFFF` is reserved for Service Discovery.
    pub service_id: u16,
    /// Method (`0x0000..=0x7FFF`) or event (`0x8000..=0xFFFE`) identity.
    pub method_id: u16,
    /// Bytes from offset 8 to the end of the message (E2E header + payload).
    pub length: u32,
    /// Client identity; `0x0000` for Service Discovery.
    pub client_id: u16,
    /// Session identity; `0` disables sessioning.
    pub session_id: u16,
    /// Must equal [`PROTOCOL_VERSION`].
    pub protocol_version: u8,
    /// Application-defined, application-validated.
    pub interface_version: u8,
    /// Request/response/notification/TP-segment discriminant.
    pub message_type: MessageType,
    /// `E_OK` (`0x00`) for requests and notifications.
    pub return_code: u8,
}

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy)]
#[repr(C)]
struct RawHeader {
    service_id: [u8; 2],
    method_id: [u8; 2],
    length: [u8; 4],
    client_id: [u8; 2],
    session_id: [u8; 2],
    protocol_version: u8,
    interface_version: u8,
    message_type: u8,
    return_code: u8,
}

impl Header {
    /// Serializes the header to exactly [`HEADER_SIZE`] bytes.
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let raw = RawHeader {
            service_id: self.service_id.to_be_bytes(),
            method_id: self.method_id.to_be_bytes(),
            length: self.length.to_be_bytes(),
            client_id: self.client_id.to_be_bytes(),
            session_id: self.session_id.to_be_bytes(),
            protocol_version: self.protocol_version,
            interface_version: self.interface_version,
            message_type: self.message_type as u8,
            return_code: self.return_code,
        };
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    /// Parses a header from `bytes`, which must be at least [`HEADER_SIZE`]
    /// bytes long. Does not validate semantic invariants; see
    /// [`Header::validate`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(WireError::InsufficientData {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let raw = RawHeader::ref_from_bytes(&bytes[..HEADER_SIZE])
            .map_err(|_| WireError::MalformedMessage("header alignment/size mismatch".into()))?;
        Ok(Header {
            service_id: u16::from_be_bytes(raw.service_id),
            method_id: u16::from_be_bytes(raw.method_id),
            length: u32::from_be_bytes(raw.length),
            client_id: u16::from_be_bytes(raw.client_id),
            session_id: u16::from_be_bytes(raw.session_id),
            protocol_version: raw.protocol_version,
            interface_version: raw.interface_version,
            message_type: MessageType::from_u8(raw.message_type)?,
            return_code: raw.return_code,
        })
    }

    /// True if `service_id`/`method_id` identify a Service Discovery message.
    pub fn is_service_discovery(&self) -> bool {
        self.service_id == SD_SERVICE_ID && self.method_id == SD_METHOD_ID
    }

    /// Structural validation independent of payload/E2E size (§4.2).
    pub fn validate(&self) -> Result<()> {
        if self.protocol_version != PROTOCOL_VERSION {
            return Err(WireError::MalformedMessage(format!(
                "unsupported protocol version 0x{:02X}",
                self.protocol_version
            )));
        }
        if self.interface_version == INTERFACE_VERSION_RESERVED {
            return Err(WireError::MalformedMessage(
                "interface version 0xFF is reserved".into(),
            ));
        }
        if self.message_type.is_request_like() && self.return_code != 0x00 {
            return Err(WireError::MalformedMessage(format!(
                "request/notification must carry return code 0x00, got 0x{:02X}",
                self.return_code
            )));
        }
        if self.length < 8 {
            return Err(WireError::MalformedMessage(format!(
                "length {} shorter than minimum 8",
                self.length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            service_id: 0x1234,
            method_id: 0x5678,
            length: 8,
            client_id: 0x9ABC,
            session_id: 0xDEF0,
            protocol_version: PROTOCOL_VERSION,
            interface_version: 0x01,
            message_type: MessageType::Request,
            return_code: 0x00,
        }
    }

    #[test]
    fn round_trips_exact_bytes() {
        let h = sample();
        let bytes = h.to_bytes();
        assert_eq!(
            bytes,
            [
                0x12, 0x34, 0x56, 0x78, 0x00, 0x00, 0x00, 0x08, 0x9A, 0xBC, 0xDE, 0xF0, 0x01,
                0x01, 0x00, 0x00
            ]
        );
        assert_eq!(Header::from_bytes(&bytes).unwrap(), h);
    }

    #[test]
    fn rejects_wrong_protocol_version() {
        let mut h = sample();
        h.protocol_version = 0x02;
        assert!(h.validate().is_err());
    }

    #[test]
    fn rejects_reserved_interface_version() {
        let mut h = sample();
        h.interface_version = 0xFF;
        assert!(h.validate().is_err());
    }

    #[test]
    fn rejects_nonzero_return_code_on_request() {
        let mut h = sample();
        h.return_code = 0x01;
        assert!(h.validate().is_err());
    }

    #[test]
    fn rejects_unknown_message_type() {
        let mut bytes = sample().to_bytes();
        bytes[14] = 0x55;
        assert!(Header::from_bytes(&bytes).is_err());
    }

    #[test]
    fn short_buffer_is_insufficient_data() {
        assert!(matches!(
            Header::from_bytes(&[0u8; 10]),
            Err(WireError::InsufficientData { .. })
        ));
    }

    #[test]
    fn recognizes_service_discovery_addressing() {
        let mut h = sample();
        h.service_id = SD_SERVICE_ID;
        h.method_id = SD_METHOD_ID;
        assert!(h.is_service_discovery());
    }
}
