//! Parses and emits the SD payload and the SOME/IP framing it rides in
//! (§4.7, §6).

use bytes::Bytes;
use someip_wire::header::{
    Header, MessageType, HEADER_SIZE, PROTOCOL_VERSION, SD_METHOD_ID, SD_SERVICE_ID,
};
use someip_wire::Message;

use crate::entry::{SdEntry, ENTRY_SIZE};
use crate::error::{vec_truncated, Result, SdError};
use crate::option::SdOption;

/// Interface version SD itself always uses.
pub const SD_INTERFACE_VERSION: u8 = 0x01;

/// Bit in the SD Flags byte marking that the sender has rebooted.
const FLAG_REBOOT: u8 = 0x80;
/// Bit in the SD Flags byte marking that this message targets a specific
/// unicast recipient rather than the multicast group.
const FLAG_UNICAST: u8 = 0x40;

/// A fully parsed SD message: the SOME/IP session id plus the decoded SD
/// payload (§3, §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdMessage {
    /// SOME/IP Session ID carried by the enclosing header.
    pub session_id: u16,
    /// Reboot flag (§4.9 reboot detection).
    pub reboot: bool,
    /// Unicast flag.
    pub unicast: bool,
    /// Parsed entries, in wire order. Unknown entry types are omitted.
    pub entries: Vec<SdEntry>,
    /// Parsed options, in wire order (including [`SdOption::Unknown`] so
    /// entry option-run indices stay valid).
    pub options: Vec<SdOption>,
}

impl SdMessage {
    /// Builds the framing-correct [`Message`] carrying this SD payload.
    pub fn to_message(&self) -> Message {
        let header = Header {
            service_id: SD_SERVICE_ID,
            method_id: SD_METHOD_ID,
            length: 0,
            client_id: 0x0000,
            session_id: self.session_id,
            protocol_version: PROTOCOL_VERSION,
            interface_version: SD_INTERFACE_VERSION,
            message_type: MessageType::Notification,
            return_code: 0x00,
        };
        Message::new(header, None, Bytes::from(self.encode_payload()))
    }

    /// Parses an [`SdMessage`] out of `message`, validating SOME/IP
    /// framing first (§4.7).
    pub fn from_message(message: &Message) -> Result<Self> {
        let header = message.header();
        if header.service_id != SD_SERVICE_ID {
            return Err(SdError::InvalidFraming(format!(
                "service id 0x{:04X} is not the SD service id",
                header.service_id
            )));
        }
        if header.method_id != SD_METHOD_ID {
            return Err(SdError::InvalidFraming(format!(
                "method id 0x{:04X} is not the SD method id",
                header.method_id
            )));
        }
        if header.client_id != 0x0000 {
            return Err(SdError::InvalidFraming("SD client id must be 0x0000".into()));
        }
        if header.protocol_version != PROTOCOL_VERSION {
            return Err(SdError::InvalidFraming("unexpected SD protocol version".into()));
        }
        if header.interface_version != SD_INTERFACE_VERSION {
            return Err(SdError::InvalidFraming("unexpected SD interface version".into()));
        }
        if header.message_type != MessageType::Notification {
            return Err(SdError::InvalidFraming("SD message type must be NOTIFICATION".into()));
        }
        if header.return_code != 0x00 {
            return Err(SdError::InvalidFraming("SD return code must be E_OK".into()));
        }

        let (reboot, unicast, entries, options) = parse_payload(message.payload())?;
        Ok(SdMessage {
            session_id: header.session_id,
            reboot,
            unicast,
            entries,
            options,
        })
    }

    fn encode_payload(&self) -> Vec<u8> {
        let mut entries_bytes = Vec::with_capacity(self.entries.len() * ENTRY_SIZE);
        for entry in &self.entries {
            entries_bytes.extend_from_slice(&entry.encode());
        }
        let mut options_bytes = Vec::new();
        for option in &self.options {
            options_bytes.extend_from_slice(&option.encode());
        }

        let mut flags = 0u8;
        if self.reboot {
            flags |= FLAG_REBOOT;
        }
        if self.unicast {
            flags |= FLAG_UNICAST;
        }

        let mut out = Vec::with_capacity(8 + entries_bytes.len() + 4 + options_bytes.len());
        out.push(flags);
        out.extend_from_slice(&[0, 0, 0]); // reserved
        out.extend_from_slice(&(entries_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&entries_bytes);
        out.extend_from_slice(&(options_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&options_bytes);
        out
    }
}

fn parse_payload(payload: &[u8]) -> Result<(bool, bool, Vec<SdEntry>, Vec<SdOption>)> {
    if payload.len() < 8 {
        return Err(vec_truncated("SD payload header"));
    }
    let flags = payload[0];
    let reboot = flags & FLAG_REBOOT != 0;
    let unicast = flags & FLAG_UNICAST != 0;

    let entries_len = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]) as usize;
    let after_entries_len = 8;
    if entries_len > payload.len() - after_entries_len {
        return Err(SdError::LengthExceedsPayload(format!(
            "EntriesLen {entries_len} exceeds remaining {} bytes",
            payload.len() - after_entries_len
        )));
    }
    if entries_len % ENTRY_SIZE != 0 {
        return Err(SdError::LengthExceedsPayload(format!(
            "EntriesLen {entries_len} is not a multiple of the {ENTRY_SIZE}-byte entry size"
        )));
    }
    let entries_start = after_entries_len;
    let entries_end = entries_start + entries_len;

    let options_len_start = entries_end;
    if payload.len() < options_len_start + 4 {
        return Err(vec_truncated("OptionsLen field"));
    }
    let options_len = u32::from_be_bytes([
        payload[options_len_start],
        payload[options_len_start + 1],
        payload[options_len_start + 2],
        payload[options_len_start + 3],
    ]) as usize;
    let options_start = options_len_start + 4;
    if options_len > payload.len() - options_start {
        return Err(SdError::LengthExceedsPayload(format!(
            "OptionsLen {options_len} exceeds remaining {} bytes",
            payload.len() - options_start
        )));
    }
    let options_end = options_start + options_len;

    let mut options = Vec::new();
    let mut cursor = options_start;
    while cursor < options_end {
        let (option, consumed) = SdOption::decode(&payload[cursor..options_end])?;
        options.push(option);
        cursor += consumed;
    }
    if cursor != options_end {
        return Err(SdError::LengthExceedsPayload(
            "option data does not align with OptionsLen".into(),
        ));
    }

    let mut entries = Vec::new();
    let mut cursor = entries_start;
    while cursor < entries_end {
        if let Some(entry) = SdEntry::decode(&payload[cursor..cursor + ENTRY_SIZE], options.len())? {
            entries.push(entry);
        }
        cursor += ENTRY_SIZE;
    }

    Ok((reboot, unicast, entries, options))
}

/// Total on-wire size of the 16-byte SOME/IP header plus `message`'s body,
/// for callers assembling datagrams directly.
pub fn wire_size(message: &Message) -> usize {
    HEADER_SIZE + message.payload().len()
}
