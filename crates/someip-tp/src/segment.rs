//! TP segment framing: the 16-byte SOME/IP header followed by a 4-byte
//! TP header and a chunk of the original payload (§4.5, §6).

use bytes::Bytes;
use someip_wire::header::{Header, HEADER_SIZE};

use crate::error::{Result, TpError};

/// Size in bytes of the TP header that follows the SOME/IP header.
pub const TP_HEADER_SIZE: usize = 4;

/// Alignment, in bytes, required of every segment offset and of every
/// non-final segment's length.
pub const SEGMENT_ALIGNMENT: usize = 16;

/// One on-wire TP segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// SOME/IP header; `message_type` carries the TP flag.
    pub header: Header,
    /// Byte offset of `chunk` within the original payload; multiple of 16.
    pub offset: u32,
    /// Whether further segments follow this one.
    pub more_segments: bool,
    /// Internal bookkeeping value shared by every segment of one message;
    /// not transmitted on the wire.
    pub sequence_number: u8,
    /// The slice of the original payload carried by this segment.
    pub chunk: Bytes,
}

fn encode_tp_header(offset: u32, more: bool) -> Result<[u8; TP_HEADER_SIZE]> {
    if offset % SEGMENT_ALIGNMENT as u32 != 0 {
        return Err(TpError::SequenceError(format!(
            "offset {offset} is not 16-byte aligned"
        )));
    }
    let units = offset / SEGMENT_ALIGNMENT as u32;
    if units > 0x0FFF_FFFF {
        return Err(TpError::SequenceError(format!(
            "offset {offset} exceeds the 28-bit unit range"
        )));
    }
    let value = (units << 4) | u32::from(more);
    Ok(value.to_be_bytes())
}

fn decode_tp_header(bytes: &[u8; TP_HEADER_SIZE]) -> (u32, bool) {
    let value = u32::from_be_bytes(*bytes);
    let offset = (value >> 4) * SEGMENT_ALIGNMENT as u32;
    let more = (value & 0x1) != 0;
    (offset, more)
}

impl Segment {
    /// Serializes this segment to its on-wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let tp_header = encode_tp_header(self.offset, self.more_segments)?;
        let mut header = self.header;
        header.length = (8 + TP_HEADER_SIZE + self.chunk.len()) as u32;

        let mut out = Vec::with_capacity(HEADER_SIZE + TP_HEADER_SIZE + self.chunk.len());
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&tp_header);
        out.extend_from_slice(&self.chunk);
        Ok(out)
    }

    /// Parses a segment from on-wire bytes. `sequence_number` is not part
    /// of the wire format and defaults to `0`; callers that need ordering
    /// metadata track it separately.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = Header::from_bytes(bytes)
            .map_err(|e| TpError::MalformedSegment(e.to_string()))?;
        if !header.message_type.is_tp() {
            return Err(TpError::MalformedSegment(
                "message type does not carry the TP flag".into(),
            ));
        }
        let declared_body = header.length as usize;
        if declared_body < TP_HEADER_SIZE + 8 {
            return Err(TpError::MalformedSegment(
                "length field too short for a TP segment".into(),
            ));
        }
        let available = bytes.len().saturating_sub(HEADER_SIZE);
        if available != declared_body - 8 {
            return Err(TpError::MalformedSegment(format!(
                "declared body {} does not match available {}",
                declared_body - 8,
                available
            )));
        }

        let tp_bytes: [u8; TP_HEADER_SIZE] = bytes[HEADER_SIZE..HEADER_SIZE + TP_HEADER_SIZE]
            .try_into()
            .map_err(|_| TpError::MalformedSegment("truncated TP header".into()))?;
        let (offset, more_segments) = decode_tp_header(&tp_bytes);
        let chunk = Bytes::copy_from_slice(&bytes[HEADER_SIZE + TP_HEADER_SIZE..]);

        Ok(Segment {
            header,
            offset,
            more_segments,
            sequence_number: 0,
            chunk,
        })
    }

    /// `(source-independent)` key correlating segments of the same message:
    /// Service ID, Method ID, and Session ID (§4.6).
    pub fn reassembly_key(&self) -> (u16, u16, u16) {
        (self.header.service_id, self.header.method_id, self.header.session_id)
    }
}
