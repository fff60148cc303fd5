//! Splits an oversized SOME/IP message into offset-aligned TP segments
//! (§4.5).

use bytes::Bytes;
use someip_wire::Message;

use crate::config::TpConfig;
use crate::error::{Result, TpError};
use crate::segment::{Segment, SEGMENT_ALIGNMENT};

/// Produces TP segments for outbound messages. Owns only a wrapping
/// sequence counter; all other state lives in the message being segmented.
#[derive(Debug, Default)]
pub struct Segmenter {
    next_sequence: u8,
}

impl Segmenter {
    /// A fresh segmenter with its sequence counter at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `message`'s serialized body does not fit in one segment
    /// under `config.max_segment_size`.
    pub fn needs_segmentation(message: &Message, config: &TpConfig) -> bool {
        body_of(message).len() > config.max_segment_size
    }

    /// Splits `message` into one or more [`Segment`]s. Messages that fit
    /// within `config.max_segment_size` are returned unsegmented via
    /// [`Segmenter::single_segment`] by the caller; this method always
    /// produces TP-flagged segments and should only be called when
    /// [`Segmenter::needs_segmentation`] is true.
    pub fn segment(&mut self, message: &Message, config: &TpConfig) -> Result<Vec<Segment>> {
        let body = body_of(message);
        if body.len() > config.max_message_size {
            return Err(TpError::MessageTooLarge {
                size: body.len(),
                max: config.max_message_size,
            });
        }

        let tp_type = message.header().message_type.to_tp().ok_or_else(|| {
            TpError::SequenceError(format!(
                "message type {:?} cannot be carried over TP",
                message.header().message_type
            ))
        })?;

        let chunk_size = largest_multiple_of_alignment(config.max_segment_size);
        let sequence_number = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let mut segments = Vec::new();
        let mut offset = 0usize;
        while offset < body.len() {
            let remaining = body.len() - offset;
            let take = remaining.min(chunk_size);
            let more_segments = offset + take < body.len();
            let mut header = *message.header();
            header.message_type = tp_type;

            segments.push(Segment {
                header,
                offset: offset as u32,
                more_segments,
                sequence_number,
                chunk: Bytes::copy_from_slice(&body[offset..offset + take]),
            });
            offset += take;
        }

        if segments.is_empty() {
            let mut header = *message.header();
            header.message_type = tp_type;
            segments.push(Segment {
                header,
                offset: 0,
                more_segments: false,
                sequence_number,
                chunk: Bytes::new(),
            });
        }

        Ok(segments)
    }
}

fn largest_multiple_of_alignment(max: usize) -> usize {
    (max / SEGMENT_ALIGNMENT).max(1) * SEGMENT_ALIGNMENT
}

fn body_of(message: &Message) -> Vec<u8> {
    message.serialize().split_off(someip_wire::HEADER_SIZE)
}
