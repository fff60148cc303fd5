//! Gap-tracked reassembly of TP segments back into a [`Message`] (§4.6).

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use someip_wire::Message;

use crate::config::TpConfig;
use crate::error::{Result, TpError};
use crate::segment::Segment;

/// Identifies one reassembly buffer: the segment's originating endpoint plus
/// the SOME/IP addressing triple that ties its segments together (§4.6).
///
/// Generic over `Source` so callers can key on whatever endpoint type their
/// transport uses (a `SocketAddr`, a test-only peer id, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReassemblyKey<Source> {
    /// The endpoint the segments arrived from.
    pub source: Source,
    /// Service ID shared by every segment of the message.
    pub service_id: u16,
    /// Method ID shared by every segment of the message.
    pub method_id: u16,
    /// Session ID shared by every segment of the message.
    pub session_id: u16,
}

/// Non-overlapping, maximally-merged `[start, end)` byte ranges already
/// received for a buffer.
#[derive(Debug, Default, Clone)]
struct Coverage {
    ranges: Vec<(u32, u32)>,
}

/// Outcome of inserting one `[start, end)` range into a [`Coverage`].
enum Insert {
    /// The range was already fully covered by existing ranges; a duplicate.
    Duplicate,
    /// The range partially overlapped an existing range without being fully
    /// contained: a protocol violation per §4.6.
    Overlap,
    /// The range was new and has been merged in.
    Inserted,
}

impl Coverage {
    fn insert(&mut self, start: u32, end: u32) -> Insert {
        if start >= end {
            return Insert::Inserted;
        }
        for &(existing_start, existing_end) in &self.ranges {
            if existing_start <= start && end <= existing_end {
                return Insert::Duplicate;
            }
        }
        for &(existing_start, existing_end) in &self.ranges {
            let disjoint = end <= existing_start || existing_end <= start;
            if !disjoint {
                return Insert::Overlap;
            }
        }

        self.ranges.push((start, end));
        self.ranges.sort_unstable_by_key(|r| r.0);
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(self.ranges.len());
        for &(s, e) in &self.ranges {
            if let Some(last) = merged.last_mut() {
                if s <= last.1 {
                    last.1 = last.1.max(e);
                    continue;
                }
            }
            merged.push((s, e));
        }
        self.ranges = merged;
        Insert::Inserted
    }

    fn covers(&self, total_length: u32) -> bool {
        self.ranges.len() == 1 && self.ranges[0] == (0, total_length)
    }
}

struct Buffer {
    payload: Vec<u8>,
    coverage: Coverage,
    total_length: Option<u32>,
    first_seen: Instant,
    template: Option<Message>,
}

impl Buffer {
    fn new(now: Instant) -> Self {
        Self {
            payload: Vec::new(),
            coverage: Coverage::default(),
            total_length: None,
            first_seen: now,
            template: None,
        }
    }

    fn ensure_capacity(&mut self, len: usize) {
        if self.payload.len() < len {
            self.payload.resize(len, 0);
        }
    }
}

/// Reassembles TP segments into complete [`Message`]s, one buffer per
/// [`ReassemblyKey`] (§4.6). Owns all buffers exclusively; a buffer is
/// destroyed on completion, timeout, or total-length inconsistency.
pub struct Reassembler<Source>
where
    Source: Clone + Eq + Hash,
{
    buffers: HashMap<ReassemblyKey<Source>, Buffer>,
    config: TpConfig,
}

impl<Source> Reassembler<Source>
where
    Source: Clone + Eq + Hash,
{
    /// Creates a reassembler with the given configuration.
    pub fn new(config: TpConfig) -> Self {
        Self {
            buffers: HashMap::new(),
            config,
        }
    }

    /// Number of buffers currently in flight.
    pub fn active_count(&self) -> usize {
        self.buffers.len()
    }

    /// True if a buffer for `key` is currently being assembled.
    pub fn is_reassembling(&self, key: &ReassemblyKey<Source>) -> bool {
        self.buffers.contains_key(key)
    }

    /// Feeds one segment from `source` into the reassembler. Returns the
    /// completed message once every byte has arrived, `None` while a
    /// buffer is still incomplete (including for ignored duplicates and
    /// discarded overlaps, which are logged but not surfaced as errors),
    /// or an error for malformed input or a resource limit.
    #[allow(clippy::expect_used, reason = "buffer presence is established a few lines above each access")]
    pub fn process(&mut self, source: Source, segment: &Segment, now: Instant) -> Result<Option<Message>> {
        let (service_id, method_id, session_id) = segment.reassembly_key();
        let key = ReassemblyKey {
            source,
            service_id,
            method_id,
            session_id,
        };

        let start = segment.offset;
        let end = start
            .checked_add(segment.chunk.len() as u32)
            .ok_or_else(|| TpError::MalformedSegment("offset+length overflow".into()))?;

        if !self.buffers.contains_key(&key) {
            if self.buffers.len() >= self.config.max_concurrent_reassemblies {
                return Err(TpError::ResourceExhausted(format!(
                    "{} concurrent reassembly buffers already active",
                    self.buffers.len()
                )));
            }
            self.buffers.insert(key.clone(), Buffer::new(now));
        }

        let declared_total = if segment.more_segments { None } else { Some(end) };

        {
            let buffer = self.buffers.get(&key).expect("just inserted or present");
            if let (Some(existing), Some(declared)) = (buffer.total_length, declared_total) {
                if existing != declared {
                    self.buffers.remove(&key);
                    return Err(TpError::MalformedMessage(format!(
                        "conflicting total length: {existing} vs {declared}"
                    )));
                }
            }
            if let Some(existing) = buffer.total_length {
                if end > existing {
                    self.buffers.remove(&key);
                    return Err(TpError::MalformedMessage(format!(
                        "segment range end {end} exceeds declared total {existing}"
                    )));
                }
            }
        }

        if end as usize > self.config.max_message_size {
            self.buffers.remove(&key);
            return Err(TpError::MessageTooLarge {
                size: end as usize,
                max: self.config.max_message_size,
            });
        }

        let buffer = self.buffers.get_mut(&key).expect("buffer present");
        if let Some(declared) = declared_total {
            buffer.total_length = Some(declared);
        }
        if buffer.template.is_none() {
            let mut header = segment.header;
            header.message_type = header.message_type.from_tp();
            buffer.template = Some(Message::new(header, None, bytes::Bytes::new()));
        }

        match buffer.coverage.insert(start, end) {
            Insert::Duplicate => {
                tracing::debug!(
                    service_id = key.service_id,
                    method_id = key.method_id,
                    start,
                    end,
                    "duplicate TP segment ignored"
                );
                return Ok(None);
            }
            Insert::Overlap => {
                tracing::warn!(
                    service_id = key.service_id,
                    method_id = key.method_id,
                    start,
                    end,
                    "overlapping TP segment discarded"
                );
                return Ok(None);
            }
            Insert::Inserted => {}
        }

        buffer.ensure_capacity(end as usize);
        buffer.payload[start as usize..end as usize].copy_from_slice(&segment.chunk);

        let Some(total_length) = buffer.total_length else {
            return Ok(None);
        };
        if !buffer.coverage.covers(total_length) {
            return Ok(None);
        }

        let buffer = self.buffers.remove(&key).expect("buffer present");
        let template = buffer.template.expect("template set on first segment");
        let payload_bytes = buffer.payload;
        let body = payload_bytes;
        let header = *template.header();

        // `body` is the original SOME/IP body (everything after the fixed
        // header): E2E header (if any) plus payload. Reconstruct the raw
        // on-wire bytes and let `Message::deserialize` re-derive E2E
        // presence instead of duplicating that heuristic here.
        let mut raw = Vec::with_capacity(someip_wire::HEADER_SIZE + body.len());
        let mut rebuilt_header = header;
        rebuilt_header.length = (8 + body.len()) as u32;
        raw.extend_from_slice(&rebuilt_header.to_bytes());
        raw.extend_from_slice(&body);

        let message = Message::deserialize(&raw)
            .map_err(|e| TpError::MalformedMessage(format!("reassembled message invalid: {e}")))?;
        Ok(Some(message))
    }

    /// Destroys every buffer whose first segment arrived more than
    /// `config.reassembly_timeout` ago, returning the keys that timed out
    /// so the caller can surface [`TpError::ReassemblyTimeout`] per key.
    pub fn process_timeouts(&mut self, now: Instant) -> Vec<ReassemblyKey<Source>> {
        let timeout: Duration = self.config.reassembly_timeout;
        let expired: Vec<ReassemblyKey<Source>> = self
            .buffers
            .iter()
            .filter(|(_, buffer)| now.duration_since(buffer.first_seen) > timeout)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.buffers.remove(key);
        }
        expired
    }
}
