//! Reassembly of TP segments into complete messages
//!
//! Segments of one message may arrive in any order, duplicated, or not at
//! all. Each in-progress message owns a reassembly context keyed by sender
//! and request identity; contexts are bounded in size and reaped on a
//! wall-clock deadline.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Instant;

use someip::definitions::{Header, Message, TP_OFFSET_UNIT};
use someip::parser::parse_tp_segment;
use tracing::{debug, trace};

use crate::config::TpConfig;
use crate::error::StackError;

/// Identity of one in-flight reassembly
///
/// The session id ties the segments of one message together: within a key
/// at most one message is outstanding at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReassemblyKey {
    /// Endpoint the segments arrive from
    pub peer: SocketAddr,
    /// Service id of the segmented message
    pub service_id: u16,
    /// Method id of the segmented message
    pub method_id: u16,
    /// Client id of the segmented message
    pub client_id: u16,
    /// Session id of the segmented message
    pub session_id: u16,
    /// Interface version of the segmented message
    pub interface_version: u8,
}

impl ReassemblyKey {
    fn new(peer: SocketAddr, header: &Header) -> Self {
        Self {
            peer,
            service_id: header.service_id,
            method_id: header.method_id,
            client_id: header.client_id,
            session_id: header.session_id,
            interface_version: header.interface_version,
        }
    }
}

#[derive(Debug)]
struct Context {
    header: Header,
    segments: BTreeMap<u64, Vec<u8>>,
    total_length: Option<u64>,
    buffered: usize,
    last_activity: Instant,
}

impl Context {
    fn new(header: Header, now: Instant) -> Self {
        Self {
            header,
            segments: BTreeMap::new(),
            total_length: None,
            buffered: 0,
            last_activity: now,
        }
    }

    /// Whether the buffered segments cover `[0, total)` without gaps
    fn is_complete(&self) -> bool {
        let Some(total) = self.total_length else {
            return false;
        };
        let mut expected = 0u64;
        for (offset, data) in &self.segments {
            if *offset != expected {
                return false;
            }
            expected += data.len() as u64;
        }
        expected == total
    }

    fn into_message(self) -> Message {
        let mut payload = Vec::with_capacity(self.buffered);
        for data in self.segments.into_values() {
            payload.extend_from_slice(&data);
        }

        let mut header = self.header;
        header.message_type = header.message_type.without_tp_flag();
        Message { header, payload }
    }
}

/// What the insertion of one segment decided about its context
enum Placement {
    /// The segment was buffered, the message is still incomplete
    Buffered,
    /// The segment completed the message
    Completed,
    /// The exact same segment was buffered before
    Duplicate,
}

/// Reassembler of TP segments
///
/// All state mutation is serialized through one internal lock, so a shared
/// reference can be used from the receive loop and the reaper concurrently.
/// Completed messages are returned in the order their final missing segment
/// arrived, which is not necessarily the order their first segment arrived.
#[derive(Debug)]
pub struct Reassembler {
    config: TpConfig,
    contexts: Mutex<HashMap<ReassemblyKey, Context>>,
}

impl Reassembler {
    /// Create a reassembler without any contexts
    pub fn new(config: TpConfig) -> Self {
        Self {
            config,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Feed one TP frame, returning the reassembled message once the final
    /// gap closes
    ///
    /// A malformed segment rejects only itself; a segment contradicting the
    /// already buffered data discards the whole context. Either way the
    /// error is surfaced exactly once.
    pub fn insert(&self, peer: SocketAddr, message: &Message) -> Result<Option<Message>, StackError> {
        self.insert_at(peer, message, Instant::now())
    }

    /// [Reassembler::insert] with an explicit current time
    #[allow(clippy::unwrap_used)]
    pub fn insert_at(
        &self,
        peer: SocketAddr,
        message: &Message,
        now: Instant,
    ) -> Result<Option<Message>, StackError> {
        let tp = parse_tp_segment(message)?;
        let offset = u64::from(tp.byte_offset);
        let len = tp.data.len() as u64;

        // every segment except the final one must keep the 16 byte grid
        if tp.more_segments && len % u64::from(TP_OFFSET_UNIT) != 0 {
            return Err(StackError::MalformedMessage);
        }

        let key = ReassemblyKey::new(peer, &message.header);
        let mut contexts = self.contexts.lock().unwrap();
        let context = contexts
            .entry(key)
            .or_insert_with(|| Context::new(message.header, now));

        match Self::place(context, &self.config, offset, tp.data, tp.more_segments, now) {
            Ok(Placement::Buffered) => Ok(None),
            Ok(Placement::Duplicate) => {
                trace!("Dropping duplicate segment at offset {offset}");
                Ok(None)
            }
            Ok(Placement::Completed) => {
                // remove the finished context under the same lock
                let context = contexts.remove(&key).unwrap();
                Ok(Some(context.into_message()))
            }
            Err(err) => {
                if err == StackError::MalformedMessage {
                    debug!("Discarding reassembly context for {key:?}");
                    contexts.remove(&key);
                }
                Err(err)
            }
        }
    }

    fn place(
        context: &mut Context,
        config: &TpConfig,
        offset: u64,
        data: &[u8],
        more_segments: bool,
        now: Instant,
    ) -> Result<Placement, StackError> {
        let len = data.len() as u64;
        let end = offset + len;

        // an exact duplicate is dropped before any other verdict
        if let Some(existing) = context.segments.get(&offset) {
            if existing.as_slice() == data {
                return Ok(Placement::Duplicate);
            }
        }

        // a neighbour overlapping with different extent or bytes poisons
        // the whole context, partial overlaps are never merged
        if let Some((prev_offset, prev_data)) = context.segments.range(..=offset).next_back() {
            if prev_offset + prev_data.len() as u64 > offset {
                return Err(StackError::MalformedMessage);
            }
        }
        if let Some((next_offset, _)) = context.segments.range(offset..).next() {
            if end > *next_offset {
                return Err(StackError::MalformedMessage);
            }
        }

        // the final segment fixes the total length for good
        if let Some(total) = context.total_length {
            if end > total || (!more_segments && end != total) {
                return Err(StackError::MalformedMessage);
            }
        }
        if !more_segments {
            let highest_end = context
                .segments
                .last_key_value()
                .map(|(o, d)| o + d.len() as u64)
                .unwrap_or(0);
            if highest_end > end {
                return Err(StackError::MalformedMessage);
            }
            context.total_length = Some(end);
        }

        if context.buffered + data.len() > config.max_buffer_per_context {
            return Err(StackError::MalformedMessage);
        }

        context.segments.insert(offset, data.to_vec());
        context.buffered += data.len();
        context.last_activity = now;

        if context.is_complete() {
            Ok(Placement::Completed)
        } else {
            Ok(Placement::Buffered)
        }
    }

    /// Drop every context idle past the reassembly timeout, reporting the
    /// affected keys
    ///
    /// The caller is expected to run this at least every half timeout and
    /// surface [StackError::Timeout] for each returned key.
    #[allow(clippy::unwrap_used)]
    pub fn expire(&self, now: Instant) -> Vec<ReassemblyKey> {
        let mut contexts = self.contexts.lock().unwrap();
        let timeout = self.config.reassembly_timeout;
        let expired: Vec<ReassemblyKey> = contexts
            .iter()
            .filter(|(_, context)| now.duration_since(context.last_activity) >= timeout)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            debug!("Reassembly of {key:?} timed out");
            contexts.remove(key);
        }
        expired
    }

    /// Drop every context unconditionally, reporting the affected keys
    ///
    /// Used on shutdown, where all outstanding reassemblies are reported as
    /// timed out.
    #[allow(clippy::unwrap_used)]
    pub fn discard_all(&self) -> Vec<ReassemblyKey> {
        let mut contexts = self.contexts.lock().unwrap();
        contexts.drain().map(|(key, _)| key).collect()
    }

    /// Number of in-progress reassemblies
    #[allow(clippy::unwrap_used)]
    pub fn in_progress(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    /// The configured reassembly timeout
    pub fn timeout(&self) -> std::time::Duration {
        self.config.reassembly_timeout
    }
}
