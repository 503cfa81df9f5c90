//! Stream Frame Decoding
//!
//! Incremental decoder for the lesson event stream. The transport delivers
//! raw byte fragments whose boundaries have no relationship to event
//! boundaries: a fragment may contain several events, half an event, or a few
//! bytes of a multi-byte UTF-8 sequence.
//!
//! # Frame Format
//!
//! ```text
//! data: {"chunk":"Photosynthesis is"}\n
//! \n
//! data: {"chunk":" the process"}\n
//! \n
//! data: {"finished":true,"image_prompts":["..."]}\n
//! \n
//! ```
//!
//! Events are separated by a blank line (`\n\n`). Each complete candidate
//! must start with the `data: ` field prefix; anything else (keep-alive
//! comments, stray blank lines) is dropped silently. Malformed JSON payloads
//! are likewise dropped and counted, never propagated. A single corrupt
//! frame must not abort the session.
//!
//! Buffering is byte-level: an incomplete trailing fragment stays in the
//! buffer until later feeds complete it, so a UTF-8 sequence split across
//! network reads is never decoded partially.

use crate::protocol::{parse_payload, StreamEvent};

/// Event separator: a blank line between frames
const EVENT_DELIMITER: &[u8] = b"\n\n";

/// Field prefix carried by every conforming payload line
const DATA_PREFIX: &[u8] = b"data: ";

/// Minimum buffer capacity for the decoder
const MIN_BUFFER_CAPACITY: usize = 1024;

/// Decoder state machine for the lesson event stream
///
/// Buffers incoming byte fragments and yields complete [`StreamEvent`]s.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    dropped_frames: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder with default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            dropped_frames: 0,
        }
    }

    /// Feed one transport fragment, returning every event it completes
    ///
    /// Zero or more events per call. A fragment containing no delimiter only
    /// grows the buffer. The final piece after the last delimiter (possibly
    /// empty) is retained as the new buffer.
    pub fn feed(&mut self, fragment: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(fragment);

        let mut events = Vec::new();
        let mut start = 0;

        while let Some(rel) = find_delimiter(&self.buffer[start..]) {
            let end = start + rel;
            let candidate = self.buffer[start..end].to_vec();
            start = end + EVENT_DELIMITER.len();

            match decode_candidate(&candidate) {
                Some(event) => events.push(event),
                None => self.dropped_frames += 1,
            }
        }

        self.buffer.drain(..start);
        events
    }

    /// Number of bytes buffered awaiting a delimiter
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Number of candidates discarded so far (missing prefix or bad payload)
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Clear the buffer and counters
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.dropped_frames = 0;
    }
}

/// Find the next event delimiter in `haystack`
fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(EVENT_DELIMITER.len())
        .position(|window| window == EVENT_DELIMITER)
}

/// Decode one complete candidate into an event
///
/// Returns `None` for non-conforming candidates: missing `data: ` prefix
/// (keep-alive comments and the like) or an unparseable payload.
fn decode_candidate(candidate: &[u8]) -> Option<StreamEvent> {
    let Some(payload) = candidate.strip_prefix(DATA_PREFIX) else {
        tracing::debug!(
            len = candidate.len(),
            "discarding frame without data prefix"
        );
        return None;
    };

    match parse_payload(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, "discarding malformed frame payload");
            None
        }
    }
}
