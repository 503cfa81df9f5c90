//! Stream Protocol Events
//!
//! The generation backend streams lessons as an SSE-like protocol: events are
//! separated by a blank line and each payload line carries a small JSON
//! object. This module defines the decoded, typed form of those payloads.
//!
//! # Design Philosophy
//!
//! The wire payloads are loose JSON with optional fields. Everything is
//! validated and classified here, at the decode boundary, so the rest of the
//! crate only ever sees the closed [`StreamEvent`] union and never inspects
//! raw payloads.
//!
//! # Payload Schema
//!
//! All fields are optional:
//!
//! - `{ "chunk": string }`: incremental text delta
//! - `{ "finished": true, "image_prompts": [string, ...] }`: terminal success
//! - `{ "error": string }`: terminal failure
//!
//! A payload carrying both `chunk` text and a terminal field is classified as
//! terminal; the trailing chunk text is dropped. Classification precedence is
//! `error` > `finished` > `chunk`.

use serde::Deserialize;

/// A decoded event from the lesson stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental text delta belonging to the lesson body
    Chunk(String),
    /// Terminal success; the lesson is complete
    Finished {
        /// Image prompts captured at completion (may be empty)
        image_prompts: Vec<String>,
    },
    /// Terminal failure with a human-readable message
    Failure(String),
}

impl StreamEvent {
    /// Whether this event ends the stream (`Finished` or `Failure`)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failure(_))
    }

    /// Convenience accessor for `Chunk` contents
    #[must_use]
    pub fn as_chunk(&self) -> Option<&str> {
        match self {
            Self::Chunk(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Raw wire payload of one stream event
///
/// Deserialized leniently: unknown fields are ignored and every known field
/// is optional. Use [`EventPayload::into_event`] to obtain the typed form.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventPayload {
    /// Incremental text delta (missing is treated as empty)
    #[serde(default)]
    pub chunk: Option<String>,
    /// Terminal-success flag
    #[serde(default)]
    pub finished: bool,
    /// Image prompts attached to the terminal-success payload
    #[serde(default)]
    pub image_prompts: Option<Vec<String>>,
    /// Terminal-failure message
    #[serde(default)]
    pub error: Option<String>,
}

impl EventPayload {
    /// Classify this payload into a [`StreamEvent`]
    ///
    /// Precedence: `error` > `finished` > `chunk`. A missing `chunk` field
    /// classifies as an empty chunk rather than an error.
    #[must_use]
    pub fn into_event(self) -> StreamEvent {
        if let Some(message) = self.error {
            return StreamEvent::Failure(message);
        }
        if self.finished {
            return StreamEvent::Finished {
                image_prompts: self.image_prompts.unwrap_or_default(),
            };
        }
        StreamEvent::Chunk(self.chunk.unwrap_or_default())
    }
}

/// Parse one event payload from raw bytes
///
/// # Errors
///
/// Returns the underlying `serde_json` error if the bytes are not a valid
/// JSON object (including invalid UTF-8 inside the payload).
pub fn parse_payload(payload: &[u8]) -> Result<StreamEvent, serde_json::Error> {
    serde_json::from_slice::<EventPayload>(payload).map(EventPayload::into_event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_payload() {
        let event = parse_payload(br#"{"chunk":"Hello"}"#).unwrap();
        assert_eq!(event, StreamEvent::Chunk("Hello".to_string()));
        assert!(!event.is_terminal());
        assert_eq!(event.as_chunk(), Some("Hello"));
    }

    #[test]
    fn test_missing_chunk_is_empty() {
        let event = parse_payload(br"{}").unwrap();
        assert_eq!(event, StreamEvent::Chunk(String::new()));
    }

    #[test]
    fn test_finished_payload() {
        let event =
            parse_payload(br#"{"chunk":"","finished":true,"image_prompts":["a cat"]}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Finished {
                image_prompts: vec!["a cat".to_string()],
            }
        );
        assert!(event.is_terminal());
    }

    #[test]
    fn test_finished_without_prompts_defaults_empty() {
        let event = parse_payload(br#"{"finished":true}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Finished {
                image_prompts: Vec::new(),
            }
        );
    }

    #[test]
    fn test_error_payload() {
        let event = parse_payload(br#"{"error":"API error: 500"}"#).unwrap();
        assert_eq!(event, StreamEvent::Failure("API error: 500".to_string()));
        assert!(event.is_terminal());
    }

    #[test]
    fn test_error_wins_over_finished() {
        let event =
            parse_payload(br#"{"error":"boom","finished":true,"chunk":"trailing"}"#).unwrap();
        assert_eq!(event, StreamEvent::Failure("boom".to_string()));
    }

    #[test]
    fn test_finished_drops_trailing_chunk() {
        // A frame that carries both chunk text and the finished flag is
        // terminal; the trailing text is not part of the lesson.
        let event = parse_payload(br#"{"chunk":"tail","finished":true}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Finished {
                image_prompts: Vec::new(),
            }
        );
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let event = parse_payload(br#"{"chunk":"hi","model":"nemotron","tokens":3}"#).unwrap();
        assert_eq!(event, StreamEvent::Chunk("hi".to_string()));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_payload(b"not json").is_err());
    }
}
