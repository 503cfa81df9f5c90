//! Lesson Session State
//!
//! One session is one end-to-end generation request: the submitted topic and
//! audience, the lifecycle phase, and the lesson text accumulated from the
//! stream. A fresh session value is constructed per submission; nothing is
//! shared between submissions.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Connecting -> Streaming -> Finished
//!              |            |
//!              v            v
//!           Failed       Failed
//!
//! any non-terminal state -> Cancelled
//! ```
//!
//! `Finished`, `Failed` and `Cancelled` are terminal: once reached, no event
//! can move the session out of them. Events arriving after a terminal phase
//! are ignored (protocol violation, not a crash). The lesson text is
//! append-only; it never shrinks and is never rewritten.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::StreamEvent;

/// Unique session identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new unique session ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target audience for a generated lesson
///
/// Serialized in kebab-case to match the backend's wire values
/// (`"middle-school"`, `"high-school"`, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Audience {
    /// Elementary school level
    Elementary,
    /// Middle school level
    MiddleSchool,
    /// High school level
    #[default]
    HighSchool,
    /// Undergraduate level
    Undergraduate,
    /// Graduate level
    Graduate,
}

impl Audience {
    /// All audience levels, in ascending order
    pub const ALL: [Self; 5] = [
        Self::Elementary,
        Self::MiddleSchool,
        Self::HighSchool,
        Self::Undergraduate,
        Self::Graduate,
    ];

    /// Wire value for this audience level
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elementary => "elementary",
            Self::MiddleSchool => "middle-school",
            Self::HighSchool => "high-school",
            Self::Undergraduate => "undergraduate",
            Self::Graduate => "graduate",
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error parsing an audience level from a string
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownAudience(pub String);

impl std::fmt::Display for UnknownAudience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown audience '{}' (expected one of: elementary, middle-school, high-school, undergraduate, graduate)",
            self.0
        )
    }
}

impl std::error::Error for UnknownAudience {}

impl std::str::FromStr for Audience {
    type Err = UnknownAudience;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| UnknownAudience(s.to_string()))
    }
}

/// Parameters of one lesson generation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRequest {
    /// Educational topic to generate a lesson for
    pub topic: String,
    /// Target audience level
    pub audience: Audience,
}

impl LessonRequest {
    /// Create a new request
    pub fn new(topic: impl Into<String>, audience: Audience) -> Self {
        Self {
            topic: topic.into(),
            audience,
        }
    }
}

/// Lifecycle phase of a session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No request submitted yet
    #[default]
    Idle,
    /// Request issued, awaiting response headers
    Connecting,
    /// Response accepted, events being applied
    Streaming,
    /// Terminal: stream completed successfully
    Finished,
    /// Terminal: transport or protocol failure
    Failed,
    /// Terminal: cancelled by the user
    Cancelled,
}

impl Phase {
    /// Whether this phase is terminal (no further transitions)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }

    /// Whether a request is currently in flight
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Streaming)
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Streaming => "Streaming",
            Self::Finished => "Finished",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Incremental notification emitted as events are applied to a session
///
/// The presentation layer consumes these in event order; `Appended` is the
/// re-render signal that drives scroll-to-latest while streaming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionUpdate {
    /// New text was appended to the lesson
    Appended {
        /// The appended delta
        text: String,
    },
    /// The session finished successfully
    Finished {
        /// Image prompts captured at completion
        image_prompts: Vec<String>,
    },
    /// The session failed
    Failed {
        /// Failure description
        error: String,
    },
}

/// One lesson generation session
#[derive(Clone, Debug)]
pub struct Session {
    /// Unique session ID
    pub id: SessionId,
    /// The request this session is serving
    pub request: LessonRequest,
    phase: Phase,
    content: String,
    image_prompts: Vec<String>,
    error: Option<String>,
}

impl Session {
    /// Create a new idle session for a request
    #[must_use]
    pub fn new(request: LessonRequest) -> Self {
        Self {
            id: SessionId::new(),
            request,
            phase: Phase::Idle,
            content: String::new(),
            image_prompts: Vec::new(),
            error: None,
        }
    }

    /// Current lifecycle phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Lesson text accumulated so far (append-only)
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Image prompts captured at `Finished` (empty before then)
    #[must_use]
    pub fn image_prompts(&self) -> &[String] {
        &self.image_prompts
    }

    /// Failure message (set only in `Failed`)
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Mark the request as issued (`Idle -> Connecting`)
    pub fn connecting(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Connecting;
        }
    }

    /// Mark the response as accepted (`Connecting -> Streaming`)
    pub fn streaming(&mut self) {
        if self.phase == Phase::Connecting {
            self.phase = Phase::Streaming;
        }
    }

    /// Apply one decoded event, returning the update it produced
    ///
    /// Events in any phase other than `Streaming` are ignored: a chunk after
    /// a terminal event is a protocol violation and must not crash or mutate
    /// the session.
    pub fn apply(&mut self, event: StreamEvent) -> Option<SessionUpdate> {
        if self.phase != Phase::Streaming {
            tracing::debug!(phase = %self.phase, "ignoring event outside streaming phase");
            return None;
        }

        match event {
            StreamEvent::Chunk(text) => {
                self.content.push_str(&text);
                Some(SessionUpdate::Appended { text })
            }
            StreamEvent::Finished { image_prompts } => {
                self.phase = Phase::Finished;
                self.image_prompts = image_prompts.clone();
                Some(SessionUpdate::Finished { image_prompts })
            }
            StreamEvent::Failure(message) => {
                self.phase = Phase::Failed;
                self.error = Some(message.clone());
                Some(SessionUpdate::Failed { error: message })
            }
        }
    }

    /// Record a transport-level failure (connect error, non-2xx status)
    ///
    /// No effect if the session is already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> Option<SessionUpdate> {
        if self.phase.is_terminal() {
            return None;
        }
        let message = message.into();
        self.phase = Phase::Failed;
        self.error = Some(message.clone());
        Some(SessionUpdate::Failed { error: message })
    }

    /// Cancel the session
    ///
    /// Cancellation is advisory and local: it only stops further event
    /// application. No effect if the session is already terminal.
    pub fn cancel(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn streaming_session() -> Session {
        let mut session = Session::new(LessonRequest::new("Photosynthesis", Audience::HighSchool));
        session.connecting();
        session.streaming();
        session
    }

    #[test]
    fn test_audience_wire_values() {
        assert_eq!(
            serde_json::to_string(&Audience::MiddleSchool).unwrap(),
            "\"middle-school\""
        );
        assert_eq!("graduate".parse::<Audience>().unwrap(), Audience::Graduate);
        assert!("kindergarten".parse::<Audience>().is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let request = LessonRequest::new("Photosynthesis", Audience::HighSchool);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"topic": "Photosynthesis", "audience": "high-school"})
        );
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let mut session = Session::new(LessonRequest::new("Topic", Audience::default()));
        assert_eq!(session.phase(), Phase::Idle);

        session.connecting();
        assert_eq!(session.phase(), Phase::Connecting);

        session.streaming();
        assert_eq!(session.phase(), Phase::Streaming);

        session.apply(StreamEvent::Chunk("Hel".to_string()));
        session.apply(StreamEvent::Chunk("lo".to_string()));
        assert_eq!(session.content(), "Hello");

        let update = session.apply(StreamEvent::Finished {
            image_prompts: vec!["a cat".to_string()],
        });
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.image_prompts(), ["a cat".to_string()]);
        assert_eq!(
            update,
            Some(SessionUpdate::Finished {
                image_prompts: vec!["a cat".to_string()],
            })
        );
    }

    #[test]
    fn test_accumulation_is_ordered_concatenation() {
        let mut session = streaming_session();
        let chunks = ["a", "bb", "", "ccc"];
        for chunk in chunks {
            session.apply(StreamEvent::Chunk(chunk.to_string()));
        }
        assert_eq!(session.content(), chunks.concat());
    }

    #[test]
    fn test_chunk_after_finished_ignored() {
        let mut session = streaming_session();
        session.apply(StreamEvent::Finished {
            image_prompts: Vec::new(),
        });

        let update = session.apply(StreamEvent::Chunk("late".to_string()));
        assert_eq!(update, None);
        assert_eq!(session.content(), "");
        assert_eq!(session.phase(), Phase::Finished);
    }

    #[test]
    fn test_no_double_terminal_transition() {
        let mut session = streaming_session();
        session.apply(StreamEvent::Failure("first".to_string()));
        assert_eq!(session.phase(), Phase::Failed);

        // A second terminal event must not overwrite the first outcome.
        let update = session.apply(StreamEvent::Finished {
            image_prompts: vec!["late".to_string()],
        });
        assert_eq!(update, None);
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.error(), Some("first"));
        assert!(session.image_prompts().is_empty());
    }

    #[test]
    fn test_transport_failure_from_connecting() {
        let mut session = Session::new(LessonRequest::new("Topic", Audience::default()));
        session.connecting();

        let update = session.fail("content backend returned 503");
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.error(), Some("content backend returned 503"));
        assert_eq!(
            update,
            Some(SessionUpdate::Failed {
                error: "content backend returned 503".to_string(),
            })
        );
    }

    #[test]
    fn test_fail_after_terminal_is_noop() {
        let mut session = streaming_session();
        session.apply(StreamEvent::Finished {
            image_prompts: Vec::new(),
        });
        assert_eq!(session.fail("too late"), None);
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_cancel_from_any_active_phase() {
        let mut session = streaming_session();
        session.apply(StreamEvent::Chunk("partial".to_string()));
        session.cancel();
        assert_eq!(session.phase(), Phase::Cancelled);

        // Events after cancellation are discarded.
        let update = session.apply(StreamEvent::Chunk("late".to_string()));
        assert_eq!(update, None);
        assert_eq!(session.content(), "partial");
    }

    #[test]
    fn test_cancel_does_not_overwrite_terminal() {
        let mut session = streaming_session();
        session.apply(StreamEvent::Finished {
            image_prompts: Vec::new(),
        });
        session.cancel();
        assert_eq!(session.phase(), Phase::Finished);
    }
}
