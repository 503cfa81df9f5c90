//! Content Backend Traits
//!
//! Trait definition for the generation backend. The backend is an external
//! collaborator: this crate only specifies its interface and leaves prompt
//! templating, model selection and image synthesis entirely to the service
//! behind it.
//!
//! # Design Philosophy
//!
//! The `ContentBackend` trait provides a common interface for:
//! - Streaming a lesson and receiving decoded events as they arrive
//! - Requesting a complete lesson in one call (non-streaming)
//! - Generating one image per prompt
//! - Health checking the backend
//!
//! Implementations handle service-specific details (endpoints, transport).

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::protocol::StreamEvent;
use crate::session::LessonRequest;

/// A complete generated lesson (non-streaming response)
#[derive(Clone, Debug, Deserialize)]
pub struct Lesson {
    /// The lesson body in markdown
    pub explanation: String,
    /// Image prompts illustrating the lesson
    #[serde(default)]
    pub image_prompts: Vec<String>,
}

/// Outcome of one image generation request
///
/// Mirrors the wire shape `{success, url|null, error|null}`: a request can
/// come back without an error yet still lack a usable resource locator, which
/// callers must treat as a failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageOutcome {
    /// URL of the generated image, when the request produced one
    pub image_url: Option<String>,
    /// Failure description reported by the backend
    pub error: Option<String>,
}

impl ImageOutcome {
    /// Successful outcome with a resource locator
    pub fn ready(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            error: None,
        }
    }

    /// Failed outcome with a reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            image_url: None,
            error: Some(reason.into()),
        }
    }

    /// Whether this outcome carries a usable, non-empty URL
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.image_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Generation backend trait
///
/// Implement this trait to drive the session controller and artifact
/// orchestrator against a different service (or a test stub).
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Get the backend name (for logs)
    fn name(&self) -> &str;

    /// Check if the backend is healthy and reachable
    async fn health_check(&self) -> bool;

    /// Start a streaming lesson generation
    ///
    /// Returns a channel receiver that yields decoded events in arrival
    /// order. Returning `Err` means the transport rejected the request
    /// (connect failure or non-success status) before any event existed;
    /// everything after acceptance arrives as events, including failures.
    /// Dropping the receiver abandons the underlying read loop.
    async fn stream_lesson(
        &self,
        request: &LessonRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamEvent>>;

    /// Generate a complete lesson in one call (non-streaming)
    async fn generate_lesson(&self, request: &LessonRequest) -> anyhow::Result<Lesson>;

    /// Generate one image for a prompt
    ///
    /// `Err` covers transport-level failures; an `Ok` outcome may still be a
    /// failure when the backend reports an error or omits the URL.
    async fn generate_image(&self, prompt: &str) -> anyhow::Result<ImageOutcome>;
}
