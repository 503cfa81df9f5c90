//! Stream Session Controller
//!
//! Owns the lifecycle of one lesson generation at a time: issues the request
//! through a [`ContentBackend`], applies decoded events to the session in
//! strict arrival order, and hands [`SessionUpdate`]s to the presentation
//! layer.
//!
//! # Consumption Styles
//!
//! Two equivalent ways to drain updates:
//!
//! - [`SessionController::poll`]: non-blocking, for render loops that tick
//!   on their own schedule
//! - [`SessionController::next_update`]: awaits the next update, for
//!   linear consumers like the CLI
//!
//! Both yield updates in event order. When the event channel closes without
//! a terminal event having been applied, the session fails with a generic
//! unexpected-termination message rather than staying in `Streaming`.
//!
//! # Cancellation
//!
//! [`SessionController::cancel`] is cooperative and local: it drops the
//! event receiver, which the backend's read loop observes as a closed
//! channel and stops. Nothing signals the producer to stop generating; any
//! late response is discarded by the session's terminal-phase check.

use tokio::sync::mpsc;

use crate::backend::{ContentBackend, UNEXPECTED_END};
use crate::protocol::StreamEvent;
use crate::session::{LessonRequest, Phase, Session, SessionId, SessionUpdate};

/// Drives one lesson generation session at a time
#[derive(Default)]
pub struct SessionController {
    session: Option<Session>,
    events: Option<mpsc::Receiver<StreamEvent>>,
    /// Update produced during submission (transport rejection), delivered
    /// ahead of any channel reads
    pending: Option<SessionUpdate>,
}

impl SessionController {
    /// Create a controller with no session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a new generation request
    ///
    /// Replaces any previous session with a fresh one (accumulated text,
    /// prompts and error all reset) and abandons its event stream. The
    /// returned ID identifies the new session.
    pub async fn submit(
        &mut self,
        backend: &dyn ContentBackend,
        request: LessonRequest,
    ) -> SessionId {
        // Drop any previous stream before starting over.
        self.events = None;
        self.pending = None;

        let mut session = Session::new(request.clone());
        let id = session.id;
        session.connecting();

        tracing::info!(session = %id, topic = %request.topic, audience = %request.audience, "submitting lesson request");

        match backend.stream_lesson(&request).await {
            Ok(receiver) => {
                session.streaming();
                self.events = Some(receiver);
            }
            Err(e) => {
                tracing::warn!(session = %id, error = %e, "lesson request rejected");
                self.pending = session.fail(e.to_string());
            }
        }

        self.session = Some(session);
        id
    }

    /// Poll for updates without blocking
    ///
    /// Applies every event currently available and returns the updates they
    /// produced, in order. Returns an empty vector while nothing is pending.
    pub fn poll(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        if let Some(update) = self.pending.take() {
            updates.push(update);
        }

        let Some(session) = self.session.as_mut() else {
            return updates;
        };

        let mut channel_closed = false;
        if let Some(receiver) = self.events.as_mut() {
            loop {
                match receiver.try_recv() {
                    Ok(event) => {
                        if let Some(update) = session.apply(event) {
                            updates.push(update);
                        }
                        if session.phase().is_terminal() {
                            channel_closed = true;
                            break;
                        }
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        // Channel closed without a terminal event
                        if let Some(update) = session.fail(UNEXPECTED_END) {
                            updates.push(update);
                        }
                        channel_closed = true;
                        break;
                    }
                }
            }
        }

        if channel_closed {
            self.events = None;
        }
        updates
    }

    /// Await the next update
    ///
    /// Returns `None` once the session is terminal and fully drained (or no
    /// session was ever submitted). Ignored events (protocol violations) do
    /// not produce updates; the wait continues past them.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        if let Some(update) = self.pending.take() {
            return Some(update);
        }

        loop {
            let received = match self.events.as_mut() {
                Some(receiver) => receiver.recv().await,
                None => return None,
            };

            let session = self.session.as_mut()?;

            match received {
                Some(event) => {
                    let update = session.apply(event);
                    if session.phase().is_terminal() {
                        self.events = None;
                    }
                    if update.is_some() {
                        return update;
                    }
                }
                None => {
                    self.events = None;
                    return session.fail(UNEXPECTED_END);
                }
            }
        }
    }

    /// Cancel the current session
    ///
    /// Drops the event receiver (the read loop stops at its next send) and
    /// marks the session `Cancelled` unless it already reached a terminal
    /// phase.
    pub fn cancel(&mut self) {
        self.events = None;
        self.pending = None;
        if let Some(session) = self.session.as_mut() {
            tracing::info!(session = %session.id, "cancelling session");
            session.cancel();
        }
    }

    /// The current session, if one was submitted
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Current phase (`Idle` before the first submission)
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Idle, Session::phase)
    }

    /// Lesson text accumulated so far
    #[must_use]
    pub fn content(&self) -> &str {
        self.session.as_ref().map_or("", Session::content)
    }

    /// Image prompts captured at `Finished`
    #[must_use]
    pub fn image_prompts(&self) -> &[String] {
        self.session
            .as_ref()
            .map_or(&[], Session::image_prompts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ImageOutcome, Lesson};
    use crate::session::Audience;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Backend stub that replays a scripted event sequence
    ///
    /// The sender task drops its channel end after the script, so a script
    /// without a terminal event looks like a mid-stream disconnect.
    struct ScriptedBackend {
        events: Vec<StreamEvent>,
        /// Reject the request before any stream exists
        reject: bool,
    }

    impl ScriptedBackend {
        fn events(events: Vec<StreamEvent>) -> Self {
            Self {
                events,
                reject: false,
            }
        }
    }

    #[async_trait]
    impl ContentBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn stream_lesson(
            &self,
            _request: &LessonRequest,
        ) -> anyhow::Result<mpsc::Receiver<StreamEvent>> {
            if self.reject {
                anyhow::bail!("content backend returned 503 Service Unavailable");
            }
            let (tx, rx) = mpsc::channel(16);
            let events = self.events.clone();
            tokio::spawn(async move {
                for event in events {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                // tx dropped here; no terminal event looks like a dead transport
            });
            Ok(rx)
        }

        async fn generate_lesson(&self, _request: &LessonRequest) -> anyhow::Result<Lesson> {
            anyhow::bail!("not scripted")
        }

        async fn generate_image(&self, _prompt: &str) -> anyhow::Result<ImageOutcome> {
            anyhow::bail!("not scripted")
        }
    }

    fn request() -> LessonRequest {
        LessonRequest::new("Photosynthesis", Audience::HighSchool)
    }

    #[tokio::test]
    async fn test_submit_and_drain_updates() {
        let backend = ScriptedBackend::events(vec![
            StreamEvent::Chunk("Hel".to_string()),
            StreamEvent::Chunk("lo".to_string()),
            StreamEvent::Finished {
                image_prompts: vec!["a cat".to_string()],
            },
        ]);

        let mut controller = SessionController::new();
        controller.submit(&backend, request()).await;
        assert_eq!(controller.phase(), Phase::Streaming);

        let mut updates = Vec::new();
        while let Some(update) = controller.next_update().await {
            updates.push(update);
        }

        assert_eq!(
            updates,
            vec![
                SessionUpdate::Appended {
                    text: "Hel".to_string(),
                },
                SessionUpdate::Appended {
                    text: "lo".to_string(),
                },
                SessionUpdate::Finished {
                    image_prompts: vec!["a cat".to_string()],
                },
            ]
        );
        assert_eq!(controller.phase(), Phase::Finished);
        assert_eq!(controller.content(), "Hello");
        assert_eq!(controller.image_prompts(), ["a cat".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_event_fails_session() {
        let backend = ScriptedBackend::events(vec![
            StreamEvent::Chunk("partial".to_string()),
            StreamEvent::Failure("API error: 500".to_string()),
        ]);

        let mut controller = SessionController::new();
        controller.submit(&backend, request()).await;

        let mut last = None;
        while let Some(update) = controller.next_update().await {
            last = Some(update);
        }

        assert_eq!(
            last,
            Some(SessionUpdate::Failed {
                error: "API error: 500".to_string(),
            })
        );
        assert_eq!(controller.phase(), Phase::Failed);
        // Partial content is retained; it is valid validated text.
        assert_eq!(controller.content(), "partial");
    }

    #[tokio::test]
    async fn test_stream_end_without_terminal_fails() {
        let backend = ScriptedBackend::events(vec![StreamEvent::Chunk("Hel".to_string())]);

        let mut controller = SessionController::new();
        controller.submit(&backend, request()).await;

        let mut last = None;
        while let Some(update) = controller.next_update().await {
            last = Some(update);
        }

        assert_eq!(
            last,
            Some(SessionUpdate::Failed {
                error: UNEXPECTED_END.to_string(),
            })
        );
        assert_eq!(controller.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn test_rejected_submission_fails_immediately() {
        let backend = ScriptedBackend {
            events: Vec::new(),
            reject: true,
        };

        let mut controller = SessionController::new();
        controller.submit(&backend, request()).await;
        assert_eq!(controller.phase(), Phase::Failed);

        let update = controller.next_update().await;
        assert_eq!(
            update,
            Some(SessionUpdate::Failed {
                error: "content backend returned 503 Service Unavailable".to_string(),
            })
        );
        assert_eq!(controller.next_update().await, None);
    }

    #[tokio::test]
    async fn test_poll_based_consumption() {
        let backend = ScriptedBackend::events(vec![
            StreamEvent::Chunk("a".to_string()),
            StreamEvent::Chunk("b".to_string()),
            StreamEvent::Finished {
                image_prompts: Vec::new(),
            },
        ]);

        let mut controller = SessionController::new();
        controller.submit(&backend, request()).await;

        // Give the scripted sender time to flush everything.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let updates = controller.poll();
        assert_eq!(updates.len(), 3);
        assert_eq!(controller.content(), "ab");
        assert_eq!(controller.phase(), Phase::Finished);

        // Terminal and drained: further polls yield nothing.
        assert!(controller.poll().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_event_application() {
        let backend = ScriptedBackend::events(vec![
            StreamEvent::Chunk("a".to_string()),
            StreamEvent::Chunk("b".to_string()),
            StreamEvent::Finished {
                image_prompts: Vec::new(),
            },
        ]);

        let mut controller = SessionController::new();
        controller.submit(&backend, request()).await;

        controller.cancel();
        assert_eq!(controller.phase(), Phase::Cancelled);

        // No updates after cancellation; the receiver is gone.
        assert_eq!(controller.next_update().await, None);
        assert!(controller.poll().is_empty());
        assert_eq!(controller.phase(), Phase::Cancelled);
    }

    #[tokio::test]
    async fn test_resubmission_resets_session() {
        let failing = ScriptedBackend::events(vec![StreamEvent::Failure("boom".to_string())]);
        let mut controller = SessionController::new();
        let first_id = controller.submit(&failing, request()).await;
        while controller.next_update().await.is_some() {}
        assert_eq!(controller.phase(), Phase::Failed);

        let succeeding = ScriptedBackend::events(vec![
            StreamEvent::Chunk("fresh".to_string()),
            StreamEvent::Finished {
                image_prompts: Vec::new(),
            },
        ]);
        let second_id = controller.submit(&succeeding, request()).await;
        assert_ne!(first_id, second_id);

        while controller.next_update().await.is_some() {}
        assert_eq!(controller.phase(), Phase::Finished);
        assert_eq!(controller.content(), "fresh");
        assert_eq!(controller.session().unwrap().error(), None);
    }
}
