//! HTTP Backend Implementation
//!
//! `ContentBackend` over the generation service's REST API.
//!
//! # Service API
//!
//! - `POST /api/content/generate/stream`: lesson generation as a chunked
//!   `text/event-stream` body
//! - `POST /api/content/generate`: complete lesson in one response
//! - `POST /api/images/generate`: one image per prompt
//! - `GET /`: health probe
//!
//! The streaming endpoint is consumed through a spawned read loop that feeds
//! the frame decoder and forwards decoded events over a bounded channel.
//! The loop stops at the first terminal event, when the body ends, or when
//! the receiver is dropped (cooperative cancellation).

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::traits::{ContentBackend, ImageOutcome, Lesson};
use crate::config::BackendSettings;
use crate::decoder::FrameDecoder;
use crate::protocol::StreamEvent;
use crate::session::LessonRequest;

/// Failure message used when the body ends with no terminal event
pub const UNEXPECTED_END: &str = "stream ended unexpectedly";

/// Timeout for non-streaming requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the health probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the generation backend
#[derive(Clone)]
pub struct HttpBackend {
    /// Backend base URL, no trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a new backend client for a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            // No global timeout: it would cut long-lived streaming bodies.
            // Non-streaming calls set per-request timeouts instead.
            http_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create from resolved settings
    #[must_use]
    pub fn from_settings(settings: &BackendSettings) -> Self {
        Self::new(settings.base_url.clone())
    }

    /// Create from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_settings(&BackendSettings::from_env())
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the streaming lesson endpoint URL
    fn stream_url(&self) -> String {
        format!("{}/api/content/generate/stream", self.base_url)
    }

    /// Get the non-streaming lesson endpoint URL
    fn lesson_url(&self) -> String {
        format!("{}/api/content/generate", self.base_url)
    }

    /// Get the image generation endpoint URL
    fn image_url(&self) -> String {
        format!("{}/api/images/generate", self.base_url)
    }

    /// Get the health probe URL
    fn health_url(&self) -> String {
        format!("{}/", self.base_url)
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::from_settings(&BackendSettings::default())
    }
}

/// Wire shape of the image generation response
///
/// The service replies `{"image_url": ...}`; proxied deployments wrap it as
/// `{"success": ..., "url": ..., "error": ...}`. Both are accepted.
#[derive(Debug, Deserialize)]
struct ImageResponseBody {
    #[serde(default, alias = "url")]
    image_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default = "default_success")]
    success: bool,
}

fn default_success() -> bool {
    true
}

#[async_trait]
impl ContentBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.health_url())
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn stream_lesson(
        &self,
        request: &LessonRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamEvent>> {
        let (tx, rx) = mpsc::channel(100);

        let response = self
            .http_client
            .post(self.stream_url())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("content backend returned {status}: {body}");
        }

        let mut stream = response.bytes_stream();

        // Read loop: owns the frame decoder, terminates at the first terminal
        // event or when the receiver is dropped.
        tokio::spawn(async move {
            let mut decoder = FrameDecoder::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for event in decoder.feed(&bytes) {
                            let terminal = event.is_terminal();
                            if tx.send(event).await.is_err() {
                                // Receiver dropped (cancelled), stop reading
                                return;
                            }
                            if terminal {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(StreamEvent::Failure(format!("stream read failed: {e}")))
                            .await;
                        return;
                    }
                }
            }

            // Body ended without a terminal event
            if decoder.pending_bytes() > 0 {
                tracing::debug!(
                    pending = decoder.pending_bytes(),
                    "stream closed with undelivered bytes in buffer"
                );
            }
            let _ = tx.send(StreamEvent::Failure(UNEXPECTED_END.to_string())).await;
        });

        Ok(rx)
    }

    async fn generate_lesson(&self, request: &LessonRequest) -> anyhow::Result<Lesson> {
        let response = self
            .http_client
            .post(self.lesson_url())
            .json(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("content backend returned {status}: {body}");
        }

        let lesson: Lesson = response.json().await?;
        Ok(lesson)
    }

    async fn generate_image(&self, prompt: &str) -> anyhow::Result<ImageOutcome> {
        let response = self
            .http_client
            .post(self.image_url())
            .json(&serde_json::json!({ "prompt": prompt }))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("image backend returned {status}: {body}");
        }

        let body: ImageResponseBody = response.json().await?;

        if !body.success {
            return Ok(ImageOutcome::failed(
                body.error
                    .unwrap_or_else(|| "image generation reported failure".to_string()),
            ));
        }

        match body.image_url {
            Some(url) if !url.is_empty() => Ok(ImageOutcome::ready(url)),
            _ => Ok(ImageOutcome::failed(
                body.error
                    .unwrap_or_else(|| "backend did not return an image URL".to_string()),
            )),
        }
    }
}
