//! Derived Image Artifacts
//!
//! After a session finishes, its captured image prompts are turned into
//! image artifacts, one per distinct prompt. The orchestrator owns the
//! per-prompt status map; the UI renders what it is told.
//!
//! # Design Philosophy
//!
//! Generation is strictly sequential: one request in flight at a time, so a
//! single `current_prompt` communicates progress and the image service is
//! never hit with concurrent bursts. Failures are isolated per prompt: a
//! failed record never blocks the prompts after it, and the most recent
//! failure is kept as an aggregate signal for notification purposes.
//!
//! Records are keyed by exact prompt text and kept in first-seen order.
//! Repeated prompts collapse onto one record; a prompt already `Ready` or
//! `Generating` is never regenerated by [`ArtifactOrchestrator::run`]. The
//! only way backwards is [`ArtifactOrchestrator::retry`], the explicit
//! per-prompt re-request.

use std::collections::HashMap;

use crate::backend::ContentBackend;

/// Status of one image artifact
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Queued, not yet requested
    Pending,
    /// Request currently in flight
    Generating,
    /// Generated successfully, carrying the image URL
    Ready(String),
    /// Generation failed, carrying the reason
    Failed(String),
}

impl ArtifactStatus {
    /// Whether this status is an outcome (`Ready` or `Failed`)
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed(_))
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Generating => "Generating",
            Self::Ready(_) => "Ready",
            Self::Failed(_) => "Failed",
        }
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One image artifact derived from a prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// The prompt text (also the record's identity key)
    pub prompt: String,
    /// Current status
    pub status: ArtifactStatus,
}

/// Progress notification emitted while the orchestrator works
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactUpdate {
    /// Generation started for a prompt
    Started {
        /// The prompt being generated
        prompt: String,
    },
    /// An artifact became ready
    Ready {
        /// The prompt that was generated
        prompt: String,
        /// URL of the generated image
        url: String,
    },
    /// Generation failed for a prompt
    Failed {
        /// The prompt that failed
        prompt: String,
        /// Failure description
        reason: String,
    },
}

/// Sequential per-prompt image generation with memoization
///
/// One orchestrator per session; constructed empty and fed prompts once the
/// session finishes.
#[derive(Debug, Default)]
pub struct ArtifactOrchestrator {
    /// All records, keyed by prompt text
    records: HashMap<String, ArtifactRecord>,
    /// First-seen order for deterministic display
    order: Vec<String>,
    /// Prompt currently being generated
    current: Option<String>,
    /// Most recent failure, for aggregate UI notification
    last_error: Option<String>,
}

impl ArtifactOrchestrator {
    /// Create an empty orchestrator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add prompts, deduplicating by exact text and preserving first-seen
    /// order
    ///
    /// Returns the number of new records created. Prompts already known keep
    /// their existing record and status untouched.
    pub fn enqueue<I, S>(&mut self, prompts: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for prompt in prompts {
            let prompt = prompt.into();
            if self.records.contains_key(&prompt) {
                continue;
            }
            self.records.insert(
                prompt.clone(),
                ArtifactRecord {
                    prompt: prompt.clone(),
                    status: ArtifactStatus::Pending,
                },
            );
            self.order.push(prompt);
            added += 1;
        }
        added
    }

    /// Generate every pending artifact, strictly one at a time
    ///
    /// Records already `Ready`, `Generating` or `Failed` are skipped; a
    /// per-prompt failure is recorded and the loop continues with the next
    /// prompt. Returns the updates in the order they happened.
    pub async fn run(&mut self, backend: &dyn ContentBackend) -> Vec<ArtifactUpdate> {
        let mut updates = Vec::new();

        for prompt in self.order.clone() {
            let pending = self
                .records
                .get(&prompt)
                .is_some_and(|record| record.status == ArtifactStatus::Pending);
            if !pending {
                continue;
            }
            self.generate(backend, &prompt, &mut updates).await;
        }

        updates
    }

    /// Explicitly re-request one `Failed` or `Pending` prompt
    ///
    /// Other records are not touched. Returns the updates produced, or an
    /// empty vector when the prompt is unknown, already ready, or currently
    /// generating.
    pub async fn retry(
        &mut self,
        backend: &dyn ContentBackend,
        prompt: &str,
    ) -> Vec<ArtifactUpdate> {
        let retryable = self.records.get(prompt).is_some_and(|record| {
            matches!(
                record.status,
                ArtifactStatus::Pending | ArtifactStatus::Failed(_)
            )
        });
        if !retryable {
            return Vec::new();
        }

        let mut updates = Vec::new();
        self.generate(backend, prompt, &mut updates).await;
        updates
    }

    /// Run one generation request and record its outcome
    async fn generate(
        &mut self,
        backend: &dyn ContentBackend,
        prompt: &str,
        updates: &mut Vec<ArtifactUpdate>,
    ) {
        self.set_status(prompt, ArtifactStatus::Generating);
        self.current = Some(prompt.to_string());
        updates.push(ArtifactUpdate::Started {
            prompt: prompt.to_string(),
        });

        let outcome = backend.generate_image(prompt).await;
        self.current = None;

        match outcome {
            Ok(outcome) if outcome.is_ready() => {
                let url = outcome.image_url.unwrap_or_default();
                tracing::info!(prompt, url = %url, "artifact ready");
                self.set_status(prompt, ArtifactStatus::Ready(url.clone()));
                updates.push(ArtifactUpdate::Ready {
                    prompt: prompt.to_string(),
                    url,
                });
            }
            Ok(outcome) => {
                let reason = outcome
                    .error
                    .unwrap_or_else(|| "backend did not return an image URL".to_string());
                self.record_failure(prompt, reason, updates);
            }
            Err(e) => {
                self.record_failure(prompt, e.to_string(), updates);
            }
        }
    }

    fn record_failure(&mut self, prompt: &str, reason: String, updates: &mut Vec<ArtifactUpdate>) {
        tracing::warn!(prompt, reason = %reason, "artifact generation failed");
        self.set_status(prompt, ArtifactStatus::Failed(reason.clone()));
        self.last_error = Some(reason.clone());
        updates.push(ArtifactUpdate::Failed {
            prompt: prompt.to_string(),
            reason,
        });
    }

    fn set_status(&mut self, prompt: &str, status: ArtifactStatus) {
        if let Some(record) = self.records.get_mut(prompt) {
            record.status = status;
        }
    }

    /// All records in first-seen order
    pub fn records(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.order.iter().filter_map(|prompt| self.records.get(prompt))
    }

    /// Look up one record by prompt text
    #[must_use]
    pub fn get(&self, prompt: &str) -> Option<&ArtifactRecord> {
        self.records.get(prompt)
    }

    /// The prompt currently being generated, if any
    #[must_use]
    pub fn current_prompt(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Most recent failure message, if any
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Total record count (distinct prompts)
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.order.len()
    }

    /// Count of records with a `Ready` status
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| matches!(record.status, ArtifactStatus::Ready(_)))
            .count()
    }

    /// Count of records with a `Failed` status
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| matches!(record.status, ArtifactStatus::Failed(_)))
            .count()
    }
}
