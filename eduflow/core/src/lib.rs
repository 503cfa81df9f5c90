//! Eduflow Core - Streaming Lesson Generation Client
//!
//! This crate is the headless client core for eduflow, an educational
//! content generator. It talks to a generation backend over HTTP, decodes
//! the backend's framed event stream incrementally, reconstructs the lesson
//! text in real time, and derives image artifacts from the prompts captured
//! at stream completion. It is completely independent of any UI framework
//! and can drive a CLI, TUI, web UI, or run headless for testing.
//!
//! # Architecture
//!
//! ```text
//! transport bytes
//!       |
//!       v
//! +---------------+     decoded events     +--------------------+
//! | FrameDecoder  | ---------------------> | SessionController  |
//! | (byte buffer) |                        |  Session / Phase   |
//! +---------------+                        +---------+----------+
//!                                                    | image prompts
//!                                                    v  (on Finished)
//!                                      +-------------------------+
//!                                      | ArtifactOrchestrator    |
//!                                      | sequential, per-prompt  |
//!                                      +-------------------------+
//! ```
//!
//! # Key Types
//!
//! - [`SessionController`]: drives one generation request end to end
//! - [`Session`] / [`Phase`]: lifecycle state for a single submission
//! - [`StreamEvent`]: the decoded protocol event union
//! - [`FrameDecoder`]: turns raw byte fragments into complete events
//! - [`ArtifactOrchestrator`]: sequential per-prompt image generation
//! - [`HttpBackend`] / [`ContentBackend`]: the generation service boundary
//!
//! # Quick Start
//!
//! ```ignore
//! use eduflow_core::{
//!     Audience, BackendSettings, HttpBackend, LessonRequest,
//!     SessionController, SessionUpdate,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = HttpBackend::from_settings(&BackendSettings::resolve()?);
//!     let mut controller = SessionController::new();
//!
//!     let request = LessonRequest::new("Photosynthesis", Audience::HighSchool);
//!     controller.submit(&backend, request).await;
//!
//!     while let Some(update) = controller.next_update().await {
//!         match update {
//!             SessionUpdate::Appended { text } => print!("{text}"),
//!             SessionUpdate::Finished { image_prompts } => {
//!                 println!("\nprompts: {image_prompts:?}");
//!             }
//!             SessionUpdate::Failed { error } => eprintln!("{error}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`protocol`]: decoded stream events and wire payload classification
//! - [`decoder`]: incremental frame decoding across fragment boundaries
//! - [`session`]: session state and the lifecycle state machine
//! - [`controller`]: the per-submission driver and update stream
//! - [`artifacts`]: derived image artifact orchestration
//! - [`backend`]: generation backend trait and HTTP implementation
//! - [`config`]: backend endpoint resolution
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on any UI framework. It's pure
//! client logic that can be used anywhere.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifacts;
pub mod backend;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod protocol;
pub mod session;

// Re-exports for convenience
pub use artifacts::{ArtifactOrchestrator, ArtifactRecord, ArtifactStatus, ArtifactUpdate};
pub use backend::{ContentBackend, HttpBackend, ImageOutcome, Lesson, UNEXPECTED_END};
pub use config::{default_config_path, BackendSettings, ConfigError, DEFAULT_BASE_URL};
pub use controller::SessionController;
pub use decoder::FrameDecoder;
pub use protocol::{EventPayload, StreamEvent};
pub use session::{
    Audience, LessonRequest, Phase, Session, SessionId, SessionUpdate, UnknownAudience,
};
