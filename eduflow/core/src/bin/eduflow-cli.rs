//! Eduflow CLI
//!
//! Streams a generated lesson to stdout, then derives the images its prompts
//! describe.
//!
//! # Usage
//!
//! ```bash
//! # Stream a lesson for the default (high-school) audience
//! eduflow-cli "Photosynthesis"
//!
//! # Pick an audience level
//! eduflow-cli "The Krebs cycle" --audience undergraduate
//!
//! # One-shot generation instead of streaming
//! eduflow-cli "Plate tectonics" --batch
//!
//! # Skip image generation
//! eduflow-cli "Photosynthesis" --no-images
//!
//! # With verbose logging
//! RUST_LOG=debug eduflow-cli "Photosynthesis"
//! ```
//!
//! # Environment Variables
//!
//! - `EDUFLOW_BACKEND_URL`: Generation backend base URL
//! - `BACKEND_API_URL`: Legacy alias for the same
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use eduflow_core::{
    ArtifactOrchestrator, ArtifactStatus, Audience, BackendSettings, ContentBackend, HttpBackend,
    LessonRequest, Phase, SessionController, SessionUpdate,
};

/// Stream educational lessons from the eduflow backend
#[derive(Debug, Parser)]
#[command(name = "eduflow-cli", version, about)]
struct Args {
    /// Topic to generate a lesson for
    topic: String,

    /// Target audience level (elementary, middle-school, high-school,
    /// undergraduate, graduate)
    #[arg(long, default_value = "high-school")]
    audience: String,

    /// Backend base URL (overrides environment and config file)
    #[arg(long, env = "EDUFLOW_BACKEND_URL")]
    backend_url: Option<String>,

    /// Request the whole lesson in one call instead of streaming
    #[arg(long)]
    batch: bool,

    /// Skip image generation for the captured prompts
    #[arg(long)]
    no_images: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("eduflow_core=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let audience: Audience = args
        .audience
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let settings = match args.backend_url {
        Some(url) => BackendSettings::new(url),
        None => BackendSettings::resolve().context("failed to load backend settings")?,
    };
    info!(url = %settings.base_url, "using generation backend");

    let backend = HttpBackend::from_settings(&settings);
    let request = LessonRequest::new(args.topic, audience);

    let image_prompts = if args.batch {
        generate_batch(&backend, request).await?
    } else {
        generate_streaming(&backend, request).await?
    };

    if args.no_images || image_prompts.is_empty() {
        return Ok(());
    }

    generate_images(&backend, image_prompts).await;
    Ok(())
}

/// Stream the lesson to stdout, returning the captured image prompts
async fn generate_streaming(
    backend: &HttpBackend,
    request: LessonRequest,
) -> anyhow::Result<Vec<String>> {
    let mut controller = SessionController::new();
    controller.submit(backend, request).await;

    let mut stdout = std::io::stdout();
    while let Some(update) = controller.next_update().await {
        match update {
            SessionUpdate::Appended { text } => {
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            SessionUpdate::Finished { .. } => {
                stdout.write_all(b"\n")?;
            }
            SessionUpdate::Failed { error } => {
                anyhow::bail!("lesson generation failed: {error}");
            }
        }
    }

    debug_assert_eq!(controller.phase(), Phase::Finished);
    Ok(controller.image_prompts().to_vec())
}

/// Request the whole lesson in one call
async fn generate_batch(
    backend: &HttpBackend,
    request: LessonRequest,
) -> anyhow::Result<Vec<String>> {
    let lesson = backend
        .generate_lesson(&request)
        .await
        .context("lesson generation failed")?;
    println!("{}", lesson.explanation);
    Ok(lesson.image_prompts)
}

/// Generate one image per distinct prompt and print the outcomes
async fn generate_images(backend: &HttpBackend, prompts: Vec<String>) {
    let mut orchestrator = ArtifactOrchestrator::new();
    orchestrator.enqueue(prompts);
    info!(count = orchestrator.total_count(), "generating images");

    orchestrator.run(backend).await;

    println!();
    for record in orchestrator.records() {
        match &record.status {
            ArtifactStatus::Ready(url) if url.starts_with('/') => {
                println!("[image] {} -> {}{}", record.prompt, backend.base_url(), url);
            }
            ArtifactStatus::Ready(url) => {
                println!("[image] {} -> {}", record.prompt, url);
            }
            ArtifactStatus::Failed(reason) => {
                println!("[image] {} -> failed: {}", record.prompt, reason);
            }
            status => {
                println!("[image] {} -> {}", record.prompt, status);
            }
        }
    }

    if let Some(error) = orchestrator.last_error() {
        warn!(error, "some images failed to generate");
    }
}
