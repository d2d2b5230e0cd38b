//! Submit → poll → download driver.

use crate::error::Result;
use crate::video::api::VideoApi;
use crate::video::download::{self, DownloadOptions};
use crate::video::poll::{self, PollPolicy};
use crate::video::submit;
use crate::video::types::{GenerationMode, VideoRequest};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Everything a run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// What to generate.
    pub request: VideoRequest,
    /// How long and how often to poll.
    pub poll: PollPolicy,
    /// Where to write the result.
    pub download: DownloadOptions,
}

impl GenerationConfig {
    /// Creates a config with the default polling policy and output location.
    pub fn new(request: VideoRequest) -> Self {
        Self {
            request,
            poll: PollPolicy::default(),
            download: DownloadOptions::default(),
        }
    }

    /// Replaces the polling policy.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll = policy;
        self
    }

    /// Replaces the output location.
    pub fn with_download_options(mut self, options: DownloadOptions) -> Self {
        self.download = options;
        self
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Server-assigned job identifier.
    pub video_id: String,
    /// Mode the job was submitted in.
    pub mode: GenerationMode,
    /// Model that generated the video.
    pub model: String,
    /// Result URL reported by the completed job, if any.
    pub url: Option<String>,
    /// When the job was created, as reported by the API.
    pub created_at: Option<DateTime<Utc>>,
    /// When the job completed, as reported by the API.
    pub completed_at: Option<DateTime<Utc>>,
    /// Status queries issued, including failed ones.
    pub poll_attempts: u32,
    /// Absolute path of the saved video.
    pub output: PathBuf,
    /// Bytes written to `output`.
    pub size_bytes: u64,
    /// Local time the run started.
    pub started_at: DateTime<Utc>,
    /// Local time the run finished.
    pub finished_at: DateTime<Utc>,
    /// Total run time in milliseconds.
    pub duration_ms: u64,
}

/// Runs the three stages in order. The first error aborts the run.
pub async fn run<A>(api: &A, config: &GenerationConfig) -> Result<GenerationReport>
where
    A: VideoApi + ?Sized,
{
    let started_at = Utc::now();
    let start = std::time::Instant::now();
    tracing::info!(started_at = %started_at.format("%Y-%m-%d %H:%M:%S"), "starting Sora video generation");

    let submission = submit::submit(api, &config.request).await?;
    let completed = poll::poll_until_complete(api, submission.id(), &config.poll).await?;
    let video = download::download(api, &submission, &config.download).await?;

    let finished_at = Utc::now();
    let duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        video_id = %submission.id(),
        finished_at = %finished_at.format("%Y-%m-%d %H:%M:%S"),
        duration_ms,
        "video generation finished"
    );

    Ok(GenerationReport {
        video_id: submission.id().to_string(),
        mode: submission.mode(),
        model: config.request.model.clone(),
        url: completed.status.url.clone(),
        created_at: submission.created_at(),
        completed_at: completed.status.completed_at_utc(),
        poll_attempts: completed.attempts,
        output: video.path,
        size_bytes: video.bytes,
        started_at,
        finished_at,
        duration_ms,
    })
}
