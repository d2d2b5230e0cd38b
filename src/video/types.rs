//! Core types for the submit / poll / download workflow.

use crate::error::{Result, SoraError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default Sora model identifier.
pub const DEFAULT_MODEL: &str = "sora-2";
/// Default output resolution.
pub const DEFAULT_SIZE: &str = "1280x720";
/// Default clip length in seconds.
pub const DEFAULT_SECONDS: u32 = 15;

/// Whether a request was submitted with a reference image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Prompt only.
    TextToVideo,
    /// Prompt plus a reference image.
    ImageToVideo,
}

impl GenerationMode {
    /// Prefix used in the derived output file name.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::TextToVideo => "text",
            Self::ImageToVideo => "image",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextToVideo => write!(f, "text-to-video"),
            Self::ImageToVideo => write!(f, "image-to-video"),
        }
    }
}

/// Remote job state. The vocabulary is owned by the API, so anything
/// unrecognised is kept verbatim and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    /// Accepted by the gateway but not yet handed to the generator.
    Submitted,
    /// Waiting for a generation slot.
    Queued,
    /// Being generated.
    InProgress,
    /// Finished; the content can be downloaded.
    Completed,
    /// Finished without a video.
    Failed,
    /// Any status this crate does not know about.
    Other(String),
}

impl JobState {
    /// Returns true for states after which the job never changes again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "submitted",
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        match s {
            "submitted" => Self::Submitted,
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a successful submit call.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned job identifier.
    pub id: String,
    /// Initial job state.
    pub status: JobState,
    /// Creation time in unix seconds.
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Outcome of the submit stage.
///
/// The job identifier and generation mode are fixed here and never
/// re-derived by later stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    id: String,
    mode: GenerationMode,
    status: JobState,
    created_at: Option<i64>,
}

impl SubmissionResult {
    /// Creates a result from the submit response and the mode actually used.
    pub fn new(response: SubmitResponse, mode: GenerationMode) -> Self {
        Self {
            id: response.id,
            mode,
            status: response.status,
            created_at: response.created_at,
        }
    }

    /// Server-assigned job identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mode the job was submitted in.
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// State reported by the submit call.
    pub fn status(&self) -> &JobState {
        &self.status
    }

    /// Creation time, if the API reported one.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.and_then(unix_to_utc)
    }
}

/// Error object attached to a failed job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobError {
    /// Human-readable description.
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,
}

/// Snapshot of a job returned by a status query. Fetched fresh on every
/// poll and never merged with previous snapshots.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobStatus {
    /// Current job state.
    pub status: JobState,
    /// Progress percentage (0-100).
    #[serde(default)]
    pub progress: Option<u32>,
    /// Result URL, set by some gateways once the job completes.
    #[serde(default)]
    pub url: Option<String>,
    /// Completion time in unix seconds.
    #[serde(default)]
    pub completed_at: Option<i64>,
    /// Plain-text failure reason.
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Structured error for failed jobs.
    #[serde(default)]
    pub error: Option<JobError>,
}

impl JobStatus {
    /// Creates a bare snapshot in the given state.
    pub fn new(status: JobState) -> Self {
        Self {
            status,
            progress: None,
            url: None,
            completed_at: None,
            failure_reason: None,
            error: None,
        }
    }

    /// Progress percentage, defaulting to 0 when the API omits it.
    pub fn progress_percent(&self) -> u32 {
        self.progress.unwrap_or(0)
    }

    /// Completion time, if the API reported one.
    pub fn completed_at_utc(&self) -> Option<DateTime<Utc>> {
        self.completed_at.and_then(unix_to_utc)
    }

    /// Best available explanation for a failed job.
    pub fn failure_message(&self) -> String {
        self.failure_reason
            .clone()
            .or_else(|| self.error.as_ref().and_then(|e| e.message.clone()))
            .unwrap_or_else(|| "unknown error".into())
    }
}

/// Parameters of a single generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRequest {
    /// The text prompt describing the desired video.
    pub prompt: String,
    /// Model identifier (e.g., "sora-2").
    pub model: String,
    /// Resolution as `<width>x<height>`.
    pub size: String,
    /// Clip length in seconds.
    pub seconds: u32,
    /// Reference image for image-to-video. A path that does not exist
    /// degrades the run to text-to-video.
    pub image_path: Option<PathBuf>,
}

impl VideoRequest {
    /// Creates a text-to-video request with default model, size and length.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_MODEL.to_string(),
            size: DEFAULT_SIZE.to_string(),
            seconds: DEFAULT_SECONDS,
            image_path: None,
        }
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the resolution, e.g. `720x1280`.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Sets the clip length in seconds.
    pub fn with_seconds(mut self, seconds: u32) -> Self {
        self.seconds = seconds;
        self
    }

    /// Sets a local reference image for image-to-video generation.
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    /// Checks parameters that would otherwise only be rejected remotely.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(SoraError::InvalidRequest("prompt must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(SoraError::InvalidRequest("model must not be empty".into()));
        }
        if self.seconds == 0 {
            return Err(SoraError::InvalidRequest(
                "seconds must be greater than zero".into(),
            ));
        }
        parse_size(&self.size).ok_or_else(|| {
            SoraError::InvalidRequest(format!(
                "size must look like <width>x<height>, got {:?}",
                self.size
            ))
        })?;
        Ok(())
    }
}

fn parse_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.split_once('x')?;
    let w: u32 = w.parse().ok()?;
    let h: u32 = h.parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Supported reference image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }

    /// Best-effort detection: content first, then extension.
    pub fn detect(path: &Path, data: &[u8]) -> Option<Self> {
        Self::from_magic_bytes(data).or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(Self::from_extension)
        })
    }
}

/// Reference image loaded from disk, ready to attach to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// Base name sent as the multipart file name.
    pub file_name: String,
    /// Detected content type, `image/png` when unknown.
    pub mime_type: &'static str,
    /// Raw file bytes.
    pub data: Vec<u8>,
}

impl ReferenceImage {
    /// Reads an image file and detects its content type.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let mime_type = ImageFormat::detect(path, &data)
            .map(|f| f.mime_type())
            .unwrap_or("image/png");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());

        Ok(Self {
            file_name,
            mime_type,
            data,
        })
    }
}

/// A video written to disk by the download stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedVideo {
    /// Where the file was written.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
}

pub(crate) fn unix_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
