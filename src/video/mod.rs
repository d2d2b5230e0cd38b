//! Video generation workflow: submit, poll, download.

mod api;
mod client;
pub mod download;
#[cfg(test)]
mod fake;
pub mod pipeline;
pub mod poll;
pub mod submit;
mod types;

pub use api::{ContentStream, SubmitPayload, VideoApi, INPUT_REFERENCE_FIELD};
pub use client::{SoraClient, SoraClientBuilder, DEFAULT_BASE_URL};
pub use download::DownloadOptions;
pub use pipeline::{GenerationConfig, GenerationReport};
pub use poll::{CompletedJob, PollPolicy};
pub use types::{
    DownloadedVideo, GenerationMode, ImageFormat, JobError, JobState, JobStatus, ReferenceImage,
    SubmissionResult, SubmitResponse, VideoRequest, DEFAULT_MODEL, DEFAULT_SECONDS, DEFAULT_SIZE,
};
