#![warn(missing_docs)]
//! sora-async - Sora video generation as a submit / poll / download workflow.
//!
//! A request is submitted as multipart form data (text-to-video, or
//! image-to-video when a reference image is given), the job is polled at a
//! fixed interval until it completes, fails or times out, and the finished
//! video is streamed to a local `.mp4` file.
//!
//! # Quick Start
//!
//! ```no_run
//! use sora_async::{GenerationConfig, SoraClient, VideoRequest};
//!
//! #[tokio::main]
//! async fn main() -> sora_async::Result<()> {
//!     let client = SoraClient::builder().build()?;
//!     let request = VideoRequest::new("An orange kitten chasing butterflies in a sunny garden")
//!         .with_size("1280x720")
//!         .with_seconds(15);
//!     let report = sora_async::run(&client, &GenerationConfig::new(request)).await?;
//!     println!("saved {} ({} bytes)", report.output.display(), report.size_bytes);
//!     Ok(())
//! }
//! ```
//!
//! # Stages
//!
//! - [`video::submit`]: builds the payload, falling back to text-to-video
//!   when the configured image does not exist.
//! - [`video::poll`]: fixed 30 s interval, 10 minute ceiling, transient
//!   status-query failures retried.
//! - [`video::download`]: writes `sora_<text|image>_video_<id suffix>.mp4`.

mod error;

pub mod video;

pub use error::{Result, SoraError};

pub use video::pipeline::run;
pub use video::{
    DownloadOptions, DownloadedVideo, GenerationConfig, GenerationMode, GenerationReport,
    JobState, JobStatus, PollPolicy, SoraClient, SoraClientBuilder, SubmissionResult, VideoApi,
    VideoRequest,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SoraError};
    pub use crate::video::{
        DownloadOptions, GenerationConfig, GenerationMode, PollPolicy, SoraClient, VideoApi,
        VideoRequest,
    };
}
