//! Download stage: stream the finished video to a local file.

use crate::error::Result;
use crate::video::api::VideoApi;
use crate::video::types::{DownloadedVideo, GenerationMode, SubmissionResult};
use futures_util::StreamExt;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// Number of trailing job-id characters used in the derived file name.
const ID_SUFFIX_LEN: usize = 8;

/// Where the downloaded video goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Directory for the derived file name.
    pub output_dir: PathBuf,
    /// Explicit output path; overrides `output_dir` and the derived name.
    pub output_path: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output_path: None,
        }
    }
}

impl DownloadOptions {
    /// Sets the directory the derived file name is placed in.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets an explicit output path.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Resolves the output path for a submitted job.
    pub fn resolve(&self, submission: &SubmissionResult) -> PathBuf {
        match self.output_path {
            Some(ref path) => path.clone(),
            None => self
                .output_dir
                .join(output_file_name(submission.id(), submission.mode())),
        }
    }
}

/// Derives `sora_<text|image>_video_<last 8 id chars>.mp4`.
pub fn output_file_name(video_id: &str, mode: GenerationMode) -> String {
    let skip = video_id.chars().count().saturating_sub(ID_SUFFIX_LEN);
    let suffix: String = video_id.chars().skip(skip).collect();
    format!("sora_{}_video_{}.mp4", mode.file_prefix(), suffix)
}

/// Fetches the content of a completed job and writes it to disk.
///
/// A non-success response is fatal and creates no file. The body is streamed
/// into a temporary file next to the target and renamed into place only once
/// it is fully written, so a failed or cancelled download leaves nothing
/// behind.
pub async fn download<A>(
    api: &A,
    submission: &SubmissionResult,
    options: &DownloadOptions,
) -> Result<DownloadedVideo>
where
    A: VideoApi + ?Sized,
{
    let path = options.resolve(submission);
    tracing::info!(video_id = %submission.id(), path = %path.display(), "downloading video");

    let content = api.fetch_content(submission.id()).await?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let partial = tempfile::Builder::new()
        .prefix(".sora-download-")
        .suffix(".part")
        .tempfile_in(&dir)?;

    let bytes = write_stream(&partial, content.content_length, content.chunks).await?;
    partial.persist(&path).map_err(std::io::Error::from)?;

    let path = match tokio::fs::canonicalize(&path).await {
        Ok(absolute) => absolute,
        Err(_) => path,
    };
    tracing::info!(path = %path.display(), bytes, "video saved");
    Ok(DownloadedVideo { path, bytes })
}

async fn write_stream(
    partial: &NamedTempFile,
    content_length: Option<u64>,
    mut chunks: futures_util::stream::BoxStream<'static, Result<bytes::Bytes>>,
) -> Result<u64> {
    let mut file = tokio::fs::File::from_std(partial.reopen()?);
    let mut written = 0u64;
    let mut last_decile = 0u64;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;

        if let Some(total) = content_length.filter(|t| *t > 0) {
            let decile = written.saturating_mul(10) / total;
            if decile > last_decile {
                last_decile = decile;
                tracing::debug!(
                    downloaded = written,
                    total,
                    percent = %format!("{:.1}", written as f64 * 100.0 / total as f64),
                    "download progress"
                );
            }
        }
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}
