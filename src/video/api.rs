//! The remote API seam driven by the three stages.

use crate::error::Result;
use crate::video::types::{GenerationMode, JobStatus, ReferenceImage, SubmitResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

/// Multipart field carrying the reference image.
pub const INPUT_REFERENCE_FIELD: &str = "input_reference";

/// Everything that goes into one submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPayload {
    /// Text fields in send order: prompt, model, size, seconds.
    pub fields: Vec<(&'static str, String)>,
    /// File part sent as `input_reference` in image-to-video mode.
    pub reference: Option<ReferenceImage>,
}

impl SubmitPayload {
    /// Mode implied by the presence of a reference image.
    pub fn mode(&self) -> GenerationMode {
        if self.reference.is_some() {
            GenerationMode::ImageToVideo
        } else {
            GenerationMode::TextToVideo
        }
    }

    /// Looks up a text field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Body of a successful content request.
pub struct ContentStream {
    /// Declared body length, when the server sent one.
    pub content_length: Option<u64>,
    /// Body chunks in order.
    pub chunks: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Remote video generation API.
///
/// Implementations map non-success statuses to the matching error:
/// `Submission` for `submit`, `Api` for `fetch_status` and `Download` for
/// `fetch_content`.
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// `POST {base}` with a multipart body.
    async fn submit(&self, payload: &SubmitPayload) -> Result<SubmitResponse>;

    /// `GET {base}/{id}`.
    async fn fetch_status(&self, video_id: &str) -> Result<JobStatus>;

    /// `GET {base}/{id}/content`.
    async fn fetch_content(&self, video_id: &str) -> Result<ContentStream>;
}
