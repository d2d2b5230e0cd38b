//! Scripted in-memory `VideoApi` for stage tests.

use crate::error::{Result, SoraError};
use crate::video::api::{ContentStream, SubmitPayload, VideoApi};
use crate::video::types::{JobState, JobStatus, SubmitResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted reply to a status query.
pub(crate) enum StatusReply {
    Status(JobStatus),
    Http(u16),
}

impl StatusReply {
    pub(crate) fn state(state: &str) -> Self {
        Self::Status(JobStatus::new(JobState::from(state)))
    }
}

/// Scripted reply to a content request.
pub(crate) enum ContentReply {
    Chunks(Vec<&'static [u8]>),
    /// Sends the chunks, then fails mid-stream.
    Broken(Vec<&'static [u8]>),
    /// Sends the chunks, then never yields again.
    Stalled(Vec<&'static [u8]>),
    Http(u16),
}

pub(crate) struct FakeApi {
    submit_reply: Mutex<Option<Result<SubmitResponse>>>,
    statuses: Mutex<VecDeque<StatusReply>>,
    /// Returned once the script runs out.
    idle_status: JobState,
    content: Mutex<Option<ContentReply>>,
    pub(crate) submitted: Mutex<Vec<SubmitPayload>>,
    pub(crate) status_calls: Mutex<Vec<String>>,
    pub(crate) content_calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub(crate) fn new(video_id: &str) -> Self {
        Self {
            submit_reply: Mutex::new(Some(Ok(SubmitResponse {
                id: video_id.to_string(),
                status: JobState::Queued,
                created_at: Some(1_760_000_000),
            }))),
            statuses: Mutex::new(VecDeque::new()),
            idle_status: JobState::InProgress,
            content: Mutex::new(Some(ContentReply::Chunks(vec![&b"video"[..]]))),
            submitted: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            content_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_submit_error(self, status: u16, body: &str) -> Self {
        *self.submit_reply.lock().unwrap() = Some(Err(SoraError::Submission {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub(crate) fn with_statuses(self, replies: Vec<StatusReply>) -> Self {
        *self.statuses.lock().unwrap() = replies.into();
        self
    }

    pub(crate) fn with_content(self, reply: ContentReply) -> Self {
        *self.content.lock().unwrap() = Some(reply);
        self
    }

    pub(crate) fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoApi for FakeApi {
    async fn submit(&self, payload: &SubmitPayload) -> Result<SubmitResponse> {
        self.submitted.lock().unwrap().push(payload.clone());
        self.submit_reply
            .lock()
            .unwrap()
            .take()
            .expect("submit called more than once")
    }

    async fn fetch_status(&self, video_id: &str) -> Result<JobStatus> {
        self.status_calls.lock().unwrap().push(video_id.to_string());
        match self.statuses.lock().unwrap().pop_front() {
            Some(StatusReply::Status(status)) => Ok(status),
            Some(StatusReply::Http(status)) => Err(SoraError::Api {
                status,
                message: "upstream error".into(),
            }),
            None => Ok(JobStatus::new(self.idle_status.clone())),
        }
    }

    async fn fetch_content(&self, video_id: &str) -> Result<ContentStream> {
        self.content_calls.lock().unwrap().push(video_id.to_string());
        let reply = self
            .content
            .lock()
            .unwrap()
            .take()
            .expect("content fetched more than once");

        let (chunks, broken, stalled) = match reply {
            ContentReply::Http(status) => return Err(SoraError::Download { status }),
            ContentReply::Chunks(chunks) => (chunks, false, false),
            ContentReply::Broken(chunks) => (chunks, true, false),
            ContentReply::Stalled(chunks) => (chunks, false, true),
        };

        let total: usize = chunks.iter().map(|c| c.len()).sum();
        let mut items: Vec<Result<Bytes>> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        if broken {
            items.push(Err(SoraError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            ))));
        }

        let chunks = futures_util::stream::iter(items);
        let chunks = if stalled {
            chunks.chain(futures_util::stream::pending()).boxed()
        } else {
            chunks.boxed()
        };

        Ok(ContentStream {
            content_length: Some(total as u64),
            chunks,
        })
    }
}
