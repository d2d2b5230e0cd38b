//! Poll stage: wait for the remote job to reach a terminal state.

use crate::error::{Result, SoraError};
use crate::video::api::VideoApi;
use crate::video::types::{JobState, JobStatus};
use std::time::Duration;
use tokio::time::Instant;

/// Default delay between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default ceiling on total polling time.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Fixed-interval polling policy.
///
/// Generation takes a few minutes with little variance, so there is no
/// backoff; the timeout is a safety bound well above the expected time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status queries.
    pub interval: Duration,
    /// Total wall-clock time after which polling stops.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollPolicy {
    /// Sets the delay between status queries.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the polling ceiling.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rejects a zero interval, which would query the API in a tight loop.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(SoraError::InvalidRequest(
                "poll interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// A job observed in the `completed` state.
#[derive(Debug, Clone)]
pub struct CompletedJob {
    /// The status snapshot that reported completion.
    pub status: JobStatus,
    /// Number of status queries issued, including failed ones.
    pub attempts: u32,
    /// Time spent polling.
    pub elapsed: Duration,
}

/// Queries the job status until it completes, fails or the policy's
/// timeout elapses.
///
/// Non-success responses and transport errors on a status query are logged
/// and retried after the usual interval. A `failed` job and the timeout are
/// fatal. The ceiling is checked before every query, so no query is issued
/// once it has been exceeded.
pub async fn poll_until_complete<A>(
    api: &A,
    video_id: &str,
    policy: &PollPolicy,
) -> Result<CompletedJob>
where
    A: VideoApi + ?Sized,
{
    policy.validate()?;
    let start = Instant::now();
    let mut attempts = 0u32;

    tracing::info!(
        video_id = %video_id,
        interval_secs = policy.interval.as_secs(),
        timeout_secs = policy.timeout.as_secs(),
        "polling video generation status"
    );

    loop {
        let elapsed = start.elapsed();
        if elapsed > policy.timeout {
            tracing::warn!(
                video_id = %video_id,
                attempts,
                elapsed_secs = elapsed.as_secs(),
                "gave up waiting for video generation"
            );
            return Err(SoraError::Timeout(policy.timeout));
        }

        attempts += 1;
        match api.fetch_status(video_id).await {
            Ok(status) => match status.status {
                JobState::Completed => {
                    tracing::info!(
                        video_id = %video_id,
                        url = status.url.as_deref().unwrap_or("-"),
                        completed_at = ?status.completed_at_utc(),
                        attempts,
                        "video generation complete"
                    );
                    return Ok(CompletedJob {
                        status,
                        attempts,
                        elapsed: start.elapsed(),
                    });
                }
                JobState::Failed => {
                    let message = status.failure_message();
                    tracing::error!(video_id = %video_id, reason = %message, "video generation failed");
                    return Err(SoraError::GenerationFailed(message));
                }
                JobState::Submitted | JobState::Queued | JobState::InProgress => {
                    tracing::info!(
                        video_id = %video_id,
                        status = %status.status,
                        progress = status.progress_percent(),
                        elapsed_secs = elapsed.as_secs(),
                        "still generating"
                    );
                }
                JobState::Other(ref other) => {
                    tracing::warn!(
                        video_id = %video_id,
                        status = %other,
                        progress = status.progress_percent(),
                        elapsed_secs = elapsed.as_secs(),
                        "unknown job status, continuing to poll"
                    );
                }
            },
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    video_id = %video_id,
                    elapsed_secs = elapsed.as_secs(),
                    "status query failed, retrying: {e}"
                );
            }
            Err(e) => return Err(e),
        }

        tokio::time::sleep(policy.interval).await;
    }
}
