//! Error types for the submit / poll / download workflow.

use std::time::Duration;

/// Errors that can occur while generating a video.
#[derive(Debug, thiserror::Error)]
pub enum SoraError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The submit call was rejected.
    #[error("submission failed: {status} - {body}")]
    Submission { status: u16, body: String },

    /// A status query returned a non-success response.
    #[error("status query failed: {status} - {message}")]
    Api { status: u16, message: String },

    /// The remote job reached the `failed` state.
    #[error("video generation failed: {0}")]
    GenerationFailed(String),

    /// Polling did not observe a terminal state before the ceiling.
    #[error("video generation timed out after {0:?}")]
    Timeout(Duration),

    /// The content endpoint returned a non-success response.
    #[error("download failed with status {status}")]
    Download { status: u16 },

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The API answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (reading the reference image, writing the video).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SoraError {
    /// Returns true if the poller should sleep and query again instead of
    /// aborting.
    ///
    /// Only status queries are ever retried; every other stage treats all
    /// errors as fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Network(_) | Self::Json(_))
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Submission { status, .. } | Self::Api { status, .. } | Self::Download { status } => {
                Some(*status)
            }
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for video generation operations.
pub type Result<T> = std::result::Result<T, SoraError>;
