//! Submit stage: build the multipart payload and create the remote job.

use crate::error::{Result, SoraError};
use crate::video::api::{SubmitPayload, VideoApi};
use crate::video::types::{ReferenceImage, SubmissionResult, VideoRequest};

/// Builds the submit payload for a request.
///
/// A reference image path that does not point at an existing file is not an
/// error: the request degrades to text-to-video and a warning is logged.
pub fn prepare(request: &VideoRequest) -> Result<SubmitPayload> {
    request.validate()?;

    let reference = match request.image_path.as_deref() {
        Some(path) if path.is_file() => Some(ReferenceImage::load(path)?),
        Some(path) => {
            tracing::warn!(
                image = %path.display(),
                "image path is set but the file does not exist, falling back to text-to-video"
            );
            None
        }
        None => None,
    };

    Ok(SubmitPayload {
        fields: vec![
            ("prompt", request.prompt.clone()),
            ("model", request.model.clone()),
            ("size", request.size.clone()),
            ("seconds", request.seconds.to_string()),
        ],
        reference,
    })
}

/// Sends one submit call. Any rejection is fatal.
pub async fn submit<A>(api: &A, request: &VideoRequest) -> Result<SubmissionResult>
where
    A: VideoApi + ?Sized,
{
    let payload = prepare(request)?;
    let mode = payload.mode();

    if let Some(ref image) = payload.reference {
        tracing::info!(
            %mode,
            model = %request.model,
            size = %request.size,
            seconds = request.seconds,
            image = %image.file_name,
            mime_type = image.mime_type,
            image_bytes = image.data.len(),
            "submitting video generation request"
        );
    } else {
        tracing::info!(
            %mode,
            model = %request.model,
            size = %request.size,
            seconds = request.seconds,
            "submitting video generation request"
        );
    }
    tracing::debug!(prompt = %request.prompt, "prompt");

    let response = api.submit(&payload).await?;
    if response.id.trim().is_empty() {
        return Err(SoraError::UnexpectedResponse(
            "submit response carried no job id".into(),
        ));
    }
    let result = SubmissionResult::new(response, mode);

    tracing::info!(
        video_id = %result.id(),
        status = %result.status(),
        created_at = ?result.created_at(),
        "submitted, generation usually takes 3-5 minutes"
    );

    Ok(result)
}
