//! HTTP client for the Sora video endpoints.

use crate::error::{Result, SoraError};
use crate::video::api::{ContentStream, SubmitPayload, VideoApi, INPUT_REFERENCE_FIELD};
use crate::video::types::{JobStatus, SubmitResponse};
use async_trait::async_trait;
use futures_util::StreamExt;

/// Default videos endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.apiyi.com/v1/videos";

const BEARER_PREFIX: &str = "Bearer ";

/// Builder for SoraClient.
#[derive(Debug, Clone)]
pub struct SoraClientBuilder {
    api_key: Option<String>,
    base_url: String,
}

impl Default for SoraClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl SoraClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `SORA_API_KEY`, then `OPENAI_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the videos endpoint, e.g. `https://api.openai.com/v1/videos`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builds the client, resolving the API key.
    pub fn build(self) -> Result<SoraClient> {
        let api_key = self
            .api_key
            .as_deref()
            .and_then(bare_key)
            .or_else(|| env_key("SORA_API_KEY"))
            .or_else(|| env_key("OPENAI_API_KEY"))
            .ok_or_else(|| {
                SoraError::Auth("SORA_API_KEY not set and no API key provided".into())
            })?;

        let base_url = self.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SoraError::InvalidRequest("base URL must not be empty".into()));
        }

        Ok(SoraClient {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        })
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().as_deref().and_then(bare_key)
}

/// Trims the key and drops a pasted `Bearer ` prefix, since the scheme is
/// added when the header is built.
fn bare_key(raw: &str) -> Option<String> {
    let key = raw.trim();
    let key = match key.get(..BEARER_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => {
            key[BEARER_PREFIX.len()..].trim()
        }
        _ => key,
    };
    (!key.is_empty()).then(|| key.to_string())
}

/// Sora videos API over HTTP.
///
/// No per-request timeout is set; the only time bound is the poller's
/// ceiling.
pub struct SoraClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SoraClient {
    /// Creates a new `SoraClientBuilder`.
    pub fn builder() -> SoraClientBuilder {
        SoraClientBuilder::new()
    }

    /// The videos endpoint this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn status_url(&self, video_id: &str) -> String {
        format!("{}/{}", self.base_url, video_id)
    }

    fn content_url(&self, video_id: &str) -> String {
        format!("{}/{}/content", self.base_url, video_id)
    }

    fn form(payload: &SubmitPayload) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &payload.fields {
            form = form.text(*name, value.clone());
        }

        if let Some(ref image) = payload.reference {
            let part = reqwest::multipart::Part::bytes(image.data.clone())
                .file_name(image.file_name.clone())
                .mime_str(image.mime_type)
                .map_err(|e| SoraError::InvalidRequest(e.to_string()))?;
            form = form.part(INPUT_REFERENCE_FIELD, part);
        }

        Ok(form)
    }
}

#[async_trait]
impl VideoApi for SoraClient {
    async fn submit(&self, payload: &SubmitPayload) -> Result<SubmitResponse> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("{}{}", BEARER_PREFIX, self.api_key))
            .header("Accept", "application/json")
            .multipart(Self::form(payload)?)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status != reqwest::StatusCode::OK {
            return Err(SoraError::Submission {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn fetch_status(&self, video_id: &str) -> Result<JobStatus> {
        let response = self
            .client
            .get(self.status_url(video_id))
            .header("Authorization", format!("{}{}", BEARER_PREFIX, self.api_key))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(SoraError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(response.json().await?)
    }

    async fn fetch_content(&self, video_id: &str) -> Result<ContentStream> {
        let response = self
            .client
            .get(self.content_url(video_id))
            .header("Authorization", format!("{}{}", BEARER_PREFIX, self.api_key))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SoraError::Download {
                status: status.as_u16(),
            });
        }

        Ok(ContentStream {
            content_length: response.content_length(),
            chunks: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(SoraError::from))
                .boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::types::{JobState, ReferenceImage};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, answers it with `status` and `body`, and
    /// hands back the raw request.
    async fn serve_once(status: u16, body: &'static [u8]) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;

            let head = format!(
                "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                status,
                body.len()
            );
            stream.write_all(head.as_bytes()).await.unwrap();
            stream.write_all(body).await.unwrap();
            stream.shutdown().await.unwrap();

            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}/v1/videos", addr), handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);

            let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok());

            let complete = match content_length {
                Some(len) => request.len() >= end + 4 + len,
                None if head.contains("transfer-encoding: chunked") => {
                    request.ends_with(b"0\r\n\r\n")
                }
                None => true,
            };
            if complete {
                break;
            }
        }
        request
    }

    fn client(base_url: &str) -> SoraClient {
        SoraClient {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            api_key: "sk-test".into(),
            base_url: base_url.into(),
        }
    }

    fn text_payload() -> SubmitPayload {
        SubmitPayload {
            fields: vec![("prompt", "A cat".into()), ("model", "sora-2".into())],
            reference: None,
        }
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let client = SoraClientBuilder::new().api_key("sk-test").build().unwrap();
        assert_eq!(client.api_key, "sk-test");
    }

    #[test]
    fn test_builder_strips_bearer_prefix() {
        let client = SoraClientBuilder::new().api_key("Bearer sk-abc").build().unwrap();
        assert_eq!(client.api_key, "sk-abc");

        let client = SoraClientBuilder::new().api_key("  bearer   sk-abc ").build().unwrap();
        assert_eq!(client.api_key, "sk-abc");
    }

    #[test]
    fn test_builder_without_key_fails() {
        std::env::remove_var("SORA_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
        let client = SoraClientBuilder::new().build();
        assert!(matches!(client, Err(SoraError::Auth(_))));

        let client = SoraClientBuilder::new().api_key("   ").build();
        assert!(matches!(client, Err(SoraError::Auth(_))));
    }

    #[test]
    fn test_builder_trims_base_url() {
        let client = SoraClientBuilder::new()
            .api_key("sk-test")
            .base_url("https://api.openai.com/v1/videos/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://api.openai.com/v1/videos");
        assert_eq!(
            client.status_url("video_123"),
            "https://api.openai.com/v1/videos/video_123"
        );
        assert_eq!(
            client.content_url("video_123"),
            "https://api.openai.com/v1/videos/video_123/content"
        );
    }

    #[test]
    fn test_builder_rejects_empty_base_url() {
        let client = SoraClientBuilder::new().api_key("sk-test").base_url("/").build();
        assert!(matches!(client, Err(SoraError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_submit_sends_multipart_with_reference() {
        let (url, server) =
            serve_once(200, br#"{"id":"video_123","status":"queued","created_at":1760000000}"#).await;
        let payload = SubmitPayload {
            fields: vec![
                ("prompt", "A cat".into()),
                ("model", "sora-2".into()),
                ("size", "1280x720".into()),
                ("seconds", "15".into()),
            ],
            reference: Some(ReferenceImage {
                file_name: "cat.png".into(),
                mime_type: "image/png",
                data: b"PNGDATA-0123".to_vec(),
            }),
        };

        let response = client(&url).submit(&payload).await.unwrap();
        assert_eq!(response.id, "video_123");
        assert_eq!(response.status, JobState::Queued);
        assert_eq!(response.created_at, Some(1_760_000_000));

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /v1/videos HTTP/1.1\r\n"));
        assert!(lower.contains("authorization: bearer sk-test\r\n"));
        assert!(lower.contains("content-type: multipart/form-data; boundary="));
        assert!(lower.contains(r#"name="prompt""#));
        assert!(lower.contains(r#"name="seconds""#));
        assert!(lower.contains(r#"name="input_reference"; filename="cat.png""#));
        assert!(lower.contains("content-type: image/png"));
        assert!(request.contains("PNGDATA-0123"));
    }

    #[tokio::test]
    async fn test_submit_text_mode_has_no_reference_part() {
        let (url, server) = serve_once(200, br#"{"id":"video_123","status":"queued"}"#).await;

        client(&url).submit(&text_payload()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.contains("A cat"));
        assert!(!request.contains(INPUT_REFERENCE_FIELD));
    }

    #[tokio::test]
    async fn test_submit_non_ok_status_is_rejected() {
        for status in [201u16, 404, 500] {
            let (url, _server) = serve_once(status, br#"{"error":"nope"}"#).await;

            let err = client(&url).submit(&text_payload()).await.unwrap_err();
            match err {
                SoraError::Submission { status: got, body } => {
                    assert_eq!(got, status);
                    assert_eq!(body, r#"{"error":"nope"}"#);
                }
                other => panic!("unexpected error for {status}: {other}"),
            }
        }
    }

    #[tokio::test]
    async fn test_submit_sends_bearer_prefixed_key_once() {
        let (url, server) = serve_once(200, br#"{"id":"video_123","status":"queued"}"#).await;
        let client = SoraClientBuilder::new()
            .api_key("Bearer sk-abc")
            .base_url(&url)
            .build()
            .unwrap();
        let client = SoraClient {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..client
        };

        client.submit(&text_payload()).await.unwrap();

        let lower = server.await.unwrap().to_ascii_lowercase();
        assert!(lower.contains("authorization: bearer sk-abc\r\n"));
        assert!(!lower.contains("bearer bearer"));
    }

    #[tokio::test]
    async fn test_fetch_status_parses_job() {
        let (url, server) = serve_once(
            200,
            br#"{"id":"video_123","status":"completed","progress":100,"url":"https://cdn/v.mp4","completed_at":1760000300}"#,
        )
        .await;

        let status = client(&url).fetch_status("video_123").await.unwrap();
        assert_eq!(status.status, JobState::Completed);
        assert_eq!(status.progress, Some(100));
        assert_eq!(status.url.as_deref(), Some("https://cdn/v.mp4"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v1/videos/video_123 HTTP/1.1\r\n"));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer sk-test\r\n"));
    }

    #[tokio::test]
    async fn test_fetch_status_non_ok_is_api_error() {
        for status in [201u16, 500] {
            let (url, _server) = serve_once(status, b"busy").await;

            let err = client(&url).fetch_status("video_123").await.unwrap_err();
            assert!(matches!(err, SoraError::Api { status: got, .. } if got == status));
            assert!(err.is_transient());
        }
    }

    #[tokio::test]
    async fn test_fetch_content_streams_body() {
        let (url, server) = serve_once(200, b"\x00\x00\x00\x18ftypmp42").await;

        let content = client(&url).fetch_content("video_123").await.unwrap();
        assert_eq!(content.content_length, Some(12));
        let chunks: Vec<_> = content.chunks.collect().await;
        let body: Vec<u8> = chunks
            .into_iter()
            .flat_map(|chunk| chunk.unwrap().to_vec())
            .collect();
        assert_eq!(body, b"\x00\x00\x00\x18ftypmp42");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v1/videos/video_123/content HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn test_fetch_content_non_ok_is_download_error() {
        for status in [201u16, 404] {
            let (url, _server) = serve_once(status, b"").await;

            let err = client(&url).fetch_content("video_123").await.err().unwrap();
            assert!(matches!(err, SoraError::Download { status: got } if got == status));
        }
    }
}
