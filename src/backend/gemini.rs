//! Gemini Files API backend.
//!
//! ## Wire sequence
//!
//! ```text
//! POST /upload/v1beta/files        (resumable start)   → x-goog-upload-url
//! POST <upload url>                (upload, finalize)  → { file: { name, uri, state } }
//! GET  /v1beta/{file.name}                             → { state: PROCESSING | ACTIVE | FAILED }
//! POST /v1beta/models/{model}:generateContent          → { candidates[0].content.parts[].text }
//! ```
//!
//! The API key travels in the `x-goog-api-key` header, never in the URL, so
//! request URLs can be logged safely.
//!
//! Only connection setup has a timeout. A paper upload over a slow link and
//! a long generation call are both allowed to take as long as they take.

use crate::backend::{AnalysisBackend, AnalysisRequest, RemoteFile, RemoteState};
use crate::error::{BackendFailure, ReviewError};
use crate::pipeline::input::Document;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Public Generative Language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Analysis backend over the Gemini Files API.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiBackend {
    /// Create a backend authenticated with `api_key`.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ReviewError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ReviewError::InvalidConfig(
                "Gemini API key is empty (set GEMINI_API_KEY)".to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(concat!("paper2notion/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReviewError::Internal(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the backend at another endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn start_upload(&self, document: &Document) -> Result<String, BackendFailure> {
        let url = format!("{}/upload/v1beta/files", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header(
                "X-Goog-Upload-Header-Content-Length",
                document.len().to_string(),
            )
            .header("X-Goog-Upload-Header-Content-Type", &document.mime_type)
            .json(&json!({ "file": { "display_name": document.display_name } }))
            .send()
            .await
            .map_err(transport_failure)?;

        let response = check_status(response).await?;
        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| BackendFailure::new("upload session started without an upload URL"))
    }
}

#[async_trait]
impl AnalysisBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn upload(&self, document: &Document) -> Result<RemoteFile, BackendFailure> {
        let upload_url = self.start_upload(document).await?;
        debug!("Upload session opened for '{}'", document.display_name);

        let response = self
            .client
            .post(&upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(document.bytes.clone())
            .send()
            .await
            .map_err(transport_failure)?;

        let uploaded: UploadResponse = parse_json(check_status(response).await?).await?;
        Ok(uploaded.file.into_remote())
    }

    async fn status(&self, file: &RemoteFile) -> Result<RemoteState, BackendFailure> {
        let url = format!("{}/v1beta/{}", self.base_url, file.name);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(transport_failure)?;

        let resource: FileResource = parse_json(check_status(response).await?).await?;
        Ok(resource.remote_state())
    }

    async fn generate(
        &self,
        file: &RemoteFile,
        request: &AnalysisRequest<'_>,
    ) -> Result<String, BackendFailure> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        let body = generate_body(file, request)?;

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_failure)?;

        let generated: GenerateResponse = parse_json(check_status(response).await?).await?;
        response_text(generated)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl FileResource {
    fn remote_state(&self) -> RemoteState {
        self.state
            .as_deref()
            .map(RemoteState::parse)
            .unwrap_or(RemoteState::Processing)
    }

    fn into_remote(self) -> RemoteFile {
        let state = self.remote_state();
        RemoteFile {
            name: self.name,
            uri: self.uri,
            mime_type: self
                .mime_type
                .unwrap_or_else(|| crate::pipeline::input::PDF_MIME.to_string()),
            state,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    status: Option<String>,
    message: String,
}

// ── Request/response helpers ─────────────────────────────────────────────

fn generate_body(file: &RemoteFile, request: &AnalysisRequest<'_>) -> Result<Value, BackendFailure> {
    let uri = file
        .uri
        .as_deref()
        .ok_or_else(|| BackendFailure::new(format!("file '{}' has no URI", file.name)))?;

    Ok(json!({
        "system_instruction": {
            "parts": [{ "text": request.system_instruction }]
        },
        "contents": [{
            "role": "user",
            "parts": [
                { "file_data": { "mime_type": file.mime_type, "file_uri": uri } },
                { "text": request.user_prompt }
            ]
        }],
        "generationConfig": {
            "responseMimeType": request.response_mime_type
        }
    }))
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GenerateResponse) -> Result<String, BackendFailure> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(BackendFailure::new(format!(
            "model returned no answer ({reason})"
        )));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unknown".to_string());
        return Err(BackendFailure::new(format!(
            "model returned an empty answer (finish reason: {reason})"
        )));
    }
    Ok(text)
}

fn transport_failure(e: reqwest::Error) -> BackendFailure {
    BackendFailure::new(format!("request failed: {e}"))
}

async fn check_status(response: Response) -> Result<Response, BackendFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendFailure::http(
        status.as_u16(),
        error_message(status.as_u16(), &body),
    ))
}

/// Render a Google API error body as `HTTP <code> <STATUS>: <message>`.
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(s) => format!("HTTP {status} {s}: {}", parsed.error.message),
            None => format!("HTTP {status}: {}", parsed.error.message),
        },
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

async fn parse_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, BackendFailure> {
    let bytes = response.bytes().await.map_err(transport_failure)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| BackendFailure::new(format!("unexpected response body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_file() -> RemoteFile {
        RemoteFile {
            name: "files/abc123".into(),
            uri: Some("https://generativelanguage.googleapis.com/v1beta/files/abc123".into()),
            mime_type: "application/pdf".into(),
            state: RemoteState::Active,
        }
    }

    fn request() -> AnalysisRequest<'static> {
        AnalysisRequest {
            model: "gemini-test",
            system_instruction: "be thorough",
            user_prompt: "review it",
            response_mime_type: "application/json",
        }
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            GeminiBackend::new("  "),
            Err(ReviewError::InvalidConfig(_))
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let backend = GeminiBackend::new("secret-key").unwrap();
        let dbg = format!("{backend:?}");
        assert!(!dbg.contains("secret-key"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = GeminiBackend::new("k")
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(backend.base_url, "http://localhost:8080");
    }

    #[test]
    fn generate_body_references_file_and_requests_json() {
        let body = generate_body(&ready_file(), &request()).unwrap();
        assert_eq!(
            body["system_instruction"]["parts"][0]["text"],
            "be thorough"
        );
        let parts = &body["contents"][0]["parts"];
        assert_eq!(
            parts[0]["file_data"]["file_uri"],
            "https://generativelanguage.googleapis.com/v1beta/files/abc123"
        );
        assert_eq!(parts[0]["file_data"]["mime_type"], "application/pdf");
        assert_eq!(parts[1]["text"], "review it");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn generate_body_needs_uri() {
        let mut file = ready_file();
        file.uri = None;
        assert!(generate_body(&file, &request()).is_err());
    }

    #[test]
    fn upload_response_maps_to_remote_file() {
        let raw = r#"{"file":{"name":"files/x1","uri":"https://g/files/x1","mimeType":"application/pdf","state":"PROCESSING","sizeBytes":"1024"}}"#;
        let parsed: UploadResponse = serde_json::from_str(raw).unwrap();
        let file = parsed.file.into_remote();
        assert_eq!(file.name, "files/x1");
        assert_eq!(file.state, RemoteState::Processing);
        assert_eq!(file.uri.as_deref(), Some("https://g/files/x1"));
    }

    #[test]
    fn missing_state_counts_as_processing() {
        let parsed: FileResource = serde_json::from_str(r#"{"name":"files/x"}"#).unwrap();
        assert_eq!(parsed.remote_state(), RemoteState::Processing);
        let parsed: FileResource =
            serde_json::from_str(r#"{"name":"files/x","state":"ACTIVE"}"#).unwrap();
        assert_eq!(parsed.remote_state(), RemoteState::Active);
    }

    #[test]
    fn response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response_text(parsed).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let raw = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let err = response_text(parsed).unwrap_err();
        assert!(err.message.contains("SAFETY"), "got: {}", err.message);
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let raw = r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let err = response_text(parsed).unwrap_err();
        assert!(err.message.contains("MAX_TOKENS"), "got: {}", err.message);
    }

    #[test]
    fn api_error_body_is_summarised() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_message(400, body),
            "HTTP 400 INVALID_ARGUMENT: API key not valid."
        );
        assert_eq!(error_message(502, ""), "HTTP 502");
        assert_eq!(error_message(500, "oops"), "HTTP 500: oops");
    }
}
