//! services/app/src/adapters/http.rs
//!
//! This module contains the HTTP adapter for the remote summarization backend.
//! It implements the `BackendService` port from the `core` crate, translating
//! transport failures and non-2xx responses into user-facing messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gpdf_core::domain::{ConversionResult, ExportFormat, QaAnswer, SummaryResult, UsageSnapshot};
use gpdf_core::ports::{BackendService, PortError, PortResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

// Generic fallback messages, used when the server does not provide detail text.
const SUMMARIZE_FALLBACK: &str = "Failed to generate the summary.";
const CONVERT_FALLBACK: &str = "Failed to convert the document.";
const QA_FALLBACK: &str = "Failed to answer the question.";
const DOWNLOAD_FALLBACK: &str = "Failed to download the converted file.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `BackendService` port against the
/// GPdf REST API.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` with a bounded per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Maps a transport-level failure (connect error, timeout) to a port error.
fn transport_error(e: reqwest::Error) -> PortError {
    PortError::Unreachable(e.to_string())
}

/// Extracts the server's `detail` text from an error response, falling back
/// to a generic per-operation message.
async fn api_error(response: reqwest::Response, fallback: &str) -> PortError {
    let detail = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("detail")
                .and_then(|d| d.as_str())
                .map(str::to_string)
        });
    PortError::Api(detail.unwrap_or_else(|| fallback.to_string()))
}

//=========================================================================================
// "Impure" Wire Response Structs
//=========================================================================================

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
    page_count: u32,
    processing_time: Option<f64>,
    // Older servers do not assign a document handle, which disables Q&A.
    file_id: Option<String>,
}
impl SummarizeResponse {
    fn to_domain(self) -> SummaryResult {
        SummaryResult {
            summary: self.summary,
            page_count: self.page_count,
            processing_time: self.processing_time,
            document_id: self.file_id,
        }
    }
}

#[derive(Deserialize)]
struct UsageResponse {
    usage_count: u32,
    limit: u32,
    reset_time: DateTime<Utc>,
}
impl UsageResponse {
    fn to_domain(self) -> UsageSnapshot {
        // `remaining` is recomputed locally so the clamping invariant holds
        // even if the server reports something inconsistent.
        UsageSnapshot::new(self.usage_count, self.limit, self.reset_time)
    }
}

#[derive(Deserialize)]
struct ConvertResponse {
    download_url: String,
    filename: String,
    file_size: u64,
}
impl ConvertResponse {
    fn to_domain(self) -> ConversionResult {
        ConversionResult {
            download_url: self.download_url,
            filename: self.filename,
            file_size: self.file_size,
        }
    }
}

#[derive(Deserialize)]
struct QaResponse {
    answer: String,
    context: Option<String>,
}
impl QaResponse {
    fn to_domain(self) -> QaAnswer {
        QaAnswer {
            answer: self.answer,
            context: self.context,
        }
    }
}

//=========================================================================================
// The Port Implementation
//=========================================================================================

#[async_trait]
impl BackendService for HttpBackend {
    async fn health_check(&self) -> PortResult<()> {
        let response = self
            .client
            .get(self.url("/health/"))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PortError::Unreachable(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }

    async fn summarize(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        session_id: &str,
    ) -> PortResult<SummaryResult> {
        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("session_id", session_id.to_string());

        let response = self
            .client
            .post(self.url("/pdf/summarize"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response, SUMMARIZE_FALLBACK).await);
        }

        let body: SummarizeResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(body.to_domain())
    }

    async fn check_usage(&self, session_id: &str) -> UsageSnapshot {
        // Infallible by contract: a usage check must never block the user,
        // so every failure path collapses into the fallback snapshot.
        let result: PortResult<UsageResponse> = async {
            let response = self
                .client
                .get(self.url(&format!("/pdf/usage/{}", session_id)))
                .send()
                .await
                .map_err(transport_error)?;
            if !response.status().is_success() {
                return Err(PortError::Api(format!(
                    "usage endpoint returned {}",
                    response.status()
                )));
            }
            response
                .json()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))
        }
        .await;

        match result {
            Ok(body) => body.to_domain(),
            Err(e) => {
                warn!("Usage check failed, substituting default snapshot: {}", e);
                UsageSnapshot::fallback(Utc::now())
            }
        }
    }

    async fn convert(
        &self,
        summary_text: &str,
        format: ExportFormat,
        session_id: &str,
    ) -> PortResult<ConversionResult> {
        let form = reqwest::multipart::Form::new()
            .text("summary_text", summary_text.to_string())
            .text("format", format.as_str())
            .text("session_id", session_id.to_string());

        let response = self
            .client
            .post(self.url("/pdf/convert"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response, CONVERT_FALLBACK).await);
        }

        let body: ConvertResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(body.to_domain())
    }

    async fn ask_question(&self, document_id: &str, question: &str) -> PortResult<QaAnswer> {
        let payload = serde_json::json!({
            "file_id": document_id,
            "question": question,
        });

        let response = self
            .client
            .post(self.url("/pdf/qa"))
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        // Q&A failures are always reported generically, never with server detail.
        if !response.status().is_success() {
            return Err(PortError::Api(QA_FALLBACK.to_string()));
        }

        let body: QaResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(body.to_domain())
    }

    async fn download(&self, download_url: &str) -> PortResult<Vec<u8>> {
        let response = self
            .client
            .get(self.url(download_url))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response, DOWNLOAD_FALLBACK).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend_for(server: &MockServer) -> HttpBackend {
        HttpBackend::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn summarize_maps_wire_fields_to_domain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pdf/summarize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "summary": "A short summary.",
                "page_count": 3,
                "usage_remaining": 2,
                "processing_time": 1.25,
                "file_id": "doc-42"
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let result = backend
            .summarize("a.pdf", b"%PDF-1.4".to_vec(), "session_1")
            .await
            .unwrap();

        assert_eq!(result.summary, "A short summary.");
        assert_eq!(result.page_count, 3);
        assert_eq!(result.processing_time, Some(1.25));
        assert_eq!(result.document_id.as_deref(), Some("doc-42"));
    }

    #[tokio::test]
    async fn summarize_surfaces_server_detail_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pdf/summarize"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "detail": "Daily usage limit exceeded. Try again tomorrow."
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let err = backend
            .summarize("a.pdf", b"%PDF-1.4".to_vec(), "session_1")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Daily usage limit exceeded. Try again tomorrow."
        );
    }

    #[tokio::test]
    async fn check_usage_failure_yields_fallback_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pdf/usage/session_1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let snapshot = backend.check_usage("session_1").await;

        assert_eq!(snapshot.usage_count, 0);
        assert_eq!(snapshot.limit, 3);
        assert_eq!(snapshot.remaining, 3);
    }

    #[tokio::test]
    async fn check_usage_recomputes_remaining_from_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pdf/usage/session_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "usage_count": 2,
                "limit": 3,
                "remaining": 99,
                "reset_time": "2030-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let snapshot = backend.check_usage("session_1").await;

        assert_eq!(snapshot.usage_count, 2);
        assert_eq!(snapshot.remaining, 1);
    }

    #[tokio::test]
    async fn convert_returns_download_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pdf/convert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "download_url": "/pdf/download/summary_1.docx",
                "filename": "summary_1.docx",
                "file_size": 2048
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let result = backend
            .convert("Some summary text.", ExportFormat::Docx, "session_1")
            .await
            .unwrap();

        assert_eq!(result.download_url, "/pdf/download/summary_1.docx");
        assert_eq!(result.filename, "summary_1.docx");
        assert_eq!(result.file_size, 2048);
    }

    #[tokio::test]
    async fn ask_question_failure_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pdf/qa"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "detail": "internal stack trace"
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let err = backend.ask_question("doc-42", "What is this?").await.unwrap_err();

        assert_eq!(err.to_string(), QA_FALLBACK);
    }

    #[tokio::test]
    async fn health_check_fails_as_unreachable_when_server_is_down() {
        // Bind, record the address, then drop the server.
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let backend = HttpBackend::new(&uri, Duration::from_secs(1)).unwrap();
        let err = backend.health_check().await.unwrap_err();
        assert!(matches!(err, PortError::Unreachable(_)));
    }
}
