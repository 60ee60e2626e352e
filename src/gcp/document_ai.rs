//! Document AI text extraction
//!
//! Large PDFs are processed in page chunks: online processing caps the number of
//! pages per request, so the extractor walks the document window by window until
//! the service reports no more pages.

use super::error::GcpError;
use super::http::{url_for_resource, GcpHttp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const DEFAULT_PAGE_CHUNK_SIZE: i64 = 14;

/// Native PDF parsing accepts at most this many pages per request
pub const NATIVE_PDF_PAGE_LIMIT: i64 = 30;

/// Upper bound on pages listed in one `individualPageSelector`
pub const MAX_PAGE_CHUNK_SIZE: i64 = 500;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Project ID or Processor ID are not configured. Please provide them as arguments or set the defaults.")]
    NotConfigured,

    #[error("Invalid GCS URI. It must start with 'gs://'.")]
    InvalidUri,

    #[error("page_chunk_size must be a positive integer.")]
    InvalidChunkSize,

    #[error("page_chunk_size must not exceed {max} pages.")]
    ChunkSizeTooLarge { max: i64 },

    #[error("An API error occurred during document processing for pages {start}-{end}: {source}")]
    Api {
        start: i64,
        end: i64,
        #[source]
        source: GcpError,
    },
}

/// One extraction job against a processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub gcs_uri: String,
    pub project_id: Option<String>,
    pub location: String,
    pub processor_id: Option<String>,
    pub mime_type: String,
    pub page_chunk_size: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    document: ProcessedDocument,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProcessedDocument {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Value>,
}

/// Extracted text along with how many chunk requests it took
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutput {
    pub extracted_text: String,
    pub chunks_processed: usize,
    pub pages_processed: usize,
}

pub fn processor_path(project_id: &str, location: &str, processor_id: &str) -> String {
    format!(
        "projects/{}/locations/{}/processors/{}",
        project_id, location, processor_id
    )
}

/// The service signals the end of a document by rejecting the requested page window
fn is_page_range_error(err: &GcpError) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("page range") || message.contains("out of range")
}

#[derive(Debug, Clone)]
pub struct DocumentAiClient {
    http: GcpHttp,
    endpoint_override: Option<String>,
}

impl DocumentAiClient {
    pub fn new(http: GcpHttp, endpoint_override: Option<String>) -> Self {
        Self {
            http,
            endpoint_override,
        }
    }

    fn base_url(&self, location: &str) -> String {
        self.endpoint_override
            .clone()
            .unwrap_or_else(|| format!("https://{}-documentai.googleapis.com", location))
    }

    async fn process_pages(
        &self,
        base_url: &str,
        processor_name: &str,
        request: &ExtractionRequest,
        pages: Vec<i64>,
    ) -> Result<ProcessedDocument, GcpError> {
        let url = url_for_resource(base_url, &format!("{}:process", processor_name))?;

        let body = json!({
            "gcsDocument": {
                "gcsUri": request.gcs_uri,
                "mimeType": request.mime_type,
            },
            "skipHumanReview": true,
            "processOptions": {
                "individualPageSelector": { "pages": pages },
                "ocrConfig": { "enableNativePdfParsing": true },
            },
        });

        let response: ProcessResponse = self.http.post(url, &body).await?;
        Ok(response.document)
    }

    pub async fn extract_text(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutput, ExtractionError> {
        info!(
            gcs_uri = %request.gcs_uri,
            page_chunk_size = request.page_chunk_size,
            location = %request.location,
            "Starting document extraction"
        );

        let (project_id, processor_id) = match (&request.project_id, &request.processor_id) {
            (Some(p), Some(id)) if !p.is_empty() && !id.is_empty() => (p.as_str(), id.as_str()),
            _ => return Err(ExtractionError::NotConfigured),
        };
        if !request.gcs_uri.starts_with("gs://") {
            return Err(ExtractionError::InvalidUri);
        }
        if request.page_chunk_size <= 0 {
            return Err(ExtractionError::InvalidChunkSize);
        }
        if request.page_chunk_size > MAX_PAGE_CHUNK_SIZE {
            return Err(ExtractionError::ChunkSizeTooLarge {
                max: MAX_PAGE_CHUNK_SIZE,
            });
        }
        if request.page_chunk_size > NATIVE_PDF_PAGE_LIMIT {
            warn!(
                page_chunk_size = request.page_chunk_size,
                limit = NATIVE_PDF_PAGE_LIMIT,
                "Chunk size exceeds the native PDF parsing limit; the processor may reject it"
            );
        }

        let base_url = self.base_url(&request.location);
        let processor_name = processor_path(project_id, &request.location, processor_id);
        debug!(processor = %processor_name, "Using Document AI processor");

        let chunk = request.page_chunk_size;
        let mut texts: Vec<String> = Vec::new();
        let mut chunks_processed = 0;
        let mut pages_processed = 0;
        let mut current_page_start: i64 = 1;

        loop {
            let page_end = current_page_start.saturating_add(chunk - 1);
            debug!(start = current_page_start, end = page_end, "Processing page chunk");

            let pages: Vec<i64> = (current_page_start..=page_end).collect();
            let document = match self
                .process_pages(&base_url, &processor_name, request, pages)
                .await
            {
                Ok(document) => document,
                Err(e) if is_page_range_error(&e) => {
                    info!(error = %e, "Reached the end of the document (invalid page range)");
                    break;
                }
                Err(e) => {
                    error!(
                        start = current_page_start,
                        end = page_end,
                        error = %e,
                        "Document AI processing failed"
                    );
                    return Err(ExtractionError::Api {
                        start: current_page_start,
                        end: page_end,
                        source: e,
                    });
                }
            };

            if document.text.is_empty() && document.pages.is_empty() {
                debug!("No text or pages returned for this chunk, assuming end of document");
                break;
            }

            chunks_processed += 1;
            pages_processed += document.pages.len();

            if document.text.is_empty() {
                debug!("No text extracted from this chunk of pages");
            } else {
                debug!(pages = document.pages.len(), "Processed chunk");
                texts.push(document.text);
            }

            if document.pages.is_empty() || (document.pages.len() as i64) < chunk {
                debug!("Fewer pages returned than requested, reached the end of the document");
                break;
            }

            match page_end.checked_add(1) {
                Some(next) => current_page_start = next,
                None => break,
            }
        }

        if texts.is_empty() {
            info!("No text was extracted from any part of the document");
        } else {
            info!(chunks = chunks_processed, pages = pages_processed, "Extraction complete");
        }

        Ok(ExtractionOutput {
            extracted_text: texts.concat(),
            chunks_processed,
            pages_processed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::auth::StaticTokenProvider;
    use mockito::Matcher;
    use std::sync::Arc;

    const PROCESS_PATH: &str = "/v1/projects/acme-prj/locations/us/processors/proc-1:process";

    fn client(server: &mockito::ServerGuard) -> DocumentAiClient {
        let http = GcpHttp::new(Arc::new(StaticTokenProvider::new("t"))).unwrap();
        DocumentAiClient::new(http, Some(server.url()))
    }

    fn request(chunk: i64) -> ExtractionRequest {
        ExtractionRequest {
            gcs_uri: "gs://ur-docs/rfp.pdf".to_string(),
            project_id: Some("acme-prj".to_string()),
            location: "us".to_string(),
            processor_id: Some("proc-1".to_string()),
            mime_type: "application/pdf".to_string(),
            page_chunk_size: chunk,
        }
    }

    fn pages(n: usize) -> Vec<Value> {
        (1..=n).map(|i| json!({ "pageNumber": i })).collect()
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let server = mockito::Server::new_async().await;
        let client = client(&server);

        let mut missing = request(14);
        missing.processor_id = None;
        assert!(matches!(
            client.extract_text(&missing).await,
            Err(ExtractionError::NotConfigured)
        ));

        let mut bad_uri = request(14);
        bad_uri.gcs_uri = "https://example.com/rfp.pdf".to_string();
        let err = client.extract_text(&bad_uri).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid GCS URI. It must start with 'gs://'.");

        let err = client.extract_text(&request(0)).await.unwrap_err();
        assert_eq!(err.to_string(), "page_chunk_size must be a positive integer.");
    }

    #[tokio::test]
    async fn test_single_short_chunk() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PROCESS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "gcsDocument": {"gcsUri": "gs://ur-docs/rfp.pdf", "mimeType": "application/pdf"},
                "skipHumanReview": true,
                "processOptions": {
                    "individualPageSelector": {"pages": [1, 2, 3]},
                    "ocrConfig": {"enableNativePdfParsing": true}
                }
            })))
            .with_status(200)
            .with_body(json!({"document": {"text": "Short doc", "pages": pages(2)}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let output = client(&server).extract_text(&request(3)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(output.extracted_text, "Short doc");
        assert_eq!(output.chunks_processed, 1);
        assert_eq!(output.pages_processed, 2);
    }

    #[tokio::test]
    async fn test_walks_chunks_until_page_range_error() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", PROCESS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "processOptions": {"individualPageSelector": {"pages": [1, 2]}}
            })))
            .with_status(200)
            .with_body(json!({"document": {"text": "Page one. ", "pages": pages(2)}}).to_string())
            .create_async()
            .await;
        let second = server
            .mock("POST", PROCESS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "processOptions": {"individualPageSelector": {"pages": [3, 4]}}
            })))
            .with_status(200)
            .with_body(json!({"document": {"text": "Page three.", "pages": pages(2)}}).to_string())
            .create_async()
            .await;
        let third = server
            .mock("POST", PROCESS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "processOptions": {"individualPageSelector": {"pages": [5, 6]}}
            })))
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"Invalid page range: pages 5-6 out of range.","status":"INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        let output = client(&server).extract_text(&request(2)).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
        assert_eq!(output.extracted_text, "Page one. Page three.");
        assert_eq!(output.chunks_processed, 2);
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_rejected_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PROCESS_PATH)
            .expect(0)
            .create_async()
            .await;
        let client = client(&server);

        for chunk in [MAX_PAGE_CHUNK_SIZE + 1, 1_000_000_000, i64::MAX] {
            let err = client.extract_text(&request(chunk)).await.unwrap_err();
            assert!(matches!(err, ExtractionError::ChunkSizeTooLarge { max: 500 }));
            assert_eq!(err.to_string(), "page_chunk_size must not exceed 500 pages.");
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chunk_above_native_limit_is_still_sent() {
        let mut server = mockito::Server::new_async().await;
        let all_pages: Vec<i64> = (1..=40).collect();
        let mock = server
            .mock("POST", PROCESS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "processOptions": {"individualPageSelector": {"pages": all_pages}}
            })))
            .with_status(200)
            .with_body(json!({"document": {"text": "Forty page window", "pages": pages(12)}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let output = client(&server).extract_text(&request(40)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(output.extracted_text, "Forty page window");
        assert_eq!(output.pages_processed, 12);
    }

    #[tokio::test]
    async fn test_full_chunk_without_text_moves_to_next_window() {
        let mut server = mockito::Server::new_async().await;
        let blank = server
            .mock("POST", PROCESS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "processOptions": {"individualPageSelector": {"pages": [1, 2]}}
            })))
            .with_status(200)
            .with_body(json!({"document": {"text": "", "pages": pages(2)}}).to_string())
            .create_async()
            .await;
        let tail = server
            .mock("POST", PROCESS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "processOptions": {"individualPageSelector": {"pages": [3, 4]}}
            })))
            .with_status(200)
            .with_body(json!({"document": {"text": "Appendix A", "pages": pages(1)}}).to_string())
            .create_async()
            .await;

        let output = client(&server).extract_text(&request(2)).await.unwrap();

        blank.assert_async().await;
        tail.assert_async().await;
        assert_eq!(output.extracted_text, "Appendix A");
        assert_eq!(output.chunks_processed, 2);
        assert_eq!(output.pages_processed, 3);
    }

    #[tokio::test]
    async fn test_empty_document_returns_empty_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PROCESS_PATH)
            .with_status(200)
            .with_body(r#"{"document": {}}"#)
            .create_async()
            .await;

        let output = client(&server).extract_text(&request(14)).await.unwrap();
        assert_eq!(output.extracted_text, "");
        assert_eq!(output.chunks_processed, 0);
    }

    #[tokio::test]
    async fn test_other_api_errors_are_reported_with_page_window() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PROCESS_PATH)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"Permission denied on processor","status":"PERMISSION_DENIED"}}"#)
            .create_async()
            .await;

        let err = client(&server).extract_text(&request(14)).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with(
            "An API error occurred during document processing for pages 1-14:"
        ));
        assert!(message.contains("Permission denied"));
    }

    #[test]
    fn test_endpoint_follows_processor_location() {
        let http = GcpHttp::new(Arc::new(StaticTokenProvider::new("t"))).unwrap();
        let regional = DocumentAiClient::new(http.clone(), None);
        assert_eq!(regional.base_url("eu"), "https://eu-documentai.googleapis.com");

        let pinned = DocumentAiClient::new(http, Some("http://127.0.0.1:9000".to_string()));
        assert_eq!(pinned.base_url("eu"), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_processor_path() {
        assert_eq!(
            processor_path("p", "eu", "xyz"),
            "projects/p/locations/eu/processors/xyz"
        );
    }
}
