//! Upload-triggered preprocessing
//!
//! A PDF landing in a source bucket is OCR'd with Document AI, cleaned, and
//! stored as plain text in the knowledge-base bucket under
//! `processed_raw_text/{stem}.txt`.

pub mod text;

pub use text::{clean_text, is_pdf, kb_object_name};

use crate::config::UrAgentConfig;
use crate::gcp::document_ai::{DEFAULT_PAGE_CHUNK_SIZE, ExtractionRequest};
use crate::gcp::{parse_gcs_uri, DocumentAiClient, ExtractionError, GcpError, StorageClient};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Storage error: {0}")]
    Storage(#[from] GcpError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Object-finalize notification for an uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadEvent {
    pub bucket: String,
    pub name: String,
}

impl UploadEvent {
    pub fn from_gcs_uri(uri: &str) -> Result<Self, GcpError> {
        let (bucket, name) = parse_gcs_uri(uri)?;
        Ok(Self { bucket, name })
    }

    pub fn gcs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreprocessOutcome {
    Skipped {
        source_uri: String,
        reason: String,
    },
    Stored {
        source_uri: String,
        kb_uri: String,
        characters: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    storage: StorageClient,
    document_ai: DocumentAiClient,
    kb_bucket: String,
    project_id: Option<String>,
    processor_id: Option<String>,
    location: String,
}

impl Preprocessor {
    pub fn new(storage: StorageClient, document_ai: DocumentAiClient, config: &UrAgentConfig) -> Self {
        Self {
            storage,
            document_ai,
            kb_bucket: config.kb_bucket.clone(),
            project_id: config.project_id.clone(),
            processor_id: config.document_ai_processor_id.clone(),
            location: config.document_ai_location.clone(),
        }
    }

    pub async fn process_uploaded_document(
        &self,
        event: &UploadEvent,
    ) -> Result<PreprocessOutcome, PreprocessError> {
        let source_uri = event.gcs_uri();

        if !is_pdf(&event.name) {
            info!(uri = %source_uri, "Not a PDF, skipping");
            return Ok(PreprocessOutcome::Skipped {
                source_uri,
                reason: "not a PDF".to_string(),
            });
        }

        info!(uri = %source_uri, "Processing uploaded PDF");

        let header = self
            .storage
            .download_object(&event.bucket, &event.name, Some(PDF_MAGIC.len() as u64))
            .await?;
        if !header.starts_with(PDF_MAGIC) {
            warn!(uri = %source_uri, "Object has a .pdf name but no PDF header, skipping");
            return Ok(PreprocessOutcome::Skipped {
                source_uri,
                reason: "content is not a PDF document".to_string(),
            });
        }

        let extraction = self
            .document_ai
            .extract_text(&ExtractionRequest {
                gcs_uri: source_uri.clone(),
                project_id: self.project_id.clone(),
                location: self.location.clone(),
                processor_id: self.processor_id.clone(),
                mime_type: "application/pdf".to_string(),
                page_chunk_size: DEFAULT_PAGE_CHUNK_SIZE,
            })
            .await?;

        let cleaned = clean_text(&extraction.extracted_text);
        let kb_object = kb_object_name(&event.name);
        let characters = cleaned.chars().count();

        let stored = self
            .storage
            .upload_object(&self.kb_bucket, &kb_object, cleaned.into_bytes(), "text/plain")
            .await?;

        info!(
            source = %source_uri,
            destination = %stored.gcs_uri(),
            characters,
            "Stored extracted text in knowledge base"
        );

        Ok(PreprocessOutcome::Stored {
            source_uri,
            kb_uri: stored.gcs_uri(),
            characters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::{GcpHttp, StaticTokenProvider};
    use mockito::Matcher;
    use serde_json::json;
    use std::sync::Arc;

    fn preprocessor(server: &mockito::ServerGuard) -> Preprocessor {
        let http = GcpHttp::new(Arc::new(StaticTokenProvider::new("t"))).unwrap();
        let config = UrAgentConfig {
            project_id: Some("acme-prj".to_string()),
            document_ai_processor_id: Some("proc-1".to_string()),
            document_ai_location: "us".to_string(),
            kb_bucket: "ur-agent-knowledge-base".to_string(),
            ..UrAgentConfig::default()
        };
        Preprocessor::new(
            StorageClient::new(http.clone(), server.url(), config.project_id.clone()),
            DocumentAiClient::new(http, Some(server.url())),
            &config,
        )
    }

    #[tokio::test]
    async fn test_skips_non_pdf() {
        let server = mockito::Server::new_async().await;
        let outcome = preprocessor(&server)
            .process_uploaded_document(&UploadEvent {
                bucket: "uploads".to_string(),
                name: "notes.docx".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, PreprocessOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_extracts_cleans_and_stores() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/storage/v1/b/uploads/o/rfp%2Fvendor.PDF")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .match_header("range", "bytes=0-3")
            .with_status(206)
            .with_body("%PDF")
            .create_async()
            .await;
        server
            .mock("POST", "/v1/projects/acme-prj/locations/us/processors/proc-1:process")
            .with_status(200)
            .with_body(
                json!({"document": {"text": "Scope\n\n  Users   upload files\n", "pages": [{}]}})
                    .to_string(),
            )
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/upload/storage/v1/b/ur-agent-knowledge-base/o")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "media".into()),
                Matcher::UrlEncoded("name".into(), "processed_raw_text/vendor.txt".into()),
            ]))
            .match_header("content-type", "text/plain")
            .match_body("Scope Users upload files")
            .with_status(200)
            .with_body(r#"{"name":"processed_raw_text/vendor.txt","bucket":"ur-agent-knowledge-base","size":"24"}"#)
            .create_async()
            .await;

        let outcome = preprocessor(&server)
            .process_uploaded_document(&UploadEvent::from_gcs_uri("gs://uploads/rfp/vendor.PDF").unwrap())
            .await
            .unwrap();

        upload.assert_async().await;
        assert_eq!(
            outcome,
            PreprocessOutcome::Stored {
                source_uri: "gs://uploads/rfp/vendor.PDF".to_string(),
                kb_uri: "gs://ur-agent-knowledge-base/processed_raw_text/vendor.txt".to_string(),
                characters: 24,
            }
        );
    }

    #[tokio::test]
    async fn test_skips_objects_without_pdf_header() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/storage/v1/b/uploads/o/fake.pdf")
            .match_query(Matcher::Any)
            .match_header("range", "bytes=0-3")
            .with_status(206)
            .with_body("<htm")
            .create_async()
            .await;

        let outcome = preprocessor(&server)
            .process_uploaded_document(&UploadEvent {
                bucket: "uploads".to_string(),
                name: "fake.pdf".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, PreprocessOutcome::Skipped { .. }));
    }
}
