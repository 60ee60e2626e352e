use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::context::ToolContext;
use super::helpers::{optional_str, required_str};
use super::trait_def::Tool;
use crate::gcp::document_ai::DEFAULT_PAGE_CHUNK_SIZE;
use crate::gcp::{DocumentAiClient, ExtractionRequest};

const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// OCR of a PDF in Cloud Storage, chunked by page range
pub struct ExtractInformationTool {
    document_ai: DocumentAiClient,
    project_id: Option<String>,
    processor_id: Option<String>,
    location: String,
}

impl ExtractInformationTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            document_ai: context.clients.document_ai.clone(),
            project_id: context.config.project_id.clone(),
            processor_id: context.config.document_ai_processor_id.clone(),
            location: context.config.document_ai_location.clone(),
        }
    }

    fn request(&self, args: &Value) -> Result<ExtractionRequest> {
        let page_chunk_size = match &args["page_chunk_size"] {
            Value::Null => DEFAULT_PAGE_CHUNK_SIZE,
            value => value
                .as_i64()
                .ok_or_else(|| anyhow!("'page_chunk_size' must be an integer"))?,
        };

        Ok(ExtractionRequest {
            gcs_uri: required_str(args, "gcs_uri")?.to_string(),
            project_id: optional_str(args, "project_id")
                .map(str::to_string)
                .or_else(|| self.project_id.clone()),
            location: optional_str(args, "location")
                .map(str::to_string)
                .unwrap_or_else(|| self.location.clone()),
            processor_id: optional_str(args, "processor_id")
                .map(str::to_string)
                .or_else(|| self.processor_id.clone()),
            mime_type: optional_str(args, "mime_type")
                .unwrap_or(DEFAULT_MIME_TYPE)
                .to_string(),
            page_chunk_size,
        })
    }
}

#[async_trait]
impl Tool for ExtractInformationTool {
    fn name(&self) -> &'static str {
        "extract_information"
    }

    fn description(&self) -> &'static str {
        "Extract the full text of a document stored in Cloud Storage using Document AI OCR"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "gcs_uri": {
                    "type": "string",
                    "description": "gs:// URI of the document"
                },
                "project_id": {
                    "type": "string",
                    "description": "Project owning the processor (default: the configured project)"
                },
                "location": {
                    "type": "string",
                    "description": "Processor location, e.g. 'us' or 'eu' (default: the configured location)"
                },
                "processor_id": {
                    "type": "string",
                    "description": "Document AI processor id (default: the configured processor)"
                },
                "mime_type": {
                    "type": "string",
                    "description": "MIME type of the document (default: application/pdf)"
                },
                "page_chunk_size": {
                    "type": "integer",
                    "description": "Pages per processing request (default: 14, at most 30 with native PDF parsing, never more than 500)"
                }
            },
            "required": ["gcs_uri"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let request = self.request(&args)?;

        Ok(match self.document_ai.extract_text(&request).await {
            Ok(output) => json!({ "extracted_text": output.extracted_text }),
            Err(e) => json!({ "error": e.to_string() }),
        })
    }
}
