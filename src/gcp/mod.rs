//! Google Cloud REST clients: Cloud Storage, Document AI and Vertex AI RAG

pub mod auth;
pub mod document_ai;
pub mod error;
pub mod http;
pub mod rag;
pub mod storage;

pub use auth::{default_token_provider, StaticTokenProvider, TokenProvider};
pub use document_ai::{DocumentAiClient, ExtractionError, ExtractionOutput, ExtractionRequest};
pub use error::GcpError;
pub use http::GcpHttp;
pub use rag::{RagClient, RagContext, RagCorpus, RagFile};
pub use storage::{parse_gcs_uri, Bucket, StorageClient, StorageObject};

use crate::config::UrAgentConfig;
use std::sync::Arc;
use std::time::Duration;

/// The three cloud clients wired from one configuration and token source
#[derive(Debug, Clone)]
pub struct GcpClients {
    pub storage: StorageClient,
    pub document_ai: DocumentAiClient,
    pub rag: RagClient,
}

impl GcpClients {
    pub fn from_config(
        config: &UrAgentConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, GcpError> {
        let http = GcpHttp::with_timeout(tokens, Duration::from_secs(config.request_timeout_secs))?;

        Ok(Self {
            storage: StorageClient::new(
                http.clone(),
                config.storage_base_url(),
                config.project_id.clone(),
            ),
            document_ai: DocumentAiClient::new(http.clone(), config.document_ai_endpoint.clone()),
            rag: RagClient::new(
                http,
                config.vertex_base_url(),
                config.project_id.clone(),
                config.location.clone(),
            ),
        })
    }
}
