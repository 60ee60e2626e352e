//! Vertex AI RAG Engine wrapper
//!
//! Corpus mutations come back as long-running operations; every call here
//! waits for the operation to finish so tools stay synchronous from the
//! agent's point of view.

use super::error::GcpError;
use super::http::{url_for_resource, GcpHttp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_EMBEDDING_MODEL: &str = "publishers/google/models/text-embedding-005";
pub const DEFAULT_CHUNK_SIZE: u32 = 512;
pub const DEFAULT_CHUNK_OVERLAP: u32 = 100;
pub const DEFAULT_TOP_K: u32 = 10;
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.5;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_POLLS: u32 = 150;
const LIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagCorpus {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl RagCorpus {
    /// Trailing id segment of the resource name
    pub fn corpus_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagFile {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gcs_source: Option<Value>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl RagFile {
    pub fn source_uris(&self) -> Vec<String> {
        self.gcs_source
            .as_ref()
            .and_then(|s| s.get("uris"))
            .and_then(Value::as_array)
            .map(|uris| {
                uris.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagContext {
    #[serde(default)]
    pub source_uri: Option<String>,
    #[serde(default)]
    pub source_display_name: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
    /// Filled in by cross-corpus search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    #[serde(default, deserialize_with = "int64_string")]
    pub imported_rag_files_count: u64,
    #[serde(default, deserialize_with = "int64_string")]
    pub failed_rag_files_count: u64,
    #[serde(default, deserialize_with = "int64_string")]
    pub skipped_rag_files_count: u64,
}

/// int64 fields arrive as JSON strings
fn int64_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid count {}", n))),
        Value::String(s) => s.parse().map_err(D::Error::custom),
        Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("invalid count {}", other))),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationStatus>,
    #[serde(default)]
    response: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorpusPage {
    #[serde(default)]
    rag_corpora: Vec<RagCorpus>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilePage {
    #[serde(default)]
    rag_files: Vec<RagFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    contexts: ContextList,
}

#[derive(Debug, Default, Deserialize)]
struct ContextList {
    #[serde(default)]
    contexts: Vec<RagContext>,
}

#[derive(Debug, Clone)]
pub struct RagClient {
    http: GcpHttp,
    base_url: String,
    project_id: Option<String>,
    location: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl RagClient {
    pub fn new(
        http: GcpHttp,
        base_url: impl Into<String>,
        project_id: Option<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            project_id,
            location: location.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn parent(&self) -> Result<String, GcpError> {
        let project = self.project_id.as_deref().filter(|p| !p.is_empty()).ok_or_else(|| {
            GcpError::InvalidArgument("GOOGLE_CLOUD_PROJECT is not set".to_string())
        })?;
        Ok(format!("projects/{}/locations/{}", project, self.location))
    }

    /// Accepts a full `projects/.../ragCorpora/{id}` name or a bare corpus id
    pub fn corpus_name(&self, corpus: &str) -> Result<String, GcpError> {
        let corpus = corpus.trim().trim_matches('/');
        if corpus.is_empty() {
            return Err(GcpError::InvalidArgument(
                "corpus name must not be empty".to_string(),
            ));
        }
        if corpus.starts_with("projects/") {
            return Ok(corpus.to_string());
        }
        Ok(format!("{}/ragCorpora/{}", self.parent()?, corpus))
    }

    fn file_name(&self, file: &str) -> Result<String, GcpError> {
        let file = file.trim().trim_matches('/');
        if file.starts_with("projects/") && file.contains("/ragFiles/") {
            Ok(file.to_string())
        } else {
            Err(GcpError::InvalidArgument(format!(
                "'{}' is not a RAG file resource name (projects/.../ragCorpora/.../ragFiles/...)",
                file
            )))
        }
    }

    fn embedding_endpoint(&self, model: &str) -> Result<String, GcpError> {
        if model.starts_with("projects/") {
            Ok(model.to_string())
        } else {
            Ok(format!("{}/{}", self.parent()?, model.trim_start_matches('/')))
        }
    }

    async fn wait_for(&self, operation: Operation) -> Result<Option<Value>, GcpError> {
        let mut operation = operation;
        let mut polls = 0;

        while !operation.done {
            if polls >= self.max_polls {
                return Err(GcpError::OperationTimeout(operation.name));
            }
            polls += 1;
            tokio::time::sleep(self.poll_interval).await;
            debug!(operation = %operation.name, polls, "Polling operation");
            let url = url_for_resource(&self.base_url, &operation.name)?;
            operation = self.http.get(url).await?;
        }

        if let Some(status) = operation.error {
            return Err(GcpError::OperationFailed {
                name: operation.name,
                message: status.message,
            });
        }
        Ok(operation.response)
    }

    pub async fn create_corpus(
        &self,
        display_name: &str,
        description: Option<&str>,
        embedding_model: Option<&str>,
    ) -> Result<RagCorpus, GcpError> {
        if display_name.trim().is_empty() {
            return Err(GcpError::InvalidArgument(
                "display_name must not be empty".to_string(),
            ));
        }
        let parent = self.parent()?;
        let url = url_for_resource(&self.base_url, &format!("{}/ragCorpora", parent))?;
        let model = embedding_model
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_EMBEDDING_MODEL);

        let mut body = json!({
            "displayName": display_name,
            "vectorDbConfig": {
                "ragEmbeddingModelConfig": {
                    "vertexPredictionEndpoint": { "endpoint": self.embedding_endpoint(model)? }
                }
            }
        });
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            body["description"] = json!(description);
        }

        let operation: Operation = self.http.post(url, &body).await?;
        let response = self.wait_for(operation).await?.ok_or_else(|| {
            GcpError::InvalidResponse("create corpus operation returned no corpus".to_string())
        })?;
        let corpus: RagCorpus = serde_json::from_value(response)
            .map_err(|e| GcpError::InvalidResponse(format!("invalid corpus: {}", e)))?;
        info!(corpus = %corpus.name, display_name, "Created RAG corpus");
        Ok(corpus)
    }

    pub async fn update_corpus(
        &self,
        corpus: &str,
        display_name: Option<&str>,
        description: Option<&str>,
    ) -> Result<RagCorpus, GcpError> {
        let name = self.corpus_name(corpus)?;
        let mut body = Map::new();
        if let Some(display_name) = display_name.filter(|d| !d.is_empty()) {
            body.insert("displayName".to_string(), json!(display_name));
        }
        if let Some(description) = description {
            body.insert("description".to_string(), json!(description));
        }
        if body.is_empty() {
            return Err(GcpError::InvalidArgument(
                "nothing to update: provide display_name or description".to_string(),
            ));
        }

        // The API expects the current display name even when only the description changes
        if !body.contains_key("displayName") {
            let current = self.get_corpus(&name).await?;
            if let Some(current_name) = current.display_name {
                body.insert("displayName".to_string(), json!(current_name));
            }
        }

        let url = url_for_resource(&self.base_url, &name)?;
        let operation: Operation = self.http.patch(url, &Value::Object(body)).await?;
        self.wait_for(operation).await?;
        info!(corpus = %name, "Updated RAG corpus");
        self.get_corpus(&name).await
    }

    pub async fn list_corpora(&self) -> Result<Vec<RagCorpus>, GcpError> {
        let parent = self.parent()?;
        let mut corpora = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = url_for_resource(&self.base_url, &format!("{}/ragCorpora", parent))?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            let page: CorpusPage = self.http.get(url).await?;
            corpora.extend(page.rag_corpora);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = corpora.len(), "Listed RAG corpora");
        Ok(corpora)
    }

    pub async fn get_corpus(&self, corpus: &str) -> Result<RagCorpus, GcpError> {
        let url = url_for_resource(&self.base_url, &self.corpus_name(corpus)?)?;
        self.http.get(url).await
    }

    /// Deletes the corpus together with all of its files
    pub async fn delete_corpus(&self, corpus: &str) -> Result<String, GcpError> {
        let name = self.corpus_name(corpus)?;
        let mut url = url_for_resource(&self.base_url, &name)?;
        url.query_pairs_mut().append_pair("force", "true");
        let operation: Operation = self.http.delete(url).await?;
        self.wait_for(operation).await?;
        info!(corpus = %name, "Deleted RAG corpus");
        Ok(name)
    }

    pub async fn import_files(
        &self,
        corpus: &str,
        gcs_uris: &[String],
        chunk_size: u32,
        chunk_overlap: u32,
    ) -> Result<ImportSummary, GcpError> {
        if gcs_uris.is_empty() {
            return Err(GcpError::InvalidArgument(
                "at least one gs:// URI is required".to_string(),
            ));
        }
        if let Some(bad) = gcs_uris.iter().find(|u| !u.starts_with("gs://")) {
            return Err(GcpError::InvalidArgument(format!(
                "Invalid GCS URI '{}': must start with gs://",
                bad
            )));
        }
        if chunk_overlap >= chunk_size {
            return Err(GcpError::InvalidArgument(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        let name = self.corpus_name(corpus)?;
        let url = url_for_resource(&self.base_url, &format!("{}/ragFiles:import", name))?;
        let body = json!({
            "importRagFilesConfig": {
                "gcsSource": { "uris": gcs_uris },
                "ragFileTransformationConfig": {
                    "ragFileChunkingConfig": {
                        "fixedLengthChunking": {
                            "chunkSize": chunk_size,
                            "chunkOverlap": chunk_overlap,
                        }
                    }
                }
            }
        });

        let operation: Operation = self.http.post(url, &body).await?;
        let summary = match self.wait_for(operation).await? {
            Some(response) => serde_json::from_value(response)
                .map_err(|e| GcpError::InvalidResponse(format!("invalid import result: {}", e)))?,
            None => ImportSummary::default(),
        };

        if summary.failed_rag_files_count > 0 {
            warn!(
                corpus = %name,
                failed = summary.failed_rag_files_count,
                "Some files failed to import"
            );
        }
        info!(
            corpus = %name,
            imported = summary.imported_rag_files_count,
            skipped = summary.skipped_rag_files_count,
            "Imported files into RAG corpus"
        );
        Ok(summary)
    }

    pub async fn list_files(&self, corpus: &str) -> Result<Vec<RagFile>, GcpError> {
        let name = self.corpus_name(corpus)?;
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = url_for_resource(&self.base_url, &format!("{}/ragFiles", name))?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            let page: FilePage = self.http.get(url).await?;
            files.extend(page.rag_files);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    pub async fn get_file(&self, file: &str) -> Result<RagFile, GcpError> {
        let url = url_for_resource(&self.base_url, &self.file_name(file)?)?;
        self.http.get(url).await
    }

    pub async fn delete_file(&self, file: &str) -> Result<String, GcpError> {
        let name = self.file_name(file)?;
        let url = url_for_resource(&self.base_url, &name)?;
        let operation: Operation = self.http.delete(url).await?;
        self.wait_for(operation).await?;
        info!(file = %name, "Deleted RAG file");
        Ok(name)
    }

    pub async fn retrieve_contexts(
        &self,
        corpus: &str,
        query: &str,
        top_k: u32,
        distance_threshold: f64,
    ) -> Result<Vec<RagContext>, GcpError> {
        if query.trim().is_empty() {
            return Err(GcpError::InvalidArgument("query must not be empty".to_string()));
        }
        let name = self.corpus_name(corpus)?;
        let url = url_for_resource(
            &self.base_url,
            &format!("{}:retrieveContexts", self.parent()?),
        )?;
        let body = json!({
            "vertexRagStore": {
                "ragResources": [{ "ragCorpus": name }],
                "vectorDistanceThreshold": distance_threshold,
            },
            "query": {
                "text": query,
                "ragRetrievalConfig": { "topK": top_k },
            },
        });

        let response: RetrieveResponse = self.http.post(url, &body).await?;
        debug!(
            corpus = %name,
            contexts = response.contexts.contexts.len(),
            "Retrieved contexts"
        );
        Ok(response.contexts.contexts)
    }

    /// Queries every corpus in the project and merges results by ascending distance.
    /// Corpora that fail to answer are logged and skipped.
    pub async fn search_all(&self, query: &str, top_k: u32) -> Result<SearchAllResult, GcpError> {
        let corpora = self.list_corpora().await?;
        let mut contexts = Vec::new();
        let mut searched = Vec::new();
        let mut failed = Vec::new();

        for corpus in &corpora {
            match self
                .retrieve_contexts(&corpus.name, query, top_k, DEFAULT_DISTANCE_THRESHOLD)
                .await
            {
                Ok(found) => {
                    searched.push(corpus.name.clone());
                    contexts.extend(found.into_iter().map(|mut c| {
                        c.corpus_name = Some(corpus.name.clone());
                        c
                    }));
                }
                Err(e) => {
                    warn!(corpus = %corpus.name, error = %e, "Skipping corpus that failed to answer");
                    failed.push(corpus.name.clone());
                }
            }
        }

        contexts.sort_by(|a, b| {
            let a = a.distance.unwrap_or(f64::MAX);
            let b = b.distance.unwrap_or(f64::MAX);
            a.total_cmp(&b)
        });
        contexts.truncate(top_k as usize);

        Ok(SearchAllResult {
            contexts,
            corpora_searched: searched,
            corpora_failed: failed,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchAllResult {
    pub contexts: Vec<RagContext>,
    pub corpora_searched: Vec<String>,
    pub corpora_failed: Vec<String>,
}
