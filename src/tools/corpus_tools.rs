//! Vertex AI RAG corpus tools
//!
//! Corpus arguments take either a full `projects/.../ragCorpora/{id}` name or
//! the bare id. Cloud failures come back as `{"status": "error"}` records.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::context::ToolContext;
use super::helpers::{failure, optional_str, optional_u32, required_str, string_list, success};
use super::trait_def::Tool;
use crate::gcp::rag::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_TOP_K,
};
use crate::gcp::{RagClient, RagContext, RagCorpus, RagFile};

fn corpus_record(corpus: &RagCorpus) -> Value {
    json!({
        "name": corpus.name,
        "corpus_id": corpus.corpus_id(),
        "display_name": corpus.display_name,
        "description": corpus.description,
        "create_time": corpus.create_time,
        "update_time": corpus.update_time,
    })
}

fn file_record(file: &RagFile) -> Value {
    json!({
        "name": file.name,
        "display_name": file.display_name,
        "description": file.description,
        "source_uris": file.source_uris(),
        "create_time": file.create_time,
        "update_time": file.update_time,
    })
}

fn context_record(context: &RagContext) -> Value {
    let mut record = json!({
        "source_uri": context.source_uri,
        "source_display_name": context.source_display_name,
        "text": context.text,
        "distance": context.distance,
        "score": context.score,
    });
    if let Some(ref corpus) = context.corpus_name {
        record["corpus_name"] = json!(corpus);
    }
    record
}

fn corpus_arg() -> Value {
    json!({
        "type": "string",
        "description": "Corpus resource name (projects/.../ragCorpora/ID) or just the corpus ID"
    })
}

fn file_arg() -> Value {
    json!({
        "type": "string",
        "description": "Full RAG file resource name (projects/.../ragCorpora/ID/ragFiles/FILE_ID)"
    })
}

fn optional_f64(args: &Value, key: &str, default: f64) -> Result<f64> {
    match &args[key] {
        Value::Null => Ok(default),
        value => value
            .as_f64()
            .ok_or_else(|| anyhow!("'{}' must be a number", key)),
    }
}

pub struct CreateCorpusTool {
    rag: RagClient,
}

impl CreateCorpusTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for CreateCorpusTool {
    fn name(&self) -> &'static str {
        "create_corpus"
    }

    fn description(&self) -> &'static str {
        "Create a new Vertex AI RAG corpus"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "display_name": {
                    "type": "string",
                    "description": "Human readable corpus name"
                },
                "description": {
                    "type": "string",
                    "description": "What the corpus contains"
                },
                "embedding_model": {
                    "type": "string",
                    "description": "Embedding model (default: publishers/google/models/text-embedding-005)"
                }
            },
            "required": ["display_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let display_name = required_str(&args, "display_name")?;

        Ok(
            match self
                .rag
                .create_corpus(
                    display_name,
                    optional_str(&args, "description"),
                    optional_str(&args, "embedding_model"),
                )
                .await
            {
                Ok(corpus) => success(json!({
                    "message": format!("Corpus '{}' created.", display_name),
                    "corpus": corpus_record(&corpus),
                })),
                Err(e) => failure(self.name(), e),
            },
        )
    }
}

pub struct UpdateCorpusTool {
    rag: RagClient,
}

impl UpdateCorpusTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for UpdateCorpusTool {
    fn name(&self) -> &'static str {
        "update_corpus"
    }

    fn description(&self) -> &'static str {
        "Change the display name or description of a RAG corpus"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "corpus_name": corpus_arg(),
                "display_name": {
                    "type": "string",
                    "description": "New display name"
                },
                "description": {
                    "type": "string",
                    "description": "New description"
                }
            },
            "required": ["corpus_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let corpus_name = required_str(&args, "corpus_name")?;

        Ok(
            match self
                .rag
                .update_corpus(
                    corpus_name,
                    optional_str(&args, "display_name"),
                    args["description"].as_str(),
                )
                .await
            {
                Ok(corpus) => success(json!({ "corpus": corpus_record(&corpus) })),
                Err(e) => failure(self.name(), e),
            },
        )
    }
}

pub struct ListCorporaTool {
    rag: RagClient,
}

impl ListCorporaTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for ListCorporaTool {
    fn name(&self) -> &'static str {
        "list_corpora"
    }

    fn description(&self) -> &'static str {
        "List all RAG corpora in the configured project and region"
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        Ok(match self.rag.list_corpora().await {
            Ok(corpora) => success(json!({
                "count": corpora.len(),
                "corpora": corpora.iter().map(corpus_record).collect::<Vec<_>>(),
            })),
            Err(e) => failure(self.name(), e),
        })
    }
}

pub struct GetCorpusTool {
    rag: RagClient,
}

impl GetCorpusTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for GetCorpusTool {
    fn name(&self) -> &'static str {
        "get_corpus"
    }

    fn description(&self) -> &'static str {
        "Get the details of one RAG corpus"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "corpus_name": corpus_arg() },
            "required": ["corpus_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let corpus_name = required_str(&args, "corpus_name")?;

        Ok(match self.rag.get_corpus(corpus_name).await {
            Ok(corpus) => success(json!({ "corpus": corpus_record(&corpus) })),
            Err(e) => failure(self.name(), e),
        })
    }
}

pub struct DeleteCorpusTool {
    rag: RagClient,
}

impl DeleteCorpusTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for DeleteCorpusTool {
    fn name(&self) -> &'static str {
        "delete_corpus"
    }

    fn description(&self) -> &'static str {
        "Delete a RAG corpus and every file in it"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "corpus_name": corpus_arg() },
            "required": ["corpus_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let corpus_name = required_str(&args, "corpus_name")?;

        Ok(match self.rag.delete_corpus(corpus_name).await {
            Ok(name) => success(json!({
                "message": format!("Corpus {} deleted.", name),
                "corpus_name": name,
            })),
            Err(e) => failure(self.name(), e),
        })
    }
}

pub struct ImportDocumentTool {
    rag: RagClient,
}

impl ImportDocumentTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for ImportDocumentTool {
    fn name(&self) -> &'static str {
        "import_document"
    }

    fn description(&self) -> &'static str {
        "Import documents from Cloud Storage into a RAG corpus, chunking them for retrieval"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "corpus_name": corpus_arg(),
                "gcs_uris": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "gs:// URIs of files or folders to import"
                },
                "chunk_size": {
                    "type": "integer",
                    "description": "Chunk size in tokens (default: 512)"
                },
                "chunk_overlap": {
                    "type": "integer",
                    "description": "Overlap between chunks in tokens (default: 100)"
                }
            },
            "required": ["corpus_name", "gcs_uris"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let corpus_name = required_str(&args, "corpus_name")?;
        let gcs_uris = string_list(&args, "gcs_uris")?;
        let chunk_size = optional_u32(&args, "chunk_size", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = optional_u32(&args, "chunk_overlap", DEFAULT_CHUNK_OVERLAP)?;

        Ok(
            match self
                .rag
                .import_files(corpus_name, &gcs_uris, chunk_size, chunk_overlap)
                .await
            {
                Ok(summary) => success(json!({
                    "message": format!(
                        "Imported {} file(s) into {}.",
                        summary.imported_rag_files_count, corpus_name
                    ),
                    "imported_count": summary.imported_rag_files_count,
                    "failed_count": summary.failed_rag_files_count,
                    "skipped_count": summary.skipped_rag_files_count,
                })),
                Err(e) => failure(self.name(), e),
            },
        )
    }
}

pub struct ListFilesTool {
    rag: RagClient,
}

impl ListFilesTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn description(&self) -> &'static str {
        "List the files imported into a RAG corpus"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "corpus_name": corpus_arg() },
            "required": ["corpus_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let corpus_name = required_str(&args, "corpus_name")?;

        Ok(match self.rag.list_files(corpus_name).await {
            Ok(files) => success(json!({
                "count": files.len(),
                "files": files.iter().map(file_record).collect::<Vec<_>>(),
            })),
            Err(e) => failure(self.name(), e),
        })
    }
}

pub struct GetFileTool {
    rag: RagClient,
}

impl GetFileTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for GetFileTool {
    fn name(&self) -> &'static str {
        "get_file"
    }

    fn description(&self) -> &'static str {
        "Get the details of one file in a RAG corpus"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "file_name": file_arg() },
            "required": ["file_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let file_name = required_str(&args, "file_name")?;

        Ok(match self.rag.get_file(file_name).await {
            Ok(file) => success(json!({ "file": file_record(&file) })),
            Err(e) => failure(self.name(), e),
        })
    }
}

pub struct DeleteFileTool {
    rag: RagClient,
}

impl DeleteFileTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &'static str {
        "delete_file"
    }

    fn description(&self) -> &'static str {
        "Remove one file from a RAG corpus"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "file_name": file_arg() },
            "required": ["file_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let file_name = required_str(&args, "file_name")?;

        Ok(match self.rag.delete_file(file_name).await {
            Ok(name) => success(json!({
                "message": format!("File {} deleted.", name),
                "file_name": name,
            })),
            Err(e) => failure(self.name(), e),
        })
    }
}

pub struct QueryCorpusTool {
    rag: RagClient,
}

impl QueryCorpusTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for QueryCorpusTool {
    fn name(&self) -> &'static str {
        "query_rag_corpus"
    }

    fn description(&self) -> &'static str {
        "Retrieve the passages of one RAG corpus most relevant to a query"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "corpus_name": corpus_arg(),
                "query": {
                    "type": "string",
                    "description": "Natural language query"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum number of passages (default: 10)"
                },
                "distance_threshold": {
                    "type": "number",
                    "description": "Only return passages closer than this vector distance (default: 0.5)"
                }
            },
            "required": ["corpus_name", "query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let corpus_name = required_str(&args, "corpus_name")?;
        let query = required_str(&args, "query")?;
        let top_k = optional_u32(&args, "top_k", DEFAULT_TOP_K)?;
        let threshold = optional_f64(&args, "distance_threshold", DEFAULT_DISTANCE_THRESHOLD)?;

        Ok(
            match self
                .rag
                .retrieve_contexts(corpus_name, query, top_k, threshold)
                .await
            {
                Ok(contexts) => success(json!({
                    "query": query,
                    "count": contexts.len(),
                    "results": contexts.iter().map(context_record).collect::<Vec<_>>(),
                })),
                Err(e) => failure(self.name(), e),
            },
        )
    }
}

pub struct SearchAllCorporaTool {
    rag: RagClient,
}

impl SearchAllCorporaTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            rag: context.clients.rag.clone(),
        }
    }
}

#[async_trait]
impl Tool for SearchAllCorporaTool {
    fn name(&self) -> &'static str {
        "search_all_corpora"
    }

    fn description(&self) -> &'static str {
        "Query every RAG corpus and merge the closest passages"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language query"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum number of passages overall (default: 10)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = required_str(&args, "query")?;
        let top_k = optional_u32(&args, "top_k", DEFAULT_TOP_K)?;

        Ok(match self.rag.search_all(query, top_k).await {
            Ok(found) => success(json!({
                "query": query,
                "count": found.contexts.len(),
                "corpora_searched": found.corpora_searched,
                "corpora_failed": found.corpora_failed,
                "results": found.contexts.iter().map(context_record).collect::<Vec<_>>(),
            })),
            Err(e) => failure(self.name(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::context::test_support;
    use mockito::Matcher;
    use tempfile::TempDir;

    const PARENT: &str = "/v1/projects/acme-prj/locations/us-central1";

    #[tokio::test]
    async fn test_create_corpus_waits_for_operation() {
        let mut server = mockito::Server::new_async().await;
        let temp = TempDir::new().unwrap();
        server
            .mock("POST", format!("{}/ragCorpora", PARENT).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "name": "projects/acme-prj/locations/us-central1/operations/op1",
                    "done": true,
                    "response": {
                        "name": "projects/acme-prj/locations/us-central1/ragCorpora/123",
                        "displayName": "RFPs"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tool = CreateCorpusTool::new(&test_support::context(&server.url(), temp.path()));
        let result = tool.execute(json!({"display_name": "RFPs"})).await.unwrap();

        assert_eq!(result["status"], "success");
        assert_eq!(result["corpus"]["corpus_id"], "123");
    }

    #[tokio::test]
    async fn test_import_document_reports_counts() {
        let mut server = mockito::Server::new_async().await;
        let temp = TempDir::new().unwrap();
        let mock = server
            .mock("POST", format!("{}/ragCorpora/123/ragFiles:import", PARENT).as_str())
            .match_body(Matcher::PartialJson(json!({
                "importRagFilesConfig": {
                    "gcsSource": { "uris": ["gs://ur-docs/rfp.pdf"] }
                }
            })))
            .with_status(200)
            .with_body(
                json!({
                    "name": "projects/acme-prj/locations/us-central1/operations/op2",
                    "done": true,
                    "response": { "importedRagFilesCount": "1" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tool = ImportDocumentTool::new(&test_support::context(&server.url(), temp.path()));
        let result = tool
            .execute(json!({"corpus_name": "123", "gcs_uris": ["gs://ur-docs/rfp.pdf"]}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result["status"], "success");
        assert_eq!(result["imported_count"], 1);
        assert_eq!(result["failed_count"], 0);
    }

    #[tokio::test]
    async fn test_import_document_rejects_bad_overlap() {
        let server = mockito::Server::new_async().await;
        let temp = TempDir::new().unwrap();
        let tool = ImportDocumentTool::new(&test_support::context(&server.url(), temp.path()));

        let result = tool
            .execute(json!({
                "corpus_name": "123",
                "gcs_uris": "gs://ur-docs/rfp.pdf",
                "chunk_size": 100,
                "chunk_overlap": 100
            }))
            .await
            .unwrap();
        assert_eq!(result["status"], "error");
        assert!(result["error_message"]
            .as_str()
            .unwrap()
            .contains("chunk_overlap"));
    }

    #[tokio::test]
    async fn test_get_file_requires_resource_name() {
        let server = mockito::Server::new_async().await;
        let temp = TempDir::new().unwrap();
        let tool = GetFileTool::new(&test_support::context(&server.url(), temp.path()));

        let result = tool.execute(json!({"file_name": "456"})).await.unwrap();
        assert_eq!(result["status"], "error");
    }

    #[tokio::test]
    async fn test_query_rag_corpus() {
        let mut server = mockito::Server::new_async().await;
        let temp = TempDir::new().unwrap();
        server
            .mock("POST", format!("{}:retrieveContexts", PARENT).as_str())
            .match_body(Matcher::PartialJson(json!({
                "query": { "text": "login", "ragRetrievalConfig": { "topK": 3 } }
            })))
            .with_status(200)
            .with_body(
                json!({"contexts": {"contexts": [
                    {"sourceUri": "gs://ur-docs/rfp.pdf", "text": "Users log in with SSO", "distance": 0.2}
                ]}})
                .to_string(),
            )
            .create_async()
            .await;

        let tool = QueryCorpusTool::new(&test_support::context(&server.url(), temp.path()));
        let result = tool
            .execute(json!({"corpus_name": "123", "query": "login", "top_k": 3}))
            .await
            .unwrap();

        assert_eq!(result["count"], 1);
        assert_eq!(result["results"][0]["text"], "Users log in with SSO");
        assert!(result["results"][0].get("corpus_name").is_none());
    }

    #[tokio::test]
    async fn test_list_corpora_api_error() {
        let mut server = mockito::Server::new_async().await;
        let temp = TempDir::new().unwrap();
        server
            .mock("GET", format!("{}/ragCorpora", PARENT).as_str())
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#)
            .create_async()
            .await;

        let tool = ListCorporaTool::new(&test_support::context(&server.url(), temp.path()));
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["status"], "error");
        assert!(result["error_message"]
            .as_str()
            .unwrap()
            .contains("Permission denied"));
    }
}
