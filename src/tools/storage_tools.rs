//! Cloud Storage tools: buckets, uploads and listings

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

use super::context::ToolContext;
use super::helpers::{failure, optional_str, optional_u32, required_str, success};
use super::trait_def::Tool;
use crate::config::{
    GCS_DEFAULT_CONTENT_TYPE, GCS_DEFAULT_LOCATION, GCS_DEFAULT_STORAGE_CLASS,
    GCS_LIST_BLOBS_MAX_RESULTS, GCS_LIST_BUCKETS_MAX_RESULTS,
};
use crate::gcp::{Bucket, StorageClient, StorageObject};

const CONTENT_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
];

/// Content type for a file name, falling back to PDF
pub fn content_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .and_then(|ext| {
            CONTENT_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(GCS_DEFAULT_CONTENT_TYPE)
}

fn bucket_record(bucket: &Bucket) -> Value {
    json!({
        "name": bucket.name,
        "location": bucket.location,
        "storage_class": bucket.storage_class,
        "location_type": bucket.location_type,
        "time_created": bucket.time_created,
        "updated": bucket.updated,
    })
}

fn blob_record(object: &StorageObject) -> Value {
    json!({
        "name": object.name,
        "gcs_uri": object.gcs_uri(),
        "size_bytes": object.size_bytes(),
        "content_type": object.content_type,
        "updated": object.updated,
    })
}

pub struct CreateBucketTool {
    storage: StorageClient,
}

impl CreateBucketTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            storage: context.clients.storage.clone(),
        }
    }
}

#[async_trait]
impl Tool for CreateBucketTool {
    fn name(&self) -> &'static str {
        "create_bucket"
    }

    fn description(&self) -> &'static str {
        "Create a new Cloud Storage bucket"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "bucket_name": {
                    "type": "string",
                    "description": "Globally unique bucket name (3-63 chars, lowercase letters, digits, '-', '_' and '.')"
                },
                "location": {
                    "type": "string",
                    "description": "Bucket location (default: US)"
                },
                "storage_class": {
                    "type": "string",
                    "description": "Storage class such as STANDARD, NEARLINE, COLDLINE or ARCHIVE (default: STANDARD)"
                },
                "project_id": {
                    "type": "string",
                    "description": "Project to create the bucket in (default: the configured project)"
                }
            },
            "required": ["bucket_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let bucket_name = required_str(&args, "bucket_name")?;
        let location = optional_str(&args, "location").unwrap_or(GCS_DEFAULT_LOCATION);
        let storage_class =
            optional_str(&args, "storage_class").unwrap_or(GCS_DEFAULT_STORAGE_CLASS);

        debug!(bucket_name, location, storage_class, "create_bucket parameters");

        Ok(
            match self
                .storage
                .create_bucket(
                    bucket_name,
                    location,
                    storage_class,
                    optional_str(&args, "project_id"),
                )
                .await
            {
                Ok(bucket) => success(json!({
                    "message": format!("Bucket {} created successfully.", bucket.name),
                    "bucket": bucket_record(&bucket),
                })),
                Err(e) => failure(self.name(), e),
            },
        )
    }
}

pub struct ListBucketsTool {
    storage: StorageClient,
}

impl ListBucketsTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            storage: context.clients.storage.clone(),
        }
    }
}

#[async_trait]
impl Tool for ListBucketsTool {
    fn name(&self) -> &'static str {
        "list_buckets"
    }

    fn description(&self) -> &'static str {
        "List Cloud Storage buckets in a project"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {
                    "type": "string",
                    "description": "Project to list (default: the configured project)"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of buckets to return (default: 50)"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let max_results = optional_u32(&args, "max_results", GCS_LIST_BUCKETS_MAX_RESULTS)?;

        Ok(
            match self
                .storage
                .list_buckets(optional_str(&args, "project_id"), max_results)
                .await
            {
                Ok(buckets) => success(json!({
                    "count": buckets.len(),
                    "buckets": buckets.iter().map(bucket_record).collect::<Vec<_>>(),
                })),
                Err(e) => failure(self.name(), e),
            },
        )
    }
}

pub struct GetBucketDetailsTool {
    storage: StorageClient,
}

impl GetBucketDetailsTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            storage: context.clients.storage.clone(),
        }
    }
}

#[async_trait]
impl Tool for GetBucketDetailsTool {
    fn name(&self) -> &'static str {
        "get_bucket_details"
    }

    fn description(&self) -> &'static str {
        "Get the location, storage class and timestamps of a Cloud Storage bucket"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "bucket_name": {
                    "type": "string",
                    "description": "Name of the bucket"
                }
            },
            "required": ["bucket_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let bucket_name = required_str(&args, "bucket_name")?;

        Ok(match self.storage.get_bucket(bucket_name).await {
            Ok(bucket) => success(json!({ "bucket": bucket_record(&bucket) })),
            Err(e) if e.is_not_found() => {
                failure(self.name(), format!("Bucket {} not found.", bucket_name))
            }
            Err(e) => failure(self.name(), e),
        })
    }
}

pub struct UploadFileTool {
    storage: StorageClient,
}

impl UploadFileTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            storage: context.clients.storage.clone(),
        }
    }
}

#[async_trait]
impl Tool for UploadFileTool {
    fn name(&self) -> &'static str {
        "upload_file_gcs"
    }

    fn description(&self) -> &'static str {
        "Upload a local file to a Cloud Storage bucket and return its gs:// URI"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "bucket_name": {
                    "type": "string",
                    "description": "Destination bucket"
                },
                "file_path": {
                    "type": "string",
                    "description": "Path of the local file to upload"
                },
                "destination_blob_name": {
                    "type": "string",
                    "description": "Object name in the bucket (default: the file name)"
                },
                "content_type": {
                    "type": "string",
                    "description": "MIME type (default: guessed from the extension, else application/pdf)"
                }
            },
            "required": ["bucket_name", "file_path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let bucket_name = required_str(&args, "bucket_name")?;
        let file_path = Path::new(required_str(&args, "file_path")?);

        if !file_path.is_file() {
            return Ok(failure(
                self.name(),
                format!("File not found: {}", file_path.display()),
            ));
        }

        let blob_name = match optional_str(&args, "destination_blob_name") {
            Some(name) => name.to_string(),
            None => match file_path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => {
                    return Ok(failure(
                        self.name(),
                        format!("Cannot derive an object name from {}", file_path.display()),
                    ))
                }
            },
        };
        let content_type =
            optional_str(&args, "content_type").unwrap_or_else(|| content_type_for(file_path));

        let data = match tokio::fs::read(file_path).await {
            Ok(data) => data,
            Err(e) => return Ok(failure(self.name(), e)),
        };
        let size = data.len();

        Ok(
            match self
                .storage
                .upload_object(bucket_name, &blob_name, data, content_type)
                .await
            {
                Ok(object) => success(json!({
                    "message": format!("File uploaded to {}", object.gcs_uri()),
                    "gcs_uri": object.gcs_uri(),
                    "bucket": object.bucket,
                    "blob_name": object.name,
                    "size_bytes": object.size_bytes().unwrap_or(size as u64),
                    "content_type": content_type,
                })),
                Err(e) => failure(self.name(), e),
            },
        )
    }
}

pub struct ListBlobsTool {
    storage: StorageClient,
}

impl ListBlobsTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            storage: context.clients.storage.clone(),
        }
    }
}

#[async_trait]
impl Tool for ListBlobsTool {
    fn name(&self) -> &'static str {
        "list_blobs"
    }

    fn description(&self) -> &'static str {
        "List objects in a Cloud Storage bucket, optionally filtered by prefix"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "bucket_name": {
                    "type": "string",
                    "description": "Bucket to list"
                },
                "prefix": {
                    "type": "string",
                    "description": "Only return objects whose names start with this prefix"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of objects to return (default: 100)"
                }
            },
            "required": ["bucket_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let bucket_name = required_str(&args, "bucket_name")?;
        let prefix = optional_str(&args, "prefix");
        let max_results = optional_u32(&args, "max_results", GCS_LIST_BLOBS_MAX_RESULTS)?;

        Ok(
            match self
                .storage
                .list_objects(bucket_name, prefix, max_results)
                .await
            {
                Ok(objects) => success(json!({
                    "bucket": bucket_name,
                    "prefix": prefix,
                    "count": objects.len(),
                    "blobs": objects.iter().map(blob_record).collect::<Vec<_>>(),
                })),
                Err(e) => failure(self.name(), e),
            },
        )
    }
}
