//! Cloud Storage JSON API wrapper
//!
//! Covers the bucket and object calls the agent exposes as tools plus the
//! download/upload pair used by preprocessing.

use super::error::GcpError;
use super::http::{url_with_segments, GcpHttp};
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::Ipv4Addr;
use std::sync::OnceLock;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub storage_class: Option<String>,
    #[serde(default)]
    pub time_created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    pub name: String,
    pub bucket: String,
    /// The JSON API reports sizes as decimal strings
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

impl StorageObject {
    pub fn gcs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn bucket_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9._-]*[a-z0-9]$").expect("bucket name pattern is valid")
    })
}

/// Checks a bucket name against the Cloud Storage naming rules
pub fn validate_bucket_name(name: &str) -> Result<(), GcpError> {
    let invalid = |reason: &str| {
        Err(GcpError::InvalidArgument(format!(
            "Invalid bucket name '{}': {}",
            name, reason
        )))
    };

    let max_len = if name.contains('.') { 222 } else { 63 };
    if name.len() < 3 || name.len() > max_len {
        return invalid(&format!("must be between 3 and {} characters", max_len));
    }
    if !bucket_name_pattern().is_match(name) {
        return invalid(
            "use lowercase letters, digits, dashes, underscores and dots, starting and ending with a letter or digit",
        );
    }
    if name.starts_with("goog") || name.contains("google") {
        return invalid("names cannot start with 'goog' or contain 'google'");
    }
    if name.contains("..") {
        return invalid("names cannot contain consecutive dots");
    }
    if name.split('.').any(|part| part.len() > 63) {
        return invalid("each dot-separated part must be at most 63 characters");
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return invalid("names cannot be represented as an IP address");
    }
    Ok(())
}

/// Splits `gs://bucket/path/to/object` into bucket and object name
pub fn parse_gcs_uri(uri: &str) -> Result<(String, String), GcpError> {
    let rest = uri.strip_prefix("gs://").ok_or_else(|| {
        GcpError::InvalidArgument(format!("Invalid GCS URI '{}': must start with gs://", uri))
    })?;
    match rest.split_once('/') {
        Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => {
            Ok((bucket.to_string(), object.to_string()))
        }
        _ => Err(GcpError::InvalidArgument(format!(
            "Invalid GCS URI '{}': expected gs://bucket/object",
            uri
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct StorageClient {
    http: GcpHttp,
    base_url: String,
    project_id: Option<String>,
}

impl StorageClient {
    pub fn new(http: GcpHttp, base_url: impl Into<String>, project_id: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            project_id,
        }
    }

    fn project<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str, GcpError> {
        explicit
            .filter(|p| !p.is_empty())
            .or(self.project_id.as_deref())
            .ok_or_else(|| {
                GcpError::InvalidArgument(
                    "No project id given and GOOGLE_CLOUD_PROJECT is not set".to_string(),
                )
            })
    }

    pub async fn create_bucket(
        &self,
        name: &str,
        location: &str,
        storage_class: &str,
        project_id: Option<&str>,
    ) -> Result<Bucket, GcpError> {
        validate_bucket_name(name)?;
        let project = self.project(project_id)?;

        let mut url = url_with_segments(&self.base_url, &["storage", "v1", "b"])?;
        url.query_pairs_mut().append_pair("project", project);

        let body = json!({
            "name": name,
            "location": location,
            "storageClass": storage_class,
        });

        let bucket: Bucket = self.http.post(url, &body).await?;
        info!(bucket = %bucket.name, location, storage_class, "Created bucket");
        Ok(bucket)
    }

    /// Lists buckets in the project, following page tokens until `max_results` is reached
    pub async fn list_buckets(
        &self,
        project_id: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<Bucket>, GcpError> {
        let project = self.project(project_id)?;
        let mut buckets = Vec::new();
        if max_results == 0 {
            return Ok(buckets);
        }
        let mut page_token: Option<String> = None;

        loop {
            let mut url = url_with_segments(&self.base_url, &["storage", "v1", "b"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("project", project);
                query.append_pair(
                    "maxResults",
                    &(max_results as usize - buckets.len()).to_string(),
                );
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: ListPage<Bucket> = self.http.get(url).await?;
            buckets.extend(page.items);

            match page.next_page_token {
                Some(token) if buckets.len() < max_results as usize => page_token = Some(token),
                _ => break,
            }
        }

        buckets.truncate(max_results as usize);
        debug!(count = buckets.len(), "Listed buckets");
        Ok(buckets)
    }

    pub async fn get_bucket(&self, name: &str) -> Result<Bucket, GcpError> {
        let url = url_with_segments(&self.base_url, &["storage", "v1", "b", name])?;
        self.http.get(url).await
    }

    pub async fn upload_object(
        &self,
        bucket: &str,
        object_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StorageObject, GcpError> {
        let mut url = url_with_segments(
            &self.base_url,
            &["upload", "storage", "v1", "b", bucket, "o"],
        )?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object_name);

        let size = data.len();
        let builder = self
            .http
            .request(Method::POST, url)
            .await?
            .header(CONTENT_TYPE, content_type)
            .body(data);

        let object: StorageObject = self.http.send_json(builder).await?;
        info!(uri = %object.gcs_uri(), bytes = size, content_type, "Uploaded object");
        Ok(object)
    }

    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<StorageObject>, GcpError> {
        let mut objects = Vec::new();
        if max_results == 0 {
            return Ok(objects);
        }
        let mut page_token: Option<String> = None;

        loop {
            let mut url = url_with_segments(&self.base_url, &["storage", "v1", "b", bucket, "o"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair(
                    "maxResults",
                    &(max_results as usize - objects.len()).to_string(),
                );
                if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                    query.append_pair("prefix", prefix);
                }
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: ListPage<StorageObject> = self.http.get(url).await?;
            objects.extend(page.items);

            match page.next_page_token {
                Some(token) if objects.len() < max_results as usize => page_token = Some(token),
                _ => break,
            }
        }

        objects.truncate(max_results as usize);
        debug!(bucket, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    /// Object media, or only its first `max_bytes` bytes when a limit is given
    pub async fn download_object(
        &self,
        bucket: &str,
        object_name: &str,
        max_bytes: Option<u64>,
    ) -> Result<Vec<u8>, GcpError> {
        let mut url =
            url_with_segments(&self.base_url, &["storage", "v1", "b", bucket, "o", object_name])?;
        url.query_pairs_mut().append_pair("alt", "media");

        let mut builder = self.http.request(Method::GET, url).await?;
        if let Some(limit) = max_bytes {
            if limit == 0 {
                return Ok(Vec::new());
            }
            builder = builder.header(RANGE, format!("bytes=0-{}", limit - 1));
        }

        let mut data = self.http.send_raw(builder).await?;
        if let Some(limit) = max_bytes {
            // Servers that ignore Range answer with the whole object
            data.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::auth::StaticTokenProvider;
    use mockito::Matcher;
    use std::sync::Arc;
    use yare::parameterized;

    fn client(server: &mockito::ServerGuard) -> StorageClient {
        let http = GcpHttp::new(Arc::new(StaticTokenProvider::new("test-token"))).unwrap();
        StorageClient::new(http, server.url(), Some("acme-prj".to_string()))
    }

    #[parameterized(
        simple = { "ur-docs" },
        digits = { "123" },
        dotted = { "docs.example.com" },
        underscores = { "my_bucket_01" },
    )]
    fn test_valid_bucket_names(name: &str) {
        assert!(validate_bucket_name(name).is_ok());
    }

    #[parameterized(
        too_short = { "ab" },
        uppercase = { "MyBucket" },
        leading_dash = { "-docs" },
        goog_prefix = { "goog-docs" },
        double_dot = { "docs..bucket" },
        space = { "my bucket" },
        ip_address = { "192.168.5.4" },
        long_dotted_part = { "docs.aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa.example" },
    )]
    fn test_invalid_bucket_names(name: &str) {
        assert!(validate_bucket_name(name).is_err());
    }

    #[test]
    fn test_parse_gcs_uri() {
        assert_eq!(
            parse_gcs_uri("gs://docs/rfp/v2.pdf").unwrap(),
            ("docs".to_string(), "rfp/v2.pdf".to_string())
        );
        assert!(parse_gcs_uri("s3://docs/rfp.pdf").is_err());
        assert!(parse_gcs_uri("gs://docs").is_err());
        assert!(parse_gcs_uri("gs:///rfp.pdf").is_err());
    }

    #[tokio::test]
    async fn test_create_bucket_sends_project_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/storage/v1/b")
            .match_query(Matcher::UrlEncoded("project".into(), "acme-prj".into()))
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::PartialJson(json!({
                "name": "ur-docs",
                "location": "US",
                "storageClass": "STANDARD"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"ur-docs","location":"US","storageClass":"STANDARD"}"#)
            .create_async()
            .await;

        let bucket = client(&server)
            .create_bucket("ur-docs", "US", "STANDARD", None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bucket.name, "ur-docs");
        assert_eq!(bucket.storage_class.as_deref(), Some("STANDARD"));
    }

    #[tokio::test]
    async fn test_list_buckets_follows_page_tokens() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/storage/v1/b")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("project".into(), "acme-prj".into()),
                Matcher::UrlEncoded("maxResults".into(), "50".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items":[{"name":"a-bucket"}],"nextPageToken":"tok2"}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/storage/v1/b")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("maxResults".into(), "49".into()),
                Matcher::UrlEncoded("pageToken".into(), "tok2".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items":[{"name":"b-bucket"}]}"#)
            .create_async()
            .await;

        let buckets = client(&server).list_buckets(None, 50).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let names: Vec<_> = buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["a-bucket", "b-bucket"]);
    }

    #[tokio::test]
    async fn test_get_bucket_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/storage/v1/b/missing-bucket")
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"The specified bucket does not exist.","status":"NOT_FOUND"}}"#)
            .create_async()
            .await;

        let err = client(&server).get_bucket("missing-bucket").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_upload_object_uses_media_upload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/storage/v1/b/ur-docs/o")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "media".into()),
                Matcher::UrlEncoded("name".into(), "rfp/v1.pdf".into()),
            ]))
            .match_header("content-type", "application/pdf")
            .match_body("%PDF-1.7")
            .with_status(200)
            .with_body(r#"{"name":"rfp/v1.pdf","bucket":"ur-docs","size":"8","contentType":"application/pdf"}"#)
            .create_async()
            .await;

        let object = client(&server)
            .upload_object("ur-docs", "rfp/v1.pdf", b"%PDF-1.7".to_vec(), "application/pdf")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(object.gcs_uri(), "gs://ur-docs/rfp/v1.pdf");
        assert_eq!(object.size_bytes(), Some(8));
    }

    #[tokio::test]
    async fn test_list_objects_with_prefix() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/storage/v1/b/ur-docs/o")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("prefix".into(), "minutes/".into()),
                Matcher::UrlEncoded("maxResults".into(), "100".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items":[{"name":"minutes/mom-01.pdf","bucket":"ur-docs","size":"1024"}]}"#)
            .create_async()
            .await;

        let objects = client(&server)
            .list_objects("ur-docs", Some("minutes/"), 100)
            .await
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, "minutes/mom-01.pdf");
    }

    #[tokio::test]
    async fn test_empty_bucket_lists_no_objects() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/storage/v1/b/empty-bucket/o")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"kind":"storage#objects"}"#)
            .create_async()
            .await;

        let objects = client(&server)
            .list_objects("empty-bucket", None, 100)
            .await
            .unwrap();
        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn test_download_object_encodes_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/storage/v1/b/ur-docs/o/rfp%2Fv1.pdf")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body("raw bytes")
            .create_async()
            .await;

        let data = client(&server)
            .download_object("ur-docs", "rfp/v1.pdf", None)
            .await
            .unwrap();
        assert_eq!(data, b"raw bytes");
    }

    #[tokio::test]
    async fn test_download_object_head_sends_range() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/storage/v1/b/ur-docs/o/rfp.pdf")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .match_header("range", "bytes=0-3")
            .with_status(206)
            .with_body("%PDF-1.7 and the rest of the file")
            .create_async()
            .await;

        let data = client(&server)
            .download_object("ur-docs", "rfp.pdf", Some(4))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(data, b"%PDF");
    }
}
