//! Authenticated JSON transport shared by the storage, Document AI and RAG clients

use super::auth::TokenProvider;
use super::error::GcpError;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct GcpHttp {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl GcpHttp {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self, GcpError> {
        Self::with_timeout(tokens, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(tokens: Arc<dyn TokenProvider>, timeout: Duration) -> Result<Self, GcpError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, tokens })
    }

    pub async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, GcpError> {
        let token = self.tokens.access_token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    /// Sends a request and returns the raw body of a successful response
    pub async fn send_raw(&self, builder: RequestBuilder) -> Result<Vec<u8>, GcpError> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        let start = Instant::now();

        debug!(%method, %url, "Sending Google Cloud request");

        let response = self.client.execute(request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%method, %url, status = status.as_u16(), "Google Cloud request failed");
            return Err(GcpError::from_response_body(status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        debug!(
            %method,
            %url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis(),
            bytes = bytes.len(),
            "Google Cloud request completed"
        );
        Ok(bytes.to_vec())
    }

    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GcpError> {
        let body = self.send_raw(builder).await?;
        // DELETE endpoints answer with an empty body
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &body
        };
        serde_json::from_slice(body).map_err(|e| {
            GcpError::InvalidResponse(format!("failed to decode response body: {}", e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, GcpError> {
        let builder = self.request(Method::GET, url).await?;
        self.send_json(builder).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, GcpError> {
        let builder = self.request(Method::POST, url).await?.json(body);
        self.send_json(builder).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, GcpError> {
        let builder = self.request(Method::PATCH, url).await?.json(body);
        self.send_json(builder).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, GcpError> {
        let builder = self.request(Method::DELETE, url).await?;
        self.send_json(builder).await
    }
}

impl std::fmt::Debug for GcpHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpHttp").finish_non_exhaustive()
    }
}

/// Appends percent-encoded path segments to a base URL
pub fn url_with_segments(base: &str, segments: &[&str]) -> Result<Url, GcpError> {
    let mut url = Url::parse(base)
        .map_err(|e| GcpError::InvalidArgument(format!("invalid endpoint {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| GcpError::InvalidArgument(format!("endpoint {} cannot be a base", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Joins a base URL with a `v1` resource path whose slashes are real separators
pub fn url_for_resource(base: &str, resource_path: &str) -> Result<Url, GcpError> {
    let joined = format!(
        "{}/v1/{}",
        base.trim_end_matches('/'),
        resource_path.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map_err(|e| GcpError::InvalidArgument(format!("invalid resource url {}: {}", joined, e)))
}
