//! Access tokens for Google Cloud REST calls
//!
//! A token comes from `GOOGLE_OAUTH_ACCESS_TOKEN` when set, otherwise from
//! `gcloud auth print-access-token`, which covers user credentials as well as
//! service accounts activated through gcloud.

use super::error::GcpError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// gcloud tokens live for an hour; refresh well before that
const GCLOUD_TOKEN_LIFETIME: Duration = Duration::from_secs(45 * 60);

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, GcpError>;
}

/// Fixed token, used for `GOOGLE_OAUTH_ACCESS_TOKEN` and in tests
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, GcpError> {
        Ok(self.token.clone())
    }
}

/// Shells out to gcloud and caches the token until it nears expiry
#[derive(Debug, Default)]
pub struct GcloudTokenProvider {
    cached: Mutex<Option<(String, Instant)>>,
}

impl GcloudTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch(&self) -> Result<String, GcpError> {
        debug!("Requesting access token from gcloud");

        let output = Command::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| GcpError::Auth(format!("could not run gcloud: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GcpError::Auth(format!(
                "gcloud auth print-access-token failed: {}",
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(GcpError::Auth("gcloud returned an empty token".to_string()));
        }
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for GcloudTokenProvider {
    async fn access_token(&self) -> Result<String, GcpError> {
        let mut cached = self.cached.lock().await;

        if let Some((token, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < GCLOUD_TOKEN_LIFETIME {
                return Ok(token.clone());
            }
        }

        let token = self.fetch().await?;
        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

/// Environment token when present, gcloud otherwise
pub fn default_token_provider() -> Arc<dyn TokenProvider> {
    match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            Arc::new(StaticTokenProvider::new(token.trim()))
        }
        _ => Arc::new(GcloudTokenProvider::new()),
    }
}
