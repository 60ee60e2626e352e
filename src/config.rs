//! Configuration management for uragent
//!
//! Settings are loaded from environment variables with fallback defaults, so the
//! same binary works in a Cloud Shell, a CI job or a developer laptop.
//!
//! # Environment Variables
//!
//! ## Google Cloud
//! - `GOOGLE_CLOUD_PROJECT`: project that owns buckets, processors and corpora
//! - `GOOGLE_CLOUD_LOCATION`: Vertex AI region - default: "us-central1"
//! - `DOCUMENT_AI_PROCESSOR_ID`: OCR processor used by `extract_information`
//! - `DOCUMENT_AI_LOCATION`: processor location - default: "us"
//! - `GOOGLE_OAUTH_ACCESS_TOKEN`: bearer token; when unset `gcloud` is asked for one
//!
//! ## Agent
//! - `UR_AGENT_PROVIDER`: LLM provider (gemini|openai|anthropic|ollama|...) - default: "gemini"
//! - `UR_AGENT_MODEL`: model name - default: "gemini-2.5-pro-preview-05-06"
//! - `UR_AGENT_REQUEST_TIMEOUT`: LLM timeout in seconds - default: "120"
//! - `UR_AGENT_MAX_ITERATIONS`: tool rounds per user turn - default: "25"
//! - `UR_AGENT_LOG_LEVEL`: logging level - default: "info"
//! - `UR_AGENT_SESSION_DIR`: where sessions are persisted - default: data dir + "uragent/sessions"
//! - `UR_AGENT_KB_BUCKET`: knowledge-base bucket for preprocessing - default: "ur-agent-knowledge-base"
//!
//! ## Endpoint overrides
//! - `UR_AGENT_STORAGE_ENDPOINT`, `UR_AGENT_DOCUMENT_AI_ENDPOINT`, `UR_AGENT_VERTEX_ENDPOINT`

use genai::adapter::AdapterKind;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const GCS_DEFAULT_STORAGE_CLASS: &str = "STANDARD";
pub const GCS_DEFAULT_LOCATION: &str = "US";
pub const GCS_LIST_BUCKETS_MAX_RESULTS: u32 = 50;
pub const GCS_LIST_BLOBS_MAX_RESULTS: u32 = 100;
pub const GCS_DEFAULT_CONTENT_TYPE: &str = "application/pdf";

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro-preview-05-06";
pub const DEFAULT_KB_BUCKET: &str = "ur-agent-knowledge-base";

const DEFAULT_LOCATION: &str = "us-central1";
const DEFAULT_DOCUMENT_AI_LOCATION: &str = "us";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_ITERATIONS: usize = 25;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: gemini, openai, anthropic, ollama, xai, groq")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone)]
pub struct UrAgentConfig {
    pub project_id: Option<String>,
    /// Vertex AI region used for RAG corpora
    pub location: String,
    pub document_ai_location: String,
    pub document_ai_processor_id: Option<String>,
    pub kb_bucket: String,
    pub provider: AdapterKind,
    pub model: String,
    pub request_timeout_secs: u64,
    pub max_iterations: usize,
    pub log_level: String,
    pub session_dir: PathBuf,
    pub storage_endpoint: Option<String>,
    pub document_ai_endpoint: Option<String>,
    pub vertex_endpoint: Option<String>,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses a provider name the way genai spells adapters, accepting a few aliases
pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    let lower = name.to_lowercase();
    let normalized = match lower.as_str() {
        "claude" => "anthropic",
        "grok" => "xai",
        "google" => "gemini",
        other => other,
    };
    AdapterKind::from_lower_str(normalized).ok_or_else(|| ConfigError::InvalidProvider(name.to_string()))
}

fn default_session_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("uragent")
        .join("sessions")
}

impl Default for UrAgentConfig {
    fn default() -> Self {
        let provider = non_empty_var("UR_AGENT_PROVIDER")
            .and_then(|p| parse_provider(&p).ok())
            .unwrap_or(AdapterKind::Gemini);

        let model = non_empty_var("UR_AGENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let request_timeout_secs = non_empty_var("UR_AGENT_REQUEST_TIMEOUT")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let max_iterations = non_empty_var("UR_AGENT_MAX_ITERATIONS")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_ITERATIONS);

        let log_level = non_empty_var("UR_AGENT_LOG_LEVEL")
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            project_id: non_empty_var("GOOGLE_CLOUD_PROJECT"),
            location: non_empty_var("GOOGLE_CLOUD_LOCATION")
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            document_ai_location: non_empty_var("DOCUMENT_AI_LOCATION")
                .unwrap_or_else(|| DEFAULT_DOCUMENT_AI_LOCATION.to_string()),
            document_ai_processor_id: non_empty_var("DOCUMENT_AI_PROCESSOR_ID"),
            kb_bucket: non_empty_var("UR_AGENT_KB_BUCKET")
                .unwrap_or_else(|| DEFAULT_KB_BUCKET.to_string()),
            provider,
            model,
            request_timeout_secs,
            max_iterations,
            log_level,
            session_dir: non_empty_var("UR_AGENT_SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_session_dir),
            storage_endpoint: non_empty_var("UR_AGENT_STORAGE_ENDPOINT"),
            document_ai_endpoint: non_empty_var("UR_AGENT_DOCUMENT_AI_ENDPOINT"),
            vertex_endpoint: non_empty_var("UR_AGENT_VERTEX_ENDPOINT"),
        }
    }
}

impl UrAgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max iterations must be at least 1".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn storage_base_url(&self) -> String {
        self.storage_endpoint
            .clone()
            .unwrap_or_else(|| "https://storage.googleapis.com".to_string())
    }

    pub fn vertex_base_url(&self) -> String {
        self.vertex_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.location))
    }

    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let unset = || "<unset>".to_string();

        map.insert(
            "project_id".to_string(),
            self.project_id.clone().unwrap_or_else(unset),
        );
        map.insert("location".to_string(), self.location.clone());
        map.insert(
            "document_ai_location".to_string(),
            self.document_ai_location.clone(),
        );
        map.insert(
            "document_ai_processor_id".to_string(),
            self.document_ai_processor_id.clone().unwrap_or_else(unset),
        );
        map.insert("kb_bucket".to_string(), self.kb_bucket.clone());
        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("max_iterations".to_string(), self.max_iterations.to_string());
        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert(
            "session_dir".to_string(),
            self.session_dir.display().to_string(),
        );

        map
    }
}

impl fmt::Display for UrAgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "uragent configuration:")?;
        for (key, value) in self.to_display_map() {
            writeln!(f, "  {}: {}", key, value)?;
        }
        Ok(())
    }
}
