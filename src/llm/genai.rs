//! GenAI-based LLM client
//!
//! Drives the agent through the `genai` crate so the same tool-calling loop works
//! against Gemini (the default) or any other provider genai supports.

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{ChatMessage, LLMRequest, LLMResponse, MessageRole, ToolCall, ToolDefinition};
use crate::config::UrAgentConfig;
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{
    ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest, MessageContent,
    Tool as GenAITool, ToolResponse,
};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::Duration;
use tracing::{debug, error};

/// Environment variable that points every provider at a custom base URL
const API_BASE_URL_ENV: &str = "UR_AGENT_API_BASE_URL";

pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

impl GenAIClient {
    pub fn new(provider: AdapterKind, model: String, timeout: Duration) -> Self {
        let client = match std::env::var(API_BASE_URL_ENV).ok() {
            Some(endpoint_url) => {
                debug!(
                    provider = provider.as_str(),
                    endpoint = %endpoint_url,
                    "Using custom LLM endpoint"
                );
                let model_clone = model.clone();

                let resolver = ServiceTargetResolver::from_resolver_fn(
                    move |_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                        let auth = match provider.default_key_env_name() {
                            Some(api_key_var) => AuthData::from_env(api_key_var),
                            None => AuthData::from_single(""),
                        };
                        Ok(ServiceTarget {
                            endpoint: Endpoint::from_owned(endpoint_url.clone()),
                            auth,
                            model: ModelIden::new(provider, &model_clone),
                        })
                    },
                );

                Client::builder()
                    .with_service_target_resolver(resolver)
                    .build()
            }
            None => Client::default(),
        };

        debug!(provider = provider.as_str(), model = %model, "Creating GenAI client");

        Self {
            client,
            model,
            provider,
            timeout,
        }
    }

    /// Builds the client for the configured provider, failing early when its API key is absent
    pub fn from_config(config: &UrAgentConfig) -> Result<Self, BackendError> {
        if !provider_has_credentials(config.provider) {
            let var = config.provider.default_key_env_name().unwrap_or_default();
            return Err(BackendError::ConfigurationError {
                message: format!(
                    "No credentials for provider {}. Set {} before starting the agent",
                    config.provider.as_str(),
                    var
                ),
            });
        }

        Ok(Self::new(
            config.provider,
            config.model.clone(),
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    fn convert_message(&self, msg: &ChatMessage) -> GenAIChatMessage {
        match msg.role {
            MessageRole::System => GenAIChatMessage::system(&msg.content),
            MessageRole::User => GenAIChatMessage::user(&msg.content),
            MessageRole::Assistant => match msg.tool_calls {
                Some(ref tool_calls) if !tool_calls.is_empty() => {
                    let genai_calls: Vec<genai::chat::ToolCall> = tool_calls
                        .iter()
                        .map(|tc| genai::chat::ToolCall {
                            call_id: tc.call_id.clone(),
                            fn_name: tc.name.clone(),
                            fn_arguments: tc.arguments.clone(),
                        })
                        .collect();
                    GenAIChatMessage::assistant(MessageContent::from_tool_calls(genai_calls))
                }
                _ => GenAIChatMessage::assistant(&msg.content),
            },
            MessageRole::Tool => ToolResponse {
                call_id: msg.tool_call_id.clone().unwrap_or_default(),
                content: msg.content.clone(),
            }
            .into(),
        }
    }

    fn convert_tool(&self, tool: &ToolDefinition) -> GenAITool {
        GenAITool::new(&tool.name)
            .with_description(&tool.description)
            .with_schema(tool.parameters.clone())
    }
}

/// Providers without a key variable (Ollama) always count as configured
pub fn provider_has_credentials(provider: AdapterKind) -> bool {
    match provider.default_key_env_name() {
        None => true,
        Some(env_var) => std::env::var(env_var).is_ok(),
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let start = std::time::Instant::now();

        let messages: Vec<GenAIChatMessage> = request
            .messages
            .iter()
            .map(|m| self.convert_message(m))
            .collect();
        let tools: Vec<GenAITool> = request.tools.iter().map(|t| self.convert_tool(t)).collect();

        let genai_request = GenAIChatRequest::new(messages).with_tools(tools);

        let mut options = ChatOptions::default();
        if let Some(temp) = request.temperature {
            options = options.with_temperature(temp as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }

        let response = match tokio::time::timeout(
            self.timeout,
            self.client
                .exec_chat(&self.model, genai_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("{} API error: {}", self.provider.as_str(), e);
                return Err(BackendError::ApiError {
                    message: format!("{} request failed: {}", self.provider.as_str(), e),
                    status_code: None,
                });
            }
            Err(_) => {
                error!(
                    "{} request timed out after {}s",
                    self.provider.as_str(),
                    self.timeout.as_secs()
                );
                return Err(BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let content = response.first_text().unwrap_or_default().to_string();

        let tool_calls: Vec<ToolCall> = response
            .tool_calls()
            .into_iter()
            .map(|tc| ToolCall {
                call_id: tc.call_id.clone(),
                name: tc.fn_name.clone(),
                arguments: tc.fn_arguments.clone(),
            })
            .collect();

        Ok(LLMResponse::with_tool_calls(
            content,
            tool_calls,
            start.elapsed(),
        ))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genai_client_creation() {
        let client = GenAIClient::new(
            AdapterKind::Gemini,
            "gemini-2.5-pro-preview-05-06".to_string(),
            Duration::from_secs(30),
        );

        assert_eq!(client.name(), "Gemini");
        assert_eq!(
            client.model_info(),
            Some("gemini-2.5-pro-preview-05-06".to_string())
        );
    }

    #[test]
    fn test_ollama_needs_no_credentials() {
        assert!(provider_has_credentials(AdapterKind::Ollama));
    }

    #[test]
    fn test_assistant_tool_calls_are_converted() {
        let client = GenAIClient::new(
            AdapterKind::Ollama,
            "llama3".to_string(),
            Duration::from_secs(5),
        );
        let msg = ChatMessage::assistant_with_tools(
            "",
            vec![ToolCall {
                call_id: "c1".to_string(),
                name: "list_buckets".to_string(),
                arguments: serde_json::json!({}),
            }],
        );
        let converted = client.convert_message(&msg);
        assert!(format!("{:?}", converted).contains("list_buckets"));
    }
}
