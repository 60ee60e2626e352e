use super::client::LLMClient;
use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse, ToolCall};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted LLM for driving the agent runner without a provider
pub struct MockLLMClient {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<LLMRequest>>,
    name: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub error: Option<BackendError>,
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            error: None,
        }
    }

    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            error: None,
        }
    }

    pub fn error(error: BackendError) -> Self {
        Self {
            content: String::new(),
            tool_calls: Vec::new(),
            error: Some(error),
        }
    }
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::with_name("MockLLM")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            name: name.into(),
        }
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        let mut queue = self.responses.lock().unwrap();
        queue.extend(responses);
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    /// Requests received so far, oldest first
    pub fn recorded_requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn tool_call(call_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> ToolCall {
        ToolCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn extract_information_call(call_id: impl Into<String>, gcs_uri: impl Into<String>) -> ToolCall {
        Self::tool_call(
            call_id,
            "extract_information",
            json!({ "gcs_uri": gcs_uri.into() }),
        )
    }

    pub fn update_requirements_call(
        call_id: impl Into<String>,
        requirements: Value,
        requirement_id: impl Into<String>,
        updated_fields: Value,
    ) -> ToolCall {
        Self::tool_call(
            call_id,
            "update_user_requirements",
            json!({
                "current_requirements_list": requirements,
                "update_instructions": {
                    "requirement_id_to_update": requirement_id.into(),
                    "updated_fields": updated_fields,
                }
            }),
        )
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        self.requests.lock().unwrap().push(request);

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BackendError::Other {
                message: "MockLLMClient: No more responses in queue".to_string(),
            })?;

        if let Some(error) = response.error {
            return Err(error);
        }

        Ok(LLMResponse::with_tool_calls(
            response.content,
            response.tool_calls,
            Duration::from_millis(10),
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_info(&self) -> Option<String> {
        Some("mock-model".to_string())
    }
}

impl std::fmt::Debug for MockLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLLMClient")
            .field("name", &self.name)
            .field("remaining_responses", &self.remaining_responses())
            .finish()
    }
}
