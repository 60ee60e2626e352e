//! LLM communication types
//!
//! Provider-independent request/response shapes used by the agent runner.
//! Messages are serializable so a conversation can be persisted as a session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Agent instruction
    System,
    /// User message
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool response
    Tool,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Tool calls made by the assistant (only for Assistant role)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Tool call ID this message responds to (only for Tool role)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::Assistant, content)
    }

    /// Creates an assistant message carrying the tool calls it requested
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Creates a tool response message from a JSON tool result
    pub fn tool_response(call_id: impl Into<String>, result: &Value) -> Self {
        Self {
            role: MessageRole::Tool,
            content: result.to_string(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }

    /// True for user and assistant text, the parts of a conversation worth remembering
    pub fn is_conversational(&self) -> bool {
        matches!(self.role, MessageRole::User | MessageRole::Assistant)
            && !self.content.trim().is_empty()
    }
}

/// A tool call requested by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    /// Arguments to pass to the tool (JSON object)
    pub arguments: Value,
}

/// Definition of a tool available to the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters
    pub parameters: Value,
}

/// Request to send to the LLM
#[derive(Debug, Clone)]
pub struct LLMRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    /// Temperature for response generation (0.0 - 1.0)
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LLMRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from the LLM
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub response_time: Duration,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>, response_time: Duration) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            response_time,
        }
    }

    pub fn with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        response_time: Duration,
    ) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            response_time,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_message_creation() {
        let system = ChatMessage::system("You are an expert User Requirements Analyst");
        assert_eq!(system.role, MessageRole::System);
        assert!(system.tool_calls.is_none());

        let user = ChatMessage::user("Extract requirements from gs://docs/rfp.pdf");
        assert_eq!(user.role, MessageRole::User);
        assert!(user.is_conversational());
    }

    #[test]
    fn test_tool_response_serializes_result() {
        let msg = ChatMessage::tool_response("call_7", &json!({"extracted_text": "hello"}));
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(msg.content, r#"{"extracted_text":"hello"}"#);
        assert!(!msg.is_conversational());
    }

    #[test]
    fn test_blank_assistant_message_is_not_conversational() {
        assert!(!ChatMessage::assistant("   ").is_conversational());
    }

    #[test]
    fn test_message_roundtrips_through_json() {
        let call = ToolCall {
            call_id: "c1".to_string(),
            name: "list_buckets".to_string(),
            arguments: json!({}),
        };
        let msg = ChatMessage::assistant_with_tools("", vec![call.clone()]);
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: ChatMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.tool_calls, Some(vec![call]));
    }

    #[test]
    fn test_llm_request_builder() {
        let request = LLMRequest::new(vec![ChatMessage::user("hi")])
            .with_temperature(0.2)
            .with_max_tokens(2048);

        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(2048));
        assert!(request.tools.is_empty());
    }

    #[test]
    fn test_llm_response() {
        let response = LLMResponse::text("Done", Duration::from_millis(100));
        assert!(!response.has_tool_calls());

        let with_tools = LLMResponse::with_tool_calls(
            "",
            vec![ToolCall {
                call_id: "1".to_string(),
                name: "list_corpora".to_string(),
                arguments: json!({}),
            }],
            Duration::from_millis(50),
        );
        assert!(with_tools.has_tool_calls());
    }
}
