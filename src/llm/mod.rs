//! LLM client abstraction layer
//!
//! The agent talks to its model through the `LLMClient` trait so the runner can be
//! driven by a real provider (GenAI) or by a scripted mock in tests.

mod client;
mod error;
mod genai;
mod mock;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai::{provider_has_credentials, GenAIClient};
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole, ToolCall, ToolDefinition};
