use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::llm::ToolDefinition;

/// A named function the LLM may call with JSON arguments
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON Schema of the arguments object
    fn schema(&self) -> Value;
    async fn execute(&self, arguments: Value) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema(),
        }
    }
}
