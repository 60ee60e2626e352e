use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::context::ToolContext;
use super::registry::ToolRegistry;
use crate::llm::ToolDefinition;

const OUTPUT_PREVIEW_CHARS: usize = 200;

/// Executes registered tools by name
pub struct ToolSystem {
    registry: ToolRegistry,
}

impl ToolSystem {
    pub fn new(context: &ToolContext) -> Self {
        Self::from_registry(ToolRegistry::new(context))
    }

    pub fn from_registry(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Execute a tool and return its JSON result
    pub async fn execute(&self, tool_name: &str, arguments: Value) -> Result<Value> {
        info!(tool = tool_name, args = ?arguments, "Executing tool");

        let tool = self
            .registry
            .get_tool(tool_name)
            .ok_or_else(|| anyhow!("Unknown tool: {}", tool_name))?;

        let result = tool.execute(arguments).await;

        match &result {
            Ok(output) => {
                let output_preview: String = serde_json::to_string(output)
                    .unwrap_or_default()
                    .chars()
                    .take(OUTPUT_PREVIEW_CHARS)
                    .collect();
                info!(tool = tool_name, "Tool execution completed");
                debug!(tool = tool_name, output_preview = %output_preview, "Tool output preview");
            }
            Err(e) => {
                warn!(tool = tool_name, error = %e, "Tool execution failed");
            }
        }

        result
    }

    pub fn as_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.as_tool_definitions()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.registry.tool_names()
    }

    pub fn tool_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::context::test_support;
    use serde_json::json;
    use tempfile::TempDir;

    fn system() -> (ToolSystem, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let system = ToolSystem::new(&test_support::context("http://127.0.0.1:9", temp_dir.path()));
        (system, temp_dir)
    }

    #[tokio::test]
    async fn test_tool_system_creation() {
        let (system, _temp) = system();
        assert_eq!(system.tool_count(), 21);
        assert_eq!(system.as_tool_definitions().len(), 21);
    }

    #[tokio::test]
    async fn test_execute_local_tool() {
        let (system, _temp) = system();

        let result = system
            .execute(
                "generate_user_requirements",
                json!({"extracted_information": {"source_document_id": "mom.pdf"}}),
            )
            .await
            .unwrap();

        assert_eq!(result["document_id"], "mom.pdf");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (system, _temp) = system();

        let result = system.execute("nonexistent", json!({})).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_tool_errors_propagate() {
        let (system, _temp) = system();

        let result = system.execute("load_memory", json!({})).await;
        assert!(result.unwrap_err().to_string().contains("query"));
    }
}
