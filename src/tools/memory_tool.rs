use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::context::ToolContext;
use super::helpers::required_str;
use super::trait_def::Tool;
use crate::agent::MemoryStore;

pub struct LoadMemoryTool {
    memory: MemoryStore,
}

impl LoadMemoryTool {
    pub fn new(context: &ToolContext) -> Self {
        Self {
            memory: context.memory.clone(),
        }
    }
}

#[async_trait]
impl Tool for LoadMemoryTool {
    fn name(&self) -> &'static str {
        "load_memory"
    }

    fn description(&self) -> &'static str {
        "Search earlier conversations for messages relevant to a query"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keywords to look for in past conversations"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = required_str(&args, "query")?;
        let memories = self.memory.search(query)?;
        Ok(json!({ "memories": memories }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Session, SessionStore};
    use crate::llm::ChatMessage;
    use crate::tools::context::test_support;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_memory_returns_matches() {
        let temp = TempDir::new().unwrap();
        let mut session = Session::new("ur_agent");
        session.push(ChatMessage::user("Priorities for the reporting module?"));
        SessionStore::new(temp.path()).save(&session).unwrap();

        let tool = LoadMemoryTool::new(&test_support::context("http://127.0.0.1:9", temp.path()));
        let result = tool.execute(json!({"query": "reporting"})).await.unwrap();

        let memories = result["memories"].as_array().unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0]["author"], "user");
        assert_eq!(memories[0]["session_id"], session.id.as_str());
    }
}
