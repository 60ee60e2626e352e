//! Tool registry
//!
//! Holds every tool the agent can call and exposes them to the LLM.

use std::sync::Arc;

use super::context::ToolContext;
use super::corpus_tools::*;
use super::document_tools::ExtractInformationTool;
use super::memory_tool::LoadMemoryTool;
use super::requirement_tools::{
    ExtractSpecificDetailsTool, GenerateRequirementsTool, UpdateRequirementsTool,
};
use super::storage_tools::*;
use super::trait_def::Tool;
use crate::llm::ToolDefinition;

pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the full agent tool set wired to `context`
    pub fn new(context: &ToolContext) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(CreateBucketTool::new(context)),
            Arc::new(ListBucketsTool::new(context)),
            Arc::new(GetBucketDetailsTool::new(context)),
            Arc::new(UploadFileTool::new(context)),
            Arc::new(ListBlobsTool::new(context)),
            Arc::new(CreateCorpusTool::new(context)),
            Arc::new(UpdateCorpusTool::new(context)),
            Arc::new(ListCorporaTool::new(context)),
            Arc::new(GetCorpusTool::new(context)),
            Arc::new(DeleteCorpusTool::new(context)),
            Arc::new(ImportDocumentTool::new(context)),
            Arc::new(ListFilesTool::new(context)),
            Arc::new(GetFileTool::new(context)),
            Arc::new(DeleteFileTool::new(context)),
            Arc::new(QueryCorpusTool::new(context)),
            Arc::new(SearchAllCorporaTool::new(context)),
            Arc::new(ExtractInformationTool::new(context)),
            Arc::new(ExtractSpecificDetailsTool),
            Arc::new(GenerateRequirementsTool),
            Arc::new(UpdateRequirementsTool),
            Arc::new(LoadMemoryTool::new(context)),
        ];

        Self::from_tools(tools)
    }

    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Get all tools as ToolDefinition for LLMClient trait
    pub fn as_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
