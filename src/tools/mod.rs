pub mod context;
pub mod corpus_tools;
pub mod document_tools;
pub mod helpers;
pub mod memory_tool;
pub mod registry;
pub mod requirement_tools;
pub mod storage_tools;
pub mod system;
pub mod trait_def;

pub use context::ToolContext;
pub use registry::ToolRegistry;
pub use system::ToolSystem;
pub use trait_def::Tool;
