//! uragent - an LLM agent that turns project documents into user requirements
//!
//! The agent reads documents stored in Google Cloud Storage, extracts their text
//! with Document AI, and guides an LLM through recording the key details,
//! generating structured [`UserRequirement`] records and applying targeted
//! updates to them. It can also manage buckets and Vertex AI RAG corpora.
//!
//! # Layout
//!
//! - [`agent`]: agent definition, the tool-calling runner and session memory
//! - [`tools`]: the tools the LLM may call
//! - [`requirements`]: requirement records and the generate/update/extract operations
//! - [`gcp`]: REST clients for Cloud Storage, Document AI and Vertex AI RAG
//! - [`preprocessing`]: upload-triggered OCR into the knowledge-base bucket
//! - [`llm`]: provider-agnostic LLM client
//!
//! ```ignore
//! use std::sync::Arc;
//! use uragent::agent::{AgentDefinition, AgentRunner, Session};
//!
//! let runner = AgentRunner::new(AgentDefinition::ur_agent(model), llm, tools, 25);
//! let mut session = Session::new("ur_agent");
//! let reply = runner.run_turn(&mut session, "Extract requirements from gs://docs/rfp.pdf", None).await?;
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod gcp;
pub mod llm;
pub mod preprocessing;
pub mod progress;
pub mod requirements;
pub mod tools;
pub mod util;

pub use agent::{AgentDefinition, AgentRunner, RunnerError, Session, SessionStore};
pub use config::{ConfigError, UrAgentConfig};
pub use gcp::{GcpClients, GcpError};
pub use llm::{BackendError, GenAIClient, LLMClient};
pub use requirements::{RequirementError, UserRequirement};
pub use tools::{Tool, ToolContext, ToolRegistry, ToolSystem};
pub use util::{init_from_env, init_logging, LoggingConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_uragent() {
        assert_eq!(NAME, "uragent");
    }
}
