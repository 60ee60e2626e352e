//! The user-requirements agent: definition, runner and session memory

pub mod definition;
pub mod runner;
pub mod session;

pub use definition::{AgentDefinition, AGENT_NAME, AGENT_OUTPUT_KEY, AGENT_TOOLS};
pub use runner::{AgentRunner, RunnerError};
pub use session::{MemoryEntry, MemoryStore, Session, SessionStore};
