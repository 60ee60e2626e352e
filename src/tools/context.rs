use crate::agent::MemoryStore;
use crate::config::UrAgentConfig;
use crate::gcp::GcpClients;

/// Everything the tool implementations share
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub clients: GcpClients,
    pub config: UrAgentConfig,
    pub memory: MemoryStore,
}

impl ToolContext {
    pub fn new(clients: GcpClients, config: UrAgentConfig, memory: MemoryStore) -> Self {
        Self {
            clients,
            config,
            memory,
        }
    }
}
