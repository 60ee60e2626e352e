//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while the agent works through one user turn
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A user message was handed to the agent
    TurnStarted { session_id: String },

    LlmRequestStarted { iteration: usize },

    LlmResponseReceived {
        iteration: usize,
        tool_calls: usize,
        response_time: Duration,
    },

    ToolExecutionStarted { tool_name: String, iteration: usize },

    ToolExecutionComplete {
        tool_name: String,
        iteration: usize,
        execution_time: Duration,
        success: bool,
    },

    /// The LLM answered with text and no further tool calls
    TurnCompleted {
        total_iterations: usize,
        total_time: Duration,
    },

    Failed { error: String },
}

/// Trait for handling progress events during an agent turn
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
