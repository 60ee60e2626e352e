//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::TurnStarted { session_id } => {
                info!(session = %session_id, "Agent turn started");
            }
            ProgressEvent::LlmRequestStarted { iteration } => {
                debug!(iteration, "Sending request to LLM");
            }
            ProgressEvent::LlmResponseReceived {
                iteration,
                tool_calls,
                response_time,
            } => {
                debug!(
                    iteration,
                    tool_calls,
                    response_time_ms = response_time.as_millis(),
                    "Received LLM response"
                );
            }
            ProgressEvent::ToolExecutionStarted {
                tool_name,
                iteration,
            } => {
                info!(tool = %tool_name, iteration, "Executing tool");
            }
            ProgressEvent::ToolExecutionComplete {
                tool_name,
                iteration,
                execution_time,
                success,
            } => {
                if *success {
                    debug!(
                        tool = %tool_name,
                        iteration,
                        execution_time_ms = execution_time.as_millis(),
                        "Tool execution complete"
                    );
                } else {
                    warn!(
                        tool = %tool_name,
                        iteration,
                        execution_time_ms = execution_time.as_millis(),
                        "Tool execution failed"
                    );
                }
            }
            ProgressEvent::TurnCompleted {
                total_iterations,
                total_time,
            } => {
                info!(
                    iterations = total_iterations,
                    total_time_ms = total_time.as_millis(),
                    "Agent turn complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Agent turn failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::TurnStarted {
                session_id: "s1".to_string(),
            },
            ProgressEvent::LlmRequestStarted { iteration: 1 },
            ProgressEvent::LlmResponseReceived {
                iteration: 1,
                tool_calls: 2,
                response_time: Duration::from_millis(100),
            },
            ProgressEvent::ToolExecutionStarted {
                tool_name: "list_buckets".to_string(),
                iteration: 1,
            },
            ProgressEvent::ToolExecutionComplete {
                tool_name: "list_buckets".to_string(),
                iteration: 1,
                execution_time: Duration::from_millis(10),
                success: true,
            },
            ProgressEvent::ToolExecutionComplete {
                tool_name: "extract_information".to_string(),
                iteration: 1,
                execution_time: Duration::from_millis(10),
                success: false,
            },
            ProgressEvent::TurnCompleted {
                total_iterations: 3,
                total_time: Duration::from_secs(5),
            },
            ProgressEvent::Failed {
                error: "Test error".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
