use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{debug, error, info, warn};

use super::definition::AgentDefinition;
use super::session::{Session, SessionStore};
use crate::llm::{BackendError, ChatMessage, LLMClient, LLMRequest, LLMResponse, ToolCall, ToolDefinition};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::tools::ToolSystem;

const MAX_CONSECUTIVE_EMPTY_RESPONSES: usize = 2;
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("LLM error: {0}")]
    Llm(#[from] BackendError),

    #[error("Max iterations exceeded: {0}")]
    MaxIterationsExceeded(usize),

    #[error("LLM returned no text and no tool calls after {0} attempts")]
    EmptyResponse(usize),

    #[error("Session error: {0}")]
    Session(anyhow::Error),
}

/// Drives one agent through the LLM's tool-calling loop
pub struct AgentRunner {
    definition: AgentDefinition,
    llm: Arc<dyn LLMClient>,
    tools: Arc<ToolSystem>,
    max_iterations: usize,
    store: Option<SessionStore>,
}

impl AgentRunner {
    pub fn new(
        definition: AgentDefinition,
        llm: Arc<dyn LLMClient>,
        tools: Arc<ToolSystem>,
        max_iterations: usize,
    ) -> Self {
        Self {
            definition,
            llm,
            tools,
            max_iterations,
            store: None,
        }
    }

    /// Persist the session after every completed turn
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    /// Tools named by the agent definition, in definition order
    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let available = self.tools.as_tool_definitions();
        self.definition
            .tools
            .iter()
            .filter_map(|name| available.iter().find(|d| &d.name == name).cloned())
            .collect()
    }

    /// Handles one user message and returns the agent's final text.
    ///
    /// The response is also stored in `session.state` under the definition's
    /// output key.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        user_message: &str,
        progress: Option<Arc<dyn ProgressHandler>>,
    ) -> Result<String, RunnerError> {
        let progress = progress.unwrap_or_else(|| Arc::new(NoOpHandler));
        progress.on_progress(&ProgressEvent::TurnStarted {
            session_id: session.id.clone(),
        });
        info!(session = %session.id, agent = %self.definition.name, "Starting agent turn");

        session.push(ChatMessage::user(user_message));

        let start_time = Instant::now();
        let result = self.turn_loop(session, &progress).await;

        match &result {
            Ok((_, total_iterations)) => {
                progress.on_progress(&ProgressEvent::TurnCompleted {
                    total_iterations: *total_iterations,
                    total_time: start_time.elapsed(),
                });
            }
            Err(e) => {
                error!(session = %session.id, error = %e, "Agent turn failed");
                progress.on_progress(&ProgressEvent::Failed {
                    error: e.to_string(),
                });
            }
        }

        if let Some(store) = &self.store {
            store.save(session).map_err(RunnerError::Session)?;
        }

        result.map(|(text, _)| text)
    }

    async fn turn_loop(
        &self,
        session: &mut Session,
        progress: &Arc<dyn ProgressHandler>,
    ) -> Result<(String, usize), RunnerError> {
        let tools = self.tool_definitions();
        debug!("Offering {} tools to the LLM", tools.len());

        let mut iteration = 0;
        let mut consecutive_empty = 0;

        loop {
            iteration += 1;
            if iteration > self.max_iterations {
                error!("Exceeded max iterations ({})", self.max_iterations);
                return Err(RunnerError::MaxIterationsExceeded(self.max_iterations));
            }
            debug!("Iteration {}/{}", iteration, self.max_iterations);

            progress.on_progress(&ProgressEvent::LlmRequestStarted { iteration });
            let response = self.execute_llm_request(session, &tools).await?;
            progress.on_progress(&ProgressEvent::LlmResponseReceived {
                iteration,
                tool_calls: response.tool_calls.len(),
                response_time: response.response_time,
            });

            if !response.has_tool_calls() {
                if response.content.trim().is_empty() {
                    consecutive_empty += 1;
                    if consecutive_empty >= MAX_CONSECUTIVE_EMPTY_RESPONSES {
                        return Err(RunnerError::EmptyResponse(consecutive_empty));
                    }
                    warn!(
                        "LLM returned an empty response (attempt {}/{}). Sending reminder.",
                        consecutive_empty, MAX_CONSECUTIVE_EMPTY_RESPONSES
                    );
                    session.push(ChatMessage::user(
                        "Your last reply was empty. Call a tool or answer the user.",
                    ));
                    continue;
                }

                session.push(ChatMessage::assistant(&response.content));
                session.set_state(&self.definition.output_key, json!(response.content));
                info!(iterations = iteration, "Agent produced a final response");
                return Ok((response.content, iteration));
            }

            consecutive_empty = 0;
            session.push(ChatMessage::assistant_with_tools(
                &response.content,
                response.tool_calls.clone(),
            ));
            self.process_tool_calls(&response.tool_calls, session, iteration, progress)
                .await;
        }
    }

    async fn execute_llm_request(
        &self,
        session: &Session,
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse, BackendError> {
        let mut messages = Vec::with_capacity(session.messages.len() + 1);
        messages.push(ChatMessage::system(&self.definition.instruction));
        messages.extend(session.messages.iter().cloned());

        let request = LLMRequest::new(messages)
            .with_tools(tools.to_vec())
            .with_temperature(TEMPERATURE);

        self.llm.chat(request).await
    }

    async fn process_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        session: &mut Session,
        iteration: usize,
        progress: &Arc<dyn ProgressHandler>,
    ) {
        for tool_call in tool_calls {
            debug!(
                "Executing tool: {} with call_id: {}",
                tool_call.name, tool_call.call_id
            );

            let start_time = Instant::now();
            progress.on_progress(&ProgressEvent::ToolExecutionStarted {
                tool_name: tool_call.name.clone(),
                iteration,
            });

            // Failures go back to the LLM so it can correct its arguments
            let (result, success) = match self
                .tools
                .execute(&tool_call.name, tool_call.arguments.clone())
                .await
            {
                Ok(output) => (output, true),
                Err(e) => {
                    warn!("Tool execution failed, returning error to LLM: {}", e);
                    (json!({ "error": e.to_string() }), false)
                }
            };

            progress.on_progress(&ProgressEvent::ToolExecutionComplete {
                tool_name: tool_call.name.clone(),
                iteration,
                execution_time: start_time.elapsed(),
                success,
            });

            session.push(ChatMessage::tool_response(&tool_call.call_id, &result));
        }
    }
}
