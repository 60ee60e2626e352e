//! Terminal spinner for interactive chat

use super::{ProgressEvent, ProgressHandler};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// Shows what the agent is doing while a turn is in flight
#[derive(Debug, Clone)]
pub struct SpinnerHandler {
    bar: ProgressBar,
}

impl SpinnerHandler {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner())
    }

    /// Spinner that never draws, for tests and non-TTY output
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars(TICK_CHARS)
            .template("{spinner:.cyan} {msg}")
        {
            bar.set_style(style);
        }
        Self { bar }
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }
}

impl Default for SpinnerHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHandler for SpinnerHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::TurnStarted { .. } => {
                self.bar.reset();
                self.bar.set_message("Thinking...");
                self.bar.enable_steady_tick(Duration::from_millis(100));
            }
            ProgressEvent::LlmRequestStarted { iteration } if *iteration > 1 => {
                self.bar.set_message("Thinking...");
            }
            ProgressEvent::ToolExecutionStarted { tool_name, .. } => {
                self.bar.set_message(format!("Running {}...", tool_name));
            }
            ProgressEvent::TurnCompleted { .. } | ProgressEvent::Failed { .. } => {
                self.bar.finish_and_clear();
            }
            _ => {}
        }
    }
}
