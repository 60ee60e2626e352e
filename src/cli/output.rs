//! Output formatting for the CLI commands
//!
//! Every command can print JSON, YAML or human-readable text.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::UrAgentConfig;
use crate::llm::ToolDefinition;
use crate::preprocessing::PreprocessOutcome;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// Agent reply to one chat message
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply<'a> {
    pub session_id: &'a str,
    pub response: &'a str,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn structured<T: Serialize + ?Sized>(&self, value: &T, what: &str) -> Result<Option<String>> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .map(Some)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .map(Some)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            OutputFormat::Human => Ok(None),
        }
    }

    pub fn format_reply(&self, reply: &ChatReply<'_>) -> Result<String> {
        if let Some(out) = self.structured(reply, "reply")? {
            return Ok(out);
        }
        Ok(format!("{}\n", reply.response.trim_end()))
    }

    pub fn format_tools(&self, tools: &[ToolDefinition]) -> Result<String> {
        let listing: Vec<Value> = tools
            .iter()
            .map(|t| json!({"name": t.name, "description": t.description, "parameters": t.parameters}))
            .collect();
        if let Some(out) = self.structured(&listing, "tool list")? {
            return Ok(out);
        }

        let mut output = format!("Available Tools ({})\n{}\n", tools.len(), RULE);
        let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
        for tool in tools {
            output.push_str(&format!(
                "{:<width$}  {}\n",
                tool.name,
                tool.description,
                width = width
            ));
            let required = required_params(&tool.parameters);
            if !required.is_empty() {
                output.push_str(&format!(
                    "{:<width$}  \u{2514}\u{2500} requires: {}\n",
                    "",
                    required.join(", "),
                    width = width
                ));
            }
        }
        Ok(output)
    }

    /// Tool results are JSON already; human output is indented JSON with a status line
    pub fn format_tool_result(&self, tool: &str, result: &Value) -> Result<String> {
        if self.format == OutputFormat::Yaml {
            return serde_yaml::to_string(result).context("Failed to serialize tool result to YAML");
        }
        let body =
            serde_json::to_string_pretty(result).context("Failed to serialize tool result to JSON")?;
        if self.format == OutputFormat::Json {
            return Ok(body);
        }

        let failed = result["status"] == "error" || result.get("error").is_some();
        let marker = if failed { "\u{274C}" } else { "\u{2705}" };
        Ok(format!("{} {}\n{}\n{}\n", marker, tool, RULE, body))
    }

    pub fn format_preprocess(&self, outcome: &PreprocessOutcome) -> Result<String> {
        if let Some(out) = self.structured(outcome, "preprocessing outcome")? {
            return Ok(out);
        }

        Ok(match outcome {
            PreprocessOutcome::Skipped { source_uri, reason } => {
                format!("\u{2139}\u{FE0F} Skipped {}: {}\n", source_uri, reason)
            }
            PreprocessOutcome::Stored {
                source_uri,
                kb_uri,
                characters,
            } => format!(
                "\u{2705} Preprocessed document\n{}\n\u{251C}\u{2500} Source:     {}\n\u{251C}\u{2500} Stored at:  {}\n\u{2514}\u{2500} Characters: {}\n",
                RULE, source_uri, kb_uri, characters
            ),
        })
    }

    pub fn format_config(&self, config: &UrAgentConfig) -> Result<String> {
        if let Some(out) = self.structured(&config.to_display_map(), "configuration")? {
            return Ok(out);
        }
        Ok(config.to_string())
    }
}

fn required_params(schema: &Value) -> Vec<&str> {
    schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "list_buckets".to_string(),
                description: "List Cloud Storage buckets in a project".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
            ToolDefinition {
                name: "extract_information".to_string(),
                description: "Extract the full text of a document".to_string(),
                parameters: json!({"type": "object", "required": ["gcs_uri"]}),
            },
        ]
    }

    #[test]
    fn test_format_tools_human() {
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_tools(&tools())
            .unwrap();
        assert!(output.starts_with("Available Tools (2)"));
        assert!(output.contains("list_buckets"));
        assert!(output.contains("requires: gcs_uri"));
    }

    #[test]
    fn test_format_tools_json() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_tools(&tools())
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[1]["name"], "extract_information");
    }

    #[test]
    fn test_format_tool_result_marks_errors() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let ok = formatter
            .format_tool_result("list_buckets", &json!({"status": "success", "count": 0}))
            .unwrap();
        assert!(ok.starts_with("\u{2705} list_buckets"));

        let failed = formatter
            .format_tool_result("extract_information", &json!({"error": "boom"}))
            .unwrap();
        assert!(failed.starts_with("\u{274C}"));
    }

    #[test]
    fn test_format_reply_yaml() {
        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format_reply(&ChatReply {
                session_id: "s1",
                response: "Done",
            })
            .unwrap();
        assert!(output.contains("session_id: s1"));
        assert!(output.contains("response: Done"));
    }

    #[test]
    fn test_format_preprocess_human() {
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_preprocess(&PreprocessOutcome::Stored {
                source_uri: "gs://uploads/rfp.pdf".to_string(),
                kb_uri: "gs://kb/processed_raw_text/rfp.txt".to_string(),
                characters: 42,
            })
            .unwrap();
        assert!(output.contains("Stored at:  gs://kb/processed_raw_text/rfp.txt"));
        assert!(output.contains("Characters: 42"));
    }
}
