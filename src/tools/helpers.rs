//! Argument accessors and the `{"status": ...}` result records shared by the
//! cloud tools

use anyhow::{anyhow, Result};
use serde_json::{json, Map, Value};
use std::fmt::Display;
use tracing::warn;

pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing '{}' parameter", key))
}

/// Absent, null and empty strings all read as `None`
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args[key].as_str().filter(|s| !s.trim().is_empty())
}

pub fn optional_u32(args: &Value, key: &str, default: u32) -> Result<u32> {
    match &args[key] {
        Value::Null => Ok(default),
        value => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| anyhow!("'{}' must be a non-negative integer", key)),
    }
}

pub fn string_list(args: &Value, key: &str) -> Result<Vec<String>> {
    match &args[key] {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("'{}' must contain only strings", key))
            })
            .collect(),
        _ => Err(anyhow!("Missing '{}' parameter", key)),
    }
}

/// `{"status": "success"}` merged with the fields of `payload`
pub fn success(payload: Value) -> Value {
    let mut record = Map::new();
    record.insert("status".to_string(), json!("success"));
    if let Value::Object(fields) = payload {
        record.extend(fields);
    }
    Value::Object(record)
}

pub fn failure(tool: &str, error: impl Display) -> Value {
    let message = error.to_string();
    warn!(tool, error = %message, "Cloud call failed");
    json!({ "status": "error", "error_message": message })
}
