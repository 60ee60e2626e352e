//! Conversation sessions and the memory search over past sessions
//!
//! Each session is one JSON file named after its id. The memory store reads
//! every session in the directory and keyword-matches user and assistant text.

use crate::llm::{ChatMessage, MessageRole};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Values written by the agent, e.g. the last response under the output key
    #[serde(default)]
    pub state: Map<String, Value>,
    /// Conversation history without the system instruction
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Session {
    pub fn new(app_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            app_name: app_name.into(),
            created_at: now,
            updated_at: now,
            state: Map::new(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    pub fn set_state(&mut self, key: &str, value: Value) {
        self.state.insert(key.to_string(), value);
        self.updated_at = Utc::now();
    }

    pub fn state_str(&self, key: &str) -> Option<&str> {
        self.state.get(key).and_then(Value::as_str)
    }
}

/// Sessions persisted as `{dir}/{id}.json`
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create session directory {}", self.dir.display()))?;
        let path = self.path_for(&session.id);
        let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write session {}", path.display()))?;
        debug!(session = %session.id, path = %path.display(), "Saved session");
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<Session> {
        let path = self.path_for(id);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session {}", path.display()))
    }

    /// All readable sessions, newest first. Unparseable files are skipped.
    pub fn list(&self) -> Result<Vec<Session>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list sessions in {}", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|c| serde_json::from_str::<Session>(&c).map_err(anyhow::Error::from));
            match parsed {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session"),
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryEntry {
    pub session_id: String,
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

const MAX_MEMORIES: usize = 20;

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Keyword search across the user and assistant messages of stored sessions
#[derive(Debug, Clone)]
pub struct MemoryStore {
    sessions: SessionStore,
}

impl MemoryStore {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    pub fn search(&self, query: &str) -> Result<Vec<MemoryEntry>> {
        let query_words = words(query);
        if query_words.is_empty() {
            return Ok(Vec::new());
        }

        let mut memories = Vec::new();
        for session in self.sessions.list()? {
            for message in session.messages.iter().filter(|m| m.is_conversational()) {
                if words(&message.content).is_disjoint(&query_words) {
                    continue;
                }
                memories.push(MemoryEntry {
                    session_id: session.id.clone(),
                    author: match message.role {
                        MessageRole::User => "user".to_string(),
                        _ => session.app_name.clone(),
                    },
                    text: message.content.clone(),
                    timestamp: session.updated_at,
                });
                if memories.len() >= MAX_MEMORIES {
                    return Ok(memories);
                }
            }
        }

        debug!(query, matches = memories.len(), "Searched memory");
        Ok(memories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("sessions"));

        let mut session = Session::new("ur_agent");
        session.push(ChatMessage::user("Extract requirements from gs://docs/rfp.pdf"));
        session.set_state("last_response", json!("Done"));
        store.save(&session).unwrap();

        let loaded = store.load(&session.id).unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.state_str("last_response"), Some("Done"));
    }

    #[test]
    fn test_list_skips_garbage_and_missing_dir() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("missing"));
        assert!(store.list().unwrap().is_empty());

        let store = SessionStore::new(temp.path());
        fs::write(temp.path().join("broken.json"), "{not json").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        store.save(&Session::new("ur_agent")).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_memory_search_matches_keywords() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());

        let mut first = Session::new("ur_agent");
        first.push(ChatMessage::user("Generate requirements for the Billing module"));
        first.push(ChatMessage::assistant("📝 Created USR0001 for billing exports"));
        first.push(ChatMessage::tool_response("c1", &json!({"billing": true})));
        store.save(&first).unwrap();

        let mut second = Session::new("ur_agent");
        second.push(ChatMessage::user("List my buckets"));
        store.save(&second).unwrap();

        let memory = MemoryStore::new(store);
        let found = memory.search("billing").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.session_id == first.id));
        assert_eq!(found[0].author, "user");
        assert_eq!(found[1].author, "ur_agent");

        assert!(memory.search("   ").unwrap().is_empty());
        assert!(memory.search("kubernetes").unwrap().is_empty());
    }
}
