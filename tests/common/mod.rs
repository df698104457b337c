use async_trait::async_trait;
use melissa::error::Result;
use melissa::providers::{CompletionResponse, FunctionCall, Message, Provider, ToolCall};
use melissa::storage::NoteStore;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_store() -> (NoteStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("notes.db");
    let store = NoteStore::new_with_path(db_path).expect("failed to create note store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn tool_call(name: &str, query: &str) -> ToolCall {
    ToolCall {
        id: None,
        function: FunctionCall {
            name: name.to_string(),
            arguments: serde_json::json!({ "query": query }).to_string(),
        },
    }
}

/// Provider that replays scripted replies and records every request
#[allow(dead_code)]
#[derive(Clone)]
pub struct ScriptedProvider {
    replies: Vec<Message>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(messages.to_vec());
            requests.len() - 1
        };
        let reply = self
            .replies
            .get(index)
            .cloned()
            .unwrap_or_else(|| Message::assistant("Done"));
        Ok(CompletionResponse::new(reply))
    }
}
