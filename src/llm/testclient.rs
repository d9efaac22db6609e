//! Scripted [`ChatClient`] used across the test suite.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::client::ChatClient;
use super::types::{CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};

/// One recorded call made through the scripted client.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub role: String,
    pub system: String,
    pub user: String,
}

/// Replays a queue of canned replies and records every request.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, reply: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: Error) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made for one role only.
    pub fn calls_for(&self, role: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.role == role)
            .collect()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(&self, role: &str, request: CompletionRequest) -> Result<CompletionResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            role: role.to_string(),
            system: request.system.clone().unwrap_or_default(),
            user: request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        });
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::llm_api(role, "scripted client exhausted")));
        next.map(|content| CompletionResponse {
            model: request.model,
            content,
            input_tokens: None,
            output_tokens: None,
        })
    }
}
