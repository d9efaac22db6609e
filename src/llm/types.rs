//! Chat types and per-role configuration.

use serde::{Deserialize, Serialize};

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Completion request, already bound to a concrete model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub model: String,
    pub content: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// The three roles the engine drives. One endpoint may back all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmRole {
    Planner,
    Observer,
    Narrator,
}

impl LlmRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Observer => "observer",
            Self::Narrator => "narrator",
        }
    }

    /// Planner and observer run cold; the narrator gets a little room.
    pub fn default_temperature(&self) -> f64 {
        match self {
            Self::Planner | Self::Observer => 0.1,
            Self::Narrator => 0.3,
        }
    }

    pub fn default_max_tokens(&self) -> u32 {
        match self {
            Self::Planner => 4_096,
            Self::Observer => 1_024,
            Self::Narrator => 8_192,
        }
    }
}

impl std::fmt::Display for LlmRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Endpoint binding for one role.
#[derive(Debug, Clone)]
pub struct RoleConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl RoleConfig {
    pub fn request(&self, system: impl Into<String>, user: impl Into<String>) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system: Some(system.into()),
            messages: vec![ChatMessage::user(user)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}
