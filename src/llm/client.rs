//! Chat client trait and provider implementations.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{ChatRole, CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};

/// A chat-completion endpoint. The engine talks to it through three
/// role-specific configurations; the transport is shared.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, role: &str, request: CompletionRequest) -> Result<CompletionResponse>;
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

fn transport_error(role: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::llm_timeout(role, 0)
    } else {
        Error::llm_api(role, format!("HTTP request failed: {e}"))
    }
}

/// Client for OpenAI-style `/chat/completions` endpoints, including
/// local servers (Ollama, vLLM) speaking the same protocol.
pub struct OpenAiCompatClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout_secs)?,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait]
impl ChatClient for OpenAiCompatClient {
    async fn complete(&self, role: &str, request: CompletionRequest) -> Result<CompletionResponse> {
        let mut messages: Vec<OpenAiMessage<'_>> = Vec::new();
        if let Some(system) = &request.system {
            messages.push(OpenAiMessage {
                role: "system",
                content: system,
            });
        }
        for message in &request.messages {
            messages.push(OpenAiMessage {
                role: match message.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &message.content,
            });
        }

        let api_request = OpenAiRequest {
            model: &request.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut builder = self.http.post(&url).json(&api_request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(|e| transport_error(role, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::llm_api(role, format!("failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<OpenAiError>(&body) {
                return Err(Error::llm_api(role, error.error.message));
            }
            return Err(Error::llm_api(role, format!("{status}: {body}")));
        }

        let parsed: OpenAiResponse = serde_json::from_str(&body)
            .map_err(|e| Error::llm_api(role, format!("failed to parse response: {e}")))?;
        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| Error::llm_api(role, "no choices in response"))?;

        Ok(CompletionResponse {
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            content,
            input_tokens: parsed.usage.as_ref().and_then(|u| u.prompt_tokens),
            output_tokens: parsed.usage.as_ref().and_then(|u| u.completion_tokens),
        })
    }
}

/// Client for the Anthropic `/v1/messages` endpoint.
pub struct AnthropicClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout_secs)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn complete(&self, role: &str, request: CompletionRequest) -> Result<CompletionResponse> {
        let messages: Vec<AnthropicMessage<'_>> = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: match m.role {
                    ChatRole::Assistant => "assistant",
                    // Anthropic takes the system prompt out of band.
                    ChatRole::User | ChatRole::System => "user",
                },
                content: &m.content,
            })
            .collect();

        let api_request = AnthropicRequest {
            model: &request.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
        };

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| transport_error(role, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::llm_api(role, format!("failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<AnthropicError>(&body) {
                return Err(Error::llm_api(role, error.error.message));
            }
            return Err(Error::llm_api(role, format!("{status}: {body}")));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| Error::llm_api(role, format!("failed to parse response: {e}")))?;
        let content = parsed
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            model: parsed.model,
            content,
            input_tokens: parsed.usage.as_ref().and_then(|u| u.input_tokens),
            output_tokens: parsed.usage.as_ref().and_then(|u| u.output_tokens),
        })
    }
}
