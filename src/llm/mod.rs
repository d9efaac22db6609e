//! LLM client layer: chat transports, per-role endpoint bindings and
//! the structured-completion contract.
//!
//! The engine uses the same completion surface in three roles (planner,
//! observer, narrator); one endpoint may back all of them. Structured
//! output is enforced by a validating deserializer with a single repair
//! retry, so the rest of the crate only ever sees typed records or an
//! explicit `malformed` failure.

mod client;
mod structured;
mod types;

#[cfg(test)]
pub(crate) mod testclient;

pub use client::{AnthropicClient, ChatClient, OpenAiCompatClient};
pub use structured::{extract_json, LlmFailure, RoleEndpoint};
pub use types::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, LlmRole, RoleConfig,
};
