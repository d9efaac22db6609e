//! Structured completion: the contract surface between the engine and
//! an untrusted text generator.
//!
//! The generator's output must parse (and validate) as the declared
//! record. On failure the endpoint retries once with a repair
//! instruction quoting the unusable reply; a second failure surfaces as
//! [`LlmFailure::Malformed`] for the orchestrator's error policy to
//! handle. Transport faults and timeouts are fatal and never retried
//! here.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::timeout;

use super::client::ChatClient;
use super::types::{LlmRole, RoleConfig};
use crate::error::{Error, Result};

/// Failure modes of a structured completion.
#[derive(Debug)]
pub enum LlmFailure {
    /// Output stayed unparseable after the repair retry.
    Malformed(String),
    /// Transport fault or timeout; not repairable.
    Fatal(Error),
}

/// One role's client plus its endpoint binding.
#[derive(Clone)]
pub struct RoleEndpoint {
    pub role: LlmRole,
    pub config: RoleConfig,
    client: Arc<dyn ChatClient>,
}

impl RoleEndpoint {
    pub fn new(role: LlmRole, config: RoleConfig, client: Arc<dyn ChatClient>) -> Self {
        Self {
            role,
            config,
            client,
        }
    }

    /// Plain-text completion with the role's timeout applied.
    pub async fn complete_text(&self, system: &str, user: &str) -> Result<String> {
        let request = self.config.request(system, user);
        let response = timeout(
            Duration::from_secs(self.config.timeout_secs),
            self.client.complete(self.role.as_str(), request),
        )
        .await
        .map_err(|_| Error::llm_timeout(self.role.as_str(), self.config.timeout_secs))??;
        Ok(response.content)
    }

    /// Structured completion: parse the reply as `T`, validate it, and
    /// retry once with a repair instruction if either step fails.
    pub async fn complete_structured<T, V>(
        &self,
        system: &str,
        user: &str,
        schema_hint: &str,
        validate: V,
    ) -> std::result::Result<T, LlmFailure>
    where
        T: DeserializeOwned,
        V: Fn(&T) -> std::result::Result<(), String>,
    {
        let first = self
            .complete_text(system, user)
            .await
            .map_err(LlmFailure::Fatal)?;
        let first_failure = match parse_and_validate(&first, &validate) {
            Ok(value) => return Ok(value),
            Err(detail) => detail,
        };

        tracing::warn!(
            role = %self.role,
            detail = %first_failure,
            "structured output unusable, retrying with repair instruction"
        );
        let repair_user = format!(
            "{user}\n\nYour previous reply could not be used: {first_failure}.\n\
             Previous reply:\n{first}\n\n\
             Respond with ONLY a JSON object matching this schema:\n{schema_hint}"
        );
        let second = self
            .complete_text(system, &repair_user)
            .await
            .map_err(LlmFailure::Fatal)?;
        parse_and_validate(&second, &validate).map_err(LlmFailure::Malformed)
    }
}

fn parse_and_validate<T, V>(reply: &str, validate: &V) -> std::result::Result<T, String>
where
    T: DeserializeOwned,
    V: Fn(&T) -> std::result::Result<(), String>,
{
    let json = extract_json(reply).ok_or_else(|| "no JSON object found".to_string())?;
    let value: T = serde_json::from_str(&json).map_err(|e| format!("JSON does not match schema: {e}"))?;
    validate(&value)?;
    Ok(value)
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("static regex"))
}

/// Pull the first JSON object out of an LLM reply: a fenced block if
/// present, otherwise the first balanced `{...}` span.
pub fn extract_json(text: &str) -> Option<String> {
    if let Some(captures) = fence_regex().captures(text) {
        return Some(captures[1].to_string());
    }

    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
