//! Interchange records between the LLM roles, the dispatcher and the
//! orchestrator.
//!
//! Everything the planner or observer produces is deserialized into one
//! of these declared records; no string-addressed structures survive
//! past the parsing boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool call requested by the planner. The tool name is kept as a
/// raw string here; the dispatcher checks it against the closed enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ToolCallRequest {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            tool: tool.into(),
            arguments,
            reason: None,
        }
    }
}

/// Explicit planner stop signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSignal {
    /// Enough evidence has been gathered; skip straight to narration.
    SufficientInformation,
    /// No catalog tool can make progress on this query.
    NoRelevantTools,
}

/// An ordered, single-use sequence of tool calls with an optional stop
/// signal. A plan with neither calls nor a stop signal is malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPlan {
    #[serde(default)]
    pub calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSignal>,
}

impl ToolPlan {
    /// Structural validity, checked after parsing (a repair retry is
    /// triggered on failure).
    pub fn validate(&self) -> Result<(), String> {
        if self.calls.is_empty() && self.stop.is_none() {
            return Err("plan has no tool calls and no stop signal".into());
        }
        Ok(())
    }
}

/// Outcome of one dispatched call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok,
    Error { category: String, message: String },
}

impl ToolOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// One executed (or synthetically failed) tool call, as the observer
/// sees it: arguments echoed, payload already shaped and truncated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub arguments: Value,
    pub outcome: ToolOutcome,
    pub payload: Value,
    pub summary: String,
}

impl ToolResult {
    pub fn ok(tool: &str, arguments: Value, payload: Value, summary: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            arguments,
            outcome: ToolOutcome::Ok,
            payload,
            summary: summary.into(),
        }
    }

    /// Synthetic error result; the plan continues after it.
    pub fn error(
        tool: &str,
        arguments: Value,
        category: &str,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            tool: tool.to_string(),
            arguments,
            outcome: ToolOutcome::Error {
                category: category.to_string(),
                message: message.clone(),
            },
            payload: Value::Null,
            summary: format!("error ({category}): {message}"),
        }
    }
}

/// The observer's classification of the evidence gathered so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SufficiencyStatus {
    Sufficient,
    PartiallySufficient,
    Insufficient,
}

fn default_priority() -> u8 {
    2
}

/// A missing piece of evidence the observer wants filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceGap {
    pub category: String,
    pub description: String,
    /// 1 (highest) to 3.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_tool: Option<String>,
}

/// The observer's verdict for one iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SufficiencyVerdict {
    pub status: SufficiencyStatus,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub gaps: Vec<EvidenceGap>,
    #[serde(default)]
    pub can_answer: bool,
}

impl SufficiencyVerdict {
    /// Whether the orchestrator should move to narration.
    pub fn ready_to_answer(&self) -> bool {
        match self.status {
            SufficiencyStatus::Sufficient => true,
            SufficiencyStatus::PartiallySufficient => self.can_answer,
            SufficiencyStatus::Insufficient => false,
        }
    }

    /// Structural validity, checked after parsing.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence must be within [0, 1], got {}",
                self.confidence
            ));
        }
        if let Some(gap) = self.gaps.iter().find(|g| !(1..=3).contains(&g.priority)) {
            return Err(format!("gap priority out of range: {}", gap.priority));
        }
        Ok(())
    }
}
