//! Error types for pharmgraph.

use thiserror::Error;

/// Result type alias using pharmgraph's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can terminate a query or prevent engine startup.
///
/// Tool-level failures are not represented here; they are values
/// ([`crate::tools::ToolError`]) routed through the dispatcher so the
/// observer can see them. Only faults of trusted infrastructure (graph
/// store, configuration, the LLM transport itself) surface as `Error`.
#[derive(Error, Debug)]
pub enum Error {
    /// Graph store transport failure (connection refused, pool exhausted)
    #[error("graph store unavailable: {0}")]
    GraphUnavailable(String),

    /// Required table or column missing at startup probe
    #[error("graph schema mismatch: {0}")]
    GraphSchemaMismatch(String),

    /// Graph query failed for a non-transport reason
    #[error("graph query error: {0}")]
    GraphQuery(String),

    /// LLM endpoint error
    #[error("LLM API error ({role}): {message}")]
    LlmApi { role: String, message: String },

    /// LLM call exceeded its timeout
    #[error("LLM call ({role}) timed out after {seconds}s")]
    LlmTimeout { role: String, seconds: u64 },

    /// Planner output failed to parse after the repair retry
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// Observer output failed to parse after the repair retry
    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an LLM API error.
    pub fn llm_api(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmApi {
            role: role.into(),
            message: message.into(),
        }
    }

    /// Create an LLM timeout error.
    pub fn llm_timeout(role: impl Into<String>, seconds: u64) -> Self {
        Self::LlmTimeout {
            role: role.into(),
            seconds,
        }
    }

    /// Stable category string used in logs and in the observer's view.
    pub fn category(&self) -> &'static str {
        match self {
            Self::GraphUnavailable(_) => "graph.unavailable",
            Self::GraphSchemaMismatch(_) => "graph.schema_mismatch",
            Self::GraphQuery(_) => "graph.query",
            Self::LlmApi { .. } => "llm.api",
            Self::LlmTimeout { .. } => "llm.timeout",
            Self::MalformedPlan(_) => "llm.malformed_plan",
            Self::MalformedVerdict(_) => "llm.malformed_verdict",
            Self::Config(_) => "config.invalid",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_stable() {
        assert_eq!(
            Error::GraphUnavailable("down".into()).category(),
            "graph.unavailable"
        );
        assert_eq!(
            Error::GraphSchemaMismatch("no claim table".into()).category(),
            "graph.schema_mismatch"
        );
        assert_eq!(Error::llm_timeout("planner", 60).category(), "llm.timeout");
        assert_eq!(
            Error::MalformedPlan("not json".into()).category(),
            "llm.malformed_plan"
        );
    }

    #[test]
    fn test_display_carries_role() {
        let err = Error::llm_api("observer", "bad gateway");
        assert!(err.to_string().contains("observer"));
        assert!(err.to_string().contains("bad gateway"));
    }
}
