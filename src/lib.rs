//! # pharmgraph
//!
//! Evidence-grounded pharmacovigilance question answering over a curated
//! knowledge graph. A ReAct-style loop alternates LLM-produced tool
//! plans, deterministic graph-tool execution and LLM-produced
//! sufficiency judgements until the question is answerable; the final
//! narrative can only cite data the tools actually observed.
//!
//! ## Core components
//!
//! - **graph**: read-only typed gateway to the property-graph store
//! - **tools**: the closed catalog of 21 traversal/resolution/ranking tools
//! - **scoring**: the mechanistic-path scoring policy
//! - **dispatch**: allow-list validation, execution and result shaping
//! - **evidence**: the per-query accumulator behind every citation
//! - **llm**: role-bound chat clients with structured-output repair
//! - **orchestrator**: the per-query state machine and public entry point
//!
//! ## Example
//!
//! ```rust,ignore
//! use pharmgraph::{Engine, EngineConfig, QueryOptions};
//!
//! let config = EngineConfig::from_env()?;
//! let engine = Engine::connect(config).await?;
//!
//! let response = engine
//!     .run_query("Why might lisinopril cause cough?", QueryOptions::default())
//!     .await?;
//! println!("{}", response.summary);
//! for path in response.paths.unwrap_or_default() {
//!     println!("{} (score {:.3})", path.signature(), path.score);
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod evidence;
pub mod graph;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod protocol;
pub mod scoring;
pub mod tools;

// Re-exports for convenience
pub use config::{EngineConfig, GraphConfig, ProviderKind};
pub use dispatch::{DispatchError, DispatchReport, Dispatcher};
pub use error::{Error, Result};
pub use evidence::{EvidencePack, EvidenceSummary, ToolLogEntry};
pub use graph::{EntityKind, GraphStore, PgGraphStore};
pub use llm::{
    AnthropicClient, ChatClient, ChatMessage, ChatRole, CompletionRequest, CompletionResponse,
    LlmFailure, LlmRole, OpenAiCompatClient, RoleConfig, RoleEndpoint,
};
pub use orchestrator::{
    CompletionReason, Engine, IterationLog, QueryOptions, QueryResponse,
};
pub use protocol::{
    EvidenceGap, StopSignal, SufficiencyStatus, SufficiencyVerdict, ToolCallRequest, ToolOutcome,
    ToolPlan, ToolResult,
};
pub use scoring::{EdgeWeights, ScoringPolicy};
pub use tools::{
    ClaimEvidenceBundle, DrugProfile, EdgeKind, GeneContext, MechanismExpansion, MechanisticPath,
    PathStep, ResolvedEntity, Subgraph, SubgraphEdge, SubgraphNode, ToolError, ToolLibrary,
    ToolName, ToolOutput,
};
