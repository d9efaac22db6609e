//! The ReAct orchestrator: plan → dispatch → observe, looped until the
//! evidence suffices or the iteration budget runs out, then narrate.
//!
//! State machine per query: `init → plan → dispatch → observe →
//! {plan | narrate | abort}`. Narration is terminal; the loop never
//! re-enters planning afterwards. Cancellation is cooperative and
//! checked between transitions, never mid-tool. Full tool payloads are
//! only ever shown to the observer in the iteration that produced them;
//! later planner prompts get a compact digest plus the resolved-entity
//! maps verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{EngineConfig, ProviderKind};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::{Error, Result};
use crate::evidence::{EvidencePack, EvidenceSummary};
use crate::graph::{GraphStore, PgGraphStore};
use crate::llm::{
    AnthropicClient, ChatClient, LlmFailure, LlmRole, OpenAiCompatClient, RoleConfig,
    RoleEndpoint,
};
use crate::prompts::{PromptCatalog, PLAN_SCHEMA, VERDICT_SCHEMA};
use crate::protocol::{
    EvidenceGap, StopSignal, SufficiencyVerdict, ToolCallRequest, ToolPlan, ToolResult,
};
use crate::scoring::ScoringPolicy;
use crate::tools::{MechanisticPath, Subgraph, ToolLibrary};

/// Character budget for the rolling prompt digest.
const PROMPT_DIGEST_CHARS: usize = 4_000;

/// Why a query finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Sufficient,
    MaxIterations,
    PlannerStop,
    Cancelled,
    Error,
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sufficient => "sufficient",
            Self::MaxIterations => "max_iterations",
            Self::PlannerStop => "planner_stop",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Per-iteration trace entry. The caller can reconstruct exactly which
/// tools ran with which arguments from these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationLog {
    pub iteration: u32,
    pub planned: Vec<ToolCallRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSignal>,
    pub results: Vec<ToolResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<SufficiencyVerdict>,
    pub digest: String,
}

/// Per-query options for [`Engine::run_query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Overrides the configured iteration ceiling (clamped to 1..=10).
    pub max_iterations: Option<u32>,
    pub cancel: Option<CancellationToken>,
}

/// The assembled answer for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query_id: Uuid,
    pub query: String,
    pub summary: String,
    pub subgraph: Option<Subgraph>,
    pub paths: Option<Vec<MechanisticPath>>,
    pub evidence: EvidenceSummary,
    pub trace: Vec<IterationLog>,
    pub completion_reason: CompletionReason,
    pub completed_at: DateTime<Utc>,
}

/// The query engine: shared, read-only, safe to drive from many
/// concurrent queries. All per-query state lives in the accumulator.
pub struct Engine {
    config: EngineConfig,
    dispatcher: Dispatcher,
    planner: RoleEndpoint,
    observer: RoleEndpoint,
    narrator: RoleEndpoint,
    prompts: PromptCatalog,
    scoring: ScoringPolicy,
}

impl Engine {
    /// Connect to the graph store (running the schema probe) and bind
    /// the configured LLM endpoints.
    pub async fn connect(config: EngineConfig) -> Result<Self> {
        let store: Arc<dyn GraphStore> = Arc::new(PgGraphStore::connect(&config.graph).await?);

        let client_for = |role_config: &RoleConfig| -> Result<Arc<dyn ChatClient>> {
            Ok(match config.provider {
                ProviderKind::OpenAiCompat => Arc::new(OpenAiCompatClient::new(
                    &role_config.base_url,
                    config.api_key.clone(),
                    role_config.timeout_secs,
                )?),
                ProviderKind::Anthropic => {
                    let api_key = config.api_key.clone().ok_or_else(|| {
                        Error::Config("an API key is required for the anthropic provider".into())
                    })?;
                    Arc::new(AnthropicClient::new(
                        &role_config.base_url,
                        api_key,
                        role_config.timeout_secs,
                    )?)
                }
            })
        };

        let planner = client_for(&config.planner)?;
        let observer = client_for(&config.observer)?;
        let narrator = client_for(&config.narrator)?;
        Ok(Self::assemble(config, store, planner, observer, narrator))
    }

    /// Build an engine from pre-constructed parts. The seam used when
    /// embedding, and by the test suite.
    pub fn with_parts(
        config: EngineConfig,
        store: Arc<dyn GraphStore>,
        client: Arc<dyn ChatClient>,
    ) -> Self {
        Self::assemble(config, store, client.clone(), client.clone(), client)
    }

    fn assemble(
        config: EngineConfig,
        store: Arc<dyn GraphStore>,
        planner_client: Arc<dyn ChatClient>,
        observer_client: Arc<dyn ChatClient>,
        narrator_client: Arc<dyn ChatClient>,
    ) -> Self {
        let tools = Arc::new(ToolLibrary::new(store, config.scoring.clone()));
        let dispatcher = Dispatcher::new(
            tools,
            config.truncation_cap,
            Duration::from_secs(config.tool_timeout_secs),
        );
        Self {
            dispatcher,
            planner: RoleEndpoint::new(LlmRole::Planner, config.planner.clone(), planner_client),
            observer: RoleEndpoint::new(
                LlmRole::Observer,
                config.observer.clone(),
                observer_client,
            ),
            narrator: RoleEndpoint::new(
                LlmRole::Narrator,
                config.narrator.clone(),
                narrator_client,
            ),
            prompts: PromptCatalog::new(),
            scoring: config.scoring.clone(),
            config,
        }
    }

    /// Run one query to completion.
    ///
    /// Mid-query infrastructure failures produce an `Ok` response with
    /// `completion_reason = error` carrying the partial evidence and the
    /// full trace; only startup problems return `Err`.
    pub async fn run_query(&self, query: &str, options: QueryOptions) -> Result<QueryResponse> {
        let query_id = Uuid::new_v4();
        let max_iterations = options
            .max_iterations
            .unwrap_or(self.config.max_iterations)
            .clamp(1, 10);
        let cancel = options.cancel.unwrap_or_default();

        let mut pack = EvidencePack::new(query);
        let mut trace: Vec<IterationLog> = Vec::new();
        let mut gaps: Vec<EvidenceGap> = Vec::new();
        let mut reason = CompletionReason::MaxIterations;
        let mut error_note: Option<String> = None;

        tracing::info!(%query_id, max_iterations, "query started");

        for iteration in 1..=max_iterations {
            if cancel.is_cancelled() {
                reason = CompletionReason::Cancelled;
                break;
            }

            // PLAN
            let digest = pack.summarize_for_prompt(PROMPT_DIGEST_CHARS);
            let digest_ref = (!digest.is_empty()).then_some(digest.as_str());
            let plan = match self.plan(query, digest_ref, &gaps).await {
                Ok(plan) => plan,
                Err(LlmFailure::Malformed(detail)) => {
                    reason = CompletionReason::Error;
                    error_note = Some(Error::MalformedPlan(detail).to_string());
                    break;
                }
                Err(LlmFailure::Fatal(e)) => {
                    reason = CompletionReason::Error;
                    error_note = Some(e.to_string());
                    break;
                }
            };

            if let Some(stop) = plan.stop {
                tracing::info!(%query_id, iteration, ?stop, "planner stop signal");
                trace.push(IterationLog {
                    iteration,
                    planned: plan.calls.clone(),
                    stop: Some(stop),
                    results: Vec::new(),
                    verdict: None,
                    digest: format!("Iteration {iteration}: planner stopped ({stop:?})"),
                });
                reason = CompletionReason::PlannerStop;
                break;
            }

            if cancel.is_cancelled() {
                reason = CompletionReason::Cancelled;
                break;
            }

            // DISPATCH
            let report = self
                .dispatcher
                .dispatch(iteration, &plan, &mut pack, &cancel)
                .await;
            if report.cancelled {
                trace.push(self.log_iteration(iteration, &plan, &report, None, &mut pack));
                reason = CompletionReason::Cancelled;
                break;
            }
            if let Some(fatal) = &report.fatal {
                error_note = Some(fatal.to_string());
                trace.push(self.log_iteration(iteration, &plan, &report, None, &mut pack));
                reason = CompletionReason::Error;
                break;
            }

            if cancel.is_cancelled() {
                trace.push(self.log_iteration(iteration, &plan, &report, None, &mut pack));
                reason = CompletionReason::Cancelled;
                break;
            }

            // OBSERVE
            let verdict = match self.observe(query, &report.results).await {
                Ok(verdict) => Some(verdict),
                Err(LlmFailure::Malformed(detail)) => {
                    // Treated as insufficient; loop again if budget remains.
                    tracing::warn!(%query_id, iteration, %detail, "malformed verdict");
                    None
                }
                Err(LlmFailure::Fatal(e)) => {
                    error_note = Some(e.to_string());
                    trace.push(self.log_iteration(iteration, &plan, &report, None, &mut pack));
                    reason = CompletionReason::Error;
                    break;
                }
            };

            let log = self.log_iteration(iteration, &plan, &report, verdict.clone(), &mut pack);
            trace.push(log);

            match &verdict {
                Some(v) if v.ready_to_answer() => {
                    reason = CompletionReason::Sufficient;
                    break;
                }
                Some(v) => {
                    gaps = v.gaps.clone();
                }
                None => gaps.clear(),
            }
        }

        // NARRATE (or abort with what exists)
        let best_effort = reason == CompletionReason::MaxIterations;
        let summary = match reason {
            CompletionReason::Error => {
                let note = error_note.unwrap_or_else(|| "unknown failure".into());
                tracing::warn!(%query_id, %note, "query ended with error");
                format!("The query could not be completed: {note}. Partial evidence is attached.")
            }
            CompletionReason::Cancelled => {
                "The query was cancelled before completion. Partial evidence is attached."
                    .to_string()
            }
            _ => match self.narrate(query, &pack, best_effort).await {
                Ok(text) => text,
                Err(e) => {
                    reason = CompletionReason::Error;
                    format!(
                        "The answer could not be narrated: {e}. Partial evidence is attached."
                    )
                }
            },
        };

        let mut paths = pack.paths();
        self.scoring.rank(&mut paths);

        tracing::info!(%query_id, %reason, iterations = trace.len(), "query finished");
        Ok(QueryResponse {
            query_id,
            query: query.to_string(),
            summary,
            subgraph: pack.subgraph(),
            paths: (!paths.is_empty()).then_some(paths),
            evidence: pack.summary(),
            trace,
            completion_reason: reason,
            completed_at: Utc::now(),
        })
    }

    async fn plan(
        &self,
        query: &str,
        digest: Option<&str>,
        gaps: &[EvidenceGap],
    ) -> std::result::Result<ToolPlan, LlmFailure> {
        self.planner
            .complete_structured(
                &self.prompts.planner_system(),
                &self.prompts.planner_user(query, digest, gaps),
                PLAN_SCHEMA,
                |plan: &ToolPlan| plan.validate(),
            )
            .await
    }

    async fn observe(
        &self,
        query: &str,
        results: &[ToolResult],
    ) -> std::result::Result<SufficiencyVerdict, LlmFailure> {
        self.observer
            .complete_structured(
                &self.prompts.observer_system(),
                &self.prompts.observer_user(query, results),
                VERDICT_SCHEMA,
                |verdict: &SufficiencyVerdict| verdict.validate(),
            )
            .await
    }

    async fn narrate(&self, query: &str, pack: &EvidencePack, best_effort: bool) -> Result<String> {
        self.narrator
            .complete_text(
                &self.prompts.narrator_system(),
                &self
                    .prompts
                    .narrator_user(query, &pack.summarize_for_prompt(PROMPT_DIGEST_CHARS), best_effort),
            )
            .await
    }

    fn log_iteration(
        &self,
        iteration: u32,
        plan: &ToolPlan,
        report: &DispatchReport,
        verdict: Option<SufficiencyVerdict>,
        pack: &mut EvidencePack,
    ) -> IterationLog {
        let calls: Vec<String> = report
            .results
            .iter()
            .map(|r| format!("{}→{}", r.tool, r.summary))
            .collect();
        let observation = match &verdict {
            Some(v) => format!(
                "{:?} (confidence {:.2}, {} gap(s))",
                v.status,
                v.confidence,
                v.gaps.len()
            ),
            None => "verdict unavailable".to_string(),
        };
        let digest = format!(
            "Iteration {iteration}: called {}; observation: {observation}",
            calls.join("; ")
        );
        pack.push_digest(digest.clone());
        IterationLog {
            iteration,
            planned: plan.calls.clone(),
            stop: plan.stop,
            results: report.results.clone(),
            verdict,
            digest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::testgraph::{FailureMode, TestGraph};
    use crate::llm::testclient::ScriptedClient;
    use crate::graph::EntityKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test_config() -> EngineConfig {
        let role = |role: LlmRole| RoleConfig {
            base_url: "http://localhost:11434/v1".into(),
            model: "test-model".into(),
            temperature: role.default_temperature(),
            max_tokens: role.default_max_tokens(),
            timeout_secs: 5,
        };
        EngineConfig {
            graph: GraphConfig {
                host: "localhost".into(),
                port: 5432,
                database: "test".into(),
                user: "test".into(),
                password: "test".into(),
                pool_size: 1,
                connect_timeout_secs: 1,
            },
            provider: ProviderKind::OpenAiCompat,
            api_key: None,
            planner: role(LlmRole::Planner),
            observer: role(LlmRole::Observer),
            narrator: role(LlmRole::Narrator),
            max_iterations: 3,
            tool_timeout_secs: 5,
            truncation_cap: 30,
            scoring: ScoringPolicy::default(),
        }
    }

    fn engine(graph: TestGraph, client: Arc<ScriptedClient>) -> Engine {
        Engine::with_parts(test_config(), Arc::new(graph), client)
    }

    fn plan_reply(calls: serde_json::Value) -> String {
        json!({ "calls": calls }).to_string()
    }

    fn verdict_reply(status: &str, can_answer: bool, gaps: serde_json::Value) -> String {
        json!({
            "status": status,
            "confidence": 0.9,
            "reasoning": "test",
            "gaps": gaps,
            "can_answer": can_answer,
        })
        .to_string()
    }

    /// Seed scenario 1: single-drug adverse-event lookup over 84 label
    /// AEs.
    #[tokio::test]
    async fn test_single_drug_ae_lookup() {
        let mut graph = TestGraph::seeded();
        for i in 0..80 {
            graph.add_label_ae(14042, 600 + i, &format!("Reaction {i}"), 0.003 + i as f64 / 1e3);
        }
        let client = Arc::new(ScriptedClient::new());
        client.push_text(plan_reply(json!([
            {"tool": "resolve_drugs", "arguments": {"names": ["lisinopril"]},
             "reason": "identify the drug"},
            {"tool": "get_drug_adverse_events",
             "arguments": {"drug_key": 14042, "limit": 200}}
        ])));
        client.push_text(verdict_reply("sufficient", true, json!([])));
        client.push_text("lisinopril (key 14042) is associated with 84 label adverse events.");

        let engine = engine(graph, client.clone());
        let response = engine
            .run_query("What adverse events does lisinopril cause?", QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.completion_reason, CompletionReason::Sufficient);
        assert!(response.paths.is_none());
        assert_eq!(response.evidence.adverse_events.len(), 84);
        assert_eq!(response.trace.len(), 1);
        assert!(response.trace[0].results.iter().all(|r| r.outcome.is_ok()));
        // One planner, one observer, one narrator call; never re-plans
        // after narration.
        assert_eq!(client.calls_for("planner").len(), 1);
        assert_eq!(client.calls_for("observer").len(), 1);
        assert_eq!(client.calls_for("narrator").len(), 1);
    }

    /// Seed scenario 2: mechanistic explanation outranks the weak direct
    /// association, reached through a gap-driven second iteration.
    #[tokio::test]
    async fn test_drug_ae_mechanism() {
        let client = Arc::new(ScriptedClient::new());
        client.push_text(plan_reply(json!([
            {"tool": "resolve_drugs", "arguments": {"names": ["lisinopril"]}},
            {"tool": "resolve_adverse_events", "arguments": {"terms": ["Cough"]}}
        ])));
        client.push_text(verdict_reply(
            "insufficient",
            false,
            json!([{"category": "mechanism",
                    "description": "no mechanistic path between drug and adverse event",
                    "priority": 1, "suggested_tool": "find_drug_to_ae_paths"}]),
        ));
        client.push_text(plan_reply(json!([
            {"tool": "find_drug_to_ae_paths",
             "arguments": {"drug_key": 14042, "ae_key": 501, "max_paths": 10}}
        ])));
        client.push_text(verdict_reply("sufficient", true, json!([])));
        client.push_text("The ACE-mediated pathway explains the cough signal.");

        let engine = engine(TestGraph::seeded(), client.clone());
        let response = engine
            .run_query("Why might lisinopril cause cough?", QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.completion_reason, CompletionReason::Sufficient);
        assert_eq!(response.trace.len(), 2);

        let paths = response.paths.as_ref().unwrap();
        let top = &paths[0];
        let kinds: Vec<EntityKind> = top.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![EntityKind::Drug, EntityKind::Gene, EntityKind::Pathway]
        );
        assert!((top.score - 0.8 * 0.95 * 0.95 * 1.2).abs() < 1e-9);
        let direct = paths
            .iter()
            .find(|p| p.steps.len() == 2)
            .expect("direct path retained");
        assert!((direct.score - 0.0475).abs() < 1e-9);

        // The gap was folded into the second planner prompt.
        let planner_calls = client.calls_for("planner");
        assert_eq!(planner_calls.len(), 2);
        assert!(planner_calls[1].user.contains("mechanism"));
        assert!(planner_calls[1].user.contains("find_drug_to_ae_paths"));
        // Resolved keys are carried verbatim into the next prompt.
        assert!(planner_calls[1].user.contains("key 14042"));
    }

    /// Seed scenario 3: shared target across multiple drugs; the common
    /// gene must land in the evidence even without an intersection tool.
    #[tokio::test]
    async fn test_shared_targets_across_drugs() {
        let mut graph = TestGraph::new();
        graph.add_drug(1, "alpha", &[]);
        graph.add_drug(2, "beta", &[]);
        graph.add_drug(3, "gamma", &[]);
        // Using the builder directly keeps the fixture focused: one
        // shared gene plus a private one per drug.
        for (drug, private_gene, claim) in [(1, 101, 3001), (2, 102, 3002), (3, 103, 3003)] {
            graph.add_claim(claim, "DRUG_TARGET", Some(0.7), "drugcentral", &[claim + 500]);
            graph.push_drug_target(drug, private_gene, claim);
            let shared_claim = claim + 10;
            graph.add_claim(shared_claim, "DRUG_TARGET", Some(0.9), "drugcentral", &[
                shared_claim + 500,
            ]);
            graph.push_drug_target(drug, 99, shared_claim);
        }
        graph.add_gene(99, "SHRD1");
        graph.add_gene(101, "PRIV1");
        graph.add_gene(102, "PRIV2");
        graph.add_gene(103, "PRIV3");

        let client = Arc::new(ScriptedClient::new());
        client.push_text(plan_reply(json!([
            {"tool": "resolve_drugs", "arguments": {"names": ["alpha", "beta", "gamma"]}},
            {"tool": "get_drug_targets", "arguments": {"drug_key": 1}},
            {"tool": "get_drug_targets", "arguments": {"drug_key": 2}},
            {"tool": "get_drug_targets", "arguments": {"drug_key": 3}}
        ])));
        client.push_text(verdict_reply(
            "partially_sufficient",
            true,
            json!([{"category": "tooling",
                    "description": "no dedicated target-intersection tool; intersection read from listings",
                    "priority": 2}]),
        ));
        client.push_text("All three drugs share the target SHRD1 (key 99).");

        let engine = engine(graph, client);
        let response = engine
            .run_query(
                "Which target do alpha, beta and gamma share?",
                QueryOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.completion_reason, CompletionReason::Sufficient);
        assert!(response.trace.len() <= 3);
        assert_eq!(response.evidence.genes.get("SHRD1"), Some(&99));
    }

    /// Seed scenario 4: unknown entity; no fabricated key may appear.
    #[tokio::test]
    async fn test_unknown_entity_yields_no_evidence() {
        let client = Arc::new(ScriptedClient::new());
        client.push_text(plan_reply(json!([
            {"tool": "resolve_drugs", "arguments": {"names": ["zaldrafex"]}}
        ])));
        client.push_text(verdict_reply(
            "insufficient",
            false,
            json!([{"category": "resolution",
                    "description": "the drug is absent from the graph", "priority": 1}]),
        ));
        client.push_text(json!({"calls": [], "stop": "no_relevant_tools"}).to_string());
        client.push_text(
            "No evidence was found: zaldrafex is not present in the knowledge graph.",
        );

        let engine = engine(TestGraph::seeded(), client);
        let response = engine
            .run_query("Does zaldrafex target ACE?", QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.completion_reason, CompletionReason::PlannerStop);
        assert!(response.summary.contains("No evidence"));
        assert!(response.evidence.drugs.is_empty());
        let resolution = &response.trace[0].results[0];
        assert!(resolution.payload["entities"]["zaldrafex"].is_null());
    }

    /// Seed scenario 5: invalid planner JSON is repaired by one retry.
    #[tokio::test]
    async fn test_malformed_plan_repair() {
        let client = Arc::new(ScriptedClient::new());
        client.push_text("I think we should look at the drug first!");
        client.push_text(plan_reply(json!([
            {"tool": "resolve_drugs", "arguments": {"names": ["lisinopril"]}}
        ])));
        client.push_text(verdict_reply("sufficient", true, json!([])));
        client.push_text("lisinopril resolved to key 14042.");

        let engine = engine(TestGraph::seeded(), client.clone());
        let response = engine
            .run_query("Is lisinopril in the graph?", QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.completion_reason, CompletionReason::Sufficient);
        assert_eq!(client.calls_for("planner").len(), 2);
        assert_eq!(response.trace.len(), 1);
    }

    /// Seed scenario 6: the observer never relents; the budget caps the
    /// loop and narration is best-effort.
    #[tokio::test]
    async fn test_iteration_budget_exhausted() {
        let client = Arc::new(ScriptedClient::new());
        for _ in 0..3 {
            client.push_text(plan_reply(json!([
                {"tool": "get_drug_targets", "arguments": {"drug_key": 14042}}
            ])));
            client.push_text(verdict_reply(
                "insufficient",
                false,
                json!([{"category": "coverage", "description": "want more", "priority": 2}]),
            ));
        }
        client.push_text("Best effort: lisinopril targets ACE.");

        let engine = engine(TestGraph::seeded(), client.clone());
        let response = engine
            .run_query("Everything about lisinopril?", QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.completion_reason, CompletionReason::MaxIterations);
        assert_eq!(response.trace.len(), 3);
        assert_eq!(client.calls_for("planner").len(), 3);
        assert!(!response.evidence.genes.is_empty());
        let narrator_calls = client.calls_for("narrator");
        assert!(narrator_calls[0].user.contains("budget was exhausted"));
    }

    #[tokio::test]
    async fn test_planner_stop_short_circuits_to_narration() {
        let client = Arc::new(ScriptedClient::new());
        client.push_text(json!({"calls": [], "stop": "sufficient_information"}).to_string());
        client.push_text("Answerable from the question alone.");

        let engine = engine(TestGraph::seeded(), client.clone());
        let response = engine
            .run_query("q", QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(response.completion_reason, CompletionReason::PlannerStop);
        assert!(client.calls_for("observer").is_empty());
    }

    #[tokio::test]
    async fn test_double_malformed_plan_ends_with_error() {
        let client = Arc::new(ScriptedClient::new());
        client.push_text("not json");
        client.push_text("still not json");

        let engine = engine(TestGraph::seeded(), client.clone());
        let response = engine
            .run_query("q", QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(response.completion_reason, CompletionReason::Error);
        assert!(response.summary.contains("malformed plan"));
        assert!(response.trace.is_empty());
        assert!(client.calls_for("narrator").is_empty());
    }

    #[tokio::test]
    async fn test_malformed_verdict_treated_as_insufficient() {
        let client = Arc::new(ScriptedClient::new());
        client.push_text(plan_reply(json!([
            {"tool": "get_drug_targets", "arguments": {"drug_key": 14042}}
        ])));
        // Observer babbles twice (initial + repair) in the only
        // iteration; the engine then narrates best-effort.
        client.push_text("the evidence looks nice");
        client.push_text("really quite nice");
        client.push_text("Best effort answer.");

        let engine = engine(TestGraph::seeded(), client.clone());
        let response = engine
            .run_query(
                "q",
                QueryOptions {
                    max_iterations: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(response.completion_reason, CompletionReason::MaxIterations);
        assert!(response.trace[0].verdict.is_none());
        assert_eq!(client.calls_for("narrator").len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_before_first_plan() {
        let client = Arc::new(ScriptedClient::new());
        let token = CancellationToken::new();
        token.cancel();

        let engine = engine(TestGraph::seeded(), client.clone());
        let response = engine
            .run_query(
                "q",
                QueryOptions {
                    max_iterations: None,
                    cancel: Some(token),
                },
            )
            .await
            .unwrap();
        assert_eq!(response.completion_reason, CompletionReason::Cancelled);
        assert!(response.trace.is_empty());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_graph_transport_failure_ends_query() {
        let graph = TestGraph::seeded();
        let client = Arc::new(ScriptedClient::new());
        client.push_text(plan_reply(json!([
            {"tool": "get_drug_targets", "arguments": {"drug_key": 14042}}
        ])));

        let graph = Arc::new(graph);
        graph.set_failure(Some(FailureMode::Transport));
        let engine = Engine::with_parts(test_config(), graph, client.clone());
        let response = engine
            .run_query("q", QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.completion_reason, CompletionReason::Error);
        assert!(response.summary.contains("unavailable"));
        assert_eq!(response.trace.len(), 1);
        assert!(!response.trace[0].results[0].outcome.is_ok());
        assert!(client.calls_for("observer").is_empty());
    }

    #[tokio::test]
    async fn test_subgraph_round_trip_provenance() {
        let client = Arc::new(ScriptedClient::new());
        client.push_text(plan_reply(json!([
            {"tool": "build_subgraph", "arguments": {"drug_keys": [14042]}}
        ])));
        client.push_text(verdict_reply("sufficient", true, json!([])));
        client.push_text("Subgraph assembled.");

        let engine = engine(TestGraph::seeded(), client);
        let response = engine
            .run_query("Show the lisinopril subgraph", QueryOptions::default())
            .await
            .unwrap();

        let subgraph = response.subgraph.as_ref().unwrap();
        assert!(!subgraph.edges.is_empty());
        for edge in &subgraph.edges {
            assert!(
                response.evidence.claim_ids.contains(&edge.claim_key),
                "edge claim {} missing from evidence",
                edge.claim_key
            );
        }
        // Every node key is present in a resolved-entity map.
        for node in &subgraph.nodes {
            let maps = [
                &response.evidence.drugs,
                &response.evidence.genes,
                &response.evidence.diseases,
                &response.evidence.adverse_events,
                &response.evidence.pathways,
            ];
            assert!(
                maps.iter().any(|m| m.values().any(|&k| k == node.key)),
                "node {} not in any resolved map",
                node.key
            );
        }
    }

    #[tokio::test]
    async fn test_max_iterations_clamped() {
        let client = Arc::new(ScriptedClient::new());
        client.push_text(json!({"calls": [], "stop": "sufficient_information"}).to_string());
        client.push_text("done");
        let engine = engine(TestGraph::seeded(), client);
        // 99 clamps to 10; the planner stops on iteration one anyway.
        let response = engine
            .run_query(
                "q",
                QueryOptions {
                    max_iterations: Some(99),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(response.completion_reason, CompletionReason::PlannerStop);
    }
}
