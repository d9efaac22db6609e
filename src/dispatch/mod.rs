//! The tool dispatcher: the gate between the untrusted planner and the
//! typed tool library.
//!
//! A plan moves through `received → validating → executing(i) →
//! shaping(i) → delivered`, one call at a time, in plan order. Failures
//! become synthetic error ToolResults and the plan continues; the
//! observer needs to see what went wrong. Only a graph transport fault
//! stops the plan early and ends the query.

mod shape;

pub use shape::shape_output;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::evidence::EvidencePack;
use crate::graph::EntityKind;
use crate::protocol::{ToolPlan, ToolResult};
use crate::tools::{
    resolve::ResolutionMap, BuildSubgraphArgs, ClaimKeyArgs, DiseaseGenesArgs,
    DrugAdverseEventsArgs, DrugKeyArgs, DrugNamesArgs, EntityClaimsArgs, ExpandGeneContextArgs,
    ExplainPathsArgs, FaersSignalsArgs, FindPathsArgs, GeneDiseasesArgs, GeneInteractorsArgs,
    GeneKeyArgs, GeneSymbolsArgs, LabelSectionsArgs, ScoreEdgesArgs, TermsArgs, ToolError,
    ToolLibrary, ToolName, ToolOutput,
};

/// Failures raised by the dispatcher itself, before a tool runs.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The requested name is not in the closed tool enum.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments failed to coerce to the tool's declared parameters.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl DispatchError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "dispatch.unknown_tool",
            Self::InvalidArgs(_) => "tool.invalid_args",
        }
    }
}

enum CallFailure {
    Dispatch(DispatchError),
    Tool(ToolError),
}

impl CallFailure {
    fn category(&self) -> &'static str {
        match self {
            Self::Dispatch(e) => e.category(),
            Self::Tool(e) => e.category(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Dispatch(e) => e.to_string(),
            Self::Tool(e) => e.to_string(),
        }
    }
}

/// Everything the orchestrator needs to know about one dispatched plan.
pub struct DispatchReport {
    pub results: Vec<ToolResult>,
    /// Set when a transport fault ended the plan early.
    pub fatal: Option<Error>,
    /// Set when cancellation stopped the plan between calls.
    pub cancelled: bool,
}

/// Executes validated plans against the tool library, sequentially.
pub struct Dispatcher {
    tools: Arc<ToolLibrary>,
    truncation_cap: usize,
    tool_timeout: Duration,
}

impl Dispatcher {
    pub fn new(tools: Arc<ToolLibrary>, truncation_cap: usize, tool_timeout: Duration) -> Self {
        Self {
            tools,
            truncation_cap,
            tool_timeout,
        }
    }

    /// Run every call of the plan in order. Cancellation is checked
    /// before each call, never mid-tool.
    pub async fn dispatch(
        &self,
        iteration: u32,
        plan: &ToolPlan,
        pack: &mut EvidencePack,
        cancel: &CancellationToken,
    ) -> DispatchReport {
        let mut report = DispatchReport {
            results: Vec::with_capacity(plan.calls.len()),
            fatal: None,
            cancelled: false,
        };

        for call in &plan.calls {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let args_echo = Value::Object(call.arguments.clone());

            let tool: ToolName = match call.tool.parse() {
                Ok(tool) => tool,
                Err(_) => {
                    let failure = DispatchError::UnknownTool(call.tool.clone());
                    tracing::warn!(tool = %call.tool, "rejected unknown tool");
                    let result = ToolResult::error(
                        &call.tool,
                        args_echo,
                        failure.category(),
                        failure.to_string(),
                    );
                    pack.record_call(iteration, &call.tool, &result.arguments, &result.summary);
                    report.results.push(result);
                    continue;
                }
            };

            let executed = match timeout(
                self.tool_timeout,
                self.execute(tool, &call.arguments, pack),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(CallFailure::Tool(ToolError::Timeout {
                    seconds: self.tool_timeout.as_secs(),
                })),
            };

            match executed {
                Ok(output) => {
                    pack.absorb(tool, &output);
                    let (payload, summary) =
                        shape_output(tool, &output, self.truncation_cap);
                    pack.record_call(iteration, tool.as_str(), &args_echo, &summary);
                    report
                        .results
                        .push(ToolResult::ok(tool.as_str(), args_echo, payload, summary));
                }
                Err(failure) => {
                    let fatal = matches!(
                        &failure,
                        CallFailure::Tool(ToolError::Upstream {
                            unavailable: true,
                            ..
                        })
                    );
                    tracing::warn!(
                        tool = %tool,
                        category = failure.category(),
                        "tool call failed: {}",
                        failure.message()
                    );
                    let result = ToolResult::error(
                        tool.as_str(),
                        args_echo,
                        failure.category(),
                        failure.message(),
                    );
                    pack.record_call(iteration, tool.as_str(), &result.arguments, &result.summary);
                    report.results.push(result);
                    if fatal {
                        report.fatal = Some(Error::GraphUnavailable(failure.message()));
                        break;
                    }
                }
            }
        }

        report
    }

    async fn execute(
        &self,
        tool: ToolName,
        arguments: &serde_json::Map<String, Value>,
        pack: &EvidencePack,
    ) -> Result<ToolOutput, CallFailure> {
        match tool {
            ToolName::ResolveDrugs => {
                let args: DrugNamesArgs = parse_args(arguments)?;
                self.resolve_with_cache(EntityKind::Drug, &args.names, pack)
                    .await
            }
            ToolName::ResolveGenes => {
                let args: GeneSymbolsArgs = parse_args(arguments)?;
                self.resolve_with_cache(EntityKind::Gene, &args.symbols, pack)
                    .await
            }
            ToolName::ResolveDiseases => {
                let args: TermsArgs = parse_args(arguments)?;
                self.resolve_with_cache(EntityKind::Disease, &args.terms, pack)
                    .await
            }
            ToolName::ResolveAdverseEvents => {
                let args: TermsArgs = parse_args(arguments)?;
                self.resolve_with_cache(EntityKind::AdverseEvent, &args.terms, pack)
                    .await
            }
            ToolName::GetDrugTargets => {
                let args: DrugKeyArgs = parse_args(arguments)?;
                let rows = self.tools.get_drug_targets(args.drug_key).await?;
                Ok(ToolOutput::Targets(rows))
            }
            ToolName::GetGenePathways => {
                let args: GeneKeyArgs = parse_args(arguments)?;
                let rows = self.tools.get_gene_pathways(args.gene_key).await?;
                Ok(ToolOutput::Pathways(rows))
            }
            ToolName::GetGeneDiseases => {
                let args: GeneDiseasesArgs = parse_args(arguments)?;
                let rows = self
                    .tools
                    .get_gene_diseases(args.gene_key, args.min_score)
                    .await?;
                Ok(ToolOutput::DiseaseAssociations(rows))
            }
            ToolName::GetDiseaseGenes => {
                let args: DiseaseGenesArgs = parse_args(arguments)?;
                let rows = self
                    .tools
                    .get_disease_genes(args.disease_key, args.sources, args.min_score, args.limit)
                    .await?;
                Ok(ToolOutput::GeneAssociations(rows))
            }
            ToolName::GetGeneInteractors => {
                let args: GeneInteractorsArgs = parse_args(arguments)?;
                let rows = self
                    .tools
                    .get_gene_interactors(args.gene_key, args.min_score, args.limit)
                    .await?;
                Ok(ToolOutput::GeneAssociations(rows))
            }
            ToolName::ExpandMechanism => {
                let args: DrugKeyArgs = parse_args(arguments)?;
                let expansion = self.tools.expand_mechanism(args.drug_key).await?;
                Ok(ToolOutput::Mechanism(expansion))
            }
            ToolName::ExpandGeneContext => {
                let args: ExpandGeneContextArgs = parse_args(arguments)?;
                let contexts = self
                    .tools
                    .expand_gene_context(&args.gene_keys, args.min_disease_score)
                    .await?;
                Ok(ToolOutput::GeneContexts(contexts))
            }
            ToolName::GetDrugAdverseEvents => {
                let args: DrugAdverseEventsArgs = parse_args(arguments)?;
                let rows = self
                    .tools
                    .get_drug_adverse_events(args.drug_key, args.min_frequency, args.limit)
                    .await?;
                Ok(ToolOutput::AdverseEvents(rows))
            }
            ToolName::GetDrugLabelSections => {
                let args: LabelSectionsArgs = parse_args(arguments)?;
                let rows = self
                    .tools
                    .get_drug_label_sections(args.drug_key, args.sections)
                    .await?;
                Ok(ToolOutput::LabelSections(rows))
            }
            ToolName::GetDrugFaersSignals => {
                let args: FaersSignalsArgs = parse_args(arguments)?;
                let rows = self
                    .tools
                    .get_drug_faers_signals(args.drug_key, args.top_k, args.min_count, args.min_prr)
                    .await?;
                Ok(ToolOutput::FaersSignals(rows))
            }
            ToolName::GetDrugProfile => {
                let args: DrugKeyArgs = parse_args(arguments)?;
                let profile = self.tools.get_drug_profile(args.drug_key).await?;
                Ok(ToolOutput::Profile(profile))
            }
            ToolName::GetClaimEvidence => {
                let args: ClaimKeyArgs = parse_args(arguments)?;
                let bundle = self.tools.get_claim_evidence(args.claim_key).await?;
                Ok(ToolOutput::ClaimEvidence(bundle))
            }
            ToolName::GetEntityClaims => {
                let args: EntityClaimsArgs = parse_args(arguments)?;
                let rows = self
                    .tools
                    .get_entity_claims(
                        args.entity_kind,
                        args.entity_key,
                        args.claim_types,
                        args.limit,
                    )
                    .await?;
                Ok(ToolOutput::Claims(rows))
            }
            ToolName::FindDrugToAePaths => {
                let args: FindPathsArgs = parse_args(arguments)?;
                let paths = self
                    .tools
                    .find_drug_to_ae_paths(args.drug_key, args.ae_key, args.max_paths)
                    .await?;
                Ok(ToolOutput::Paths(paths))
            }
            ToolName::ExplainPaths => {
                let args: ExplainPathsArgs = parse_args(arguments)?;
                let paths = self
                    .tools
                    .explain_paths(args.drug_key, args.ae_key, args.condition_keys, args.top_k)
                    .await?;
                Ok(ToolOutput::Paths(paths))
            }
            ToolName::BuildSubgraph => {
                let args: BuildSubgraphArgs = parse_args(arguments)?;
                let subgraph = self.tools.build_subgraph(&args).await?;
                Ok(ToolOutput::Subgraph(subgraph))
            }
            ToolName::ScoreEdges => {
                let args: ScoreEdgesArgs = parse_args(arguments)?;
                let scored = self
                    .tools
                    .score_edges(args.subgraph, args.weights.as_ref())?;
                Ok(ToolOutput::Subgraph(scored))
            }
        }
    }

    /// Resolve names, answering from the accumulator where possible.
    /// Once a name resolved in an earlier iteration, no second store
    /// query is issued for it.
    async fn resolve_with_cache(
        &self,
        kind: EntityKind,
        names: &[String],
        pack: &EvidencePack,
    ) -> Result<ToolOutput, CallFailure> {
        let mut cached = ResolutionMap::new();
        let mut missing: Vec<String> = Vec::new();
        for name in names {
            match pack.resolved(kind, name) {
                Some(entity) => {
                    cached.insert(name.clone(), Some(entity.clone()));
                }
                None => missing.push(name.clone()),
            }
        }

        let fresh = if missing.is_empty() {
            ResolutionMap::new()
        } else {
            match kind {
                EntityKind::Drug => self.tools.resolve_drugs(&missing).await?,
                EntityKind::Gene => self.tools.resolve_genes(&missing).await?,
                EntityKind::Disease => self.tools.resolve_diseases(&missing).await?,
                EntityKind::AdverseEvent => self.tools.resolve_adverse_events(&missing).await?,
                // No pathway resolution tool exists in the catalog.
                EntityKind::Pathway => ResolutionMap::new(),
            }
        };

        let entities = names
            .iter()
            .map(|name| {
                let hit = cached
                    .get(name)
                    .cloned()
                    .or_else(|| fresh.get(name).cloned())
                    .flatten();
                (name.clone(), hit)
            })
            .collect();
        Ok(ToolOutput::Resolved { kind, entities })
    }
}

fn parse_args<T: DeserializeOwned>(
    arguments: &serde_json::Map<String, Value>,
) -> Result<T, CallFailure> {
    serde_json::from_value(Value::Object(arguments.clone()))
        .map_err(|e| CallFailure::Dispatch(DispatchError::InvalidArgs(e.to_string())))
}

impl From<ToolError> for CallFailure {
    fn from(e: ToolError) -> Self {
        Self::Tool(e)
    }
}
