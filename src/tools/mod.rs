//! The closed tool catalog.
//!
//! Every tool is a read-only operation over the graph store with typed
//! parameters and an enumerated failure mode. Nothing here raises an
//! unstructured error that could leak through the dispatcher: store
//! faults become [`ToolError::Upstream`], bad argument values become
//! [`ToolError::InvalidArgs`] before any store access, and nonexistent
//! keys simply produce empty results.

pub mod adverse;
pub mod mechanism;
pub mod paths;
pub mod provenance;
pub mod resolve;
pub mod subgraph;

pub use adverse::DrugProfile;
pub use mechanism::{GeneContext, MechanismExpansion};
pub use paths::{EdgeKind, MechanisticPath, PathStep};
pub use provenance::ClaimEvidenceBundle;
pub use resolve::{ResolutionMap, ResolvedEntity};
pub use subgraph::{Subgraph, SubgraphEdge, SubgraphNode};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::error::Error;
use crate::graph::{
    AeLinkRow, ClaimRow, DiseaseLinkRow, EntityKind, FaersSignalRow, GeneLinkRow, GraphStore,
    LabelSectionRow, PathwayLinkRow,
};
use crate::scoring::ScoringPolicy;

/// Enumerated tool failures, reported to the observer as failed calls.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// Argument value violated a declared constraint.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The graph store failed. `unavailable` marks transport-level
    /// faults, which additionally end the query.
    #[error("upstream graph failure: {message}")]
    Upstream { message: String, unavailable: bool },

    /// The dispatcher watchdog expired.
    #[error("tool call timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl ToolError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Stable category string for logs and synthetic ToolResults.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgs(_) => "tool.invalid_args",
            Self::Upstream {
                unavailable: true, ..
            } => "graph.unavailable",
            Self::Upstream { .. } => "tool.upstream",
            Self::Timeout { .. } => "tool.timeout",
        }
    }

    pub(crate) fn from_store(err: Error) -> Self {
        match err {
            Error::GraphUnavailable(message) => Self::Upstream {
                message,
                unavailable: true,
            },
            other => Self::Upstream {
                message: other.to_string(),
                unavailable: false,
            },
        }
    }
}

/// The closed tool name enum. Unknown names never reach the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ResolveDrugs,
    ResolveGenes,
    ResolveDiseases,
    ResolveAdverseEvents,
    GetDrugTargets,
    GetGenePathways,
    GetGeneDiseases,
    GetDiseaseGenes,
    GetGeneInteractors,
    ExpandMechanism,
    ExpandGeneContext,
    GetDrugAdverseEvents,
    GetDrugLabelSections,
    GetDrugFaersSignals,
    GetDrugProfile,
    GetClaimEvidence,
    GetEntityClaims,
    FindDrugToAePaths,
    ExplainPaths,
    BuildSubgraph,
    ScoreEdges,
}

impl ToolName {
    pub const ALL: [ToolName; 21] = [
        Self::ResolveDrugs,
        Self::ResolveGenes,
        Self::ResolveDiseases,
        Self::ResolveAdverseEvents,
        Self::GetDrugTargets,
        Self::GetGenePathways,
        Self::GetGeneDiseases,
        Self::GetDiseaseGenes,
        Self::GetGeneInteractors,
        Self::ExpandMechanism,
        Self::ExpandGeneContext,
        Self::GetDrugAdverseEvents,
        Self::GetDrugLabelSections,
        Self::GetDrugFaersSignals,
        Self::GetDrugProfile,
        Self::GetClaimEvidence,
        Self::GetEntityClaims,
        Self::FindDrugToAePaths,
        Self::ExplainPaths,
        Self::BuildSubgraph,
        Self::ScoreEdges,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveDrugs => "resolve_drugs",
            Self::ResolveGenes => "resolve_genes",
            Self::ResolveDiseases => "resolve_diseases",
            Self::ResolveAdverseEvents => "resolve_adverse_events",
            Self::GetDrugTargets => "get_drug_targets",
            Self::GetGenePathways => "get_gene_pathways",
            Self::GetGeneDiseases => "get_gene_diseases",
            Self::GetDiseaseGenes => "get_disease_genes",
            Self::GetGeneInteractors => "get_gene_interactors",
            Self::ExpandMechanism => "expand_mechanism",
            Self::ExpandGeneContext => "expand_gene_context",
            Self::GetDrugAdverseEvents => "get_drug_adverse_events",
            Self::GetDrugLabelSections => "get_drug_label_sections",
            Self::GetDrugFaersSignals => "get_drug_faers_signals",
            Self::GetDrugProfile => "get_drug_profile",
            Self::GetClaimEvidence => "get_claim_evidence",
            Self::GetEntityClaims => "get_entity_claims",
            Self::FindDrugToAePaths => "find_drug_to_ae_paths",
            Self::ExplainPaths => "explain_paths",
            Self::BuildSubgraph => "build_subgraph",
            Self::ScoreEdges => "score_edges",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tool: {s}"))
    }
}

// Typed argument records, deserialized by the dispatcher from the
// planner's raw argument maps. Missing required fields and wrong types
// are rejected there; range constraints are checked by the tools.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugNamesArgs {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneSymbolsArgs {
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsArgs {
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugKeyArgs {
    pub drug_key: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneKeyArgs {
    pub gene_key: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneDiseasesArgs {
    pub gene_key: i64,
    #[serde(default)]
    pub min_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseGenesArgs {
    pub disease_key: i64,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneInteractorsArgs {
    pub gene_key: i64,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandGeneContextArgs {
    pub gene_keys: Vec<i64>,
    #[serde(default)]
    pub min_disease_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugAdverseEventsArgs {
    pub drug_key: i64,
    #[serde(default)]
    pub min_frequency: Option<f64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSectionsArgs {
    pub drug_key: i64,
    #[serde(default)]
    pub sections: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaersSignalsArgs {
    pub drug_key: i64,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub min_count: Option<i64>,
    #[serde(default)]
    pub min_prr: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimKeyArgs {
    pub claim_key: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityClaimsArgs {
    pub entity_kind: EntityKind,
    pub entity_key: i64,
    #[serde(default)]
    pub claim_types: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPathsArgs {
    pub drug_key: i64,
    #[serde(default)]
    pub ae_key: Option<i64>,
    #[serde(default)]
    pub max_paths: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainPathsArgs {
    pub drug_key: i64,
    #[serde(default)]
    pub ae_key: Option<i64>,
    #[serde(default)]
    pub condition_keys: Option<Vec<i64>>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSubgraphArgs {
    pub drug_keys: Vec<i64>,
    #[serde(default = "default_true")]
    pub include_targets: bool,
    #[serde(default = "default_true")]
    pub include_pathways: bool,
    #[serde(default = "default_true")]
    pub include_diseases: bool,
    #[serde(default = "default_true")]
    pub include_adverse_events: bool,
    #[serde(default)]
    pub max_targets: Option<usize>,
    #[serde(default)]
    pub max_pathways: Option<usize>,
    #[serde(default)]
    pub max_diseases: Option<usize>,
    #[serde(default)]
    pub max_adverse_events: Option<usize>,
    #[serde(default)]
    pub min_disease_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEdgesArgs {
    pub subgraph: Subgraph,
    #[serde(default)]
    pub weights: Option<BTreeMap<String, f64>>,
}

/// Typed return value of one tool call, handed to the accumulator and
/// then shaped for the observer.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Resolved {
        kind: EntityKind,
        entities: ResolutionMap,
    },
    Targets(Vec<GeneLinkRow>),
    Pathways(Vec<PathwayLinkRow>),
    DiseaseAssociations(Vec<DiseaseLinkRow>),
    GeneAssociations(Vec<GeneLinkRow>),
    Mechanism(MechanismExpansion),
    GeneContexts(Vec<GeneContext>),
    AdverseEvents(Vec<AeLinkRow>),
    LabelSections(Vec<LabelSectionRow>),
    FaersSignals(Vec<FaersSignalRow>),
    Profile(DrugProfile),
    ClaimEvidence(ClaimEvidenceBundle),
    Claims(Vec<ClaimRow>),
    Paths(Vec<MechanisticPath>),
    Subgraph(Subgraph),
}

/// The shared, read-only tool library.
pub struct ToolLibrary {
    store: Arc<dyn GraphStore>,
    policy: ScoringPolicy,
}

impl ToolLibrary {
    pub fn new(store: Arc<dyn GraphStore>, policy: ScoringPolicy) -> Self {
        Self { store, policy }
    }

    pub(crate) fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    pub(crate) fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }
}

/// Validate that an optional fraction argument stays inside [0, 1].
pub(crate) fn check_fraction(name: &str, value: Option<f64>) -> Result<f64, ToolError> {
    let value = value.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&value) {
        return Err(ToolError::invalid_args(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(value)
}

/// Validate that an optional positive-count argument is at least 1.
pub(crate) fn check_limit(name: &str, value: Option<i64>, default: i64) -> Result<i64, ToolError> {
    let value = value.unwrap_or(default);
    if value < 1 {
        return Err(ToolError::invalid_args(format!(
            "{name} must be positive, got {value}"
        )));
    }
    Ok(value)
}
