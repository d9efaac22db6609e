//! Mechanistic path enumeration from drugs to adverse events.
//!
//! Three shapes are enumerated: direct Drug→AE, Drug→Gene→Pathway(→AE)
//! and Drug→Gene→Disease(→AE), bounded at four hops. The underlying
//! graph is cyclic; termination comes from the bounded shapes plus
//! deduplication by node sequence, not from a visited set. A mechanism
//! prefix (e.g. Drug→Gene→Pathway with no pathway→AE claim) is emitted
//! only when it has no terminal extension, so a reachable adverse event
//! is always preferred over its stub.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::{ToolError, ToolLibrary};
use crate::graph::{AeLinkRow, EntityKind};
use crate::scoring::clamp01;

/// Hop-count ceiling for any enumerated path.
pub const MAX_PATH_HOPS: usize = 4;

const DEFAULT_MAX_PATHS: usize = 10;
const DEFAULT_TOP_K: usize = 5;

/// Edge kinds appearing on paths and in subgraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Targets,
    InPathway,
    AssociatedWith,
    Causes,
    InteractsWith,
}

/// One node on a mechanistic path, with the edge kind that led to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub kind: EntityKind,
    pub key: i64,
    pub label: String,
    /// `None` on the path's first step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeKind>,
}

/// An ordered, scored path from a drug toward an adverse event or
/// condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MechanisticPath {
    pub steps: Vec<PathStep>,
    /// Composite score, clamped to [0, 1].
    pub score: f64,
    pub claim_keys: Vec<i64>,
    /// Distinct supporting evidence records across the path's claims.
    pub evidence_count: usize,
    /// Distinct datasets contributing claims, in path order.
    pub datasets: Vec<String>,
}

impl MechanisticPath {
    pub fn hops(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn node_keys(&self) -> Vec<i64> {
        self.steps.iter().map(|s| s.key).collect()
    }

    /// Dedup key: the node sequence.
    pub fn signature(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{}:{}", s.kind, s.key))
            .collect::<Vec<_>>()
            .join(">")
    }
}

/// A claim contributing to a path under construction.
#[derive(Debug, Clone)]
struct ClaimOnPath {
    claim_key: i64,
    dataset_key: String,
    evidence_keys: Vec<i64>,
}

#[derive(Debug, Clone)]
struct Candidate {
    steps: Vec<PathStep>,
    claims: Vec<ClaimOnPath>,
    primary_strength: Option<f64>,
}

impl Candidate {
    fn finish(self, lib: &ToolLibrary, conditions: &[i64]) -> MechanisticPath {
        let hops = self.steps.len().saturating_sub(1);
        let claim_datasets: Vec<String> =
            self.claims.iter().map(|c| c.dataset_key.clone()).collect();
        let evidence: IndexSet<i64> = self
            .claims
            .iter()
            .flat_map(|c| c.evidence_keys.iter().copied())
            .collect();
        let condition_hits = self
            .steps
            .iter()
            .filter(|s| s.kind == EntityKind::Disease && conditions.contains(&s.key))
            .map(|s| s.key)
            .collect::<IndexSet<i64>>()
            .len();
        let score = clamp01(lib.policy().score_path(
            self.primary_strength,
            hops,
            evidence.len(),
            &claim_datasets,
            condition_hits,
        ));
        let mut datasets: Vec<String> = Vec::new();
        for dataset in claim_datasets {
            if !datasets.contains(&dataset) {
                datasets.push(dataset);
            }
        }
        MechanisticPath {
            steps: self.steps,
            score,
            claim_keys: self.claims.iter().map(|c| c.claim_key).collect(),
            evidence_count: evidence.len(),
            datasets,
        }
    }
}

fn ae_step(row: &AeLinkRow) -> PathStep {
    PathStep {
        kind: EntityKind::AdverseEvent,
        key: row.ae_key,
        label: row.ae_label.clone(),
        edge: Some(EdgeKind::Causes),
    }
}

impl ToolLibrary {
    /// Enumerate candidate drug→AE paths, deduplicated by node sequence
    /// and ranked by the scoring policy.
    pub async fn find_drug_to_ae_paths(
        &self,
        drug_key: i64,
        ae_key: Option<i64>,
        max_paths: Option<usize>,
    ) -> Result<Vec<MechanisticPath>, ToolError> {
        let max_paths = max_paths.unwrap_or(DEFAULT_MAX_PATHS);
        if max_paths == 0 {
            return Err(ToolError::invalid_args("max_paths must be positive"));
        }
        let mut paths = self.enumerate_paths(drug_key, ae_key, &[]).await?;
        self.policy().rank(&mut paths);
        paths.truncate(max_paths);
        Ok(paths)
    }

    /// Path finding with patient-condition context boosting.
    pub async fn explain_paths(
        &self,
        drug_key: i64,
        ae_key: Option<i64>,
        condition_keys: Option<Vec<i64>>,
        top_k: Option<usize>,
    ) -> Result<Vec<MechanisticPath>, ToolError> {
        let top_k = top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k == 0 {
            return Err(ToolError::invalid_args("top_k must be positive"));
        }
        let conditions = condition_keys.unwrap_or_default();
        let mut paths = self.enumerate_paths(drug_key, ae_key, &conditions).await?;
        self.policy().rank(&mut paths);
        paths.truncate(top_k);
        Ok(paths)
    }

    async fn enumerate_paths(
        &self,
        drug_key: i64,
        ae_filter: Option<i64>,
        conditions: &[i64],
    ) -> Result<Vec<MechanisticPath>, ToolError> {
        let store = self.store();
        let Some(drug) = store.drug(drug_key).await.map_err(ToolError::from_store)? else {
            return Ok(Vec::new());
        };
        let drug_step = PathStep {
            kind: EntityKind::Drug,
            key: drug.drug_key,
            label: drug.name.clone(),
            edge: None,
        };

        let mut candidates: Vec<Candidate> = Vec::new();

        // Shape 1: direct Drug→AE.
        for ae in store
            .drug_direct_aes(drug_key)
            .await
            .map_err(ToolError::from_store)?
        {
            if ae_filter.is_some_and(|key| key != ae.ae_key) {
                continue;
            }
            candidates.push(Candidate {
                steps: vec![drug_step.clone(), ae_step(&ae)],
                claims: vec![ClaimOnPath {
                    claim_key: ae.claim_key,
                    dataset_key: ae.dataset_key.clone(),
                    evidence_keys: ae.evidence_keys.clone(),
                }],
                primary_strength: ae.strength_score,
            });
        }

        // Shapes 2 and 3: through a target gene.
        for target in store
            .drug_targets(drug_key)
            .await
            .map_err(ToolError::from_store)?
        {
            let gene_step = PathStep {
                kind: EntityKind::Gene,
                key: target.gene_key,
                label: target.gene_symbol.clone(),
                edge: Some(EdgeKind::Targets),
            };
            let target_claim = ClaimOnPath {
                claim_key: target.claim_key,
                dataset_key: target.dataset_key.clone(),
                evidence_keys: target.evidence_keys.clone(),
            };

            for pathway in store
                .gene_pathways(target.gene_key)
                .await
                .map_err(ToolError::from_store)?
            {
                let pathway_step = PathStep {
                    kind: EntityKind::Pathway,
                    key: pathway.pathway_key,
                    label: pathway.pathway_label.clone(),
                    edge: Some(EdgeKind::InPathway),
                };
                let pathway_claim = ClaimOnPath {
                    claim_key: pathway.claim_key,
                    dataset_key: pathway.dataset_key.clone(),
                    evidence_keys: pathway.evidence_keys.clone(),
                };
                let mut terminal = false;
                for ae in store
                    .pathway_aes(pathway.pathway_key)
                    .await
                    .map_err(ToolError::from_store)?
                {
                    if ae_filter.is_some_and(|key| key != ae.ae_key) {
                        continue;
                    }
                    terminal = true;
                    candidates.push(Candidate {
                        steps: vec![
                            drug_step.clone(),
                            gene_step.clone(),
                            pathway_step.clone(),
                            ae_step(&ae),
                        ],
                        claims: vec![
                            target_claim.clone(),
                            pathway_claim.clone(),
                            ClaimOnPath {
                                claim_key: ae.claim_key,
                                dataset_key: ae.dataset_key.clone(),
                                evidence_keys: ae.evidence_keys.clone(),
                            },
                        ],
                        primary_strength: target.strength_score,
                    });
                }
                if !terminal {
                    candidates.push(Candidate {
                        steps: vec![drug_step.clone(), gene_step.clone(), pathway_step],
                        claims: vec![target_claim.clone(), pathway_claim],
                        primary_strength: target.strength_score,
                    });
                }
            }

            for disease in store
                .gene_diseases(target.gene_key, 0.0)
                .await
                .map_err(ToolError::from_store)?
            {
                let disease_step = PathStep {
                    kind: EntityKind::Disease,
                    key: disease.disease_key,
                    label: disease.disease_label.clone(),
                    edge: Some(EdgeKind::AssociatedWith),
                };
                let disease_claim = ClaimOnPath {
                    claim_key: disease.claim_key,
                    dataset_key: disease.dataset_key.clone(),
                    evidence_keys: disease.evidence_keys.clone(),
                };
                let mut terminal = false;
                for ae in store
                    .disease_aes(disease.disease_key)
                    .await
                    .map_err(ToolError::from_store)?
                {
                    if ae_filter.is_some_and(|key| key != ae.ae_key) {
                        continue;
                    }
                    terminal = true;
                    candidates.push(Candidate {
                        steps: vec![
                            drug_step.clone(),
                            gene_step.clone(),
                            disease_step.clone(),
                            ae_step(&ae),
                        ],
                        claims: vec![
                            target_claim.clone(),
                            disease_claim.clone(),
                            ClaimOnPath {
                                claim_key: ae.claim_key,
                                dataset_key: ae.dataset_key.clone(),
                                evidence_keys: ae.evidence_keys.clone(),
                            },
                        ],
                        primary_strength: target.strength_score,
                    });
                }
                if !terminal {
                    candidates.push(Candidate {
                        steps: vec![drug_step.clone(), gene_step.clone(), disease_step],
                        claims: vec![target_claim.clone(), disease_claim],
                        primary_strength: target.strength_score,
                    });
                }
            }
        }

        // Dedup by node sequence; first construction wins.
        let mut deduped: IndexMap<String, MechanisticPath> = IndexMap::new();
        for candidate in candidates {
            debug_assert!(candidate.steps.len() <= MAX_PATH_HOPS + 1);
            let path = candidate.finish(self, conditions);
            deduped.entry(path.signature()).or_insert(path);
        }
        Ok(deduped.into_values().collect())
    }
}
