//! Path and edge scoring policy.
//!
//! A path score composes the primary claim's strength, a per-hop length
//! penalty, a multi-evidence bonus, and an optional patient-condition
//! boost:
//!
//! ```text
//! S = strength(c*) * lambda^hops * mu * beta^condition_hits [* mean_source_weight]
//! ```
//!
//! where `c*` is the claim on the path's first hop, null strengths fall
//! back to a configurable default, and the mean-source-weight factor is
//! off unless enabled in configuration. Scores are clamped to [0, 1]
//! wherever they are stored on a path or serialized for the LLM.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::tools::paths::{EdgeKind, MechanisticPath};

/// Default per-dataset trust weights.
fn default_source_weights() -> BTreeMap<String, f64> {
    [
        ("drugcentral", 1.00),
        ("opentargets", 0.95),
        ("chembl", 0.90),
        ("reactome", 0.90),
        ("gtop", 0.85),
        ("clingen", 0.85),
        ("sider", 0.80),
        ("hpo", 0.70),
        ("ctd", 0.70),
        ("string", 0.60),
        ("faers", 0.50),
        ("openfda", 0.50),
    ]
    .into_iter()
    .map(|(k, w)| (k.to_string(), w))
    .collect()
}

/// Per-edge-category weights used by `score_edges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeWeights {
    pub targets: f64,
    pub in_pathway: f64,
    pub associated_with: f64,
    pub causes: f64,
    pub other: f64,
}

impl Default for EdgeWeights {
    fn default() -> Self {
        Self {
            targets: 1.0,
            in_pathway: 0.9,
            associated_with: 0.8,
            causes: 0.7,
            other: 0.5,
        }
    }
}

/// Scoring configuration, constructed once and shared across queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Substitute for claims whose source provides no native confidence.
    pub null_strength: f64,
    /// Multiplicative penalty per hop.
    pub length_penalty: f64,
    /// Bonus when a path's claims cite more than one distinct evidence record.
    pub multi_evidence_bonus: f64,
    /// Boost per distinct patient-condition disease on the path.
    pub condition_boost: f64,
    /// Whether the mean-source-weight factor participates.
    pub use_source_weights: bool,
    pub source_weights: BTreeMap<String, f64>,
    /// Weight for datasets absent from the table.
    pub unknown_source_weight: f64,
    pub edge_weights: EdgeWeights,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            null_strength: 0.5,
            length_penalty: 0.95,
            multi_evidence_bonus: 1.2,
            condition_boost: 1.5,
            use_source_weights: false,
            source_weights: default_source_weights(),
            unknown_source_weight: 0.5,
            edge_weights: EdgeWeights::default(),
        }
    }
}

/// Clamp a score to [0, 1].
pub fn clamp01(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

impl ScoringPolicy {
    /// Claim strength with the null fallback applied.
    pub fn strength_or_default(&self, strength: Option<f64>) -> f64 {
        strength.unwrap_or(self.null_strength)
    }

    /// Trust weight for one dataset.
    pub fn source_weight(&self, dataset_key: &str) -> f64 {
        self.source_weights
            .get(dataset_key)
            .copied()
            .unwrap_or(self.unknown_source_weight)
    }

    /// Raw (unclamped) path score.
    ///
    /// `condition_hits` is the number of distinct patient-condition
    /// diseases the path traverses; the boost applies once per distinct
    /// match.
    pub fn score_path(
        &self,
        primary_strength: Option<f64>,
        hops: usize,
        distinct_evidence: usize,
        datasets: &[String],
        condition_hits: usize,
    ) -> f64 {
        let mut score = self.strength_or_default(primary_strength)
            * self.length_penalty.powi(hops as i32);
        if distinct_evidence > 1 {
            score *= self.multi_evidence_bonus;
        }
        if condition_hits > 0 {
            score *= self.condition_boost.powi(condition_hits as i32);
        }
        if self.use_source_weights && datasets.len() > 1 {
            let mean = datasets
                .iter()
                .map(|d| self.source_weight(d))
                .sum::<f64>()
                / datasets.len() as f64;
            score *= mean;
        }
        score
    }

    /// Weight for one scored subgraph edge: category weight scaled by the
    /// claim strength (null falls back like everywhere else), clamped.
    pub fn edge_weight(&self, category: EdgeKind, strength: Option<f64>) -> f64 {
        let categorical = match category {
            EdgeKind::Targets => self.edge_weights.targets,
            EdgeKind::InPathway => self.edge_weights.in_pathway,
            EdgeKind::AssociatedWith => self.edge_weights.associated_with,
            EdgeKind::Causes => self.edge_weights.causes,
            EdgeKind::InteractsWith => self.edge_weights.other,
        };
        clamp01(categorical * self.strength_or_default(strength))
    }

    /// Stable descending rank: higher score first, then shorter paths,
    /// then fewer distinct datasets, then node-key order.
    pub fn rank(&self, paths: &mut [MechanisticPath]) {
        paths.sort_by(compare_ranked);
    }
}

fn compare_ranked(a: &MechanisticPath, b: &MechanisticPath) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.hops().cmp(&b.hops()))
        .then_with(|| a.datasets.len().cmp(&b.datasets.len()))
        .then_with(|| a.node_keys().cmp(&b.node_keys()))
}
