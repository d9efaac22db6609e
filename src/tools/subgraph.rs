//! Bounded subgraph assembly for visualization, plus edge scoring.
//!
//! The result is O(drugs × per-category caps): each included edge
//! category is capped per drug (pathways and diseases per target gene
//! share the target cap's fan-out).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::paths::EdgeKind;
use super::{BuildSubgraphArgs, ToolError, ToolLibrary};
use crate::graph::EntityKind;
use crate::scoring::clamp01;

const DEFAULT_MAX_TARGETS: usize = 10;
const DEFAULT_MAX_PATHWAYS: usize = 8;
const DEFAULT_MAX_DISEASES: usize = 8;
const DEFAULT_MAX_AES: usize = 10;

/// A node in an assembled subgraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphNode {
    pub kind: EntityKind,
    pub key: i64,
    pub label: String,
}

/// An edge in an assembled subgraph. Always claim-backed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphEdge {
    pub source_kind: EntityKind,
    pub source_key: i64,
    pub target_kind: EntityKind,
    pub target_key: i64,
    pub kind: EdgeKind,
    pub claim_key: i64,
    pub dataset_key: String,
    pub strength_score: Option<f64>,
    /// Filled by `score_edges`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// A bounded subgraph for visualization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subgraph {
    pub nodes: Vec<SubgraphNode>,
    pub edges: Vec<SubgraphEdge>,
}

impl Subgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[derive(Default)]
struct SubgraphBuilder {
    nodes: IndexMap<(EntityKind, i64), SubgraphNode>,
    edges: IndexMap<(i64, i64, i64), SubgraphEdge>,
}

impl SubgraphBuilder {
    fn node(&mut self, kind: EntityKind, key: i64, label: &str) {
        self.nodes.entry((kind, key)).or_insert_with(|| SubgraphNode {
            kind,
            key,
            label: label.to_string(),
        });
    }

    fn edge(&mut self, edge: SubgraphEdge) {
        self.edges
            .entry((edge.claim_key, edge.source_key, edge.target_key))
            .or_insert(edge);
    }

    fn finish(self) -> Subgraph {
        Subgraph {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges.into_values().collect(),
        }
    }
}

impl ToolLibrary {
    /// Assemble a bounded subgraph around the given drugs.
    pub async fn build_subgraph(&self, args: &BuildSubgraphArgs) -> Result<Subgraph, ToolError> {
        let max_targets = args.max_targets.unwrap_or(DEFAULT_MAX_TARGETS);
        let max_pathways = args.max_pathways.unwrap_or(DEFAULT_MAX_PATHWAYS);
        let max_diseases = args.max_diseases.unwrap_or(DEFAULT_MAX_DISEASES);
        let max_aes = args.max_adverse_events.unwrap_or(DEFAULT_MAX_AES);
        if [max_targets, max_pathways, max_diseases, max_aes]
            .iter()
            .any(|cap| *cap == 0)
        {
            return Err(ToolError::invalid_args("per-category caps must be positive"));
        }
        let min_disease_score = super::check_fraction("min_disease_score", args.min_disease_score)?;

        let store = self.store();
        let mut builder = SubgraphBuilder::default();

        for &drug_key in &args.drug_keys {
            let Some(drug) = store.drug(drug_key).await.map_err(ToolError::from_store)? else {
                continue;
            };
            builder.node(EntityKind::Drug, drug.drug_key, &drug.name);

            if args.include_adverse_events {
                let aes = store
                    .drug_adverse_events(drug_key, 0.0, max_aes as i64)
                    .await
                    .map_err(ToolError::from_store)?;
                for ae in aes {
                    builder.node(EntityKind::AdverseEvent, ae.ae_key, &ae.ae_label);
                    builder.edge(SubgraphEdge {
                        source_kind: EntityKind::Drug,
                        source_key: drug_key,
                        target_kind: EntityKind::AdverseEvent,
                        target_key: ae.ae_key,
                        kind: EdgeKind::Causes,
                        claim_key: ae.claim_key,
                        dataset_key: ae.dataset_key,
                        strength_score: ae.strength_score,
                        weight: None,
                    });
                }
            }

            if !args.include_targets {
                continue;
            }
            let targets = store
                .drug_targets(drug_key)
                .await
                .map_err(ToolError::from_store)?;
            for target in targets.into_iter().take(max_targets) {
                builder.node(EntityKind::Gene, target.gene_key, &target.gene_symbol);
                builder.edge(SubgraphEdge {
                    source_kind: EntityKind::Drug,
                    source_key: drug_key,
                    target_kind: EntityKind::Gene,
                    target_key: target.gene_key,
                    kind: EdgeKind::Targets,
                    claim_key: target.claim_key,
                    dataset_key: target.dataset_key.clone(),
                    strength_score: target.strength_score,
                    weight: None,
                });

                if args.include_pathways {
                    let pathways = store
                        .gene_pathways(target.gene_key)
                        .await
                        .map_err(ToolError::from_store)?;
                    for pathway in pathways.into_iter().take(max_pathways) {
                        builder.node(
                            EntityKind::Pathway,
                            pathway.pathway_key,
                            &pathway.pathway_label,
                        );
                        builder.edge(SubgraphEdge {
                            source_kind: EntityKind::Gene,
                            source_key: target.gene_key,
                            target_kind: EntityKind::Pathway,
                            target_key: pathway.pathway_key,
                            kind: EdgeKind::InPathway,
                            claim_key: pathway.claim_key,
                            dataset_key: pathway.dataset_key,
                            strength_score: pathway.strength_score,
                            weight: None,
                        });
                    }
                }

                if args.include_diseases {
                    let diseases = store
                        .gene_diseases(target.gene_key, min_disease_score)
                        .await
                        .map_err(ToolError::from_store)?;
                    for disease in diseases.into_iter().take(max_diseases) {
                        builder.node(
                            EntityKind::Disease,
                            disease.disease_key,
                            &disease.disease_label,
                        );
                        builder.edge(SubgraphEdge {
                            source_kind: EntityKind::Gene,
                            source_key: target.gene_key,
                            target_kind: EntityKind::Disease,
                            target_key: disease.disease_key,
                            kind: EdgeKind::AssociatedWith,
                            claim_key: disease.claim_key,
                            dataset_key: disease.dataset_key,
                            strength_score: disease.strength_score,
                            weight: None,
                        });
                    }
                }
            }
        }

        Ok(builder.finish())
    }

    /// Annotate every edge of a subgraph with a numeric weight.
    ///
    /// Category weights come from the scoring policy unless the caller
    /// overrides them by category name (`TARGETS`, `IN_PATHWAY`, ...).
    pub fn score_edges(
        &self,
        mut subgraph: Subgraph,
        overrides: Option<&BTreeMap<String, f64>>,
    ) -> Result<Subgraph, ToolError> {
        if let Some(weights) = overrides {
            for (category, weight) in weights {
                if !(0.0..=1.0).contains(weight) {
                    return Err(ToolError::invalid_args(format!(
                        "weight for {category} must be within [0, 1], got {weight}"
                    )));
                }
            }
        }
        for edge in &mut subgraph.edges {
            let category_name = serde_json::to_value(edge.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let weight = match overrides.and_then(|w| w.get(&category_name)) {
                Some(w) => clamp01(w * self.policy().strength_or_default(edge.strength_score)),
                None => self.policy().edge_weight(edge.kind, edge.strength_score),
            };
            edge.weight = Some(weight);
        }
        Ok(subgraph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testgraph::TestGraph;
    use crate::scoring::ScoringPolicy;
    use std::sync::Arc;

    fn library() -> ToolLibrary {
        ToolLibrary::new(Arc::new(TestGraph::seeded()), ScoringPolicy::default())
    }

    fn args(drug_keys: Vec<i64>) -> BuildSubgraphArgs {
        serde_json::from_value(serde_json::json!({ "drug_keys": drug_keys })).unwrap()
    }

    #[tokio::test]
    async fn test_subgraph_contains_drug_targets_and_aes() {
        let lib = library();
        let subgraph = lib.build_subgraph(&args(vec![14042])).await.unwrap();
        assert!(subgraph
            .nodes
            .iter()
            .any(|n| n.kind == EntityKind::Drug && n.key == 14042));
        assert!(subgraph.nodes.iter().any(|n| n.kind == EntityKind::Gene));
        assert!(subgraph
            .edges
            .iter()
            .any(|e| e.kind == EdgeKind::Targets && e.source_key == 14042));
        assert!(subgraph.edges.iter().any(|e| e.kind == EdgeKind::Causes));
    }

    #[tokio::test]
    async fn test_caps_bound_each_category() {
        let lib = library();
        let mut request = args(vec![14042]);
        request.max_adverse_events = Some(2);
        let subgraph = lib.build_subgraph(&request).await.unwrap();
        let ae_edges = subgraph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Causes)
            .count();
        assert!(ae_edges <= 2);
    }

    #[tokio::test]
    async fn test_unknown_drug_is_skipped() {
        let lib = library();
        let subgraph = lib.build_subgraph(&args(vec![999_999])).await.unwrap();
        assert!(subgraph.is_empty());
    }

    #[tokio::test]
    async fn test_zero_cap_rejected() {
        let lib = library();
        let mut request = args(vec![14042]);
        request.max_targets = Some(0);
        let err = lib.build_subgraph(&request).await.unwrap_err();
        assert_eq!(err.category(), "tool.invalid_args");
    }

    #[tokio::test]
    async fn test_score_edges_uses_category_defaults() {
        let lib = library();
        let subgraph = lib.build_subgraph(&args(vec![14042])).await.unwrap();
        let scored = lib.score_edges(subgraph, None).unwrap();
        assert!(scored.edges.iter().all(|e| e.weight.is_some()));
        let target_edge = scored
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::Targets)
            .unwrap();
        // TARGETS weight 1.0 scaled by the claim strength.
        assert!((target_edge.weight.unwrap() - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_score_edges_honours_overrides() {
        let lib = library();
        let subgraph = lib.build_subgraph(&args(vec![14042])).await.unwrap();
        let overrides: BTreeMap<String, f64> = [("TARGETS".to_string(), 0.5)].into();
        let scored = lib.score_edges(subgraph, Some(&overrides)).unwrap();
        let target_edge = scored
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::Targets)
            .unwrap();
        assert!((target_edge.weight.unwrap() - 0.5 * 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_score_edges_rejects_out_of_range_override() {
        let lib = library();
        let overrides: BTreeMap<String, f64> = [("CAUSES".to_string(), 1.8)].into();
        let err = lib
            .score_edges(Subgraph::default(), Some(&overrides))
            .unwrap_err();
        assert_eq!(err.category(), "tool.invalid_args");
    }
}
