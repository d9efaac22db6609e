//! Per-query evidence accumulator.
//!
//! Everything a tool returns flows through here before it is shaped for
//! the observer, so the final narrative can only cite observed data.
//! All collections keep insertion order and deduplicate; once a name
//! resolves, later iterations reuse the entry instead of querying the
//! store again.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::{AeLinkRow, ClaimRow, DiseaseLinkRow, EntityKind, GeneLinkRow, PathwayLinkRow};
use crate::tools::{
    MechanisticPath, ResolvedEntity, Subgraph, SubgraphEdge, SubgraphNode, ToolName, ToolOutput,
};

const TOOL_LOG_ARG_CAP: usize = 160;

/// Per-AE FAERS summary kept for the final response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaersSummary {
    pub prr: f64,
    pub case_count: i64,
}

/// Compact record of one tool call, kept across all iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolLogEntry {
    pub iteration: u32,
    pub tool: String,
    pub arguments: String,
    pub summary: String,
}

/// Provenance identifiers and resolved-entity maps, as serialized into
/// the final response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub drugs: IndexMap<String, i64>,
    pub genes: IndexMap<String, i64>,
    pub diseases: IndexMap<String, i64>,
    pub adverse_events: IndexMap<String, i64>,
    pub pathways: IndexMap<String, i64>,
    pub claim_ids: Vec<i64>,
    pub evidence_ids: Vec<i64>,
    pub dataset_ids: Vec<String>,
}

/// The rolling accumulator for one query.
pub struct EvidencePack {
    pub query: String,
    drugs: IndexMap<String, ResolvedEntity>,
    genes: IndexMap<String, ResolvedEntity>,
    diseases: IndexMap<String, ResolvedEntity>,
    adverse_events: IndexMap<String, ResolvedEntity>,
    pathways: IndexMap<String, ResolvedEntity>,
    nodes: IndexMap<(EntityKind, i64), SubgraphNode>,
    edges: IndexMap<(i64, i64, i64), SubgraphEdge>,
    paths: IndexMap<String, MechanisticPath>,
    claim_ids: IndexSet<i64>,
    evidence_ids: IndexSet<i64>,
    dataset_ids: IndexSet<String>,
    frequencies: IndexMap<String, f64>,
    faers_signals: IndexMap<String, FaersSummary>,
    path_scores: IndexMap<String, f64>,
    tool_log: Vec<ToolLogEntry>,
    iteration_digests: Vec<String>,
}

impl EvidencePack {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            drugs: IndexMap::new(),
            genes: IndexMap::new(),
            diseases: IndexMap::new(),
            adverse_events: IndexMap::new(),
            pathways: IndexMap::new(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            paths: IndexMap::new(),
            claim_ids: IndexSet::new(),
            evidence_ids: IndexSet::new(),
            dataset_ids: IndexSet::new(),
            frequencies: IndexMap::new(),
            faers_signals: IndexMap::new(),
            path_scores: IndexMap::new(),
            tool_log: Vec::new(),
            iteration_digests: Vec::new(),
        }
    }

    /// Already-resolved entity for a display name, if any.
    pub fn resolved(&self, kind: EntityKind, name: &str) -> Option<&ResolvedEntity> {
        self.map_for(kind).get(name)
    }

    pub fn resolved_count(&self) -> usize {
        self.drugs.len()
            + self.genes.len()
            + self.diseases.len()
            + self.adverse_events.len()
            + self.pathways.len()
    }

    fn map_for(&self, kind: EntityKind) -> &IndexMap<String, ResolvedEntity> {
        match kind {
            EntityKind::Drug => &self.drugs,
            EntityKind::Gene => &self.genes,
            EntityKind::Disease => &self.diseases,
            EntityKind::AdverseEvent => &self.adverse_events,
            EntityKind::Pathway => &self.pathways,
        }
    }

    fn map_for_mut(&mut self, kind: EntityKind) -> &mut IndexMap<String, ResolvedEntity> {
        match kind {
            EntityKind::Drug => &mut self.drugs,
            EntityKind::Gene => &mut self.genes,
            EntityKind::Disease => &mut self.diseases,
            EntityKind::AdverseEvent => &mut self.adverse_events,
            EntityKind::Pathway => &mut self.pathways,
        }
    }

    pub fn insert_resolved(&mut self, kind: EntityKind, name: &str, entity: ResolvedEntity) {
        self.map_for_mut(kind)
            .entry(name.to_string())
            .or_insert(entity);
    }

    /// Register an entity seen during traversal under its graph label.
    fn note_traversed(&mut self, kind: EntityKind, key: i64, label: &str) {
        self.map_for_mut(kind)
            .entry(label.to_string())
            .or_insert_with(|| ResolvedEntity::new(key, label, "traversal", 1.0));
    }

    fn note_claim(&mut self, claim_key: i64, dataset_key: &str, evidence_keys: &[i64]) {
        self.claim_ids.insert(claim_key);
        self.dataset_ids.insert(dataset_key.to_string());
        for &evidence_key in evidence_keys {
            self.evidence_ids.insert(evidence_key);
        }
    }

    fn absorb_gene_links(&mut self, rows: &[GeneLinkRow]) {
        for row in rows {
            self.note_traversed(EntityKind::Gene, row.gene_key, &row.gene_symbol);
            self.note_claim(row.claim_key, &row.dataset_key, &row.evidence_keys);
        }
    }

    fn absorb_pathway_links(&mut self, rows: &[PathwayLinkRow]) {
        for row in rows {
            self.note_traversed(EntityKind::Pathway, row.pathway_key, &row.pathway_label);
            self.note_claim(row.claim_key, &row.dataset_key, &row.evidence_keys);
        }
    }

    fn absorb_disease_links(&mut self, rows: &[DiseaseLinkRow]) {
        for row in rows {
            self.note_traversed(EntityKind::Disease, row.disease_key, &row.disease_label);
            self.note_claim(row.claim_key, &row.dataset_key, &row.evidence_keys);
        }
    }

    fn absorb_ae_links(&mut self, rows: &[AeLinkRow]) {
        for row in rows {
            self.note_traversed(EntityKind::AdverseEvent, row.ae_key, &row.ae_label);
            self.note_claim(row.claim_key, &row.dataset_key, &row.evidence_keys);
            if let Some(frequency) = row.strength_score {
                self.frequencies
                    .entry(row.ae_label.clone())
                    .or_insert(frequency);
            }
        }
    }

    fn absorb_claims(&mut self, rows: &[ClaimRow]) {
        for row in rows {
            self.claim_ids.insert(row.claim_key);
            self.dataset_ids.insert(row.dataset_key.clone());
        }
    }

    fn absorb_subgraph(&mut self, subgraph: &Subgraph) {
        for node in &subgraph.nodes {
            self.nodes
                .entry((node.kind, node.key))
                .or_insert_with(|| node.clone());
            self.note_traversed(node.kind, node.key, &node.label);
        }
        for edge in &subgraph.edges {
            self.edges
                .entry((edge.claim_key, edge.source_key, edge.target_key))
                .or_insert_with(|| edge.clone());
            self.claim_ids.insert(edge.claim_key);
            self.dataset_ids.insert(edge.dataset_key.clone());
        }
    }

    /// Route one tool return into the per-category collections.
    pub fn absorb(&mut self, tool: ToolName, output: &ToolOutput) {
        match output {
            ToolOutput::Resolved { kind, entities } => {
                for (name, entity) in entities {
                    if let Some(entity) = entity {
                        self.insert_resolved(*kind, name, entity.clone());
                    }
                }
            }
            ToolOutput::Targets(rows) | ToolOutput::GeneAssociations(rows) => {
                self.absorb_gene_links(rows);
            }
            ToolOutput::Pathways(rows) => self.absorb_pathway_links(rows),
            ToolOutput::DiseaseAssociations(rows) => self.absorb_disease_links(rows),
            ToolOutput::Mechanism(expansion) => {
                self.absorb_gene_links(&expansion.targets);
                self.absorb_pathway_links(&expansion.pathways);
            }
            ToolOutput::GeneContexts(contexts) => {
                for context in contexts {
                    self.absorb_pathway_links(&context.pathways);
                    self.absorb_disease_links(&context.diseases);
                }
            }
            ToolOutput::AdverseEvents(rows) => self.absorb_ae_links(rows),
            ToolOutput::LabelSections(_) => {}
            ToolOutput::FaersSignals(rows) => {
                for row in rows {
                    self.note_traversed(EntityKind::AdverseEvent, row.ae_key, &row.ae_label);
                    self.note_claim(row.claim_key, &row.dataset_key, &row.evidence_keys);
                    self.faers_signals.entry(row.ae_label.clone()).or_insert(
                        FaersSummary {
                            prr: row.prr,
                            case_count: row.case_count,
                        },
                    );
                }
            }
            ToolOutput::Profile(profile) => {
                if let Some(drug) = &profile.drug {
                    self.note_traversed(EntityKind::Drug, drug.drug_key, &drug.name);
                }
                self.absorb_ae_links(&profile.adverse_events);
                self.absorb_gene_links(&profile.targets);
            }
            ToolOutput::ClaimEvidence(bundle) => {
                if let Some(claim) = &bundle.claim {
                    self.claim_ids.insert(claim.claim_key);
                    self.dataset_ids.insert(claim.dataset_key.clone());
                }
                for evidence in &bundle.evidence {
                    self.evidence_ids.insert(evidence.evidence_key);
                }
            }
            ToolOutput::Claims(rows) => self.absorb_claims(rows),
            ToolOutput::Paths(paths) => {
                for path in paths {
                    for step in &path.steps {
                        self.note_traversed(step.kind, step.key, &step.label);
                    }
                    for &claim_key in &path.claim_keys {
                        self.claim_ids.insert(claim_key);
                    }
                    for dataset in &path.datasets {
                        self.dataset_ids.insert(dataset.clone());
                    }
                    let signature = path.signature();
                    self.path_scores.insert(signature.clone(), path.score);
                    self.paths.entry(signature).or_insert_with(|| path.clone());
                }
            }
            ToolOutput::Subgraph(subgraph) => self.absorb_subgraph(subgraph),
        }
        tracing::debug!(tool = %tool, claims = self.claim_ids.len(), "absorbed tool output");
    }

    /// Append a compact entry to the cross-iteration tool log.
    pub fn record_call(&mut self, iteration: u32, tool: &str, arguments: &Value, summary: &str) {
        let mut rendered = arguments.to_string();
        if rendered.len() > TOOL_LOG_ARG_CAP {
            let mut cut = TOOL_LOG_ARG_CAP;
            while !rendered.is_char_boundary(cut) {
                cut -= 1;
            }
            rendered.truncate(cut);
            rendered.push('…');
        }
        self.tool_log.push(ToolLogEntry {
            iteration,
            tool: tool.to_string(),
            arguments: rendered,
            summary: summary.to_string(),
        });
    }

    pub fn push_digest(&mut self, digest: String) {
        self.iteration_digests.push(digest);
    }

    pub fn digests(&self) -> &[String] {
        &self.iteration_digests
    }

    pub fn tool_log(&self) -> &[ToolLogEntry] {
        &self.tool_log
    }

    /// Ranked paths accumulated so far (already scored by the tools).
    pub fn paths(&self) -> Vec<MechanisticPath> {
        self.paths.values().cloned().collect()
    }

    /// The merged subgraph, if any fragments were collected.
    pub fn subgraph(&self) -> Option<Subgraph> {
        if self.nodes.is_empty() && self.edges.is_empty() {
            return None;
        }
        Some(Subgraph {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        })
    }

    pub fn claim_ids(&self) -> &IndexSet<i64> {
        &self.claim_ids
    }

    /// Serializable evidence summary for the final response.
    pub fn summary(&self) -> EvidenceSummary {
        let to_keys = |map: &IndexMap<String, ResolvedEntity>| {
            map.iter().map(|(name, e)| (name.clone(), e.key)).collect()
        };
        EvidenceSummary {
            drugs: to_keys(&self.drugs),
            genes: to_keys(&self.genes),
            diseases: to_keys(&self.diseases),
            adverse_events: to_keys(&self.adverse_events),
            pathways: to_keys(&self.pathways),
            claim_ids: self.claim_ids.iter().copied().collect(),
            evidence_ids: self.evidence_ids.iter().copied().collect(),
            dataset_ids: self.dataset_ids.iter().cloned().collect(),
        }
    }

    /// Bounded textual digest for the next iteration's prompt. Resolved
    /// entity maps are carried verbatim; tool payloads are not.
    pub fn summarize_for_prompt(&self, max_chars: usize) -> String {
        let mut out = String::new();

        let entity_section = |title: &str, map: &IndexMap<String, ResolvedEntity>| {
            if map.is_empty() {
                return String::new();
            }
            let entries: Vec<String> = map
                .iter()
                .map(|(name, e)| format!("{name} (key {})", e.key))
                .collect();
            format!("{title}: {}\n", entries.join(", "))
        };
        out.push_str(&entity_section("Resolved drugs", &self.drugs));
        out.push_str(&entity_section("Resolved genes", &self.genes));
        out.push_str(&entity_section("Resolved diseases", &self.diseases));
        out.push_str(&entity_section("Resolved adverse events", &self.adverse_events));
        out.push_str(&entity_section("Resolved pathways", &self.pathways));

        if !self.claim_ids.is_empty() {
            out.push_str(&format!(
                "Provenance: {} claims, {} evidence records, datasets [{}]\n",
                self.claim_ids.len(),
                self.evidence_ids.len(),
                self.dataset_ids
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        if !self.paths.is_empty() {
            out.push_str("Top paths:\n");
            for (signature, score) in self.path_scores.iter().take(3) {
                out.push_str(&format!("  {signature} (score {score:.3})\n"));
            }
        }
        for digest in &self.iteration_digests {
            out.push_str(digest);
            out.push('\n');
        }

        if out.len() > max_chars {
            let mut cut = max_chars;
            while !out.is_char_boundary(cut) {
                cut -= 1;
            }
            out.truncate(cut);
            out.push('…');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::resolve::ResolvedEntity;
    use serde_json::json;

    fn gene_row(gene_key: i64, claim_key: i64) -> GeneLinkRow {
        GeneLinkRow {
            gene_key,
            gene_symbol: format!("G{gene_key}"),
            claim_key,
            claim_type: "DRUG_TARGET".into(),
            polarity: 1,
            strength_score: Some(0.8),
            dataset_key: "drugcentral".into(),
            evidence_keys: vec![claim_key + 1000],
        }
    }

    #[test]
    fn test_first_resolution_wins() {
        let mut pack = EvidencePack::new("q");
        pack.insert_resolved(
            EntityKind::Drug,
            "aspirin",
            ResolvedEntity::new(1, "aspirin", "preferred_name", 1.0),
        );
        pack.insert_resolved(
            EntityKind::Drug,
            "aspirin",
            ResolvedEntity::new(2, "aspirin", "name_prefix", 0.8),
        );
        assert_eq!(pack.resolved(EntityKind::Drug, "aspirin").unwrap().key, 1);
    }

    #[test]
    fn test_absorb_targets_registers_provenance() {
        let mut pack = EvidencePack::new("q");
        pack.absorb(
            ToolName::GetDrugTargets,
            &ToolOutput::Targets(vec![gene_row(7, 1001), gene_row(8, 1002)]),
        );
        let summary = pack.summary();
        assert_eq!(summary.genes.len(), 2);
        assert_eq!(summary.claim_ids, vec![1001, 1002]);
        assert_eq!(summary.evidence_ids, vec![2001, 2002]);
        assert_eq!(summary.dataset_ids, vec!["drugcentral".to_string()]);
    }

    #[test]
    fn test_absorb_is_idempotent_on_duplicates() {
        let mut pack = EvidencePack::new("q");
        let output = ToolOutput::Targets(vec![gene_row(7, 1001)]);
        pack.absorb(ToolName::GetDrugTargets, &output);
        pack.absorb(ToolName::GetDrugTargets, &output);
        let summary = pack.summary();
        assert_eq!(summary.genes.len(), 1);
        assert_eq!(summary.claim_ids.len(), 1);
    }

    #[test]
    fn test_prompt_digest_is_bounded() {
        let mut pack = EvidencePack::new("q");
        for i in 0..200 {
            pack.insert_resolved(
                EntityKind::Gene,
                &format!("GENE{i}"),
                ResolvedEntity::new(i, format!("GENE{i}"), "symbol", 1.0),
            );
        }
        let digest = pack.summarize_for_prompt(500);
        assert!(digest.chars().count() <= 501);
        assert!(digest.ends_with('…'));
    }

    #[test]
    fn test_tool_log_truncates_arguments() {
        let mut pack = EvidencePack::new("q");
        let args = json!({"names": vec!["x"; 100]});
        pack.record_call(1, "resolve_drugs", &args, "resolved 0/100");
        assert!(pack.tool_log()[0].arguments.len() <= TOOL_LOG_ARG_CAP + 4);
    }
}
