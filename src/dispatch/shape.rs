//! Shaping tool returns for the observer.
//!
//! The shaped payload is the only view of a tool result the LLM sees:
//! human-readable labels precede surrogate keys, lists are capped and
//! marked `truncated`, and opaque blobs (evidence payload bodies) are
//! dropped. The full return stays in-process via the accumulator.

use serde_json::{json, Value};

use crate::graph::{
    AeLinkRow, ClaimRow, DiseaseLinkRow, EvidenceRow, FaersSignalRow, GeneLinkRow,
    LabelSectionRow, PathwayLinkRow,
};
use crate::tools::{MechanisticPath, Subgraph, ToolName, ToolOutput};

/// Per-section character cap applied to label text in shaped output.
const SHAPED_SECTION_CHARS: usize = 2_000;

/// Cap a list, marking truncation, and shape each kept item.
fn shaped_list<T>(items: &[T], cap: usize, shape_item: impl Fn(&T) -> Value) -> Value {
    let kept: Vec<Value> = items.iter().take(cap).map(shape_item).collect();
    json!({
        "items": kept,
        "count": items.len(),
        "truncated": items.len() > cap,
    })
}

fn gene_link(row: &GeneLinkRow) -> Value {
    json!({
        "gene_symbol": row.gene_symbol,
        "gene_key": row.gene_key,
        "strength_score": row.strength_score,
        "dataset": row.dataset_key,
        "polarity": row.polarity,
        "claim_key": row.claim_key,
        "evidence_keys": row.evidence_keys,
    })
}

fn pathway_link(row: &PathwayLinkRow) -> Value {
    json!({
        "pathway_label": row.pathway_label,
        "pathway_key": row.pathway_key,
        "strength_score": row.strength_score,
        "dataset": row.dataset_key,
        "claim_key": row.claim_key,
        "evidence_keys": row.evidence_keys,
    })
}

fn disease_link(row: &DiseaseLinkRow) -> Value {
    json!({
        "disease_label": row.disease_label,
        "disease_key": row.disease_key,
        "ontology_id": row.ontology_id,
        "strength_score": row.strength_score,
        "dataset": row.dataset_key,
        "claim_key": row.claim_key,
        "evidence_keys": row.evidence_keys,
    })
}

fn ae_link(row: &AeLinkRow) -> Value {
    json!({
        "ae_label": row.ae_label,
        "ae_key": row.ae_key,
        "frequency": row.strength_score,
        "dataset": row.dataset_key,
        "claim_key": row.claim_key,
        "evidence_keys": row.evidence_keys,
    })
}

fn faers_signal(row: &FaersSignalRow) -> Value {
    json!({
        "ae_label": row.ae_label,
        "ae_key": row.ae_key,
        "prr": row.prr,
        "ror": row.ror,
        "chi_sq": row.chi_sq,
        "case_count": row.case_count,
        "report_period": row.report_period,
        "dataset": row.dataset_key,
        "claim_key": row.claim_key,
    })
}

fn claim(row: &ClaimRow) -> Value {
    json!({
        "claim_type": row.claim_type,
        "dataset": row.dataset_key,
        "strength_score": row.strength_score,
        "polarity": row.polarity,
        "claim_key": row.claim_key,
        "source_record_id": row.source_record_id,
        "statement": row.statement,
    })
}

// Evidence payload bodies are the blobs the shaping contract drops.
fn evidence(row: &EvidenceRow) -> Value {
    json!({
        "evidence_type": row.evidence_type,
        "source_record_id": row.source_record_id,
        "source_url": row.source_url,
        "evidence_key": row.evidence_key,
    })
}

fn label_section(row: &LabelSectionRow) -> Value {
    let text: String = row.body.chars().take(SHAPED_SECTION_CHARS).collect();
    json!({
        "section": row.section,
        "text": text,
        "truncated": row.body.chars().count() > SHAPED_SECTION_CHARS,
    })
}

fn path(p: &MechanisticPath) -> Value {
    let steps: Vec<Value> = p
        .steps
        .iter()
        .map(|s| {
            json!({
                "label": s.label,
                "kind": s.kind,
                "key": s.key,
                "edge": s.edge,
            })
        })
        .collect();
    json!({
        "steps": steps,
        "score": p.score,
        "hops": p.hops(),
        "claim_keys": p.claim_keys,
        "evidence_count": p.evidence_count,
        "datasets": p.datasets,
    })
}

fn subgraph(s: &Subgraph, cap: usize) -> Value {
    json!({
        "nodes": shaped_list(&s.nodes, cap, |n| json!({
            "label": n.label,
            "kind": n.kind,
            "key": n.key,
        })),
        "edges": shaped_list(&s.edges, cap, |e| json!({
            "kind": e.kind,
            "source_key": e.source_key,
            "target_key": e.target_key,
            "dataset": e.dataset_key,
            "strength_score": e.strength_score,
            "weight": e.weight,
            "claim_key": e.claim_key,
        })),
    })
}

/// Shape one tool output: returns the observer-visible payload and a
/// one-line summary.
pub fn shape_output(tool: ToolName, output: &ToolOutput, cap: usize) -> (Value, String) {
    let (payload, summary) = match output {
        ToolOutput::Resolved { kind, entities } => {
            let resolved = entities.values().filter(|e| e.is_some()).count();
            let shaped: Value = entities
                .iter()
                .map(|(name, entity)| {
                    let value = match entity {
                        Some(e) => json!({
                            "name": e.name,
                            "key": e.key,
                            "matched_on": e.matched_on,
                            "confidence": e.confidence,
                        }),
                        None => Value::Null,
                    };
                    (name.clone(), value)
                })
                .collect::<serde_json::Map<String, Value>>()
                .into();
            (
                json!({ "entities": shaped }),
                format!(
                    "resolved {resolved}/{} {}(s)",
                    entities.len(),
                    kind.as_str()
                ),
            )
        }
        ToolOutput::Targets(rows) => (
            shaped_list(rows, cap, gene_link),
            format!("{} target(s)", rows.len()),
        ),
        ToolOutput::GeneAssociations(rows) => (
            shaped_list(rows, cap, gene_link),
            format!("{} gene association(s)", rows.len()),
        ),
        ToolOutput::Pathways(rows) => (
            shaped_list(rows, cap, pathway_link),
            format!("{} pathway(s)", rows.len()),
        ),
        ToolOutput::DiseaseAssociations(rows) => (
            shaped_list(rows, cap, disease_link),
            format!("{} disease association(s)", rows.len()),
        ),
        ToolOutput::Mechanism(expansion) => (
            json!({
                "targets": shaped_list(&expansion.targets, cap, gene_link),
                "pathways": shaped_list(&expansion.pathways, cap, pathway_link),
            }),
            format!(
                "{} target(s), {} pathway(s)",
                expansion.targets.len(),
                expansion.pathways.len()
            ),
        ),
        ToolOutput::GeneContexts(contexts) => (
            shaped_list(contexts, cap, |c| {
                json!({
                    "gene_key": c.gene_key,
                    "pathways": shaped_list(&c.pathways, cap, pathway_link),
                    "diseases": shaped_list(&c.diseases, cap, disease_link),
                })
            }),
            format!("context for {} gene(s)", contexts.len()),
        ),
        ToolOutput::AdverseEvents(rows) => {
            let top = rows
                .first()
                .and_then(|r| r.strength_score)
                .map(|f| format!(", top frequency {f:.3}"))
                .unwrap_or_default();
            (
                shaped_list(rows, cap, ae_link),
                format!("{} adverse event(s){top}", rows.len()),
            )
        }
        ToolOutput::LabelSections(rows) => (
            shaped_list(rows, cap, label_section),
            format!("{} label section(s)", rows.len()),
        ),
        ToolOutput::FaersSignals(rows) => {
            let top = rows
                .first()
                .map(|r| format!(", top PRR {:.2}", r.prr))
                .unwrap_or_default();
            (
                shaped_list(rows, cap, faers_signal),
                format!("{} FAERS signal(s){top}", rows.len()),
            )
        }
        ToolOutput::Profile(profile) => match &profile.drug {
            Some(drug) => (
                json!({
                    "name": drug.name,
                    "drug_key": drug.drug_key,
                    "synonyms": drug.synonyms,
                    "xrefs": {
                        "drugcentral_id": drug.drugcentral_id,
                        "chembl_id": drug.chembl_id,
                        "pubchem_cid": drug.pubchem_cid,
                        "inchi_key": drug.inchi_key,
                    },
                    "adverse_events": shaped_list(&profile.adverse_events, cap, ae_link),
                    "targets": shaped_list(&profile.targets, cap, gene_link),
                }),
                format!(
                    "profile of {}: {} adverse event(s), {} target(s)",
                    drug.name,
                    profile.adverse_events.len(),
                    profile.targets.len()
                ),
            ),
            None => (json!({ "found": false }), "drug not found".to_string()),
        },
        ToolOutput::ClaimEvidence(bundle) => match &bundle.claim {
            Some(row) => (
                json!({
                    "claim": claim(row),
                    "evidence": shaped_list(&bundle.evidence, cap, evidence),
                }),
                format!(
                    "claim {} with {} evidence record(s)",
                    row.claim_key,
                    bundle.evidence.len()
                ),
            ),
            None => (json!({ "found": false }), "claim not found".to_string()),
        },
        ToolOutput::Claims(rows) => (
            shaped_list(rows, cap, claim),
            format!("{} claim(s)", rows.len()),
        ),
        ToolOutput::Paths(paths) => {
            let top = paths
                .first()
                .map(|p| format!(", top score {:.3}", p.score))
                .unwrap_or_default();
            (
                shaped_list(paths, cap, path),
                format!("{} path(s){top}", paths.len()),
            )
        }
        ToolOutput::Subgraph(s) => (
            subgraph(s, cap),
            format!("subgraph: {} node(s), {} edge(s)", s.nodes.len(), s.edges.len()),
        ),
    };
    tracing::debug!(tool = %tool, summary = %summary, "shaped tool output");
    (payload, summary)
}
