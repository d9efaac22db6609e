//! Prompt catalog: system prompts, the tool catalog text and message
//! formatters for the three LLM roles.
//!
//! Prompts are constructed once and shared by reference across
//! concurrent queries.

use crate::protocol::{EvidenceGap, ToolResult};

/// Text description of every catalog tool, injected into the planner's
/// system prompt. Kept in the same order as the closed enum.
pub const TOOL_CATALOG: &str = "\
Available tools (name(arguments) - effect):

Resolution
- resolve_drugs(names: [string]) - map drug names to graph keys
- resolve_genes(symbols: [string]) - map gene symbols to graph keys
- resolve_diseases(terms: [string]) - map disease terms to graph keys
- resolve_adverse_events(terms: [string]) - map adverse-event terms to graph keys

Mechanism
- get_drug_targets(drug_key: int) - genes the drug targets
- get_gene_pathways(gene_key: int) - pathways a gene participates in
- get_gene_diseases(gene_key: int, min_score?: float) - disease associations of a gene
- get_disease_genes(disease_key: int, sources?: [string], min_score?: float, limit?: int) - genes associated with a disease
- get_gene_interactors(gene_key: int, min_score?: float, limit?: int) - interaction partners of a gene
- expand_mechanism(drug_key: int) - targets plus the union of their pathways
- expand_gene_context(gene_keys: [int], min_disease_score?: float) - pathways and diseases per gene

Adverse events
- get_drug_adverse_events(drug_key: int, min_frequency?: float, limit?: int) - label adverse events, most frequent first
- get_drug_label_sections(drug_key: int, sections?: [string]) - product label text sections
- get_drug_faers_signals(drug_key: int, top_k?: int, min_count?: int, min_prr?: float) - FAERS disproportionality signals
- get_drug_profile(drug_key: int) - basic info, top adverse events and targets

Provenance
- get_claim_evidence(claim_key: int) - one claim and its supporting evidence records
- get_entity_claims(entity_kind: string, entity_key: int, claim_types?: [string], limit?: int) - claims attached to an entity

Paths and subgraphs
- find_drug_to_ae_paths(drug_key: int, ae_key?: int, max_paths?: int) - ranked mechanistic paths toward adverse events
- explain_paths(drug_key: int, ae_key?: int, condition_keys?: [int], top_k?: int) - path finding with patient-condition boosting
- build_subgraph(drug_keys: [int], include_targets?: bool, include_pathways?: bool, include_diseases?: bool, include_adverse_events?: bool, max_targets?: int, max_pathways?: int, max_diseases?: int, max_adverse_events?: int, min_disease_score?: float) - bounded subgraph for visualization
- score_edges(subgraph: object, weights?: {category: float}) - annotate subgraph edges with weights";

/// JSON schema hint for the planner, used in the system prompt and in
/// repair instructions.
pub const PLAN_SCHEMA: &str = r#"{
  "calls": [{"tool": "<tool name>", "arguments": {...}, "reason": "<short why>"}],
  "stop": null | "sufficient_information" | "no_relevant_tools"
}"#;

/// JSON schema hint for the observer.
pub const VERDICT_SCHEMA: &str = r#"{
  "status": "sufficient" | "partially_sufficient" | "insufficient",
  "confidence": <0.0-1.0>,
  "reasoning": "<short assessment>",
  "gaps": [{"category": "<string>", "description": "<string>", "priority": 1|2|3,
            "suggested_tool": "<tool name, optional>"}],
  "can_answer": true | false
}"#;

/// Shared, read-only prompt builders.
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog;

impl PromptCatalog {
    pub fn new() -> Self {
        Self
    }

    pub fn planner_system(&self) -> String {
        format!(
            "You plan graph queries for a pharmacovigilance question-answering engine. \
             The knowledge graph links drugs, genes, pathways, diseases and adverse events \
             through claims backed by evidence records.\n\n\
             {TOOL_CATALOG}\n\n\
             Rules:\n\
             - Resolve names to keys before using key-based tools.\n\
             - Reuse keys from the prior-iteration digest instead of re-resolving.\n\
             - Request only tools that close the stated gaps.\n\
             - If the digest already answers the question, set stop to \
               \"sufficient_information\" with no calls.\n\
             - If no tool applies to the question, set stop to \"no_relevant_tools\".\n\n\
             Respond with ONLY a JSON object matching:\n{PLAN_SCHEMA}"
        )
    }

    pub fn planner_user(
        &self,
        query: &str,
        digest: Option<&str>,
        gaps: &[EvidenceGap],
    ) -> String {
        let mut out = format!("Question: {query}\n");
        if let Some(digest) = digest.filter(|d| !d.is_empty()) {
            out.push_str("\nEvidence gathered so far:\n");
            out.push_str(digest);
        }
        if !gaps.is_empty() {
            out.push_str("\nOpen gaps from the last observation (highest priority first):\n");
            let mut sorted: Vec<&EvidenceGap> = gaps.iter().collect();
            sorted.sort_by_key(|g| g.priority);
            for gap in sorted {
                out.push_str(&format!(
                    "- [{}] {}: {}",
                    gap.priority, gap.category, gap.description
                ));
                if let Some(tool) = &gap.suggested_tool {
                    out.push_str(&format!(" (consider {tool})"));
                }
                out.push('\n');
            }
        }
        out.push_str("\nPlan the next tool calls.");
        out
    }

    pub fn observer_system(&self) -> String {
        format!(
            "You judge whether gathered graph evidence suffices to answer a \
             pharmacovigilance question. Failed tool calls are visible to you; treat them \
             as missing evidence, not as errors to fix.\n\n\
             Respond with ONLY a JSON object matching:\n{VERDICT_SCHEMA}"
        )
    }

    pub fn observer_user(&self, query: &str, results: &[ToolResult]) -> String {
        let rendered = serde_json::to_string_pretty(results)
            .unwrap_or_else(|_| "[]".to_string());
        format!(
            "Question: {query}\n\nTool results from this iteration:\n{rendered}\n\n\
             Judge sufficiency."
        )
    }

    pub fn narrator_system(&self) -> String {
        "You write the final answer for a pharmacovigilance question, grounded ONLY in \
         the evidence digest provided. Cite entities by name with their keys. Where the \
         digest lacks evidence for part of the question, state that no evidence was found; \
         never infer or invent relationships that are not in the digest."
            .to_string()
    }

    pub fn narrator_user(&self, query: &str, digest: &str, best_effort: bool) -> String {
        let mut out = format!("Question: {query}\n\nEvidence digest:\n{digest}\n");
        if best_effort {
            out.push_str(
                "\nThe iteration budget was exhausted before the evidence was judged \
                 sufficient. Answer with what exists and name what is missing.",
            );
        }
        out.push_str("\nWrite the answer.");
        out
    }
}
