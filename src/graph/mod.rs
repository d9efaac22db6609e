//! Read-only gateway to the backing property-graph store.
//!
//! The [`GraphStore`] trait is the seam between the tool library and the
//! store. The production implementation is [`PgGraphStore`] (pooled
//! Postgres via sqlx); tests drive the tool library through an in-memory
//! implementation instead. Every operation maps to a fixed parameterised
//! query; no write operation exists anywhere in this crate.

mod postgres;
mod rows;

#[cfg(test)]
pub(crate) mod testgraph;

pub use postgres::PgGraphStore;
pub use rows::{
    claim_types, AdverseEventRow, AeLinkRow, ClaimRow, DiseaseLinkRow, DiseaseRow, DrugRow,
    EntityKind, EvidenceRow, FaersSignalRow, GeneLinkRow, GeneRow, LabelSectionRow,
    PathwayLinkRow, PathwayRow,
};

use crate::error::Result;
use async_trait::async_trait;

/// Typed read-only queries against the knowledge graph.
///
/// Resolution lookups return all rows matching at a given cascade stage;
/// tie-breaking is the caller's concern. Traversal queries return one row
/// per claim so a single entity pair with two claims appears twice.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// One-shot startup probe. Fails with `GraphSchemaMismatch` when a
    /// required table or column is absent.
    async fn probe(&self) -> Result<()>;

    // Resolution lookups.

    async fn drugs_by_name(&self, name: &str) -> Result<Vec<DrugRow>>;
    async fn drugs_by_xref(&self, term: &str) -> Result<Vec<DrugRow>>;
    async fn drugs_by_name_prefix(&self, term: &str) -> Result<Vec<DrugRow>>;
    async fn genes_by_symbol(&self, symbol: &str) -> Result<Vec<GeneRow>>;
    async fn genes_by_hgnc(&self, hgnc_id: &str) -> Result<Vec<GeneRow>>;
    async fn diseases_by_label(&self, label: &str) -> Result<Vec<DiseaseRow>>;
    async fn diseases_by_ontology_id(&self, ontology_id: &str) -> Result<Vec<DiseaseRow>>;
    async fn diseases_by_label_substring(&self, term: &str) -> Result<Vec<DiseaseRow>>;
    async fn aes_by_label(&self, label: &str) -> Result<Vec<AdverseEventRow>>;
    async fn aes_by_code(&self, code: &str) -> Result<Vec<AdverseEventRow>>;
    async fn aes_by_label_substring(&self, term: &str) -> Result<Vec<AdverseEventRow>>;

    // Entity fetch.

    async fn drug(&self, drug_key: i64) -> Result<Option<DrugRow>>;

    // Mechanism traversal.

    async fn drug_targets(&self, drug_key: i64) -> Result<Vec<GeneLinkRow>>;
    async fn gene_pathways(&self, gene_key: i64) -> Result<Vec<PathwayLinkRow>>;
    async fn gene_diseases(&self, gene_key: i64, min_score: f64) -> Result<Vec<DiseaseLinkRow>>;
    async fn disease_genes(
        &self,
        disease_key: i64,
        sources: Option<&[String]>,
        min_score: f64,
        limit: i64,
    ) -> Result<Vec<GeneLinkRow>>;
    async fn gene_interactors(
        &self,
        gene_key: i64,
        min_score: f64,
        limit: i64,
    ) -> Result<Vec<GeneLinkRow>>;

    // Adverse events.

    /// Label adverse events for a drug, descending by frequency.
    async fn drug_adverse_events(
        &self,
        drug_key: i64,
        min_frequency: f64,
        limit: i64,
    ) -> Result<Vec<AeLinkRow>>;
    async fn drug_label_sections(
        &self,
        drug_key: i64,
        sections: Option<&[String]>,
    ) -> Result<Vec<LabelSectionRow>>;
    async fn drug_faers_signals(
        &self,
        drug_key: i64,
        min_count: i64,
        min_prr: f64,
        limit: i64,
    ) -> Result<Vec<FaersSignalRow>>;

    // Path-finding primitives.

    async fn drug_direct_aes(&self, drug_key: i64) -> Result<Vec<AeLinkRow>>;
    async fn pathway_aes(&self, pathway_key: i64) -> Result<Vec<AeLinkRow>>;
    async fn disease_aes(&self, disease_key: i64) -> Result<Vec<AeLinkRow>>;

    // Provenance.

    async fn claim(&self, claim_key: i64) -> Result<Option<ClaimRow>>;
    async fn claim_evidence(&self, claim_key: i64) -> Result<Vec<EvidenceRow>>;
    async fn entity_claims(
        &self,
        kind: EntityKind,
        entity_key: i64,
        claim_types: Option<&[String]>,
        limit: i64,
    ) -> Result<Vec<ClaimRow>>;
}
