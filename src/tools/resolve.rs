//! Entity resolution: free-text names to graph keys.
//!
//! Each kind runs a fixed cascade of matching attempts with descending
//! confidence. Ties within one attempt are broken deterministically:
//! the candidate with the richer cross-reference set wins, then the
//! lower surrogate key.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{ToolError, ToolLibrary};
use crate::graph::{AdverseEventRow, DiseaseRow, DrugRow, GeneRow};

/// Confidence assigned to an exact match on the primary name field.
pub const EXACT_CONFIDENCE: f64 = 1.0;
/// Confidence assigned to an exact match on an external identifier.
pub const XREF_CONFIDENCE: f64 = 0.9;
/// Confidence assigned to a drug name prefix/substring match.
pub const DRUG_FUZZY_CONFIDENCE: f64 = 0.8;
/// Confidence assigned to a disease or adverse-event substring match.
pub const FUZZY_CONFIDENCE: f64 = 0.7;

/// One resolved entity. Immutable once created; reused across iterations
/// of the same query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub key: i64,
    pub name: String,
    /// Which matching attempt produced this entity.
    pub matched_on: String,
    pub confidence: f64,
}

impl ResolvedEntity {
    pub fn new(key: i64, name: impl Into<String>, matched_on: &str, confidence: f64) -> Self {
        Self {
            key,
            name: name.into(),
            matched_on: matched_on.to_string(),
            confidence,
        }
    }
}

/// Mapping from requested name to its resolution (or `None`).
pub type ResolutionMap = IndexMap<String, Option<ResolvedEntity>>;

fn pick<T, K: Fn(&T) -> usize, I: Fn(&T) -> i64>(
    mut rows: Vec<T>,
    xrefs: K,
    key: I,
) -> Option<T> {
    rows.sort_by(|a, b| xrefs(b).cmp(&xrefs(a)).then(key(a).cmp(&key(b))));
    rows.into_iter().next()
}

fn pick_drug(rows: Vec<DrugRow>) -> Option<DrugRow> {
    pick(rows, DrugRow::xref_count, |r| r.drug_key)
}

fn pick_gene(rows: Vec<GeneRow>) -> Option<GeneRow> {
    pick(rows, GeneRow::xref_count, |r| r.gene_key)
}

fn pick_disease(rows: Vec<DiseaseRow>) -> Option<DiseaseRow> {
    pick(rows, DiseaseRow::xref_count, |r| r.disease_key)
}

fn pick_ae(rows: Vec<AdverseEventRow>) -> Option<AdverseEventRow> {
    pick(rows, AdverseEventRow::xref_count, |r| r.ae_key)
}

impl ToolLibrary {
    /// Resolve drug names: exact preferred name, then external ids, then
    /// name prefix.
    pub async fn resolve_drugs(&self, names: &[String]) -> Result<ResolutionMap, ToolError> {
        let mut out = ResolutionMap::new();
        for raw in names {
            let name = raw.trim();
            if name.is_empty() {
                out.insert(raw.clone(), None);
                continue;
            }
            let resolved = self.resolve_one_drug(name).await?;
            out.insert(raw.clone(), resolved);
        }
        Ok(out)
    }

    async fn resolve_one_drug(&self, name: &str) -> Result<Option<ResolvedEntity>, ToolError> {
        let store = self.store();
        if let Some(row) = pick_drug(store.drugs_by_name(name).await.map_err(ToolError::from_store)?)
        {
            return Ok(Some(ResolvedEntity::new(
                row.drug_key,
                row.name,
                "preferred_name",
                EXACT_CONFIDENCE,
            )));
        }
        if let Some(row) = pick_drug(store.drugs_by_xref(name).await.map_err(ToolError::from_store)?)
        {
            return Ok(Some(ResolvedEntity::new(
                row.drug_key,
                row.name,
                "external_id",
                XREF_CONFIDENCE,
            )));
        }
        if let Some(row) = pick_drug(
            store
                .drugs_by_name_prefix(name)
                .await
                .map_err(ToolError::from_store)?,
        ) {
            tracing::debug!(query = name, matched = %row.name, "drug resolved by prefix");
            return Ok(Some(ResolvedEntity::new(
                row.drug_key,
                row.name,
                "name_prefix",
                DRUG_FUZZY_CONFIDENCE,
            )));
        }
        Ok(None)
    }

    /// Resolve gene symbols: case-insensitive exact symbol, then
    /// nomenclature id.
    pub async fn resolve_genes(&self, symbols: &[String]) -> Result<ResolutionMap, ToolError> {
        let mut out = ResolutionMap::new();
        for raw in symbols {
            let symbol = raw.trim();
            if symbol.is_empty() {
                out.insert(raw.clone(), None);
                continue;
            }
            let store = self.store();
            let resolved = if let Some(row) = pick_gene(
                store
                    .genes_by_symbol(symbol)
                    .await
                    .map_err(ToolError::from_store)?,
            ) {
                Some(ResolvedEntity::new(
                    row.gene_key,
                    row.symbol,
                    "symbol",
                    EXACT_CONFIDENCE,
                ))
            } else if let Some(row) = pick_gene(
                store
                    .genes_by_hgnc(symbol)
                    .await
                    .map_err(ToolError::from_store)?,
            ) {
                Some(ResolvedEntity::new(
                    row.gene_key,
                    row.symbol,
                    "hgnc_id",
                    XREF_CONFIDENCE,
                ))
            } else {
                None
            };
            out.insert(raw.clone(), resolved);
        }
        Ok(out)
    }

    /// Resolve disease terms: exact label, then ontology id, then label
    /// substring.
    pub async fn resolve_diseases(&self, terms: &[String]) -> Result<ResolutionMap, ToolError> {
        let mut out = ResolutionMap::new();
        for raw in terms {
            let term = raw.trim();
            if term.is_empty() {
                out.insert(raw.clone(), None);
                continue;
            }
            let store = self.store();
            let resolved = if let Some(row) = pick_disease(
                store
                    .diseases_by_label(term)
                    .await
                    .map_err(ToolError::from_store)?,
            ) {
                Some(ResolvedEntity::new(
                    row.disease_key,
                    row.label,
                    "label",
                    EXACT_CONFIDENCE,
                ))
            } else if let Some(row) = pick_disease(
                store
                    .diseases_by_ontology_id(term)
                    .await
                    .map_err(ToolError::from_store)?,
            ) {
                Some(ResolvedEntity::new(
                    row.disease_key,
                    row.label,
                    "ontology_id",
                    XREF_CONFIDENCE,
                ))
            } else if let Some(row) = pick_disease(
                store
                    .diseases_by_label_substring(term)
                    .await
                    .map_err(ToolError::from_store)?,
            ) {
                Some(ResolvedEntity::new(
                    row.disease_key,
                    row.label,
                    "label_substring",
                    FUZZY_CONFIDENCE,
                ))
            } else {
                None
            };
            out.insert(raw.clone(), resolved);
        }
        Ok(out)
    }

    /// Resolve adverse-event terms: exact label, then ontology code, then
    /// label substring.
    pub async fn resolve_adverse_events(
        &self,
        terms: &[String],
    ) -> Result<ResolutionMap, ToolError> {
        let mut out = ResolutionMap::new();
        for raw in terms {
            let term = raw.trim();
            if term.is_empty() {
                out.insert(raw.clone(), None);
                continue;
            }
            let store = self.store();
            let resolved = if let Some(row) = pick_ae(
                store
                    .aes_by_label(term)
                    .await
                    .map_err(ToolError::from_store)?,
            ) {
                Some(ResolvedEntity::new(
                    row.ae_key,
                    row.label,
                    "label",
                    EXACT_CONFIDENCE,
                ))
            } else if let Some(row) = pick_ae(
                store.aes_by_code(term).await.map_err(ToolError::from_store)?,
            ) {
                Some(ResolvedEntity::new(
                    row.ae_key,
                    row.label,
                    "code",
                    XREF_CONFIDENCE,
                ))
            } else if let Some(row) = pick_ae(
                store
                    .aes_by_label_substring(term)
                    .await
                    .map_err(ToolError::from_store)?,
            ) {
                Some(ResolvedEntity::new(
                    row.ae_key,
                    row.label,
                    "label_substring",
                    FUZZY_CONFIDENCE,
                ))
            } else {
                None
            };
            out.insert(raw.clone(), resolved);
        }
        Ok(out)
    }
}
