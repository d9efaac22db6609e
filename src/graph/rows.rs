//! Plain row records returned by the graph store.
//!
//! Every traversal row that crosses a claim carries the claim key, its
//! strength, its dataset and the supporting evidence keys, so callers can
//! always drill down through the provenance tools.

use serde::{Deserialize, Serialize};

/// Entity kinds present in the property graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Drug,
    Gene,
    Disease,
    Pathway,
    AdverseEvent,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drug => "drug",
            Self::Gene => "gene",
            Self::Disease => "disease",
            Self::Pathway => "pathway",
            Self::AdverseEvent => "adverse_event",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "drug" => Ok(Self::Drug),
            "gene" => Ok(Self::Gene),
            "disease" => Ok(Self::Disease),
            "pathway" => Ok(Self::Pathway),
            "adverse_event" => Ok(Self::AdverseEvent),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Claim type strings as materialized at ingest.
pub mod claim_types {
    pub const DRUG_TARGET: &str = "DRUG_TARGET";
    pub const DRUG_AE_LABEL: &str = "DRUG_AE_LABEL";
    pub const DRUG_AE_FAERS: &str = "DRUG_AE_FAERS";
    pub const GENE_PATHWAY: &str = "GENE_PATHWAY";
    pub const GENE_DISEASE: &str = "GENE_DISEASE";
    pub const GENE_GENE_STRING: &str = "GENE_GENE_STRING";
    pub const PATHWAY_AE: &str = "PATHWAY_AE";
    pub const DISEASE_AE: &str = "DISEASE_AE";
}

/// A drug node.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DrugRow {
    pub drug_key: i64,
    pub name: String,
    pub drugcentral_id: Option<String>,
    pub chembl_id: Option<String>,
    pub pubchem_cid: Option<i64>,
    pub inchi_key: Option<String>,
    pub synonyms: Vec<String>,
}

impl DrugRow {
    /// Number of populated external cross-references, used to break
    /// resolution ties.
    pub fn xref_count(&self) -> usize {
        [
            self.drugcentral_id.is_some(),
            self.chembl_id.is_some(),
            self.pubchem_cid.is_some(),
            self.inchi_key.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// A gene node.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneRow {
    pub gene_key: i64,
    pub symbol: String,
    pub hgnc_id: Option<String>,
    pub ensembl_id: Option<String>,
    pub uniprot_id: Option<String>,
}

impl GeneRow {
    pub fn xref_count(&self) -> usize {
        [
            self.hgnc_id.is_some(),
            self.ensembl_id.is_some(),
            self.uniprot_id.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// A disease node.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DiseaseRow {
    pub disease_key: i64,
    pub label: String,
    pub ontology_id: Option<String>,
    pub synonyms: Vec<String>,
}

impl DiseaseRow {
    pub fn xref_count(&self) -> usize {
        usize::from(self.ontology_id.is_some())
    }
}

/// An adverse event node.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdverseEventRow {
    pub ae_key: i64,
    pub label: String,
    pub meddra_code: Option<String>,
}

impl AdverseEventRow {
    pub fn xref_count(&self) -> usize {
        usize::from(self.meddra_code.is_some())
    }
}

/// A pathway node.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PathwayRow {
    pub pathway_key: i64,
    pub label: String,
    pub source_id: Option<String>,
}

/// A claim node: one assertion connecting entities, with its strength,
/// polarity and dataset of origin.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_key: i64,
    pub claim_type: String,
    pub polarity: i16,
    pub strength_score: Option<f64>,
    pub dataset_key: String,
    pub source_record_id: Option<String>,
    pub statement: Option<String>,
}

/// An evidence node supporting a claim.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EvidenceRow {
    pub evidence_key: i64,
    pub evidence_type: String,
    pub source_record_id: Option<String>,
    pub source_url: Option<String>,
    pub payload: Option<serde_json::Value>,
}

/// Drug→gene or disease→gene or gene→gene traversal row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneLinkRow {
    pub gene_key: i64,
    pub gene_symbol: String,
    pub claim_key: i64,
    pub claim_type: String,
    pub polarity: i16,
    pub strength_score: Option<f64>,
    pub dataset_key: String,
    pub evidence_keys: Vec<i64>,
}

/// Gene→pathway traversal row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PathwayLinkRow {
    pub pathway_key: i64,
    pub pathway_label: String,
    pub claim_key: i64,
    pub strength_score: Option<f64>,
    pub dataset_key: String,
    pub evidence_keys: Vec<i64>,
}

/// Gene→disease traversal row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DiseaseLinkRow {
    pub disease_key: i64,
    pub disease_label: String,
    pub ontology_id: Option<String>,
    pub claim_key: i64,
    pub strength_score: Option<f64>,
    pub dataset_key: String,
    pub evidence_keys: Vec<i64>,
}

/// Entity→adverse-event traversal row. For label claims the strength is
/// the reported frequency.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AeLinkRow {
    pub ae_key: i64,
    pub ae_label: String,
    pub claim_key: i64,
    pub strength_score: Option<f64>,
    pub dataset_key: String,
    pub evidence_keys: Vec<i64>,
}

/// FAERS disproportionality metrics for one drug/adverse-event pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FaersSignalRow {
    pub ae_key: i64,
    pub ae_label: String,
    pub claim_key: i64,
    pub prr: f64,
    pub ror: Option<f64>,
    pub chi_sq: Option<f64>,
    pub case_count: i64,
    pub report_period: Option<String>,
    pub dataset_key: String,
    pub evidence_keys: Vec<i64>,
}

/// One textual section of a structured product label.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LabelSectionRow {
    pub section: String,
    pub body: String,
}
