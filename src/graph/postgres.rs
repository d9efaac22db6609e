//! Pooled Postgres implementation of [`GraphStore`].
//!
//! All queries are fixed and parameterised. The connection pool is sized
//! from configuration; the pool bound is what limits concurrent queries
//! across the embedding server. A one-shot probe at startup verifies that
//! every table and column the gateway touches exists, so schema drift is
//! caught before the first query instead of mid-iteration.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use super::rows::{
    AdverseEventRow, AeLinkRow, ClaimRow, DiseaseLinkRow, DiseaseRow, DrugRow, EntityKind,
    EvidenceRow, FaersSignalRow, GeneLinkRow, GeneRow, LabelSectionRow, PathwayLinkRow,
};
use super::GraphStore;
use crate::config::GraphConfig;
use crate::error::{Error, Result};

/// Tables and columns the gateway requires, checked by the startup probe.
const REQUIRED_SCHEMA: &[(&str, &str)] = &[
    (
        "drug",
        "drug_key, name, drugcentral_id, chembl_id, pubchem_cid, inchi_key, synonyms",
    ),
    ("gene", "gene_key, symbol, hgnc_id, ensembl_id, uniprot_id"),
    ("disease", "disease_key, label, ontology_id, synonyms"),
    ("adverse_event", "ae_key, label, meddra_code"),
    ("pathway", "pathway_key, label, source_id"),
    (
        "claim",
        "claim_key, claim_type, polarity, strength_score, dataset_key, source_record_id, statement",
    ),
    (
        "evidence",
        "evidence_key, evidence_type, source_record_id, source_url, payload",
    ),
    ("dataset", "dataset_key, version, license"),
    ("has_claim", "entity_kind, entity_key, claim_key"),
    ("claim_gene", "claim_key, gene_key"),
    ("claim_disease", "claim_key, disease_key"),
    ("claim_pathway", "claim_key, pathway_key"),
    ("claim_adverse_event", "claim_key, ae_key"),
    ("supported_by", "claim_key, evidence_key"),
    ("drug_label_section", "drug_key, section, body"),
    (
        "faers_signal",
        "drug_key, ae_key, claim_key, prr, ror, chi_sq, case_count, report_period",
    ),
];

const EVIDENCE_AGG: &str =
    "COALESCE(ARRAY_AGG(sb.evidence_key) FILTER (WHERE sb.evidence_key IS NOT NULL), '{}')";

/// Postgres-backed graph gateway.
#[derive(Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    /// Connect a pool and run the schema probe.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url())
            .await
            .map_err(|e| Error::GraphUnavailable(e.to_string()))?;

        let store = Self { pool };
        store.probe().await?;
        Ok(store)
    }

    /// Wrap an existing pool (no probe).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> Error {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => Error::GraphUnavailable(e.to_string()),
        other => Error::GraphQuery(other.to_string()),
    }
}

#[async_trait]
impl GraphStore for PgGraphStore {
    async fn probe(&self) -> Result<()> {
        for (table, columns) in REQUIRED_SCHEMA {
            let sql = format!("SELECT {columns} FROM {table} LIMIT 0");
            sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
                Error::GraphSchemaMismatch(format!("probe of table '{table}' failed: {e}"))
            })?;
        }
        tracing::debug!(tables = REQUIRED_SCHEMA.len(), "graph schema probe passed");
        Ok(())
    }

    async fn drugs_by_name(&self, name: &str) -> Result<Vec<DrugRow>> {
        sqlx::query_as::<_, DrugRow>(
            r#"
            SELECT drug_key, name, drugcentral_id, chembl_id, pubchem_cid, inchi_key,
                   COALESCE(synonyms, '{}') AS synonyms
            FROM drug
            WHERE name = $1
            ORDER BY drug_key
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn drugs_by_xref(&self, term: &str) -> Result<Vec<DrugRow>> {
        sqlx::query_as::<_, DrugRow>(
            r#"
            SELECT drug_key, name, drugcentral_id, chembl_id, pubchem_cid, inchi_key,
                   COALESCE(synonyms, '{}') AS synonyms
            FROM drug
            WHERE drugcentral_id = $1
               OR chembl_id = $1
               OR inchi_key = $1
               OR pubchem_cid::text = $1
            ORDER BY drug_key
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn drugs_by_name_prefix(&self, term: &str) -> Result<Vec<DrugRow>> {
        sqlx::query_as::<_, DrugRow>(
            r#"
            SELECT drug_key, name, drugcentral_id, chembl_id, pubchem_cid, inchi_key,
                   COALESCE(synonyms, '{}') AS synonyms
            FROM drug
            WHERE name ILIKE $1 || '%'
            ORDER BY LENGTH(name), drug_key
            LIMIT 20
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn genes_by_symbol(&self, symbol: &str) -> Result<Vec<GeneRow>> {
        sqlx::query_as::<_, GeneRow>(
            r#"
            SELECT gene_key, symbol, hgnc_id, ensembl_id, uniprot_id
            FROM gene
            WHERE UPPER(symbol) = UPPER($1)
            ORDER BY gene_key
            "#,
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn genes_by_hgnc(&self, hgnc_id: &str) -> Result<Vec<GeneRow>> {
        sqlx::query_as::<_, GeneRow>(
            r#"
            SELECT gene_key, symbol, hgnc_id, ensembl_id, uniprot_id
            FROM gene
            WHERE hgnc_id = $1
            ORDER BY gene_key
            "#,
        )
        .bind(hgnc_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn diseases_by_label(&self, label: &str) -> Result<Vec<DiseaseRow>> {
        sqlx::query_as::<_, DiseaseRow>(
            r#"
            SELECT disease_key, label, ontology_id, COALESCE(synonyms, '{}') AS synonyms
            FROM disease
            WHERE LOWER(label) = LOWER($1)
            ORDER BY disease_key
            "#,
        )
        .bind(label)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn diseases_by_ontology_id(&self, ontology_id: &str) -> Result<Vec<DiseaseRow>> {
        sqlx::query_as::<_, DiseaseRow>(
            r#"
            SELECT disease_key, label, ontology_id, COALESCE(synonyms, '{}') AS synonyms
            FROM disease
            WHERE ontology_id = $1
            ORDER BY disease_key
            "#,
        )
        .bind(ontology_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn diseases_by_label_substring(&self, term: &str) -> Result<Vec<DiseaseRow>> {
        sqlx::query_as::<_, DiseaseRow>(
            r#"
            SELECT disease_key, label, ontology_id, COALESCE(synonyms, '{}') AS synonyms
            FROM disease
            WHERE label ILIKE '%' || $1 || '%'
            ORDER BY LENGTH(label), disease_key
            LIMIT 20
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn aes_by_label(&self, label: &str) -> Result<Vec<AdverseEventRow>> {
        sqlx::query_as::<_, AdverseEventRow>(
            r#"
            SELECT ae_key, label, meddra_code
            FROM adverse_event
            WHERE LOWER(label) = LOWER($1)
            ORDER BY ae_key
            "#,
        )
        .bind(label)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn aes_by_code(&self, code: &str) -> Result<Vec<AdverseEventRow>> {
        sqlx::query_as::<_, AdverseEventRow>(
            r#"
            SELECT ae_key, label, meddra_code
            FROM adverse_event
            WHERE meddra_code = $1
            ORDER BY ae_key
            "#,
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn aes_by_label_substring(&self, term: &str) -> Result<Vec<AdverseEventRow>> {
        sqlx::query_as::<_, AdverseEventRow>(
            r#"
            SELECT ae_key, label, meddra_code
            FROM adverse_event
            WHERE label ILIKE '%' || $1 || '%'
            ORDER BY LENGTH(label), ae_key
            LIMIT 20
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn drug(&self, drug_key: i64) -> Result<Option<DrugRow>> {
        sqlx::query_as::<_, DrugRow>(
            r#"
            SELECT drug_key, name, drugcentral_id, chembl_id, pubchem_cid, inchi_key,
                   COALESCE(synonyms, '{}') AS synonyms
            FROM drug
            WHERE drug_key = $1
            "#,
        )
        .bind(drug_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn drug_targets(&self, drug_key: i64) -> Result<Vec<GeneLinkRow>> {
        let sql = format!(
            r#"
            SELECT g.gene_key, g.symbol AS gene_symbol,
                   c.claim_key, c.claim_type, c.polarity, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_gene cg ON cg.claim_key = c.claim_key
            JOIN gene g ON g.gene_key = cg.gene_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'drug' AND hc.entity_key = $1
              AND c.claim_type = 'DRUG_TARGET'
            GROUP BY g.gene_key, g.symbol, c.claim_key, c.claim_type, c.polarity,
                     c.strength_score, c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, g.gene_key
            "#
        );
        sqlx::query_as::<_, GeneLinkRow>(&sql)
            .bind(drug_key)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn gene_pathways(&self, gene_key: i64) -> Result<Vec<PathwayLinkRow>> {
        let sql = format!(
            r#"
            SELECT p.pathway_key, p.label AS pathway_label,
                   c.claim_key, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_pathway cp ON cp.claim_key = c.claim_key
            JOIN pathway p ON p.pathway_key = cp.pathway_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'gene' AND hc.entity_key = $1
              AND c.claim_type = 'GENE_PATHWAY'
            GROUP BY p.pathway_key, p.label, c.claim_key, c.strength_score, c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, p.pathway_key
            "#
        );
        sqlx::query_as::<_, PathwayLinkRow>(&sql)
            .bind(gene_key)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn gene_diseases(&self, gene_key: i64, min_score: f64) -> Result<Vec<DiseaseLinkRow>> {
        let sql = format!(
            r#"
            SELECT d.disease_key, d.label AS disease_label, d.ontology_id,
                   c.claim_key, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_disease cd ON cd.claim_key = c.claim_key
            JOIN disease d ON d.disease_key = cd.disease_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'gene' AND hc.entity_key = $1
              AND c.claim_type = 'GENE_DISEASE'
              AND COALESCE(c.strength_score, 0) >= $2
            GROUP BY d.disease_key, d.label, d.ontology_id, c.claim_key, c.strength_score,
                     c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, d.disease_key
            "#
        );
        sqlx::query_as::<_, DiseaseLinkRow>(&sql)
            .bind(gene_key)
            .bind(min_score)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn disease_genes(
        &self,
        disease_key: i64,
        sources: Option<&[String]>,
        min_score: f64,
        limit: i64,
    ) -> Result<Vec<GeneLinkRow>> {
        let sql = format!(
            r#"
            SELECT g.gene_key, g.symbol AS gene_symbol,
                   c.claim_key, c.claim_type, c.polarity, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_gene cg ON cg.claim_key = c.claim_key
            JOIN gene g ON g.gene_key = cg.gene_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'disease' AND hc.entity_key = $1
              AND c.claim_type = 'GENE_DISEASE'
              AND ($2::text[] IS NULL OR c.dataset_key = ANY($2))
              AND COALESCE(c.strength_score, 0) >= $3
            GROUP BY g.gene_key, g.symbol, c.claim_key, c.claim_type, c.polarity,
                     c.strength_score, c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, g.gene_key
            LIMIT $4
            "#
        );
        sqlx::query_as::<_, GeneLinkRow>(&sql)
            .bind(disease_key)
            .bind(sources.map(|s| s.to_vec()))
            .bind(min_score)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn gene_interactors(
        &self,
        gene_key: i64,
        min_score: f64,
        limit: i64,
    ) -> Result<Vec<GeneLinkRow>> {
        let sql = format!(
            r#"
            SELECT g.gene_key, g.symbol AS gene_symbol,
                   c.claim_key, c.claim_type, c.polarity, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_gene cg ON cg.claim_key = c.claim_key
            JOIN gene g ON g.gene_key = cg.gene_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'gene' AND hc.entity_key = $1
              AND c.claim_type = 'GENE_GENE_STRING'
              AND cg.gene_key <> $1
              AND COALESCE(c.strength_score, 0) >= $2
            GROUP BY g.gene_key, g.symbol, c.claim_key, c.claim_type, c.polarity,
                     c.strength_score, c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, g.gene_key
            LIMIT $3
            "#
        );
        sqlx::query_as::<_, GeneLinkRow>(&sql)
            .bind(gene_key)
            .bind(min_score)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn drug_adverse_events(
        &self,
        drug_key: i64,
        min_frequency: f64,
        limit: i64,
    ) -> Result<Vec<AeLinkRow>> {
        let sql = format!(
            r#"
            SELECT ae.ae_key, ae.label AS ae_label,
                   c.claim_key, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_adverse_event cae ON cae.claim_key = c.claim_key
            JOIN adverse_event ae ON ae.ae_key = cae.ae_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'drug' AND hc.entity_key = $1
              AND c.claim_type = 'DRUG_AE_LABEL'
              AND COALESCE(c.strength_score, 0) >= $2
            GROUP BY ae.ae_key, ae.label, c.claim_key, c.strength_score, c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, ae.ae_key
            LIMIT $3
            "#
        );
        sqlx::query_as::<_, AeLinkRow>(&sql)
            .bind(drug_key)
            .bind(min_frequency)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn drug_label_sections(
        &self,
        drug_key: i64,
        sections: Option<&[String]>,
    ) -> Result<Vec<LabelSectionRow>> {
        // Section bodies are capped at 10 KB each at the query boundary.
        sqlx::query_as::<_, LabelSectionRow>(
            r#"
            SELECT section, LEFT(body, 10240) AS body
            FROM drug_label_section
            WHERE drug_key = $1
              AND ($2::text[] IS NULL OR section = ANY($2))
            ORDER BY section
            "#,
        )
        .bind(drug_key)
        .bind(sections.map(|s| s.to_vec()))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn drug_faers_signals(
        &self,
        drug_key: i64,
        min_count: i64,
        min_prr: f64,
        limit: i64,
    ) -> Result<Vec<FaersSignalRow>> {
        let sql = format!(
            r#"
            SELECT ae.ae_key, ae.label AS ae_label, fs.claim_key,
                   fs.prr, fs.ror, fs.chi_sq, fs.case_count, fs.report_period,
                   c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM faers_signal fs
            JOIN adverse_event ae ON ae.ae_key = fs.ae_key
            JOIN claim c ON c.claim_key = fs.claim_key
            LEFT JOIN supported_by sb ON sb.claim_key = fs.claim_key
            WHERE fs.drug_key = $1
              AND fs.case_count >= $2
              AND fs.prr >= $3
            GROUP BY ae.ae_key, ae.label, fs.claim_key, fs.prr, fs.ror, fs.chi_sq,
                     fs.case_count, fs.report_period, c.dataset_key
            ORDER BY fs.prr DESC, ae.ae_key
            LIMIT $4
            "#
        );
        sqlx::query_as::<_, FaersSignalRow>(&sql)
            .bind(drug_key)
            .bind(min_count)
            .bind(min_prr)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn drug_direct_aes(&self, drug_key: i64) -> Result<Vec<AeLinkRow>> {
        let sql = format!(
            r#"
            SELECT ae.ae_key, ae.label AS ae_label,
                   c.claim_key, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_adverse_event cae ON cae.claim_key = c.claim_key
            JOIN adverse_event ae ON ae.ae_key = cae.ae_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'drug' AND hc.entity_key = $1
              AND c.claim_type IN ('DRUG_AE_LABEL', 'DRUG_AE_FAERS')
            GROUP BY ae.ae_key, ae.label, c.claim_key, c.strength_score, c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, ae.ae_key
            "#
        );
        sqlx::query_as::<_, AeLinkRow>(&sql)
            .bind(drug_key)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn pathway_aes(&self, pathway_key: i64) -> Result<Vec<AeLinkRow>> {
        let sql = format!(
            r#"
            SELECT ae.ae_key, ae.label AS ae_label,
                   c.claim_key, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_adverse_event cae ON cae.claim_key = c.claim_key
            JOIN adverse_event ae ON ae.ae_key = cae.ae_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'pathway' AND hc.entity_key = $1
              AND c.claim_type = 'PATHWAY_AE'
            GROUP BY ae.ae_key, ae.label, c.claim_key, c.strength_score, c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, ae.ae_key
            "#
        );
        sqlx::query_as::<_, AeLinkRow>(&sql)
            .bind(pathway_key)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn disease_aes(&self, disease_key: i64) -> Result<Vec<AeLinkRow>> {
        let sql = format!(
            r#"
            SELECT ae.ae_key, ae.label AS ae_label,
                   c.claim_key, c.strength_score, c.dataset_key,
                   {EVIDENCE_AGG} AS evidence_keys
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            JOIN claim_adverse_event cae ON cae.claim_key = c.claim_key
            JOIN adverse_event ae ON ae.ae_key = cae.ae_key
            LEFT JOIN supported_by sb ON sb.claim_key = c.claim_key
            WHERE hc.entity_kind = 'disease' AND hc.entity_key = $1
              AND c.claim_type = 'DISEASE_AE'
            GROUP BY ae.ae_key, ae.label, c.claim_key, c.strength_score, c.dataset_key
            ORDER BY c.strength_score DESC NULLS LAST, ae.ae_key
            "#
        );
        sqlx::query_as::<_, AeLinkRow>(&sql)
            .bind(disease_key)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn claim(&self, claim_key: i64) -> Result<Option<ClaimRow>> {
        sqlx::query_as::<_, ClaimRow>(
            r#"
            SELECT claim_key, claim_type, polarity, strength_score, dataset_key,
                   source_record_id, statement
            FROM claim
            WHERE claim_key = $1
            "#,
        )
        .bind(claim_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn claim_evidence(&self, claim_key: i64) -> Result<Vec<EvidenceRow>> {
        sqlx::query_as::<_, EvidenceRow>(
            r#"
            SELECT e.evidence_key, e.evidence_type, e.source_record_id, e.source_url, e.payload
            FROM supported_by sb
            JOIN evidence e ON e.evidence_key = sb.evidence_key
            WHERE sb.claim_key = $1
            ORDER BY e.evidence_key
            "#,
        )
        .bind(claim_key)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn entity_claims(
        &self,
        kind: EntityKind,
        entity_key: i64,
        claim_types: Option<&[String]>,
        limit: i64,
    ) -> Result<Vec<ClaimRow>> {
        sqlx::query_as::<_, ClaimRow>(
            r#"
            SELECT c.claim_key, c.claim_type, c.polarity, c.strength_score, c.dataset_key,
                   c.source_record_id, c.statement
            FROM has_claim hc
            JOIN claim c ON c.claim_key = hc.claim_key
            WHERE hc.entity_kind = $1 AND hc.entity_key = $2
              AND ($3::text[] IS NULL OR c.claim_type = ANY($3))
            ORDER BY c.strength_score DESC NULLS LAST, c.claim_key
            LIMIT $4
            "#,
        )
        .bind(kind.as_str())
        .bind(entity_key)
        .bind(claim_types.map(|t| t.to_vec()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }
}
