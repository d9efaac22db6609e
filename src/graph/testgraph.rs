//! In-memory [`GraphStore`] used by the test suite.
//!
//! Mirrors the Postgres gateway's ordering and filtering semantics, adds
//! a query counter (for the "no second graph query" properties) plus
//! failure and latency injection for dispatcher tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::rows::{
    AdverseEventRow, AeLinkRow, ClaimRow, DiseaseLinkRow, DiseaseRow, DrugRow, EntityKind,
    EvidenceRow, FaersSignalRow, GeneLinkRow, GeneRow, LabelSectionRow, PathwayLinkRow,
    PathwayRow,
};
use super::GraphStore;
use crate::error::{Error, Result};

/// How injected store failures surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Transport-level: maps to `graph.unavailable`.
    Transport,
    /// Query-level: maps to `tool.upstream`.
    Query,
}

#[derive(Default)]
pub struct TestGraph {
    drugs: Vec<DrugRow>,
    genes: Vec<GeneRow>,
    diseases: Vec<DiseaseRow>,
    aes: Vec<AdverseEventRow>,
    pathways: Vec<PathwayRow>,
    claims: HashMap<i64, ClaimRow>,
    evidence: HashMap<i64, Vec<EvidenceRow>>,
    drug_gene: Vec<(i64, i64, i64)>,
    gene_pathway: Vec<(i64, i64, i64)>,
    gene_disease: Vec<(i64, i64, i64)>,
    gene_gene: Vec<(i64, i64, i64)>,
    drug_ae: Vec<(i64, i64, i64)>,
    pathway_ae: Vec<(i64, i64, i64)>,
    disease_ae: Vec<(i64, i64, i64)>,
    faers: Vec<(i64, FaersSignalRow)>,
    label_sections: Vec<(i64, LabelSectionRow)>,
    queries: AtomicUsize,
    failure: Mutex<Option<FailureMode>>,
    delay: Mutex<Option<Duration>>,
}

impl TestGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard fixture: lisinopril targeting ACE in the
    /// renin-angiotensin pathway, a weak-target second drug, label and
    /// FAERS adverse events, and one disease association per gene.
    pub fn seeded() -> Self {
        let mut g = Self::new();

        g.drugs.push(DrugRow {
            drug_key: 14042,
            name: "lisinopril".into(),
            drugcentral_id: Some("DC14042".into()),
            chembl_id: Some("CHEMBL1237".into()),
            pubchem_cid: Some(5_362_119),
            inchi_key: None,
            synonyms: vec!["Prinivil".into(), "Zestril".into()],
        });
        g.drugs.push(DrugRow {
            drug_key: 14043,
            name: "enalapril".into(),
            drugcentral_id: None,
            chembl_id: Some("CHEMBL1236".into()),
            pubchem_cid: None,
            inchi_key: None,
            synonyms: vec![],
        });

        g.genes.push(GeneRow {
            gene_key: 7,
            symbol: "ACE".into(),
            hgnc_id: Some("HGNC:2707".into()),
            ensembl_id: Some("ENSG00000159640".into()),
            uniprot_id: Some("P12821".into()),
        });
        g.genes.push(GeneRow {
            gene_key: 8,
            symbol: "AGT".into(),
            hgnc_id: Some("HGNC:333".into()),
            ensembl_id: None,
            uniprot_id: None,
        });

        g.pathways.push(PathwayRow {
            pathway_key: 31,
            label: "Renin-angiotensin system".into(),
            source_id: Some("R-HSA-2022377".into()),
        });

        g.diseases.push(DiseaseRow {
            disease_key: 55,
            label: "Hypertension".into(),
            ontology_id: Some("MONDO:0005044".into()),
            synonyms: vec!["high blood pressure".into()],
        });

        for (key, label, code) in [
            (501, "Cough", "10011224"),
            (502, "Dizziness", "10013573"),
            (503, "Headache", "10019211"),
            (504, "Fatigue", "10016256"),
            (505, "Angioedema", "10002424"),
        ] {
            g.aes.push(AdverseEventRow {
                ae_key: key,
                label: label.into(),
                meddra_code: Some(code.into()),
            });
        }

        g.add_claim(1001, "DRUG_TARGET", Some(0.8), "drugcentral", &[9001]);
        g.drug_gene.push((14042, 7, 1001));

        g.add_claim(1002, "GENE_PATHWAY", Some(0.9), "reactome", &[9002]);
        g.gene_pathway.push((7, 31, 1002));

        g.add_claim(1003, "DRUG_AE_LABEL", Some(0.05), "sider", &[9003]);
        g.drug_ae.push((14042, 501, 1003));

        g.add_claim(1004, "GENE_DISEASE", Some(0.6), "opentargets", &[9004]);
        g.gene_disease.push((7, 55, 1004));

        g.add_claim(1005, "DRUG_AE_LABEL", Some(0.12), "sider", &[9005]);
        g.drug_ae.push((14042, 502, 1005));
        g.add_claim(1006, "DRUG_AE_LABEL", Some(0.08), "sider", &[9006]);
        g.drug_ae.push((14042, 503, 1006));
        g.add_claim(1007, "DRUG_AE_LABEL", Some(0.003), "sider", &[9007]);
        g.drug_ae.push((14042, 504, 1007));

        g.add_claim(1008, "DRUG_TARGET", Some(0.4), "chembl", &[9010]);
        g.drug_gene.push((14043, 8, 1008));
        g.add_claim(1009, "GENE_DISEASE", Some(0.5), "opentargets", &[9011]);
        g.gene_disease.push((8, 55, 1009));

        g.add_claim(1020, "GENE_GENE_STRING", Some(0.7), "string", &[9020]);
        g.gene_gene.push((7, 8, 1020));

        for (claim_key, ae_key, prr, ror, chi_sq, count, ev) in [
            (2001, 501, 4.2, Some(4.5), Some(88.0), 120, 9101),
            (2002, 505, 8.5, Some(9.1), Some(154.0), 40, 9102),
            (2003, 502, 1.8, Some(1.9), Some(6.2), 9, 9103),
        ] {
            g.add_claim(claim_key, "DRUG_AE_FAERS", None, "faers", &[ev]);
            g.drug_ae.push((14042, ae_key, claim_key));
            let label = g.ae_label(ae_key);
            g.faers.push((
                14042,
                FaersSignalRow {
                    ae_key,
                    ae_label: label,
                    claim_key,
                    prr,
                    ror,
                    chi_sq,
                    case_count: count,
                    report_period: Some("2019Q1-2024Q4".into()),
                    dataset_key: "faers".into(),
                    evidence_keys: vec![ev],
                },
            ));
        }

        g.label_sections.push((
            14042,
            LabelSectionRow {
                section: "adverse_reactions".into(),
                body: "Cough, dizziness and headache were the most commonly reported.".into(),
            },
        ));
        g.label_sections.push((
            14042,
            LabelSectionRow {
                section: "warnings".into(),
                body: "Angioedema of the face, extremities, lips and tongue has been reported."
                    .into(),
            },
        ));

        g
    }

    pub fn add_claim(
        &mut self,
        claim_key: i64,
        claim_type: &str,
        strength: Option<f64>,
        dataset: &str,
        evidence_keys: &[i64],
    ) {
        self.claims.insert(
            claim_key,
            ClaimRow {
                claim_key,
                claim_type: claim_type.into(),
                polarity: 1,
                strength_score: strength,
                dataset_key: dataset.into(),
                source_record_id: Some(format!("{dataset}:{claim_key}")),
                statement: None,
            },
        );
        self.evidence.insert(
            claim_key,
            evidence_keys
                .iter()
                .map(|&evidence_key| EvidenceRow {
                    evidence_key,
                    evidence_type: "source_record".into(),
                    source_record_id: Some(format!("rec-{evidence_key}")),
                    source_url: Some(format!("https://example.org/evidence/{evidence_key}")),
                    payload: None,
                })
                .collect(),
        );
    }

    pub fn add_drug(&mut self, drug_key: i64, name: &str, xrefs: &[&str]) {
        self.drugs.push(DrugRow {
            drug_key,
            name: name.into(),
            drugcentral_id: None,
            chembl_id: xrefs.first().map(|x| x.to_string()),
            pubchem_cid: None,
            inchi_key: None,
            synonyms: vec![],
        });
    }

    pub fn add_gene(&mut self, gene_key: i64, symbol: &str) {
        self.genes.push(GeneRow {
            gene_key,
            symbol: symbol.into(),
            hgnc_id: None,
            ensembl_id: None,
            uniprot_id: None,
        });
    }

    pub fn push_drug_target(&mut self, drug_key: i64, gene_key: i64, claim_key: i64) {
        self.drug_gene.push((drug_key, gene_key, claim_key));
    }

    /// Attach one more label adverse event to a drug.
    pub fn add_label_ae(&mut self, drug_key: i64, ae_key: i64, label: &str, frequency: f64) {
        if !self.aes.iter().any(|a| a.ae_key == ae_key) {
            self.aes.push(AdverseEventRow {
                ae_key,
                label: label.into(),
                meddra_code: None,
            });
        }
        let claim_key = 50_000 + ae_key;
        self.add_claim(claim_key, "DRUG_AE_LABEL", Some(frequency), "sider", &[
            80_000 + ae_key,
        ]);
        self.drug_ae.push((drug_key, ae_key, claim_key));
    }

    pub fn set_failure(&self, mode: Option<FailureMode>) {
        *self.failure.lock().unwrap() = mode;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn ae_label(&self, ae_key: i64) -> String {
        self.aes
            .iter()
            .find(|a| a.ae_key == ae_key)
            .map(|a| a.label.clone())
            .unwrap_or_default()
    }

    async fn touch(&self) -> Result<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match *self.failure.lock().unwrap() {
            Some(FailureMode::Transport) => {
                Err(Error::GraphUnavailable("connection refused".into()))
            }
            Some(FailureMode::Query) => Err(Error::GraphQuery("bad row".into())),
            None => Ok(()),
        }
    }

    fn claim_of(&self, claim_key: i64) -> &ClaimRow {
        &self.claims[&claim_key]
    }

    fn evidence_keys_of(&self, claim_key: i64) -> Vec<i64> {
        self.evidence
            .get(&claim_key)
            .map(|rows| rows.iter().map(|e| e.evidence_key).collect())
            .unwrap_or_default()
    }

    fn gene_link(&self, gene_key: i64, claim_key: i64) -> GeneLinkRow {
        let gene = self.genes.iter().find(|g| g.gene_key == gene_key).unwrap();
        let claim = self.claim_of(claim_key);
        GeneLinkRow {
            gene_key,
            gene_symbol: gene.symbol.clone(),
            claim_key,
            claim_type: claim.claim_type.clone(),
            polarity: claim.polarity,
            strength_score: claim.strength_score,
            dataset_key: claim.dataset_key.clone(),
            evidence_keys: self.evidence_keys_of(claim_key),
        }
    }

    fn ae_link(&self, ae_key: i64, claim_key: i64) -> AeLinkRow {
        let claim = self.claim_of(claim_key);
        AeLinkRow {
            ae_key,
            ae_label: self.ae_label(ae_key),
            claim_key,
            strength_score: claim.strength_score,
            dataset_key: claim.dataset_key.clone(),
            evidence_keys: self.evidence_keys_of(claim_key),
        }
    }

    fn sort_by_strength_desc<T, F: Fn(&T) -> Option<f64>>(rows: &mut [T], strength: F) {
        rows.sort_by(|a, b| {
            let (sa, sb) = (strength(a), strength(b));
            match (sa, sb) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap(),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
    }
}

#[async_trait]
impl GraphStore for TestGraph {
    async fn probe(&self) -> Result<()> {
        Ok(())
    }

    async fn drugs_by_name(&self, name: &str) -> Result<Vec<DrugRow>> {
        self.touch().await?;
        let mut rows: Vec<DrugRow> = self
            .drugs
            .iter()
            .filter(|d| d.name == name)
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.drug_key);
        Ok(rows)
    }

    async fn drugs_by_xref(&self, term: &str) -> Result<Vec<DrugRow>> {
        self.touch().await?;
        Ok(self
            .drugs
            .iter()
            .filter(|d| {
                d.drugcentral_id.as_deref() == Some(term)
                    || d.chembl_id.as_deref() == Some(term)
                    || d.inchi_key.as_deref() == Some(term)
                    || d.pubchem_cid.map(|c| c.to_string()).as_deref() == Some(term)
            })
            .cloned()
            .collect())
    }

    async fn drugs_by_name_prefix(&self, term: &str) -> Result<Vec<DrugRow>> {
        self.touch().await?;
        let needle = term.to_lowercase();
        let mut rows: Vec<DrugRow> = self
            .drugs
            .iter()
            .filter(|d| d.name.to_lowercase().starts_with(&needle))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.len().cmp(&b.name.len()).then(a.drug_key.cmp(&b.drug_key)));
        rows.truncate(20);
        Ok(rows)
    }

    async fn genes_by_symbol(&self, symbol: &str) -> Result<Vec<GeneRow>> {
        self.touch().await?;
        Ok(self
            .genes
            .iter()
            .filter(|g| g.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
            .collect())
    }

    async fn genes_by_hgnc(&self, hgnc_id: &str) -> Result<Vec<GeneRow>> {
        self.touch().await?;
        Ok(self
            .genes
            .iter()
            .filter(|g| g.hgnc_id.as_deref() == Some(hgnc_id))
            .cloned()
            .collect())
    }

    async fn diseases_by_label(&self, label: &str) -> Result<Vec<DiseaseRow>> {
        self.touch().await?;
        Ok(self
            .diseases
            .iter()
            .filter(|d| d.label.eq_ignore_ascii_case(label))
            .cloned()
            .collect())
    }

    async fn diseases_by_ontology_id(&self, ontology_id: &str) -> Result<Vec<DiseaseRow>> {
        self.touch().await?;
        Ok(self
            .diseases
            .iter()
            .filter(|d| d.ontology_id.as_deref() == Some(ontology_id))
            .cloned()
            .collect())
    }

    async fn diseases_by_label_substring(&self, term: &str) -> Result<Vec<DiseaseRow>> {
        self.touch().await?;
        let needle = term.to_lowercase();
        let mut rows: Vec<DiseaseRow> = self
            .diseases
            .iter()
            .filter(|d| d.label.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.label
                .len()
                .cmp(&b.label.len())
                .then(a.disease_key.cmp(&b.disease_key))
        });
        rows.truncate(20);
        Ok(rows)
    }

    async fn aes_by_label(&self, label: &str) -> Result<Vec<AdverseEventRow>> {
        self.touch().await?;
        Ok(self
            .aes
            .iter()
            .filter(|a| a.label.eq_ignore_ascii_case(label))
            .cloned()
            .collect())
    }

    async fn aes_by_code(&self, code: &str) -> Result<Vec<AdverseEventRow>> {
        self.touch().await?;
        Ok(self
            .aes
            .iter()
            .filter(|a| a.meddra_code.as_deref() == Some(code))
            .cloned()
            .collect())
    }

    async fn aes_by_label_substring(&self, term: &str) -> Result<Vec<AdverseEventRow>> {
        self.touch().await?;
        let needle = term.to_lowercase();
        let mut rows: Vec<AdverseEventRow> = self
            .aes
            .iter()
            .filter(|a| a.label.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.label.len().cmp(&b.label.len()).then(a.ae_key.cmp(&b.ae_key)));
        rows.truncate(20);
        Ok(rows)
    }

    async fn drug(&self, drug_key: i64) -> Result<Option<DrugRow>> {
        self.touch().await?;
        Ok(self.drugs.iter().find(|d| d.drug_key == drug_key).cloned())
    }

    async fn drug_targets(&self, drug_key: i64) -> Result<Vec<GeneLinkRow>> {
        self.touch().await?;
        let mut rows: Vec<GeneLinkRow> = self
            .drug_gene
            .iter()
            .filter(|(d, _, _)| *d == drug_key)
            .map(|(_, gene, claim)| self.gene_link(*gene, *claim))
            .collect();
        Self::sort_by_strength_desc(&mut rows, |r| r.strength_score);
        Ok(rows)
    }

    async fn gene_pathways(&self, gene_key: i64) -> Result<Vec<PathwayLinkRow>> {
        self.touch().await?;
        let mut rows: Vec<PathwayLinkRow> = self
            .gene_pathway
            .iter()
            .filter(|(g, _, _)| *g == gene_key)
            .map(|(_, pathway_key, claim_key)| {
                let pathway = self
                    .pathways
                    .iter()
                    .find(|p| p.pathway_key == *pathway_key)
                    .unwrap();
                let claim = self.claim_of(*claim_key);
                PathwayLinkRow {
                    pathway_key: *pathway_key,
                    pathway_label: pathway.label.clone(),
                    claim_key: *claim_key,
                    strength_score: claim.strength_score,
                    dataset_key: claim.dataset_key.clone(),
                    evidence_keys: self.evidence_keys_of(*claim_key),
                }
            })
            .collect();
        Self::sort_by_strength_desc(&mut rows, |r| r.strength_score);
        Ok(rows)
    }

    async fn gene_diseases(&self, gene_key: i64, min_score: f64) -> Result<Vec<DiseaseLinkRow>> {
        self.touch().await?;
        let mut rows: Vec<DiseaseLinkRow> = self
            .gene_disease
            .iter()
            .filter(|(g, _, _)| *g == gene_key)
            .map(|(_, disease_key, claim_key)| {
                let disease = self
                    .diseases
                    .iter()
                    .find(|d| d.disease_key == *disease_key)
                    .unwrap();
                let claim = self.claim_of(*claim_key);
                DiseaseLinkRow {
                    disease_key: *disease_key,
                    disease_label: disease.label.clone(),
                    ontology_id: disease.ontology_id.clone(),
                    claim_key: *claim_key,
                    strength_score: claim.strength_score,
                    dataset_key: claim.dataset_key.clone(),
                    evidence_keys: self.evidence_keys_of(*claim_key),
                }
            })
            .filter(|r| r.strength_score.unwrap_or(0.0) >= min_score)
            .collect();
        Self::sort_by_strength_desc(&mut rows, |r| r.strength_score);
        Ok(rows)
    }

    async fn disease_genes(
        &self,
        disease_key: i64,
        sources: Option<&[String]>,
        min_score: f64,
        limit: i64,
    ) -> Result<Vec<GeneLinkRow>> {
        self.touch().await?;
        let mut rows: Vec<GeneLinkRow> = self
            .gene_disease
            .iter()
            .filter(|(_, d, _)| *d == disease_key)
            .map(|(gene, _, claim)| self.gene_link(*gene, *claim))
            .filter(|r| r.strength_score.unwrap_or(0.0) >= min_score)
            .filter(|r| {
                sources
                    .map(|s| s.contains(&r.dataset_key))
                    .unwrap_or(true)
            })
            .collect();
        Self::sort_by_strength_desc(&mut rows, |r| r.strength_score);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn gene_interactors(
        &self,
        gene_key: i64,
        min_score: f64,
        limit: i64,
    ) -> Result<Vec<GeneLinkRow>> {
        self.touch().await?;
        let mut rows: Vec<GeneLinkRow> = self
            .gene_gene
            .iter()
            .filter(|(a, b, _)| *a == gene_key || *b == gene_key)
            .map(|(a, b, claim)| {
                let partner = if *a == gene_key { *b } else { *a };
                self.gene_link(partner, *claim)
            })
            .filter(|r| r.strength_score.unwrap_or(0.0) >= min_score)
            .collect();
        Self::sort_by_strength_desc(&mut rows, |r| r.strength_score);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn drug_adverse_events(
        &self,
        drug_key: i64,
        min_frequency: f64,
        limit: i64,
    ) -> Result<Vec<AeLinkRow>> {
        self.touch().await?;
        let mut rows: Vec<AeLinkRow> = self
            .drug_ae
            .iter()
            .filter(|(d, _, claim)| {
                *d == drug_key && self.claim_of(*claim).claim_type == "DRUG_AE_LABEL"
            })
            .map(|(_, ae, claim)| self.ae_link(*ae, *claim))
            .filter(|r| r.strength_score.unwrap_or(0.0) >= min_frequency)
            .collect();
        Self::sort_by_strength_desc(&mut rows, |r| r.strength_score);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn drug_label_sections(
        &self,
        drug_key: i64,
        sections: Option<&[String]>,
    ) -> Result<Vec<LabelSectionRow>> {
        self.touch().await?;
        Ok(self
            .label_sections
            .iter()
            .filter(|(d, _)| *d == drug_key)
            .filter(|(_, row)| {
                sections
                    .map(|s| s.contains(&row.section))
                    .unwrap_or(true)
            })
            .map(|(_, row)| LabelSectionRow {
                section: row.section.clone(),
                body: row.body.chars().take(10_240).collect(),
            })
            .collect())
    }

    async fn drug_faers_signals(
        &self,
        drug_key: i64,
        min_count: i64,
        min_prr: f64,
        limit: i64,
    ) -> Result<Vec<FaersSignalRow>> {
        self.touch().await?;
        let mut rows: Vec<FaersSignalRow> = self
            .faers
            .iter()
            .filter(|(d, row)| *d == drug_key && row.case_count >= min_count && row.prr >= min_prr)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| b.prr.partial_cmp(&a.prr).unwrap().then(a.ae_key.cmp(&b.ae_key)));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn drug_direct_aes(&self, drug_key: i64) -> Result<Vec<AeLinkRow>> {
        self.touch().await?;
        let mut rows: Vec<AeLinkRow> = self
            .drug_ae
            .iter()
            .filter(|(d, _, _)| *d == drug_key)
            .map(|(_, ae, claim)| self.ae_link(*ae, *claim))
            .collect();
        Self::sort_by_strength_desc(&mut rows, |r| r.strength_score);
        Ok(rows)
    }

    async fn pathway_aes(&self, pathway_key: i64) -> Result<Vec<AeLinkRow>> {
        self.touch().await?;
        Ok(self
            .pathway_ae
            .iter()
            .filter(|(p, _, _)| *p == pathway_key)
            .map(|(_, ae, claim)| self.ae_link(*ae, *claim))
            .collect())
    }

    async fn disease_aes(&self, disease_key: i64) -> Result<Vec<AeLinkRow>> {
        self.touch().await?;
        Ok(self
            .disease_ae
            .iter()
            .filter(|(d, _, _)| *d == disease_key)
            .map(|(_, ae, claim)| self.ae_link(*ae, *claim))
            .collect())
    }

    async fn claim(&self, claim_key: i64) -> Result<Option<ClaimRow>> {
        self.touch().await?;
        Ok(self.claims.get(&claim_key).cloned())
    }

    async fn claim_evidence(&self, claim_key: i64) -> Result<Vec<EvidenceRow>> {
        self.touch().await?;
        Ok(self.evidence.get(&claim_key).cloned().unwrap_or_default())
    }

    async fn entity_claims(
        &self,
        kind: EntityKind,
        entity_key: i64,
        claim_types: Option<&[String]>,
        limit: i64,
    ) -> Result<Vec<ClaimRow>> {
        self.touch().await?;
        let claim_keys: Vec<i64> = match kind {
            EntityKind::Drug => self
                .drug_gene
                .iter()
                .filter(|(d, _, _)| *d == entity_key)
                .map(|(_, _, c)| *c)
                .chain(
                    self.drug_ae
                        .iter()
                        .filter(|(d, _, _)| *d == entity_key)
                        .map(|(_, _, c)| *c),
                )
                .collect(),
            EntityKind::Gene => self
                .drug_gene
                .iter()
                .filter(|(_, g, _)| *g == entity_key)
                .map(|(_, _, c)| *c)
                .chain(
                    self.gene_pathway
                        .iter()
                        .filter(|(g, _, _)| *g == entity_key)
                        .map(|(_, _, c)| *c),
                )
                .chain(
                    self.gene_disease
                        .iter()
                        .filter(|(g, _, _)| *g == entity_key)
                        .map(|(_, _, c)| *c),
                )
                .chain(
                    self.gene_gene
                        .iter()
                        .filter(|(a, b, _)| *a == entity_key || *b == entity_key)
                        .map(|(_, _, c)| *c),
                )
                .collect(),
            EntityKind::Disease => self
                .gene_disease
                .iter()
                .filter(|(_, d, _)| *d == entity_key)
                .map(|(_, _, c)| *c)
                .collect(),
            EntityKind::Pathway => self
                .gene_pathway
                .iter()
                .filter(|(_, p, _)| *p == entity_key)
                .map(|(_, _, c)| *c)
                .collect(),
            EntityKind::AdverseEvent => self
                .drug_ae
                .iter()
                .filter(|(_, a, _)| *a == entity_key)
                .map(|(_, _, c)| *c)
                .collect(),
        };
        let mut rows: Vec<ClaimRow> = claim_keys
            .into_iter()
            .map(|c| self.claim_of(c).clone())
            .filter(|c| {
                claim_types
                    .map(|t| t.contains(&c.claim_type))
                    .unwrap_or(true)
            })
            .collect();
        Self::sort_by_strength_desc(&mut rows, |r| r.strength_score);
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
