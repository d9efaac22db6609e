//! Mechanism traversal tools: targets, pathways, disease associations,
//! interactors and the convenience expansions over them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{check_fraction, check_limit, ToolError, ToolLibrary};
use crate::graph::{DiseaseLinkRow, GeneLinkRow, PathwayLinkRow};

const DEFAULT_ASSOC_LIMIT: i64 = 25;

/// A drug's targets together with the pathways those targets participate
/// in, deduplicated by pathway key (strongest claim kept).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MechanismExpansion {
    pub targets: Vec<GeneLinkRow>,
    pub pathways: Vec<PathwayLinkRow>,
}

/// Pathway and disease context for one gene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneContext {
    pub gene_key: i64,
    pub pathways: Vec<PathwayLinkRow>,
    pub diseases: Vec<DiseaseLinkRow>,
}

impl ToolLibrary {
    /// Genes the drug is asserted to target.
    pub async fn get_drug_targets(&self, drug_key: i64) -> Result<Vec<GeneLinkRow>, ToolError> {
        self.store()
            .drug_targets(drug_key)
            .await
            .map_err(ToolError::from_store)
    }

    /// Pathways a gene participates in.
    pub async fn get_gene_pathways(
        &self,
        gene_key: i64,
    ) -> Result<Vec<PathwayLinkRow>, ToolError> {
        self.store()
            .gene_pathways(gene_key)
            .await
            .map_err(ToolError::from_store)
    }

    /// Disease associations for a gene, above a minimum strength.
    pub async fn get_gene_diseases(
        &self,
        gene_key: i64,
        min_score: Option<f64>,
    ) -> Result<Vec<DiseaseLinkRow>, ToolError> {
        let min_score = check_fraction("min_score", min_score)?;
        self.store()
            .gene_diseases(gene_key, min_score)
            .await
            .map_err(ToolError::from_store)
    }

    /// Genes associated with a disease, optionally restricted to specific
    /// source datasets.
    pub async fn get_disease_genes(
        &self,
        disease_key: i64,
        sources: Option<Vec<String>>,
        min_score: Option<f64>,
        limit: Option<i64>,
    ) -> Result<Vec<GeneLinkRow>, ToolError> {
        let min_score = check_fraction("min_score", min_score)?;
        let limit = check_limit("limit", limit, DEFAULT_ASSOC_LIMIT)?;
        self.store()
            .disease_genes(disease_key, sources.as_deref(), min_score, limit)
            .await
            .map_err(ToolError::from_store)
    }

    /// Protein-protein interaction partners of a gene.
    pub async fn get_gene_interactors(
        &self,
        gene_key: i64,
        min_score: Option<f64>,
        limit: Option<i64>,
    ) -> Result<Vec<GeneLinkRow>, ToolError> {
        let min_score = check_fraction("min_score", min_score)?;
        let limit = check_limit("limit", limit, DEFAULT_ASSOC_LIMIT)?;
        self.store()
            .gene_interactors(gene_key, min_score, limit)
            .await
            .map_err(ToolError::from_store)
    }

    /// Targets of a drug plus the union of their pathways.
    pub async fn expand_mechanism(
        &self,
        drug_key: i64,
    ) -> Result<MechanismExpansion, ToolError> {
        let targets = self.get_drug_targets(drug_key).await?;
        let mut pathways: IndexMap<i64, PathwayLinkRow> = IndexMap::new();
        for target in &targets {
            for pathway in self.get_gene_pathways(target.gene_key).await? {
                match pathways.get(&pathway.pathway_key) {
                    Some(existing)
                        if existing.strength_score.unwrap_or(0.0)
                            >= pathway.strength_score.unwrap_or(0.0) => {}
                    _ => {
                        pathways.insert(pathway.pathway_key, pathway);
                    }
                }
            }
        }
        Ok(MechanismExpansion {
            targets,
            pathways: pathways.into_values().collect(),
        })
    }

    /// Pathway and disease context for each requested gene.
    pub async fn expand_gene_context(
        &self,
        gene_keys: &[i64],
        min_disease_score: Option<f64>,
    ) -> Result<Vec<GeneContext>, ToolError> {
        let min_disease_score = check_fraction("min_disease_score", min_disease_score)?;
        let mut contexts = Vec::with_capacity(gene_keys.len());
        for &gene_key in gene_keys {
            let pathways = self.get_gene_pathways(gene_key).await?;
            let diseases = self
                .store()
                .gene_diseases(gene_key, min_disease_score)
                .await
                .map_err(ToolError::from_store)?;
            contexts.push(GeneContext {
                gene_key,
                pathways,
                diseases,
            });
        }
        Ok(contexts)
    }
}
