//! Adverse-event tools: label frequencies, label text, FAERS
//! disproportionality signals and the combined drug profile.

use serde::{Deserialize, Serialize};

use super::{check_fraction, check_limit, ToolError, ToolLibrary};
use crate::graph::{AeLinkRow, DrugRow, FaersSignalRow, GeneLinkRow, LabelSectionRow};

const DEFAULT_AE_LIMIT: i64 = 50;
const DEFAULT_FAERS_TOP_K: usize = 20;
const PROFILE_AE_LIMIT: i64 = 20;

/// Basic drug info plus its top adverse events and targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugProfile {
    pub drug: Option<DrugRow>,
    pub adverse_events: Vec<AeLinkRow>,
    pub targets: Vec<GeneLinkRow>,
}

impl ToolLibrary {
    /// Label adverse events for a drug, descending by frequency.
    pub async fn get_drug_adverse_events(
        &self,
        drug_key: i64,
        min_frequency: Option<f64>,
        limit: Option<i64>,
    ) -> Result<Vec<AeLinkRow>, ToolError> {
        let min_frequency = check_fraction("min_frequency", min_frequency)?;
        let limit = check_limit("limit", limit, DEFAULT_AE_LIMIT)?;
        self.store()
            .drug_adverse_events(drug_key, min_frequency, limit)
            .await
            .map_err(ToolError::from_store)
    }

    /// Structured product label sections, each capped at 10 KB.
    pub async fn get_drug_label_sections(
        &self,
        drug_key: i64,
        sections: Option<Vec<String>>,
    ) -> Result<Vec<LabelSectionRow>, ToolError> {
        let rows = self
            .store()
            .drug_label_sections(drug_key, sections.as_deref())
            .await
            .map_err(ToolError::from_store)?;
        if let Some(requested) = &sections {
            if rows.is_empty() && !requested.is_empty() {
                tracing::debug!(drug_key, ?requested, "no matching label sections");
            }
        }
        Ok(rows)
    }

    /// FAERS disproportionality metrics, strongest signals first.
    pub async fn get_drug_faers_signals(
        &self,
        drug_key: i64,
        top_k: Option<usize>,
        min_count: Option<i64>,
        min_prr: Option<f64>,
    ) -> Result<Vec<FaersSignalRow>, ToolError> {
        let top_k = top_k.unwrap_or(DEFAULT_FAERS_TOP_K);
        if top_k == 0 {
            return Err(ToolError::invalid_args("top_k must be positive"));
        }
        let min_count = min_count.unwrap_or(0);
        if min_count < 0 {
            return Err(ToolError::invalid_args(format!(
                "min_count must be non-negative, got {min_count}"
            )));
        }
        let min_prr = min_prr.unwrap_or(0.0);
        if min_prr < 0.0 {
            return Err(ToolError::invalid_args(format!(
                "min_prr must be non-negative, got {min_prr}"
            )));
        }
        self.store()
            .drug_faers_signals(drug_key, min_count, min_prr, top_k as i64)
            .await
            .map_err(ToolError::from_store)
    }

    /// Basic info, top-20 adverse events and targets in one call.
    pub async fn get_drug_profile(&self, drug_key: i64) -> Result<DrugProfile, ToolError> {
        let drug = self
            .store()
            .drug(drug_key)
            .await
            .map_err(ToolError::from_store)?;
        if drug.is_none() {
            return Ok(DrugProfile {
                drug: None,
                adverse_events: Vec::new(),
                targets: Vec::new(),
            });
        }
        let adverse_events = self
            .store()
            .drug_adverse_events(drug_key, 0.0, PROFILE_AE_LIMIT)
            .await
            .map_err(ToolError::from_store)?;
        let targets = self.get_drug_targets(drug_key).await?;
        Ok(DrugProfile {
            drug,
            adverse_events,
            targets,
        })
    }
}
