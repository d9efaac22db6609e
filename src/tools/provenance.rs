//! Provenance drill-down: the audit backbone behind every other tool.
//!
//! Traversal results carry claim keys; these two tools let the planner
//! (or an auditor) pull the claim and its supporting evidence records.

use serde::{Deserialize, Serialize};

use super::{check_limit, ToolError, ToolLibrary};
use crate::graph::{ClaimRow, EntityKind, EvidenceRow};

const DEFAULT_CLAIM_LIMIT: i64 = 50;

/// One claim with all evidence records supporting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEvidenceBundle {
    pub claim: Option<ClaimRow>,
    pub evidence: Vec<EvidenceRow>,
}

impl ToolLibrary {
    /// Fetch a claim and its supporting evidence.
    pub async fn get_claim_evidence(
        &self,
        claim_key: i64,
    ) -> Result<ClaimEvidenceBundle, ToolError> {
        let claim = self
            .store()
            .claim(claim_key)
            .await
            .map_err(ToolError::from_store)?;
        let evidence = match &claim {
            Some(_) => self
                .store()
                .claim_evidence(claim_key)
                .await
                .map_err(ToolError::from_store)?,
            None => Vec::new(),
        };
        Ok(ClaimEvidenceBundle { claim, evidence })
    }

    /// Claims attached to an entity, optionally filtered by claim type.
    pub async fn get_entity_claims(
        &self,
        entity_kind: EntityKind,
        entity_key: i64,
        claim_types: Option<Vec<String>>,
        limit: Option<i64>,
    ) -> Result<Vec<ClaimRow>, ToolError> {
        let limit = check_limit("limit", limit, DEFAULT_CLAIM_LIMIT)?;
        self.store()
            .entity_claims(entity_kind, entity_key, claim_types.as_deref(), limit)
            .await
            .map_err(ToolError::from_store)
    }
}
