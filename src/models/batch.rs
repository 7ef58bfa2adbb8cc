use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::mapping::Correction;
use crate::models::DuplicatePolicy;

/// Per-invocation settings supplied alongside the raw records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchConfig {
    /// Category label (zh or en name). Ignored when `category_id` is set.
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(alias = "category_id")]
    pub category_id: Option<String>,
    #[serde(alias = "subcategory_id")]
    pub subcategory_id: Option<String>,
    pub on_duplicate: Option<DuplicatePolicy>,
    /// Per-external-id policy overrides.
    pub decisions: HashMap<String, DuplicatePolicy>,
    /// Extra source-data corrections keyed by external id.
    pub corrections: HashMap<String, Correction>,
}

impl BatchConfig {
    pub fn policy_for(&self, external_id: &str, default: DuplicatePolicy) -> DuplicatePolicy {
        self.decisions
            .get(external_id)
            .copied()
            .or(self.on_duplicate)
            .unwrap_or(default)
    }
}

/// Taxonomy resolved once per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTaxonomy {
    pub category_id: String,
    pub subcategory_id: String,
    pub default_image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeAction {
    Inserted,
    Updated,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub action: MergeAction,
    pub store_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub id: String,
    pub error: String,
}

/// Per-item result as reported to callers:
/// `{id, created|updated|skipped: true, storeId}` or `{id, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemReport {
    pub fn from_outcome(id: &str, outcome: &std::result::Result<MergeOutcome, ItemError>) -> Self {
        let mut report = Self {
            id: id.to_string(),
            created: None,
            updated: None,
            skipped: None,
            store_id: None,
            error: None,
        };
        match outcome {
            Ok(merge) => {
                match merge.action {
                    MergeAction::Inserted => report.created = Some(true),
                    MergeAction::Updated => report.updated = Some(true),
                    MergeAction::Skipped => report.skipped = Some(true),
                }
                report.store_id = Some(merge.store_id.clone());
            }
            Err(e) => report.error = Some(e.error.clone()),
        }
        report
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub results: Vec<ItemReport>,
    pub errors: Vec<ItemError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
}

impl BatchReport {
    /// A batch that never started: no item ran, one setup error.
    pub fn aborted(total: usize, error: String) -> Self {
        Self {
            summary: BatchSummary { total, successful: 0, failed: 0 },
            results: Vec::new(),
            errors: Vec::new(),
            setup_error: Some(error),
        }
    }

    pub fn from_outcomes(outcomes: Vec<(String, std::result::Result<MergeOutcome, ItemError>)>) -> Self {
        let mut report = Self::default();
        report.summary.total = outcomes.len();
        for (id, outcome) in &outcomes {
            report.results.push(ItemReport::from_outcome(id, outcome));
            match outcome {
                Ok(_) => report.summary.successful += 1,
                Err(e) => {
                    report.summary.failed += 1;
                    report.errors.push(e.clone());
                }
            }
        }
        report
    }
}
