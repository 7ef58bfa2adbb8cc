use std::sync::Arc;

use crate::models::*;
use crate::storage::CatalogStore;

/// A category or subcategory reference: an explicit id or a zh/en label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomySelector {
    Id(String),
    Label(String),
}

impl TaxonomySelector {
    /// An explicit id wins over a label; the label falls back to `default_label`.
    pub fn pick(id: Option<&str>, label: Option<&str>, default_label: &str) -> Self {
        let non_blank = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        match (non_blank(id), non_blank(label)) {
            (Some(id), _) => TaxonomySelector::Id(id),
            (None, Some(label)) => TaxonomySelector::Label(label),
            (None, None) => TaxonomySelector::Label(default_label.trim().to_string()),
        }
    }
}

impl std::fmt::Display for TaxonomySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxonomySelector::Id(id) => write!(f, "id {}", id),
            TaxonomySelector::Label(label) => write!(f, "'{}'", label),
        }
    }
}

#[derive(Clone)]
pub struct TaxonomyResolver {
    store: Arc<dyn CatalogStore>,
}

impl TaxonomyResolver {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Resolved once per batch. Any miss is fatal for the whole batch.
    pub async fn resolve(
        &self,
        category: &TaxonomySelector,
        subcategory: &TaxonomySelector,
    ) -> Result<ResolvedTaxonomy> {
        let found = match category {
            TaxonomySelector::Id(id) => self.store.find_category_by_id(id).await?,
            TaxonomySelector::Label(label) => self.store.find_category_by_name(label).await?,
        };
        let category_row = found.ok_or_else(|| IngestionError::Taxonomy(format!("Category {} not found", category)))?;

        let found = match subcategory {
            TaxonomySelector::Id(id) => self.store.find_subcategory_by_id(&category_row.id, id).await?,
            TaxonomySelector::Label(label) => self.store.find_subcategory_by_name(&category_row.id, label).await?,
        };
        let subcategory_row = found.ok_or_else(|| {
            IngestionError::Taxonomy(format!(
                "Subcategory {} not found under category '{}'",
                subcategory, category_row.name_zh
            ))
        })?;

        tracing::info!(
            category_id = %category_row.id,
            subcategory_id = %subcategory_row.id,
            "Resolved batch taxonomy"
        );

        Ok(ResolvedTaxonomy {
            category_id: category_row.id,
            subcategory_id: subcategory_row.id,
            default_image_url: subcategory_row
                .default_tech_image_url
                .filter(|u| !u.trim().is_empty()),
        })
    }
}
