use std::sync::Arc;

use crate::models::*;
use crate::storage::CatalogStore;

/// Insert-or-update against existing rows located by external-id marker.
#[derive(Clone)]
pub struct DedupMerger {
    store: Arc<dyn CatalogStore>,
}

impl DedupMerger {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn find_existing(&self, external_id: &str) -> Result<Option<TechnologyRecord>> {
        self.store.find_technology_by_marker(external_id).await
    }

    pub async fn merge(
        &self,
        candidate: TechnologyRecord,
        image_origin: ImageOrigin,
        policy: DuplicatePolicy,
    ) -> Result<MergeOutcome> {
        if let Some(existing) = self.find_existing(&candidate.external_id).await? {
            return self.apply_policy(&existing, &candidate, image_origin, policy).await;
        }

        match self.store.insert_technology(&candidate).await {
            Ok(()) => {
                tracing::debug!(external_id = %candidate.external_id, store_id = %candidate.id, "Inserted technology");
                Ok(MergeOutcome { action: MergeAction::Inserted, store_id: candidate.id })
            }
            // Lost an insert race on the unique external_id index: correlate again once.
            Err(e) if e.is_duplicate_key() => {
                tracing::warn!(external_id = %candidate.external_id, error = %e, "Concurrent insert detected; re-correlating");
                match self.find_existing(&candidate.external_id).await? {
                    Some(existing) => self.apply_policy(&existing, &candidate, image_origin, policy).await,
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_policy(
        &self,
        existing: &TechnologyRecord,
        candidate: &TechnologyRecord,
        image_origin: ImageOrigin,
        policy: DuplicatePolicy,
    ) -> Result<MergeOutcome> {
        match policy {
            DuplicatePolicy::Skip => {
                tracing::debug!(external_id = %candidate.external_id, store_id = %existing.id, "Skipped existing technology");
                Ok(MergeOutcome { action: MergeAction::Skipped, store_id: existing.id.clone() })
            }
            DuplicatePolicy::Overwrite => {
                let changes = TechnologyChanges::between(existing, candidate, image_origin);
                self.store.update_technology(&existing.id, &changes).await?;
                tracing::debug!(external_id = %candidate.external_id, store_id = %existing.id, "Updated existing technology");
                Ok(MergeOutcome { action: MergeAction::Updated, store_id: existing.id.clone() })
            }
        }
    }
}
