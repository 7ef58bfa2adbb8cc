use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::DateTime as BsonDateTime;

use crate::config::Config;
use crate::mapping::{CorrectionTable, RecordNormalizer};
use crate::models::*;
use crate::processing::{AssetPipeline, BrandingSynthesizer};
use crate::resolve::{CompanyBranding, CompanyResolver, CountryResolver, TaxonomyResolver, TaxonomySelector};
use crate::storage::CatalogStore;
use crate::sync::DedupMerger;

pub const TECH_SOURCE: &str = "self_developed";
pub const ACQUISITION_METHOD: &str = "wipo";

/// Batch-independent knobs taken from `Config`.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub item_delay: Duration,
    pub default_category_label: String,
    pub default_subcategory_label: String,
    pub default_policy: DuplicatePolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            item_delay: Duration::from_millis(config.item_delay_ms),
            default_category_label: config.default_category_label.clone(),
            default_subcategory_label: config.default_subcategory_label.clone(),
            default_policy: config.default_duplicate_policy,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs a batch of raw records through normalization, resolution, asset
/// handling and merge, one item at a time.
pub struct IngestionPipeline {
    corrections: CorrectionTable,
    countries: CountryResolver,
    taxonomy: TaxonomyResolver,
    companies: CompanyResolver,
    assets: AssetPipeline,
    merger: DedupMerger,
    settings: PipelineSettings,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn CatalogStore>, assets: AssetPipeline, settings: PipelineSettings) -> Self {
        Self {
            corrections: CorrectionTable::builtin(),
            countries: CountryResolver::new(store.clone()),
            taxonomy: TaxonomyResolver::new(store.clone()),
            companies: CompanyResolver::new(store.clone(), BrandingSynthesizer::default()),
            assets,
            merger: DedupMerger::new(store),
            settings,
        }
    }

    pub fn with_corrections(mut self, corrections: CorrectionTable) -> Self {
        self.corrections = corrections;
        self
    }

    pub async fn check_existing(&self, external_id: &str) -> Result<Option<TechnologyRecord>> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(IngestionError::Validation("external id must not be blank".to_string()));
        }
        self.merger.find_existing(external_id).await
    }

    pub async fn run(&self, items: &[RawTechnologyRecord], batch: &BatchConfig) -> BatchReport {
        let total = items.len();
        let category = TaxonomySelector::pick(
            batch.category_id.as_deref(),
            batch.category.as_deref(),
            &self.settings.default_category_label,
        );
        let subcategory = TaxonomySelector::pick(
            batch.subcategory_id.as_deref(),
            batch.subcategory.as_deref(),
            &self.settings.default_subcategory_label,
        );

        let taxonomy = match self.taxonomy.resolve(&category, &subcategory).await {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, total, "Batch aborted before processing items");
                return BatchReport::aborted(total, e.to_string());
            }
        };

        let normalizer = RecordNormalizer::new(self.corrections.with_overrides(&batch.corrections));
        tracing::info!(total, corrections = self.corrections.len(), "Starting batch import");

        let mut outcomes = Vec::with_capacity(total);
        for (idx, raw) in items.iter().enumerate() {
            if idx > 0 && !self.settings.item_delay.is_zero() {
                tokio::time::sleep(self.settings.item_delay).await;
            }

            let id = raw.id.as_deref().map(str::trim).unwrap_or_default().to_string();
            let progress = format!("{}/{}", idx + 1, total);
            let outcome = self
                .process_item(raw, &normalizer, &taxonomy, batch)
                .await
                .map_err(|e| ItemError { id: id.clone(), error: e.to_string() });

            match &outcome {
                Ok(merge) => tracing::info!(
                    external_id = %id,
                    progress = %progress,
                    store_id = %merge.store_id,
                    action = ?merge.action,
                    "Item processed"
                ),
                Err(e) => tracing::warn!(external_id = %id, progress = %progress, error = %e.error, "Item failed"),
            }
            outcomes.push((id, outcome));
        }

        let report = BatchReport::from_outcomes(outcomes);
        tracing::info!(
            total = report.summary.total,
            successful = report.summary.successful,
            failed = report.summary.failed,
            "Batch import finished"
        );
        report
    }

    async fn process_item(
        &self,
        raw: &RawTechnologyRecord,
        normalizer: &RecordNormalizer,
        taxonomy: &ResolvedTaxonomy,
        batch: &BatchConfig,
    ) -> Result<MergeOutcome> {
        let record = normalizer.normalize(raw)?;
        let country_id = self.countries.resolve(record.developed_in_country.as_deref()).await;
        let image = self
            .assets
            .resolve_image(&record.external_id, record.image_url.as_deref(), taxonomy.default_image_url.as_deref())
            .await;
        let branding = self.companies.resolve(&record.company_name, &self.assets).await;

        let candidate = build_candidate(record, taxonomy, country_id, branding, image.url);
        let policy = batch.policy_for(&candidate.external_id, self.settings.default_policy);
        self.merger.merge(candidate, image.origin, policy).await
    }
}

/// Assembles the row that would be inserted for a new external id.
pub fn build_candidate(
    record: NormalizedRecord,
    taxonomy: &ResolvedTaxonomy,
    country_id: Option<String>,
    branding: CompanyBranding,
    image_url: Option<String>,
) -> TechnologyRecord {
    let now = BsonDateTime::now();
    TechnologyRecord {
        id: uuid::Uuid::new_v4().to_string(),
        external_id: record.external_id,
        name_zh: record.name_zh,
        name_en: record.name_en,
        description_en: record.description_en,
        description_zh: record.description_zh,
        image_url,
        company_logo_url: branding.logo_url,
        website_url: record.website_url,
        company_id: branding.company_id,
        company_name_zh: branding.name_zh,
        company_name_en: branding.name_en,
        company_country_id: country_id,
        category_id: Some(taxonomy.category_id.clone()),
        subcategory_id: Some(taxonomy.subcategory_id.clone()),
        custom_label: record.custom_label,
        tech_source: TECH_SOURCE.to_string(),
        acquisition_method: ACQUISITION_METHOD.to_string(),
        is_active: true,
        review_status: ReviewStatus::Published,
        created_at: now,
        updated_at: now,
    }
}
