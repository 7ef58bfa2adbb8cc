use bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use crate::models::Result;
use crate::storage::{CATEGORIES, COMPANIES, COUNTRIES, SUBCATEGORIES, TECHNOLOGIES};

fn index(keys: Document, options: Option<IndexOptions>) -> IndexModel {
    IndexModel::builder().keys(keys).options(options).build()
}

/// Indexes the pipeline relies on. Safe to run repeatedly.
pub fn catalog_indexes() -> Vec<(&'static str, IndexModel)> {
    let unique = |name: &str| IndexOptions::builder().unique(true).name(name.to_string()).build();

    vec![
        (COUNTRIES, index(doc! { "code": 1 }, Some(unique("uniq_country_code")))),
        (COUNTRIES, index(doc! { "name_en": 1 }, None)),
        (CATEGORIES, index(doc! { "name_zh": 1 }, None)),
        (SUBCATEGORIES, index(doc! { "category_id": 1 }, None)),
        (COMPANIES, index(doc! { "name_en": 1 }, None)),
        // Legacy rows have no external_id; the partial filter keeps them out of the unique set.
        (
            TECHNOLOGIES,
            index(
                doc! { "external_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("uniq_technology_external_id".to_string())
                        .partial_filter_expression(doc! { "external_id": { "$type": "string" } })
                        .build(),
                ),
            ),
        ),
        (TECHNOLOGIES, index(doc! { "created_at": 1 }, None)),
    ]
}

pub async fn ensure_indexes(db: &Database) -> Result<()> {
    tracing::info!("Creating catalog indexes");
    for (collection, model) in catalog_indexes() {
        let keys = model.keys.clone();
        db.collection::<Document>(collection).create_index(model, None).await?;
        tracing::debug!(collection = %collection, keys = %keys, "Index ensured");
    }
    Ok(())
}
