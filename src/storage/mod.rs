pub mod indexes;
pub mod memory;

pub use indexes::*;
pub use memory::*;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions, ReturnDocument};
use mongodb::{Client as MongoClient, Collection, Database};

use crate::config::Config;
use crate::mapping::marker::marker_pattern;
use crate::models::*;

pub const COUNTRIES: &str = "countries";
pub const CATEGORIES: &str = "categories";
pub const SUBCATEGORIES: &str = "subcategories";
pub const COMPANIES: &str = "companies";
pub const TECHNOLOGIES: &str = "technologies";

/// Catalog persistence used by the resolvers and the merger.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_country_by_code(&self, code: &str) -> Result<Option<Country>>;
    /// Case-insensitive exact match on `name_en` or `name_zh`.
    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>>;
    async fn list_country_codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
    /// Inserts `country` unless a row with the same code exists; returns the stored row.
    async fn upsert_country(&self, country: Country) -> Result<Country>;

    async fn find_category_by_id(&self, id: &str) -> Result<Option<Category>>;
    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;
    async fn find_subcategory_by_id(&self, category_id: &str, id: &str) -> Result<Option<Subcategory>>;
    async fn find_subcategory_by_name(&self, category_id: &str, name: &str) -> Result<Option<Subcategory>>;

    async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>>;

    /// Oldest technology whose external id or English marker line matches.
    async fn find_technology_by_marker(&self, external_id: &str) -> Result<Option<TechnologyRecord>>;
    async fn insert_technology(&self, record: &TechnologyRecord) -> Result<()>;
    async fn update_technology(&self, id: &str, changes: &TechnologyChanges) -> Result<()>;
}

/// Connects with the configured retry-writes behaviour.
pub async fn connect(cfg: &Config) -> Result<Database> {
    // Some deployments reject retryable writes; force it off in the URI too.
    let mut effective_uri = cfg.mongodb_uri.clone();
    if !cfg.mongodb_retry_writes {
        if effective_uri.contains("retryWrites=") {
            effective_uri = effective_uri
                .replace("retryWrites=true", "retryWrites=false")
                .replace("retryWrites=1", "retryWrites=false");
        } else if effective_uri.contains('?') {
            effective_uri.push_str("&retryWrites=false");
        } else {
            effective_uri.push_str("?retryWrites=false");
        }
    }
    let mut client_options = ClientOptions::parse(&effective_uri).await?;
    client_options.retry_writes = Some(cfg.mongodb_retry_writes);
    client_options.app_name = Some("catalog-ingestion".to_string());
    let client = MongoClient::with_options(client_options)?;
    Ok(client.database(&cfg.database_name))
}

fn exact_ci(value: &str) -> Document {
    doc! { "$regex": format!("^{}$", regex::escape(value.trim())), "$options": "i" }
}

fn to_bson_doc<T: serde::Serialize>(value: &T) -> Result<Document> {
    mongodb::bson::to_document(value)
        .map_err(|e| IngestionError::Storage(format!("BSON serialization failed: {}", e)))
}

#[derive(Clone)]
pub struct MongoCatalogStore {
    db: Database,
}

impl MongoCatalogStore {
    pub fn with_db(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    fn countries(&self) -> Collection<Country> {
        self.db.collection(COUNTRIES)
    }

    fn technologies(&self) -> Collection<TechnologyRecord> {
        self.db.collection(TECHNOLOGIES)
    }
}

#[async_trait]
impl CatalogStore for MongoCatalogStore {
    async fn find_country_by_code(&self, code: &str) -> Result<Option<Country>> {
        self.countries()
            .find_one(doc! { "code": code }, None)
            .await
            .map_err(Into::into)
    }

    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>> {
        let filter = doc! { "$or": [ { "name_en": exact_ci(name) }, { "name_zh": exact_ci(name) } ] };
        let options = FindOneOptions::builder().sort(doc! { "sort_order": 1 }).build();
        self.countries().find_one(filter, options).await.map_err(Into::into)
    }

    async fn list_country_codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let collection: Collection<Document> = self.db.collection(COUNTRIES);
        let filter = doc! { "code": { "$regex": format!("^{}", regex::escape(prefix)), "$options": "i" } };
        let options = FindOptions::builder().projection(doc! { "code": 1, "_id": 0 }).build();
        let docs: Vec<Document> = collection.find(filter, options).await?.try_collect().await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_str("code").ok().map(str::to_string))
            .collect())
    }

    async fn upsert_country(&self, country: Country) -> Result<Country> {
        let mut on_insert = to_bson_doc(&country)?;
        on_insert.remove("code");
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let result = self
            .countries()
            .find_one_and_update(doc! { "code": &country.code }, doc! { "$setOnInsert": on_insert }, options)
            .await
            .map_err(IngestionError::from);

        match result {
            Ok(Some(stored)) => Ok(stored),
            Ok(None) => Err(IngestionError::Storage(format!("Upsert returned no country for code {}", country.code))),
            // Two concurrent upserts on the same code: the loser reads the winner's row.
            Err(e) if e.is_duplicate_key() => self
                .find_country_by_code(&country.code)
                .await?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    async fn find_category_by_id(&self, id: &str) -> Result<Option<Category>> {
        let collection: Collection<Category> = self.db.collection(CATEGORIES);
        collection.find_one(doc! { "_id": id }, None).await.map_err(Into::into)
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let collection: Collection<Category> = self.db.collection(CATEGORIES);
        let filter = doc! { "$or": [ { "name_zh": exact_ci(name) }, { "name_en": exact_ci(name) } ] };
        collection.find_one(filter, None).await.map_err(Into::into)
    }

    async fn find_subcategory_by_id(&self, category_id: &str, id: &str) -> Result<Option<Subcategory>> {
        let collection: Collection<Subcategory> = self.db.collection(SUBCATEGORIES);
        collection
            .find_one(doc! { "_id": id, "category_id": category_id }, None)
            .await
            .map_err(Into::into)
    }

    async fn find_subcategory_by_name(&self, category_id: &str, name: &str) -> Result<Option<Subcategory>> {
        let collection: Collection<Subcategory> = self.db.collection(SUBCATEGORIES);
        let filter = doc! {
            "category_id": category_id,
            "$or": [ { "name_zh": exact_ci(name) }, { "name_en": exact_ci(name) } ],
        };
        collection.find_one(filter, None).await.map_err(Into::into)
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        let collection: Collection<Company> = self.db.collection(COMPANIES);
        let filter = doc! { "$or": [ { "name_en": exact_ci(name) }, { "name_zh": exact_ci(name) } ] };
        collection.find_one(filter, None).await.map_err(Into::into)
    }

    async fn find_technology_by_marker(&self, external_id: &str) -> Result<Option<TechnologyRecord>> {
        let filter = doc! {
            "$or": [
                { "external_id": external_id },
                { "description_en": { "$regex": marker_pattern(external_id), "$options": "m" } },
            ]
        };
        let options = FindOneOptions::builder().sort(doc! { "created_at": 1 }).build();
        self.technologies().find_one(filter, options).await.map_err(Into::into)
    }

    async fn insert_technology(&self, record: &TechnologyRecord) -> Result<()> {
        self.technologies().insert_one(record, None).await?;
        Ok(())
    }

    async fn update_technology(&self, id: &str, changes: &TechnologyChanges) -> Result<()> {
        let update = doc! { "$set": to_bson_doc(changes)? };
        let result = self.technologies().update_one(doc! { "_id": id }, update, None).await?;
        if result.matched_count == 0 {
            return Err(IngestionError::Storage(format!("Technology {} not found", id)));
        }
        Ok(())
    }
}
