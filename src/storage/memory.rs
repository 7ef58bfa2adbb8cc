use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::mapping::marker::marker_regex;
use crate::models::*;
use crate::storage::CatalogStore;

#[derive(Debug, Clone, Default)]
pub struct TaxonomySeed {
    pub id: Option<String>,
    pub label: String,
}

#[derive(Default)]
struct Tables {
    countries: Vec<Country>,
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    companies: Vec<Company>,
    technologies: Vec<TechnologyRecord>,
}

/// Process-local catalog with the same lookup and uniqueness rules as the
/// MongoDB store. Backs tests and `import --dry-run`.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    tables: Mutex<Tables>,
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| IngestionError::Storage("catalog lock poisoned".to_string()))
    }

    /// A catalog holding a single category/subcategory pair, for dry runs.
    pub fn with_taxonomy(category: &TaxonomySeed, subcategory: &TaxonomySeed) -> Result<Self> {
        let store = Self::new();
        let category_id = category.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        store.add_category(Category {
            id: category_id.clone(),
            name_zh: category.label.clone(),
            name_en: category.label.clone(),
            slug: category.label.to_lowercase().replace(' ', "-"),
            is_active: true,
        })?;
        store.add_subcategory(Subcategory {
            id: subcategory.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            category_id,
            name_zh: subcategory.label.clone(),
            name_en: subcategory.label.clone(),
            slug: subcategory.label.to_lowercase().replace(' ', "-"),
            default_tech_image_url: None,
            is_active: true,
        })?;
        Ok(store)
    }

    pub fn add_category(&self, category: Category) -> Result<()> {
        self.lock()?.categories.push(category);
        Ok(())
    }

    pub fn add_subcategory(&self, subcategory: Subcategory) -> Result<()> {
        self.lock()?.subcategories.push(subcategory);
        Ok(())
    }

    pub fn add_company(&self, company: Company) -> Result<()> {
        self.lock()?.companies.push(company);
        Ok(())
    }

    pub fn add_country(&self, country: Country) -> Result<()> {
        self.lock()?.countries.push(country);
        Ok(())
    }

    pub fn countries(&self) -> Vec<Country> {
        self.lock().map(|t| t.countries.clone()).unwrap_or_default()
    }

    pub fn technologies(&self) -> Vec<TechnologyRecord> {
        self.lock().map(|t| t.technologies.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_country_by_code(&self, code: &str) -> Result<Option<Country>> {
        Ok(self.lock()?.countries.iter().find(|c| c.code == code).cloned())
    }

    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>> {
        let tables = self.lock()?;
        let mut hits: Vec<&Country> = tables
            .countries
            .iter()
            .filter(|c| eq_ci(&c.name_en, name) || eq_ci(&c.name_zh, name))
            .collect();
        hits.sort_by_key(|c| c.sort_order);
        Ok(hits.first().map(|c| (*c).clone()))
    }

    async fn list_country_codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_lowercase();
        Ok(self
            .lock()?
            .countries
            .iter()
            .filter(|c| c.code.to_lowercase().starts_with(&prefix))
            .map(|c| c.code.clone())
            .collect())
    }

    async fn upsert_country(&self, country: Country) -> Result<Country> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables.countries.iter().find(|c| c.code == country.code) {
            return Ok(existing.clone());
        }
        tables.countries.push(country.clone());
        Ok(country)
    }

    async fn find_category_by_id(&self, id: &str) -> Result<Option<Category>> {
        Ok(self.lock()?.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .lock()?
            .categories
            .iter()
            .find(|c| eq_ci(&c.name_zh, name) || eq_ci(&c.name_en, name))
            .cloned())
    }

    async fn find_subcategory_by_id(&self, category_id: &str, id: &str) -> Result<Option<Subcategory>> {
        Ok(self
            .lock()?
            .subcategories
            .iter()
            .find(|s| s.id == id && s.category_id == category_id)
            .cloned())
    }

    async fn find_subcategory_by_name(&self, category_id: &str, name: &str) -> Result<Option<Subcategory>> {
        Ok(self
            .lock()?
            .subcategories
            .iter()
            .find(|s| s.category_id == category_id && (eq_ci(&s.name_zh, name) || eq_ci(&s.name_en, name)))
            .cloned())
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        Ok(self
            .lock()?
            .companies
            .iter()
            .find(|c| eq_ci(&c.name_en, name) || eq_ci(&c.name_zh, name))
            .cloned())
    }

    async fn find_technology_by_marker(&self, external_id: &str) -> Result<Option<TechnologyRecord>> {
        let pattern = marker_regex(external_id)
            .map_err(|e| IngestionError::Validation(format!("Invalid marker pattern: {}", e)))?;
        let tables = self.lock()?;
        let mut hits: Vec<&TechnologyRecord> = tables
            .technologies
            .iter()
            .filter(|t| t.external_id == external_id || pattern.is_match(&t.description_en))
            .collect();
        hits.sort_by_key(|t| t.created_at);
        Ok(hits.first().map(|t| (*t).clone()))
    }

    async fn insert_technology(&self, record: &TechnologyRecord) -> Result<()> {
        let mut tables = self.lock()?;
        if tables
            .technologies
            .iter()
            .any(|t| t.id == record.id || (!record.external_id.is_empty() && t.external_id == record.external_id))
        {
            return Err(IngestionError::DuplicateKey(format!(
                "technologies.external_id {}",
                record.external_id
            )));
        }
        tables.technologies.push(record.clone());
        Ok(())
    }

    async fn update_technology(&self, id: &str, changes: &TechnologyChanges) -> Result<()> {
        let mut tables = self.lock()?;
        let record = tables
            .technologies
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| IngestionError::Storage(format!("Technology {} not found", id)))?;
        changes.apply_to(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_country_keeps_first_row_for_code() {
        let store = InMemoryCatalogStore::new();
        let first = store.upsert_country(Country::new("日本", "Japan", "jp", None, 100)).await.unwrap();
        let second = store.upsert_country(Country::new("日本国", "Japan", "jp", None, 100)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name_zh, "日本");
        assert_eq!(store.countries().len(), 1);
    }

    #[tokio::test]
    async fn test_country_name_lookup_is_case_insensitive() {
        let store = InMemoryCatalogStore::new();
        store.add_country(Country::new("德国", "Germany", "de", None, 100)).unwrap();
        assert!(store.find_country_by_name("GERMANY").await.unwrap().is_some());
        assert!(store.find_country_by_name("德国").await.unwrap().is_some());
        assert!(store.find_country_by_name("Germ").await.unwrap().is_none());
    }
}
