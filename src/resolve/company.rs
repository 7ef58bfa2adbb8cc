use std::sync::Arc;

use crate::processing::{AssetPipeline, BrandingSynthesizer};
use crate::storage::CatalogStore;

/// Company linkage and logo for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyBranding {
    pub company_id: Option<String>,
    pub name_zh: String,
    pub name_en: String,
    pub logo_url: Option<String>,
}

/// Links records to known companies and supplies a logo: the company's own
/// when it has one, otherwise a generated placeholder.
#[derive(Clone)]
pub struct CompanyResolver {
    store: Arc<dyn CatalogStore>,
    synthesizer: BrandingSynthesizer,
}

impl CompanyResolver {
    pub fn new(store: Arc<dyn CatalogStore>, synthesizer: BrandingSynthesizer) -> Self {
        Self { store, synthesizer }
    }

    pub async fn resolve(&self, company_name: &str, assets: &AssetPipeline) -> CompanyBranding {
        let name = company_name.trim();
        if name.is_empty() {
            return CompanyBranding::default();
        }

        let company = match self.store.find_company_by_name(name).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(company = %name, error = %e, "Company lookup failed");
                None
            }
        };

        let mut branding = CompanyBranding {
            company_id: None,
            name_zh: name.to_string(),
            name_en: name.to_string(),
            logo_url: None,
        };
        if let Some(company) = company {
            branding.company_id = Some(company.id);
            if !company.name_zh.trim().is_empty() {
                branding.name_zh = company.name_zh;
            }
            branding.logo_url = company.logo_url.filter(|u| !u.trim().is_empty());
        }

        if branding.logo_url.is_none() {
            let svg = self.synthesizer.logo(name);
            branding.logo_url = assets.rehost_logo(name, svg).await;
        }
        branding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpAssetFetcher;
    use crate::models::Company;
    use crate::processing::MemoryAssetStore;
    use crate::storage::InMemoryCatalogStore;

    fn assets(store: Arc<MemoryAssetStore>) -> AssetPipeline {
        let fetcher = HttpAssetFetcher::new(1000, "test").unwrap();
        AssetPipeline::new(Arc::new(fetcher), store, 1024)
    }

    #[tokio::test]
    async fn test_known_company_with_logo_is_linked() {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        catalog
            .add_company(Company {
                id: "co1".into(),
                name_zh: "电源开发".into(),
                name_en: "J-POWER".into(),
                logo_url: Some("https://cdn/jpower.png".into()),
            })
            .unwrap();
        let objects = Arc::new(MemoryAssetStore::new("https://assets.test"));
        let r = CompanyResolver::new(catalog, BrandingSynthesizer::default());

        let b = r.resolve("j-power", &assets(objects.clone())).await;
        assert_eq!(b.company_id.as_deref(), Some("co1"));
        assert_eq!(b.name_zh, "电源开发");
        assert_eq!(b.logo_url.as_deref(), Some("https://cdn/jpower.png"));
        assert!(objects.keys().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_company_gets_generated_logo() {
        let objects = Arc::new(MemoryAssetStore::new("https://assets.test"));
        let r = CompanyResolver::new(Arc::new(InMemoryCatalogStore::new()), BrandingSynthesizer::default());

        let b = r.resolve("Acme Green Energy Co., Ltd.", &assets(objects.clone())).await;
        assert!(b.company_id.is_none());
        assert_eq!(b.name_en, "Acme Green Energy Co., Ltd.");
        let keys = objects.keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(b.logo_url, Some(format!("https://assets.test/{}", keys[0])));
        assert_eq!(objects.get(&keys[0]).unwrap().content_type, "image/svg+xml");
    }

    #[tokio::test]
    async fn test_blank_company_has_no_branding() {
        let objects = Arc::new(MemoryAssetStore::new("https://assets.test"));
        let r = CompanyResolver::new(Arc::new(InMemoryCatalogStore::new()), BrandingSynthesizer::default());
        assert_eq!(r.resolve("  ", &assets(objects)).await, CompanyBranding::default());
    }
}
