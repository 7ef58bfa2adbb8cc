use std::sync::Arc;

use regex::Regex;

use crate::models::*;
use crate::storage::CatalogStore;

/// Known English country names with their Chinese name and code.
const KNOWN_COUNTRIES: &[(&str, &str, &str)] = &[
    ("United Kingdom", "英国", "gb"),
    ("United States", "美国", "us"),
    ("China", "中国", "cn"),
    ("Japan", "日本", "jp"),
    ("Canada", "加拿大", "ca"),
    ("Germany", "德国", "de"),
    ("Netherlands", "荷兰", "nl"),
    ("Denmark", "丹麦", "dk"),
    ("Sweden", "瑞典", "se"),
    ("Kazakhstan", "哈萨克斯坦", "kz"),
    ("Philippines", "菲律宾", "ph"),
    ("India", "印度", "in"),
    ("Global", "全球", "xx"),
    ("France", "法国", "fr"),
    ("South Korea", "韩国", "kr"),
];

const SYNTHETIC_PREFIX: &str = "xx";

pub fn known_country(name: &str) -> Option<(&'static str, &'static str)> {
    KNOWN_COUNTRIES
        .iter()
        .find(|(en, _, _)| en.eq_ignore_ascii_case(name.trim()))
        .map(|(_, zh, code)| (*zh, *code))
}

/// Flag image for two-letter ISO codes; none for `xx` and synthetic codes.
pub fn flag_url(code: &str) -> Option<String> {
    let is_iso = code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase());
    (is_iso && code != SYNTHETIC_PREFIX).then(|| format!("https://flagcdn.com/w160/{}.png", code))
}

/// `xx<max+1>` over the existing `xx<digits>` codes.
pub fn next_synthetic_code(existing: &[String]) -> Result<String> {
    let pattern = Regex::new(r"(?i)^xx(\d+)$")
        .map_err(|e| IngestionError::Validation(format!("Invalid synthetic code pattern: {}", e)))?;
    let max = existing
        .iter()
        .filter_map(|code| pattern.captures(code))
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    Ok(format!("{}{}", SYNTHETIC_PREFIX, max + 1))
}

/// Get-or-create for countries, keyed by code.
#[derive(Clone)]
pub struct CountryResolver {
    store: Arc<dyn CatalogStore>,
}

impl CountryResolver {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Never fails the item: errors are logged and yield `None`.
    pub async fn resolve(&self, name: Option<&str>) -> Option<String> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        match self.try_resolve(name).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(country = ?name, error = %e, "Country resolution failed");
                None
            }
        }
    }

    async fn try_resolve(&self, name: Option<&str>) -> Result<String> {
        let Some(name) = name else {
            return self.ensure_others().await;
        };

        if let Some(found) = self.store.find_country_by_name(name).await? {
            return Ok(found.id);
        }

        let (name_zh, code) = match known_country(name) {
            Some((zh, code)) => (zh.to_string(), code.to_string()),
            None => {
                let existing = self.store.list_country_codes_with_prefix(SYNTHETIC_PREFIX).await?;
                (name.to_string(), next_synthetic_code(&existing)?)
            }
        };

        let country = Country::new(&name_zh, name, &code, flag_url(&code), 0);
        let stored = self.store.upsert_country(country).await?;
        tracing::info!(country = %name, code = %stored.code, country_id = %stored.id, "Resolved country");
        Ok(stored.id)
    }

    async fn ensure_others(&self) -> Result<String> {
        if let Some(found) = self.store.find_country_by_code(OTHERS_COUNTRY_CODE).await? {
            return Ok(found.id);
        }
        let others = Country::others();
        for name in [others.name_en.as_str(), others.name_zh.as_str()] {
            if let Some(found) = self.store.find_country_by_name(name).await? {
                return Ok(found.id);
            }
        }
        Ok(self.store.upsert_country(others).await?.id)
    }
}
