use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A third-party technology record as delivered by the scraper/translation stage.
///
/// Every field is optional and loosely typed: numbers and lists are accepted where
/// text is expected and folded into strings on the way in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTechnologyRecord {
    #[serde(deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(rename = "technologyNameEN", alias = "technologyName", deserialize_with = "loose_string")]
    pub technology_name_en: Option<String>,
    #[serde(rename = "technologyNameCN", alias = "technologyNameZh", deserialize_with = "loose_string")]
    pub technology_name_cn: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub company_name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub company_website_url: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub technology_image_url: Option<String>,
    #[serde(alias = "fullDescription", deserialize_with = "loose_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub benefits: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub benefits_description: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub technology_readiness_level: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub developed_in_country: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub deployed_in_country: Option<String>,
    #[serde(deserialize_with = "loose_list")]
    pub custom_labels: Vec<String>,
    /// Pre-composed descriptions from the upstream translation service.
    #[serde(rename = "description_en", alias = "descriptionEn", deserialize_with = "loose_string")]
    pub description_en: Option<String>,
    #[serde(rename = "description_zh", alias = "descriptionZh", deserialize_with = "loose_string")]
    pub description_zh: Option<String>,
}

/// Raw record after defaulting, corrections, clamping and description composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub external_id: String,
    pub name_en: String,
    pub name_zh: String,
    pub company_name: String,
    pub website_url: Option<String>,
    pub image_url: Option<String>,
    pub description_en: String,
    pub description_zh: String,
    pub developed_in_country: Option<String>,
    pub custom_label: String,
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(value_to_text)
                .filter(|s| !s.is_empty())
                .collect();
            Some(parts.join(", "))
        }
        other => Some(other.to_string()),
    }
}

fn loose_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

fn loose_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(value_to_text).collect(),
        Value::String(s) => s.split('|').map(|p| p.trim().to_string()).collect(),
        other => vec![other.to_string()],
    };
    Ok(items.into_iter().filter(|s| !s.trim().is_empty()).collect())
}
