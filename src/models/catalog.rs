use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use crate::models::ReviewStatus;

/// Code of the catch-all country that absorbs records without a country.
pub const OTHERS_COUNTRY_CODE: &str = "others";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Country {
    #[serde(rename = "_id")]
    pub id: String,
    pub name_zh: String,
    pub name_en: String,
    pub code: String,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl Country {
    pub fn new(name_zh: &str, name_en: &str, code: &str, logo_url: Option<String>, sort_order: i32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name_zh: name_zh.to_string(),
            name_en: name_en.to_string(),
            code: code.to_string(),
            logo_url,
            is_active: true,
            sort_order,
        }
    }

    pub fn others() -> Self {
        Self::new("其他", "Others", OTHERS_COUNTRY_CODE, None, 999)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name_zh: String,
    pub name_en: String,
    pub slug: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subcategory {
    #[serde(rename = "_id")]
    pub id: String,
    pub category_id: String,
    pub name_zh: String,
    pub name_en: String,
    pub slug: String,
    pub default_tech_image_url: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: String,
    pub name_zh: String,
    pub name_en: String,
    pub logo_url: Option<String>,
}

/// The stored, queryable technology entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnologyRecord {
    #[serde(rename = "_id")]
    pub id: String,
    /// Absent on rows created before the column existed; those are matched by marker.
    #[serde(default)]
    pub external_id: String,
    pub name_zh: String,
    pub name_en: String,
    pub description_en: String,
    #[serde(default)]
    pub description_zh: String,
    pub image_url: Option<String>,
    pub company_logo_url: Option<String>,
    pub website_url: Option<String>,
    pub company_id: Option<String>,
    #[serde(default)]
    pub company_name_zh: String,
    #[serde(default)]
    pub company_name_en: String,
    pub company_country_id: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    #[serde(default)]
    pub custom_label: String,
    pub tech_source: String,
    pub acquisition_method: String,
    pub is_active: bool,
    pub review_status: ReviewStatus,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// Where a candidate's image came from. A stored image is only replaced by a
/// freshly re-hosted one, never by a fallback placeholder or by nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    Rehosted,
    Fallback,
}

/// Fields rewritten on an `overwrite` merge. Active flag, review status,
/// provenance and creation time are only written on insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnologyChanges {
    pub external_id: String,
    pub name_zh: String,
    pub name_en: String,
    pub description_en: String,
    pub description_zh: String,
    pub image_url: Option<String>,
    pub company_logo_url: Option<String>,
    pub website_url: Option<String>,
    pub company_id: Option<String>,
    pub company_name_zh: String,
    pub company_name_en: String,
    pub company_country_id: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub custom_label: String,
    pub updated_at: BsonDateTime,
}

impl TechnologyChanges {
    /// Builds the update for `existing` from a freshly built candidate. A populated
    /// image survives unless the candidate carries a newly re-hosted one.
    pub fn between(existing: &TechnologyRecord, candidate: &TechnologyRecord, image_origin: ImageOrigin) -> Self {
        let candidate_image = candidate.image_url.clone().filter(|u| !u.trim().is_empty());
        let stored_image = existing.image_url.clone().filter(|u| !u.trim().is_empty());
        let image_url = match (image_origin, candidate_image) {
            (ImageOrigin::Rehosted, Some(url)) => Some(url),
            (_, fallback) => stored_image.or(fallback),
        };
        Self {
            external_id: candidate.external_id.clone(),
            name_zh: candidate.name_zh.clone(),
            name_en: candidate.name_en.clone(),
            description_en: candidate.description_en.clone(),
            description_zh: candidate.description_zh.clone(),
            image_url,
            company_logo_url: candidate.company_logo_url.clone(),
            website_url: candidate.website_url.clone(),
            company_id: candidate.company_id.clone(),
            company_name_zh: candidate.company_name_zh.clone(),
            company_name_en: candidate.company_name_en.clone(),
            company_country_id: candidate.company_country_id.clone(),
            category_id: candidate.category_id.clone(),
            subcategory_id: candidate.subcategory_id.clone(),
            custom_label: candidate.custom_label.clone(),
            updated_at: BsonDateTime::now(),
        }
    }

    pub fn apply_to(&self, record: &mut TechnologyRecord) {
        record.external_id = self.external_id.clone();
        record.name_zh = self.name_zh.clone();
        record.name_en = self.name_en.clone();
        record.description_en = self.description_en.clone();
        record.description_zh = self.description_zh.clone();
        record.image_url = self.image_url.clone();
        record.company_logo_url = self.company_logo_url.clone();
        record.website_url = self.website_url.clone();
        record.company_id = self.company_id.clone();
        record.company_name_zh = self.company_name_zh.clone();
        record.company_name_en = self.company_name_en.clone();
        record.company_country_id = self.company_country_id.clone();
        record.category_id = self.category_id.clone();
        record.subcategory_id = self.subcategory_id.clone();
        record.custom_label = self.custom_label.clone();
        record.updated_at = self.updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(image: Option<&str>) -> TechnologyRecord {
        TechnologyRecord {
            id: "t1".into(),
            external_id: "42".into(),
            name_zh: "名".into(),
            name_en: "Name".into(),
            description_en: "ID: 42".into(),
            description_zh: "ID：42".into(),
            image_url: image.map(str::to_string),
            company_logo_url: None,
            website_url: None,
            company_id: None,
            company_name_zh: String::new(),
            company_name_en: String::new(),
            company_country_id: None,
            category_id: None,
            subcategory_id: None,
            custom_label: String::new(),
            tech_source: "self_developed".into(),
            acquisition_method: "wipo".into(),
            is_active: true,
            review_status: ReviewStatus::Published,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn test_image_never_regresses_to_empty() {
        let existing = record(Some("https://cdn/a.png"));
        let changes = TechnologyChanges::between(&existing, &record(None), ImageOrigin::Fallback);
        assert_eq!(changes.image_url.as_deref(), Some("https://cdn/a.png"));

        let changes = TechnologyChanges::between(&existing, &record(Some("  ")), ImageOrigin::Rehosted);
        assert_eq!(changes.image_url.as_deref(), Some("https://cdn/a.png"));
    }

    #[test]
    fn test_new_image_replaces_existing() {
        let existing = record(Some("https://cdn/a.png"));
        let changes = TechnologyChanges::between(&existing, &record(Some("https://cdn/b.png")), ImageOrigin::Rehosted);
        assert_eq!(changes.image_url.as_deref(), Some("https://cdn/b.png"));
    }

    #[test]
    fn test_fallback_image_does_not_replace_stored_image() {
        let existing = record(Some("https://assets/technologies/42.png"));
        let changes = TechnologyChanges::between(&existing, &record(Some("https://cdn/default.png")), ImageOrigin::Fallback);
        assert_eq!(changes.image_url.as_deref(), Some("https://assets/technologies/42.png"));

        // a row that never had an image still picks up the default
        let bare = record(None);
        let changes = TechnologyChanges::between(&bare, &record(Some("https://cdn/default.png")), ImageOrigin::Fallback);
        assert_eq!(changes.image_url.as_deref(), Some("https://cdn/default.png"));
    }
}
