use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::RawTechnologyRecord;

/// Field overrides for one known-bad source record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Correction {
    pub company_name: Option<String>,
    pub technology_name_cn: Option<String>,
    pub technology_image_url: Option<String>,
    pub developed_in_country: Option<String>,
}

impl Correction {
    fn apply(&self, raw: &mut RawTechnologyRecord) {
        if let Some(v) = &self.company_name { raw.company_name = Some(v.clone()); }
        if let Some(v) = &self.technology_name_cn { raw.technology_name_cn = Some(v.clone()); }
        if let Some(v) = &self.technology_image_url { raw.technology_image_url = Some(v.clone()); }
        if let Some(v) = &self.developed_in_country { raw.developed_in_country = Some(v.clone()); }
    }
}

/// Explicit patch list keyed by external id. Not a rule engine: every entry names
/// one record.
#[derive(Debug, Clone, Default)]
pub struct CorrectionTable {
    entries: HashMap<String, Correction>,
}

impl CorrectionTable {
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        // Source lists the subsidiary brand rather than the owning company.
        entries.insert(
            "171988".to_string(),
            Correction {
                company_name: Some("Electric Power Development Co., Ltd. (J-POWER)".to_string()),
                technology_name_cn: Some("地震防护海上风电柔性三桩基础".to_string()),
                technology_image_url: Some("https://thumbnails.wipogreen.wipo.int/171988".to_string()),
                developed_in_country: Some("Japan".to_string()),
            },
        );
        Self { entries }
    }

    /// Batch-supplied corrections win over built-in ones for the same id.
    pub fn with_overrides(&self, overrides: &HashMap<String, Correction>) -> Self {
        let mut entries = self.entries.clone();
        for (id, c) in overrides {
            entries.insert(id.trim().to_string(), c.clone());
        }
        Self { entries }
    }

    pub fn get(&self, external_id: &str) -> Option<&Correction> {
        self.entries.get(external_id.trim())
    }

    /// Returns true when a correction was applied.
    pub fn apply(&self, raw: &mut RawTechnologyRecord) -> bool {
        let Some(id) = raw.id.as_deref() else { return false };
        match self.entries.get(id.trim()).cloned() {
            Some(c) => {
                c.apply(raw);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
