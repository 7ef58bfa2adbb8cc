use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::clients::AssetFetcher;
use crate::models::*;

/// Records plus optional batch settings, as accepted by `batchImport` and `import`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportPayload {
    pub items: Vec<RawTechnologyRecord>,
    #[serde(alias = "options")]
    pub config: Option<BatchConfig>,
}

/// Accepts a JSON array of records, an `{items, config}` object, or JSON Lines.
pub fn parse_payload(text: &str) -> Result<ImportPayload> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(ImportPayload::default());
    }

    if trimmed.starts_with('[') {
        let items: Vec<RawTechnologyRecord> = serde_json::from_str(trimmed)?;
        return Ok(ImportPayload { items, config: None });
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.get("items").map(Value::is_array).unwrap_or(false) {
            return Ok(serde_json::from_value(value)?);
        }
    }

    let mut items = Vec::new();
    for (idx, line) in trimmed.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: RawTechnologyRecord = serde_json::from_str(line)
            .map_err(|e| IngestionError::Validation(format!("Invalid JSON on line {}: {}", idx + 1, e)))?;
        items.push(record);
    }
    Ok(ImportPayload { items, config: None })
}

/// Loads an import payload from a local path or an http(s) URL.
pub struct RecordLoader {
    fetcher: Arc<dyn AssetFetcher>,
}

impl RecordLoader {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn load(&self, source: &str) -> Result<ImportPayload> {
        let is_remote = url::Url::parse(source)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        let bytes = if is_remote {
            self.fetcher.fetch_bytes(source).await?
        } else {
            tokio::fs::read(source).await?
        };
        let text = String::from_utf8(bytes)
            .map_err(|e| IngestionError::Validation(format!("Import file is not UTF-8: {}", e)))?;
        let payload = parse_payload(&text)?;
        tracing::debug!(source = %source, record_count = payload.items.len(), "Parsed import payload");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_json_array() {
        let p = parse_payload(r#"[{"id": "1"}, {"id": 2}]"#).unwrap();
        assert_eq!(p.items.len(), 2);
        assert_eq!(p.items[1].id.as_deref(), Some("2"));
        assert!(p.config.is_none());
    }

    #[test]
    fn test_parses_object_with_config() {
        let p = parse_payload(
            r#"{"items": [{"id": "1"}], "config": {"category": "清洁能源技术", "onDuplicate": "skip", "decisions": {"1": "overwrite"}}}"#,
        )
        .unwrap();
        let cfg = p.config.unwrap();
        assert_eq!(cfg.on_duplicate, Some(DuplicatePolicy::Skip));
        assert_eq!(cfg.policy_for("1", DuplicatePolicy::Skip), DuplicatePolicy::Overwrite);
        assert_eq!(cfg.category.as_deref(), Some("清洁能源技术"));
    }

    #[test]
    fn test_parses_jsonl_and_reports_bad_line() {
        let p = parse_payload("{\"id\": \"a\"}\n\n{\"id\": \"b\"}\n").unwrap();
        assert_eq!(p.items.len(), 2);

        let err = parse_payload("{\"id\": \"a\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_empty_input_has_no_items() {
        assert!(parse_payload("  \n").unwrap().items.is_empty());
    }
}
