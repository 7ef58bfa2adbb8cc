pub mod corrections;

pub use corrections::*;

use marker::{strip_inline_markers, strip_marker_lines, EN_MARKER_PREFIX, ZH_MARKER_PREFIX};

use crate::models::*;

pub const MAX_NAME_CHARS: usize = 200;
pub const MAX_URL_CHARS: usize = 500;
const MAX_LABELS: usize = 2;

/// Placeholder the scraper emits when a benefits query had no answer.
const NO_QUERY_PLACEHOLDER: &str = "NO QUERY SPECIFIED";

/// Shapes raw records into storage-safe values. Never rejects on length: oversize
/// strings are truncated by character.
pub struct RecordNormalizer {
    corrections: CorrectionTable,
}

impl RecordNormalizer {
    pub fn new(corrections: CorrectionTable) -> Self {
        Self { corrections }
    }

    pub fn normalize(&self, raw: &RawTechnologyRecord) -> Result<NormalizedRecord> {
        let mut raw = raw.clone();
        if self.corrections.apply(&mut raw) {
            tracing::debug!(external_id = ?raw.id, "Applied source-data correction");
        }

        let external_id = non_blank(raw.id.as_deref())
            .ok_or_else(|| IngestionError::Validation("record has no external id".to_string()))?;

        let name_en = non_blank(raw.technology_name_en.as_deref()).unwrap_or_default();
        let name_zh = non_blank(raw.technology_name_cn.as_deref()).unwrap_or_else(|| name_en.clone());
        let company_name = non_blank(raw.company_name.as_deref()).unwrap_or_default();

        let description_en = match non_blank(raw.description_en.as_deref()) {
            Some(text) => with_marker(&text, EN_MARKER_PREFIX, &external_id)?,
            None => compose_english(&raw, &external_id)?,
        };
        let description_zh = match non_blank(raw.description_zh.as_deref()) {
            Some(text) => with_marker(&text, ZH_MARKER_PREFIX, &external_id)?,
            None => compose_chinese(&raw, &external_id)?,
        };

        let custom_label = raw
            .custom_labels
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .take(MAX_LABELS)
            .collect::<Vec<_>>()
            .join("|");

        Ok(NormalizedRecord {
            external_id,
            name_en: clip(&name_en, MAX_NAME_CHARS),
            name_zh: clip(&name_zh, MAX_NAME_CHARS),
            company_name: clip(&company_name, MAX_NAME_CHARS),
            website_url: non_blank(raw.company_website_url.as_deref()).map(|u| clip(&u, MAX_URL_CHARS)),
            image_url: non_blank(raw.technology_image_url.as_deref()).map(|u| clip(&u, MAX_URL_CHARS)),
            description_en,
            description_zh,
            developed_in_country: non_blank(raw.developed_in_country.as_deref()),
            custom_label,
        })
    }
}

/// Truncates to at most `max` characters.
pub fn clip(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn with_marker(text: &str, prefix: &str, external_id: &str) -> Result<String> {
    let body = strip_inline_markers(&strip_marker_lines(text), external_id)
        .map_err(|e| IngestionError::Validation(format!("unusable external id {:?}: {}", external_id, e)))?;
    Ok(if body.is_empty() {
        format!("{}{}", prefix, external_id)
    } else {
        format!("{}\n{}{}", body, prefix, external_id)
    })
}

fn benefit_types(raw: &RawTechnologyRecord) -> String {
    let benefits = raw.benefits.clone().unwrap_or_default();
    if benefits.to_uppercase().contains(NO_QUERY_PLACEHOLDER) {
        String::new()
    } else {
        benefits
    }
}

fn compose_english(raw: &RawTechnologyRecord, external_id: &str) -> Result<String> {
    let lines = [
        format!("Description: {}", raw.description.as_deref().unwrap_or_default()),
        format!("Benefit Types: {}", benefit_types(raw)),
        format!("Benefit Details: {}", raw.benefits_description.as_deref().unwrap_or_default()),
        format!("Deployed In: {}", raw.deployed_in_country.as_deref().unwrap_or_default()),
        format!("Technology Readiness Level: {}", raw.technology_readiness_level.as_deref().unwrap_or_default()),
    ];
    with_marker(&lines.join("\n"), EN_MARKER_PREFIX, external_id)
}

// Untranslated fallback: localized headings over the source text.
fn compose_chinese(raw: &RawTechnologyRecord, external_id: &str) -> Result<String> {
    let deployed = raw
        .deployed_in_country
        .as_deref()
        .unwrap_or_default()
        .replace("Global", "全球");
    let lines = [
        format!("技术描述：{}", raw.description.as_deref().unwrap_or_default()),
        format!("收益类型：{}", benefit_types(raw)),
        format!("收益描述：{}", raw.benefits_description.as_deref().unwrap_or_default()),
        format!("应用地区和国家：{}", deployed),
        format!("技术成熟度：{}", raw.technology_readiness_level.as_deref().unwrap_or_default()),
    ];
    with_marker(&lines.join("\n"), ZH_MARKER_PREFIX, external_id)
}

/// The external-id marker embedded in stored descriptions.
pub mod marker {
    pub const EN_MARKER_PREFIX: &str = "ID: ";
    pub const ZH_MARKER_PREFIX: &str = "ID：";

    fn is_marker_line(line: &str) -> bool {
        line.trim_start()
            .strip_prefix("ID")
            .map(|rest| rest.trim_start().starts_with([':', '：']))
            .unwrap_or(false)
    }

    /// Removes every marker line and trailing blank lines.
    pub fn strip_marker_lines(text: &str) -> String {
        let kept: Vec<&str> = text.lines().filter(|l| !is_marker_line(l)).collect();
        kept.join("\n").trim_end().to_string()
    }

    /// Removes `ID: <external_id>` mentions embedded inside a line. The id must
    /// end at a word boundary, so `ID: 42` does not eat into `ID: 421`.
    pub fn strip_inline_markers(text: &str, external_id: &str) -> Result<String, regex::Error> {
        let pattern = format!(r"[ \t]*\bID[ \t]*[:：][ \t]*{}", regex::escape(external_id.trim()));
        let re = regex::Regex::new(&pattern)?;
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in re.find_iter(text) {
            let bounded = text[m.end()..]
                .chars()
                .next()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
            if bounded {
                out.push_str(&text[last..m.start()]);
                last = m.end();
            }
        }
        out.push_str(&text[last..]);
        let lines: Vec<&str> = out.lines().map(str::trim_end).collect();
        Ok(lines.join("\n").trim_end().to_string())
    }

    /// Anchored pattern for the English marker line of `external_id`. Compile it
    /// multi-line with `regex`, or pass it to MongoDB `$regex` with option `m`.
    pub fn marker_pattern(external_id: &str) -> String {
        format!(r"^{}{}\s*$", regex::escape(EN_MARKER_PREFIX), regex::escape(external_id.trim()))
    }

    pub fn marker_regex(external_id: &str) -> Result<regex::Regex, regex::Error> {
        regex::RegexBuilder::new(&marker_pattern(external_id))
            .multi_line(true)
            .build()
    }
}
