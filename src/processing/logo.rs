//! Placeholder company logos rendered as SVG from the company name.

const CJK_SUFFIXES: &[&str] = &["股份有限公司", "有限责任公司", "有限公司", "集团", "公司", "科技", "技术"];

// Dotted forms precede their bare forms.
const LATIN_SUFFIXES: &[&str] = &[
    "corporation", "incorporated", "company", "limited", "group", "gmbh", "corp.", "corp",
    "ltd.", "ltd", "inc.", "inc", "llc", "plc", "co.", "co", "ag", "sa",
];

const GLYPH_SLOTS: usize = 4;
const BACKGROUND: &str = "#00b899";
const CORNER_RADIUS: u32 = 8;
const FONT_FAMILY: &str = "Arial, PingFang SC, Microsoft YaHei, sans-serif";

#[derive(Debug, Clone, Copy)]
pub struct BrandingSynthesizer {
    size: u32,
}

impl Default for BrandingSynthesizer {
    fn default() -> Self {
        Self { size: 256 }
    }
}

impl BrandingSynthesizer {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(16) }
    }

    /// SVG bytes for `company_name`. Pure: the same name always yields the same bytes.
    pub fn logo(&self, company_name: &str) -> Vec<u8> {
        self.render(&glyphs(company_name)).into_bytes()
    }

    fn render(&self, glyphs: &[char]) -> String {
        let size = self.size as f64;
        let font_size = (size / 3.5).floor();
        let half = font_size * 1.3 / 2.0;
        let center = size / 2.0;
        let cells = [
            (center - half, center - half),
            (center + half, center - half),
            (center - half, center + half),
            (center + half, center + half),
        ];

        let mut svg = String::new();
        svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        svg.push_str(&format!(
            "<svg width=\"{0}\" height=\"{0}\" viewBox=\"0 0 {0} {0}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
            self.size
        ));
        svg.push_str(&format!(
            "  <rect width=\"100%\" height=\"100%\" fill=\"{}\" rx=\"{r}\" ry=\"{r}\"/>\n",
            BACKGROUND,
            r = CORNER_RADIUS
        ));
        for (i, (x, y)) in cells.iter().enumerate() {
            let glyph = glyphs.get(i).map(|c| escape_xml(*c)).unwrap_or_default();
            svg.push_str(&format!(
                "  <text x=\"{}\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"white\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>\n",
                fmt_coord(*x),
                fmt_coord(*y),
                FONT_FAMILY,
                font_size,
                glyph
            ));
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn fmt_coord(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

fn escape_xml(c: char) -> String {
    match c {
        '&' => "&amp;".to_string(),
        '<' => "&lt;".to_string(),
        '>' => "&gt;".to_string(),
        '"' => "&quot;".to_string(),
        '\'' => "&apos;".to_string(),
        other => other.to_string(),
    }
}

/// Removes trailing corporate suffixes, repeatedly, then all whitespace.
pub fn strip_corporate_suffixes(name: &str) -> String {
    let mut current = name.trim().to_string();
    loop {
        let trimmed = current.trim_end_matches(|c: char| c.is_whitespace() || c == ',').to_string();
        match strip_one_suffix(&trimmed) {
            Some(rest) => current = rest,
            None => {
                current = trimmed;
                break;
            }
        }
    }
    current.chars().filter(|c| !c.is_whitespace()).collect()
}

fn strip_one_suffix(name: &str) -> Option<String> {
    for suffix in CJK_SUFFIXES {
        if let Some(rest) = name.strip_suffix(suffix) {
            return Some(rest.to_string());
        }
    }

    let lower = name.to_lowercase();
    // Lowercasing can change byte lengths outside ASCII; only compare when it did not.
    if lower.len() != name.len() {
        return None;
    }
    for suffix in LATIN_SUFFIXES {
        if !lower.ends_with(suffix) {
            continue;
        }
        let cut = name.len() - suffix.len();
        if !name.is_char_boundary(cut) {
            continue;
        }
        let rest = &name[..cut];
        // Whole-word only: "Disco" keeps its "co".
        let at_boundary = rest
            .chars()
            .last()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(false);
        if at_boundary {
            return Some(rest.to_string());
        }
    }
    None
}

/// Exactly four glyphs for the logo grid, or none for a blank name.
pub fn glyphs(company_name: &str) -> Vec<char> {
    let clean: Vec<char> = strip_corporate_suffixes(company_name).chars().collect();
    let mut chosen: Vec<char> = clean.iter().copied().take(GLYPH_SLOTS).collect();

    if chosen.len() < GLYPH_SLOTS {
        let compact: Vec<char> = company_name.chars().filter(|c| !c.is_whitespace()).collect();
        for c in compact.iter().skip(clean.len()) {
            if chosen.len() >= GLYPH_SLOTS {
                break;
            }
            if !chosen.contains(c) {
                chosen.push(*c);
            }
        }
        if let Some(first) = chosen.first().copied() {
            while chosen.len() < GLYPH_SLOTS {
                chosen.push(first);
            }
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logo_is_deterministic() {
        let synth = BrandingSynthesizer::default();
        let a = synth.logo("Acme Green Energy Co., Ltd.");
        let b = synth.logo("Acme Green Energy Co., Ltd.");
        assert_eq!(a, b);
        let svg = String::from_utf8(a).unwrap();
        assert!(svg.contains("fill=\"#00b899\""));
        assert!(svg.contains("width=\"256\""));
        assert_eq!(svg.matches("<text ").count(), 4);
    }

    #[test]
    fn test_latin_suffixes_are_stripped_repeatedly() {
        assert_eq!(strip_corporate_suffixes("Acme Green Energy Co., Ltd."), "AcmeGreenEnergy");
        assert_eq!(strip_corporate_suffixes("Vestas Wind Systems A/S Group"), "VestasWindSystemsA/S");
        assert_eq!(strip_corporate_suffixes("Siemens Gamesa GmbH"), "SiemensGamesa");
        // suffix letters inside a word are kept
        assert_eq!(strip_corporate_suffixes("Disco"), "Disco");
        assert_eq!(glyphs("Acme Green Energy Co., Ltd."), vec!['A', 'c', 'm', 'e']);
    }

    #[test]
    fn test_cjk_suffixes_are_stripped() {
        assert_eq!(strip_corporate_suffixes("明阳智慧能源集团股份有限公司"), "明阳智慧能源");
        assert_eq!(strip_corporate_suffixes("金风科技"), "金风");
        assert_eq!(glyphs("明阳智慧能源集团股份有限公司"), vec!['明', '阳', '智', '慧']);
    }

    #[test]
    fn test_short_name_backfills_from_suffix_then_repeats() {
        // "金风" leaves two slots; the stripped "科技" fills them.
        assert_eq!(glyphs("金风科技"), vec!['金', '风', '科', '技']);
        // Only three distinct characters exist, so the first is repeated.
        assert_eq!(glyphs("华公司"), vec!['华', '公', '司', '华']);
    }

    #[test]
    fn test_single_character_fills_four_slots() {
        assert_eq!(glyphs("X"), vec!['X', 'X', 'X', 'X']);
        let svg = String::from_utf8(BrandingSynthesizer::default().logo("X")).unwrap();
        assert_eq!(svg.matches(">X</text>").count(), 4);
    }

    #[test]
    fn test_blank_name_has_no_glyphs() {
        assert!(glyphs("   ").is_empty());
    }

    #[test]
    fn test_markup_is_escaped() {
        let svg = String::from_utf8(BrandingSynthesizer::default().logo("A&B")).unwrap();
        assert!(svg.contains(">&amp;</text>"));
        assert!(!svg.contains(">&</text>"));
    }
}
