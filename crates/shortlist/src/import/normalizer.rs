pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    collapsed.to_ascii_lowercase()
}

const AREA_UNITS: [&str; 4] = ["m²", "m2", "M²", "M2"];

/// Reads portal amounts such as `€ 249.000`, `1.250 m²` or `450m2`. Returns
/// `None` when the value carries no digits.
pub(crate) fn parse_amount(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    let unit_free = AREA_UNITS
        .iter()
        .find_map(|unit| trimmed.strip_suffix(unit))
        .unwrap_or(trimmed)
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .trim_start_matches(|c: char| !c.is_ascii_digit());
    if unit_free.is_empty() {
        return None;
    }

    let digits: String = unit_free
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | ' ' | '\u{a0}' | '\''))
        .collect();
    digits.parse().ok()
}

pub(crate) fn split_features(value: &str) -> Vec<String> {
    value
        .split([';', '|'])
        .map(str::trim)
        .filter(|feature| !feature.is_empty())
        .map(str::to_string)
        .collect()
}
