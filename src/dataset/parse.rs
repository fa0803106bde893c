//! Cell-level parsing for the movie CSV
//!
//! List columns (`genres`, `production_companies`) hold a JSON array inside a
//! CSV cell, e.g. `["Action", "Science Fiction"]`. Exports in the wild are
//! not always valid JSON, so parsing falls back in three steps:
//!
//! 1. parse the cell as a JSON array;
//! 2. parse it again after collapsing doubled quotes (`""` → `"`);
//! 3. strip the surrounding brackets, split on commas and trim quotes.

use serde_json::Value;

/// Parse a list-encoded cell into its non-empty string items.
pub fn parse_list_field(cell: &str) -> Vec<String> {
    let raw = cell.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    if let Some(items) = parse_json_array(raw) {
        return items;
    }
    if raw.contains("\"\"") {
        if let Some(items) = parse_json_array(&raw.replace("\"\"", "\"")) {
            return items;
        }
    }

    let inner = raw.strip_prefix('[').unwrap_or(raw);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    inner
        .replace("\"\"", "\"")
        .split(',')
        .map(|part| part.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_json_array(raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.is_empty() => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// A finite float, or `None` for blank and malformed cells.
pub fn parse_f64(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A non-negative amount. Accepts `1500000`, `1500000.0` and `1.5e6`.
pub fn parse_amount(cell: &str) -> Option<u64> {
    parse_f64(cell)
        .filter(|v| *v >= 0.0 && *v <= u64::MAX as f64)
        .map(|v| v.round() as u64)
}

/// Minutes of runtime.
pub fn parse_minutes(cell: &str) -> Option<u32> {
    parse_f64(cell)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32)
}

/// A calendar year. Zero means unknown in the source exports.
pub fn parse_year(cell: &str) -> Option<i32> {
    parse_f64(cell)
        .filter(|v| v.fract() == 0.0 && v.abs() <= i32::MAX as f64)
        .map(|v| v as i32)
        .filter(|y| *y != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // LIST CELL TESTS
    // ==========================================================================

    #[test]
    fn test_valid_json_array() {
        assert_eq!(
            parse_list_field(r#"["Action", "Science Fiction"]"#),
            vec!["Action", "Science Fiction"]
        );
    }

    #[test]
    fn test_empty_and_blank_cells() {
        assert!(parse_list_field("").is_empty());
        assert!(parse_list_field("   ").is_empty());
        assert!(parse_list_field("[]").is_empty());
    }

    #[test]
    fn test_json_drops_empty_and_null_items() {
        assert_eq!(parse_list_field(r#"["Drama", "", null]"#), vec!["Drama"]);
    }

    #[test]
    fn test_doubled_quotes_are_collapsed() {
        assert_eq!(
            parse_list_field(r#"[""Warner Bros."", ""Legendary Pictures""]"#),
            vec!["Warner Bros.", "Legendary Pictures"]
        );
    }

    #[test]
    fn test_single_quoted_python_style_list() {
        assert_eq!(
            parse_list_field("['Comedy', 'Romance']"),
            vec!["Comedy", "Romance"]
        );
    }

    #[test]
    fn test_bare_comma_list() {
        assert_eq!(parse_list_field("Horror, Thriller"), vec!["Horror", "Thriller"]);
    }

    #[test]
    fn test_json_object_falls_back() {
        // Not an array: treated as text
        assert_eq!(parse_list_field(r#"{"a":1}"#), vec![r#"{"a":1}"#]);
    }

    // ==========================================================================
    // NUMERIC CELL TESTS
    // ==========================================================================

    #[test]
    fn test_amounts() {
        assert_eq!(parse_amount("1500000"), Some(1_500_000));
        assert_eq!(parse_amount("1500000.0"), Some(1_500_000));
        assert_eq!(parse_amount("1.5e6"), Some(1_500_000));
        assert_eq!(parse_amount("-3"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_years() {
        assert_eq!(parse_year("2009"), Some(2009));
        assert_eq!(parse_year("2009.0"), Some(2009));
        assert_eq!(parse_year("0"), None);
        assert_eq!(parse_year("2009.5"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn test_floats_reject_non_finite() {
        assert_eq!(parse_f64(" 7.2 "), Some(7.2));
        assert_eq!(parse_f64("NaN"), None);
        assert_eq!(parse_f64("inf"), None);
    }
}
