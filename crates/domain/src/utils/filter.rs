//! OData `$filter` fragments built from value lists
//!
//! Fragments are produced, never parsed. Unusable input yields an empty
//! string, which callers treat as "no filter".

use crate::constants::DEFAULT_FILTER_OPERATOR;

/// Reserved characters and their escapes, applied in one pass so `%` is
/// never double-encoded.
const FILTER_REPLACEMENTS: [(char, &str); 6] =
    [('%', "%25"), ('+', "%2B"), ('/', "%2F"), ('?', "%3F"), ('#', "%23"), ('&', "%26")];

/// A value compared against a column.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Rendered as a bare literal.
    Number(f64),
    /// Rendered single-quoted after escaping.
    Text(String),
}

impl FilterValue {
    /// Zero, NaN and empty strings carry no filter meaning and are skipped.
    fn is_falsy(&self) -> bool {
        match self {
            Self::Number(n) => *n == 0.0 || n.is_nan(),
            Self::Text(s) => s.is_empty(),
        }
    }

    fn literal(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => format!("'{}'", encode_filter_value(s)),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        // Precision loss above 2^53 is acceptable for list ids and sort keys
        #[allow(clippy::cast_precision_loss)]
        Self::Number(value as f64)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Escape the reserved characters of a filter literal.
///
/// ```
/// use spbridge_domain::encode_filter_value;
///
/// assert_eq!(encode_filter_value("R&D / Ops"), "R%26D %2F Ops");
/// ```
#[must_use]
pub fn encode_filter_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for ch in value.chars() {
        match FILTER_REPLACEMENTS.iter().find(|(reserved, _)| *reserved == ch) {
            Some((_, replacement)) => encoded.push_str(replacement),
            None => encoded.push(ch),
        }
    }
    encoded
}

/// `(Field op v1 or Field op v2 ...)`
///
/// ```
/// use spbridge_domain::or_clause;
/// use spbridge_domain::utils::filter::FilterValue;
///
/// let areas: Vec<FilterValue> = vec!["Americas".into(), "EMEIA".into()];
/// assert_eq!(
///     or_clause(Some(areas.as_slice()), "Area", None),
///     "(Area eq 'Americas' or Area eq 'EMEIA')"
/// );
/// assert_eq!(or_clause(None, "Area", None), "");
/// ```
#[must_use]
pub fn or_clause(values: Option<&[FilterValue]>, field: &str, operator: Option<&str>) -> String {
    join_clause(values, field, operator, " or ")
}

/// `(Field op v1 and Field op v2 ...)`
#[must_use]
pub fn and_clause(values: Option<&[FilterValue]>, field: &str, operator: Option<&str>) -> String {
    join_clause(values, field, operator, " and ")
}

fn join_clause(
    values: Option<&[FilterValue]>,
    field: &str,
    operator: Option<&str>,
    separator: &str,
) -> String {
    let Some(values) = values else {
        return String::new();
    };
    if field.is_empty() {
        return String::new();
    }
    let operator = operator.filter(|op| !op.is_empty()).unwrap_or(DEFAULT_FILTER_OPERATOR);

    let predicates: Vec<String> = values
        .iter()
        .filter(|value| !value.is_falsy())
        .map(|value| format!("{field} {operator} {}", value.literal()))
        .collect();

    if predicates.is_empty() {
        return String::new();
    }
    format!("({})", predicates.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<T: Into<FilterValue> + Clone>(items: &[T]) -> Vec<FilterValue> {
        items.iter().cloned().map(Into::into).collect()
    }

    #[test]
    fn or_clause_quotes_strings() {
        let areas = values(&["Americas", "EMEIA"]);
        assert_eq!(or_clause(Some(areas.as_slice()), "Area", None), "(Area eq 'Americas' or Area eq 'EMEIA')");
    }

    #[test]
    fn and_clause_leaves_numbers_bare() {
        let sorts = values(&[5_i64, 10]);
        assert_eq!(and_clause(Some(sorts.as_slice()), "Sort", None), "(Sort eq 5 and Sort eq 10)");
    }

    #[test]
    fn custom_operator_is_used() {
        let sorts = values(&[5_i64]);
        assert_eq!(or_clause(Some(sorts.as_slice()), "Sort", Some("ge")), "(Sort ge 5)");
    }

    #[test]
    fn fractional_numbers_render_plainly() {
        let sorts = values(&[2.5_f64]);
        assert_eq!(or_clause(Some(sorts.as_slice()), "Weight", None), "(Weight eq 2.5)");
    }

    #[test]
    fn empty_or_missing_input_yields_empty_string() {
        assert_eq!(or_clause(Some(Vec::new().as_slice()), "Area", None), "");
        assert_eq!(or_clause(None, "Area", None), "");
        assert_eq!(and_clause(None, "Area", None), "");
        let areas = values(&["Americas"]);
        assert_eq!(or_clause(Some(areas.as_slice()), "", None), "");
    }

    #[test]
    fn falsy_entries_are_skipped() {
        let mixed = vec![
            FilterValue::from(""),
            FilterValue::from(0_i64),
            FilterValue::from("EMEIA"),
            FilterValue::Number(f64::NAN),
        ];
        assert_eq!(or_clause(Some(mixed.as_slice()), "Area", None), "(Area eq 'EMEIA')");

        let all_falsy = vec![FilterValue::from(""), FilterValue::from(0_i64)];
        assert_eq!(or_clause(Some(all_falsy.as_slice()), "Area", None), "");
    }

    #[test]
    fn reserved_characters_are_escaped_before_quoting() {
        let names = values(&["R&D/Ops"]);
        assert_eq!(or_clause(Some(names.as_slice()), "Team", None), "(Team eq 'R%26D%2FOps')");
    }

    #[test]
    fn escaping_covers_whole_table_without_double_encoding() {
        assert_eq!(encode_filter_value("%+/?#&"), "%25%2B%2F%3F%23%26");
        assert_eq!(encode_filter_value("100%"), "100%25");
        assert_eq!(encode_filter_value("plain text"), "plain text");
    }

    #[test]
    fn escaped_output_has_no_reserved_characters_left() {
        let raw = "a+b/c?d#e&f";
        let encoded = encode_filter_value(raw);
        assert!(!encoded.chars().any(|c| matches!(c, '+' | '/' | '?' | '#' | '&')));
    }
}
