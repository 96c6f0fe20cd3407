//! Results of write calls and item version tags

use std::fmt;

use serde_json::Value;

/// Opaque item version marker (etag) used for conditional updates.
///
/// Always read fresh right before a write; never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyTag(String);

impl ConcurrencyTag {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form sent in `If-Match`: brace delimiters stripped, lower-cased.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.chars().filter(|c| *c != '{' && *c != '}').collect::<String>().to_lowercase()
    }
}

impl fmt::Display for ConcurrencyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a write call resolved with.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The platform returned the written item inside a metadata envelope.
    Item { record: Value, uri: Option<String>, etag: Option<ConcurrencyTag> },
    /// The platform returned a results array.
    Results(Vec<Value>),
    /// Any other body, passed through unchanged (`Null` for empty bodies).
    Raw(Value),
    /// Local mode: nothing was sent, the input payload is echoed back.
    DryRun(Value),
}

impl WriteOutcome {
    /// Item URI when the platform reported one.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::Item { uri, .. } => uri.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn etag(&self) -> Option<&ConcurrencyTag> {
        match self {
            Self::Item { etag, .. } => etag.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun(_))
    }

    /// Collapse into a single JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Item { record, .. } => record,
            Self::Results(items) => Value::Array(items),
            Self::Raw(value) | Self::DryRun(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tag_normalization_strips_braces_and_folds_case() {
        let tag = ConcurrencyTag::new("\"{6E4E2A4B-1C3D-4A2B-9F00-ABCDEF012345},3\"");
        assert_eq!(tag.normalized(), "\"6e4e2a4b-1c3d-4a2b-9f00-abcdef012345,3\"");
        assert_eq!(ConcurrencyTag::new("\"2\"").normalized(), "\"2\"");
    }

    #[test]
    fn outcome_accessors() {
        let item = WriteOutcome::Item {
            record: json!({"ID": 4}),
            uri: Some("https://h/items(4)".into()),
            etag: Some(ConcurrencyTag::new("\"1\"")),
        };
        assert_eq!(item.uri(), Some("https://h/items(4)"));
        assert_eq!(item.etag().map(ConcurrencyTag::as_str), Some("\"1\""));
        assert_eq!(item.into_value(), json!({"ID": 4}));

        let results = WriteOutcome::Results(vec![json!(1), json!(2)]);
        assert_eq!(results.uri(), None);
        assert_eq!(results.into_value(), json!([1, 2]));

        assert!(WriteOutcome::DryRun(json!({})).is_dry_run());
    }
}
