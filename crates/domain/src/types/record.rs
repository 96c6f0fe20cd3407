//! Records and the field values they carry

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Number;

/// A single field value of a list item.
///
/// The variants are the only shapes the value codec knows how to cast, so the
/// mapping to the wire payload is exhaustive.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Number),
    Boolean(bool),
    Temporal(DateTime<Utc>),
    /// Lookup column holding one item id.
    SingleRef { id: i64 },
    /// Multi-value lookup column. `None` stands for an absent or unusable
    /// value at this position.
    MultiRef(Option<Vec<i64>>),
    Null,
}

impl FieldValue {
    #[must_use]
    pub fn single_ref(id: i64) -> Self {
        Self::SingleRef { id }
    }

    #[must_use]
    pub fn multi_ref(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::MultiRef(Some(ids.into_iter().collect()))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

/// Non-finite floats have no JSON form and become [`FieldValue::Null`].
impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Temporal(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A list item as a mapping of column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_expected_variants() {
        assert_eq!(FieldValue::from("a"), FieldValue::Text("a".into()));
        assert_eq!(FieldValue::from(5_i64), FieldValue::Number(5.into()));
        assert_eq!(FieldValue::from(true), FieldValue::Boolean(true));
        assert_eq!(FieldValue::from(None::<String>), FieldValue::Null);
        assert_eq!(FieldValue::from(f64::NAN), FieldValue::Null);
    }

    #[test]
    fn builder_overwrites_existing_field() {
        let record = Record::new().with("Title", "one").with("Title", "two");
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("Title"), Some(&FieldValue::Text("two".into())));
    }

    #[test]
    fn collects_from_pairs() {
        let record: Record = vec![("A", FieldValue::from(1_i64)), ("B", FieldValue::Null)]
            .into_iter()
            .collect();
        assert_eq!(record.len(), 2);
        assert!(record.get("B").is_some_and(FieldValue::is_null));
    }
}
