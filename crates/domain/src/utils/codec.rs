//! Value codec: native field values → list item payload
//!
//! Casting is one-directional. Read responses are consumed as raw JSON by the
//! call sites; there is deliberately no decoder mirroring [`cast_to_payload`].
//!
//! ```text
//! Title      Text("string value")      → "Title": "string value"
//! Count      Number(5)                 → "Count": 5
//! Done       Boolean(true)             → "Done": true
//! Due        Temporal(2019-10-24)      → "Due": "2019-10-24T00:00:00.000Z"
//! Owner      SingleRef { id: 3 }       → "OwnerId": 3
//! Tags       MultiRef([7, 12, 15])     → "TagsId": { "results": [7, 12, 15] }
//! Note       Null                      → (omitted)
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::constants::ENVELOPE_RESULTS;
use crate::types::{FieldValue, Record};

/// Suffix the platform expects on lookup columns in write payloads.
const LOOKUP_SUFFIX: &str = "Id";

/// Cast a record into the payload posted to the platform.
///
/// Null fields are dropped. Lookup fields are renamed with an `Id` suffix.
#[must_use]
pub fn cast_to_payload(record: &Record) -> Map<String, Value> {
    let mut payload = Map::new();
    for (name, value) in record.iter() {
        match value {
            FieldValue::Text(text) => {
                payload.insert(name.clone(), Value::String(text.clone()));
            }
            FieldValue::Number(number) => {
                payload.insert(name.clone(), Value::Number(number.clone()));
            }
            FieldValue::Boolean(flag) => {
                payload.insert(name.clone(), Value::Bool(*flag));
            }
            FieldValue::Temporal(instant) => {
                payload.insert(name.clone(), Value::String(cast_to_date_data(instant)));
            }
            // An id of 0 never names an item
            FieldValue::SingleRef { id } if *id == 0 => {}
            FieldValue::SingleRef { id } => {
                payload.insert(format!("{name}{LOOKUP_SUFFIX}"), json!(id));
            }
            FieldValue::MultiRef(ids) => {
                payload.insert(
                    format!("{name}{LOOKUP_SUFFIX}"),
                    cast_to_multi_value_data(ids.as_deref()),
                );
            }
            FieldValue::Null => {}
        }
    }
    payload
}

/// Millisecond-precision UTC timestamp, e.g. `2019-10-24T00:00:00.000Z`.
#[must_use]
pub fn cast_to_date_data(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wrap lookup ids in the results envelope. Missing ids give an empty list.
#[must_use]
pub fn cast_to_multi_value_data(ids: Option<&[i64]>) -> Value {
    json!({ ENVELOPE_RESULTS: ids.unwrap_or_default() })
}

/// Lenient date parsing for values read back from the platform.
///
/// Accepts RFC 3339, RFC 2822, naive date-times (taken as UTC) and bare
/// dates. Anything else is "not a valid date" and yields `None`.
#[must_use]
pub fn cast_as_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Collect the positive ids stored under `keys`, in key order.
///
/// Used to turn a set of selected lookup labels into a multi-lookup value.
#[must_use]
pub fn matching_ids<K: AsRef<str>>(ids_by_label: &HashMap<String, i64>, keys: &[K]) -> Vec<i64> {
    keys.iter()
        .filter_map(|key| ids_by_label.get(key.as_ref()).copied())
        .filter(|id| *id > 0)
        .collect()
}
