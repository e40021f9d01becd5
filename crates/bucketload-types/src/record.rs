//! Decoded records and their column projections.

use std::borrow::Cow;

use serde_json::Value;

/// One decoded JSON line or CSV row, keyed by field name.
pub type Record = serde_json::Map<String, Value>;

/// A record projected onto an insert target's columns, in column order.
pub type Row = Vec<Value>;

/// Extra column appended to every invalid-log entry.
pub const ERROR_COLUMN: &str = "_error";

/// Value written to [`ERROR_COLUMN`] for records rejected by validation.
pub const VALIDATION_FAILED: &str = "validation_failed";

/// Project `record` onto `columns`. Missing fields become `null`.
#[must_use]
pub fn project(record: &Record, columns: &[String]) -> Row {
    columns
        .iter()
        .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Textual form of a scalar value; `None` for `null`.
///
/// Strings are returned as-is, numbers and booleans in their JSON spelling,
/// and nested arrays/objects as compact JSON.
#[must_use]
pub fn value_as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Array(_) | Value::Object(_) => Some(Cow::Owned(value.to_string())),
    }
}
