//! Record validation.

use std::sync::LazyLock;

use bucketload_types::{value_as_text, Record};
use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

pub const PATIENT_ID: &str = "patient_id";
pub const ENCOUNTER_DATE: &str = "encounter_date";

const DATE_FMT: &str = "%Y-%m-%d";

/// Four-digit year, one or two digit month and day. chrono alone tolerates
/// signs and leading blanks in numeric fields.
static DATE_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}$").expect("valid date shape regex")
});

/// `true` iff the record has a non-blank `patient_id` and an
/// `encounter_date` that is a real `YYYY-MM-DD` calendar date.
///
/// Never fails: missing fields and malformed values simply yield `false`.
#[must_use]
pub fn validate_record(record: &Record) -> bool {
    has_patient_id(record) && has_encounter_date(record)
}

fn has_patient_id(record: &Record) -> bool {
    match record.get(PATIENT_ID) {
        Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
            value_as_text(v).is_some_and(|text| !text.trim().is_empty())
        }
        _ => false,
    }
}

fn has_encounter_date(record: &Record) -> bool {
    match record.get(ENCOUNTER_DATE) {
        Some(Value::String(s)) => {
            DATE_SHAPE_RE.is_match(s) && NaiveDate::parse_from_str(s, DATE_FMT).is_ok()
        }
        _ => false,
    }
}
