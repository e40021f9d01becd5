//! JSON value to `PostgreSQL` parameter conversion.
//!
//! Record values arrive as loosely typed JSON (CSV gives only strings), while
//! the binary protocol needs the exact column type. The server reports each
//! parameter's type when the INSERT is prepared; values are coerced to it
//! here. Types without a native mapping are sent as text and cast server side.

use std::error::Error;

use bucketload_types::value_as_text;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use pg_escape::quote_identifier;
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use serde_json::Value;

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A single bind parameter, already coerced to its column type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(Value),
}

impl ToSql for PgValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(v) => v.to_sql(ty, out),
            Self::I16(v) => v.to_sql(ty, out),
            Self::I32(v) => v.to_sql(ty, out),
            Self::I64(v) => v.to_sql(ty, out),
            Self::F32(v) => v.to_sql(ty, out),
            Self::F64(v) => v.to_sql(ty, out),
            Self::Text(v) => v.to_sql(ty, out),
            Self::Date(v) => v.to_sql(ty, out),
            Self::Timestamp(v) => v.to_sql(ty, out),
            Self::TimestampTz(v) => v.to_sql(ty, out),
            Self::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// How one target column is bound.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnBinding {
    ty: Type,
    /// Server-side cast target when the type has no native mapping.
    cast: Option<String>,
}

impl ColumnBinding {
    pub(crate) fn for_type(ty: &Type) -> Self {
        let native = [
            Type::BOOL,
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::FLOAT4,
            Type::FLOAT8,
            Type::TEXT,
            Type::VARCHAR,
            Type::BPCHAR,
            Type::NAME,
            Type::DATE,
            Type::TIMESTAMP,
            Type::TIMESTAMPTZ,
            Type::JSON,
            Type::JSONB,
        ];
        let cast = if native.contains(ty) {
            None
        } else {
            Some(format!(
                "{}.{}",
                quote_identifier(ty.schema()),
                quote_identifier(ty.name())
            ))
        };
        Self {
            ty: ty.clone(),
            cast,
        }
    }

    /// Placeholder text for the `n`-th bind parameter.
    pub(crate) fn placeholder(&self, n: usize) -> String {
        match &self.cast {
            Some(cast) => format!("${n}::text::{cast}"),
            None => format!("${n}"),
        }
    }

    pub(crate) fn bind(&self, value: &Value) -> Result<PgValue, String> {
        if self.cast.is_some() {
            return Ok(value_as_text(value).map_or(PgValue::Null, |s| PgValue::Text(s.into_owned())));
        }
        coerce(value, &self.ty)
    }
}

fn coerce(value: &Value, ty: &Type) -> Result<PgValue, String> {
    if value.is_null() {
        return Ok(PgValue::Null);
    }
    match *ty {
        Type::BOOL => to_bool(value).map(PgValue::Bool),
        Type::INT2 => to_i64(value)
            .and_then(|v| i16::try_from(v).map_err(|_| format!("{v} out of range for int2")))
            .map(PgValue::I16),
        Type::INT4 => to_i64(value)
            .and_then(|v| i32::try_from(v).map_err(|_| format!("{v} out of range for int4")))
            .map(PgValue::I32),
        Type::INT8 => to_i64(value).map(PgValue::I64),
        #[allow(clippy::cast_possible_truncation)]
        Type::FLOAT4 => to_f64(value).map(|v| PgValue::F32(v as f32)),
        Type::FLOAT8 => to_f64(value).map(PgValue::F64),
        Type::DATE => text_of(value)
            .and_then(|s| {
                NaiveDate::parse_from_str(s.trim(), DATE_FMT)
                    .map_err(|e| format!("'{s}' is not a date: {e}"))
            })
            .map(PgValue::Date),
        Type::TIMESTAMP => text_of(value).and_then(|s| parse_naive_timestamp(&s)).map(PgValue::Timestamp),
        Type::TIMESTAMPTZ => text_of(value)
            .and_then(|s| {
                DateTime::parse_from_rfc3339(s.trim())
                    .map(|dt| dt.with_timezone(&Utc))
                    .or_else(|_| parse_naive_timestamp(&s).map(|n| n.and_utc()))
            })
            .map(PgValue::TimestampTz),
        Type::JSON | Type::JSONB => Ok(PgValue::Json(value.clone())),
        _ => text_of(value).map(PgValue::Text),
    }
}

fn text_of(value: &Value) -> Result<String, String> {
    value_as_text(value)
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| "unexpected null".to_string())
}

fn to_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("{n} is not a boolean")),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(true),
            "false" | "f" | "no" | "n" | "0" => Ok(false),
            _ => Err(format!("'{s}' is not a boolean")),
        },
        other => Err(format!("{other} is not a boolean")),
    }
}

fn to_i64(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| format!("{n} is not an integer")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("'{s}' is not an integer: {e}")),
        other => Err(format!("{other} is not an integer")),
    }
}

fn to_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{n} is not a number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("'{s}' is not a number: {e}")),
        other => Err(format!("{other} is not a number")),
    }
}

fn parse_naive_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    TIMESTAMP_FMTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FMT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("'{s}' is not a timestamp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("42"), Type::INT4, PgValue::I32(42))]
    #[case(json!(42), Type::INT8, PgValue::I64(42))]
    #[case(json!(" 7 "), Type::INT2, PgValue::I16(7))]
    #[case(json!("12.5"), Type::FLOAT8, PgValue::F64(12.5))]
    #[case(json!(3), Type::FLOAT8, PgValue::F64(3.0))]
    #[case(json!("t"), Type::BOOL, PgValue::Bool(true))]
    #[case(json!(0), Type::BOOL, PgValue::Bool(false))]
    #[case(json!(12), Type::TEXT, PgValue::Text("12".into()))]
    #[case(json!(null), Type::INT4, PgValue::Null)]
    #[case(
        json!("2025-08-01"),
        Type::DATE,
        PgValue::Date(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())
    )]
    #[case(json!({"a": 1}), Type::JSONB, PgValue::Json(json!({"a": 1})))]
    fn coerces_to_column_type(#[case] value: Value, #[case] ty: Type, #[case] expected: PgValue) {
        assert_eq!(coerce(&value, &ty).unwrap(), expected);
    }

    #[rstest]
    #[case(json!("abc"), Type::INT4)]
    #[case(json!(70_000), Type::INT2)]
    #[case(json!("maybe"), Type::BOOL)]
    #[case(json!("2025-13-40"), Type::DATE)]
    #[case(json!(1.5), Type::INT8)]
    fn rejects_unconvertible_values(#[case] value: Value, #[case] ty: Type) {
        assert!(coerce(&value, &ty).is_err());
    }

    #[test]
    fn timestamps_accept_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        for s in ["2025-08-01T10:30:00", "2025-08-01 10:30:00", "2025-08-01T10:30:00.000"] {
            assert_eq!(
                coerce(&json!(s), &Type::TIMESTAMP).unwrap(),
                PgValue::Timestamp(expected)
            );
        }
        assert_eq!(
            coerce(&json!("2025-08-01T12:30:00+02:00"), &Type::TIMESTAMPTZ).unwrap(),
            PgValue::TimestampTz(expected.and_utc())
        );
    }

    #[test]
    fn unmapped_types_bind_as_text_with_cast() {
        let binding = ColumnBinding::for_type(&Type::NUMERIC);
        let placeholder = binding.placeholder(3);
        assert!(placeholder.starts_with("$3::text::pg_catalog."), "got: {placeholder}");
        assert!(placeholder.contains("numeric"));
        assert_eq!(
            binding.bind(&json!(10.25)).unwrap(),
            PgValue::Text("10.25".into())
        );
        assert_eq!(binding.bind(&Value::Null).unwrap(), PgValue::Null);
    }

    #[test]
    fn native_types_use_plain_placeholders() {
        let binding = ColumnBinding::for_type(&Type::DATE);
        assert_eq!(binding.placeholder(1), "$1");
    }
}
