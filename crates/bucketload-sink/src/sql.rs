//! Multi-row INSERT statement assembly shared by both backends.

use std::fmt::Write as _;

use bucketload_types::{InsertTarget, Row};
use pg_escape::quote_identifier;

use crate::error::{self, SinkError};

/// `schema.table` with each component quoted as needed.
pub(crate) fn qualified_table(target: &InsertTarget) -> String {
    target
        .table_parts()
        .map(|part| quote_identifier(part).into_owned())
        .collect::<Vec<_>>()
        .join(".")
}

pub(crate) fn column_list(target: &InsertTarget) -> String {
    target
        .columns()
        .iter()
        .map(|c| quote_identifier(c).into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rows that fit in one statement without exceeding `max_params` binds.
pub(crate) fn rows_per_statement(columns: usize, max_params: usize) -> usize {
    (max_params / columns.max(1)).max(1)
}

/// Build `INSERT INTO t (cols) VALUES (..), (..)` for `rows` rows.
///
/// `placeholder(n, col)` renders the `n`-th (1-based) bind parameter, which
/// belongs to column index `col`.
pub(crate) fn insert_sql(
    target: &InsertTarget,
    rows: usize,
    placeholder: impl Fn(usize, usize) -> String,
) -> String {
    let width = target.columns().len();
    let header = format!(
        "INSERT INTO {} ({}) VALUES ",
        qualified_table(target),
        column_list(target)
    );
    let mut sql = String::with_capacity(header.len() + rows * width * 6);
    sql.push_str(&header);

    let mut n = 0;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..width {
            if col > 0 {
                sql.push_str(", ");
            }
            n += 1;
            let _ = write!(sql, "{}", placeholder(n, col));
        }
        sql.push(')');
    }
    sql
}

/// Reject rows whose width differs from the target's column count.
pub(crate) fn check_widths(target: &InsertTarget, rows: &[Row]) -> error::Result<()> {
    let expected = target.columns().len();
    match rows.iter().position(|r| r.len() != expected) {
        Some(row) => Err(SinkError::RowWidth {
            row,
            expected,
            actual: rows[row].len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> InsertTarget {
        InsertTarget::new(
            "dbo.PatientEncounters",
            vec!["patient_id".into(), "encounter_date".into()],
        )
        .unwrap()
    }

    #[test]
    fn quotes_mixed_case_identifiers() {
        assert_eq!(qualified_table(&target()), "dbo.\"PatientEncounters\"");
        assert_eq!(column_list(&target()), "patient_id, encounter_date");
    }

    #[test]
    fn builds_numbered_placeholders() {
        let sql = insert_sql(&target(), 2, |n, _| format!("${n}"));
        assert_eq!(
            sql,
            "INSERT INTO dbo.\"PatientEncounters\" (patient_id, encounter_date) \
             VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn placeholder_sees_column_index() {
        let sql = insert_sql(&target(), 1, |n, col| format!("?{n}/{col}"));
        assert!(sql.ends_with("VALUES (?1/0, ?2/1)"));
    }

    #[test]
    fn rows_per_statement_respects_limit() {
        assert_eq!(rows_per_statement(4, 65_535), 16_383);
        assert_eq!(rows_per_statement(100_000, 65_535), 1);
        assert_eq!(rows_per_statement(0, 10), 10);
    }

    #[test]
    fn width_mismatch_is_reported() {
        let rows = vec![vec![json!("P1"), json!("2025-08-01")], vec![json!("P2")]];
        let err = check_widths(&target(), &rows).unwrap_err();
        assert!(matches!(
            err,
            SinkError::RowWidth {
                row: 1,
                expected: 2,
                actual: 1
            }
        ));
    }
}
