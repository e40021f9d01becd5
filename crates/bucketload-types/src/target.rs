//! Insert target: table name plus ordered column list.

use std::collections::HashSet;

use crate::record::ERROR_COLUMN;

/// Problems found when building an [`InsertTarget`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("table name must not be empty")]
    EmptyTable,
    #[error("table name '{0}' has an empty component")]
    EmptyTablePart(String),
    #[error("at least one column is required")]
    NoColumns,
    #[error("column names must not be empty")]
    EmptyColumn,
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    #[error("column '{0}' is reserved for the invalid-row log")]
    ReservedColumn(String),
    #[error("identifier '{0}' contains a NUL byte")]
    NulByte(String),
}

/// Table plus the columns every record is projected onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTarget {
    table: String,
    columns: Vec<String>,
}

impl InsertTarget {
    /// Build a target, rejecting empty, duplicate or reserved names.
    ///
    /// `table` may be schema-qualified (`dbo.PatientEncounters`).
    ///
    /// # Errors
    ///
    /// Returns the first [`TargetError`] found.
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Result<Self, TargetError> {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(TargetError::EmptyTable);
        }
        if table.contains('\0') {
            return Err(TargetError::NulByte(table));
        }
        if table.split('.').any(|part| part.trim().is_empty()) {
            return Err(TargetError::EmptyTablePart(table));
        }
        if columns.is_empty() {
            return Err(TargetError::NoColumns);
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for col in &columns {
            if col.trim().is_empty() {
                return Err(TargetError::EmptyColumn);
            }
            if col.contains('\0') {
                return Err(TargetError::NulByte(col.clone()));
            }
            if col == ERROR_COLUMN {
                return Err(TargetError::ReservedColumn(col.clone()));
            }
            if !seen.insert(col.as_str()) {
                return Err(TargetError::DuplicateColumn(col.clone()));
            }
        }
        Ok(Self { table, columns })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Dot-separated components of the table name (`schema`, `table`).
    pub fn table_parts(&self) -> impl Iterator<Item = &str> {
        self.table.split('.')
    }
}
