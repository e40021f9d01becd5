//! Semantic validation for parsed job files.

use std::collections::HashSet;

use anyhow::{bail, Result};
use bucketload_types::{Format, InsertTarget};

use crate::config::types::{BackendKind, JobConfig, StorageKind};

/// Validate a parsed job. Every problem found is reported in one error.
///
/// # Errors
///
/// Returns an error listing all validation failures.
pub fn validate_job(config: &JobConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported job version '{}', expected '1.0'",
            config.version
        ));
    }
    if config.job.trim().is_empty() {
        errors.push("Job name must not be empty".to_string());
    }

    let source = &config.source;
    if source.bucket.trim().is_empty() {
        errors.push("Source bucket must not be empty".to_string());
    }
    if let Err(e) = source.format.parse::<Format>() {
        errors.push(e.to_string());
    }
    if source.storage == StorageKind::Local
        && (source.region.is_some() || source.endpoint_url.is_some())
    {
        errors.push("region/endpoint_url only apply to s3 storage".to_string());
    }

    let dest = &config.destination;
    let mut seen = HashSet::new();
    for column in &dest.columns {
        if !seen.insert(column.as_str()) {
            errors.push(format!("Column '{column}' is listed more than once"));
        }
    }
    // Structural table/column checks; duplicates are already reported above.
    if let Err(e) = InsertTarget::new(dest.table.clone(), dedup(&dest.columns)) {
        errors.push(format!("Destination: {e}"));
    }
    match (dest.backend, &dest.path) {
        (BackendKind::Sqlite, None) => {
            errors.push("Destination backend 'sqlite' requires a path".to_string());
        }
        (BackendKind::Postgres, Some(_)) => {
            errors.push("Destination path only applies to the sqlite backend".to_string());
        }
        _ => {}
    }

    if config.load.batch_size == 0 {
        errors.push("batch_size must be at least 1".to_string());
    }
    if config.load.invalid_log_path.as_os_str().is_empty() {
        errors.push("invalid_log_path must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Job validation failed:\n  - {}", errors.join("\n  - "));
    }
}

fn dedup(columns: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_job_str;

    fn valid_yaml() -> &'static str {
        r#"
version: "1.0"
job: encounters
source:
  bucket: ingest
  prefix: claims/
  format: jsonl
destination:
  table: dbo.PatientEncounters
  columns: [patient_id, encounter_date]
"#
    }

    fn errors_for(yaml: &str) -> String {
        let config = parse_job_str(yaml).unwrap();
        validate_job(&config).unwrap_err().to_string()
    }

    #[test]
    fn valid_job_passes() {
        let config = parse_job_str(valid_yaml()).unwrap();
        assert!(validate_job(&config).is_ok());
    }

    #[test]
    fn wrong_version_fails() {
        let err = errors_for(&valid_yaml().replace("\"1.0\"", "\"2.0\""));
        assert!(err.contains("Unsupported job version"));
    }

    #[test]
    fn unsupported_format_fails() {
        let err = errors_for(&valid_yaml().replace("jsonl", "parquet"));
        assert!(err.contains("unsupported format 'parquet'"));
    }

    #[test]
    fn format_is_case_insensitive() {
        let config = parse_job_str(&valid_yaml().replace("jsonl", "JSONL")).unwrap();
        assert!(validate_job(&config).is_ok());
    }

    #[test]
    fn duplicate_column_fails() {
        let err = errors_for(
            &valid_yaml().replace("[patient_id, encounter_date]", "[patient_id, patient_id]"),
        );
        assert!(err.contains("'patient_id' is listed more than once"));
    }

    #[test]
    fn empty_columns_fail() {
        let err = errors_for(&valid_yaml().replace("[patient_id, encounter_date]", "[]"));
        assert!(err.contains("Destination:"));
    }

    #[test]
    fn sqlite_without_path_fails() {
        let yaml = valid_yaml().replace(
            "destination:\n",
            "destination:\n  backend: sqlite\n",
        );
        assert!(errors_for(&yaml).contains("requires a path"));
    }

    #[test]
    fn all_errors_are_collected() {
        let yaml = r#"
version: "1.0"
job: ""
source:
  bucket: ""
  format: xml
destination:
  table: ""
  columns: [a]
load:
  batch_size: 0
"#;
        let err = errors_for(yaml);
        assert!(err.starts_with("Job validation failed:"));
        assert!(err.contains("Job name must not be empty"));
        assert!(err.contains("Source bucket must not be empty"));
        assert!(err.contains("unsupported format 'xml'"));
        assert!(err.contains("batch_size must be at least 1"));
        assert_eq!(err.matches("\n  - ").count(), 5);
    }
}
