//! Job YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::JobConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Replace every `${VAR}` with the value of that environment variable.
///
/// # Errors
///
/// Fails listing every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut missing: Vec<String> = Vec::new();
    let output = ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        let name = cap.get(1).map_or("", |m| m.as_str());
        lookup(name).unwrap_or_else(|| {
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
            String::new()
        })
    });

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }
    Ok(output.into_owned())
}

/// Parse a job from a YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if substitution fails or the YAML does not match the job schema.
pub fn parse_job_str(yaml: &str) -> Result<JobConfig> {
    let substituted = substitute_env_vars(yaml)?;
    serde_yaml::from_str(&substituted).context("Failed to parse job YAML")
}

/// Parse a job file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn parse_job(path: &Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {}", path.display()))?;
    parse_job_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn substitutes_every_occurrence() {
        let out = substitute_with(
            "bucket: ${BL_BUCKET}\nprefix: ${BL_DAY}/${BL_BUCKET}",
            env(&[("BL_BUCKET", "ingest"), ("BL_DAY", "2025-08-16")]),
        )
        .unwrap();
        assert_eq!(out, "bucket: ingest\nprefix: 2025-08-16/ingest");
    }

    #[test]
    fn passthrough_without_references() {
        let input = "table: encounters\nbatch_size: 10";
        assert_eq!(substitute_with(input, env(&[])).unwrap(), input);
    }

    #[test]
    fn all_missing_variables_reported_once() {
        let err = substitute_with("${BL_X} ${BL_Y} ${BL_X}", env(&[]))
            .unwrap_err()
            .to_string();
        assert_eq!(err, "Missing environment variable(s): BL_X, BL_Y");
    }

    #[test]
    fn process_environment_is_consulted() {
        std::env::set_var("BL_PARSER_TEST_TABLE", "dbo.PatientEncounters");
        let out = substitute_env_vars("table: ${BL_PARSER_TEST_TABLE}").unwrap();
        assert_eq!(out, "table: dbo.PatientEncounters");
        std::env::remove_var("BL_PARSER_TEST_TABLE");
    }

    #[test]
    fn parses_job_from_string() {
        std::env::set_var("BL_PARSER_TEST_BUCKET", "claims-bucket");
        let yaml = r#"
version: "1.0"
job: patient_encounters
source:
  bucket: ${BL_PARSER_TEST_BUCKET}
  prefix: claims/2025-08-16/
  format: jsonl
destination:
  table: dbo.PatientEncounters
  columns: [patient_id, encounter_date, claim_amount, status_code]
load:
  batch_size: 2000
"#;
        let job = parse_job_str(yaml).unwrap();
        assert_eq!(job.job, "patient_encounters");
        assert_eq!(job.source.bucket, "claims-bucket");
        assert_eq!(job.destination.columns.len(), 4);
        assert_eq!(job.load.batch_size, 2000);
        std::env::remove_var("BL_PARSER_TEST_BUCKET");
    }

    #[test]
    fn invalid_yaml_errors() {
        assert!(parse_job_str("this is not: [valid: yaml: {{{}}}").is_err());
    }

    #[test]
    fn missing_file_names_path() {
        let err = parse_job(Path::new("/nonexistent/job.yaml"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("/nonexistent/job.yaml"));
    }
}
