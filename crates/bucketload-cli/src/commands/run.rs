use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use bucketload_engine::config::parse_job;
use bucketload_engine::{run_job, LoadOverrides};

/// Execute the `run` command: parse a job and run it.
///
/// Job validation happens inside [`run_job`], before any I/O.
pub fn execute(job_path: &Path, batch_size: Option<usize>, invalid_log: Option<PathBuf>) -> Result<()> {
    let config = parse_job(job_path)
        .with_context(|| format!("Failed to parse job: {}", job_path.display()))?;

    tracing::info!(
        job = config.job,
        bucket = config.source.bucket,
        prefix = config.source.prefix,
        table = config.destination.table,
        columns = config.destination.columns.len(),
        "Job loaded"
    );

    let overrides = LoadOverrides {
        batch_size,
        invalid_log_path: invalid_log,
    };
    let summary = run_job(&config, &overrides)
        .with_context(|| format!("Job '{}' failed", config.job))?;

    println!(
        "Inserted: {} | Skipped (invalid): {}",
        format_count(summary.inserted),
        format_count(summary.skipped)
    );
    Ok(())
}

/// Render `n` with `,` thousands separators.
fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
