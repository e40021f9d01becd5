use std::path::Path;

use anyhow::{Context, Result};

use bucketload_engine::config::parse_job;
use bucketload_engine::{check_job, ComponentCheck};

/// Execute the `check` command: validate the job and probe connectivity.
pub fn execute(job_path: &Path) -> Result<()> {
    let config = parse_job(job_path)
        .with_context(|| format!("Failed to parse job: {}", job_path.display()))?;

    let result = check_job(&config)?;
    println!("Job structure:     OK");
    print_component("Source", &result.source);
    print_component("Destination", &result.destination);

    if result.all_ok() {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}

fn print_component(label: &str, check: &ComponentCheck) {
    let status = if check.ok { "OK" } else { "FAILED" };
    println!("{:18} {}", format!("{label}:"), status);
    if !check.message.is_empty() {
        println!("  {}", check.message);
    }
}
