mod commands;
mod diagram;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::diagram::RenderFormat;

#[derive(Parser)]
#[command(
    name = "bucketload",
    version,
    about = "Stream records from object storage into a database table"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an ingestion job
    Run {
        /// Path to job YAML file
        job: PathBuf,
        /// Rows per insert transaction (overrides `load.batch_size`)
        #[arg(long)]
        batch_size: Option<usize>,
        /// Invalid-row CSV log (overrides `load.invalid_log_path`)
        #[arg(long)]
        invalid_log: Option<PathBuf>,
    },
    /// Validate a job file and probe source and destination connectivity
    Check {
        /// Path to job YAML file
        job: PathBuf,
    },
    /// Write the CI/CD pipeline diagram as Graphviz DOT
    Diagram {
        /// Output path without extension
        #[arg(short, long, default_value = "cicd_lambda")]
        output: PathBuf,
        /// Also rasterize with the Graphviz `dot` binary
        #[arg(long, value_enum)]
        render: Option<RenderFormat>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            job,
            batch_size,
            invalid_log,
        } => commands::run::execute(&job, batch_size, invalid_log),
        Commands::Check { job } => commands::check::execute(&job),
        Commands::Diagram { output, render } => commands::diagram::execute(&output, render),
    }
}
