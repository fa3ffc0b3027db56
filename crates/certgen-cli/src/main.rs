//! `certgen` CLI: render one PDF certificate per dataset row and zip them.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use certgen::{pipeline, BatchConfig, CancelToken, Dataset, RunReport};

/// Log progress every this many records
const PROGRESS_STEP: usize = 50;

#[derive(Parser)]
#[command(
    version,
    about = "Generate a ZIP of PDF certificates from a dataset and a template image"
)]
struct Cli {
    /// Batch configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Dataset: .xlsx, .xls, .ods or a JSON array of objects
    #[arg(short, long, value_name = "FILE")]
    data: PathBuf,

    /// Write the archive here instead of the configured path
    #[arg(short, long, value_name = "FILE")]
    archive: Option<PathBuf>,

    /// Scratch directory for documents before packaging
    #[arg(long = "work-dir", value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Number of render threads (default: available parallelism)
    #[arg(short = 'j', long)]
    workers: Option<usize>,
}

fn run(cli: Cli) -> Result<RunReport> {
    let mut config = BatchConfig::from_file(&cli.config)
        .with_context(|| format!("cannot load configuration {}", cli.config.display()))?;

    if let Some(archive) = cli.archive {
        config.output.archive = archive;
    }
    if let Some(work_dir) = cli.work_dir {
        config.output.work_dir = work_dir;
    }
    if cli.workers.is_some() {
        config.workers = cli.workers;
    }

    let dataset = Dataset::load(&cli.data)
        .with_context(|| format!("cannot load dataset {}", cli.data.display()))?;

    let progress = |done: usize, total: usize| {
        if done == total || done % PROGRESS_STEP == 0 {
            log::info!("Rendered {done}/{total} records");
        }
    };
    let report = pipeline::run_with_progress(&config, dataset, &CancelToken::new(), &progress)?;
    Ok(report)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(report) => {
            if !report.skipped.is_empty() {
                log::warn!("{} records were skipped", report.skipped.len());
            }
            println!("{report}");
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}
