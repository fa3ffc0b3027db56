//! End-to-end batch run: generate, then package

use crate::archive::ArchivePackager;
use crate::batch::{BatchGenerator, CancelToken, Progress, SkippedRecord, WorkingArea};
use crate::config::{BatchConfig, OutputConfig};
use crate::dataset::Dataset;
use crate::stages::Batch;
use crate::{CertError, Result};
use std::fmt;
use std::path::PathBuf;

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub archive: PathBuf,
    /// Documents in the archive
    pub documents: usize,
    pub skipped: Vec<SkippedRecord>,
    pub font_fallbacks: usize,
    pub empty_fields: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} certificates written to {}",
            self.documents,
            self.archive.display()
        )?;
        write!(f, "{} records skipped", self.skipped.len())?;
        for skipped in &self.skipped {
            write!(f, "\n  row {} ({}): {}", skipped.index, skipped.name, skipped.reason)?;
        }
        if self.font_fallbacks > 0 {
            write!(f, "\n{} fields used the fallback font", self.font_fallbacks)?;
        }
        if self.empty_fields > 0 {
            write!(f, "\n{} empty fields left out", self.empty_fields)?;
        }
        Ok(())
    }
}

/// Build the batch from `config` and run it
pub fn run(config: &BatchConfig, dataset: Dataset, cancel: &CancelToken) -> Result<RunReport> {
    let batch = Batch::from_config(config, dataset)?;
    run_batch(&batch, &config.output, config.workers, cancel, None)
}

/// [`run`], reporting each finished record to `progress`
pub fn run_with_progress(
    config: &BatchConfig,
    dataset: Dataset,
    cancel: &CancelToken,
    progress: &Progress<'_>,
) -> Result<RunReport> {
    let batch = Batch::from_config(config, dataset)?;
    run_batch(&batch, &config.output, config.workers, cancel, Some(progress))
}

/// Generate every document of `batch` and package them
///
/// Cancellation at any point removes the documents written so far and any
/// partial archive.
pub fn run_batch(
    batch: &Batch,
    output: &OutputConfig,
    workers: Option<usize>,
    cancel: &CancelToken,
    progress: Option<&Progress<'_>>,
) -> Result<RunReport> {
    let area = WorkingArea::create(&output.work_dir)?;
    check_archive_outside(output)?;

    let mut generator = BatchGenerator::new(batch).with_cancel_token(cancel.clone());
    if let Some(workers) = workers {
        generator = generator.with_workers(workers);
    }
    if let Some(progress) = progress {
        generator = generator.with_progress(progress);
    }
    let outcome = generator.generate(&area)?;

    let packager = ArchivePackager::new(&output.archive).with_cancel_token(cancel.clone());
    let packaged = if cancel.is_cancelled() {
        Err(CertError::Cancelled)
    } else {
        packager.package(&outcome.documents, &area)
    };

    let archive = match packaged {
        Err(CertError::Cancelled) => {
            log::warn!("Batch cancelled before packaging completed");
            area.remove(&outcome.documents);
            return Err(CertError::Cancelled);
        }
        other => other?,
    };

    Ok(RunReport {
        archive,
        documents: outcome.documents.len(),
        skipped: outcome.skipped,
        font_fallbacks: outcome.font_fallbacks,
        empty_fields: outcome.empty_fields,
    })
}

/// The working area is cleared after packaging, so the archive must live elsewhere
fn check_archive_outside(output: &OutputConfig) -> Result<()> {
    let work_dir = std::fs::canonicalize(&output.work_dir)?;
    let archive_dir = match output.archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    // A missing archive directory is reported by the packager
    let Ok(archive_dir) = std::fs::canonicalize(&archive_dir) else {
        return Ok(());
    };

    if archive_dir.starts_with(&work_dir) {
        return Err(CertError::Configuration(format!(
            "archive {} must not be inside the working directory {}",
            output.archive.display(),
            output.work_dir.display()
        )));
    }

    Ok(())
}
