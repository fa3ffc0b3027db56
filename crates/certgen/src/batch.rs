//! Per-record document generation

use crate::dataset::DataRecord;
use crate::job::{RenderJob, RenderedPage};
use crate::naming::{document_stem, NameAllocator};
use crate::stages::Batch;
use crate::{CertError, Result};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared flag for aborting a running batch
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callback, called with (finished, total) after each record
pub type Progress<'a> = dyn Fn(usize, usize) + Sync + 'a;

/// Scratch directory holding documents until they are archived
#[derive(Debug, Clone)]
pub struct WorkingArea {
    dir: PathBuf,
}

impl WorkingArea {
    /// Use `dir`, creating it if needed
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write a document into the area
    pub fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Delete specific documents, ignoring ones already gone
    pub fn remove(&self, documents: &[CertificateDocument]) {
        for doc in documents {
            if let Err(e) = std::fs::remove_file(&doc.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove {}: {e}", doc.path.display());
                }
            }
        }
    }

    /// Remove everything inside the area
    pub fn clear(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        log::debug!("Cleared working area {}", self.dir.display());
        Ok(())
    }
}

/// A document written to the working area
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateDocument {
    /// Row index of the source record
    pub index: usize,
    /// Filename inside the working area and the archive
    pub filename: String,
    pub path: PathBuf,
}

impl CertificateDocument {
    /// Read the document's bytes back from disk
    pub fn bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

/// A record that produced no document
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub index: usize,
    /// Identifying name (sanitized filename stem)
    pub name: String,
    pub reason: String,
}

/// Result of a batch run
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Documents in row order
    pub documents: Vec<CertificateDocument>,
    pub skipped: Vec<SkippedRecord>,
    /// Fields drawn with the default font instead of the requested one
    pub font_fallbacks: usize,
    /// Fields left out because their value was empty
    pub empty_fields: usize,
}

impl BatchOutcome {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

struct PlannedRecord<'a> {
    record: &'a DataRecord,
    stem: String,
    filename: String,
}

enum RecordResult {
    Written(CertificateDocument, RenderedPage),
    Failed(SkippedRecord),
    Cancelled,
}

/// Renders one document per dataset row
///
/// Records are rendered on a rayon pool; a failure or panic in one record
/// is logged and recorded as skipped without stopping the others.
pub struct BatchGenerator<'a> {
    batch: &'a Batch,
    workers: Option<usize>,
    cancel: CancelToken,
    progress: Option<&'a Progress<'a>>,
}

impl<'a> BatchGenerator<'a> {
    pub fn new(batch: &'a Batch) -> Self {
        Self {
            batch,
            workers: None,
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Limit the render pool to `workers` threads
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report each finished record, written or skipped
    ///
    /// The callback runs on the render threads.
    pub fn with_progress(mut self, progress: &'a Progress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Assign filenames in row order
    fn plan(&self) -> Vec<PlannedRecord<'a>> {
        let name_column = self.batch.fields().first().map(|f| f.column.as_str());
        let mut names = NameAllocator::new();

        self.batch
            .dataset()
            .records()
            .iter()
            .map(|record| {
                let value = name_column.and_then(|column| record.get(column));
                let stem = document_stem(value, record.index);
                let filename = names.allocate(&stem);
                PlannedRecord {
                    record,
                    stem,
                    filename,
                }
            })
            .collect()
    }

    fn process(&self, planned: &PlannedRecord<'_>, area: &WorkingArea) -> RecordResult {
        if self.cancel.is_cancelled() {
            return RecordResult::Cancelled;
        }

        let index = planned.record.index;
        let job = RenderJob {
            record: planned.record,
            fields: self.batch.fields(),
            template: self.batch.descriptor(),
            fonts: self.batch.fonts(),
            background: self.batch.background(),
        };

        let attempt = catch_unwind(AssertUnwindSafe(|| {
            let page = job.render()?;
            let path = area.write(&planned.filename, &page.bytes)?;
            Ok::<_, CertError>((path, page))
        }));

        let reason = match attempt {
            Ok(Ok((path, page))) => {
                log::debug!("Record {index}: wrote {}", planned.filename);
                let doc = CertificateDocument {
                    index,
                    filename: planned.filename.clone(),
                    path,
                };
                return RecordResult::Written(doc, page);
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("panic: {}", panic_message(panic.as_ref())),
        };

        log::error!("Record {index} ({}) skipped: {reason}", planned.stem);
        RecordResult::Failed(SkippedRecord {
            index,
            name: planned.stem.clone(),
            reason,
        })
    }

    /// Render every record into `area`
    ///
    /// Returns [`CertError::Cancelled`] after removing everything this run
    /// wrote if the cancel token fires before all records were started.
    pub fn generate(&self, area: &WorkingArea) -> Result<BatchOutcome> {
        let planned = self.plan();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.unwrap_or(0))
            .build()
            .map_err(|e| CertError::Configuration(format!("cannot start render pool: {e}")))?;

        log::info!(
            "Rendering {} records with {} threads",
            planned.len(),
            pool.current_num_threads()
        );

        let total = planned.len();
        let finished = AtomicUsize::new(0);

        let results: Vec<RecordResult> = pool.install(|| {
            planned
                .par_iter()
                .map(|p| {
                    let result = self.process(p, area);
                    if !matches!(result, RecordResult::Cancelled) {
                        let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                        if let Some(progress) = self.progress {
                            progress(done, total);
                        }
                    }
                    result
                })
                .collect()
        });

        let mut outcome = BatchOutcome::default();
        let mut cancelled = false;

        for result in results {
            match result {
                RecordResult::Written(doc, page) => {
                    outcome.font_fallbacks += page.fallbacks;
                    outcome.empty_fields += page.empty_fields;
                    outcome.documents.push(doc);
                }
                RecordResult::Failed(skipped) => outcome.skipped.push(skipped),
                RecordResult::Cancelled => cancelled = true,
            }
        }

        if cancelled {
            log::warn!(
                "Batch cancelled, removing {} written documents",
                outcome.documents.len()
            );
            area.remove(&outcome.documents);
            return Err(CertError::Cancelled);
        }

        log::info!(
            "Rendered {} documents, skipped {}",
            outcome.documents.len(),
            outcome.skipped_count()
        );

        Ok(outcome)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
