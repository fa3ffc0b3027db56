//! Certgen - Batch certificate rendering
//!
//! This crate provides:
//! - Font registration with a built-in Helvetica fallback
//! - Page geometry derived from a template image
//! - Greedy word wrap against font metrics
//! - One PDF per dataset row, rendered in parallel with per-row isolation
//! - ZIP packaging of the produced documents
//!
//! # Example
//!
//! ```ignore
//! use certgen::{pipeline, BatchConfig, CancelToken, Dataset};
//!
//! let config = BatchConfig::from_file("batch.json")?;
//! let dataset = Dataset::load("attendees.xlsx")?;
//! let report = pipeline::run(&config, dataset, &CancelToken::new())?;
//! println!("{} certificates in {}", report.documents, report.archive.display());
//! ```

pub mod archive;
pub mod batch;
pub mod config;
pub mod dataset;
pub mod fonts;
pub mod job;
pub mod layout;
pub mod naming;
pub mod pipeline;
pub mod render;
pub mod stages;

pub use archive::ArchivePackager;
pub use batch::{
    BatchGenerator, BatchOutcome, CancelToken, CertificateDocument, Progress, SkippedRecord,
    WorkingArea,
};
pub use config::{Align, BatchConfig, FieldConfig, FieldSpec, FontSpec, OutputConfig};
pub use dataset::{DataRecord, Dataset};
pub use fonts::FontRegistry;
pub use layout::{Orientation, PageSize, ScaleMode, TemplateDescriptor, TemplateLayout};
pub use pipeline::RunReport;
pub use render::{wrap_text, FieldOutcome, FieldRenderer, LINE_HEIGHT_FACTOR};
pub use stages::Batch;

use thiserror::Error;

/// Errors that can occur while generating certificates
#[derive(Debug, Error)]
pub enum CertError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to read dataset: {0}")]
    DataRead(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Batch cancelled")]
    Cancelled,

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, CertError>;
