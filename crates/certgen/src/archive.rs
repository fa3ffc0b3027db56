//! ZIP packaging of generated documents

use crate::batch::{CancelToken, CertificateDocument, WorkingArea};
use crate::{CertError, Result};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Bundles documents into one ZIP archive
///
/// The archive is built next to its destination with a `.partial` suffix and
/// renamed into place once complete, so a failed or cancelled run never
/// leaves a truncated archive at the destination.
pub struct ArchivePackager {
    archive: PathBuf,
    cancel: CancelToken,
}

impl ArchivePackager {
    pub fn new<P: Into<PathBuf>>(archive: P) -> Self {
        Self {
            archive: archive.into(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Temporary path the archive is written to
    pub fn partial_path(&self) -> PathBuf {
        let mut name = self.archive.as_os_str().to_owned();
        name.push(".partial");
        PathBuf::from(name)
    }

    /// Write `documents` (in order) into the archive, then clear `area`
    ///
    /// On failure the working area is left as it was.
    pub fn package(
        &self,
        documents: &[CertificateDocument],
        area: &WorkingArea,
    ) -> Result<PathBuf> {
        let partial = self.partial_path();

        let finished = self
            .write_entries(&partial, documents)
            .and_then(|()| {
                std::fs::rename(&partial, &self.archive)
                    .map_err(|e| archive_error(&self.archive, e))
            });

        if let Err(e) = finished {
            if let Err(remove_err) = std::fs::remove_file(&partial) {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove {}: {remove_err}", partial.display());
                }
            }
            return Err(e);
        }

        log::info!(
            "Packaged {} documents into {}",
            documents.len(),
            self.archive.display()
        );

        if let Err(e) = area.clear() {
            log::warn!(
                "Archive written but working area {} was not cleared: {e}",
                area.path().display()
            );
        }

        Ok(self.archive.clone())
    }

    fn write_entries(&self, path: &Path, documents: &[CertificateDocument]) -> Result<()> {
        let file = File::create(path).map_err(|e| archive_error(path, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for doc in documents {
            if self.cancel.is_cancelled() {
                return Err(CertError::Cancelled);
            }

            zip.start_file(doc.filename.as_str(), options)
                .map_err(|e| archive_error(path, e))?;
            let mut source = File::open(&doc.path).map_err(|e| archive_error(&doc.path, e))?;
            std::io::copy(&mut source, &mut zip).map_err(|e| archive_error(path, e))?;
        }

        let mut writer = zip.finish().map_err(|e| archive_error(path, e))?;
        writer.flush().map_err(|e| archive_error(path, e))?;

        Ok(())
    }
}

fn archive_error(path: &Path, e: impl Display) -> CertError {
    CertError::Archive(format!("{}: {e}", path.display()))
}
