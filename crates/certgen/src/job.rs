//! Rendering of a single record

use crate::config::FieldConfig;
use crate::dataset::DataRecord;
use crate::fonts::FontRegistry;
use crate::layout::TemplateDescriptor;
use crate::render::{FieldOutcome, FieldRenderer};
use crate::Result;
use pdf_core::{ImageXObject, PdfDocument};
use std::sync::Arc;

/// Everything needed to produce one document
pub struct RenderJob<'a> {
    pub record: &'a DataRecord,
    pub fields: &'a [FieldConfig],
    pub template: &'a TemplateDescriptor,
    pub fonts: &'a FontRegistry,
    /// Template image, prepared once per batch
    pub background: &'a Arc<ImageXObject>,
}

/// A rendered page and what happened to its fields
#[derive(Debug)]
pub struct RenderedPage {
    pub bytes: Vec<u8>,
    pub empty_fields: usize,
    pub fallbacks: usize,
}

impl RenderJob<'_> {
    /// Draw the background and every configured field
    pub fn render(&self) -> Result<RenderedPage> {
        let mut doc = PdfDocument::new(self.template.canvas_width, self.template.canvas_height)?;

        let (x, y, width, height) = self.template.background_rect();
        doc.insert_image_xobject(self.background, x, y, width, height);

        let renderer = FieldRenderer::new(self.fonts);
        let mut empty_fields = 0;
        let mut fallbacks = 0;

        for field in self.fields {
            match renderer.render(&mut doc, field, self.record.get(&field.column))? {
                FieldOutcome::SkippedEmpty => {
                    log::warn!(
                        "Record {}: field '{}' is empty, skipping",
                        self.record.index,
                        field.column
                    );
                    empty_fields += 1;
                }
                FieldOutcome::Drawn { fallback, .. } => {
                    if fallback {
                        fallbacks += 1;
                    }
                }
            }
        }

        Ok(RenderedPage {
            bytes: doc.to_bytes()?,
            empty_fields,
            fallbacks,
        })
    }
}
