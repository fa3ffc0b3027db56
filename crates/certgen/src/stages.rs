//! Batch setup as a sequence of validated stages
//!
//! `TemplateLoaded -> DataLoaded -> ColumnsSelected -> FontsConfigured ->
//! PositionsSet -> Batch`. Each transition consumes the previous stage and
//! checks its own input, so a [`Batch`] is always fully configured.

use crate::config::{BatchConfig, FieldConfig, FieldSpec, FontSpec};
use crate::dataset::Dataset;
use crate::fonts::{FontRegistry, DEFAULT_FONT};
use crate::layout::{TemplateDescriptor, TemplateLayout};
use crate::{CertError, Result};
use pdf_core::ImageXObject;
use std::path::Path;
use std::sync::Arc;

/// A template image with its derived geometry
///
/// The image is decoded into a PDF XObject once here and shared by every
/// document of the batch.
pub struct TemplateLoaded {
    background: Arc<ImageXObject>,
    descriptor: TemplateDescriptor,
}

impl TemplateLoaded {
    /// Read a template image from disk
    pub fn from_file<P: AsRef<Path>>(path: P, layout: TemplateLayout) -> Result<Self> {
        let path = path.as_ref();
        let background = std::fs::read(path)
            .map_err(|e| CertError::Template(format!("{}: {e}", path.display())))?;
        Self::from_bytes(background, layout)
    }

    /// Use an encoded JPEG or PNG held in memory
    pub fn from_bytes(background: Vec<u8>, layout: TemplateLayout) -> Result<Self> {
        let descriptor = layout.describe_image(&background)?;
        let xobject = ImageXObject::from_bytes(&background)
            .map_err(|e| CertError::Template(format!("cannot decode template image: {e}")))?;
        Ok(Self {
            background: Arc::new(xobject),
            descriptor,
        })
    }

    pub fn descriptor(&self) -> &TemplateDescriptor {
        &self.descriptor
    }

    pub fn with_dataset(self, dataset: Dataset) -> DataLoaded {
        if dataset.is_empty() {
            log::warn!("Dataset has no records");
        }
        DataLoaded {
            template: self,
            dataset,
        }
    }
}

pub struct DataLoaded {
    template: TemplateLoaded,
    dataset: Dataset,
}

impl DataLoaded {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Choose the columns to print
    ///
    /// The list must be non-empty, free of duplicates and name only columns
    /// present in the dataset.
    pub fn select_columns<S: AsRef<str>>(self, columns: &[S]) -> Result<ColumnsSelected> {
        if columns.is_empty() {
            return Err(CertError::Configuration(
                "no columns selected".to_string(),
            ));
        }

        let mut selected: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            if !self.dataset.has_column(column) {
                return Err(CertError::Configuration(format!(
                    "column '{column}' not found in dataset (available: {})",
                    self.dataset.columns().join(", ")
                )));
            }
            if selected.iter().any(|c| c.as_str() == column) {
                return Err(CertError::Configuration(format!(
                    "column '{column}' selected twice"
                )));
            }
            selected.push(column.to_string());
        }

        Ok(ColumnsSelected {
            template: self.template,
            dataset: self.dataset,
            columns: selected,
        })
    }
}

pub struct ColumnsSelected {
    template: TemplateLoaded,
    dataset: Dataset,
    columns: Vec<String>,
}

impl ColumnsSelected {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn with_fonts(self, fonts: FontRegistry) -> FontsConfigured {
        FontsConfigured {
            template: self.template,
            dataset: self.dataset,
            columns: self.columns,
            fonts,
        }
    }

    /// Load fonts from specs; failures are logged and fall back at render time
    pub fn with_font_specs(self, specs: &[FontSpec]) -> FontsConfigured {
        self.with_fonts(FontRegistry::from_specs(specs))
    }
}

pub struct FontsConfigured {
    template: TemplateLoaded,
    dataset: Dataset,
    columns: Vec<String>,
    fonts: FontRegistry,
}

impl FontsConfigured {
    /// Validate per-field settings, one for each selected column
    ///
    /// Fields are kept in column selection order.
    pub fn set_positions(self, specs: &[FieldSpec]) -> Result<PositionsSet> {
        let mut fields = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            let mut matching = specs
                .iter()
                .filter(|spec| spec.column.trim() == column.as_str());
            let spec = matching.next().ok_or_else(|| {
                CertError::Configuration(format!("no field settings for column '{column}'"))
            })?;
            if matching.next().is_some() {
                return Err(CertError::Configuration(format!(
                    "column '{column}' has more than one field setting"
                )));
            }
            fields.push(FieldConfig::from_spec(spec)?);
        }

        if let Some(extra) = specs
            .iter()
            .find(|spec| !self.columns.iter().any(|c| c.as_str() == spec.column.trim()))
        {
            return Err(CertError::Configuration(format!(
                "field settings for unselected column '{}'",
                extra.column
            )));
        }

        for field in &fields {
            if !self.fonts.contains(&field.font)
                && !field.font.eq_ignore_ascii_case(DEFAULT_FONT.base_font_name())
            {
                log::warn!(
                    "Field '{}' uses unregistered font '{}', {} will be used",
                    field.column,
                    field.font,
                    DEFAULT_FONT.base_font_name()
                );
            }
        }

        Ok(PositionsSet {
            template: self.template,
            dataset: self.dataset,
            fields,
            fonts: self.fonts,
        })
    }
}

pub struct PositionsSet {
    template: TemplateLoaded,
    dataset: Dataset,
    fields: Vec<FieldConfig>,
    fonts: FontRegistry,
}

impl PositionsSet {
    pub fn finish(self) -> Batch {
        Batch {
            background: self.template.background,
            descriptor: self.template.descriptor,
            dataset: self.dataset,
            fields: self.fields,
            fonts: self.fonts,
        }
    }
}

/// A fully configured batch, ready for generation
pub struct Batch {
    background: Arc<ImageXObject>,
    descriptor: TemplateDescriptor,
    dataset: Dataset,
    fields: Vec<FieldConfig>,
    fonts: FontRegistry,
}

impl Batch {
    /// Run every stage from a batch configuration
    pub fn from_config(config: &BatchConfig, dataset: Dataset) -> Result<Self> {
        let layout = TemplateLayout::new(config.template.scale_mode, config.template.page_size);
        let columns: Vec<&str> = config.fields.iter().map(|f| f.column.trim()).collect();

        Ok(TemplateLoaded::from_file(&config.template.source, layout)?
            .with_dataset(dataset)
            .select_columns(columns.as_slice())?
            .with_font_specs(&config.fonts)
            .set_positions(&config.fields)?
            .finish())
    }

    pub fn background(&self) -> &Arc<ImageXObject> {
        &self.background
    }

    pub fn descriptor(&self) -> &TemplateDescriptor {
        &self.descriptor
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Align, Position};
    use crate::layout::ScaleMode;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn template() -> TemplateLoaded {
        let img = ImageBuffer::from_pixel(800, 600, Rgb([255u8, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        TemplateLoaded::from_bytes(bytes, TemplateLayout::default()).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::from_rows(
            vec!["Name".to_string(), "Course".to_string()],
            vec![vec!["Ana Maria".to_string(), "Rust".to_string()]],
        )
    }

    fn spec(column: &str) -> FieldSpec {
        FieldSpec {
            column: column.to_string(),
            font: "Helvetica".to_string(),
            size: 14.0,
            color: "#000000".to_string(),
            position: Position { x: 100.0, y: 500.0 },
            max_width: 300.0,
            align: Align::Left,
        }
    }

    #[test]
    fn test_full_sequence() {
        let batch = template()
            .with_dataset(dataset())
            .select_columns(&["Course", "Name"])
            .unwrap()
            .with_fonts(FontRegistry::new())
            .set_positions(&[spec("Name"), spec("Course")])
            .unwrap()
            .finish();

        let columns: Vec<&str> = batch.fields().iter().map(|f| f.column.as_str()).collect();
        assert_eq!(columns, vec!["Course", "Name"]);
        assert_eq!(batch.descriptor().scale_mode, ScaleMode::ExactFit);
        assert_eq!(batch.dataset().len(), 1);
        assert_eq!(batch.background().width, 800);
        assert_eq!(batch.background().height, 600);
        assert_eq!(batch.background().filter, "FlateDecode");
    }

    #[test]
    fn test_unknown_column_rejected() {
        let result = template()
            .with_dataset(dataset())
            .select_columns(&["Email"]);
        assert!(matches!(result, Err(CertError::Configuration(_))));
    }

    #[test]
    fn test_empty_selection_rejected() {
        let result = template()
            .with_dataset(dataset())
            .select_columns::<&str>(&[]);
        assert!(matches!(result, Err(CertError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_selection_rejected() {
        let result = template()
            .with_dataset(dataset())
            .select_columns(&["Name", "Name"]);
        assert!(matches!(result, Err(CertError::Configuration(_))));
    }

    #[test]
    fn test_missing_field_settings_rejected() {
        let result = template()
            .with_dataset(dataset())
            .select_columns(&["Name", "Course"])
            .unwrap()
            .with_fonts(FontRegistry::new())
            .set_positions(&[spec("Name")]);
        assert!(matches!(result, Err(CertError::Configuration(_))));
    }

    #[test]
    fn test_invalid_field_settings_rejected() {
        let bad = FieldSpec {
            color: "#12345".to_string(),
            ..spec("Name")
        };
        let result = template()
            .with_dataset(dataset())
            .select_columns(&["Name"])
            .unwrap()
            .with_fonts(FontRegistry::new())
            .set_positions(&[bad]);
        assert!(matches!(result, Err(CertError::Configuration(_))));
    }

    #[test]
    fn test_missing_template_file() {
        let result = TemplateLoaded::from_file("/nonexistent/template.png", TemplateLayout::default());
        assert!(matches!(result, Err(CertError::Template(_))));
    }
}
