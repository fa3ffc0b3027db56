//! Batch configuration types

use crate::layout::{PageSize, ScaleMode};
use crate::{CertError, Result};
use pdf_core::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root batch configuration
///
/// ```json
/// {
///   "template": { "source": "template.png", "scaleMode": "exactFit" },
///   "fonts": [{ "name": "manrope", "source": "fonts/Manrope.ttf" }],
///   "fields": [{
///     "column": "Name", "font": "manrope", "size": 14, "color": "#1A2B3C",
///     "position": { "x": 100, "y": 500 }, "maxWidth": 300
///   }],
///   "output": { "workDir": "output", "archive": "certificates.zip" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Template image configuration
    pub template: TemplateConfig,

    /// Font resources
    #[serde(default)]
    pub fonts: Vec<FontSpec>,

    /// Fields to draw, in order; the first one names the output file
    pub fields: Vec<FieldSpec>,

    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,

    /// Render thread count (defaults to available parallelism)
    #[serde(default)]
    pub workers: Option<usize>,
}

impl BatchConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CertError::Configuration(e.to_string()))
    }

    /// Read and parse a configuration file
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CertError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_json(&json)?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }

        Ok(config)
    }

    /// Make every relative path absolute against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        rebase(&mut self.template.source);
        for font in &mut self.fonts {
            rebase(&mut font.source);
        }
        rebase(&mut self.output.work_dir);
        rebase(&mut self.output.archive);
    }
}

/// Template image source and geometry mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Path to a JPEG or PNG file
    pub source: PathBuf,

    #[serde(rename = "scaleMode")]
    #[serde(default)]
    pub scale_mode: ScaleMode,

    /// Page size under `standardPage`
    #[serde(rename = "pageSize")]
    #[serde(default)]
    pub page_size: PageSize,
}

/// A named font file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontSpec {
    /// Name referenced by fields
    pub name: String,

    /// Path to a TTF/OTF file
    pub source: PathBuf,
}

/// Position in PDF coordinates (origin at the bottom-left corner)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Text alignment relative to the field position
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl From<Align> for pdf_core::Align {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => pdf_core::Align::Left,
            Align::Center => pdf_core::Align::Center,
            Align::Right => pdf_core::Align::Right,
        }
    }
}

fn default_font() -> String {
    "Helvetica".to_string()
}

fn default_color() -> String {
    "#000000".to_string()
}

/// Unvalidated field settings as written in the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Dataset column to draw
    pub column: String,

    /// Registered font name
    #[serde(default = "default_font")]
    pub font: String,

    /// Font size in points
    pub size: f32,

    /// Fill color as `#RRGGBB`
    #[serde(default = "default_color")]
    pub color: String,

    pub position: Position,

    /// Maximum rendered line width
    #[serde(rename = "maxWidth")]
    pub max_width: f64,

    #[serde(default)]
    pub align: Align,
}

/// Validated per-field typography and placement
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    pub column: String,
    pub font: String,
    pub size: f32,
    pub color: Color,
    pub position: Position,
    pub max_width: f64,
    pub align: Align,
}

impl FieldConfig {
    /// Validate a field spec
    ///
    /// Rejects a non-positive size or width, a malformed color and a
    /// non-finite position.
    pub fn from_spec(spec: &FieldSpec) -> Result<Self> {
        let column = spec.column.trim();
        if column.is_empty() {
            return Err(CertError::Configuration(
                "field column name is empty".to_string(),
            ));
        }

        if !(spec.size.is_finite() && spec.size > 0.0) {
            return Err(CertError::Configuration(format!(
                "font size for '{column}' must be positive, got {}",
                spec.size
            )));
        }

        if !(spec.max_width.is_finite() && spec.max_width > 0.0) {
            return Err(CertError::Configuration(format!(
                "max width for '{column}' must be positive, got {}",
                spec.max_width
            )));
        }

        if !(spec.position.x.is_finite() && spec.position.y.is_finite()) {
            return Err(CertError::Configuration(format!(
                "position for '{column}' is not a finite coordinate"
            )));
        }

        let color = Color::from_hex(spec.color.trim()).ok_or_else(|| {
            CertError::Configuration(format!(
                "malformed color '{}' for '{column}', expected #RRGGBB",
                spec.color
            ))
        })?;

        Ok(Self {
            column: column.to_string(),
            font: spec.font.clone(),
            size: spec.size,
            color,
            position: spec.position,
            max_width: spec.max_width,
            align: spec.align,
        })
    }
}

/// Where documents and the archive are written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Scratch directory for per-record documents
    #[serde(rename = "workDir")]
    #[serde(default = "OutputConfig::default_work_dir")]
    pub work_dir: PathBuf,

    /// Final archive path
    #[serde(default = "OutputConfig::default_archive")]
    pub archive: PathBuf,
}

impl OutputConfig {
    fn default_work_dir() -> PathBuf {
        PathBuf::from("output")
    }

    fn default_archive() -> PathBuf {
        PathBuf::from("certificates.zip")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: Self::default_work_dir(),
            archive: Self::default_archive(),
        }
    }
}
