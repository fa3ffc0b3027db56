//! PDF Core - Single-page PDF assembly
//!
//! This crate provides functionality for:
//! - Creating a blank page of arbitrary size
//! - Embedding TrueType fonts, or using the built-in Helvetica
//! - Inserting text at specific coordinates
//! - Drawing a background image (JPEG, PNG)
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, Font, FontData, PdfDocument};
//!
//! let mut doc = PdfDocument::new(800.0, 600.0)?;
//! doc.insert_image(&std::fs::read("template.png")?, 0.0, 0.0, 800.0, 600.0)?;
//! doc.add_font("manrope", Font::from(FontData::from_ttf("manrope", &ttf)?))?;
//! doc.set_font("manrope", 14.0)?;
//! doc.insert_text("Hello, World!", 100.0, 500.0, Align::Left)?;
//! let bytes = doc.to_bytes()?;
//! ```

mod document;
mod font;
mod image;
mod text;

pub use document::{Color, PdfDocument};
pub use font::{Font, FontData, StandardFont};
pub use image::{image_dimensions, ImageDimensions, ImageXObject};
pub use text::{generate_text_operators, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page size: {0} x {1}")]
    InvalidPageSize(f64, f64),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_default() {
        assert_eq!(Align::default(), Align::Left);
    }

    #[test]
    fn test_error_display() {
        let err = PdfError::FontNotFound("manrope".to_string());
        assert_eq!(err.to_string(), "Font not found: manrope");

        let err = PdfError::InvalidPageSize(0.0, 600.0);
        assert_eq!(err.to_string(), "Invalid page size: 0 x 600");
    }
}
