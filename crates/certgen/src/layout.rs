//! Page geometry derived from the template image

use crate::{CertError, Result};
use serde::{Deserialize, Serialize};

/// How the canvas is sized from the template image
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScaleMode {
    /// Canvas equals the image's pixel dimensions (1 px = 1 pt)
    #[default]
    ExactFit,
    /// Fixed page size; the image is stretched to fill it
    StandardPage,
}

/// Standard page sizes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Portrait (width, height) in points
    pub fn portrait_dimensions(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.2756, 841.8898),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    fn of(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Canvas geometry for one batch run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateDescriptor {
    /// Source image width in pixels
    pub image_width: u32,
    /// Source image height in pixels
    pub image_height: u32,
    /// Canvas width in points
    pub canvas_width: f64,
    /// Canvas height in points
    pub canvas_height: f64,
    pub orientation: Orientation,
    pub scale_mode: ScaleMode,
}

impl TemplateDescriptor {
    /// Rectangle the background image is drawn into, as (x, y, width, height)
    pub fn background_rect(&self) -> (f64, f64, f64, f64) {
        (0.0, 0.0, self.canvas_width, self.canvas_height)
    }
}

/// Derives a [`TemplateDescriptor`] under a fixed scale mode
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateLayout {
    mode: ScaleMode,
    page_size: PageSize,
}

impl TemplateLayout {
    pub fn new(mode: ScaleMode, page_size: PageSize) -> Self {
        Self { mode, page_size }
    }

    /// Compute the canvas for an image of `width` x `height` pixels
    pub fn describe(&self, width: u32, height: u32) -> Result<TemplateDescriptor> {
        if width == 0 || height == 0 {
            return Err(CertError::Template(format!(
                "template image has zero size ({width} x {height})"
            )));
        }

        let orientation = Orientation::of(width, height);
        let (canvas_width, canvas_height) = match self.mode {
            ScaleMode::ExactFit => (width as f64, height as f64),
            ScaleMode::StandardPage => {
                let (short, long) = self.page_size.portrait_dimensions();
                match orientation {
                    Orientation::Landscape => (long, short),
                    Orientation::Portrait => (short, long),
                }
            }
        };

        log::debug!(
            "Template {width}x{height} px -> canvas {canvas_width}x{canvas_height} pt ({:?}, {:?})",
            self.mode,
            orientation
        );

        Ok(TemplateDescriptor {
            image_width: width,
            image_height: height,
            canvas_width,
            canvas_height,
            orientation,
            scale_mode: self.mode,
        })
    }

    /// Compute the canvas from encoded JPEG or PNG bytes
    ///
    /// Only the image header is read.
    pub fn describe_image(&self, data: &[u8]) -> Result<TemplateDescriptor> {
        let dims = pdf_core::image_dimensions(data)
            .map_err(|e| CertError::Template(format!("unreadable template image: {e}")))?;
        self.describe(dims.width, dims.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_fit_uses_pixels() {
        let layout = TemplateLayout::new(ScaleMode::ExactFit, PageSize::A4);
        let desc = layout.describe(800, 600).unwrap();

        assert_eq!((desc.canvas_width, desc.canvas_height), (800.0, 600.0));
        assert_eq!(desc.orientation, Orientation::Landscape);
        assert_eq!(desc.background_rect(), (0.0, 0.0, 800.0, 600.0));
    }

    #[test]
    fn test_standard_page_landscape() {
        let layout = TemplateLayout::new(ScaleMode::StandardPage, PageSize::A4);
        let desc = layout.describe(3508, 2480).unwrap();

        assert_eq!(desc.orientation, Orientation::Landscape);
        assert_eq!((desc.canvas_width, desc.canvas_height), (841.8898, 595.2756));
    }

    #[test]
    fn test_standard_page_square_is_portrait() {
        let layout = TemplateLayout::new(ScaleMode::StandardPage, PageSize::Letter);
        let desc = layout.describe(1000, 1000).unwrap();

        assert_eq!(desc.orientation, Orientation::Portrait);
        assert_eq!((desc.canvas_width, desc.canvas_height), (612.0, 792.0));
    }

    #[test]
    fn test_zero_size_is_template_error() {
        let layout = TemplateLayout::default();
        assert!(matches!(layout.describe(0, 600), Err(CertError::Template(_))));
    }

    #[test]
    fn test_unreadable_image() {
        let layout = TemplateLayout::default();
        assert!(matches!(
            layout.describe_image(b"GIF89a"),
            Err(CertError::Template(_))
        ));
    }
}
