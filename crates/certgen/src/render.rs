//! Field rendering with greedy word wrap

use crate::config::FieldConfig;
use crate::fonts::FontRegistry;
use crate::Result;
use pdf_core::{Font, PdfDocument};

/// Line advance as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Wrap text greedily so each line stays under `max_width`
///
/// Words are whitespace-delimited. A word is appended to the current line
/// while the joined line measures strictly less than `max_width`; otherwise
/// the current line is committed and the word starts a new one. A single
/// word wider than `max_width` is kept whole on its own line.
///
/// # Example
/// ```ignore
/// let lines = wrap_text("Ana Maria", &font, 14.0, 300.0);
/// assert_eq!(lines, vec!["Ana Maria"]);
/// ```
pub fn wrap_text(text: &str, font: &Font, font_size: f32, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let trial = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if (font.text_width_points(&trial, font_size) as f64) < max_width {
            current = trial;
        } else {
            if !current.is_empty() {
                lines.push(current);
            }
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Baseline origin of each wrapped line
///
/// Line `i` sits at `(x, y - i * 1.2 * size)`.
pub fn line_origins(field: &FieldConfig, count: usize) -> Vec<(f64, f64)> {
    let leading = LINE_HEIGHT_FACTOR * field.size as f64;
    (0..count)
        .map(|i| (field.position.x, field.position.y - i as f64 * leading))
        .collect()
}

/// What happened to one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Text was drawn on `lines` lines
    Drawn { lines: usize, fallback: bool },
    /// Value was absent or blank; nothing drawn
    SkippedEmpty,
}

/// Draws configured fields onto a page
pub struct FieldRenderer<'a> {
    fonts: &'a FontRegistry,
}

impl<'a> FieldRenderer<'a> {
    pub fn new(fonts: &'a FontRegistry) -> Self {
        Self { fonts }
    }

    /// Draw `value` for `field` onto `doc`
    pub fn render(
        &self,
        doc: &mut PdfDocument,
        field: &FieldConfig,
        value: Option<&str>,
    ) -> Result<FieldOutcome> {
        let value = value.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Ok(FieldOutcome::SkippedEmpty);
        }

        let resolved = self.fonts.resolve(&field.font);
        let font_key = resolved.font.name().to_string();
        if !doc.has_font(&font_key) {
            doc.add_font(&font_key, resolved.font.clone())?;
        }

        doc.set_font(&font_key, field.size)?;
        doc.set_text_color(field.color);

        let lines = wrap_text(value, resolved.font, field.size, field.max_width);
        for (line, (x, y)) in lines.iter().zip(line_origins(field, lines.len())) {
            doc.insert_text(line, x, y, field.align.into())?;
        }

        Ok(FieldOutcome::Drawn {
            lines: lines.len(),
            fallback: resolved.fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Align, Position};
    use pdf_core::{Color, StandardFont};
    use pretty_assertions::assert_eq;

    fn helvetica() -> Font {
        Font::from(StandardFont::Helvetica)
    }

    fn field(font: &str, size: f32, max_width: f64) -> FieldConfig {
        FieldConfig {
            column: "Name".to_string(),
            font: font.to_string(),
            size,
            color: Color::black(),
            position: Position { x: 100.0, y: 500.0 },
            max_width,
            align: Align::Left,
        }
    }

    #[test]
    fn test_short_name_single_line() {
        let lines = wrap_text("Ana Maria", &helvetica(), 14.0, 300.0);
        assert_eq!(lines, vec!["Ana Maria"]);
    }

    #[test]
    fn test_oversized_word_kept_whole() {
        let word = "Supercalifragilisticexpialidocious";
        let lines = wrap_text(word, &helvetica(), 14.0, 50.0);
        assert_eq!(lines, vec![word]);
    }

    #[test]
    fn test_oversized_word_between_others() {
        let lines = wrap_text("a Supercalifragilisticexpialidocious b", &helvetica(), 14.0, 50.0);
        assert_eq!(lines, vec!["a", "Supercalifragilisticexpialidocious", "b"]);
    }

    #[test]
    fn test_wide_latin_capitals_respect_max_width() {
        // Æ is a full em wide: "ÆÆÆ ÆÆÆ" measures 62.78pt at size 10
        let font = helvetica();
        let lines = wrap_text("ÆÆÆ ÆÆÆ", &font, 10.0, 50.0);
        assert_eq!(lines, vec!["ÆÆÆ", "ÆÆÆ"]);
        for line in &lines {
            assert!((font.text_width_points(line, 10.0) as f64) < 50.0);
        }
    }

    #[test]
    fn test_exact_width_wraps() {
        let font = helvetica();
        let full = font.text_width_points("Hello world", 12.0) as f64;

        assert_eq!(wrap_text("Hello world", &font, 12.0, full), vec!["Hello", "world"]);
        assert_eq!(
            wrap_text("Hello world", &font, 12.0, full + 0.01),
            vec!["Hello world"]
        );
    }

    #[test]
    fn test_multi_word_lines_stay_under_width() {
        let font = helvetica();
        let text = "The quick brown fox jumps over the lazy dog while the \
                    committee awards an honorary certificate of participation";

        for max_width in [40.0, 75.5, 120.0, 200.0] {
            let lines = wrap_text(text, &font, 11.0, max_width);
            for line in &lines {
                if line.contains(' ') {
                    assert!((font.text_width_points(line, 11.0) as f64) < max_width);
                }
            }
            assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
        }
    }

    #[test]
    fn test_wrap_is_deterministic() {
        let font = helvetica();
        let text = "Certificate of Completion for Advanced Rust Programming";
        assert_eq!(
            wrap_text(text, &font, 18.0, 150.0),
            wrap_text(text, &font, 18.0, 150.0)
        );
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let lines = wrap_text("  Ana \t Maria \n", &helvetica(), 14.0, 300.0);
        assert_eq!(lines, vec!["Ana Maria"]);
        assert!(wrap_text("   ", &helvetica(), 14.0, 300.0).is_empty());
    }

    #[test]
    fn test_line_origins_use_leading() {
        let origins = line_origins(&field("Helvetica", 10.0, 100.0), 3);
        assert_eq!(origins[0], (100.0, 500.0));
        assert_eq!(origins[1], (100.0, 488.0));
        assert_eq!(origins[2], (100.0, 476.0));
    }

    #[test]
    fn test_render_skips_empty_value() {
        let registry = FontRegistry::new();
        let renderer = FieldRenderer::new(&registry);
        let mut doc = PdfDocument::new(800.0, 600.0).unwrap();
        let field = field("Helvetica", 14.0, 300.0);

        assert_eq!(
            renderer.render(&mut doc, &field, None).unwrap(),
            FieldOutcome::SkippedEmpty
        );
        assert_eq!(
            renderer.render(&mut doc, &field, Some("  ")).unwrap(),
            FieldOutcome::SkippedEmpty
        );
        assert!(!doc.has_font("Helvetica"));
    }

    #[test]
    fn test_render_with_unknown_font_falls_back() {
        let registry = FontRegistry::new();
        let renderer = FieldRenderer::new(&registry);
        let mut doc = PdfDocument::new(800.0, 600.0).unwrap();

        let outcome = renderer
            .render(&mut doc, &field("Missing Serif", 14.0, 300.0), Some("Ana Maria"))
            .unwrap();

        assert_eq!(
            outcome,
            FieldOutcome::Drawn {
                lines: 1,
                fallback: true
            }
        );
        assert!(doc.has_font("Helvetica"));
        assert_eq!(registry.fallback_count(), 1);
    }

    #[test]
    fn test_render_two_fields_share_font() {
        let registry = FontRegistry::new();
        let renderer = FieldRenderer::new(&registry);
        let mut doc = PdfDocument::new(800.0, 600.0).unwrap();

        renderer
            .render(&mut doc, &field("Helvetica", 14.0, 300.0), Some("Ana"))
            .unwrap();
        let outcome = renderer
            .render(&mut doc, &field("Helvetica", 10.0, 30.0), Some("Rust Workshop 2024"))
            .unwrap();

        assert!(matches!(outcome, FieldOutcome::Drawn { lines: 3, .. }));
    }
}
