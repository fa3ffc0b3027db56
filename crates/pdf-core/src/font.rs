//! Font handling for PDF documents

use crate::{PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;

/// A font usable for measuring and drawing text
///
/// Cloning is cheap: TrueType data is shared behind an `Arc`, so a font
/// loaded once can be handed to many documents on different threads.
#[derive(Debug, Clone)]
pub enum Font {
    /// Embedded TrueType/OpenType font
    TrueType(Arc<FontData>),
    /// One of the PDF standard fonts (never embedded)
    Standard(StandardFont),
}

impl Font {
    /// Font identifier
    pub fn name(&self) -> &str {
        match self {
            Font::TrueType(data) => &data.name,
            Font::Standard(font) => font.base_font_name(),
        }
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Font::TrueType(data) => data.text_width_points(text, font_size),
            Font::Standard(font) => font.text_width_points(text, font_size),
        }
    }

    /// Encode text as hex string for PDF Tj operator
    pub fn encode_text_hex(&self, text: &str) -> String {
        match self {
            Font::TrueType(data) => data.encode_text_hex(text),
            Font::Standard(font) => font.encode_text_hex(text),
        }
    }

    /// Whether the font program is embedded into the PDF
    pub fn is_embedded(&self) -> bool {
        matches!(self, Font::TrueType(_))
    }
}

impl From<FontData> for Font {
    fn from(data: FontData) -> Self {
        Font::TrueType(Arc::new(data))
    }
}

impl From<StandardFont> for Font {
    fn from(font: StandardFont) -> Self {
        Font::Standard(font)
    }
}

/// PDF standard fonts available without embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
}

/// Helvetica advance widths for WinAnsi codes 0x20..=0xFF (1/1000 em, Adobe AFM)
///
/// Codes WinAnsi leaves undefined carry 0 and are never produced by
/// [`winansi_code`].
const HELVETICA_WIDTHS: [u16; 224] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0, // 0x70
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, // 0x80
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667, // 0x90
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 0xF0
];

/// Byte drawn for characters without a WinAnsi code
const REPLACEMENT_CODE: u8 = b'?';

/// WinAnsi (Windows-1252) code of a printable character
///
/// Latin-1 maps directly except for 0x80..=0x9F, where WinAnsi places
/// typographic punctuation and a few extra letters.
fn winansi_code(c: char) -> Option<u8> {
    let code = c as u32;
    if (0x20..=0x7E).contains(&code) || (0xA0..=0xFF).contains(&code) {
        return Some(code as u8);
    }

    match code {
        0x20AC => Some(0x80), // €
        0x201A => Some(0x82), // ‚
        0x0192 => Some(0x83), // ƒ
        0x201E => Some(0x84), // „
        0x2026 => Some(0x85), // …
        0x2020 => Some(0x86), // †
        0x2021 => Some(0x87), // ‡
        0x02C6 => Some(0x88), // ˆ
        0x2030 => Some(0x89), // ‰
        0x0160 => Some(0x8A), // Š
        0x2039 => Some(0x8B), // ‹
        0x0152 => Some(0x8C), // Œ
        0x017D => Some(0x8E), // Ž
        0x2018 => Some(0x91), // ‘
        0x2019 => Some(0x92), // ’
        0x201C => Some(0x93), // “
        0x201D => Some(0x94), // ”
        0x2022 => Some(0x95), // •
        0x2013 => Some(0x96), // –
        0x2014 => Some(0x97), // —
        0x02DC => Some(0x98), // ˜
        0x2122 => Some(0x99), // ™
        0x0161 => Some(0x9A), // š
        0x203A => Some(0x9B), // ›
        0x0153 => Some(0x9C), // œ
        0x017E => Some(0x9E), // ž
        0x0178 => Some(0x9F), // Ÿ
        _ => None,
    }
}

impl StandardFont {
    /// PostScript name used as /BaseFont
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
        }
    }

    /// Byte drawn for `c`: its WinAnsi code or `?`
    fn code_for(c: char) -> u8 {
        winansi_code(c).unwrap_or(REPLACEMENT_CODE)
    }

    /// Advance width of a character in 1/1000 em
    ///
    /// Characters without a WinAnsi code measure as the `?` drawn in
    /// their place.
    pub fn char_width(&self, c: char) -> u16 {
        match self {
            StandardFont::Helvetica => HELVETICA_WIDTHS[(Self::code_for(c) - 0x20) as usize],
        }
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        (width as f32 / 1000.0) * font_size
    }

    /// Encode text as WinAnsi bytes in hex form
    ///
    /// Characters without a single-byte code are replaced by `?`.
    pub fn encode_text_hex(&self, text: &str) -> String {
        let hex: String = text
            .chars()
            .map(|c| format!("{:02X}", Self::code_for(c)))
            .collect();
        format!("<{hex}>")
    }

    /// Simple Type1 font dictionary
    pub fn to_pdf_dictionary(&self) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type1".into()),
            ("BaseFont", Object::Name(self.base_font_name().into())),
            ("Encoding", "WinAnsiEncoding".into()),
        ])
    }
}

/// TrueType font data
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw TTF data
    ttf_data: Vec<u8>,
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (compressed TTF data)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

impl FontData {
    /// Create font data from TTF bytes
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType font file bytes
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        ttf_parser::Face::parse(ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{name}: {e:?}")))?;

        Ok(Self {
            name: name.to_string(),
            ttf_data: ttf_data.to_vec(),
        })
    }

    /// Parse the face on demand; the data was validated in `from_ttf`
    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.ttf_data, 0).ok()
    }

    /// Get glyph ID for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face()
            .and_then(|face| face.glyph_index(c).map(|id| id.0))
    }

    /// Check if font has a glyph for the given character
    pub fn has_glyph(&self, c: char) -> bool {
        self.glyph_id(c).map(|id| id != 0).unwrap_or(false)
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face().map(|face| face.units_per_em()).unwrap_or(1000)
    }

    /// Get font ascender
    pub fn ascender(&self) -> i16 {
        self.face().map(|face| face.ascender()).unwrap_or(800)
    }

    /// Get font descender
    pub fn descender(&self) -> i16 {
        self.face().map(|face| face.descender()).unwrap_or(-200)
    }

    /// Calculate text width in font units
    pub fn text_width(&self, text: &str) -> u32 {
        let Some(face) = self.face() else {
            return 0;
        };
        text.chars()
            .filter_map(|c| {
                let glyph_id = face.glyph_index(c)?;
                face.glyph_hor_advance(glyph_id)
            })
            .map(|w| w as u32)
            .sum()
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width = self.text_width(text);
        let units_per_em = self.units_per_em() as f32;
        (width as f32 / units_per_em) * font_size
    }

    /// Encode text as hex string of glyph IDs (Identity-H)
    pub fn encode_text_hex(&self, text: &str) -> String {
        let face = self.face();
        let mut result = String::new();
        for c in text.chars() {
            let gid = face
                .as_ref()
                .and_then(|face| face.glyph_index(c))
                .map(|id| id.0)
                .unwrap_or(0);
            result.push_str(&format!("{gid:04X}"));
        }
        format!("<{result}>")
    }

    /// Generate all PDF objects needed to embed this font
    ///
    /// `used_chars` drives the /W widths array and the ToUnicode CMap.
    pub fn to_pdf_objects(&self, used_chars: &BTreeSet<char>) -> Result<FontObjects> {
        let font_name = Object::Name(pdf_safe_name(&self.name).into_bytes());

        let tounicode_content = self.generate_tounicode_cmap(used_chars);
        let tounicode_stream = Stream::new(Dictionary::new(), tounicode_content.into_bytes());

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.ttf_data)?;
        let compressed = encoder.finish()?;
        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![
                ("Length1", (self.ttf_data.len() as i64).into()),
                ("Filter", "FlateDecode".into()),
            ]),
            compressed,
        );

        let units_per_em = self.units_per_em() as f32;
        let scale = |v: i16| ((v as f32) * 1000.0 / units_per_em) as i64;
        let ascender = scale(self.ascender());
        let descender = scale(self.descender());

        // Simplified bounding box from vertical metrics
        let font_bbox = vec![0.into(), descender.into(), 1000.into(), ascender.into()];

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()), // Symbolic font
            ("FontBBox", font_bbox.into()),
            ("ItalicAngle", 0.into()),
            ("Ascent", ascender.into()),
            ("Descent", descender.into()),
            ("CapHeight", ascender.into()),
            ("StemV", 80.into()),
            ("FontFile2", Object::Reference((0, 0))), // Set when embedding
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("FontDescriptor", Object::Reference((0, 0))), // Set when embedding
            ("CIDToGIDMap", "Identity".into()),
            ("W", self.generate_widths_array(used_chars).into()),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
            ("DescendantFonts", vec![Object::Reference((0, 0))].into()), // Set when embedding
            ("ToUnicode", Object::Reference((0, 0))), // Set when embedding
        ]);

        Ok(FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        })
    }

    /// Generate /W array for glyph widths, scaled to 1000 units per em
    fn generate_widths_array(&self, used_chars: &BTreeSet<char>) -> Vec<Object> {
        let mut widths = Vec::new();
        let Some(face) = self.face() else {
            return widths;
        };
        let units_per_em = face.units_per_em() as f32;

        let mut gids: Vec<u16> = used_chars
            .iter()
            .filter_map(|&c| face.glyph_index(c).map(|id| id.0))
            .collect();
        gids.sort();
        gids.dedup();

        // Individual mapping format: [gid1 [width1] gid2 [width2] ...]
        for gid in gids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .unwrap_or(1000);
            let scaled = (advance as f32 * 1000.0 / units_per_em).round() as i64;
            widths.push((gid as i64).into());
            widths.push(vec![scaled.into()].into());
        }

        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self, used_chars: &BTreeSet<char>) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        let face = self.face();
        let chars: Vec<char> = used_chars.iter().copied().collect();

        // At most 100 entries per bfchar section
        for chunk in chars.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for c in chunk {
                let gid = face
                    .as_ref()
                    .and_then(|face| face.glyph_index(*c))
                    .map(|id| id.0)
                    .unwrap_or(0);
                let mut utf16 = [0u16; 2];
                let unicode: String = c
                    .encode_utf16(&mut utf16)
                    .iter()
                    .map(|unit| format!("{unit:04X}"))
                    .collect();
                cmap.push_str(&format!("<{gid:04X}> <{unicode}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }
}

/// Strip characters that are not allowed in a PDF name
fn pdf_safe_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}
