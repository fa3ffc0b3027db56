//! PDF Document builder

use crate::font::Font;
use crate::image::{generate_image_operators, ImageXObject};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::{Align, PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Parse a `#RRGGBB` hex string
    ///
    /// Returns `None` unless the input is `#` followed by exactly six hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// White color
    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Single-page PDF document builder
///
/// Coordinates are PDF user space: the origin is the bottom-left corner of
/// the page and y grows upward. Content is accumulated in memory and the
/// lopdf object graph is only assembled by [`PdfDocument::to_bytes`].
pub struct PdfDocument {
    /// Page width in points
    width: f64,
    /// Page height in points
    height: f64,
    /// Fonts available to this document
    fonts: HashMap<String, Font>,
    /// Characters drawn per font (drives /W and ToUnicode)
    used_chars: HashMap<String, BTreeSet<char>>,
    /// Font resources (font name -> resource name)
    font_resources: BTreeMap<String, String>,
    /// Next font resource number
    next_font_resource: u32,
    /// Image XObjects in resource order (resource name, image)
    images: Vec<(String, Arc<ImageXObject>)>,
    /// Embedded images (data hash -> resource name)
    embedded_images: HashMap<u64, String>,
    /// Current font name
    current_font: Option<String>,
    /// Current font size
    current_font_size: f32,
    /// Current text color
    current_text_color: Color,
    /// Page content operators
    content: Vec<u8>,
}

impl PdfDocument {
    /// Create a document with one blank page
    ///
    /// # Arguments
    /// * `width` - Page width in points
    /// * `height` - Page height in points
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(PdfError::InvalidPageSize(width, height));
        }

        Ok(Self {
            width,
            height,
            fonts: HashMap::new(),
            used_chars: HashMap::new(),
            font_resources: BTreeMap::new(),
            next_font_resource: 1,
            images: Vec::new(),
            embedded_images: HashMap::new(),
            current_font: None,
            current_font_size: 12.0,
            current_text_color: Color::default(),
            content: Vec::new(),
        })
    }

    /// Make a font available under `name`
    pub fn add_font(&mut self, name: &str, font: Font) -> Result<()> {
        if self.fonts.contains_key(name) {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }
        self.fonts.insert(name.to_string(), font);
        Ok(())
    }

    /// Check whether a font was added under `name`
    pub fn has_font(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    /// Set the current font and size
    ///
    /// # Example
    /// ```ignore
    /// doc.add_font("helvetica", Font::from(StandardFont::Helvetica))?;
    /// doc.set_font("helvetica", 12.0)?;
    /// ```
    pub fn set_font(&mut self, name: &str, size: f32) -> Result<()> {
        if !self.fonts.contains_key(name) {
            return Err(PdfError::FontNotFound(name.to_string()));
        }

        self.current_font = Some(name.to_string());
        self.current_font_size = size;

        Ok(())
    }

    /// Set the text color
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    fn current_font(&self) -> Result<(&str, &Font)> {
        let name = self
            .current_font
            .as_deref()
            .ok_or_else(|| PdfError::FontNotFound("No font set".to_string()))?;
        let font = self
            .fonts
            .get(name)
            .ok_or_else(|| PdfError::FontNotFound(name.to_string()))?;
        Ok((name, font))
    }

    /// Get current font's text width for a string, in points
    pub fn get_text_width(&self, text: &str) -> Result<f64> {
        let (_, font) = self.current_font()?;
        Ok(font.text_width_points(text, self.current_font_size) as f64)
    }

    /// Insert text at a specific position
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `x` - X coordinate in points
    /// * `y` - Baseline Y coordinate in points (from bottom)
    /// * `align` - Text alignment relative to `x`
    pub fn insert_text(&mut self, text: &str, x: f64, y: f64, align: Align) -> Result<()> {
        // Nothing to render
        if text.is_empty() {
            return Ok(());
        }

        let (font_name, font) = self.current_font()?;
        let font_name = font_name.to_string();
        let text_hex = font.encode_text_hex(text);
        let text_width = font.text_width_points(text, self.current_font_size) as f64;

        self.used_chars
            .entry(font_name.clone())
            .or_default()
            .extend(text.chars());

        let ctx = TextRenderContext {
            font_name: self.get_or_create_font_ref(&font_name),
            font_size: self.current_font_size,
            text_width,
            color: self.current_text_color,
        };

        let operators = generate_text_operators(&text_hex, x, y, align, &ctx);
        self.content.extend_from_slice(&operators);

        Ok(())
    }

    /// Get or create the resource name (e.g., "F1") for a font
    fn get_or_create_font_ref(&mut self, font_name: &str) -> String {
        if let Some(resource_name) = self.font_resources.get(font_name) {
            return resource_name.clone();
        }

        let resource_name = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;
        self.font_resources
            .insert(font_name.to_string(), resource_name.clone());
        resource_name
    }

    /// Draw an image stretched to the given rectangle
    ///
    /// # Arguments
    /// * `data` - Image file bytes (JPEG or PNG)
    /// * `x` - X coordinate of the lower-left corner in points
    /// * `y` - Y coordinate of the lower-left corner in points
    /// * `width` - Drawn width in points
    /// * `height` - Drawn height in points
    pub fn insert_image(
        &mut self,
        data: &[u8],
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let image_resource_name = self.get_or_create_image_ref(data)?;
        let operators = generate_image_operators(&image_resource_name, x, y, width, height);
        self.content.extend_from_slice(&operators);
        Ok(())
    }

    /// Draw an already prepared image stretched to the given rectangle
    ///
    /// The same `Arc` drawn twice is embedded once. Preparing the XObject
    /// up front lets many documents share one decoded image.
    pub fn insert_image_xobject(
        &mut self,
        image: &Arc<ImageXObject>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) {
        let image_resource_name = self.get_or_create_xobject_ref(image);
        let operators = generate_image_operators(&image_resource_name, x, y, width, height);
        self.content.extend_from_slice(&operators);
    }

    /// Get or create an image resource, deduplicated by a hash of its data
    fn get_or_create_image_ref(&mut self, data: &[u8]) -> Result<String> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let data_hash = hasher.finish();

        if let Some(resource_name) = self.embedded_images.get(&data_hash) {
            return Ok(resource_name.clone());
        }

        let xobject = ImageXObject::from_bytes(data)
            .map_err(|e| PdfError::ImageError(format!("Failed to create image XObject: {e}")))?;

        let resource_name = self.push_image(Arc::new(xobject));
        self.embedded_images.insert(data_hash, resource_name.clone());

        Ok(resource_name)
    }

    fn get_or_create_xobject_ref(&mut self, image: &Arc<ImageXObject>) -> String {
        if let Some((resource_name, _)) = self
            .images
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, image))
        {
            return resource_name.clone();
        }
        self.push_image(Arc::clone(image))
    }

    fn push_image(&mut self, image: Arc<ImageXObject>) -> String {
        let resource_name = format!("Im{}", self.images.len() + 1);
        self.images.push((resource_name.clone(), image));
        resource_name
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Assemble the PDF and serialize it to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font_dict = Dictionary::new();
        for (font_name, resource_name) in &self.font_resources {
            let font = self
                .fonts
                .get(font_name)
                .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
            let font_id = match font {
                Font::Standard(standard) => doc.add_object(standard.to_pdf_dictionary()),
                Font::TrueType(data) => {
                    let empty = BTreeSet::new();
                    let used = self.used_chars.get(font_name).unwrap_or(&empty);
                    embed_true_type(&mut doc, data, used)?
                }
            };
            font_dict.set(resource_name.as_bytes().to_vec(), Object::Reference(font_id));
        }

        let mut xobject_dict = Dictionary::new();
        for (resource_name, xobject) in &self.images {
            let image_id = doc.add_object(xobject.to_pdf_stream());
            xobject_dict.set(resource_name.as_bytes().to_vec(), Object::Reference(image_id));
        }

        let mut resources = Dictionary::new();
        resources.set("Font", font_dict);
        resources.set("XObject", xobject_dict);

        let content_id = doc.add_object(compressed_stream(&self.content)?);

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", "Page".into()),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                vec![
                    0.into(),
                    0.into(),
                    (self.width as f32).into(),
                    (self.height as f32).into(),
                ]
                .into(),
            ),
            ("Resources", resources.into()),
            ("Contents", Object::Reference(content_id)),
        ]));

        let pages = Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Kids", vec![Object::Reference(page_id)].into()),
            ("Count", 1.into()),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        log::debug!(
            "Assembled {}x{} page: {} fonts, {} images, {} bytes",
            self.width,
            self.height,
            self.font_resources.len(),
            self.images.len(),
            buffer.len()
        );

        Ok(buffer)
    }
}

/// Embed a TrueType font and return the Type0 font object ID
fn embed_true_type(
    doc: &mut Document,
    data: &crate::font::FontData,
    used_chars: &BTreeSet<char>,
) -> Result<ObjectId> {
    let font_objects = data.to_pdf_objects(used_chars)?;

    let font_file_id = doc.add_object(font_objects.font_file_stream.with_compression(false));

    let mut font_descriptor = font_objects.font_descriptor;
    font_descriptor.set("FontFile2", Object::Reference(font_file_id));
    let font_descriptor_id = doc.add_object(font_descriptor);

    let mut cid_font = font_objects.cid_font;
    cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
    let cid_font_id = doc.add_object(cid_font);

    let tounicode_id = doc.add_object(font_objects.tounicode_stream);

    let mut type0_font = font_objects.type0_font;
    type0_font.set(
        "DescendantFonts",
        Object::Array(vec![Object::Reference(cid_font_id)]),
    );
    type0_font.set("ToUnicode", Object::Reference(tounicode_id));

    Ok(doc.add_object(type0_font))
}

/// Flate-compress a content stream
fn compressed_stream(content: &[u8]) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    let compressed = encoder.finish()?;

    let dict = Dictionary::from_iter(vec![("Filter", Object::from("FlateDecode"))]);
    Ok(Stream::new(dict, compressed).with_compression(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::StandardFont;
    use pretty_assertions::assert_eq;

    fn helvetica_doc() -> PdfDocument {
        let mut doc = PdfDocument::new(800.0, 600.0).unwrap();
        doc.add_font("helvetica", Font::from(StandardFont::Helvetica))
            .unwrap();
        doc
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#FF0000"), Some(Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(Color::from_hex("#000000"), Some(Color::black()));
        assert_eq!(Color::from_hex("#ffffff"), Some(Color::white()));
    }

    #[test]
    fn test_color_from_hex_rejects_malformed() {
        assert_eq!(Color::from_hex("FF0000"), None);
        assert_eq!(Color::from_hex("#FFF"), None);
        assert_eq!(Color::from_hex("#GG0000"), None);
        assert_eq!(Color::from_hex("#FF00001"), None);
        assert_eq!(Color::from_hex("#ÿÿÿ"), None);
    }

    #[test]
    fn test_new_rejects_invalid_size() {
        assert!(matches!(
            PdfDocument::new(0.0, 600.0),
            Err(PdfError::InvalidPageSize(_, _))
        ));
        assert!(PdfDocument::new(800.0, f64::NAN).is_err());
        assert!(PdfDocument::new(-1.0, 10.0).is_err());
    }

    #[test]
    fn test_add_font_twice() {
        let mut doc = helvetica_doc();
        let result = doc.add_font("helvetica", Font::from(StandardFont::Helvetica));
        assert!(matches!(result, Err(PdfError::FontAlreadyExists(_))));
    }

    #[test]
    fn test_set_unknown_font() {
        let mut doc = helvetica_doc();
        assert!(matches!(
            doc.set_font("missing", 12.0),
            Err(PdfError::FontNotFound(_))
        ));
    }

    #[test]
    fn test_insert_text_without_font() {
        let mut doc = PdfDocument::new(100.0, 100.0).unwrap();
        assert!(doc.insert_text("Hi", 0.0, 0.0, Align::Left).is_err());
    }

    #[test]
    fn test_insert_empty_text_is_noop() {
        let mut doc = PdfDocument::new(100.0, 100.0).unwrap();
        doc.insert_text("", 0.0, 0.0, Align::Left).unwrap();
        assert!(doc.content.is_empty());
    }

    #[test]
    fn test_insert_text_buffers_operators() {
        let mut doc = helvetica_doc();
        doc.set_font("helvetica", 14.0).unwrap();
        doc.set_text_color(Color::from_rgb(255, 0, 0));
        doc.insert_text("Hi", 100.0, 500.0, Align::Left).unwrap();

        let content = String::from_utf8(doc.content.clone()).unwrap();
        assert!(content.contains("1 0 0 rg"));
        assert!(content.contains("/F1 14 Tf"));
        assert!(content.contains("100 500 Td"));
        assert!(content.contains("<4869> Tj"));
        assert_eq!(doc.used_chars["helvetica"].len(), 2);
    }

    #[test]
    fn test_font_resource_reused() {
        let mut doc = helvetica_doc();
        doc.set_font("helvetica", 12.0).unwrap();
        doc.insert_text("one", 10.0, 10.0, Align::Left).unwrap();
        doc.insert_text("two", 10.0, 30.0, Align::Left).unwrap();
        assert_eq!(doc.font_resources.len(), 1);
    }

    #[test]
    fn test_get_text_width() {
        let mut doc = helvetica_doc();
        doc.set_font("helvetica", 10.0).unwrap();
        let width = doc.get_text_width("Hello").unwrap();
        assert!((width - 22.78).abs() < 1e-3);
    }

    #[test]
    fn test_to_bytes_media_box() {
        let mut doc = helvetica_doc();
        doc.set_font("helvetica", 12.0).unwrap();
        doc.insert_text("Hello", 100.0, 500.0, Align::Left).unwrap();

        let bytes = doc.to_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let parsed = Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        assert_eq!(pages.len(), 1);

        let page_id = pages[&1];
        let page = parsed.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 800.0);
        assert_eq!(media_box[3].as_float().unwrap(), 600.0);
    }

    #[test]
    fn test_shared_xobject_embedded_once() {
        let image = Arc::new(ImageXObject {
            width: 2,
            height: 1,
            color_space: "DeviceGray".to_string(),
            bits_per_component: 8,
            filter: "DCTDecode".to_string(),
            data: vec![0, 255],
        });

        let mut doc = PdfDocument::new(100.0, 50.0).unwrap();
        doc.insert_image_xobject(&image, 0.0, 0.0, 100.0, 50.0);
        doc.insert_image_xobject(&image, 10.0, 10.0, 20.0, 10.0);
        assert_eq!(doc.images.len(), 1);
        assert!(Arc::ptr_eq(&doc.images[0].1, &image));

        let content = String::from_utf8(doc.content.clone()).unwrap();
        assert_eq!(content.matches("/Im1 Do").count(), 2);
        assert!(content.contains("100 0 0 50 0 0 cm"));

        let other = Arc::new((*image).clone());
        doc.insert_image_xobject(&other, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(doc.images.len(), 2);
    }
}
