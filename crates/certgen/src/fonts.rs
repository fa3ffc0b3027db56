//! Named fonts with a built-in fallback

use crate::config::FontSpec;
use pdf_core::{Font, FontData, PdfError, StandardFont};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Font used when a name cannot be resolved
pub const DEFAULT_FONT: StandardFont = StandardFont::Helvetica;

/// A font returned by [`FontRegistry::resolve`]
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFont<'a> {
    pub font: &'a Font,
    /// True when the requested name was unknown and the default was substituted
    pub fallback: bool,
}

/// Registry of fonts keyed by name
///
/// Registration takes `&mut self`; once a batch starts the registry is only
/// shared by reference across render threads. Resolution never fails.
#[derive(Debug)]
pub struct FontRegistry {
    fonts: HashMap<String, Font>,
    default: Font,
    fallbacks: AtomicUsize,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            default: Font::from(DEFAULT_FONT),
            fallbacks: AtomicUsize::new(0),
        }
    }

    /// Build a registry from font specs
    ///
    /// Fonts that fail to load are logged and left out.
    pub fn from_specs(specs: &[FontSpec]) -> Self {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(&spec.name, &spec.source);
        }
        registry
    }

    /// Load a TTF/OTF file under `name`
    ///
    /// Returns false (and logs an error) when the file cannot be read or parsed.
    pub fn register<P: AsRef<Path>>(&mut self, name: &str, path: P) -> bool {
        let path = path.as_ref();
        let loaded = std::fs::read(path)
            .map_err(PdfError::from)
            .and_then(|data| FontData::from_ttf(name, &data));

        match loaded {
            Ok(data) => {
                log::info!("Registered font '{name}' from {}", path.display());
                self.fonts.insert(name.to_string(), Font::from(data));
                true
            }
            Err(e) => {
                log::error!("Failed to load font '{name}' from {}: {e}", path.display());
                false
            }
        }
    }

    /// Register a font from in-memory TTF/OTF data
    pub fn register_bytes(&mut self, name: &str, data: &[u8]) -> pdf_core::Result<()> {
        let font = FontData::from_ttf(name, data)?;
        self.fonts.insert(name.to_string(), Font::from(font));
        Ok(())
    }

    /// Check if a font is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    /// Registered font names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fonts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a font by name
    ///
    /// Unknown names resolve to the default font and count as a fallback.
    /// Asking for the default font by its own name is not a fallback.
    pub fn resolve(&self, name: &str) -> ResolvedFont<'_> {
        if let Some(font) = self.fonts.get(name) {
            return ResolvedFont {
                font,
                fallback: false,
            };
        }

        if name.eq_ignore_ascii_case(DEFAULT_FONT.base_font_name()) {
            return ResolvedFont {
                font: &self.default,
                fallback: false,
            };
        }

        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            "Font '{name}' is not registered, falling back to {}",
            DEFAULT_FONT.base_font_name()
        );

        ResolvedFont {
            font: &self.default,
            fallback: true,
        }
    }

    /// Number of fallback substitutions so far
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_font_falls_back() {
        let registry = FontRegistry::new();

        let resolved = registry.resolve("Garamond");
        assert!(resolved.fallback);
        assert_eq!(resolved.font.name(), "Helvetica");
        assert!(!resolved.font.is_embedded());

        registry.resolve("Garamond");
        assert_eq!(registry.fallback_count(), 2);
    }

    #[test]
    fn test_default_font_by_name_is_not_fallback() {
        let registry = FontRegistry::new();

        assert!(!registry.resolve("Helvetica").fallback);
        assert!(!registry.resolve("helvetica").fallback);
        assert_eq!(registry.fallback_count(), 0);
    }

    #[test]
    fn test_register_missing_file_is_omitted() {
        let mut registry = FontRegistry::new();

        assert!(!registry.register("manrope", "/nonexistent/Manrope.ttf"));
        assert!(!registry.contains("manrope"));
        assert!(registry.resolve("manrope").fallback);
    }

    #[test]
    fn test_register_bytes_rejects_garbage() {
        let mut registry = FontRegistry::new();

        assert!(registry.register_bytes("junk", b"not a font").is_err());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_from_specs_skips_failures() {
        let specs = vec![
            FontSpec {
                name: "a".to_string(),
                source: "/nonexistent/a.ttf".into(),
            },
            FontSpec {
                name: "b".to_string(),
                source: "/nonexistent/b.otf".into(),
            },
        ];

        let registry = FontRegistry::from_specs(&specs);
        assert!(registry.names().is_empty());
    }
}
