//! Output filenames for generated documents

use std::collections::HashSet;

/// Maximum filename stem length in UTF-8 bytes
///
/// Filesystems limit names to 255 bytes; the rest is left for the
/// ` (n)` suffix and the extension.
pub const MAX_STEM_BYTES: usize = 200;

/// Extension of generated documents
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Stem used when a record has no usable identifying value
pub fn fallback_stem(index: usize) -> String {
    format!("unknown_{index}")
}

fn is_unsafe(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

fn is_trimmed(c: char) -> bool {
    c == '.' || c.is_whitespace()
}

/// Make a value safe to use as a filename stem
///
/// Unsafe characters become `_`, leading and trailing dots and whitespace
/// are removed and the result is capped at [`MAX_STEM_BYTES`] without
/// splitting a character. May return an empty string.
pub fn sanitize(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| if is_unsafe(c) { '_' } else { c })
        .collect();

    let trimmed = replaced.trim_matches(is_trimmed);
    truncate_at_boundary(trimmed, MAX_STEM_BYTES)
        .trim_end_matches(is_trimmed)
        .to_string()
}

/// Longest prefix of `s` no longer than `max_bytes` ending on a char boundary
fn truncate_at_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    &s[..end]
}

/// Filename stem for a record from its identifying value
pub fn document_stem(value: Option<&str>, index: usize) -> String {
    let stem = sanitize(value.unwrap_or_default());
    if stem.is_empty() {
        fallback_stem(index)
    } else {
        stem
    }
}

/// Hands out pairwise distinct filenames in call order
///
/// A repeated stem gets ` (2)`, ` (3)`, ... appended. Comparison ignores
/// ASCII case so names stay distinct on case-insensitive filesystems.
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a unique filename (with extension) for `stem`
    pub fn allocate(&mut self, stem: &str) -> String {
        let mut candidate = stem.to_string();
        let mut n = 2;
        while !self.taken.insert(candidate.to_ascii_lowercase()) {
            candidate = format!("{stem} ({n})");
            n += 1;
        }
        format!("{candidate}.{DOCUMENT_EXTENSION}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize_replaces_unsafe() {
        assert_eq!(sanitize("Ana Maria"), "Ana Maria");
        assert_eq!(sanitize("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize("tab\there"), "tab_here");
    }

    #[test]
    fn test_sanitize_trims_dots_and_spaces() {
        assert_eq!(sanitize("  ..Dr. Who.. "), "Dr. Who");
        assert_eq!(sanitize(" ... "), "");
    }

    #[test]
    fn test_sanitize_caps_ascii_length() {
        let long = "a".repeat(250);
        assert_eq!(sanitize(&long), "a".repeat(MAX_STEM_BYTES));
    }

    #[test]
    fn test_sanitize_caps_multibyte_by_bytes() {
        // 141 Cyrillic characters, two bytes each
        let long = "Ж".repeat(141);
        let stem = sanitize(&long);
        assert_eq!(stem, "Ж".repeat(MAX_STEM_BYTES / 2));
        assert!(stem.len() <= MAX_STEM_BYTES);

        // Three-byte characters cut on a boundary below the cap
        let stem = sanitize(&"€".repeat(100));
        assert_eq!(stem.len(), 198);
        assert_eq!(stem.chars().count(), 66);
    }

    #[test]
    fn test_allocated_name_fits_filesystem_limit() {
        let stem = document_stem(Some(&"Ш".repeat(300)), 0);
        let mut names = NameAllocator::new();
        names.allocate(&stem);
        let second = names.allocate(&stem);
        assert!(second.ends_with(" (2).pdf"));
        assert!(second.len() <= 255);
    }

    #[test]
    fn test_document_stem_fallback() {
        assert_eq!(document_stem(Some("Bob"), 3), "Bob");
        assert_eq!(document_stem(None, 3), "unknown_3");
        assert_eq!(document_stem(Some("   "), 4), "unknown_4");
        assert_eq!(document_stem(Some(".."), 5), "unknown_5");
    }

    #[test]
    fn test_allocator_disambiguates_in_order() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("Ana"), "Ana.pdf");
        assert_eq!(names.allocate("Bob"), "Bob.pdf");
        assert_eq!(names.allocate("Ana"), "Ana (2).pdf");
        assert_eq!(names.allocate("ana"), "ana (3).pdf");
        assert_eq!(names.allocate("Ana (2)"), "Ana (2) (2).pdf");
    }
}
