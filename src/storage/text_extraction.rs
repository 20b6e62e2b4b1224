//! Marker Extraction Module
//!
//! Reads documents and pulls the two metadata markers out of them:
//!
//! ```text
//! <meta property="hnet:title" content="Cats" />
//! <meta property="hnet:description" content="About cats" />
//! ```
//!
//! Runs of ASCII whitespace between the tokens are tolerated. Attribute
//! order, double quotes, the exact (case-sensitive) property key and the
//! self-closing `/>` are required. The first well-formed marker per key wins.

use crate::error::Result;
use std::path::Path;

pub const TITLE_KEY: &str = "hnet:title";
pub const DESCRIPTION_KEY: &str = "hnet:description";

/// Trimmed, non-empty marker values of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMarkers {
    pub title: String,
    pub description: String,
}

/// Read a document as text. Invalid UTF-8 is replaced, not rejected.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Both markers, or None if either is missing or blank after trimming.
pub fn extract_markers(content: &str) -> Option<DocumentMarkers> {
    let title = find_marker(content, TITLE_KEY)?.trim();
    let description = find_marker(content, DESCRIPTION_KEY)?.trim();

    if title.is_empty() || description.is_empty() {
        return None;
    }

    Some(DocumentMarkers {
        title: title.to_string(),
        description: description.to_string(),
    })
}

/// Raw `content` value of the first well-formed marker carrying `key`.
pub fn find_marker<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    let mut rest = content;
    while let Some(pos) = rest.find("<meta") {
        let after = &rest[pos + "<meta".len()..];
        if let Some((property, value)) = parse_meta(after) {
            if property == key {
                return Some(value);
            }
        }
        rest = after;
    }
    None
}

/// Parse the remainder of a `<meta` tag into (property, content).
fn parse_meta(input: &str) -> Option<(&str, &str)> {
    let input = skip_required_whitespace(input)?;
    let (property, input) = quoted_attribute(input, "property")?;
    let input = skip_required_whitespace(input)?;
    let (value, input) = quoted_attribute(input, "content")?;
    let input = input.trim_start_matches(|c: char| c.is_ascii_whitespace());
    if !input.starts_with("/>") {
        return None;
    }
    // An empty attribute is not a marker; a later tag may still be one.
    if value.is_empty() {
        return None;
    }
    Some((property, value))
}

fn skip_required_whitespace(input: &str) -> Option<&str> {
    let trimmed = input.trim_start_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.len() == input.len() {
        return None;
    }
    Some(trimmed)
}

/// `name="value"` -> (value, remainder)
fn quoted_attribute<'a>(input: &'a str, name: &str) -> Option<(&'a str, &'a str)> {
    let input = input.strip_prefix(name)?.strip_prefix("=\"")?;
    let end = input.find('"')?;
    Some((&input[..end], &input[end + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, description: &str) -> String {
        format!(
            "<html><head>\n<meta property=\"hnet:title\" content=\"{}\" />\n<meta property=\"hnet:description\" content=\"{}\" />\n</head></html>",
            title, description
        )
    }

    #[test]
    fn test_extracts_both_markers() {
        let markers = extract_markers(&doc("Cats", "About cats")).unwrap();
        assert_eq!(markers.title, "Cats");
        assert_eq!(markers.description, "About cats");
    }

    #[test]
    fn test_values_are_trimmed() {
        let markers = extract_markers(&doc("  Cats ", "\tAbout cats\n")).unwrap();
        assert_eq!(markers.title, "Cats");
        assert_eq!(markers.description, "About cats");
    }

    #[test]
    fn test_missing_marker_rejects() {
        let only_title = r#"<meta property="hnet:title" content="Cats" />"#;
        assert!(extract_markers(only_title).is_none());

        let only_description = r#"<meta property="hnet:description" content="About cats" />"#;
        assert!(extract_markers(only_description).is_none());

        assert!(extract_markers("").is_none());
    }

    #[test]
    fn test_blank_values_reject() {
        assert!(extract_markers(&doc("   ", "About cats")).is_none());
        assert!(extract_markers(&doc("Cats", " \n ")).is_none());
    }

    #[test]
    fn test_empty_attribute_falls_through_to_later_marker() {
        let content = r#"
            <meta property="hnet:title" content="" />
            <meta property="hnet:title" content="Cats" />
            <meta property="hnet:description" content="About cats" />
        "#;
        assert_eq!(extract_markers(content).unwrap().title, "Cats");
    }

    #[test]
    fn test_extra_whitespace_tolerated() {
        let content = "<meta   property=\"hnet:title\"\n\tcontent=\"Cats\"/>\
                       <meta property=\"hnet:description\"  content=\"About cats\"   />";
        let markers = extract_markers(content).unwrap();
        assert_eq!(markers.title, "Cats");
        assert_eq!(markers.description, "About cats");
    }

    #[test]
    fn test_malformed_markers_rejected() {
        // wrong key case
        assert!(find_marker(r#"<meta property="HNET:title" content="Cats" />"#, TITLE_KEY).is_none());
        // single quotes
        assert!(find_marker(r#"<meta property='hnet:title' content='Cats' />"#, TITLE_KEY).is_none());
        // attributes swapped
        assert!(find_marker(r#"<meta content="Cats" property="hnet:title" />"#, TITLE_KEY).is_none());
        // not self-closing
        assert!(find_marker(r#"<meta property="hnet:title" content="Cats">"#, TITLE_KEY).is_none());
        // name attribute instead of property
        assert!(find_marker(r#"<meta name="hnet:title" content="Cats" />"#, TITLE_KEY).is_none());
    }

    #[test]
    fn test_first_marker_wins() {
        let content = r#"
            <meta property="hnet:title" content="First" />
            <meta property="hnet:title" content="Second" />
        "#;
        assert_eq!(find_marker(content, TITLE_KEY), Some("First"));
    }

    #[test]
    fn test_other_meta_tags_are_skipped() {
        let content = r#"
            <meta charset="utf-8">
            <meta property="og:title" content="Ignored" />
            <meta property="hnet:title" content="Cats" />
        "#;
        assert_eq!(find_marker(content, TITLE_KEY), Some("Cats"));
    }

    #[test]
    fn test_read_document_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, b"<meta property=\"hnet:title\" content=\"Caf\xff\" />").unwrap();

        let content = read_document(&path).unwrap();
        assert_eq!(find_marker(&content, TITLE_KEY), Some("Caf\u{FFFD}"));
    }
}
