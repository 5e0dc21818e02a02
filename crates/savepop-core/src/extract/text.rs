//! Page text extraction
//!
//! Layout-preserving text is preferred because it keeps column alignment,
//! which the line parser relies on. Sparse or missing layout text falls back
//! to rebuilding lines from positioned words.

use std::collections::BTreeMap;

use tracing::debug;

use crate::document::{Document, Page, Word};

/// Layout text shorter than this (trimmed) triggers the word fallback
const MIN_LAYOUT_CHARS: usize = 100;

/// Vertical bucket height used to group words into lines
const LINE_BUCKET: f64 = 5.0;

/// Words sharing a vertical bucket, left to right
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub top: f64,
    pub bottom: f64,
    pub words: Vec<Word>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn x0(&self) -> f64 {
        self.words.first().map(|w| w.x0).unwrap_or(0.0)
    }

    pub fn x1(&self) -> f64 {
        self.words.iter().map(|w| w.x1).fold(0.0, f64::max)
    }
}

/// Full document text, pages joined by newlines
pub fn extract_text(doc: &Document) -> String {
    let text = doc
        .pages
        .iter()
        .map(page_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    debug!(
        pages = doc.page_count(),
        chars = text.len(),
        "Extracted document text"
    );
    text
}

/// Text for one page
pub fn page_text(page: &Page) -> String {
    let layout = page.layout_text.as_deref().unwrap_or("");
    if layout.trim().chars().count() >= MIN_LAYOUT_CHARS {
        return layout.to_string();
    }

    let clustered = group_lines(&page.words)
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n");

    if clustered.trim().is_empty() {
        layout.to_string()
    } else {
        debug!(page = page.number, "Layout text sparse, using word clustering");
        clustered
    }
}

/// Cluster words into lines by quantized top coordinate
pub(crate) fn group_lines(words: &[Word]) -> Vec<TextLine> {
    let mut buckets: BTreeMap<i64, Vec<Word>> = BTreeMap::new();
    for word in words {
        if word.text.trim().is_empty() {
            continue;
        }
        let key = (word.top / LINE_BUCKET).floor() as i64;
        buckets.entry(key).or_default().push(word.clone());
    }

    buckets
        .into_values()
        .map(|mut words| {
            words.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));
            let top = words.iter().map(|w| w.top).fold(f64::INFINITY, f64::min);
            let bottom = words.iter().map(|w| w.bottom).fold(f64::NEG_INFINITY, f64::max);
            TextLine { top, bottom, words }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFormat;

    fn word(text: &str, x0: f64, top: f64) -> Word {
        Word::new(text, x0, top, x0 + 8.0 * text.len() as f64, top + 10.0)
    }

    #[test]
    fn test_long_layout_text_wins() {
        let layout = "01/15/2024   STARBUCKS COFFEE                        -6.15\n".repeat(3);
        let page = Page {
            number: 1,
            layout_text: Some(layout.clone()),
            words: vec![word("ignored", 10.0, 10.0)],
            ..Default::default()
        };
        assert_eq!(page_text(&page), layout);
    }

    #[test]
    fn test_short_layout_falls_back_to_words() {
        let page = Page {
            number: 1,
            layout_text: Some("short".to_string()),
            words: vec![
                word("-6.15", 300.0, 101.0),
                word("STARBUCKS", 100.0, 100.0),
                word("01/15/2024", 10.0, 102.0),
                word("Opening", 10.0, 50.0),
            ],
            ..Default::default()
        };
        assert_eq!(page_text(&page), "Opening\n01/15/2024 STARBUCKS -6.15");
    }

    #[test]
    fn test_no_words_keeps_short_layout() {
        let page = Page::from_text(1, "03/02 Starbucks 6.15");
        assert_eq!(page_text(&page), "03/02 Starbucks 6.15");
    }

    #[test]
    fn test_pages_joined_in_order() {
        let doc = Document::new(
            DocumentFormat::PlainText,
            vec![
                Page::from_text(1, "page one"),
                Page::from_text(2, ""),
                Page::from_text(3, "page three"),
            ],
        );
        assert_eq!(extract_text(&doc), "page one\npage three");
    }

    #[test]
    fn test_bucket_boundary_splits_lines() {
        // 104.9 and 105.0 straddle a bucket edge
        let lines = group_lines(&[word("a", 10.0, 104.9), word("b", 20.0, 105.0)]);
        assert_eq!(lines.len(), 2);
    }
}
