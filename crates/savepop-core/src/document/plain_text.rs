//! Plain text statements
//!
//! Each form feed starts a new page, matching what `pdftotext` emits.

use std::fs;
use std::path::Path;

use super::{extension, Document, DocumentBackend, DocumentFormat, Page};
use crate::error::Result;

pub struct PlainTextBackend;

impl PlainTextBackend {
    pub fn parse(content: &str) -> Document {
        let pages = split_pages(content)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page::from_text(i + 1, text))
            .collect();
        Document::new(DocumentFormat::PlainText, pages)
    }
}

/// Split on form feeds, dropping a trailing empty page
pub(crate) fn split_pages(content: &str) -> Vec<&str> {
    let mut pages: Vec<&str> = content.split('\x0c').collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

impl DocumentBackend for PlainTextBackend {
    fn name(&self) -> &'static str {
        "plain_text"
    }

    fn supports(&self, path: &Path) -> bool {
        matches!(extension(path).as_deref(), Some("txt") | Some("text"))
    }

    fn load(&self, path: &Path) -> Result<Document> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_feed_splits_pages() {
        let doc = PlainTextBackend::parse("page one\x0cpage two\x0c");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].number, 2);
        assert_eq!(doc.pages[1].layout_text.as_deref(), Some("page two"));
    }

    #[test]
    fn test_single_page() {
        let doc = PlainTextBackend::parse("just one page");
        assert_eq!(doc.page_count(), 1);
    }
}
