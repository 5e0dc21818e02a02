//! PDF backend using Poppler's `pdftotext`
//!
//! Two invocations per document:
//! - `pdftotext -layout <file> -` for layout-preserving text (form feed per page)
//! - `pdftotext -bbox <file> -` for word bounding boxes (XHTML)
//!
//! `pdftotext` reports no ruling lines; those are recovered from the PDF's
//! drawn paths (see `pdf_paths`) so grid-based table detection works on
//! bordered statements.

use std::path::Path;
use std::process::Command;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use super::pdf_paths::load_rulings;
use super::plain_text::split_pages;
use super::{extension, Document, DocumentBackend, DocumentFormat, Page, Word};
use crate::error::{Error, Result};

pub struct PdfToTextBackend {
    binary: String,
    available: bool,
}

impl PdfToTextBackend {
    /// Probe for `pdftotext` on PATH (or `PDFTOTEXT_BIN`)
    pub fn new() -> Self {
        let binary = std::env::var("PDFTOTEXT_BIN").unwrap_or_else(|_| "pdftotext".to_string());
        let available = Command::new(&binary)
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false);
        if !available {
            debug!(binary = %binary, "pdftotext not found, PDF extraction disabled");
        }
        Self { binary, available }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn run(&self, args: &[&str], path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(args)
            .arg(path)
            .arg("-")
            .output()?;

        if !output.status.success() {
            return Err(Error::InvalidData(format!(
                "pdftotext failed on {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for PdfToTextBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBackend for PdfToTextBackend {
    fn name(&self) -> &'static str {
        "pdftotext"
    }

    fn supports(&self, path: &Path) -> bool {
        self.available && extension(path).as_deref() == Some("pdf")
    }

    fn load(&self, path: &Path) -> Result<Document> {
        let mut pages = match self.run(&["-bbox"], path) {
            Ok(xhtml) => parse_bbox(&xhtml),
            Err(e) => {
                warn!("Word extraction failed, continuing with layout text only: {}", e);
                Vec::new()
            }
        };

        let layout = self.run(&["-layout"], path)?;
        for (i, text) in split_pages(&layout).into_iter().enumerate() {
            if i >= pages.len() {
                pages.push(Page {
                    number: i + 1,
                    ..Default::default()
                });
            }
            pages[i].layout_text = Some(text.to_string());
        }

        let heights: Vec<f64> = pages.iter().map(|p| p.height).collect();
        match load_rulings(path, &heights) {
            Ok(rulings) => {
                for (page, rulings) in pages.iter_mut().zip(rulings) {
                    page.rulings = rulings;
                }
            }
            Err(e) => warn!("Ruling recovery failed, grid tables disabled: {}", e),
        }

        debug!(pages = pages.len(), "pdftotext extraction complete");
        Ok(Document::new(DocumentFormat::Pdf, pages))
    }
}

/// Parse `pdftotext -bbox` output into pages of words
///
/// Malformed XML ends parsing early; pages read so far are kept.
pub(crate) fn parse_bbox(xhtml: &str) -> Vec<Page> {
    let mut pages: Vec<Page> = Vec::new();
    let mut reader = Reader::from_str(xhtml);
    let mut buf = Vec::new();
    // Open <word>: its box and the raw (still escaped) text seen so far
    let mut word: Option<([f64; 4], String)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"page" => {
                pages.push(Page {
                    number: pages.len() + 1,
                    width: attr_f64(e, b"width").unwrap_or(0.0),
                    height: attr_f64(e, b"height").unwrap_or(0.0),
                    ..Default::default()
                });
            }
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"word" => {
                let coords = [b"xMin", b"yMin", b"xMax", b"yMax"].map(|k| attr_f64(e, k));
                word = match coords {
                    [Some(x0), Some(top), Some(x1), Some(bottom)] => {
                        Some(([x0, top, x1, bottom], String::new()))
                    }
                    _ => None,
                };
            }
            Ok(Event::Text(ref e)) => {
                if let Some((_, text)) = word.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(ref e)) => {
                if let Some((_, text)) = word.as_mut() {
                    text.push('&');
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    text.push(';');
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"word" => {
                if let (Some(([x0, top, x1, bottom], raw)), Some(page)) =
                    (word.take(), pages.last_mut())
                {
                    let text = unescape(raw.trim())
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| raw.trim().to_string());
                    page.words.push(Word::new(&text, x0, top, x1, bottom));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Stopped reading pdftotext word boxes: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    pages
}

fn attr_f64(element: &BytesStart, key: &[u8]) -> Option<f64> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| std::str::from_utf8(&attr.value).ok()?.parse().ok())
}
