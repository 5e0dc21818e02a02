//! Paginated statement documents
//!
//! A `Document` is the backend-neutral view the extractors work on: per
//! page, an optional layout-preserving text rendering, positioned words,
//! and ruling lines. Backends turn a file into a `Document`:
//!
//! - `PageDumpBackend`: JSON page dumps produced by an external layout tool
//! - `PlainTextBackend`: plain text statements (form feed separates pages)
//! - `PdfToTextBackend`: PDFs via Poppler's `pdftotext` when it is installed,
//!   with ruling lines recovered from the PDF's drawn paths
//!
//! Coordinates follow PDF-reader conventions: `top` grows downward.

mod page_dump;
mod pdf_paths;
mod pdftotext;
mod plain_text;

pub use page_dump::PageDumpBackend;
pub use pdf_paths::load_rulings;
pub use pdftotext::PdfToTextBackend;
pub use plain_text::PlainTextBackend;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// A positioned word on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Word {
    pub fn new(text: &str, x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            text: text.to_string(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }
}

/// A straight ruling line (table border) on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruling {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

/// Tolerance for treating a segment as axis-aligned
const AXIS_TOLERANCE: f64 = 1.0;

impl Ruling {
    pub fn horizontal(x0: f64, x1: f64, y: f64) -> Self {
        Self {
            x0,
            top: y,
            x1,
            bottom: y,
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64) -> Self {
        Self {
            x0: x,
            top,
            x1: x,
            bottom,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        (self.bottom - self.top).abs() <= AXIS_TOLERANCE && (self.x1 - self.x0).abs() > AXIS_TOLERANCE
    }

    pub fn is_vertical(&self) -> bool {
        (self.x1 - self.x0).abs() <= AXIS_TOLERANCE && (self.bottom - self.top).abs() > AXIS_TOLERANCE
    }
}

/// One page of a statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    #[serde(default)]
    pub number: usize,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// Layout-preserving text rendering, if the backend produces one
    #[serde(default)]
    pub layout_text: Option<String>,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub rulings: Vec<Ruling>,
}

impl Page {
    /// A page that only carries layout text
    pub fn from_text(number: usize, text: &str) -> Self {
        Self {
            number,
            layout_text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

/// Where a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PageDump,
    PlainText,
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageDump => "page_dump",
            Self::PlainText => "plain_text",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A paginated statement, pages in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub format: DocumentFormat,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(format: DocumentFormat, pages: Vec<Page>) -> Self {
        Self { format, pages }
    }

    /// Build a single-page document from text
    pub fn from_text(text: &str) -> Self {
        Self::new(DocumentFormat::PlainText, vec![Page::from_text(1, text)])
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A document extraction backend
pub trait DocumentBackend: Send + Sync {
    /// Short identifier for logging
    fn name(&self) -> &'static str;

    /// Whether this backend can (and is able to) read the file
    fn supports(&self, path: &Path) -> bool;

    /// Read the file into a document
    fn load(&self, path: &Path) -> Result<Document>;
}

/// All backends known to this build, in preference order
pub fn default_backends() -> Vec<Box<dyn DocumentBackend>> {
    vec![
        Box::new(PageDumpBackend),
        Box::new(PlainTextBackend),
        Box::new(PdfToTextBackend::new()),
    ]
}

/// Open a statement with the first backend that supports it
///
/// Fails with `UnsupportedFormat` when no backend can read the file.
pub fn open_document(path: &Path) -> Result<Document> {
    open_document_with(path, &default_backends())
}

/// Open a statement using an explicit backend list
pub fn open_document_with(path: &Path, backends: &[Box<dyn DocumentBackend>]) -> Result<Document> {
    for backend in backends {
        if backend.supports(path) {
            debug!(backend = backend.name(), path = %path.display(), "Loading document");
            return backend.load(path);
        }
    }

    Err(Error::UnsupportedFormat(format!(
        "no extraction backend available for {}",
        path.display()
    )))
}

/// Lower-cased file extension, if any
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
