//! JSON page dump backend
//!
//! Reads a serialized `Document` (or a bare array of pages), as written by an
//! external layout tool. Page numbers are filled in when the dump omits them.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::{extension, Document, DocumentBackend, DocumentFormat, Page};
use crate::error::{Error, Result};

pub struct PageDumpBackend;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDump {
    Document { pages: Vec<Page> },
    Pages(Vec<Page>),
}

impl PageDumpBackend {
    /// Parse dump content
    pub fn parse(content: &str) -> Result<Document> {
        let raw: RawDump = serde_json::from_str(content)
            .map_err(|e| Error::InvalidData(format!("Invalid page dump: {}", e)))?;

        let mut pages = match raw {
            RawDump::Document { pages } => pages,
            RawDump::Pages(pages) => pages,
        };

        for (i, page) in pages.iter_mut().enumerate() {
            if page.number == 0 {
                page.number = i + 1;
            }
        }

        Ok(Document::new(DocumentFormat::PageDump, pages))
    }
}

impl DocumentBackend for PageDumpBackend {
    fn name(&self) -> &'static str {
        "page_dump"
    }

    fn supports(&self, path: &Path) -> bool {
        extension(path).as_deref() == Some("json")
    }

    fn load(&self, path: &Path) -> Result<Document> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }
}
