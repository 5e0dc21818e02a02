//! Text and table extraction from paginated documents
//!
//! Both extractors are pure functions of a `Document`. Pages are processed
//! independently and results are concatenated in page order.

mod tables;
mod text;

pub use tables::{extract_page_tables, extract_tables, RawTable, TableStrategy};
pub use text::{extract_text, page_text, TextLine};

pub(crate) use text::group_lines;
