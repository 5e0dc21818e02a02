//! Candidate transaction builders
//!
//! One builder per extraction pass:
//! - `table`: grid rows from the table extractor
//! - `text`: lines of extracted document text
//! - `semantic`: the AI collaborator reading raw text
//!
//! Builders never fail. Rows or lines they cannot read are skipped.

pub mod dates;
mod semantic;
mod table;
mod text;

pub use semantic::{transactions_from_semantic, MAX_SEMANTIC_CHARS, MIN_SEMANTIC_CHARS};
pub use table::{transactions_from_table, transactions_from_tables};
pub use text::{parse_line, transactions_from_text};
