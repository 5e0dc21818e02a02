//! Table detection
//!
//! Three independent strategies run on every page and all of their grids
//! are returned, duplicates included:
//!
//! - `Lines`: cells bounded by horizontal and vertical rulings
//! - `Explicit`: columns from vertical rulings, rows from text lines
//! - `Text`: borderless tables found from aligned whitespace gaps
//!
//! A grid is a list of rows; a cell is `None` when nothing landed in it.

use tracing::debug;

use super::text::{group_lines, TextLine};
use crate::document::{Document, Page, Ruling, Word};

/// A detected table: rows of optional cell text
pub type RawTable = Vec<Vec<Option<String>>>;

/// Rulings closer than this are treated as the same edge
const SNAP_TOLERANCE: f64 = 3.0;

/// Horizontal whitespace wider than this separates text columns
const MIN_COLUMN_GAP: f64 = 8.0;

/// Grids with fewer rows are dropped by the explicit and text strategies
const MIN_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStrategy {
    Lines,
    Explicit,
    Text,
}

impl TableStrategy {
    pub fn all() -> &'static [TableStrategy] {
        &[Self::Lines, Self::Explicit, Self::Text]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lines => "lines",
            Self::Explicit => "explicit",
            Self::Text => "text",
        }
    }

    /// Run this strategy on one page
    pub fn detect(&self, page: &Page) -> Vec<RawTable> {
        match self {
            Self::Lines => lines_tables(page),
            Self::Explicit => explicit_tables(page),
            Self::Text => text_tables(page),
        }
    }
}

/// Every grid found by every strategy on every page
pub fn extract_tables(doc: &Document) -> Vec<RawTable> {
    let tables: Vec<RawTable> = doc.pages.iter().flat_map(extract_page_tables).collect();
    debug!(tables = tables.len(), "Extracted tables");
    tables
}

/// Union of all strategies for one page
pub fn extract_page_tables(page: &Page) -> Vec<RawTable> {
    TableStrategy::all()
        .iter()
        .flat_map(|strategy| {
            let found = strategy.detect(page);
            if !found.is_empty() {
                debug!(
                    page = page.number,
                    strategy = strategy.as_str(),
                    tables = found.len(),
                    "Table strategy matched"
                );
            }
            found
        })
        .collect()
}

fn lines_tables(page: &Page) -> Vec<RawTable> {
    let ys = snap(
        page.rulings
            .iter()
            .filter(|r| r.is_horizontal())
            .map(|r| (r.top + r.bottom) / 2.0),
    );
    let xs = snap(
        page.rulings
            .iter()
            .filter(|r| r.is_vertical())
            .map(|r| (r.x0 + r.x1) / 2.0),
    );
    if ys.len() < 2 || xs.len() < 2 {
        return Vec::new();
    }

    let mut table = RawTable::new();
    for row in ys.windows(2) {
        let cells: Vec<Option<String>> = xs
            .windows(2)
            .map(|col| {
                cell_text(page.words.iter().filter(|w| {
                    within(w.center_x(), col[0], col[1]) && within(w.center_y(), row[0], row[1])
                }))
            })
            .collect();
        if cells.iter().any(Option::is_some) {
            table.push(cells);
        }
    }

    if table.is_empty() {
        Vec::new()
    } else {
        vec![table]
    }
}

fn explicit_tables(page: &Page) -> Vec<RawTable> {
    let verticals: Vec<&Ruling> = page.rulings.iter().filter(|r| r.is_vertical()).collect();
    let xs = snap(verticals.iter().map(|r| (r.x0 + r.x1) / 2.0));
    let (Some(&left), Some(&right)) = (xs.first(), xs.last()) else {
        return Vec::new();
    };
    if xs.len() < 2 {
        return Vec::new();
    }

    let top = verticals.iter().map(|r| r.top).fold(f64::INFINITY, f64::min);
    let bottom = verticals
        .iter()
        .map(|r| r.bottom)
        .fold(f64::NEG_INFINITY, f64::max);

    let inside: Vec<Word> = page
        .words
        .iter()
        .filter(|w| within(w.center_x(), left, right) && within(w.center_y(), top, bottom))
        .cloned()
        .collect();

    let bands: Vec<(f64, f64)> = xs.windows(2).map(|c| (c[0], c[1])).collect();
    let table: RawTable = group_lines(&inside)
        .iter()
        .map(|line| row_cells(line, &bands))
        .filter(|cells| cells.iter().any(Option::is_some))
        .collect();

    if table.len() >= MIN_ROWS {
        vec![table]
    } else {
        Vec::new()
    }
}

fn text_tables(page: &Page) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut block: Vec<(TextLine, Vec<(f64, f64)>)> = Vec::new();

    for line in group_lines(&page.words) {
        let segments = line_segments(&line);
        if segments.len() >= 2 {
            block.push((line, segments));
        } else {
            flush_block(&mut block, &mut tables);
        }
    }
    flush_block(&mut block, &mut tables);

    tables
}

/// Turn a run of multi-column lines into a grid
fn flush_block(block: &mut Vec<(TextLine, Vec<(f64, f64)>)>, tables: &mut Vec<RawTable>) {
    if block.len() >= MIN_ROWS {
        let bands = merge_intervals(block.iter().flat_map(|(_, s)| s.iter().copied()).collect());
        let table = block
            .iter()
            .map(|(line, _)| row_cells(line, &bands))
            .collect();
        tables.push(table);
    }
    block.clear();
}

/// Horizontal extents of word runs separated by wide gaps
fn line_segments(line: &TextLine) -> Vec<(f64, f64)> {
    let mut segments: Vec<(f64, f64)> = Vec::new();
    for word in &line.words {
        match segments.last_mut() {
            Some((_, end)) if word.x0 - *end <= MIN_COLUMN_GAP => *end = end.max(word.x1),
            _ => segments.push((word.x0, word.x1)),
        }
    }
    segments
}

fn merge_intervals(mut intervals: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    intervals.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (start, end) in intervals {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => *last_end = last_end.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

fn row_cells(line: &TextLine, bands: &[(f64, f64)]) -> Vec<Option<String>> {
    bands
        .iter()
        .map(|&(left, right)| {
            cell_text(
                line.words
                    .iter()
                    .filter(|w| within(w.center_x(), left, right)),
            )
        })
        .collect()
}

/// Sorted, de-duplicated edge positions
fn snap(positions: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut positions: Vec<f64> = positions.collect();
    positions.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut snapped: Vec<f64> = Vec::new();
    for p in positions {
        if snapped.last().map_or(true, |last| p - last > SNAP_TOLERANCE) {
            snapped.push(p);
        }
    }
    snapped
}

fn within(value: f64, low: f64, high: f64) -> bool {
    value >= low && value <= high
}

fn cell_text<'a>(words: impl Iterator<Item = &'a Word>) -> Option<String> {
    let words: Vec<Word> = words.cloned().collect();
    let text = group_lines(&words)
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join(" ");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
