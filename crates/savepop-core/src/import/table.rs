//! Grid rows to candidate transactions
//!
//! The first row of each grid is treated as the header. Columns are
//! classified by case-insensitive substring match; rows whose amount cell
//! does not parse to a non-zero number (subtotals, blank rows, repeated
//! headers) are skipped.

use tracing::debug;

use super::dates::{parse_amount_cell, parse_date};
use crate::extract::RawTable;
use crate::models::CandidateTransaction;

const DATE_ALIASES: &[&str] = &["date"];

const DESCRIPTION_ALIASES: &[&str] = &[
    "desc",
    "description",
    "particular",
    "detail",
    "memo",
    "narration",
];

const AMOUNT_ALIASES: &[&str] = &["amount", "debit", "credit", "withdrawal", "deposit"];

/// Column roles resolved from a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    date: Option<usize>,
    description: Option<usize>,
    amount: usize,
}

impl ColumnMap {
    fn from_header(header: &[Option<String>]) -> Option<Self> {
        if header.is_empty() {
            return None;
        }

        let mut date = None;
        let mut description = None;
        let mut amount = None;

        // Later matches win, so a trailing "Amount" beats an earlier "Debit"
        for (i, cell) in header.iter().enumerate() {
            let label = cell.as_deref().unwrap_or("").to_lowercase();
            if matches_any(&label, DATE_ALIASES) {
                date = Some(i);
            }
            if matches_any(&label, DESCRIPTION_ALIASES) {
                description = Some(i);
            }
            if matches_any(&label, AMOUNT_ALIASES) {
                amount = Some(i);
            }
        }

        let amount = amount
            .or_else(|| numeric_column_from_right(header))
            .unwrap_or(header.len() - 1);

        Some(Self {
            date,
            description,
            amount,
        })
    }
}

fn matches_any(label: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|alias| label.contains(alias))
}

/// Right-most header cell that already reads as a positive number
fn numeric_column_from_right(header: &[Option<String>]) -> Option<usize> {
    header.iter().enumerate().rev().find_map(|(i, cell)| {
        let (value, _) = parse_amount_cell(cell.as_deref()?)?;
        (value > 0.0).then_some(i)
    })
}

/// Candidates from every grid, in grid order
pub fn transactions_from_tables(tables: &[RawTable]) -> Vec<CandidateTransaction> {
    let candidates: Vec<CandidateTransaction> =
        tables.iter().flat_map(transactions_from_table).collect();
    debug!(
        tables = tables.len(),
        candidates = candidates.len(),
        "Built table-derived candidates"
    );
    candidates
}

/// Candidates from one grid
pub fn transactions_from_table(table: &RawTable) -> Vec<CandidateTransaction> {
    if table.len() < 2 {
        return Vec::new();
    }
    let Some(columns) = ColumnMap::from_header(&table[0]) else {
        return Vec::new();
    };

    table[1..]
        .iter()
        .filter_map(|row| row_to_candidate(row, columns))
        .collect()
}

fn row_to_candidate(row: &[Option<String>], columns: ColumnMap) -> Option<CandidateTransaction> {
    let cell = |i: usize| row.get(i).and_then(|c| c.as_deref());

    let (value, is_debit) = parse_amount_cell(cell(columns.amount)?)?;
    if value == 0.0 {
        return None;
    }
    let amount = if is_debit { -value } else { value };

    let date = columns.date.and_then(cell).and_then(parse_date);

    let description = match columns.description {
        Some(i) => cell(i).unwrap_or("").trim().to_string(),
        None => row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != columns.amount && Some(*i) != columns.date)
            .filter_map(|(_, c)| c.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    };

    Some(CandidateTransaction::new(date, &description, amount))
}
