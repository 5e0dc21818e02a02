//! Reconciliation of the three extraction passes
//!
//! Candidates from the table, text and semantic passes are merged by dedupe
//! key, then a cardinality heuristic may prefer one raw pass over the merge
//! when that pass clearly found more rows.
//!
//! # Merge rules
//!
//! - Dedupe key: (date or none, amount in cents, first 80 description chars).
//!   On collision the strictly longer description wins; ties keep the first.
//! - Cross-pass aliases: entries with the same date and amount but different
//!   descriptions collapse into the longest one, provided no single pass saw
//!   that date and amount more than once. Two passes naming one purchase
//!   differently ("AMZN" vs "AMAZON.COM PURCHASE") become one row, while a
//!   pass that reports two same-day, same-amount purchases keeps both.
//!
//! # Selection
//!
//! Raw cardinality stands in for recall, so a larger single pass can replace
//! a cleanly deduplicated merge with a noisier list. Every replacement is
//! logged at info level.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::CandidateTransaction;

/// Description prefix length that participates in the dedupe key
pub const DEDUPE_DESCRIPTION_CHARS: usize = 80;

/// Which strategy produced a candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPass {
    TableDerived,
    TextDerived,
    SemanticDerived,
}

impl ExtractionPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableDerived => "table",
            Self::TextDerived => "text",
            Self::SemanticDerived => "semantic",
        }
    }

    /// Merge order
    pub fn all() -> &'static [ExtractionPass] {
        &[Self::TableDerived, Self::TextDerived, Self::SemanticDerived]
    }
}

impl std::fmt::Display for ExtractionPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw candidate lists from one document, one per pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPasses {
    pub table: Vec<CandidateTransaction>,
    pub text: Vec<CandidateTransaction>,
    pub semantic: Vec<CandidateTransaction>,
}

impl ExtractionPasses {
    pub fn candidates(&self, pass: ExtractionPass) -> &[CandidateTransaction] {
        match pass {
            ExtractionPass::TableDerived => &self.table,
            ExtractionPass::TextDerived => &self.text,
            ExtractionPass::SemanticDerived => &self.semantic,
        }
    }

    /// Candidates tagged with their pass, in merge order
    pub fn tagged(&self) -> impl Iterator<Item = (ExtractionPass, &CandidateTransaction)> + '_ {
        ExtractionPass::all()
            .iter()
            .flat_map(move |&pass| self.candidates(pass).iter().map(move |c| (pass, c)))
    }

    pub fn total(&self) -> usize {
        self.table.len() + self.text.len() + self.semantic.len()
    }
}

/// Identity of a transaction across passes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupeKey {
    pub date: Option<NaiveDate>,
    pub cents: i64,
    pub description: String,
}

impl DedupeKey {
    pub fn of(candidate: &CandidateTransaction) -> Self {
        Self {
            date: candidate.date,
            cents: to_cents(candidate.amount),
            description: candidate
                .description
                .chars()
                .take(DEDUPE_DESCRIPTION_CHARS)
                .collect(),
        }
    }
}

/// Amount rounded to whole cents
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// The list reconciliation settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Deduplicated union of all passes
    Merged,
    /// One pass outnumbered the merge and replaced it
    Pass(ExtractionPass),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub selection: Selection,
    pub transactions: Vec<CandidateTransaction>,
}

/// Merge the passes and apply the cardinality heuristic
///
/// Pure: the result depends only on the three lists.
pub fn reconcile(passes: &ExtractionPasses) -> Reconciliation {
    let merged = merge(passes);
    let selection = select(passes, merged.len());

    debug!(
        table = passes.table.len(),
        text = passes.text.len(),
        semantic = passes.semantic.len(),
        merged = merged.len(),
        "Reconciling extraction passes"
    );

    let transactions = match selection {
        Selection::Merged => merged,
        Selection::Pass(pass) => {
            info!(
                pass = pass.as_str(),
                count = passes.candidates(pass).len(),
                merged = merged.len(),
                "Pass outnumbers the merged set, using it instead"
            );
            dedupe(passes.candidates(pass))
        }
    };

    Reconciliation {
        selection,
        transactions,
    }
}

/// Cardinality heuristic over raw pass sizes and the merged size
pub fn select(passes: &ExtractionPasses, merged_len: usize) -> Selection {
    let table = passes.table.len();
    let text = passes.text.len();
    let semantic = passes.semantic.len();

    if semantic > merged_len {
        Selection::Pass(ExtractionPass::SemanticDerived)
    } else if merged_len < table && table > text && table > semantic {
        Selection::Pass(ExtractionPass::TableDerived)
    } else if merged_len < text && text > table && text > semantic {
        Selection::Pass(ExtractionPass::TextDerived)
    } else {
        Selection::Merged
    }
}

/// Collapse candidates sharing a dedupe key, keeping first-seen order
pub fn dedupe(candidates: &[CandidateTransaction]) -> Vec<CandidateTransaction> {
    dedupe_iter(candidates.iter())
}

fn dedupe_iter<'a>(
    candidates: impl Iterator<Item = &'a CandidateTransaction>,
) -> Vec<CandidateTransaction> {
    let mut slots: Vec<CandidateTransaction> = Vec::new();
    let mut index: HashMap<DedupeKey, usize> = HashMap::new();

    for candidate in candidates {
        match index.get(&DedupeKey::of(candidate)) {
            Some(&slot) => {
                if candidate.description_len() > slots[slot].description_len() {
                    slots[slot] = candidate.clone();
                }
            }
            None => {
                index.insert(DedupeKey::of(candidate), slots.len());
                slots.push(candidate.clone());
            }
        }
    }

    slots
}

fn merge(passes: &ExtractionPasses) -> Vec<CandidateTransaction> {
    let deduped = dedupe_iter(passes.tagged().map(|(_, c)| c));
    collapse_aliases(passes, deduped)
}

fn collapse_aliases(
    passes: &ExtractionPasses,
    merged: Vec<CandidateTransaction>,
) -> Vec<CandidateTransaction> {
    // How often each pass reported a dated amount
    let mut per_pass: HashMap<(ExtractionPass, NaiveDate, i64), usize> = HashMap::new();
    for (pass, candidate) in passes.tagged() {
        if let Some(date) = candidate.date {
            *per_pass
                .entry((pass, date, to_cents(candidate.amount)))
                .or_insert(0) += 1;
        }
    }

    let mut groups: HashMap<(NaiveDate, i64), Vec<usize>> = HashMap::new();
    for (i, candidate) in merged.iter().enumerate() {
        if let Some(date) = candidate.date {
            groups
                .entry((date, to_cents(candidate.amount)))
                .or_default()
                .push(i);
        }
    }

    let mut winner_at: HashMap<usize, usize> = HashMap::new();
    let mut dropped = vec![false; merged.len()];

    for ((date, cents), members) in &groups {
        if members.len() < 2 {
            continue;
        }
        let single_per_pass = ExtractionPass::all().iter().all(|&pass| {
            per_pass.get(&(pass, *date, *cents)).copied().unwrap_or(0) <= 1
        });
        if !single_per_pass {
            continue;
        }

        let mut best = members[0];
        for &member in &members[1..] {
            if merged[member].description_len() > merged[best].description_len() {
                best = member;
            }
        }
        winner_at.insert(members[0], best);
        for &member in &members[1..] {
            dropped[member] = true;
        }
    }

    if winner_at.is_empty() {
        return merged;
    }
    debug!(aliases = dropped.iter().filter(|d| **d).count(), "Collapsed cross-pass aliases");

    (0..merged.len())
        .filter(|i| !dropped[*i])
        .map(|i| merged[winner_at.get(&i).copied().unwrap_or(i)].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(date: Option<&str>, description: &str, amount: f64) -> CandidateTransaction {
        CandidateTransaction::new(
            date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            description,
            amount,
        )
    }

    #[test]
    fn test_dedupe_key_uses_prefix_and_cents() {
        let long_a = format!("{}A", "X".repeat(80));
        let long_b = format!("{}B", "X".repeat(80));
        assert_eq!(
            DedupeKey::of(&tx(None, &long_a, -1.004)),
            DedupeKey::of(&tx(None, &long_b, -1.0))
        );
        assert_ne!(
            DedupeKey::of(&tx(None, "COFFEE", -1.00)),
            DedupeKey::of(&tx(None, "COFFEE", -1.01))
        );
    }

    #[test]
    fn test_longer_description_wins_regardless_of_order() {
        let short = "SHOP".repeat(20); // exactly 80 chars
        let long = format!("{} #1234", short);
        let a = tx(Some("2024-01-15"), &short, -20.0);
        let b = tx(Some("2024-01-15"), &long, -20.0);

        assert_eq!(dedupe(&[a.clone(), b.clone()]), vec![b.clone()]);
        assert_eq!(dedupe(&[b.clone(), a]), vec![b]);
    }

    #[test]
    fn test_equal_length_keeps_first() {
        let base = "Y".repeat(80);
        let a = tx(None, &format!("{}1", base), -5.0);
        let b = tx(None, &format!("{}2", base), -5.0);
        assert_eq!(dedupe(&[a.clone(), b]), vec![a]);
    }

    #[test]
    fn test_merge_collapses_cross_pass_aliases() {
        let passes = ExtractionPasses {
            table: vec![tx(Some("2024-02-01"), "AMZN", -25.0)],
            text: vec![tx(Some("2024-02-01"), "AMAZON.COM PURCHASE", -25.0)],
            semantic: vec![],
        };
        let result = reconcile(&passes);
        assert_eq!(result.selection, Selection::Merged);
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.transactions[0].description, "AMAZON.COM PURCHASE");
    }

    #[test]
    fn test_repeated_purchases_within_a_pass_survive() {
        let passes = ExtractionPasses {
            table: vec![
                tx(Some("2024-02-01"), "CAFE LATTE", -4.5),
                tx(Some("2024-02-01"), "CAFE MUFFIN", -4.5),
            ],
            text: vec![tx(Some("2024-02-01"), "CAFE", -4.5)],
            semantic: vec![],
        };
        let result = reconcile(&passes);
        assert_eq!(result.transactions.len(), 3);
    }

    #[test]
    fn test_undated_candidates_never_alias() {
        let passes = ExtractionPasses {
            table: vec![tx(None, "RENT", -900.0)],
            text: vec![tx(None, "RENT PAYMENT", -900.0)],
            semantic: vec![],
        };
        assert_eq!(reconcile(&passes).transactions.len(), 2);
    }

    #[test]
    fn test_semantic_replaces_smaller_merge() {
        let passes = ExtractionPasses {
            table: vec![tx(Some("2024-03-01"), "A", -1.0)],
            text: vec![],
            semantic: vec![
                tx(Some("2024-03-01"), "A", -1.0),
                tx(Some("2024-03-02"), "B", -2.0),
                tx(Some("2024-03-03"), "C", -3.0),
            ],
        };
        // Merged is 3, semantic is 3: not strictly larger
        assert_eq!(reconcile(&passes).selection, Selection::Merged);

        let passes = ExtractionPasses {
            table: vec![],
            text: vec![],
            semantic: vec![tx(None, "A", -1.0), tx(None, "A", -1.0)],
        };
        // Two identical semantic rows dedupe to one merged row
        let result = reconcile(&passes);
        assert_eq!(result.selection, Selection::Pass(ExtractionPass::SemanticDerived));
        assert_eq!(result.transactions.len(), 1);
    }

    #[test]
    fn test_select_prefers_strictly_largest_pass() {
        let many = |n: usize| -> Vec<CandidateTransaction> {
            (0..n).map(|i| tx(None, "X", -(i as f64 + 1.0))).collect()
        };

        let passes = ExtractionPasses {
            table: many(5),
            text: many(2),
            semantic: many(1),
        };
        assert_eq!(select(&passes, 4), Selection::Pass(ExtractionPass::TableDerived));
        assert_eq!(select(&passes, 5), Selection::Merged);

        let passes = ExtractionPasses {
            table: many(2),
            text: many(6),
            semantic: many(1),
        };
        assert_eq!(select(&passes, 5), Selection::Pass(ExtractionPass::TextDerived));

        let tied = ExtractionPasses {
            table: many(4),
            text: many(4),
            semantic: many(0),
        };
        assert_eq!(select(&tied, 3), Selection::Merged);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let passes = ExtractionPasses {
            table: vec![
                tx(Some("2024-01-15"), "STARBUCKS", -6.15),
                tx(Some("2024-01-16"), "PAYROLL", 2500.0),
            ],
            text: vec![
                tx(Some("2024-01-15"), "STARBUCKS STORE 42", -6.15),
                tx(None, "ATM WITHDRAWAL", -60.0),
            ],
            semantic: vec![tx(Some("2024-01-16"), "PAYROLL", 2500.0)],
        };
        let once = reconcile(&passes).transactions;
        let again = reconcile(&ExtractionPasses {
            table: once.clone(),
            ..Default::default()
        })
        .transactions;
        assert_eq!(once, again);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn test_same_day_same_amount_across_passes_collapse_even_if_distinct() {
        // Different purchases that only differ by merchant look like aliases
        // when each comes from a different pass; the merge keeps one.
        let passes = ExtractionPasses {
            table: vec![tx(Some("2024-03-03"), "NETFLIX", -15.99)],
            text: vec![tx(Some("2024-03-03"), "SPOTIFY", -15.99)],
            semantic: vec![],
        };
        let merged = merge(&passes);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description, "NETFLIX");

        // Reported twice by the same pass, both survive
        let passes = ExtractionPasses {
            table: vec![
                tx(Some("2024-03-03"), "NETFLIX", -15.99),
                tx(Some("2024-03-03"), "SPOTIFY", -15.99),
            ],
            text: vec![tx(Some("2024-03-03"), "SPOTIFY PREMIUM", -15.99)],
            semantic: vec![],
        };
        assert_eq!(merge(&passes).len(), 3);
    }

    #[test]
    fn test_empty_passes() {
        let result = reconcile(&ExtractionPasses::default());
        assert_eq!(result.selection, Selection::Merged);
        assert!(result.transactions.is_empty());
    }
}
