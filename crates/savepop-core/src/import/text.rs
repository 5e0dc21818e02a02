//! Line-oriented statement text to candidate transactions
//!
//! Every non-blank line carrying a decimal amount becomes a candidate. The
//! last amount on the line is taken, since statements print the running
//! balance before the transaction amount. Sign comes from keywords on the
//! line and defaults to an outflow.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::dates::{find_amounts, parse_date, strip_dates};
use crate::models::CandidateTransaction;

/// Substrings marking an outflow
const DEBIT_MARKERS: &[&str] = &["debit", "withdrawal", "payment", "("];

/// Substrings marking an inflow
const CREDIT_MARKERS: &[&str] = &["credit", "deposit"];

/// Short abbreviations only count as whole words ("dr" must not hit "address")
static DEBIT_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(dr|pos)\b").expect("valid debit regex"));

static CREDIT_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcr\b").expect("valid credit regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outflow,
    Inflow,
}

fn direction(line: &str) -> Direction {
    let lower = line.to_lowercase();
    if DEBIT_MARKERS.iter().any(|m| lower.contains(m)) || DEBIT_WORDS.is_match(line) {
        Direction::Outflow
    } else if CREDIT_MARKERS.iter().any(|m| lower.contains(m)) || CREDIT_WORDS.is_match(line) {
        Direction::Inflow
    } else {
        Direction::Outflow
    }
}

/// Parse one line; `None` when it carries no usable amount
pub fn parse_line(line: &str) -> Option<CandidateTransaction> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let amounts = find_amounts(line);
    let &(_, value) = amounts.last()?;
    if value == 0.0 {
        return None;
    }

    // A printed minus is stripped with the amount but never decides the sign
    let amount = match direction(line) {
        Direction::Outflow => -value.abs(),
        Direction::Inflow => value.abs(),
    };

    let date = parse_date(line);

    let mut description = line.to_string();
    for (matched, _) in &amounts {
        description = description.replacen(matched, " ", 1);
    }
    let description = strip_dates(&description)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    Some(CandidateTransaction::new(date, &description, amount))
}

/// Candidates from every line of `text`, in line order
pub fn transactions_from_text(text: &str) -> Vec<CandidateTransaction> {
    let candidates: Vec<CandidateTransaction> = text.lines().filter_map(parse_line).collect();
    debug!(candidates = candidates.len(), "Built text-derived candidates");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_no_keyword_defaults_to_outflow() {
        let tx = parse_line("03/02 Starbucks 6.15").unwrap();
        assert_eq!(tx.amount, -6.15);
        assert_eq!(tx.date, None);
        assert_eq!(tx.description, "03/02 Starbucks");
    }

    #[test]
    fn test_last_amount_wins() {
        let tx = parse_line("01/15/2024 GROCER MART 1,204.50 45.99").unwrap();
        assert_eq!(tx.amount, -45.99);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        // Every amount on the line is stripped from the description
        assert_eq!(tx.description, "GROCER MART");
    }

    #[test]
    fn test_credit_keywords_make_inflow() {
        let tx = parse_line("2024-01-31 PAYROLL DEPOSIT $2,500.00").unwrap();
        assert_eq!(tx.amount, 2500.0);
        assert_eq!(tx.description, "PAYROLL DEPOSIT");

        let tx = parse_line("Interest CR 1.25").unwrap();
        assert_eq!(tx.amount, 1.25);
    }

    #[test]
    fn test_debit_keyword_beats_credit_keyword() {
        let tx = parse_line("CREDIT CARD PAYMENT 300.00").unwrap();
        assert_eq!(tx.amount, -300.0);
    }

    #[test]
    fn test_abbreviations_are_whole_words() {
        // "address" contains "dr" but is not a debit marker
        let tx = parse_line("Deposit address change 10.00").unwrap();
        assert_eq!(tx.amount, 10.0);
        let tx = parse_line("POS 4411 CORNER STORE 8.40").unwrap();
        assert_eq!(tx.amount, -8.4);
    }

    #[test]
    fn test_minus_sign_is_stripped_but_keywords_decide_sign() {
        let tx = parse_line("01/15/2024 STARBUCKS -6.15").unwrap();
        assert_eq!(tx.amount, -6.15);
        assert_eq!(tx.description, "STARBUCKS");

        let tx = parse_line("DEPOSIT REVERSAL -20.00").unwrap();
        assert_eq!(tx.amount, 20.0);
    }

    #[test]
    fn test_dash_separator_does_not_flip_deposit() {
        let tx = parse_line("03/05/2024 PAYROLL DEPOSIT - 2,500.00").unwrap();
        assert_eq!(tx.amount, 2500.0);
        assert_eq!(tx.description, "PAYROLL DEPOSIT");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_lines_without_amounts_skipped() {
        let text = "Account Summary\n\n01/15/2024 STARBUCKS 6.15\nPage 1 of 2\nBalance 0.00";
        let txs = transactions_from_text(text);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "STARBUCKS");
    }

    #[test]
    fn test_amount_only_line_gets_default_description() {
        let tx = parse_line("  12.00  ").unwrap();
        assert_eq!(tx.description, "Transaction");
    }
}
