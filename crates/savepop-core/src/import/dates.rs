//! Date and amount recognition shared by the transaction builders
//!
//! Three date shapes are recognised, tried in this order:
//!
//! 1. `D/M/Y` or `M/D/Y` (ambiguous: a first component above 12 is the day,
//!    anything else is read as the month)
//! 2. `Y/M/D`
//! 3. `D Mon Y` with a textual month
//!
//! `-` works as a separator wherever `/` does. Two-digit years land in the
//! 2000s. The first shape that matches decides; if its components do not
//! form a real date the result is `None` rather than trying the next shape.
//! Day/month ambiguity cannot be resolved without locale context.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

static NUMERIC_DMY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})\b").expect("valid date regex")
});

static NUMERIC_YMD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})\b").expect("valid date regex")
});

static TEXT_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{2,4})\b")
        .expect("valid date regex")
});

/// Decimal amounts: digits with optional thousands separators and 1-2 decimals,
/// optionally preceded by a minus sign and a currency symbol
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\$?\s*(\d[\d,]*\.\d{1,2})\b").expect("valid amount regex")
});

#[derive(Clone, Copy)]
enum DateShape {
    DayOrMonthFirst,
    YearFirst,
    TextMonth,
}

const SHAPES: [DateShape; 3] = [
    DateShape::DayOrMonthFirst,
    DateShape::YearFirst,
    DateShape::TextMonth,
];

impl DateShape {
    fn regex(&self) -> &'static Regex {
        match self {
            Self::DayOrMonthFirst => &*NUMERIC_DMY,
            Self::YearFirst => &*NUMERIC_YMD,
            Self::TextMonth => &*TEXT_MONTH,
        }
    }

    fn to_date(self, caps: &Captures) -> Option<NaiveDate> {
        let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
        match self {
            Self::DayOrMonthFirst => {
                let (a, b) = (num(1)?, num(2)?);
                let year = full_year(&caps[3])?;
                let (day, month) = if a > 12 { (a, b) } else { (b, a) };
                NaiveDate::from_ymd_opt(year, month, day)
            }
            Self::YearFirst => {
                let year: i32 = caps[1].parse().ok()?;
                NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)
            }
            Self::TextMonth => {
                let month = month_number(&caps[2])?;
                NaiveDate::from_ymd_opt(full_year(&caps[3])?, month, num(1)?)
            }
        }
    }
}

/// Find and parse the first recognisable date in `text`
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    for shape in SHAPES {
        if let Some(caps) = shape.regex().captures(text) {
            return shape.to_date(&caps);
        }
    }
    None
}

/// Remove every date-looking substring
pub fn strip_dates(text: &str) -> String {
    let mut out = text.to_string();
    for shape in SHAPES {
        out = shape.regex().replace_all(&out, " ").into_owned();
    }
    out
}

/// All decimal amounts in `text`, in order, as (full match, value)
pub fn find_amounts(text: &str) -> Vec<(&str, f64)> {
    AMOUNT
        .captures_iter(text)
        .filter_map(|caps| {
            let full = caps.get(0)?.as_str();
            let value = caps[1].replace(',', "").parse::<f64>().ok()?;
            Some((full, value))
        })
        .collect()
}

/// Parse a table amount cell into (absolute value, is_debit)
///
/// Currency symbols, separators and whitespace are ignored. A parenthesised
/// or minus-prefixed value is a debit.
pub fn parse_amount_cell(cell: &str) -> Option<(f64, bool)> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    let is_debit = trimmed.contains('(') || trimmed.contains(')') || trimmed.starts_with('-');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let value = cleaned.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some((value.abs(), is_debit))
}

fn full_year(text: &str) -> Option<i32> {
    let year: i32 = text.parse().ok()?;
    match text.len() {
        2 => Some(2000 + year),
        4 => Some(year),
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.get(..3)?.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
