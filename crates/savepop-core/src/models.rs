//! Domain models for SavePop
//!
//! Everything here is a request-scoped value: candidates live for one
//! extraction pass, reconciled transactions and reports are handed back to
//! the caller, which owns persistence and identity.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum stored description length, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Description used when a builder recovers an amount but no text
pub const DEFAULT_DESCRIPTION: &str = "Transaction";

/// Spending categories
///
/// The set is closed: anything the rules or the AI cannot place lands in
/// `Other`. Declaration order is the keyword-rule priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Entertainment,
    Bills,
    Health,
    Travel,
    Subscriptions,
    Transfer,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Shopping => "shopping",
            Self::Entertainment => "entertainment",
            Self::Bills => "bills",
            Self::Health => "health",
            Self::Travel => "travel",
            Self::Subscriptions => "subscriptions",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }

    /// Get all categories, `Other` last
    pub fn all() -> &'static [Category] {
        &[
            Self::Food,
            Self::Transport,
            Self::Shopping,
            Self::Entertainment,
            Self::Bills,
            Self::Health,
            Self::Travel,
            Self::Subscriptions,
            Self::Transfer,
            Self::Other,
        ]
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" => Ok(Self::Food),
            "transport" => Ok(Self::Transport),
            "shopping" => Ok(Self::Shopping),
            "entertainment" => Ok(Self::Entertainment),
            "bills" => Ok(Self::Bills),
            "health" => Ok(Self::Health),
            "travel" => Ok(Self::Travel),
            "subscriptions" => Ok(Self::Subscriptions),
            "transfer" => Ok(Self::Transfer),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction recovered by exactly one extraction strategy
///
/// Sign convention: negative = outflow, positive = inflow. Builders never
/// emit a zero amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTransaction {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
}

impl CandidateTransaction {
    /// Build a candidate, applying the description bound and default
    pub fn new(date: Option<NaiveDate>, description: &str, amount: f64) -> Self {
        Self {
            date,
            description: bounded_description(description),
            amount,
        }
    }

    /// Description length in characters (used for tie-breaks)
    pub fn description_len(&self) -> usize {
        self.description.chars().count()
    }

    pub fn is_outflow(&self) -> bool {
        self.amount < 0.0
    }
}

/// Trim, truncate to `MAX_DESCRIPTION_CHARS`, and default empty text
pub fn bounded_description(description: &str) -> String {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return DEFAULT_DESCRIPTION.to_string();
    }
    let truncated: String = trimmed.chars().take(MAX_DESCRIPTION_CHARS).collect();
    truncated.trim_end().to_string()
}

/// A deduplicated, categorized transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledTransaction {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
    pub category: Category,
}

impl ReconciledTransaction {
    pub fn from_candidate(candidate: CandidateTransaction, category: Category) -> Self {
        Self {
            date: candidate.date,
            description: candidate.description,
            amount: candidate.amount,
            category,
        }
    }

    /// Strip the category again (used when re-reconciling stored results)
    pub fn to_candidate(&self) -> CandidateTransaction {
        CandidateTransaction {
            date: self.date,
            description: self.description.clone(),
            amount: self.amount,
        }
    }
}

/// Summed absolute outflow per category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTotals(pub BTreeMap<Category, f64>);

impl CategoryTotals {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, category: Category) -> Option<f64> {
        self.0.get(&category).copied()
    }

    pub fn add(&mut self, category: Category, amount: f64) {
        *self.0.entry(category).or_insert(0.0) += amount;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }

    /// Categories by total, largest first (ties keep category order)
    pub fn ranked(&self) -> Vec<(Category, f64)> {
        let mut ranked: Vec<(Category, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    /// Plain string-keyed map for prompts and JSON consumers
    pub fn as_string_map(&self) -> BTreeMap<String, f64> {
        self.iter()
            .map(|(c, v)| (c.as_str().to_string(), round_cents(v)))
            .collect()
    }
}

/// Savings goal the analysis is computed against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub name: Option<String>,
}

impl SavingsGoal {
    pub fn new(target_amount: f64) -> Self {
        Self {
            target_amount,
            current_amount: 0.0,
            target_date: None,
            name: None,
        }
    }

    pub fn with_current(mut self, current_amount: f64) -> Self {
        self.current_amount = current_amount;
        self
    }

    pub fn with_target_date(mut self, target_date: NaiveDate) -> Self {
        self.target_date = Some(target_date);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Amount still to save, never negative
    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }
}

/// Daily savings plan suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsSuggestion {
    pub daily_savings_amount: f64,
    pub top_cut_category: Category,
    /// At most 80 characters
    pub tip: String,
    /// Always within 10..=50
    pub suggested_levels: u32,
}

/// Quest flavours understood by the game layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestCategory {
    #[serde(rename = "no-spend")]
    NoSpend,
    #[serde(rename = "milestone")]
    Milestone,
    #[serde(rename = "social")]
    Social,
}

impl QuestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSpend => "no-spend",
            Self::Milestone => "milestone",
            Self::Social => "social",
        }
    }
}

impl std::str::FromStr for QuestCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "no-spend" | "no_spend" | "nospend" => Ok(Self::NoSpend),
            "milestone" => Ok(Self::Milestone),
            "social" => Ok(Self::Social),
            _ => Err(format!("Unknown quest category: {}", s)),
        }
    }
}

impl std::fmt::Display for QuestCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A gamified challenge suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestCandidate {
    pub name: String,
    pub description: String,
    pub category: QuestCategory,
    pub points_reward: u32,
    pub currency_reward: u32,
}

/// Everything the analyzer produces for one statement and goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingReport {
    pub transactions: Vec<ReconciledTransaction>,
    pub category_totals: CategoryTotals,
    pub suggestion: SavingsSuggestion,
    pub quests: Vec<QuestCandidate>,
}

/// Round to two decimal places
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        for category in Category::all() {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, *category);
        }
        assert_eq!(" Food ".parse::<Category>().unwrap(), Category::Food);
        assert!("groceries".parse::<Category>().is_err());
    }

    #[test]
    fn test_bounded_description() {
        assert_eq!(bounded_description("   "), DEFAULT_DESCRIPTION);
        let long = "x".repeat(250);
        assert_eq!(bounded_description(&long).chars().count(), 200);
        // Multi-byte characters are counted, not bytes
        let accented = "é".repeat(210);
        assert_eq!(bounded_description(&accented).chars().count(), 200);
    }

    #[test]
    fn test_goal_remaining_never_negative() {
        let goal = SavingsGoal::new(1000.0).with_current(1500.0);
        assert_eq!(goal.remaining(), 0.0);
        let goal = SavingsGoal::new(1000.0).with_current(250.0);
        assert_eq!(goal.remaining(), 750.0);
    }

    #[test]
    fn test_category_totals_ranked() {
        let mut totals = CategoryTotals::default();
        totals.add(Category::Food, 40.0);
        totals.add(Category::Bills, 120.0);
        totals.add(Category::Food, 10.5);
        let ranked = totals.ranked();
        assert_eq!(ranked[0], (Category::Bills, 120.0));
        assert_eq!(ranked[1], (Category::Food, 50.5));
    }

    #[test]
    fn test_quest_category_serde() {
        let json = serde_json::to_string(&QuestCategory::NoSpend).unwrap();
        assert_eq!(json, "\"no-spend\"");
        assert_eq!(
            "milestone".parse::<QuestCategory>().unwrap(),
            QuestCategory::Milestone
        );
    }
}
