//! Spending analysis
//!
//! Turns categorized transactions and a savings goal into category totals,
//! a daily savings suggestion and quest candidates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use savepop_core::insights::SpendingAnalyzer;
//!
//! let analyzer = SpendingAnalyzer::new(ai.as_ref());
//! let report = analyzer.analyze(transactions, &goal, today).await;
//! ```

pub mod quests;
pub mod savings_plan;

pub use quests::{fallback_quests, generate_quests, synthesize_quests, MAX_QUESTS};
pub use savings_plan::{days_to_goal, fallback_suggestion, suggest_savings, FALLBACK_TIP};

use chrono::NaiveDate;
use tracing::debug;

use crate::ai::AIClient;
use crate::models::{CategoryTotals, ReconciledTransaction, SavingsGoal, SpendingReport};

/// Summed absolute outflow per category; inflows are ignored
pub fn category_totals(transactions: &[ReconciledTransaction]) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for t in transactions.iter().filter(|t| t.amount < 0.0) {
        totals.add(t.category, t.amount.abs());
    }
    totals
}

/// Aggregates spending against a goal, with an optional collaborator
#[derive(Clone, Copy, Default)]
pub struct SpendingAnalyzer<'a> {
    ai: Option<&'a AIClient>,
}

impl<'a> SpendingAnalyzer<'a> {
    pub fn new(ai: Option<&'a AIClient>) -> Self {
        Self { ai }
    }

    /// Full report; `today` anchors the days-to-goal computation
    pub async fn analyze(
        &self,
        transactions: Vec<ReconciledTransaction>,
        goal: &SavingsGoal,
        today: NaiveDate,
    ) -> SpendingReport {
        let category_totals = category_totals(&transactions);
        debug!(
            transactions = transactions.len(),
            categories = category_totals.0.len(),
            "Analyzing spending"
        );

        let suggestion = suggest_savings(self.ai, &category_totals, goal, today).await;
        let quests = generate_quests(self.ai, &category_totals, goal.name.as_deref()).await;

        SpendingReport {
            transactions,
            category_totals,
            suggestion,
            quests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateTransaction, Category};

    fn reconciled(description: &str, amount: f64, category: Category) -> ReconciledTransaction {
        ReconciledTransaction::from_candidate(
            CandidateTransaction::new(None, description, amount),
            category,
        )
    }

    #[test]
    fn test_category_totals_sum_outflow_only() {
        let totals = category_totals(&[
            reconciled("STARBUCKS", -6.15, Category::Food),
            reconciled("GROCER", -43.85, Category::Food),
            reconciled("PAYROLL", 2500.0, Category::Other),
            reconciled("REFUND CAFE", 5.0, Category::Food),
        ]);
        assert_eq!(totals.get(Category::Food), Some(50.0));
        assert_eq!(totals.get(Category::Other), None);
    }

    #[tokio::test]
    async fn test_analyze_without_collaborator() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let goal = SavingsGoal::new(1800.0).with_name("Laptop");
        let report = SpendingAnalyzer::new(None)
            .analyze(
                vec![
                    reconciled("RENT", -1200.0, Category::Bills),
                    reconciled("STARBUCKS", -6.15, Category::Food),
                ],
                &goal,
                today,
            )
            .await;

        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.suggestion.daily_savings_amount, 10.0);
        assert_eq!(report.quests.len(), 4);
        assert_eq!(report.quests[0].name, "No bills spend today");
    }
}
