//! Daily savings suggestion
//!
//! The collaborator proposes a plan; every field is validated and anything
//! missing or out of range is filled from the arithmetic fallback.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::ai::{AIBackend, AIClient, SavingsAdvice, SavingsRequest};
use crate::models::{round_cents, Category, CategoryTotals, SavingsGoal, SavingsSuggestion};

/// Horizon when the goal has no target date
pub const DEFAULT_HORIZON_DAYS: i64 = 180;

/// Shortest horizon ever used, even for near or past-due dates
pub const MIN_HORIZON_DAYS: i64 = 30;

pub const DEFAULT_LEVELS: u32 = 20;
pub const MIN_LEVELS: u32 = 10;
pub const MAX_LEVELS: u32 = 50;
pub const MAX_TIP_CHARS: usize = 80;

pub const FALLBACK_TIP: &str =
    "Upload a bank statement to get personalized tips based on your spending.";

/// Days the plan spreads the remaining amount over
pub fn days_to_goal(goal: &SavingsGoal, today: NaiveDate) -> i64 {
    match goal.target_date {
        Some(target) => (target - today).num_days().max(MIN_HORIZON_DAYS),
        None => DEFAULT_HORIZON_DAYS,
    }
}

/// `remaining / days`, rounded to cents
pub fn daily_amount(remaining: f64, days: i64) -> f64 {
    if days <= 0 {
        return 0.0;
    }
    round_cents(remaining / days as f64)
}

/// The plan used without spending data or a usable collaborator answer
pub fn fallback_suggestion(remaining: f64, days: i64) -> SavingsSuggestion {
    SavingsSuggestion {
        daily_savings_amount: daily_amount(remaining, days),
        top_cut_category: Category::Other,
        tip: FALLBACK_TIP.to_string(),
        suggested_levels: DEFAULT_LEVELS,
    }
}

/// Build the suggestion for a goal from categorized outflow totals
pub async fn suggest_savings(
    ai: Option<&AIClient>,
    totals: &CategoryTotals,
    goal: &SavingsGoal,
    today: NaiveDate,
) -> SavingsSuggestion {
    let remaining = goal.remaining();
    let days = days_to_goal(goal, today);

    if totals.is_empty() {
        debug!(remaining, days, "No outflow to analyze, using fallback plan");
        return fallback_suggestion(remaining, days);
    }

    let Some(ai) = ai else {
        return fallback_suggestion(remaining, days);
    };

    let request = SavingsRequest {
        spending: totals.as_string_map(),
        target_amount: goal.target_amount,
        current_amount: goal.current_amount,
        remaining,
        days,
    };

    match ai.suggest_savings(&request).await {
        Ok(advice) => from_advice(advice, totals, remaining, days),
        Err(e) => {
            warn!("Savings suggestion failed, using fallback plan: {}", e);
            fallback_suggestion(remaining, days)
        }
    }
}

/// Validate collaborator advice and fill its gaps
pub fn from_advice(
    advice: SavingsAdvice,
    totals: &CategoryTotals,
    remaining: f64,
    days: i64,
) -> SavingsSuggestion {
    let top_outflow = totals
        .ranked()
        .first()
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other);

    let daily_savings_amount = if remaining <= 0.0 {
        0.0
    } else {
        advice
            .daily_savings_amount
            .filter(|a| a.is_finite() && *a >= 0.0)
            .map(round_cents)
            .unwrap_or_else(|| daily_amount(remaining, days))
    };

    let top_cut_category = advice
        .top_cut_category
        .and_then(|c| c.parse().ok())
        .unwrap_or(top_outflow);

    let tip = advice
        .tip
        .map(|t| truncate_tip(&t))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Spend less on {} this week", top_cut_category));

    let suggested_levels = advice
        .suggested_levels
        .map(|l| l.clamp(MIN_LEVELS as i64, MAX_LEVELS as i64) as u32)
        .unwrap_or(DEFAULT_LEVELS);

    SavingsSuggestion {
        daily_savings_amount,
        top_cut_category,
        tip,
        suggested_levels,
    }
}

fn truncate_tip(tip: &str) -> String {
    tip.trim()
        .chars()
        .take(MAX_TIP_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}
