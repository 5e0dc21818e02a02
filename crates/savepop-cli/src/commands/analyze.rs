//! Savings plan command

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use savepop_core::ai::AIClient;
use savepop_core::models::{SavingsGoal, SpendingReport};
use savepop_core::pipeline::StatementProcessor;

use super::format_amount;

/// Build a goal from command-line values
pub fn parse_goal(
    target: f64,
    current: f64,
    target_date: Option<&str>,
    name: Option<String>,
) -> Result<SavingsGoal> {
    if !target.is_finite() || target < 0.0 {
        anyhow::bail!("Target amount must be a non-negative number, got {}", target);
    }
    if !current.is_finite() || current < 0.0 {
        anyhow::bail!("Current amount must be a non-negative number, got {}", current);
    }

    let mut goal = SavingsGoal::new(target).with_current(current);
    if let Some(date) = target_date {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid target date (expected YYYY-MM-DD): {}", date))?;
        goal = goal.with_target_date(date);
    }
    if let Some(name) = name {
        goal = goal.with_name(name);
    }
    Ok(goal)
}

/// Process a statement and print the spending report for a goal
pub async fn cmd_analyze(
    ai: Option<&AIClient>,
    file: &Path,
    goal: &SavingsGoal,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    let processor = StatementProcessor::new(ai);
    let transactions = processor
        .process_path(file)
        .await
        .with_context(|| format!("Failed to open statement: {}", file.display()))?;
    let report = processor.analyze(&transactions, goal, today).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(goal, &report);
    }
    Ok(())
}

fn print_report(goal: &SavingsGoal, report: &SpendingReport) {
    println!();
    match &goal.name {
        Some(name) => println!("🎯 Goal: {}", name),
        None => println!("🎯 Goal"),
    }
    println!(
        "   Target {}  Saved {}  Remaining {}",
        format_amount(goal.target_amount),
        format_amount(goal.current_amount),
        format_amount(goal.remaining())
    );
    if let Some(date) = goal.target_date {
        println!("   By {}", date);
    }

    println!();
    println!("💸 Spending by category ({} transactions)", report.transactions.len());
    if report.category_totals.is_empty() {
        println!("   No outflows found.");
    }
    for (category, total) in report.category_totals.ranked() {
        println!("   {:<15} {:>12}", category.as_str(), format_amount(total));
    }

    let suggestion = &report.suggestion;
    println!();
    println!("💡 Savings plan");
    println!(
        "   Save {} a day, cut back on {}",
        format_amount(suggestion.daily_savings_amount),
        suggestion.top_cut_category
    );
    println!("   Tip: {}", suggestion.tip);
    println!("   Levels: {}", suggestion.suggested_levels);

    println!();
    println!("🏆 Quests");
    for quest in &report.quests {
        println!(
            "   [{}] {} (+{} pts, +{} coins)",
            quest.category, quest.name, quest.points_reward, quest.currency_reward
        );
        println!("      {}", quest.description);
    }
    println!();
}
