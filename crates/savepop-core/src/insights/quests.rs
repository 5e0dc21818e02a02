//! Quest candidates from spending
//!
//! One no-spend quest per top outflow category, followed by collaborator
//! ideas or, when the collaborator is unavailable, two generic quests. The
//! generic quests also fill an otherwise empty list.

use tracing::warn;

use crate::ai::{AIBackend, AIClient, QuestRequest};
use crate::models::{Category, CategoryTotals, QuestCandidate, QuestCategory};

/// Most quests returned for one analysis
pub const MAX_QUESTS: usize = 6;

/// Categories considered for synthesized quests
pub const TOP_CATEGORIES: usize = 3;

/// Collaborator ideas appended at most
pub const MAX_IDEAS: usize = 3;

const SYNTHESIZED_POINTS: u32 = 30;
const SYNTHESIZED_CURRENCY: u32 = 15;

/// "No {category} spend today" for the largest outflow categories
///
/// The three largest categories are taken first; `other` and zero totals
/// among them are then skipped, so fewer than three may come back.
pub fn synthesize_quests(totals: &CategoryTotals) -> Vec<QuestCandidate> {
    totals
        .ranked()
        .into_iter()
        .take(TOP_CATEGORIES)
        .filter(|(category, amount)| *category != Category::Other && amount.abs() > 0.0)
        .map(|(category, amount)| QuestCandidate {
            name: format!("No {} spend today", category),
            description: format!(
                "Don't spend on {} today (you usually spend ${} here).",
                category,
                amount.abs().round() as i64
            ),
            category: QuestCategory::NoSpend,
            points_reward: SYNTHESIZED_POINTS,
            currency_reward: SYNTHESIZED_CURRENCY,
        })
        .collect()
}

/// Generic quests used when no ideas are available
pub fn fallback_quests() -> Vec<QuestCandidate> {
    vec![
        QuestCandidate {
            name: "Daily no-spend".to_string(),
            description: "Skip one non-essential purchase today".to_string(),
            category: QuestCategory::NoSpend,
            points_reward: 25,
            currency_reward: 10,
        },
        QuestCandidate {
            name: "Track spending".to_string(),
            description: "Log every expense today".to_string(),
            category: QuestCategory::Milestone,
            points_reward: 20,
            currency_reward: 5,
        },
    ]
}

/// Synthesized quests plus collaborator ideas, capped at `MAX_QUESTS`
pub async fn generate_quests(
    ai: Option<&AIClient>,
    totals: &CategoryTotals,
    goal_name: Option<&str>,
) -> Vec<QuestCandidate> {
    let mut quests = synthesize_quests(totals);

    let ideas = match ai {
        Some(ai) => {
            let request = QuestRequest {
                spending: totals.as_string_map(),
                goal_name: goal_name.map(str::to_string),
            };
            match ai.suggest_quests(&request).await {
                Ok(ideas) => ideas,
                Err(e) => {
                    warn!("Quest suggestion failed, using generic quests: {}", e);
                    fallback_quests()
                }
            }
        }
        None => fallback_quests(),
    };

    quests.extend(ideas.into_iter().take(MAX_IDEAS));
    if quests.is_empty() {
        quests = fallback_quests();
    }
    quests.truncate(MAX_QUESTS);
    quests
}
