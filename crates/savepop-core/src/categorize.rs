//! Two-tier transaction categorization
//!
//! Tier 1 is a fixed keyword table. Tier 2 asks the AI collaborator for a
//! label per transaction in batches and only ever upgrades: a label is
//! applied when it names a real category other than `other`.

use tracing::{debug, warn};

use crate::ai::{AIBackend, AIClient};
use crate::models::{CandidateTransaction, Category, ReconciledTransaction};

/// Transactions per collaborator request
pub const AI_BATCH_SIZE: usize = 60;

/// Keyword substrings per category, in priority order
///
/// Matched against the lower-cased description; the first category with any
/// hit wins. Trailing spaces are part of the keyword ("bus " must not match
/// "business").
static CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Food,
        &[
            "restaurant", "cafe", "coffee", "starbucks", "mcdonald", "uber eats", "doordash",
            "grubhub", "grocer", "supermarket", "food", "dining", "pizza", "delivery", "eat ",
            "kitchen",
        ],
    ),
    (
        Category::Transport,
        &[
            "uber", "lyft", "gas", "fuel", "shell", "chevron", "exxon", "parking", "transit",
            "metro", "bus ", "train", "toll", "car ", "auto", "taxi",
        ],
    ),
    (
        Category::Shopping,
        &[
            "amazon", "walmart", "target", "costco", "ebay", "shop", "store", "retail", "mall",
            "purchase",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "movie", "cinema", "netflix", "hulu", "disney", "game", "steam", "playstation",
            "xbox", "concert", "ticket", "entertainment",
        ],
    ),
    (
        Category::Bills,
        &[
            "electric", "utility", "water", "internet", "phone", "mobile", "bill", "insurance",
            "rent", "mortgage", "at&t", "verizon", "comcast",
        ],
    ),
    (
        Category::Health,
        &[
            "pharmacy", "cvs", "walgreens", "hospital", "doctor", "medical", "health", "dental",
            "clinic", "prescription",
        ],
    ),
    (
        Category::Travel,
        &["airline", "hotel", "booking", "expedia", "airbnb", "flight", "travel", "vacation"],
    ),
    (
        Category::Subscriptions,
        &[
            "subscription", "monthly", "spotify", "apple music", "youtube premium", "membership",
            "recurring",
        ],
    ),
    (
        Category::Transfer,
        &["transfer", "zelle", "venmo", "paypal", "ach ", "wire", "payment to"],
    ),
];

/// Tier 1: first keyword hit, else `Other`
pub fn categorize_rules(description: &str) -> Category {
    let lowered = description.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Categorize reconciled candidates, refining with the collaborator if present
pub async fn categorize(
    ai: Option<&AIClient>,
    candidates: Vec<CandidateTransaction>,
) -> Vec<ReconciledTransaction> {
    let mut transactions: Vec<ReconciledTransaction> = candidates
        .into_iter()
        .map(|c| {
            let category = categorize_rules(&c.description);
            ReconciledTransaction::from_candidate(c, category)
        })
        .collect();

    debug!(
        total = transactions.len(),
        matched = transactions
            .iter()
            .filter(|t| t.category != Category::Other)
            .count(),
        "Keyword categorization done"
    );

    if let Some(ai) = ai {
        let refined = refine_with_ai(ai, &mut transactions).await;
        debug!(refined, "Collaborator categorization done");
    }

    transactions
}

/// Tier 2: apply collaborator labels batch by batch
///
/// Returns how many categories changed. A failed batch keeps its tier-1
/// categories and the remaining batches still run.
pub async fn refine_with_ai(ai: &AIClient, transactions: &mut [ReconciledTransaction]) -> usize {
    let mut changed = 0;

    for (batch_index, batch) in transactions.chunks_mut(AI_BATCH_SIZE).enumerate() {
        let lines: Vec<String> = batch
            .iter()
            .enumerate()
            .map(|(i, t)| format_line(i, t))
            .collect();

        let labels = match ai.classify_categories(&lines).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(
                    batch = batch_index,
                    size = batch.len(),
                    "Collaborator categorization failed, keeping keyword categories: {}",
                    e
                );
                continue;
            }
        };

        for (transaction, label) in batch.iter_mut().zip(labels) {
            match label {
                Some(category) if category != Category::Other && category != transaction.category => {
                    transaction.category = category;
                    changed += 1;
                }
                _ => {}
            }
        }
    }

    changed
}

fn format_line(index: usize, transaction: &ReconciledTransaction) -> String {
    format!(
        "{}. {} | {}",
        index + 1,
        transaction.description,
        transaction.amount
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::prompts::PromptId;

    fn candidates(descriptions: &[&str]) -> Vec<CandidateTransaction> {
        descriptions
            .iter()
            .map(|d| CandidateTransaction::new(None, d, -10.0))
            .collect()
    }

    #[test]
    fn test_keyword_rules() {
        assert_eq!(categorize_rules("03/02 Starbucks"), Category::Food);
        assert_eq!(categorize_rules("UBER TRIP HELP.UBER.COM"), Category::Transport);
        // Food is checked before transport
        assert_eq!(categorize_rules("UBER EATS ORDER"), Category::Food);
        assert_eq!(categorize_rules("NETFLIX.COM"), Category::Entertainment);
        assert_eq!(categorize_rules("Zelle to Sam"), Category::Transfer);
        assert_eq!(categorize_rules("CHECK 1042"), Category::Other);
    }

    #[test]
    fn test_keyword_spaces_are_significant() {
        assert_eq!(categorize_rules("BUSINESS LUNCH"), Category::Other);
        assert_eq!(categorize_rules("CITY BUS PASS"), Category::Transport);
    }

    #[test]
    fn test_format_line() {
        let t = ReconciledTransaction::from_candidate(
            CandidateTransaction::new(None, "STARBUCKS", -6.15),
            Category::Food,
        );
        assert_eq!(format_line(0, &t), "1. STARBUCKS | -6.15");
    }

    #[tokio::test]
    async fn test_without_collaborator_uses_rules_only() {
        let result = categorize(None, candidates(&["SHELL OIL", "MYSTERY"])).await;
        assert_eq!(result[0].category, Category::Transport);
        assert_eq!(result[1].category, Category::Other);
    }

    #[tokio::test]
    async fn test_collaborator_never_downgrades_to_other() {
        let ai = AIClient::Mock(MockBackend::new().with_response(
            PromptId::CategorizeTransactions,
            r#"["other", "bills", "groceries", "health"]"#,
        ));
        let result = categorize(
            Some(&ai),
            candidates(&["STARBUCKS", "CITY POWER CO", "MARKET", "CVS PHARMACY"]),
        )
        .await;

        assert_eq!(result[0].category, Category::Food);
        assert_eq!(result[1].category, Category::Bills);
        // Unknown label is ignored
        assert_eq!(result[2].category, Category::Other);
        assert_eq!(result[3].category, Category::Health);
    }

    #[tokio::test]
    async fn test_collaborator_may_override_keyword_category() {
        let ai = AIClient::Mock(
            MockBackend::new().with_response(PromptId::CategorizeTransactions, r#"["travel"]"#),
        );
        let result = categorize(Some(&ai), candidates(&["UBER TRIP AIRPORT"])).await;
        assert_eq!(result[0].category, Category::Travel);
    }

    #[tokio::test]
    async fn test_non_json_response_keeps_tier_one() {
        let ai = AIClient::Mock(MockBackend::new().with_response(
            PromptId::CategorizeTransactions,
            "Sure! Here are the categories you asked for.",
        ));
        let result = categorize(Some(&ai), candidates(&["STARBUCKS", "MYSTERY"])).await;
        assert_eq!(result[0].category, Category::Food);
        assert_eq!(result[1].category, Category::Other);
    }

    #[tokio::test]
    async fn test_short_label_list_only_touches_prefix() {
        let ai = AIClient::Mock(
            MockBackend::new().with_response(PromptId::CategorizeTransactions, r#"["shopping"]"#),
        );
        let result = categorize(Some(&ai), candidates(&["MYSTERY A", "MYSTERY B"])).await;
        assert_eq!(result[0].category, Category::Shopping);
        assert_eq!(result[1].category, Category::Other);
    }

    #[tokio::test]
    async fn test_every_batch_is_sent() {
        let descriptions: Vec<String> = (0..AI_BATCH_SIZE + 5)
            .map(|i| format!("UBER RIDE {}", i))
            .collect();
        let refs: Vec<&str> = descriptions.iter().map(String::as_str).collect();
        let mut transactions = categorize(None, candidates(&refs)).await;
        for t in &mut transactions {
            t.category = Category::Other;
        }

        let changed = refine_with_ai(&AIClient::mock(), &mut transactions).await;
        assert_eq!(changed, AI_BATCH_SIZE + 5);
        assert!(transactions.iter().all(|t| t.category == Category::Transport));
    }
}
