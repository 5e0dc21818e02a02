//! Semantic extraction through the AI collaborator
//!
//! The collaborator is treated as unreliable: every failure degrades to an
//! empty candidate list and is logged, never returned.

use tracing::{debug, warn};

use crate::ai::{AIBackend, AIClient};
use crate::models::CandidateTransaction;

/// Text shorter than this is not worth a collaborator call
pub const MIN_SEMANTIC_CHARS: usize = 50;

/// At most this many characters of document text are sent
pub const MAX_SEMANTIC_CHARS: usize = 80_000;

/// Ask the collaborator for candidates; empty on any failure
pub async fn transactions_from_semantic(
    ai: Option<&AIClient>,
    text: &str,
) -> Vec<CandidateTransaction> {
    let Some(ai) = ai else {
        return Vec::new();
    };

    let text = text.trim();
    if text.chars().count() < MIN_SEMANTIC_CHARS {
        debug!("Document text too short for semantic extraction");
        return Vec::new();
    }

    let slice = truncate_chars(text, MAX_SEMANTIC_CHARS);
    match ai.extract_transactions(slice).await {
        Ok(candidates) => {
            debug!(
                candidates = candidates.len(),
                model = ai.model(),
                "Built semantic-derived candidates"
            );
            candidates
        }
        Err(e) => {
            warn!("Semantic extraction failed, continuing without it: {}", e);
            Vec::new()
        }
    }
}

/// Prefix of at most `max` characters, on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::prompts::PromptId;

    const STATEMENT: &str = "01/15/2024 STARBUCKS 6.15\n01/16/2024 UBER TRIP 14.20\n01/17/2024 RENT 1200.00";

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_no_collaborator_gives_nothing() {
        assert!(transactions_from_semantic(None, STATEMENT).await.is_empty());
    }

    #[tokio::test]
    async fn test_short_text_skips_call() {
        let ai = AIClient::Mock(MockBackend::failing());
        // A failing backend would log, but the call never happens
        assert!(transactions_from_semantic(Some(&ai), "too short").await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty() {
        let ai = AIClient::Mock(MockBackend::failing());
        assert!(transactions_from_semantic(Some(&ai), STATEMENT).await.is_empty());
    }

    #[tokio::test]
    async fn test_fenced_response_is_parsed() {
        let ai = AIClient::Mock(MockBackend::new().with_response(
            PromptId::ExtractTransactions,
            "```json\n[{\"date\":\"2024-01-15\",\"description\":\"STARBUCKS\",\"amount\":-6.15},\
             {\"date\":\"bad\",\"description\":\"UBER\",\"amount\":\"-14.20\"},\
             {\"date\":null,\"description\":\"NOISE\",\"amount\":\"n/a\"}]\n```",
        ));
        let txs = transactions_from_semantic(Some(&ai), STATEMENT).await;
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, -6.15);
        assert_eq!(txs[1].amount, -14.2);
        assert_eq!(txs[1].date, None);
    }
}
