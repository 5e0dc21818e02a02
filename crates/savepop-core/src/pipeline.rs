//! Statement processing pipeline
//!
//! Runs the stages in order for one document: text and table extraction,
//! the three candidate builders, reconciliation, then categorization.
//! Only opening the file can fail; everything after that degrades to fewer
//! (possibly zero) transactions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use savepop_core::pipeline::StatementProcessor;
//!
//! let ai = AIClient::from_env();
//! let processor = StatementProcessor::new(ai.as_ref());
//! let transactions = processor.process_path(Path::new("march.pdf")).await?;
//! ```

use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::ai::AIClient;
use crate::categorize::categorize;
use crate::document::{open_document, Document};
use crate::error::Result;
use crate::extract::{extract_tables, extract_text};
use crate::import::{transactions_from_semantic, transactions_from_tables, transactions_from_text};
use crate::insights::SpendingAnalyzer;
use crate::models::{ReconciledTransaction, SavingsGoal, SpendingReport};
use crate::reconcile::{reconcile, ExtractionPasses};
use crate::store::TransactionStore;

/// Turns statements into categorized transactions
#[derive(Clone, Copy, Default)]
pub struct StatementProcessor<'a> {
    ai: Option<&'a AIClient>,
}

impl<'a> StatementProcessor<'a> {
    /// `ai` is optional; without it the pipeline is heuristic-only
    pub fn new(ai: Option<&'a AIClient>) -> Self {
        Self { ai }
    }

    /// Run every extraction pass over the document
    pub async fn extract_passes(&self, doc: &Document) -> ExtractionPasses {
        let text = extract_text(doc);
        let tables = extract_tables(doc);

        let table = transactions_from_tables(&tables);
        let text_derived = transactions_from_text(&text);
        let semantic = if text.trim().is_empty() {
            Vec::new()
        } else {
            transactions_from_semantic(self.ai, &text).await
        };

        debug!(
            pages = doc.page_count(),
            text_chars = text.len(),
            tables = tables.len(),
            table = table.len(),
            text = text_derived.len(),
            semantic = semantic.len(),
            "Extraction passes complete"
        );

        ExtractionPasses {
            table,
            text: text_derived,
            semantic,
        }
    }

    /// Reconciled and categorized transactions for a document
    pub async fn process(&self, doc: &Document) -> Vec<ReconciledTransaction> {
        let passes = self.extract_passes(doc).await;
        let reconciliation = reconcile(&passes);
        let transactions = categorize(self.ai, reconciliation.transactions).await;

        info!(
            format = %doc.format,
            selection = ?reconciliation.selection,
            transactions = transactions.len(),
            "Processed statement"
        );
        transactions
    }

    /// Open a statement file and process it
    ///
    /// Fails only when the file cannot be read or no backend supports it.
    pub async fn process_path(&self, path: &Path) -> Result<Vec<ReconciledTransaction>> {
        let doc = open_document(path)?;
        Ok(self.process(&doc).await)
    }

    /// Spending report for already-processed transactions
    pub async fn analyze(
        &self,
        transactions: &[ReconciledTransaction],
        goal: &SavingsGoal,
        today: NaiveDate,
    ) -> SpendingReport {
        SpendingAnalyzer::new(self.ai)
            .analyze(transactions.to_vec(), goal, today)
            .await
    }

    /// Process a document and hand the result to a store
    ///
    /// The statement's transaction count is updated after the rows are
    /// saved. Store failures are returned to the caller.
    pub async fn import(
        &self,
        doc: &Document,
        owner: &str,
        statement_id: &str,
        store: &dyn TransactionStore,
    ) -> Result<Vec<ReconciledTransaction>> {
        let transactions = self.process(doc).await;
        let saved = store.save_transactions(owner, statement_id, &transactions)?;
        store.update_transaction_count(statement_id, saved)?;

        info!(owner, statement_id, saved, "Imported statement");
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::error::Error;
    use crate::models::Category;
    use crate::prompts::PromptId;
    use crate::store::MemoryStore;
    use std::io::Write;

    const STATEMENT: &str = "\
ACME BANK CHECKING STATEMENT
03/02/2024 STARBUCKS #1021 6.15
03/04/2024 SHELL OIL 4412 42.10
03/05/2024 PAYROLL DEPOSIT 2500.00
";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_heuristic_only_pipeline() {
        let doc = Document::from_text(STATEMENT);
        let transactions = StatementProcessor::new(None).process(&doc).await;

        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].description, "STARBUCKS #1021");
        assert_eq!(transactions[0].amount, -6.15);
        assert_eq!(transactions[0].date, Some(date("2024-03-02")));
        assert_eq!(transactions[0].category, Category::Food);
        assert_eq!(transactions[1].category, Category::Transport);
        assert_eq!(transactions[2].amount, 2500.0);
    }

    #[tokio::test]
    async fn test_empty_document_yields_nothing() {
        let doc = Document::from_text("");
        let ai = AIClient::Mock(MockBackend::failing());
        let transactions = StatementProcessor::new(Some(&ai)).process(&doc).await;
        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn test_failing_collaborator_degrades() {
        let doc = Document::from_text(STATEMENT);
        let ai = AIClient::Mock(MockBackend::failing());
        let processor = StatementProcessor::new(Some(&ai));

        let passes = processor.extract_passes(&doc).await;
        assert!(passes.semantic.is_empty());
        assert_eq!(passes.text.len(), 3);

        let transactions = processor.process(&doc).await;
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].category, Category::Food);
    }

    #[tokio::test]
    async fn test_larger_semantic_pass_replaces_merge() {
        let ai = AIClient::Mock(MockBackend::new().with_response(
            PromptId::ExtractTransactions,
            r#"```json
[
  {"date": "2024-03-02", "description": "STARBUCKS STORE 1021", "amount": -6.15},
  {"date": "2024-03-03", "description": "NETFLIX.COM", "amount": "-15.49"},
  {"date": "2024-03-04", "description": "SHELL OIL 4412", "amount": -42.10},
  {"date": "2024-03-05", "description": "PAYROLL DEPOSIT", "amount": 2500},
  {"date": "2024-03-06", "description": "CITY ELECTRIC", "amount": -88.00}
]
```"#,
        ));
        let doc = Document::from_text(STATEMENT);
        let transactions = StatementProcessor::new(Some(&ai)).process(&doc).await;

        assert_eq!(transactions.len(), 5);
        assert_eq!(transactions[1].description, "NETFLIX.COM");
        assert_eq!(transactions[1].amount, -15.49);
        assert!(transactions.iter().all(|t| t.amount != 0.0));
    }

    #[tokio::test]
    async fn test_process_path_reads_text_statement() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(STATEMENT.as_bytes()).unwrap();

        let transactions = StatementProcessor::new(None)
            .process_path(file.path())
            .await
            .unwrap();
        assert_eq!(transactions.len(), 3);
    }

    #[tokio::test]
    async fn test_process_path_unsupported_format() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let err = StatementProcessor::new(None)
            .process_path(file.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_import_saves_and_counts() {
        let store = MemoryStore::new();
        let doc = Document::from_text(STATEMENT);
        let transactions = StatementProcessor::new(None)
            .import(&doc, "user-7", "stmt-42", &store)
            .await
            .unwrap();

        let statement = store.statement("stmt-42").unwrap();
        assert_eq!(statement.owner, "user-7");
        assert_eq!(statement.transaction_count, transactions.len());
        assert_eq!(statement.transactions, transactions);
    }

    #[tokio::test]
    async fn test_analyze_report() {
        let doc = Document::from_text(STATEMENT);
        let processor = StatementProcessor::new(None);
        let transactions = processor.process(&doc).await;

        let goal = SavingsGoal::new(1000.0)
            .with_current(400.0)
            .with_target_date(date("2024-03-10"));
        let report = processor
            .analyze(&transactions, &goal, date("2024-03-01"))
            .await;

        assert_eq!(report.category_totals.get(Category::Transport), Some(42.1));
        assert_eq!(report.category_totals.get(Category::Food), Some(6.15));
        // 600 over the 30-day floor
        assert_eq!(report.suggestion.daily_savings_amount, 20.0);
        assert_eq!(report.quests[0].name, "No transport spend today");
        assert!(report.quests.len() <= 6);
    }
}
