//! Statement extraction and JSON export

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use savepop_core::ai::AIClient;
use savepop_core::document::open_document;
use savepop_core::models::ReconciledTransaction;
use savepop_core::pipeline::StatementProcessor;
use savepop_core::store::TransactionStore;
use serde::{Deserialize, Serialize};

use super::{format_amount, truncate};

/// Where `extract --out` writes its result
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub path: PathBuf,
    pub owner: String,
    pub statement_id: String,
}

/// Default statement id: the file stem
pub fn statement_id_for(file: &Path) -> String {
    file.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("statement")
        .to_string()
}

/// Contents of an export file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub owner: String,
    pub statement_id: String,
    pub transaction_count: usize,
    pub transactions: Vec<ReconciledTransaction>,
}

/// Transaction store backed by a single JSON file
pub struct JsonExportStore {
    path: PathBuf,
}

impl JsonExportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read(&self) -> savepop_core::Result<ExportRecord> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, record: &ExportRecord) -> savepop_core::Result<()> {
        fs::write(&self.path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }
}

impl TransactionStore for JsonExportStore {
    fn save_transactions(
        &self,
        owner: &str,
        statement_id: &str,
        transactions: &[ReconciledTransaction],
    ) -> savepop_core::Result<usize> {
        self.write(&ExportRecord {
            owner: owner.to_string(),
            statement_id: statement_id.to_string(),
            transaction_count: 0,
            transactions: transactions.to_vec(),
        })?;
        Ok(transactions.len())
    }

    fn update_transaction_count(&self, statement_id: &str, count: usize) -> savepop_core::Result<()> {
        let mut record = self.read()?;
        if record.statement_id != statement_id {
            return Err(savepop_core::Error::InvalidData(format!(
                "Export file holds statement {}, not {}",
                record.statement_id, statement_id
            )));
        }
        record.transaction_count = count;
        self.write(&record)
    }
}

/// Extract a statement and print (and optionally export) its transactions
pub async fn cmd_extract(
    ai: Option<&AIClient>,
    file: &Path,
    json: bool,
    export: Option<&ExportTarget>,
) -> Result<()> {
    let processor = StatementProcessor::new(ai);

    let transactions = match export {
        Some(target) => {
            let doc = open_document(file)
                .with_context(|| format!("Failed to open statement: {}", file.display()))?;
            let store = JsonExportStore::new(&target.path);
            processor
                .import(&doc, &target.owner, &target.statement_id, &store)
                .await
                .with_context(|| format!("Failed to write export: {}", target.path.display()))?
        }
        None => processor
            .process_path(file)
            .await
            .with_context(|| format!("Failed to open statement: {}", file.display()))?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
    } else {
        print_transactions(file, &transactions);
    }

    if let Some(target) = export {
        if !json {
            println!();
            println!(
                "💾 Exported {} transactions to {}",
                transactions.len(),
                target.path.display()
            );
        }
    }

    Ok(())
}

fn print_transactions(file: &Path, transactions: &[ReconciledTransaction]) {
    println!();
    println!("📄 {}", file.display());

    if transactions.is_empty() {
        println!("   No transactions found.");
        return;
    }

    println!();
    println!(
        "   {:<10}  {:<40}  {:>12}  {}",
        "DATE", "DESCRIPTION", "AMOUNT", "CATEGORY"
    );
    println!("   {}", "-".repeat(80));

    for tx in transactions {
        let date = tx
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {:<10}  {:<40}  {:>12}  {}",
            date,
            truncate(&tx.description, 40),
            format_amount(tx.amount),
            tx.category
        );
    }

    let outflow: f64 = transactions
        .iter()
        .filter(|t| t.amount < 0.0)
        .map(|t| t.amount.abs())
        .sum();
    println!();
    println!(
        "   {} transactions, {} spent",
        transactions.len(),
        format_amount(outflow)
    );
}
