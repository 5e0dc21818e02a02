//! Persistence boundary
//!
//! The engine never persists by itself. Callers hand reconciled results to a
//! `TransactionStore`; `MemoryStore` keeps them in process for tests and
//! embedding.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::ReconciledTransaction;

/// Receives reconciled transactions for an owner and a parent statement
pub trait TransactionStore: Send + Sync {
    /// Store transactions; returns how many were saved
    fn save_transactions(
        &self,
        owner: &str,
        statement_id: &str,
        transactions: &[ReconciledTransaction],
    ) -> Result<usize>;

    /// Record the transaction count on the statement record
    fn update_transaction_count(&self, statement_id: &str, count: usize) -> Result<()>;
}

/// Stored rows for one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredStatement {
    pub owner: String,
    pub transactions: Vec<ReconciledTransaction>,
    pub transaction_count: usize,
}

/// In-memory store keyed by statement id
#[derive(Debug, Default)]
pub struct MemoryStore {
    statements: Mutex<HashMap<String, StoredStatement>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement(&self, statement_id: &str) -> Option<StoredStatement> {
        self.statements
            .lock()
            .ok()
            .and_then(|s| s.get(statement_id).cloned())
    }

    /// All transactions saved for an owner, across statements
    pub fn transactions_for_owner(&self, owner: &str) -> Vec<ReconciledTransaction> {
        let Ok(statements) = self.statements.lock() else {
            return Vec::new();
        };
        statements
            .values()
            .filter(|s| s.owner == owner)
            .flat_map(|s| s.transactions.iter().cloned())
            .collect()
    }
}

impl TransactionStore for MemoryStore {
    fn save_transactions(
        &self,
        owner: &str,
        statement_id: &str,
        transactions: &[ReconciledTransaction],
    ) -> Result<usize> {
        let mut statements = self
            .statements
            .lock()
            .map_err(|_| Error::InvalidData("Memory store lock poisoned".into()))?;
        let entry = statements.entry(statement_id.to_string()).or_default();
        if !entry.owner.is_empty() && entry.owner != owner {
            return Err(Error::InvalidData(format!(
                "Statement {} belongs to another owner",
                statement_id
            )));
        }
        entry.owner = owner.to_string();
        entry.transactions.extend_from_slice(transactions);
        Ok(transactions.len())
    }

    fn update_transaction_count(&self, statement_id: &str, count: usize) -> Result<()> {
        let mut statements = self
            .statements
            .lock()
            .map_err(|_| Error::InvalidData("Memory store lock poisoned".into()))?;
        let statement = statements.get_mut(statement_id).ok_or_else(|| {
            Error::InvalidData(format!("Unknown statement: {}", statement_id))
        })?;
        statement.transaction_count = count;
        Ok(())
    }
}
