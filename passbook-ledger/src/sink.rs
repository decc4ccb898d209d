//! The ledger sink capability and an in-process implementation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use passbook_core::{ExistingRecord, Fingerprint, Transaction};
use serde::{Deserialize, Serialize};

use crate::category_rules::{Category, categorize};
use crate::error::SinkError;

/// Destination ledger. `create` stages; nothing is visible until `commit`.
#[async_trait]
pub trait LedgerSink: Send {
    async fn list_existing(
        &mut self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingRecord>, SinkError>;

    async fn create(&mut self, account: &str, txn: &Transaction) -> Result<(), SinkError>;

    async fn commit(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Drop everything staged since the last commit.
    async fn rollback(&mut self) {}
}

/// A committed ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedRecord {
    pub account: String,
    pub transaction: Transaction,
    pub category: Category,
}

#[derive(Debug, Default)]
struct Book {
    committed: Vec<PostedRecord>,
    staged: Vec<PostedRecord>,
    /// Fail every `create` after this many successful ones.
    outage_after: Option<usize>,
    creates: usize,
}

/// In-memory ledger. Clones share the same book, so a test can keep a handle after giving
/// the sink to an importer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    book: Arc<Mutex<Book>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Become unavailable after `creates` successful `create` calls.
    pub fn with_outage_after(creates: usize) -> Self {
        let ledger = Self::default();
        if let Ok(mut book) = ledger.book.lock() {
            book.outage_after = Some(creates);
        }
        ledger
    }

    pub fn committed(&self) -> Vec<PostedRecord> {
        self.book
            .lock()
            .map(|b| b.committed.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Book>, SinkError> {
        self.book
            .lock()
            .map_err(|_| SinkError::Unavailable("memory ledger poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerSink for MemoryLedger {
    async fn list_existing(
        &mut self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingRecord>, SinkError> {
        let book = self.lock()?;
        Ok(book
            .committed
            .iter()
            .filter(|r| r.account == account)
            .map(|r| &r.transaction)
            .filter(|t| t.date() >= from && t.date() <= to)
            .map(ExistingRecord::from)
            .collect())
    }

    async fn create(&mut self, account: &str, txn: &Transaction) -> Result<(), SinkError> {
        let mut book = self.lock()?;
        if book.outage_after.is_some_and(|n| book.creates >= n) {
            return Err(SinkError::Unavailable("simulated outage".to_string()));
        }

        let taken: HashSet<&Fingerprint> = book
            .committed
            .iter()
            .chain(book.staged.iter())
            .filter(|r| r.account == account)
            .map(|r| r.transaction.fingerprint())
            .collect();
        if taken.contains(txn.fingerprint()) {
            return Err(SinkError::Conflict(format!(
                "{} already recorded",
                txn.fingerprint()
            )));
        }

        book.creates += 1;
        book.staged.push(PostedRecord {
            account: account.to_string(),
            transaction: txn.clone(),
            category: categorize(txn),
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        let mut book = self.lock()?;
        let staged = std::mem::take(&mut book.staged);
        book.committed.extend(staged);
        Ok(())
    }

    async fn rollback(&mut self) {
        if let Ok(mut book) = self.book.lock() {
            book.staged.clear();
        }
    }
}
