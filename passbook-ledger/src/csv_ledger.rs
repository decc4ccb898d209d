//! Local CSV ledger file: one row per posted transaction.
//!
//! Columns: account, date, description, amount, balance, category, fingerprint.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use passbook_core::{ExistingRecord, Transaction, format_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category_rules::categorize;
use crate::error::SinkError;
use crate::sink::LedgerSink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CsvRow {
    account: String,
    date: NaiveDate,
    description: String,
    amount: String,
    balance: String,
    category: String,
    fingerprint: String,
}

#[derive(Debug)]
pub struct CsvLedger {
    path: PathBuf,
    staged: Vec<CsvRow>,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> Result<Vec<CsvRow>, SinkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&self.path).map_err(unavailable(&self.path))?;
        rdr.deserialize()
            .collect::<Result<Vec<CsvRow>, _>>()
            .map_err(unavailable(&self.path))
    }
}

fn unavailable(path: &Path) -> impl Fn(csv::Error) -> SinkError + '_ {
    move |e| SinkError::Unavailable(format!("{}: {e}", path.display()))
}

#[async_trait]
impl LedgerSink for CsvLedger {
    async fn list_existing(
        &mut self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingRecord>, SinkError> {
        Ok(self
            .read_rows()?
            .into_iter()
            .filter(|r| r.account == account && r.date >= from && r.date <= to)
            .map(|r| {
                let amount = Decimal::from_str(&r.amount).map_err(|e| {
                    SinkError::Unavailable(format!("{}: bad amount {:?}: {e}", self.path.display(), r.amount))
                })?;
                Ok(ExistingRecord::new(r.date, r.description, amount))
            })
            .collect::<Result<Vec<_>, SinkError>>()?)
    }

    async fn create(&mut self, account: &str, txn: &Transaction) -> Result<(), SinkError> {
        let fingerprint = txn.fingerprint().to_string();
        if self
            .staged
            .iter()
            .any(|r| r.account == account && r.fingerprint == fingerprint)
        {
            return Err(SinkError::Conflict(format!("{fingerprint} already staged")));
        }
        self.staged.push(CsvRow {
            account: account.to_string(),
            date: txn.date(),
            description: txn.description().to_string(),
            amount: format_amount(txn.amount()),
            balance: format_amount(txn.balance()),
            category: categorize(txn).to_string(),
            fingerprint,
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        if self.staged.is_empty() {
            return Ok(());
        }

        let committed: HashSet<String> = self
            .read_rows()?
            .into_iter()
            .map(|r| format!("{}|{}", r.account, r.fingerprint))
            .collect();
        if let Some(dup) = self
            .staged
            .iter()
            .find(|r| committed.contains(&format!("{}|{}", r.account, r.fingerprint)))
        {
            return Err(SinkError::Conflict(format!(
                "{} already in {}",
                dup.fingerprint,
                self.path.display()
            )));
        }

        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::Unavailable(format!("{}: {e}", self.path.display())))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        for row in &self.staged {
            wtr.serialize(row).map_err(unavailable(&self.path))?;
        }
        wtr.flush()
            .map_err(|e| SinkError::Unavailable(format!("{}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), rows = self.staged.len(), "csv ledger committed");
        self.staged.clear();
        Ok(())
    }

    async fn rollback(&mut self) {
        self.staged.clear();
    }
}
