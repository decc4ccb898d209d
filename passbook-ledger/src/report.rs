//! Per-document outcome, as printed by the CLI and written by `--json`.

use passbook_core::{ParsedStatement, Rejection, StatementSummary, Transaction};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub document: String,
    pub account: String,
    /// Blocks seen: accepted plus rejected.
    pub parsed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
    pub summary: StatementSummary,
    pub dry_run: bool,
    /// Inserted records, or the would-be inserts of a dry run.
    pub records: Vec<Transaction>,
}

impl DocumentReport {
    /// Report for a statement that has not been posted yet.
    pub fn new(document: impl Into<String>, statement: &ParsedStatement, tolerance: Decimal) -> Self {
        Self {
            document: document.into(),
            account: statement.account.clone(),
            parsed: statement.parsed_count(),
            inserted: 0,
            duplicates: 0,
            rejected: statement.rejections.len(),
            rejections: statement.rejections.clone(),
            summary: statement.summary(tolerance),
            dry_run: false,
            records: Vec::new(),
        }
    }
}
