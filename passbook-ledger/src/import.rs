//! The posting phase for one parsed document.
//!
//! `RECONCILING`: fetch what the ledger already holds for the statement's date range, keep the
//! records it does not, stage them with `create` and `commit` once. Any sink outage after
//! staging began rolls the whole document back.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use passbook_core::{ExistingRecord, Fingerprint, ParsedStatement, Phase, Transaction};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::category_rules::OPENING_BALANCE;
use crate::error::{ImportError, SinkError};
use crate::reconcile::ReconciliationEngine;
use crate::report::DocumentReport;
use crate::sink::LedgerSink;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Extra attempts after an `Unavailable` fetch or commit.
    pub retries: u32,
    pub retry_delay: Duration,
    /// Prepend an "Opening Balance" record when the statement printed one and the ledger holds
    /// nothing for the account before that date.
    pub post_opening_balance: bool,
    /// Used for the statement summary in the report.
    pub tolerance: Decimal,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_delay: Duration::from_millis(500),
            post_opening_balance: false,
            tolerance: Decimal::new(1, 2),
        }
    }
}

/// Posts parsed statements into one sink. Clones share the sink; writes are serialised
/// through its mutex so a fetch never races another document's inserts.
#[derive(Clone)]
pub struct Importer {
    sink: Arc<Mutex<Box<dyn LedgerSink>>>,
    options: ImportOptions,
}

impl Importer {
    pub fn new(sink: impl LedgerSink + 'static, options: ImportOptions) -> Self {
        Self::with_sink(Box::new(sink), options)
    }

    pub fn with_sink(sink: Box<dyn LedgerSink>, options: ImportOptions) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            options,
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Records this statement would post onto an empty ledger, in document order.
    pub fn posting_set(&self, account: &str, statement: &ParsedStatement) -> Vec<Transaction> {
        self.opening_record(account, statement)
            .into_iter()
            .chain(statement.transactions.iter().cloned())
            .collect()
    }

    fn opening_record(&self, account: &str, statement: &ParsedStatement) -> Option<Transaction> {
        statement
            .opening
            .filter(|_| self.options.post_opening_balance)
            .filter(|c| !c.balance.is_zero())
            .map(|c| {
                Transaction::new(
                    c.date,
                    OPENING_BALANCE,
                    "",
                    c.balance,
                    c.balance,
                    account,
                    0,
                    Fingerprint::compute(c.date, OPENING_BALANCE, c.balance, 0),
                )
            })
    }

    pub async fn import(
        &self,
        document: &str,
        account: &str,
        statement: &ParsedStatement,
        dry_run: bool,
    ) -> Result<DocumentReport, ImportError> {
        let mut report = DocumentReport::new(document, statement, self.options.tolerance);
        report.account = account.to_string();
        report.dry_run = dry_run;

        let mut records = self.posting_set(account, statement);
        if date_span(&records).is_none() {
            debug!(document, phase = %Phase::Done, "nothing to post");
            return Ok(report);
        }

        let abort = |source: SinkError| ImportError::ReconciliationUnavailable {
            document: document.to_string(),
            account: account.to_string(),
            preserved: Box::new(statement.clone()),
            source,
        };

        let mut sink = self.sink.lock().await;

        // Later statements of the same account carry their balance forward from earlier records.
        if let Some(opening) = self.opening_record(account, statement) {
            let earlier = match opening.date().pred_opt() {
                Some(until) => self
                    .list_with_retry(sink.as_mut(), document, account, history_start(), until)
                    .await
                    .map_err(&abort)?,
                None => Vec::new(),
            };
            if !earlier.is_empty() {
                debug!(
                    document,
                    earlier = earlier.len(),
                    "account has history, opening balance not posted"
                );
                records.retain(|t| t.fingerprint() != opening.fingerprint());
            }
        }
        let Some((from, to)) = date_span(&records) else {
            debug!(document, phase = %Phase::Done, "nothing to post");
            return Ok(report);
        };
        debug!(document, phase = %Phase::Reconciling, %from, %to, "reconciling");

        let existing = self
            .list_with_retry(sink.as_mut(), document, account, from, to)
            .await
            .map_err(&abort)?;
        let result = ReconciliationEngine::reconcile(&records, &existing, report.rejected);
        report.duplicates = result.duplicates;

        if dry_run {
            report.records = result.to_insert;
            debug!(document, phase = %Phase::Done, "dry run");
            return Ok(report);
        }

        let mut inserted = Vec::with_capacity(result.to_insert.len());
        for txn in result.to_insert {
            match sink.create(account, &txn).await {
                Ok(()) => inserted.push(txn),
                Err(SinkError::Conflict(detail)) => {
                    debug!(document, fingerprint = %txn.fingerprint(), %detail, "already posted");
                    report.duplicates += 1;
                }
                Err(e) => {
                    sink.rollback().await;
                    return Err(abort(e));
                }
            }
        }

        if let Err(e) = self.commit_with_retry(sink.as_mut(), document).await {
            sink.rollback().await;
            return Err(abort(e));
        }

        report.inserted = inserted.len();
        report.records = inserted;
        debug!(
            document,
            phase = %Phase::Done,
            inserted = report.inserted,
            duplicates = report.duplicates,
            "posted"
        );
        Ok(report)
    }

    async fn list_with_retry(
        &self,
        sink: &mut dyn LedgerSink,
        document: &str,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingRecord>, SinkError> {
        let mut attempt = 0;
        loop {
            match sink.list_existing(account, from, to).await {
                Err(SinkError::Unavailable(detail)) if attempt < self.options.retries => {
                    attempt += 1;
                    warn!(document, attempt, %detail, "fetching existing records failed, retrying");
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    async fn commit_with_retry(
        &self,
        sink: &mut dyn LedgerSink,
        document: &str,
    ) -> Result<(), SinkError> {
        let mut attempt = 0;
        loop {
            match sink.commit().await {
                Err(SinkError::Unavailable(detail)) if attempt < self.options.retries => {
                    attempt += 1;
                    warn!(document, attempt, %detail, "commit failed, retrying");
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                other => return other,
            }
        }
    }
}

/// Lower bound for the account-history query; no statement predates it.
fn history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn date_span(records: &[Transaction]) -> Option<(NaiveDate, NaiveDate)> {
    let from = records.iter().map(Transaction::date).min()?;
    let to = records.iter().map(Transaction::date).max()?;
    Some((from, to))
}
