use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use passbook_core::{ExistingRecord, ParsedStatement, Transaction};
use passbook_ingest::StatementParser;
use passbook_ingest::layouts::icici;
use passbook_ledger::{
    Category, ImportError, ImportOptions, Importer, LedgerSink, MemoryLedger, SinkError,
};
use rust_decimal::Decimal;

const STATEMENT: &str = "\
DATE        MODE**   PARTICULARS                      DEPOSITS    WITHDRAWALS       BALANCE
01-07-2025           B/F                                                        6,57,619.05
01-07-2025           UPI/merchant/ref                                 12.00     6,57,607.05
                     /okaxis/Payment
02-07-2025           NEFT/ACME PAYROLL              50,000.00                   7,07,607.05
                     Total:                         50,000.00         12.00
";

const REPEATS: &str = "\
DATE        MODE**   PARTICULARS                      DEPOSITS    WITHDRAWALS       BALANCE
01-07-2025           B/F                                                        6,57,619.05
01-07-2025           UPI/merchant/ref                                 12.00     6,57,607.05
01-07-2025           UPI/merchant/ref                                 12.00     6,57,595.05
";

const FIRST_HALF: &str = "\
DATE        MODE**   PARTICULARS                      DEPOSITS    WITHDRAWALS       BALANCE
01-07-2025           B/F                                                        6,57,619.05
02-07-2025           UPI/merchant/ref                                 12.00     6,57,607.05
02-07-2025           UPI/merchant/ref                                 12.00     6,57,595.05
";

const SECOND_HALF: &str = "\
DATE        MODE**   PARTICULARS                      DEPOSITS    WITHDRAWALS       BALANCE
02-07-2025           B/F                                                        6,57,619.05
02-07-2025           UPI/merchant/ref                                 12.00     6,57,607.05
02-07-2025           UPI/merchant/ref                                 12.00     6,57,595.05
03-07-2025           NEFT/ACME PAYROLL              50,000.00                   7,07,595.05
";

const AUGUST: &str = "\
DATE        MODE**   PARTICULARS                      DEPOSITS    WITHDRAWALS       BALANCE
01-08-2025           B/F                                                        7,07,607.05
01-08-2025           UPI/merchant/ref                                 12.00     7,07,595.05
";

fn parse(text: &str) -> ParsedStatement {
    StatementParser::new(icici::config())
        .unwrap()
        .parse("icici", &[text.to_string()])
}

fn quick() -> ImportOptions {
    ImportOptions {
        retries: 1,
        retry_delay: Duration::from_millis(1),
        ..ImportOptions::default()
    }
}

#[tokio::test]
async fn test_second_import_inserts_nothing() {
    let ledger = MemoryLedger::new();
    let importer = Importer::new(ledger.clone(), quick());
    let stmt = parse(STATEMENT);

    let first = importer.import("jul.txt", "icici", &stmt, false).await.unwrap();
    assert_eq!(first.parsed, 2);
    assert_eq!(first.inserted, 2);
    assert_eq!(first.duplicates, 0);

    let second = importer.import("jul.txt", "icici", &stmt, false).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 2);
    assert_eq!(ledger.committed().len(), 2);
}

#[tokio::test]
async fn test_same_day_repeats_are_both_posted() {
    let ledger = MemoryLedger::new();
    let importer = Importer::new(ledger.clone(), quick());
    let stmt = parse(REPEATS);
    assert_eq!(stmt.transactions.len(), 2);

    let report = importer.import("rep.txt", "icici", &stmt, false).await.unwrap();
    assert_eq!(report.inserted, 2);

    let posted = ledger.committed();
    assert_ne!(
        posted[0].transaction.fingerprint(),
        posted[1].transaction.fingerprint()
    );
}

#[tokio::test]
async fn test_outage_commits_nothing_and_preserves_statement() {
    let ledger = MemoryLedger::with_outage_after(1);
    let importer = Importer::new(ledger.clone(), quick());
    let stmt = parse(STATEMENT);

    let err = importer
        .import("jul.txt", "icici", &stmt, false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ImportError::ReconciliationUnavailable {
            source: SinkError::Unavailable(_),
            ..
        }
    ));
    assert_eq!(err.preserved().transactions.len(), 2);
    assert!(ledger.committed().is_empty());
}

#[tokio::test]
async fn test_dry_run_commits_nothing() {
    let ledger = MemoryLedger::new();
    let importer = Importer::new(ledger.clone(), quick());

    let report = importer
        .import("jul.txt", "icici", &parse(STATEMENT), true)
        .await
        .unwrap();
    assert!(report.dry_run);
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.inserted, 0);
    assert!(ledger.committed().is_empty());
}

#[tokio::test]
async fn test_opening_balance_is_posted_as_starting_balance() {
    let ledger = MemoryLedger::new();
    let options = ImportOptions {
        post_opening_balance: true,
        ..quick()
    };
    let importer = Importer::new(ledger.clone(), options);
    let stmt = parse(STATEMENT);

    let report = importer.import("jul.txt", "icici", &stmt, false).await.unwrap();
    assert_eq!(report.inserted, 3);

    let posted = ledger.committed();
    assert_eq!(posted[0].category, Category::StartingBalances);
    assert_eq!(posted[0].transaction.description(), "Opening Balance");
    assert_eq!(posted[1].category, Category::Transfer);
    assert_eq!(posted[2].category, Category::Income);

    let again = importer.import("jul.txt", "icici", &stmt, false).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 3);
}

#[tokio::test]
async fn test_overlapping_statements_post_only_new_rows() {
    let ledger = MemoryLedger::new();
    let importer = Importer::new(ledger.clone(), quick());

    let first = importer
        .import("jul-a.txt", "icici", &parse(FIRST_HALF), false)
        .await
        .unwrap();
    assert_eq!(first.inserted, 2);

    let second = importer
        .import("jul-b.txt", "icici", &parse(SECOND_HALF), false)
        .await
        .unwrap();
    assert_eq!(second.parsed, 3);
    assert_eq!(second.inserted, 1);
    assert_eq!(second.duplicates, 2);
    assert_eq!(ledger.committed().len(), 3);
}

#[tokio::test]
async fn test_opening_balance_posted_once_per_account() {
    let ledger = MemoryLedger::new();
    let options = ImportOptions {
        post_opening_balance: true,
        ..quick()
    };
    let importer = Importer::new(ledger.clone(), options);

    let jul = importer
        .import("jul.txt", "icici", &parse(STATEMENT), false)
        .await
        .unwrap();
    assert_eq!(jul.inserted, 3);

    let aug = importer
        .import("aug.txt", "icici", &parse(AUGUST), false)
        .await
        .unwrap();
    assert_eq!(aug.inserted, 1);
    assert_eq!(aug.duplicates, 0);

    let posted = ledger.committed();
    let openings = posted
        .iter()
        .filter(|r| r.category == Category::StartingBalances)
        .count();
    assert_eq!(openings, 1);
    let total: Decimal = posted.iter().map(|r| r.transaction.amount()).sum();
    assert_eq!(total, parse(AUGUST).transactions[0].balance());
}

#[tokio::test]
async fn test_concurrent_imports_do_not_double_post() {
    let ledger = MemoryLedger::new();
    let importer = Importer::new(ledger.clone(), quick());
    let stmt = parse(STATEMENT);

    let (a, b) = tokio::join!(
        importer.import("a.txt", "icici", &stmt, false),
        importer.import("b.txt", "icici", &stmt, false)
    );
    assert_eq!(a.unwrap().inserted + b.unwrap().inserted, 2);
    assert_eq!(ledger.committed().len(), 2);
}

/// Sees nothing on fetch but already holds every record.
struct ConflictingLedger;

#[async_trait]
impl LedgerSink for ConflictingLedger {
    async fn list_existing(
        &mut self,
        _account: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<ExistingRecord>, SinkError> {
        Ok(Vec::new())
    }

    async fn create(&mut self, _account: &str, txn: &Transaction) -> Result<(), SinkError> {
        Err(SinkError::Conflict(txn.fingerprint().to_string()))
    }
}

#[tokio::test]
async fn test_conflict_counts_as_duplicate() {
    let importer = Importer::new(ConflictingLedger, quick());
    let report = importer
        .import("jul.txt", "icici", &parse(STATEMENT), false)
        .await
        .unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.duplicates, 2);
}

/// Fetch fails once, then recovers.
struct FlakyLedger {
    inner: MemoryLedger,
    failures: u32,
}

#[async_trait]
impl LedgerSink for FlakyLedger {
    async fn list_existing(
        &mut self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingRecord>, SinkError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SinkError::Unavailable("timeout".to_string()));
        }
        self.inner.list_existing(account, from, to).await
    }

    async fn create(&mut self, account: &str, txn: &Transaction) -> Result<(), SinkError> {
        self.inner.create(account, txn).await
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) {
        self.inner.rollback().await
    }
}

#[tokio::test]
async fn test_fetch_is_retried() {
    let ledger = MemoryLedger::new();
    let flaky = FlakyLedger {
        inner: ledger.clone(),
        failures: 1,
    };
    let importer = Importer::new(flaky, quick());
    let report = importer
        .import("jul.txt", "icici", &parse(STATEMENT), false)
        .await
        .unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(ledger.committed().len(), 2);

    let exhausted = Importer::new(
        FlakyLedger {
            inner: MemoryLedger::new(),
            failures: 5,
        },
        quick(),
    );
    assert!(
        exhausted
            .import("jul.txt", "icici", &parse(STATEMENT), false)
            .await
            .is_err()
    );
}
