//! passbook-ledger: reconciliation against posted records, ledger sinks, categorisation and
//! the per-document posting phase.

pub mod category_rules;
pub mod csv_ledger;
pub mod error;
pub mod http_ledger;
pub mod import;
pub mod reconcile;
pub mod report;
pub mod sink;

pub use category_rules::{Category, UpiParticulars, categorize};
pub use csv_ledger::CsvLedger;
pub use error::{ImportError, SinkError};
pub use http_ledger::ActualHttpLedger;
pub use import::{ImportOptions, Importer};
pub use reconcile::{ReconciliationEngine, ReconciliationResult};
pub use report::DocumentReport;
pub use sink::{LedgerSink, MemoryLedger, PostedRecord};
