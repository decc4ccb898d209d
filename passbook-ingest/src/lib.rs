//! passbook-ingest: statement text to validated transactions.
//!
//! Pages flow through `LineClassifier` -> `BlockAssembler` -> `FieldExtractor` ->
//! `SignResolver` -> `TransactionBuilder`; `StatementParser` wires them together per document.

pub mod assemble;
pub mod builder;
pub mod classify;
pub mod error;
pub mod extract;
pub mod layouts;
pub mod pipeline;
pub mod sign;
pub mod source;
pub mod split;

pub use assemble::{BlockAssembler, raw_lines};
pub use builder::{CheckpointOutcome, TransactionBuilder};
pub use classify::{ClassifyContext, DateMatcher, LineClassifier, LineKind};
pub use error::IngestError;
pub use extract::FieldExtractor;
pub use pipeline::StatementParser;
pub use sign::SignResolver;
pub use source::{FallbackSource, PdfToTextSource, PlainTextSource, TextSource, source_for};
pub use split::{ColumnSplit, Side, strategy_for};
