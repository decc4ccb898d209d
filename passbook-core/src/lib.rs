//! passbook-core: statement records, decimal amounts, fingerprints and parser configuration

pub mod amount;
pub mod config;
pub mod fingerprint;
pub mod record;
pub mod reject;
pub mod statement;

pub use amount::{format_amount, parse_amount};
pub use config::{DateGrammar, NoiseRules, ParserConfig, PeriodBounds, SplitHeuristic};
pub use fingerprint::{Fingerprint, OccurrenceCounter, normalize_description};
pub use record::{
    Checkpoint, ExistingRecord, LineRange, ParsedFields, RawLine, ResolutionTier, SignedAmount,
    Transaction, TransactionBlock,
};
pub use reject::{Malformed, RejectReason, Rejection};
pub use statement::{ParsedStatement, Phase, StatementSummary};
