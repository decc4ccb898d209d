//! Block-level rejection taxonomy.
//!
//! A rejection never escalates: the block is dropped, a `Rejection` is recorded in the
//! statement, and parsing continues with the next block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{LineRange, TransactionBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    #[error("NO_BALANCE_TOKEN")]
    NoBalanceToken,
    #[error("AMBIGUOUS_COLUMNS")]
    AmbiguousColumns,
    #[error("BALANCE_MISMATCH")]
    BalanceMismatch,
    #[error("EMPTY_DESCRIPTION")]
    EmptyDescription,
    #[error("FUTURE_DATE")]
    FutureDate,
}

/// Why a single block could not become a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {detail}")]
pub struct Malformed {
    pub reason: RejectReason,
    pub detail: String,
}

impl Malformed {
    pub fn new(reason: RejectReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Operator-facing diagnostic for one rejected block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub page: usize,
    pub lines: LineRange,
    pub reason: RejectReason,
    pub detail: String,
}

impl Rejection {
    pub fn new(block: &TransactionBlock, malformed: Malformed) -> Self {
        Self {
            page: block.page,
            lines: block.line_range(),
            reason: malformed.reason,
            detail: malformed.detail,
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "page {} lines {}: {} ({})",
            self.page + 1,
            self.lines,
            self.reason,
            self.detail
        )
    }
}
