//! Per-document parse output and its summary figures.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::record::{Checkpoint, Transaction};
use crate::reject::Rejection;

/// Run phases, in order. A block failure never leaves `Parsing`/`Building`; a sink failure
/// aborts during `Reconciling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Parsing,
    Building,
    Reconciling,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Init => "INIT",
            Phase::Parsing => "PARSING",
            Phase::Building => "BUILDING",
            Phase::Reconciling => "RECONCILING",
            Phase::Done => "DONE",
        };
        f.write_str(s)
    }
}

/// Everything one document produced: accepted transactions in document order plus the
/// diagnostics for every rejected block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub account: String,
    pub transactions: Vec<Transaction>,
    pub rejections: Vec<Rejection>,
    /// First balance checkpoint (B/F row), if the document printed one.
    pub opening: Option<Checkpoint>,
    /// Continuation lines dropped because no block was open.
    pub discarded_lines: usize,
}

impl ParsedStatement {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            transactions: Vec::new(),
            rejections: Vec::new(),
            opening: None,
            discarded_lines: 0,
        }
    }

    /// Blocks seen: accepted plus rejected.
    pub fn parsed_count(&self) -> usize {
        self.transactions.len() + self.rejections.len()
    }

    /// Earliest and latest transaction date (including the opening checkpoint).
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self
            .transactions
            .iter()
            .map(|t| t.date())
            .chain(self.opening.map(|c| c.date));
        let (mut lo, mut hi) = (None::<NaiveDate>, None::<NaiveDate>);
        for d in dates {
            lo = Some(lo.map_or(d, |l| l.min(d)));
            hi = Some(hi.map_or(d, |h| h.max(d)));
        }
        lo.zip(hi)
    }

    pub fn summary(&self, tolerance: Decimal) -> StatementSummary {
        let total_deposits: Decimal = self
            .transactions
            .iter()
            .filter(|t| t.is_inflow())
            .map(|t| t.amount())
            .sum();
        let total_withdrawals: Decimal = self
            .transactions
            .iter()
            .filter(|t| t.is_outflow())
            .map(|t| -t.amount())
            .sum();

        let opening_balance = self.opening.map(|c| c.balance).or_else(|| {
            self.transactions
                .first()
                .map(|t| t.balance() - t.amount())
        });
        let closing_balance = self.transactions.last().map(|t| t.balance());

        let verified = match (opening_balance, closing_balance) {
            (Some(open), Some(close)) => {
                (open + total_deposits - total_withdrawals - close).abs() <= tolerance
            }
            _ => false,
        };

        StatementSummary {
            opening_balance,
            total_deposits,
            total_withdrawals,
            closing_balance,
            verified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSummary {
    pub opening_balance: Option<Decimal>,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub closing_balance: Option<Decimal>,
    /// opening + deposits - withdrawals == closing, within tolerance.
    pub verified: bool,
}
