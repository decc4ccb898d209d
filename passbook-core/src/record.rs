//! Record types flowing through the pipeline, leaf-first:
//! `RawLine` -> `TransactionBlock` -> `ParsedFields` -> `SignedAmount` -> `Transaction`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// One physical line of extracted page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    /// Zero-based page index within the document.
    pub page: usize,
    /// Zero-based line index within the page.
    pub line: usize,
    pub text: String,
}

impl RawLine {
    pub fn new(page: usize, line: usize, text: impl Into<String>) -> Self {
        Self {
            page,
            line,
            text: text.into(),
        }
    }
}

/// Inclusive range of line indexes on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub first: usize,
    pub last: usize,
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first + 1)
        } else {
            write!(f, "{}-{}", self.first + 1, self.last + 1)
        }
    }
}

/// The lines of one logical transaction: a start line plus any wrapped continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBlock {
    pub page: usize,
    pub start: RawLine,
    pub continuation: Vec<RawLine>,
}

impl TransactionBlock {
    pub fn new(start: RawLine) -> Self {
        Self {
            page: start.page,
            start,
            continuation: Vec::new(),
        }
    }

    pub fn push(&mut self, line: RawLine) {
        self.continuation.push(line);
    }

    /// Start line first, then continuations in document order.
    pub fn lines(&self) -> impl Iterator<Item = &RawLine> {
        std::iter::once(&self.start).chain(self.continuation.iter())
    }

    pub fn line_range(&self) -> LineRange {
        LineRange {
            first: self.start.line,
            last: self
                .continuation
                .last()
                .map(|l| l.line)
                .unwrap_or(self.start.line),
        }
    }
}

/// Typed fields pulled out of one block.
///
/// At most one of `deposit` / `withdrawal` is set. When neither is set, `candidates` holds the
/// amount tokens whose column could not be decided, for the balance-delta fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    /// Page the block was read from.
    pub page: usize,
    pub date: NaiveDate,
    pub mode: String,
    pub description: String,
    pub deposit: Option<Decimal>,
    pub withdrawal: Option<Decimal>,
    pub balance: Decimal,
    pub candidates: Vec<Decimal>,
}

/// Which rule decided a transaction's polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    DepositColumn,
    WithdrawalColumn,
    BalanceDelta,
}

/// Negative = outflow, positive = inflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedAmount {
    pub value: Decimal,
    pub tier: ResolutionTier,
}

/// A printed balance row (brought / carried forward) that is not itself a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub date: NaiveDate,
    pub balance: Decimal,
}

/// The canonical transaction record. Immutable once built; identity is the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    date: NaiveDate,
    description: String,
    mode: String,
    amount: Decimal,
    balance: Decimal,
    account: String,
    page: usize,
    fingerprint: Fingerprint,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        mode: impl Into<String>,
        amount: Decimal,
        balance: Decimal,
        account: impl Into<String>,
        page: usize,
        fingerprint: Fingerprint,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            mode: mode.into(),
            amount,
            balance,
            account: account.into(),
            page,
            fingerprint,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Signed amount: negative = outflow, positive = inflow.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Running balance after this transaction.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Page the transaction was read from (zero-based).
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn is_inflow(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_outflow(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

/// A transaction already posted to the ledger, as reported by the ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecord {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

impl ExistingRecord {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
        }
    }
}

impl From<&Transaction> for ExistingRecord {
    fn from(txn: &Transaction) -> Self {
        Self::new(txn.date(), txn.description(), txn.amount())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_line_range() {
        let mut block = TransactionBlock::new(RawLine::new(2, 10, "01-07-2025 UPI/x"));
        assert_eq!(block.line_range(), LineRange { first: 10, last: 10 });
        block.push(RawLine::new(2, 11, "/ref"));
        block.push(RawLine::new(2, 12, "12.00"));
        assert_eq!(block.line_range(), LineRange { first: 10, last: 12 });
        assert_eq!(block.line_range().to_string(), "11-13");
        assert_eq!(block.lines().count(), 3);
    }

    #[test]
    fn test_existing_record_from_transaction() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let amount = Decimal::new(-1200, 2);
        let txn = Transaction::new(
            date,
            "UPI/merchant/ref",
            "UPI",
            amount,
            Decimal::new(65760705, 2),
            "icici",
            0,
            Fingerprint::compute(date, "UPI/merchant/ref", amount, 0),
        );
        let existing = ExistingRecord::from(&txn);
        assert_eq!(existing.amount, amount);
        assert_eq!(existing.description, "UPI/merchant/ref");
        assert!(txn.is_outflow());
    }
}
