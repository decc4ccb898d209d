//! Transaction building: validation, the running-balance cursor, and fingerprints.

use passbook_core::{
    Checkpoint, Malformed, OccurrenceCounter, ParsedFields, ParserConfig, PeriodBounds,
    RejectReason, SignedAmount, Transaction,
};
use rust_decimal::Decimal;

/// Result of checking a printed balance row against the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// No balance was known yet; the checkpoint is the opening balance.
    Seeded,
    Matched,
    /// The cursor disagreed and was moved to the printed balance.
    Mismatch { expected: Decimal },
}

/// Owns one document's running balance and occurrence counts. Not shared across documents.
#[derive(Debug)]
pub struct TransactionBuilder {
    account: String,
    tolerance: Decimal,
    period: Option<PeriodBounds>,
    max_description_len: usize,
    cursor: Option<Decimal>,
    occurrences: OccurrenceCounter,
}

impl TransactionBuilder {
    pub fn new(account: impl Into<String>, config: &ParserConfig) -> Self {
        Self {
            account: account.into(),
            tolerance: config.tolerance,
            period: config.period,
            max_description_len: config.max_description_len,
            cursor: None,
            occurrences: OccurrenceCounter::new(),
        }
    }

    /// Balance after the last accepted transaction or checkpoint.
    pub fn previous_balance(&self) -> Option<Decimal> {
        self.cursor
    }

    pub fn build(
        &mut self,
        fields: &ParsedFields,
        signed: SignedAmount,
    ) -> Result<Transaction, Malformed> {
        if let Some(period) = self.period {
            if period.is_future(fields.date) {
                return Err(Malformed::new(
                    RejectReason::FutureDate,
                    format!("{} is after the period end {}", fields.date, period.end),
                ));
            }
        }

        let description: String = fields
            .description
            .trim()
            .chars()
            .take(self.max_description_len)
            .collect();
        let description = description.trim_end().to_string();
        if description.is_empty() {
            return Err(Malformed::new(
                RejectReason::EmptyDescription,
                "description is empty",
            ));
        }

        if let Some(previous) = self.cursor {
            let expected = previous + signed.value;
            if (expected - fields.balance).abs() > self.tolerance {
                return Err(Malformed::new(
                    RejectReason::BalanceMismatch,
                    format!(
                        "{previous} {:+} = {expected}, statement shows {}",
                        signed.value, fields.balance
                    ),
                ));
            }
        }

        let fingerprint = self
            .occurrences
            .next(fields.date, &description, signed.value);
        self.cursor = Some(fields.balance);

        Ok(Transaction::new(
            fields.date,
            description,
            fields.mode.clone(),
            signed.value,
            fields.balance,
            self.account.clone(),
            fields.page,
            fingerprint,
        ))
    }

    /// Move the cursor to a printed balance after a rejected block.
    pub fn resync(&mut self, balance: Decimal) {
        self.cursor = Some(balance);
    }

    pub fn checkpoint(&mut self, checkpoint: Checkpoint) -> CheckpointOutcome {
        let outcome = match self.cursor {
            None => CheckpointOutcome::Seeded,
            Some(expected) if (expected - checkpoint.balance).abs() <= self.tolerance => {
                CheckpointOutcome::Matched
            }
            Some(expected) => CheckpointOutcome::Mismatch { expected },
        };
        self.cursor = Some(checkpoint.balance);
        outcome
    }
}
