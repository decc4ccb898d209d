//! Reconciliation: which freshly parsed transactions are not yet in the ledger.
//!
//! Existing records are walked through their own `OccurrenceCounter`, in the order the ledger
//! returned them, so their fingerprints line up with those the builder assigned.

use std::collections::HashSet;

use passbook_core::{ExistingRecord, Fingerprint, OccurrenceCounter, Transaction};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub to_insert: Vec<Transaction>,
    pub duplicates: usize,
    pub rejected: usize,
}

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Fingerprints of posted records, recomputed exactly as the builder computes them.
    pub fn fingerprints(existing: &[ExistingRecord]) -> HashSet<Fingerprint> {
        let mut counter = OccurrenceCounter::new();
        existing
            .iter()
            .map(|r| counter.next(r.date, &r.description, r.amount))
            .collect()
    }

    /// Insert every new record whose fingerprint is not already posted. `rejected` is carried
    /// through from parsing for the report.
    pub fn reconcile(
        new_records: &[Transaction],
        existing: &[ExistingRecord],
        rejected: usize,
    ) -> ReconciliationResult {
        let posted = Self::fingerprints(existing);
        let (duplicates, to_insert): (Vec<&Transaction>, Vec<&Transaction>) = new_records
            .iter()
            .partition(|t| posted.contains(t.fingerprint()));

        ReconciliationResult {
            to_insert: to_insert.into_iter().cloned().collect(),
            duplicates: duplicates.len(),
            rejected,
        }
    }
}
