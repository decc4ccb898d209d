//! Deterministic transaction fingerprints for duplicate detection across runs.
//!
//! A fingerprint hashes `(date, normalized description, signed amount, occurrence)`. The
//! occurrence index counts identical triples seen earlier in the same sequence, so two genuine
//! same-day coffees for the same amount stay distinct while a re-import of either collides.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

use crate::amount::format_amount;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(date: NaiveDate, description: &str, amount: Decimal, occurrence: u32) -> Self {
        let input = format!(
            "{}|{}|{}|{}",
            date,
            normalize_description(description),
            format_amount(amount),
            occurrence
        );

        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        let digest = hasher.finalize();

        // First 16 bytes as hex
        Self(digest[..16].iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase and collapse whitespace so cosmetic differences do not change identity.
pub fn normalize_description(description: &str) -> String {
    description
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hands out fingerprints while counting repeated `(date, description, amount)` triples.
///
/// Each pipeline run and each ledger snapshot gets its own counter; both sides must walk their
/// records through a counter for the fingerprints to line up.
#[derive(Debug, Default, Clone)]
pub struct OccurrenceCounter {
    seen: HashMap<(NaiveDate, String, String), u32>,
}

impl OccurrenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint for the next occurrence of this triple.
    pub fn next(&mut self, date: NaiveDate, description: &str, amount: Decimal) -> Fingerprint {
        let key = (date, normalize_description(description), format_amount(amount));
        let count = self.seen.entry(key).or_insert(0);
        let fingerprint = Fingerprint::compute(date, description, amount, *count);
        *count += 1;
        fingerprint
    }
}
