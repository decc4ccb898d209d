//! Parser configuration: the column/date grammar a statement layout is read with.
//!
//! One `ParserConfig` describes one document layout. Named presets live in
//! `passbook-ingest::layouts`; any field can be overridden from the CLI's TOML file.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub date: DateGrammar,
    pub noise: NoiseRules,
    /// Lines that close the open block (page totals): the terminator alone or followed by figures.
    pub terminators: Vec<String>,
    /// Descriptions that mark a balance row (brought/carried forward) rather than a transaction.
    pub balance_markers: Vec<String>,
    pub currency_symbols: Vec<String>,
    /// Channel tokens (UPI, NEFT, ...) recognised as the transaction mode.
    pub modes: Vec<String>,
    pub split: SplitHeuristic,
    /// Maximum allowed drift between printed and computed balances.
    pub tolerance: Decimal,
    pub period: Option<PeriodBounds>,
    /// Joins the description text of wrapped lines.
    pub description_separator: String,
    pub max_description_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            date: DateGrammar::default(),
            noise: NoiseRules::default(),
            terminators: vec!["Total:".to_string()],
            balance_markers: vec!["B/F".to_string(), "C/F".to_string()],
            currency_symbols: vec!["₹".to_string(), "Rs.".to_string(), "INR".to_string()],
            modes: ["UPI", "NEFT", "IMPS", "RTGS", "ATM", "CASH", "CHQ", "ACH", "NACH", "POS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            split: SplitHeuristic::default(),
            tolerance: Decimal::new(1, 2),
            period: None,
            description_separator: " ".to_string(),
            max_description_len: 100,
        }
    }
}

/// How a transaction row's leading date is recognised and parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateGrammar {
    /// Regex for the date token itself (no anchors).
    pub pattern: String,
    /// chrono format string for the token.
    pub format: String,
    /// The date token must start at or before this character column.
    pub max_column: usize,
    /// Year used when the format has none (e.g. `%m/%d` rows).
    pub year_hint: Option<i32>,
}

impl Default for DateGrammar {
    fn default() -> Self {
        Self {
            pattern: r"\d{2}-\d{2}-\d{4}".to_string(),
            format: "%d-%m-%Y".to_string(),
            max_column: 4,
            year_hint: None,
        }
    }
}

/// Boilerplate recognition. `exact` and `patterns` always apply and must match the whole
/// (trimmed, whitespace-collapsed) line. `header_prefixes` only apply while no block is open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseRules {
    pub exact: Vec<String>,
    pub patterns: Vec<String>,
    pub header_prefixes: Vec<String>,
}

/// Decides whether a lone amount token is a deposit or a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitHeuristic {
    /// Amounts ending at or before `column` are deposits; later ones are withdrawals.
    FixedOffset { column: usize },
    /// The split is learned from a header line carrying both labels.
    HeaderDerived {
        deposit_label: String,
        withdrawal_label: String,
    },
    /// Never assign by position; the running balance decides.
    BalanceDelta,
}

impl Default for SplitHeuristic {
    fn default() -> Self {
        SplitHeuristic::HeaderDerived {
            deposit_label: "DEPOSITS".to_string(),
            withdrawal_label: "WITHDRAWALS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodBounds {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// True when `date` falls after the statement period closed.
    pub fn is_future(&self, date: NaiveDate) -> bool {
        date > self.end
    }
}
