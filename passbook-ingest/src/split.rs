//! Column split strategies: decide whether a lone amount sits in the deposit or withdrawal
//! column from its character position.

use std::collections::BTreeMap;

use passbook_core::SplitHeuristic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Deposit,
    Withdrawal,
}

/// Position-based column assignment. Implementations may learn from page text before blocks
/// on that page are extracted.
pub trait ColumnSplit: Send {
    /// Called once per page, in order, before extraction.
    fn observe_page(&mut self, _page: usize, _text: &str) {}

    /// Column of a token spanning chars `start..end` on `page`, or `None` with no reliable signal.
    fn side(&self, page: usize, start: usize, end: usize) -> Option<Side>;
}

/// Tokens ending at or before `column` are deposits.
#[derive(Debug, Clone)]
pub struct FixedOffset {
    column: usize,
}

impl ColumnSplit for FixedOffset {
    fn side(&self, _page: usize, _start: usize, end: usize) -> Option<Side> {
        if end <= self.column {
            Some(Side::Deposit)
        } else {
            Some(Side::Withdrawal)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LearnedSplit {
    column: usize,
    deposit_first: bool,
}

/// Learns the split from a column header carrying both labels. A page without a header reuses
/// the last one seen.
#[derive(Debug, Clone)]
pub struct HeaderDerived {
    deposit_label: String,
    withdrawal_label: String,
    learned: BTreeMap<usize, LearnedSplit>,
}

impl HeaderDerived {
    fn learn(&self, line: &str) -> Option<LearnedSplit> {
        let upper = line.to_uppercase();
        let deposit_end = label_end(&upper, &self.deposit_label.to_uppercase())?;
        let withdrawal_end = label_end(&upper, &self.withdrawal_label.to_uppercase())?;
        Some(LearnedSplit {
            column: (deposit_end + withdrawal_end) / 2,
            deposit_first: deposit_end < withdrawal_end,
        })
    }
}

/// Char column just past `label` in `line`.
fn label_end(line: &str, label: &str) -> Option<usize> {
    let byte = line.find(label)? + label.len();
    Some(line[..byte].chars().count())
}

impl ColumnSplit for HeaderDerived {
    fn observe_page(&mut self, page: usize, text: &str) {
        if let Some(split) = text.lines().find_map(|line| self.learn(line)) {
            self.learned.insert(page, split);
        }
    }

    fn side(&self, page: usize, _start: usize, end: usize) -> Option<Side> {
        let (_, split) = self.learned.range(..=page).next_back()?;
        let left = end <= split.column;
        Some(if left == split.deposit_first {
            Side::Deposit
        } else {
            Side::Withdrawal
        })
    }
}

/// No positional signal at all; the running balance decides.
#[derive(Debug, Clone, Default)]
pub struct BalanceDelta;

impl ColumnSplit for BalanceDelta {
    fn side(&self, _page: usize, _start: usize, _end: usize) -> Option<Side> {
        None
    }
}

/// Fresh strategy state for one document.
pub fn strategy_for(heuristic: &SplitHeuristic) -> Box<dyn ColumnSplit> {
    match heuristic {
        SplitHeuristic::FixedOffset { column } => Box::new(FixedOffset { column: *column }),
        SplitHeuristic::HeaderDerived {
            deposit_label,
            withdrawal_label,
        } => Box::new(HeaderDerived {
            deposit_label: deposit_label.clone(),
            withdrawal_label: withdrawal_label.clone(),
            learned: BTreeMap::new(),
        }),
        SplitHeuristic::BalanceDelta => Box::new(BalanceDelta),
    }
}
