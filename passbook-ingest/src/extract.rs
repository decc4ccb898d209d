//! Field extraction: one block to typed fields.
//!
//! Each line is split on whitespace with char columns kept. The trailing run of amount tokens
//! on each line (start line after the date, and any wrapped line) forms the candidate list; the
//! rightmost candidate is the running balance. Amounts in the middle of a line stay in the
//! description.

use chrono::NaiveDate;
use passbook_core::{
    Checkpoint, Malformed, ParsedFields, ParserConfig, RejectReason, TransactionBlock,
    parse_amount,
};
use rust_decimal::Decimal;

use crate::classify::{DateMatcher, collapse};
use crate::split::{ColumnSplit, Side};

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    /// First char column.
    start: usize,
    /// One past the last char column.
    end: usize,
}

/// Whitespace tokens of `line[from..]`, with columns counted from the start of the line.
fn tokenize(line: &str, from: usize) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut col = line[..from].chars().count();
    let mut current: Option<(usize, usize)> = None;

    for (idx, ch) in line[from..].char_indices() {
        let idx = idx + from;
        if ch.is_whitespace() {
            if let Some((byte, start)) = current.take() {
                tokens.push(Token {
                    text: &line[byte..idx],
                    start,
                    end: col,
                });
            }
        } else if current.is_none() {
            current = Some((idx, col));
        }
        col += 1;
    }
    if let Some((byte, start)) = current {
        tokens.push(Token {
            text: &line[byte..],
            start,
            end: col,
        });
    }
    tokens
}

#[derive(Debug, Clone)]
struct Amount<'a> {
    value: Decimal,
    text: &'a str,
    start: usize,
    end: usize,
}

#[derive(Debug, Default)]
struct LineScan<'a> {
    words: Vec<&'a str>,
    run: Vec<Amount<'a>>,
}

#[derive(Debug)]
struct BlockScan<'a> {
    date: NaiveDate,
    description: String,
    first_word: Option<&'a str>,
    candidates: Vec<Amount<'a>>,
}

pub struct FieldExtractor {
    dates: DateMatcher,
    split: Box<dyn ColumnSplit>,
    currency_symbols: Vec<String>,
    modes: Vec<String>,
    balance_markers: Vec<String>,
    separator: String,
}

impl FieldExtractor {
    pub fn new(config: &ParserConfig, dates: DateMatcher, split: Box<dyn ColumnSplit>) -> Self {
        Self {
            dates,
            split,
            currency_symbols: config.currency_symbols.clone(),
            modes: config.modes.clone(),
            balance_markers: config.balance_markers.iter().map(|m| collapse(m)).collect(),
            separator: config.description_separator.clone(),
        }
    }

    /// Let the split strategy see a page before its blocks are extracted.
    pub fn observe_page(&mut self, page: usize, text: &str) {
        self.split.observe_page(page, text);
    }

    pub fn extract(&self, block: &TransactionBlock) -> Result<ParsedFields, Malformed> {
        let scan = self.scan(block)?;
        let mode = scan.first_word.and_then(|w| self.mode_of(w)).unwrap_or_default();

        let Some((balance, rest)) = scan.candidates.split_last() else {
            return Err(no_balance());
        };

        let mut fields = ParsedFields {
            page: block.page,
            date: scan.date,
            mode,
            description: scan.description,
            deposit: None,
            withdrawal: None,
            balance: balance.value,
            candidates: Vec::new(),
        };

        match rest {
            // Balance only: nothing to resolve the amount from.
            [] => {}
            [amount] => {
                if amount.value < Decimal::ZERO {
                    // Signed amount column: negative is an explicit withdrawal.
                    fields.withdrawal = Some(-amount.value);
                } else if amount.value.is_zero() {
                    fields.candidates.push(amount.value);
                } else {
                    let side = if amount.start > 0 {
                        self.split.side(block.page, amount.start, amount.end)
                    } else {
                        None
                    };
                    match side {
                        Some(Side::Deposit) => fields.deposit = Some(amount.value),
                        Some(Side::Withdrawal) => fields.withdrawal = Some(amount.value),
                        None => fields.candidates.push(amount.value),
                    }
                }
            }
            [deposit, withdrawal] => {
                let deposit = non_zero(deposit.value.abs());
                let withdrawal = non_zero(withdrawal.value.abs());
                if deposit.is_some() && withdrawal.is_some() {
                    return Err(Malformed::new(
                        RejectReason::AmbiguousColumns,
                        "both deposit and withdrawal columns carry a value",
                    ));
                }
                fields.deposit = deposit;
                fields.withdrawal = withdrawal;
            }
            _ => {
                return Err(Malformed::new(
                    RejectReason::AmbiguousColumns,
                    format!("{} amount tokens", scan.candidates.len()),
                ));
            }
        }

        Ok(fields)
    }

    /// A brought/carried-forward row: description is a balance marker and the only figure is
    /// the balance.
    pub fn balance_checkpoint(&self, block: &TransactionBlock) -> Option<Checkpoint> {
        let scan = self.scan(block).ok()?;
        if scan.candidates.len() != 1 {
            return None;
        }
        let description = collapse(&scan.description);
        if !self.balance_markers.iter().any(|m| *m == description) {
            return None;
        }
        Some(Checkpoint {
            date: scan.date,
            balance: scan.candidates[0].value,
        })
    }

    /// Rightmost figure of the block, read as its printed balance even when the columns could
    /// not be mapped.
    pub fn printed_balance(&self, block: &TransactionBlock) -> Option<Decimal> {
        let (_, body) = self.dates.leading_date(&block.start.text)?;
        block
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let line = self.scan_line(&raw.text, if i == 0 { body } else { 0 });
                line.run.last().map(|a| (a.value, a.text))
            })
            .last()
            .filter(|(_, text)| !self.dates.is_date_token(text))
            .map(|(value, _)| value)
    }

    fn scan<'a>(&self, block: &'a TransactionBlock) -> Result<BlockScan<'a>, Malformed> {
        let (date, body) = self.dates.leading_date(&block.start.text).ok_or_else(|| {
            Malformed::new(RejectReason::AmbiguousColumns, "start line lost its date token")
        })?;

        let mut lines: Vec<LineScan<'a>> = block
            .lines()
            .enumerate()
            .map(|(i, raw)| self.scan_line(&raw.text, if i == 0 { body } else { 0 }))
            .collect();

        if let Some(bad) = lines
            .iter()
            .flat_map(|l| l.run.iter())
            .find(|a| self.dates.is_date_token(a.text))
        {
            return Err(Malformed::new(
                RejectReason::AmbiguousColumns,
                format!("date-like token `{}` among amounts", bad.text),
            ));
        }

        let total: usize = lines.iter().map(|l| l.run.len()).sum();
        if total == 0 {
            return Err(no_balance());
        }

        let candidates = if total <= 3 {
            lines
                .iter_mut()
                .flat_map(|l| std::mem::take(&mut l.run))
                .collect()
        } else {
            // Reference numbers on earlier wrapped lines: trust the last line's columns.
            let last = lines.iter().rposition(|l| !l.run.is_empty()).unwrap_or(0);
            if !(2..=3).contains(&lines[last].run.len()) {
                return Err(Malformed::new(
                    RejectReason::AmbiguousColumns,
                    format!("{total} amount tokens with no resolvable mapping"),
                ));
            }
            let chosen = std::mem::take(&mut lines[last].run);
            for line in lines.iter_mut() {
                let run = std::mem::take(&mut line.run);
                line.words.extend(run.iter().map(|a| a.text));
            }
            chosen
        };

        let first_word = lines.iter().flat_map(|l| l.words.iter()).next().copied();
        let description = lines
            .iter()
            .map(|l| l.words.join(" "))
            .filter(|text| !text.is_empty() && text != "/")
            .collect::<Vec<_>>()
            .join(&self.separator);

        Ok(BlockScan {
            date,
            description,
            first_word,
            candidates,
        })
    }

    fn scan_line<'a>(&self, line: &'a str, from: usize) -> LineScan<'a> {
        let tokens = tokenize(line, from);
        let mut run = Vec::new();
        let mut cut = tokens.len();
        while cut > 0 {
            let token = tokens[cut - 1];
            match parse_amount(token.text, &self.currency_symbols) {
                Some(value) => run.push(Amount {
                    value,
                    text: token.text,
                    start: token.start,
                    end: token.end,
                }),
                None => break,
            }
            cut -= 1;
        }
        run.reverse();

        LineScan {
            words: tokens[..cut].iter().map(|t| t.text).collect(),
            run,
        }
    }

    /// Channel from the first description word, e.g. `UPI` from `UPI/merchant/ref`.
    fn mode_of(&self, word: &str) -> Option<String> {
        let prefix = word.split('/').next().unwrap_or(word);
        self.modes
            .iter()
            .find(|m| m.eq_ignore_ascii_case(prefix))
            .cloned()
    }
}

fn non_zero(value: Decimal) -> Option<Decimal> {
    (!value.is_zero()).then_some(value)
}

fn no_balance() -> Malformed {
    Malformed::new(RejectReason::NoBalanceToken, "no amount tokens in block")
}
