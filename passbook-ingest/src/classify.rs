//! Line classification: transaction start, continuation of the open block, or noise.
//!
//! Noise rules match whole lines only (after trimming and collapsing runs of whitespace). A
//! wrapped description that merely contains a header word stays a continuation.

use chrono::NaiveDate;
use passbook_core::{DateGrammar, ParserConfig};
use regex::Regex;

use crate::error::IngestError;

pub(crate) fn compile(pattern: &str) -> Result<Regex, IngestError> {
    Regex::new(pattern).map_err(|source| IngestError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Trim and collapse internal whitespace to single spaces.
pub(crate) fn collapse(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recognises the leading date token of a transaction row.
#[derive(Debug, Clone)]
pub struct DateMatcher {
    leading: Regex,
    whole: Regex,
    format: String,
    year_hint: Option<i32>,
    max_column: usize,
}

impl DateMatcher {
    pub fn new(grammar: &DateGrammar) -> Result<Self, IngestError> {
        Ok(Self {
            leading: compile(&format!(
                r"^(?P<indent>\s*)(?P<date>{})(?:\s|$)",
                grammar.pattern
            ))?,
            whole: compile(&format!(r"^(?:{})$", grammar.pattern))?,
            format: grammar.format.clone(),
            year_hint: grammar.year_hint,
            max_column: grammar.max_column,
        })
    }

    /// The row's date and the byte offset where the rest of the line begins.
    ///
    /// `None` when the line does not open with a parseable date at or before `max_column`.
    pub fn leading_date(&self, line: &str) -> Option<(NaiveDate, usize)> {
        let caps = self.leading.captures(line)?;
        let indent = caps.name("indent")?.as_str().chars().count();
        if indent > self.max_column {
            return None;
        }
        let token = caps.name("date")?;
        let date = self.parse(token.as_str())?;
        Some((date, token.end()))
    }

    /// True when a lone token looks like a date in this grammar.
    pub fn is_date_token(&self, token: &str) -> bool {
        self.whole.is_match(token)
    }

    fn parse(&self, token: &str) -> Option<NaiveDate> {
        if let Ok(date) = NaiveDate::parse_from_str(token, &self.format) {
            return Some(date);
        }
        // Year-less formats (MM/DD) borrow the statement year.
        let year = self.year_hint?;
        NaiveDate::parse_from_str(&format!("{token} {year}"), &format!("{} %Y", self.format)).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseKind {
    Blank,
    /// Exact literal or full-line pattern match.
    Boilerplate,
    /// Column header or statement metadata seen outside a block.
    Header,
    /// Page totals; closes the open block.
    Terminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Start { date: NaiveDate },
    Continuation,
    Noise(NoiseKind),
}

/// What the classifier may know about the surrounding stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyContext {
    pub block_open: bool,
}

#[derive(Debug, Clone)]
pub struct LineClassifier {
    dates: DateMatcher,
    exact: Vec<String>,
    patterns: Vec<Regex>,
    header_prefixes: Vec<String>,
    terminators: Vec<String>,
}

impl LineClassifier {
    pub fn new(config: &ParserConfig) -> Result<Self, IngestError> {
        let patterns = config
            .noise
            .patterns
            .iter()
            .map(|p| compile(&format!("^(?:{p})$")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dates: DateMatcher::new(&config.date)?,
            exact: config.noise.exact.iter().map(|s| collapse(s)).collect(),
            patterns,
            header_prefixes: config.noise.header_prefixes.iter().map(|s| collapse(s)).collect(),
            terminators: config.terminators.iter().map(|s| collapse(s)).collect(),
        })
    }

    pub fn dates(&self) -> &DateMatcher {
        &self.dates
    }

    pub fn classify(&self, line: &str, ctx: ClassifyContext) -> LineKind {
        let collapsed = collapse(line);
        if collapsed.is_empty() {
            return LineKind::Noise(NoiseKind::Blank);
        }

        if self.terminators.iter().any(|t| is_terminator(&collapsed, t)) {
            return LineKind::Noise(NoiseKind::Terminator);
        }

        if self.exact.iter().any(|e| *e == collapsed)
            || self.patterns.iter().any(|re| re.is_match(&collapsed))
        {
            return LineKind::Noise(NoiseKind::Boilerplate);
        }

        if !ctx.block_open
            && self
                .header_prefixes
                .iter()
                .any(|p| collapsed.starts_with(p.as_str()))
        {
            return LineKind::Noise(NoiseKind::Header);
        }

        if let Some((date, _)) = self.dates.leading_date(line) {
            return LineKind::Start { date };
        }

        LineKind::Continuation
    }
}

/// `Total:` alone, or `Total:` followed by the page figures.
fn is_terminator(collapsed: &str, terminator: &str) -> bool {
    match collapsed.strip_prefix(terminator) {
        Some(rest) => rest.is_empty() || rest.starts_with(' '),
        None => false,
    }
}
