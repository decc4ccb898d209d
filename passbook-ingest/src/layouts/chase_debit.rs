//! Chase Debit (Checking) statement layout (text)
//!
//! Expected extracted-text section:
//!   TRANSACTION DETAIL
//!          DATE        DESCRIPTION                                     AMOUNT     BALANCE
//!          04/22       Discover     E-Payment 8148   Web ID: ...       -15.00      53.70
//!
//! Rows are MM/DD and the amount column is signed, so credits carry no position signal and
//! are settled by the running balance.

use passbook_core::{DateGrammar, NoiseRules, ParserConfig, SplitHeuristic};

/// `statement_year` is required because rows are MM/DD.
pub fn config(statement_year: i32) -> ParserConfig {
    ParserConfig {
        date: DateGrammar {
            pattern: r"\d{2}/\d{2}".to_string(),
            format: "%m/%d".to_string(),
            max_column: 12,
            year_hint: Some(statement_year),
        },
        noise: NoiseRules {
            exact: vec!["DATE DESCRIPTION AMOUNT BALANCE".to_string()],
            patterns: vec![r"Page \d+ of \d+".to_string()],
            header_prefixes: vec![
                "TRANSACTION DETAIL".to_string(),
                "CHECKING SUMMARY".to_string(),
                "Beginning Balance".to_string(),
                "Ending Balance".to_string(),
            ],
        },
        terminators: vec![],
        balance_markers: vec!["Beginning Balance".to_string(), "Ending Balance".to_string()],
        currency_symbols: vec!["$".to_string()],
        modes: vec!["ACH".to_string(), "ATM".to_string(), "ZELLE".to_string()],
        split: SplitHeuristic::BalanceDelta,
        ..ParserConfig::default()
    }
}
