//! Decimal amounts as printed in statement columns.
//!
//! Statement amounts carry grouping separators in either Western (`1,234,567.89`) or Indian
//! (`12,34,567.89`) style, sometimes a leading currency symbol, and always exactly two fraction
//! digits. Anything else is not an amount and stays part of the description.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a single whitespace-delimited token into a `Decimal`.
///
/// Returns `None` when the token is not a well-formed statement amount. A leading `-` is kept so
/// that signed amount columns and overdrawn balances survive parsing.
pub fn parse_amount(token: &str, currency_symbols: &[String]) -> Option<Decimal> {
    let mut rest = token.trim();
    let negative = match rest.strip_prefix('-') {
        Some(after) => {
            rest = after;
            true
        }
        None => false,
    };

    for symbol in currency_symbols {
        if let Some(after) = rest.strip_prefix(symbol.as_str()) {
            rest = after;
            break;
        }
    }

    let (int_part, frac) = rest.split_once('.')?;
    if frac.len() != 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let groups: Vec<&str> = int_part.split(',').collect();
    if !grouping_is_valid(&groups) {
        return None;
    }

    let digits: String = groups.concat();
    let value = Decimal::from_str(&format!("{digits}.{frac}")).ok()?;
    Some(if negative { -value } else { value })
}

/// Western grouping uses groups of three; Indian grouping uses a trailing group of three with
/// groups of two before it.
fn grouping_is_valid(groups: &[&str]) -> bool {
    if groups
        .iter()
        .any(|g| g.is_empty() || !g.bytes().all(|b| b.is_ascii_digit()))
    {
        return false;
    }

    let (first, rest) = match groups.split_first() {
        Some(split) => split,
        None => return false,
    };
    let Some((last, middle)) = rest.split_last() else {
        return true;
    };

    if last.len() != 3 {
        return false;
    }

    let western = first.len() <= 3 && middle.iter().all(|g| g.len() == 3);
    let indian = first.len() <= 2 && middle.iter().all(|g| g.len() == 2);
    western || indian
}

/// Render an amount with two fraction digits, e.g. `-12.00`.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}
