//! Bank layout presets: complete parser configs for statements we know.

pub mod chase_debit;
pub mod icici;

use passbook_core::ParserConfig;

/// Preset names accepted by `preset`.
pub const NAMES: &[&str] = &["icici", "chase_debit"];

/// Look up a preset by name. `year` is needed by layouts whose rows omit the year.
pub fn preset(name: &str, year: Option<i32>) -> Option<ParserConfig> {
    match name {
        "icici" => Some(icici::config()),
        "chase_debit" => year.map(chase_debit::config),
        _ => None,
    }
}
