use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use passbook_core::{ParserConfig, PeriodBounds};
use passbook_ingest::layouts;
use passbook_ledger::{ActualHttpLedger, CsvLedger, ImportOptions, LedgerSink, MemoryLedger};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_passbook_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Layout preset (`icici`, `chase_debit`) used when `[parser]` is absent.
    pub layout: Option<String>,
    /// Statement year, for layouts whose rows omit it.
    pub year: Option<i32>,
    /// A full parser config; takes precedence over `layout`.
    pub parser: Option<ParserConfig>,
    pub ledger: LedgerSection,
    pub import: ImportSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    /// Nothing persists between runs.
    None,
    Csv,
    /// actual-http-api server.
    Actual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub kind: LedgerKind,
    pub csv_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub budget_sync_id: Option<String>,
    /// Prefer PASSBOOK_LEDGER_API_KEY over storing this.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub post_opening_balance: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: Some("icici".to_string()),
            year: None,
            parser: None,
            ledger: LedgerSection::default(),
            import: ImportSection::default(),
        }
    }
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            kind: LedgerKind::Csv,
            csv_path: None,
            base_url: Some("http://localhost:5007".to_string()),
            budget_sync_id: None,
            api_key: None,
        }
    }
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_delay_ms: 500,
            post_opening_balance: true,
        }
    }
}

impl Config {
    /// Parser config for one run. A `--layout` flag beats `[parser]`, which beats `layout`.
    pub fn parser_config(
        &self,
        layout: Option<&str>,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<ParserConfig> {
        let mut cfg = match (layout, &self.parser, &self.layout) {
            (Some(name), _, _) => self.preset(name)?,
            (None, Some(parser), _) => parser.clone(),
            (None, None, Some(name)) => self.preset(name)?,
            (None, None, None) => ParserConfig::default(),
        };
        if let Some((start, end)) = period {
            if start > end {
                bail!("period start {start} is after end {end}");
            }
            cfg.period = Some(PeriodBounds::new(start, end));
        }
        Ok(cfg)
    }

    fn preset(&self, name: &str) -> Result<ParserConfig> {
        if !layouts::NAMES.contains(&name) {
            bail!(
                "unknown layout {name:?} (known: {})",
                layouts::NAMES.join(", ")
            );
        }
        layouts::preset(name, self.year)
            .with_context(|| format!("layout {name} needs `year` in config.toml"))
    }

    pub fn import_options(&self, tolerance: Decimal) -> ImportOptions {
        ImportOptions {
            retries: self.import.retries,
            retry_delay: Duration::from_millis(self.import.retry_delay_ms),
            post_opening_balance: self.import.post_opening_balance,
            tolerance,
        }
    }

    /// Build the configured sink. Secrets are passed in, never read from globals here.
    pub fn ledger_sink(&self, api_key: Option<&str>) -> Result<Box<dyn LedgerSink>> {
        let l = &self.ledger;
        Ok(match l.kind {
            LedgerKind::None => Box::new(MemoryLedger::new()),
            LedgerKind::Csv => {
                let path = match &l.csv_path {
                    Some(p) => p.clone(),
                    None => ensure_passbook_home()?.join("ledger.csv"),
                };
                Box::new(CsvLedger::new(path))
            }
            LedgerKind::Actual => {
                let base_url = l.base_url.as_deref().context("[ledger] base_url is not set")?;
                let budget = l
                    .budget_sync_id
                    .as_deref()
                    .context("[ledger] budget_sync_id is not set")?;
                let key = api_key
                    .or(l.api_key.as_deref())
                    .context("no ledger API key (set PASSBOOK_LEDGER_API_KEY)")?;
                Box::new(ActualHttpLedger::new(base_url, budget, key))
            }
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_passbook_home()?.join("config.toml"))
}

/// Load `path`, or `~/.passbook/config.toml` when none is given. A missing file means defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let p = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: Option<&Path>) -> Result<()> {
    let p = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&p, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_core::SplitHeuristic;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(Some(&dir.path().join("config.toml"))).unwrap();
        assert_eq!(cfg.layout.as_deref(), Some("icici"));
        assert_eq!(cfg.ledger.kind, LedgerKind::Csv);
    }

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        init_config(Some(&path)).unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.import.retries, 2);
        assert!(cfg.import.post_opening_balance);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
layout = "chase_debit"
year = 2026

[ledger]
kind = "actual"
base_url = "http://budget.local:5007"
budget_sync_id = "abc"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.ledger.kind, LedgerKind::Actual);
        assert_eq!(cfg.import.retry_delay_ms, 500);

        let parser = cfg.parser_config(None, None).unwrap();
        assert_eq!(parser.split, SplitHeuristic::BalanceDelta);
        assert_eq!(parser.date.year_hint, Some(2026));

        assert!(cfg.ledger_sink(None).is_err());
        assert!(cfg.ledger_sink(Some("secret")).is_ok());
    }

    #[test]
    fn test_layout_flag_and_period() {
        let cfg = Config::default();
        let start = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 7, 31).unwrap();

        let parser = cfg.parser_config(Some("icici"), Some((start, end))).unwrap();
        assert_eq!(parser.period, Some(PeriodBounds::new(start, end)));

        assert!(cfg.parser_config(Some("nope"), None).is_err());
        assert!(cfg.parser_config(Some("chase_debit"), None).is_err());
        assert!(cfg.parser_config(None, Some((end, start))).is_err());
    }
}
