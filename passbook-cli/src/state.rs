use anyhow::{Context, Result};
use passbook_core::ParsedStatement;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub fn passbook_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".passbook"))
}

pub fn ensure_passbook_home() -> Result<PathBuf> {
    let dir = passbook_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn pending_dir() -> Result<PathBuf> {
    let dir = ensure_passbook_home()?.join("pending");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// A parsed document whose posting phase was aborted, kept for `passbook retry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingImport {
    pub document: String,
    pub account: String,
    pub statement: ParsedStatement,
}

/// `<dir>/<document file name>.json`
pub fn pending_path(dir: &Path, document: &str) -> PathBuf {
    let name = Path::new(document)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| document.replace(['/', '\\'], "_"));
    dir.join(format!("{name}.json"))
}

pub fn write_pending(dir: &Path, pending: &PendingImport) -> Result<PathBuf> {
    let p = pending_path(dir, &pending.document);
    let json = serde_json::to_string_pretty(pending)?;
    fs::write(&p, json).with_context(|| format!("write {}", p.display()))?;
    Ok(p)
}

pub fn read_pending(path: &Path) -> Result<PendingImport> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn remove_pending(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("remove {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use passbook_core::{Checkpoint, Fingerprint, Transaction};
    use rust_decimal::Decimal;

    #[test]
    fn test_pending_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let amount = Decimal::new(-1200, 2);

        let mut statement = ParsedStatement::new("icici");
        statement.opening = Some(Checkpoint {
            date,
            balance: Decimal::new(65761905, 2),
        });
        statement.transactions.push(Transaction::new(
            date,
            "UPI/merchant/ref",
            "UPI",
            amount,
            Decimal::new(65760705, 2),
            "icici",
            0,
            Fingerprint::compute(date, "UPI/merchant/ref", amount, 0),
        ));
        let pending = PendingImport {
            document: "statements/jul.pdf".to_string(),
            account: "icici".to_string(),
            statement,
        };

        let path = write_pending(dir.path(), &pending).unwrap();
        assert_eq!(path, dir.path().join("jul.pdf.json"));
        assert_eq!(read_pending(&path).unwrap(), pending);

        remove_pending(&path).unwrap();
        assert!(!path.exists());
    }
}
