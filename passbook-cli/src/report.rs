//! Human-readable output. Everything here goes to stdout; logs go to stderr.

use passbook_core::{ParsedStatement, StatementSummary, Transaction, format_amount};
use passbook_ledger::{DocumentReport, categorize};
use rust_decimal::Decimal;

fn money(v: Option<Decimal>) -> String {
    v.map(format_amount).unwrap_or_else(|| "-".to_string())
}

fn print_summary(summary: &StatementSummary) {
    println!(
        "  opening={} deposits={} withdrawals={} closing={} {}",
        money(summary.opening_balance),
        format_amount(summary.total_deposits),
        format_amount(summary.total_withdrawals),
        money(summary.closing_balance),
        if summary.verified { "verified" } else { "UNVERIFIED" }
    );
}

fn print_transaction(prefix: &str, t: &Transaction) {
    println!(
        "{prefix} {} {:>14} {:>14}  {:<14} {}",
        t.date(),
        format_amount(t.amount()),
        format_amount(t.balance()),
        categorize(t).name(),
        t.description()
    );
}

pub fn print_statement(document: &str, statement: &ParsedStatement, tolerance: Decimal) {
    println!(
        "{document}: {} transactions, {} rejected, {} discarded lines",
        statement.transactions.len(),
        statement.rejections.len(),
        statement.discarded_lines
    );
    if let Some(cp) = statement.opening {
        println!("  opening balance {} on {}", format_amount(cp.balance), cp.date);
    }
    for t in &statement.transactions {
        print_transaction("  ", t);
    }
    for r in &statement.rejections {
        println!("  rejected {r}");
    }
    print_summary(&statement.summary(tolerance));
}

pub fn print_report(r: &DocumentReport) {
    println!(
        "{} -> {}{}",
        r.document,
        r.account,
        if r.dry_run { " (dry run)" } else { "" }
    );
    println!(
        "  parsed={} inserted={} duplicates={} rejected={}",
        r.parsed, r.inserted, r.duplicates, r.rejected
    );
    print_summary(&r.summary);
    if r.dry_run {
        for t in &r.records {
            print_transaction("  +", t);
        }
    }
    for rej in &r.rejections {
        println!("  rejected {rej}");
    }
}

pub fn print_totals(reports: &[DocumentReport], failed: usize) {
    let sum = |f: fn(&DocumentReport) -> usize| reports.iter().map(f).sum::<usize>();
    println!(
        "\n{} documents ({} failed): parsed={} inserted={} duplicates={} rejected={}",
        reports.len() + failed,
        failed,
        sum(|r| r.parsed),
        sum(|r| r.inserted),
        sum(|r| r.duplicates),
        sum(|r| r.rejected)
    );
}
