use chrono::NaiveDate;
use passbook_core::{ParserConfig, RejectReason, ResolutionTier, SplitHeuristic, ParsedFields};
use passbook_ingest::{SignResolver, StatementParser};
use rust_decimal::Decimal;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn fixed_offset_parser() -> StatementParser {
    StatementParser::new(ParserConfig {
        split: SplitHeuristic::FixedOffset { column: 30 },
        ..ParserConfig::default()
    })
    .unwrap()
}

/// Three-column rows: deposit, withdrawal, balance.
fn row(day: u32, description: &str, deposit: Decimal, withdrawal: Decimal, balance: Decimal) -> String {
    format!("{day:02}-07-2025 {description} {deposit:.2} {withdrawal:.2} {balance:.2}")
}

#[test]
fn test_documented_withdrawal_example() {
    let page = "\
01-07-2025  B/F                            6,57,619.05
01-07-2025  UPI/merchant/ref   12.00   6,57,607.05
";
    let stmt = fixed_offset_parser().parse("icici", &[page.to_string()]);

    assert!(stmt.rejections.is_empty());
    assert_eq!(stmt.transactions.len(), 1);
    let txn = &stmt.transactions[0];
    assert_eq!(txn.date(), NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    assert_eq!(txn.amount(), dec("-12.00"));
    assert_eq!(txn.balance(), dec("657607.05"));
    assert_eq!(txn.mode(), "UPI");
}

#[test]
fn test_deposit_column_wins_over_balance_delta() {
    let fields = ParsedFields {
        page: 0,
        date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        mode: "NEFT".to_string(),
        description: "NEFT/refund".to_string(),
        deposit: Some(dec("40.00")),
        withdrawal: None,
        balance: dec("60.00"),
        candidates: vec![],
    };
    // Balance fell by 40.00, yet the deposit column is explicit.
    let signed = SignResolver::new(dec("0.01"))
        .resolve(&fields, Some(dec("100.00")))
        .unwrap();
    assert_eq!(signed.value, dec("40.00"));
    assert_eq!(signed.tier, ResolutionTier::DepositColumn);
}

#[test]
fn test_one_malformed_block_in_fifty() {
    let mut balance = dec("10000.00");
    let mut pages = vec![String::new(), String::new()];
    pages[0].push_str(&format!("01-07-2025 B/F {balance:.2}\n"));

    for i in 0..50 {
        let withdrawal = dec("10.00");
        balance -= withdrawal;
        let description = if i == 30 { String::new() } else { format!("UPI/shop{i}/ref") };
        let line = row(2 + (i % 20), &description, Decimal::ZERO, withdrawal, balance);
        pages[i as usize / 25].push_str(&line);
        pages[i as usize / 25].push('\n');
    }

    let stmt = fixed_offset_parser().parse("icici", &pages);

    assert_eq!(stmt.transactions.len(), 49);
    assert_eq!(stmt.rejections.len(), 1);
    assert_eq!(stmt.rejections[0].reason, RejectReason::EmptyDescription);
    assert_eq!(stmt.rejections[0].page, 1);
    assert_eq!(stmt.transactions.last().unwrap().balance(), balance);
}

#[test]
fn test_one_unmappable_block_in_fifty() {
    let mut balance = dec("10000.00");
    let mut pages = vec![String::new(), String::new()];
    pages[0].push_str(&format!("01-07-2025 B/F {balance:.2}\n"));

    for i in 0..50 {
        let withdrawal = dec("10.00");
        // Row 30 carries figures in both columns; its printed balance is still right.
        let deposit = if i == 30 { dec("5.00") } else { Decimal::ZERO };
        balance = balance + deposit - withdrawal;
        let line = row(2 + (i % 20), &format!("UPI/shop{i}/ref"), deposit, withdrawal, balance);
        pages[i as usize / 25].push_str(&line);
        pages[i as usize / 25].push('\n');
    }

    let stmt = fixed_offset_parser().parse("icici", &pages);

    assert_eq!(stmt.rejections.len(), 1, "{:?}", stmt.rejections);
    assert_eq!(stmt.rejections[0].reason, RejectReason::AmbiguousColumns);
    assert_eq!(stmt.rejections[0].page, 1);
    assert_eq!(stmt.transactions.len(), 49);
    assert_eq!(stmt.transactions.last().unwrap().balance(), balance);
}

#[test]
fn test_running_balance_is_consistent() {
    let page = [
        "01-07-2025 B/F 500.00".to_string(),
        row(2, "NEFT/salary", dec("1000.00"), Decimal::ZERO, dec("1500.00")),
        row(3, "UPI/grocer/ref", Decimal::ZERO, dec("230.45"), dec("1269.55")),
        row(3, "ATM/cash", Decimal::ZERO, dec("200.00"), dec("1069.55")),
        row(4, "IMPS/refund", dec("19.99"), Decimal::ZERO, dec("1089.54")),
    ]
    .join("\n");
    let tolerance = dec("0.01");
    let stmt = fixed_offset_parser().parse("icici", &[page]);

    assert_eq!(stmt.transactions.len(), 4);
    for pair in stmt.transactions.windows(2) {
        let drift = pair[0].balance() + pair[1].amount() - pair[1].balance();
        assert!(drift.abs() <= tolerance, "{pair:?}");
    }
    let summary = stmt.summary(tolerance);
    assert_eq!(summary.opening_balance, Some(dec("500.00")));
    assert_eq!(summary.total_deposits, dec("1019.99"));
    assert_eq!(summary.total_withdrawals, dec("430.45"));
    assert!(summary.verified);
}

#[test]
fn test_same_day_repeats_are_distinct() {
    let page = [
        "03-07-2025 B/F 100.00".to_string(),
        row(3, "UPI/tea", Decimal::ZERO, dec("10.00"), dec("90.00")),
        row(3, "UPI/tea", Decimal::ZERO, dec("10.00"), dec("80.00")),
    ]
    .join("\n");
    let stmt = fixed_offset_parser().parse("icici", &[page]);

    assert_eq!(stmt.transactions.len(), 2);
    assert_ne!(
        stmt.transactions[0].fingerprint(),
        stmt.transactions[1].fingerprint()
    );
}

#[test]
fn test_reparse_is_deterministic() {
    let page = [
        "03-07-2025 B/F 100.00".to_string(),
        row(3, "UPI/tea", Decimal::ZERO, dec("10.00"), dec("90.00")),
        row(4, "NEFT/in", dec("5.00"), Decimal::ZERO, dec("95.00")),
    ]
    .join("\n");
    let parser = fixed_offset_parser();
    let first = parser.parse("icici", &[page.clone()]);
    let second = parser.parse("icici", &[page]);
    assert_eq!(first, second);
}
