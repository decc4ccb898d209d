//! ICICI savings account statement (text).
//!
//! Expected extracted-text section (`pdftotext -layout`):
//!   DATE        MODE**   PARTICULARS                      DEPOSITS    WITHDRAWALS       BALANCE
//!   01-07-2025           B/F                                                        6,57,619.05
//!   01-07-2025           UPI/merchant/ref                                 12.00     6,57,607.05
//!                        /okaxis/Payment
//!                        Total:                             1,000.00     12.00

use passbook_core::{NoiseRules, ParserConfig, SplitHeuristic};

pub fn config() -> ParserConfig {
    ParserConfig {
        noise: NoiseRules {
            exact: vec![
                "DATE MODE** PARTICULARS DEPOSITS WITHDRAWALS BALANCE".to_string(),
                "DATE MODE PARTICULARS DEPOSITS WITHDRAWALS BALANCE".to_string(),
            ],
            patterns: vec![
                r"Page \d+ of \d+".to_string(),
                r"Page \d+".to_string(),
            ],
            header_prefixes: vec![
                "Statement of Transactions".to_string(),
                "Account Number".to_string(),
                "Account Type".to_string(),
                "Summary of Accounts".to_string(),
                "Your Base Branch".to_string(),
                "Please note".to_string(),
                "** ".to_string(),
            ],
        },
        split: SplitHeuristic::HeaderDerived {
            deposit_label: "DEPOSITS".to_string(),
            withdrawal_label: "WITHDRAWALS".to_string(),
        },
        ..ParserConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StatementParser;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_parse_icici_basic() {
        let text = "\
Statement of Transactions in Savings Account Number: 000000000000
DATE        MODE**   PARTICULARS                      DEPOSITS    WITHDRAWALS       BALANCE
01-07-2025           B/F                                                        6,57,619.05
01-07-2025           UPI/merchant/ref                                 12.00     6,57,607.05
                     /okaxis/Payment
02-07-2025           NEFT/ACME PAYROLL              50,000.00                   7,07,607.05
                     Total:                         50,000.00         12.00
Page 1 of 1
";

        let parser = StatementParser::new(config()).unwrap();
        let stmt = parser.parse("icici", &[text.to_string()]);

        assert!(stmt.rejections.is_empty(), "{:?}", stmt.rejections);
        assert_eq!(stmt.opening.map(|c| c.balance), Decimal::from_str("657619.05").ok());
        assert_eq!(stmt.transactions.len(), 2);
        assert_eq!(stmt.transactions[0].amount(), Decimal::from_str("-12.00").unwrap());
        assert_eq!(stmt.transactions[0].description(), "UPI/merchant/ref /okaxis/Payment");
        assert_eq!(stmt.transactions[0].mode(), "UPI");
        assert_eq!(stmt.transactions[1].amount(), Decimal::from_str("50000.00").unwrap());
        assert_eq!(stmt.transactions[1].mode(), "NEFT");
        assert!(stmt.summary(Decimal::new(1, 2)).verified);
    }
}
