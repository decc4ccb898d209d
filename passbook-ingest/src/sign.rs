//! Sign resolution: explicit columns first, running-balance arithmetic as the fallback.

use passbook_core::{Malformed, ParsedFields, RejectReason, ResolutionTier, SignedAmount};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub struct SignResolver {
    tolerance: Decimal,
}

impl SignResolver {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    /// Deposit column, then withdrawal column, then `balance - previous_balance` matched
    /// against the unassigned candidates.
    pub fn resolve(
        &self,
        fields: &ParsedFields,
        previous_balance: Option<Decimal>,
    ) -> Result<SignedAmount, Malformed> {
        if let Some(deposit) = fields.deposit.filter(|d| !d.is_zero()) {
            return Ok(SignedAmount {
                value: deposit,
                tier: ResolutionTier::DepositColumn,
            });
        }

        if let Some(withdrawal) = fields.withdrawal.filter(|w| !w.is_zero()) {
            return Ok(SignedAmount {
                value: -withdrawal,
                tier: ResolutionTier::WithdrawalColumn,
            });
        }

        let Some(previous) = previous_balance else {
            return Err(Malformed::new(
                RejectReason::AmbiguousColumns,
                "column unknown and no previous balance to infer it from",
            ));
        };

        let delta = fields.balance - previous;
        let magnitude = fields
            .candidates
            .iter()
            .map(|c| c.abs())
            .find(|c| (*c - delta.abs()).abs() <= self.tolerance)
            .ok_or_else(|| {
                Malformed::new(
                    RejectReason::AmbiguousColumns,
                    format!("balance moved by {delta}, matching no amount in the block"),
                )
            })?;

        Ok(SignedAmount {
            value: if delta < Decimal::ZERO { -magnitude } else { magnitude },
            tier: ResolutionTier::BalanceDelta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fields(deposit: Option<&str>, withdrawal: Option<&str>, balance: &str, candidates: &[&str]) -> ParsedFields {
        ParsedFields {
            page: 0,
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            mode: String::new(),
            description: "x".to_string(),
            deposit: deposit.map(dec),
            withdrawal: withdrawal.map(dec),
            balance: dec(balance),
            candidates: candidates.iter().map(|c| dec(c)).collect(),
        }
    }

    fn resolver() -> SignResolver {
        SignResolver::new(dec("0.01"))
    }

    #[test]
    fn test_deposit_column_beats_balance_delta() {
        // Balance went down, but the deposit column is explicit.
        let f = fields(Some("50.00"), None, "900.00", &[]);
        let signed = resolver().resolve(&f, Some(dec("1000.00"))).unwrap();
        assert_eq!(signed.value, dec("50.00"));
        assert_eq!(signed.tier, ResolutionTier::DepositColumn);
    }

    #[test]
    fn test_zero_withdrawal_does_not_shadow_deposit() {
        let f = fields(Some("50.00"), Some("0.00"), "1050.00", &[]);
        let signed = resolver().resolve(&f, None).unwrap();
        assert_eq!(signed.value, dec("50.00"));
    }

    #[test]
    fn test_withdrawal_column() {
        let f = fields(None, Some("12.00"), "657607.05", &[]);
        let signed = resolver().resolve(&f, Some(dec("657619.05"))).unwrap();
        assert_eq!(signed.value, dec("-12.00"));
        assert_eq!(signed.tier, ResolutionTier::WithdrawalColumn);
    }

    #[test]
    fn test_balance_delta_fallback() {
        let f = fields(None, None, "153.70", &["100.00"]);
        let signed = resolver().resolve(&f, Some(dec("53.70"))).unwrap();
        assert_eq!(signed.value, dec("100.00"));
        assert_eq!(signed.tier, ResolutionTier::BalanceDelta);

        let f = fields(None, None, "38.70", &["15.00"]);
        let signed = resolver().resolve(&f, Some(dec("53.70"))).unwrap();
        assert_eq!(signed.value, dec("-15.00"));
    }

    #[test]
    fn test_balance_delta_within_tolerance() {
        let f = fields(None, None, "153.71", &["100.00"]);
        let signed = resolver().resolve(&f, Some(dec("53.70"))).unwrap();
        assert_eq!(signed.value, dec("100.00"));
    }

    #[test]
    fn test_unresolvable() {
        let f = fields(None, None, "200.00", &["100.00"]);
        let err = resolver().resolve(&f, Some(dec("53.70"))).unwrap_err();
        assert_eq!(err.reason, RejectReason::AmbiguousColumns);

        let f = fields(None, None, "153.70", &["100.00"]);
        assert!(resolver().resolve(&f, None).is_err());
    }
}
