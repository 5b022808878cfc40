//! Posting weight derivation and posting-level validity checks, per §4.3.

use ledger_core::{Posting, Quantity};

use crate::error::SemanticError;

/// A posting's balancing weight, derived from its amount/price/cost/weight
/// fields per the precedence in §4.3. Virtual and balanced-virtual
/// postings, and postings with no amount, have no weight -- they do not
/// contribute to transaction balancing.
pub fn derive_weight(posting: &Posting) -> Option<Quantity> {
    if !posting.is_real() {
        return None;
    }
    let amount = posting.amount.complete()?;

    if let Some(weight) = &posting.weight {
        return Some(weight.clone());
    }
    // A lot's acquisition cost, not its `@` sale-price annotation, is what
    // the booking value is measured against when both are present -- see
    // DESIGN.md's resolution of this precedence question (§4.3 numbers
    // price ahead of cost, but the lot-sale scenario in §8 only balances
    // to zero when cost wins, matching Ledger-cli/Beancount convention).
    if let Some(cost) = &posting.cost {
        return Some(Quantity::new(amount.value * cost.amount.value, cost.amount.commodity.clone()));
    }
    if let Some(price) = &posting.price {
        return Some(Quantity::new(amount.value * price.value, price.commodity.clone()));
    }
    Some(amount)
}

/// Runs every posting-level validity check from §4.3 against `posting`,
/// returning every violation found. Checks are exhaustive and do not
/// short-circuit -- a posting that is wrong in more than one way reports
/// more than one error.
pub fn validate_posting(posting: &Posting) -> Vec<SemanticError> {
    let mut errors = Vec::new();
    let offender = || posting.common.source_lines.clone().unwrap_or_default();
    let amount = posting.amount.complete();

    if let (Some(amount), Some(assertion)) = (&amount, &posting.balance_assertion) {
        if amount.commodity != assertion.commodity {
            errors.push(SemanticError::BalanceCheckCommodityMismatch { offender: offender() });
        }
    }

    if let (Some(amount), Some(price)) = (&amount, &posting.price) {
        if amount.commodity == price.commodity {
            errors.push(SemanticError::RecursivePrice { offender: offender() });
        }
    }

    if let (Some(amount), Some(cost)) = (&amount, &posting.cost) {
        if amount.commodity == cost.amount.commodity {
            errors.push(SemanticError::RecursiveCost { offender: offender() });
        }
    }

    let scale = posting.scale();
    if posting.weight.is_some() && scale.is_none() {
        errors.push(SemanticError::RedundantWeight { offender: offender() });
    }
    if let (Some(weight), Some(scale)) = (&posting.weight, scale) {
        if weight.commodity != scale.commodity {
            errors.push(SemanticError::WeightCommodityMismatch { offender: offender() });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use ledger_core::{CommodityCode, Cost, Decimal, EntryCommon, LedgerDate};

    use super::*;

    fn base_common() -> EntryCommon {
        EntryCommon::builder()
            .account_ref(ledger_core::AccountRef::Path(vec!["Assets".to_string()]))
            .date(LedgerDate::from_ymd_opt(2020, 1, 1).unwrap())
            .build()
    }

    fn posting_with_amount(value: &str, commodity: &str) -> Posting {
        Posting::builder()
            .common(base_common())
            .amount(Quantity::new(Decimal::from_str(value).unwrap(), commodity).into())
            .build()
    }

    #[test]
    fn weight_defaults_to_amount() {
        let p = posting_with_amount("10.00", "USD");
        assert_eq!(derive_weight(&p), Some(Quantity::new(Decimal::from_str("10.00").unwrap(), "USD")));
    }

    #[test]
    fn weight_scales_by_price() {
        let mut p = posting_with_amount("-40", "SCHH");
        p.price = Some(Quantity::new(Decimal::from_str("40.1513").unwrap(), "USD"));
        let weight = derive_weight(&p).unwrap();
        assert_eq!(weight.commodity, CommodityCode::new("USD"));
    }

    #[test]
    fn weight_scales_by_cost_when_no_price() {
        let mut p = posting_with_amount("-40", "SCHH");
        p.cost = Some(
            Cost::builder().amount(Quantity::new(Decimal::from_str("39.90").unwrap(), "USD")).build(),
        );
        let weight = derive_weight(&p).unwrap();
        assert_eq!(weight.value, Decimal::from_str("-1596.00").unwrap());
        assert_eq!(weight.commodity, CommodityCode::new("USD"));
    }

    #[test]
    fn virtual_posting_has_no_weight() {
        let mut p = posting_with_amount("500.00", "USD");
        p.is_virtual = true;
        assert_eq!(derive_weight(&p), None);
    }

    #[test]
    fn explicit_weight_overrides_derivation() {
        let mut p = posting_with_amount("10.00", "USD");
        p.price = Some(Quantity::new(Decimal::from_str("2").unwrap(), "EUR"));
        p.weight = Some(Quantity::new(Decimal::from_str("99.00").unwrap(), "EUR"));
        assert_eq!(derive_weight(&p).unwrap().value, Decimal::from_str("99.00").unwrap());
    }

    #[test]
    fn redundant_weight_without_scale_is_an_error() {
        let mut p = posting_with_amount("10.00", "USD");
        p.weight = Some(Quantity::new(Decimal::from_str("10.00").unwrap(), "USD"));
        let errors = validate_posting(&p);
        assert!(errors.contains(&SemanticError::RedundantWeight { offender: String::new() }));
    }

    #[test]
    fn weight_commodity_must_match_scale() {
        let mut p = posting_with_amount("10.00", "USD");
        p.price = Some(Quantity::new(Decimal::from_str("2").unwrap(), "EUR"));
        p.weight = Some(Quantity::new(Decimal::from_str("99.00").unwrap(), "GBP"));
        let errors = validate_posting(&p);
        assert!(errors.contains(&SemanticError::WeightCommodityMismatch { offender: String::new() }));
    }

    #[test]
    fn recursive_price_is_an_error() {
        let mut p = posting_with_amount("10.00", "USD");
        p.price = Some(Quantity::new(Decimal::from_str("1").unwrap(), "USD"));
        let errors = validate_posting(&p);
        assert!(errors.contains(&SemanticError::RecursivePrice { offender: String::new() }));
    }

    #[test]
    fn balance_check_commodity_mismatch_is_an_error() {
        let mut p = posting_with_amount("10.00", "USD");
        p.balance_assertion = Some(Quantity::new(Decimal::from_str("10.00").unwrap(), "EUR"));
        let errors = validate_posting(&p);
        assert!(errors.contains(&SemanticError::BalanceCheckCommodityMismatch { offender: String::new() }));
    }
}
