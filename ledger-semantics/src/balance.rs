//! Transaction amount interpolation and per-commodity balancing, per §4.4.

use ledger_core::{CommodityCode, Decimal, JournalEntry, Quantity, Transaction};

use crate::error::SemanticError;
use crate::weight::derive_weight;

/// Interpolates the single missing posting amount in `transaction`, if any,
/// and verifies the real-weight sum is zero per commodity afterward.
///
/// Mutates `transaction.entries` in place: at most one posting's `amount`
/// is filled in, at its original position (§4.4 step 3). Leaves the
/// transaction untouched if every posting already carries an amount.
pub fn balance_transaction(transaction: &mut Transaction) -> Result<(), SemanticError> {
    let missing: Vec<usize> = transaction
        .entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            JournalEntry::Posting(p) if p.amount.complete().is_none() => Some(i),
            _ => None,
        })
        .collect();

    if missing.len() > 1 {
        return Err(SemanticError::MultipleMissingAmounts { count: missing.len() });
    }

    if let Some(&index) = missing.first() {
        let sums = real_weight_sums(transaction, Some(index));
        if sums.is_empty() {
            return Err(SemanticError::CannotInferWithNoWeights);
        }
        if sums.len() > 1 {
            let mut commodities: Vec<CommodityCode> = sums.into_iter().map(|(c, _)| c).collect();
            commodities.sort();
            return Err(SemanticError::AmbiguousInterpolation { commodities });
        }
        let (commodity, sum) = sums.into_iter().next().unwrap();
        let filled = Quantity::new(-sum, commodity);
        if let JournalEntry::Posting(posting) = &mut transaction.entries[index] {
            posting.amount = filled.into();
        }
    }

    verify_balanced(transaction)
}

/// Sums real posting weights per commodity, in order of first appearance,
/// skipping `exclude` (the index of the posting still being interpolated,
/// if any) and non-posting entries.
fn real_weight_sums(transaction: &Transaction, exclude: Option<usize>) -> Vec<(CommodityCode, Decimal)> {
    let mut order: Vec<CommodityCode> = Vec::new();
    let mut sums: std::collections::HashMap<CommodityCode, Decimal> = std::collections::HashMap::new();

    for (i, entry) in transaction.entries.iter().enumerate() {
        if Some(i) == exclude {
            continue;
        }
        let Some(posting) = entry.as_posting() else { continue };
        let Some(weight) = derive_weight(posting) else { continue };
        sums
            .entry(weight.commodity.clone())
            .and_modify(|s| *s += weight.value)
            .or_insert_with(|| {
                order.push(weight.commodity.clone());
                weight.value
            });
    }

    order.into_iter().map(|c| { let sum = sums[&c]; (c, sum) }).collect()
}

/// Verifies the property §4.4 requires after interpolation: the
/// transaction's real-weight sum is exactly zero per commodity.
pub fn verify_balanced(transaction: &Transaction) -> Result<(), SemanticError> {
    for (commodity, sum) in real_weight_sums(transaction, None) {
        if !sum.is_zero() {
            return Err(SemanticError::NonzeroTransactionSum { commodity, sum });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use ledger_core::{AccountRef, Cost, EntryCommon, LedgerDate, Posting};

    use super::*;

    fn entry_common(path: &str) -> EntryCommon {
        EntryCommon::builder()
            .account_ref(AccountRef::Path(path.split(':').map(str::to_string).collect()))
            .date(LedgerDate::from_ymd_opt(2020, 1, 1).unwrap())
            .build()
    }

    fn posting(path: &str, amount: Option<(&str, &str)>) -> JournalEntry {
        let amount = amount
            .map(|(v, c)| Quantity::new(Decimal::from_str(v).unwrap(), c).into())
            .unwrap_or_default();
        JournalEntry::Posting(Posting::builder().common(entry_common(path)).amount(amount).build())
    }

    fn transaction(entries: Vec<JournalEntry>) -> Transaction {
        Transaction::builder()
            .title("t".to_string())
            .date(LedgerDate::from_ymd_opt(2020, 1, 1).unwrap())
            .entries(entries)
            .build()
    }

    #[test]
    fn interpolates_single_missing_posting() {
        let mut txn = transaction(vec![
            posting("Assets:Cash:Wallet", Some(("20.00", "USD"))),
            posting("Equity:Opening Balances", None),
        ]);
        balance_transaction(&mut txn).unwrap();
        let filled = txn.entries[1].as_posting().unwrap().amount.complete().unwrap();
        assert_eq!(filled.value, Decimal::from_str("-20.00").unwrap());
        assert_eq!(filled.commodity, CommodityCode::new("USD"));
    }

    #[test]
    fn already_balanced_transaction_is_untouched() {
        let mut txn = transaction(vec![
            posting("Assets:Cash:Wallet", Some(("20.00", "USD"))),
            posting("Equity:Opening Balances", Some(("-20.00", "USD"))),
        ]);
        let before = txn.clone();
        balance_transaction(&mut txn).unwrap();
        assert_eq!(before, txn);
    }

    #[test]
    fn multiple_missing_amounts_is_fatal() {
        let mut txn = transaction(vec![
            posting("Assets:Cash:Wallet", None),
            posting("Equity:Opening Balances", None),
        ]);
        assert_eq!(balance_transaction(&mut txn), Err(SemanticError::MultipleMissingAmounts { count: 2 }));
    }

    #[test]
    fn no_weights_to_infer_from_is_fatal() {
        let mut txn = transaction(vec![posting("Assets:Cash:Wallet", None)]);
        assert_eq!(balance_transaction(&mut txn), Err(SemanticError::CannotInferWithNoWeights));
    }

    #[test]
    fn ambiguous_interpolation_reports_both_commodities() {
        let mut txn = transaction(vec![
            posting("Assets:Cash:Wallet", Some(("20.00", "USD"))),
            posting("Assets:Brokerage", Some(("5.00", "EUR"))),
            posting("Equity:Opening Balances", None),
        ]);
        let err = balance_transaction(&mut txn).unwrap_err();
        assert_eq!(
            err,
            SemanticError::AmbiguousInterpolation {
                commodities: vec![CommodityCode::new("EUR"), CommodityCode::new("USD")]
            }
        );
    }

    #[test]
    fn lot_cost_sale_balances_via_cost_weight() {
        let mut traditional_ira = Posting::builder()
            .common(entry_common("traditional-ira"))
            .amount(Quantity::new(Decimal::from_str("-40").unwrap(), "SCHH").into())
            .cost(Some(Cost::builder().amount(Quantity::new(Decimal::from_str("39.90").unwrap(), "USD")).build()))
            .build();
        traditional_ira.price = Some(Quantity::new(Decimal::from_str("40.1513").unwrap(), "USD"));

        let mut txn = transaction(vec![
            posting("traditional-ira", Some(("1606.01", "USD"))),
            posting("Expenses:Fees:Service Charges", Some(("0.04", "USD"))),
            posting("Income:Returns:Capital Gains:Short Term", Some(("-10.05", "USD"))),
            JournalEntry::Posting(traditional_ira),
        ]);
        verify_balanced(&mut txn).unwrap();
    }

    #[test]
    fn virtual_postings_do_not_need_to_balance() {
        let mut roth = posting("roth-contributions", Some(("500.00", "USD")));
        if let JournalEntry::Posting(p) = &mut roth {
            p.is_virtual = true;
        }
        let mut txn = transaction(vec![
            roth,
            posting("vanguard-roth-ira", Some(("500.00", "USD"))),
            posting("apple-checking", None),
        ]);
        balance_transaction(&mut txn).unwrap();
        let filled = txn.entries[2].as_posting().unwrap().amount.complete().unwrap();
        assert_eq!(filled.value, Decimal::from_str("-500.00").unwrap());
    }
}
