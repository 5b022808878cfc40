//! Entity-schema invariants that apply to a single entity in isolation, or
//! to an entity against one other it references -- distinct from posting
//! weight derivation (`weight.rs`) and transaction balancing (`balance.rs`),
//! which both concern a whole transaction's postings together.

use std::collections::{HashMap, HashSet};

use ledger_core::{AssetClass, AssetSector, Commodity, CommodityCode, Decimal};

use crate::error::SemanticError;

/// Checks a commodity's `asset-class`/`asset-sector` weighted maps, when
/// present, each sum to exactly 1 -- the "probability map over a closed
/// class set" shape §3 describes. A single-keyword class or sector needs no
/// check; it carries no weights to sum.
pub fn validate_commodity(commodity: &Commodity) -> Vec<SemanticError> {
    let mut errors = Vec::new();

    if let Some(AssetClass::Weighted(weights)) = &commodity.asset_class {
        let sum = sum_weights(weights.values());
        if sum != Decimal::ONE {
            errors.push(SemanticError::AssetClassWeightsNotNormalized { code: commodity.code.clone(), sum });
        }
    }

    if let Some(AssetSector::Weighted(weights)) = &commodity.asset_sector {
        let sum = sum_weights(weights.values());
        if sum != Decimal::ONE {
            errors.push(SemanticError::AssetSectorWeightsNotNormalized { code: commodity.code.clone(), sum });
        }
    }

    errors
}

fn sum_weights<'a>(values: impl Iterator<Item = &'a Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, |acc, v| acc + *v)
}

/// Checks a balance-check's asserted commodity against the commodity set an
/// account declared for itself, per §8's "for every balance-check, the
/// asserted commodity matches the account's commodity set when one is
/// declared" property. An account with an empty `allowed_commodities` set
/// declared nothing, so any commodity is accepted.
pub fn validate_balance_check_commodity(
    account_id: &str,
    commodity: &CommodityCode,
    allowed_by_account: &HashMap<String, HashSet<CommodityCode>>,
) -> Option<SemanticError> {
    let allowed = allowed_by_account.get(account_id)?;
    if allowed.is_empty() || allowed.contains(commodity) {
        None
    } else {
        Some(SemanticError::BalanceCheckAccountCommodityMismatch {
            account: account_id.to_string(),
            commodity: commodity.clone(),
        })
    }
}
