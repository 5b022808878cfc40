use std::fmt;

use serde::{Deserialize, Serialize};

use crate::commodity::CommodityCode;
use crate::Decimal;

/// A `(value, commodity)` pair, preserving the scale `value` was written
/// with.
///
/// Printed with the `#finance/q` tag this format's self-describing data
/// notation uses, so a debug rendering an embedder dumps reads the same
/// way a tool built against the original notation would.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Decimal,
    pub commodity: CommodityCode,
}

impl Quantity {
    pub fn new(value: Decimal, commodity: impl Into<CommodityCode>) -> Self {
        Quantity {
            value,
            commodity: commodity.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    pub fn negate(&self) -> Quantity {
        Quantity {
            value: -self.value,
            commodity: self.commodity.clone(),
        }
    }

    /// Adds two quantities of the same commodity. Panics if the commodities
    /// differ -- callers (the balancing engine) only ever add same-commodity
    /// quantities, grouped by commodity beforehand.
    pub fn add_same_commodity(&self, other: &Quantity) -> Quantity {
        assert_eq!(
            self.commodity, other.commodity,
            "add_same_commodity called across commodities"
        );
        Quantity {
            value: self.value + other.value,
            commodity: self.commodity.clone(),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#finance/q [{} {}]", self.value, self.commodity)
    }
}

/// A written quantity that may be missing its value and/or commodity (e.g.
/// a posting with only an account and no amount, to be interpolated later).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncompleteQuantity {
    pub value: Option<Decimal>,
    pub commodity: Option<CommodityCode>,
}

impl IncompleteQuantity {
    pub fn complete(&self) -> Option<Quantity> {
        match (&self.value, &self.commodity) {
            (Some(value), Some(commodity)) => Some(Quantity {
                value: *value,
                commodity: commodity.clone(),
            }),
            _ => None,
        }
    }
}

impl From<Quantity> for IncompleteQuantity {
    fn from(q: Quantity) -> Self {
        IncompleteQuantity {
            value: Some(q.value),
            commodity: Some(q.commodity),
        }
    }
}
