use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::quantity::Quantity;
use crate::Decimal;

/// Either a bare count or a quantity -- an item's `amount` may be a unit
/// count (e.g. `3` widgets) or a full `(value, commodity)` quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AmountOrCount {
    Count(Decimal),
    Quantity(Quantity),
}

/// Either a per-unit quantity or a bare percentage (divided by 100 already
/// by the time it reaches this type, per the grammar's `Percentage`
/// production).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PriceOrPercentage {
    Quantity(Quantity),
    Percentage(Decimal),
}

/// A single line item on an invoice.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct Item {
    #[builder(default)]
    pub stable_id: Option<String>,
    #[builder(default)]
    pub invoice_id: Option<String>,
    #[builder(default)]
    pub rank: Option<u32>,
    pub title: String,
    #[builder(default)]
    pub description: Option<String>,
    #[builder(default)]
    pub vendor: Option<String>,
    pub total: Quantity,
    pub amount: AmountOrCount,
    pub price: PriceOrPercentage,
    #[builder(default)]
    pub tax_groups: HashSet<String>,
    #[builder(default)]
    pub tax_applied: Option<String>,
}

/// An invoice: an ordered list of items attached to a posting, created when
/// the interpreter finds `; item: ...` metadata lines under it (§4.2).
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct Invoice {
    #[builder(default)]
    pub stable_id: Option<String>,
    /// Id of the posting/entry this invoice is attached to; populated
    /// during normalization.
    #[builder(default)]
    pub entry_id: Option<String>,
    pub items: Vec<Item>,
}
