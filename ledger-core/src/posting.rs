use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::entry::EntryCommon;
use crate::invoice::Invoice;
use crate::quantity::{IncompleteQuantity, Quantity};
use crate::time::LedgerDate;

/// A lot cost: the price a commodity was acquired at, plus the (optional)
/// date it was acquired. Folded from a posting's separate lot-cost (`{Q}`)
/// and lot-date (`[YYYY-MM-DD]`) syntax by the interpreter, per §4.2.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct Cost {
    pub amount: Quantity,
    #[builder(default)]
    pub date: Option<LedgerDate>,
    /// Referenced by the schema but never populated by the parser, per the
    /// Open Questions in §9 -- left optional and never inferred.
    #[builder(default)]
    pub lot_id: Option<String>,
}

/// A single posting within a transaction.
///
/// `amount` is `None` until interpolation fills at most one missing
/// posting per transaction (§4.4); after interpolation every surviving
/// posting's `amount` is `Some`.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct Posting {
    pub common: EntryCommon,
    #[builder(default)]
    pub amount: IncompleteQuantity,
    #[builder(default)]
    pub price: Option<Quantity>,
    #[builder(default)]
    pub cost: Option<Cost>,
    /// An explicit balancing weight, overriding the derivation in §4.3.
    #[builder(default)]
    pub weight: Option<Quantity>,
    #[builder(default = false)]
    pub is_virtual: bool,
    /// True for a `[balanced-virtual]` account reference specifically --
    /// distinct from an ordinary `(virtual)` posting because a
    /// balanced-virtual posting with a balance assertion is rewritten into
    /// a `BalanceCheck` entry by the interpreter (§4.2), while an ordinary
    /// virtual posting never contributes to balancing but still stays a
    /// `Posting`.
    #[builder(default = false)]
    pub is_balanced_virtual: bool,
    #[builder(default)]
    pub payee: Option<String>,
    /// A balance assertion attached directly to this posting via `= Q`.
    #[builder(default)]
    pub balance_assertion: Option<Quantity>,
    #[builder(default)]
    pub invoice: Option<Invoice>,
}

impl Posting {
    /// Whether this posting is real (participates in transaction balancing)
    /// as opposed to virtual.
    pub fn is_real(&self) -> bool {
        !self.is_virtual && !self.is_balanced_virtual
    }

    /// The commodity that would scale this posting's weight away from its
    /// raw amount -- `cost.amount`'s if a lot cost is set (a lot's booking
    /// value is measured against its acquisition cost even when the same
    /// posting also carries a later `@` sale price), else `price`'s.
    pub fn scale(&self) -> Option<&Quantity> {
        self.cost.as_ref().map(|c| &c.amount).or_else(|| self.price.as_ref())
    }
}
