use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::commodity::CommodityCode;
use crate::quantity::Quantity;
use crate::time::Instant;

/// A `P` price point: the observed value of one commodity in terms of
/// another at a specific instant.
///
/// ```text
/// P 2016-05-20 17:05:30 TSLA $220.28
/// ```
///
/// Uniqueness: at most one `PricePoint` per `(commodity, observed_at)` pair
/// -- enforced (as a warning, per the Open Questions in §9) during
/// normalization, not here.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct PricePoint {
    #[builder(default)]
    pub book_id: Option<String>,
    #[builder(default)]
    pub stable_id: Option<String>,
    pub commodity: CommodityCode,
    pub observed_at: Instant,
    pub value: Quantity,
    /// Raw source text this price point was parsed from.
    #[builder(default)]
    pub source_lines: Option<String>,
    /// Provenance of the quote (e.g. an exchange or feed name), per §3.
    /// Never populated by the grammar, which has no syntax for it -- left
    /// optional and uninferred, the same treatment as `Cost::lot_id`.
    #[builder(default)]
    pub source: Option<String>,
}
