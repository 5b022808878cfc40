use ledger_core::CommodityCode;
use thiserror::Error;

pub type SemanticResult<T> = Result<T, SemanticError>;

/// A structured, fatal error raised while deriving posting weights,
/// balancing a transaction, or normalizing tree-form entities, per §7.
///
/// Every variant corresponds to one of the error kinds §7 enumerates for
/// this layer; `offender` carries the raw source snippet of the entry the
/// error was raised against, when one was available, matching the
/// `{kind, message, location?, offender?}` error shape of §6.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SemanticError {
    #[error("posting's amount commodity does not match its balance assertion: {offender}")]
    BalanceCheckCommodityMismatch { offender: String },
    #[error("posting's price commodity recurses into its own amount commodity: {offender}")]
    RecursivePrice { offender: String },
    #[error("posting's lot-cost commodity recurses into its own amount commodity: {offender}")]
    RecursiveCost { offender: String },
    #[error("posting declares an explicit weight with no price or cost to scale: {offender}")]
    RedundantWeight { offender: String },
    #[error("posting's explicit weight commodity does not match its price/cost commodity: {offender}")]
    WeightCommodityMismatch { offender: String },
    #[error("transaction has {count} postings with no amount; at most one can be interpolated")]
    MultipleMissingAmounts { count: usize },
    #[error("cannot infer a missing posting amount: no real posting weights to balance against")]
    CannotInferWithNoWeights,
    #[error("cannot infer a missing posting amount: real weights span multiple commodities {commodities:?}")]
    AmbiguousInterpolation { commodities: Vec<CommodityCode> },
    #[error("transaction does not balance to zero in commodity {commodity}: sum is {sum}")]
    NonzeroTransactionSum { commodity: CommodityCode, sum: ledger_core::Decimal },
    #[error("account alias '{reference}' does not match any declared alias")]
    UnknownAccount { reference: String },
    #[error("balance-check against {commodity} does not match {account}'s declared commodity set")]
    BalanceCheckAccountCommodityMismatch { account: String, commodity: CommodityCode },
    #[error("commodity {code}'s asset-class weights sum to {sum}, not 1")]
    AssetClassWeightsNotNormalized { code: CommodityCode, sum: ledger_core::Decimal },
    #[error("commodity {code}'s asset-sector weights sum to {sum}, not 1")]
    AssetSectorWeightsNotNormalized { code: CommodityCode, sum: ledger_core::Decimal },
}

/// A non-fatal condition surfaced alongside a successful result, per §7's
/// "warnings are surfaced but do not stop processing" propagation policy.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// An `account` block redeclared a path already declared earlier in the
    /// same book; only the fields present on the newer declaration were
    /// merged in, per §4.6.
    DuplicateAccountDeclaration { path: Vec<String> },
    /// One account's path is a strict prefix of another's -- described in
    /// §3 as a should-not, left unenforced per the Open Questions in §9.
    AccountPathIsPrefix { prefix: Vec<String>, of: Vec<String> },
    /// A second `PricePoint` was observed for a `(commodity, observed_at)`
    /// pair already seen -- the historical dedup check §9 notes was never
    /// fully implemented upstream; kept as a warning here, matching intent.
    DuplicatePrice { commodity: CommodityCode, observed_at: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::DuplicateAccountDeclaration { path } => {
                write!(f, "duplicate account declaration for '{}'", path.join(":"))
            }
            Warning::AccountPathIsPrefix { prefix, of } => {
                write!(f, "account path '{}' is a prefix of '{}'", prefix.join(":"), of.join(":"))
            }
            Warning::DuplicatePrice { commodity, observed_at } => {
                write!(f, "duplicate price for {} observed at {}", commodity, observed_at)
            }
        }
    }
}
