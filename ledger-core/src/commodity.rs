use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// A commodity symbol, e.g. `USD`, `AAPL`, `HOOL_POINTS`.
///
/// Matches `[A-Za-z][A-Za-z0-9_]*`. The literal `$` is a source-level alias
/// for the code `USD` -- the grammar resolves that alias before a
/// `CommodityCode` ever reaches this type, so every `CommodityCode` is
/// already canonical.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CommodityCode(String);

impl CommodityCode {
    pub const USD_ALIAS: &'static str = "$";
    pub const USD: &'static str = "USD";

    /// Constructs a `CommodityCode`, resolving the `$` alias to `USD`.
    ///
    /// Does not otherwise validate the shape of `code` -- that is the
    /// grammar's job; by the time a `&str` reaches here it has already
    /// matched the `CommodityCode` production.
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        if code == Self::USD_ALIAS {
            CommodityCode(Self::USD.to_string())
        } else {
            CommodityCode(code)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommodityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<String>> From<T> for CommodityCode {
    fn from(s: T) -> Self {
        CommodityCode::new(s)
    }
}

/// The closed set of asset types a commodity definition may declare.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetType {
    Currency,
    Bond,
    Stock,
    MutualFund,
    ExchangeTradedFund,
    RewardPoints,
}

impl TryFrom<&str> for AssetType {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "currency" => Ok(AssetType::Currency),
            "bond" => Ok(AssetType::Bond),
            "stock" => Ok(AssetType::Stock),
            "mutual-fund" => Ok(AssetType::MutualFund),
            "exchange-traded-fund" => Ok(AssetType::ExchangeTradedFund),
            "reward-points" => Ok(AssetType::RewardPoints),
            other => Err(format!("unknown asset-type '{}'", other)),
        }
    }
}

/// The closed set of asset classes. A commodity may declare a single class
/// outright, or a probability map over classes that sums to 1.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetClassKind {
    DomesticEquity,
    InternationalEquity,
    DomesticBond,
    InternationalBond,
    Cash,
    RealEstate,
    Commodity,
    Other,
}

impl TryFrom<&str> for AssetClassKind {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "domestic-equity" => Ok(AssetClassKind::DomesticEquity),
            "international-equity" => Ok(AssetClassKind::InternationalEquity),
            "domestic-bond" => Ok(AssetClassKind::DomesticBond),
            "international-bond" => Ok(AssetClassKind::InternationalBond),
            "cash" => Ok(AssetClassKind::Cash),
            "real-estate" => Ok(AssetClassKind::RealEstate),
            "commodity" => Ok(AssetClassKind::Commodity),
            "other" => Ok(AssetClassKind::Other),
            other => Err(format!("unknown asset-class '{}'", other)),
        }
    }
}

/// Either a single asset class, or a probability map over classes that must
/// sum to 1 (checked by `ledger-semantics::validate`, not here).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetClass {
    Single(AssetClassKind),
    Weighted(HashMap<AssetClassKind, rust_decimal::Decimal>),
}

/// The closed set of asset sectors, shaped identically to `AssetClass`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetSectorKind {
    Technology,
    Financials,
    Healthcare,
    Energy,
    Industrials,
    ConsumerStaples,
    ConsumerDiscretionary,
    Utilities,
    Materials,
    RealEstate,
    Other,
}

impl TryFrom<&str> for AssetSectorKind {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "technology" => Ok(AssetSectorKind::Technology),
            "financials" => Ok(AssetSectorKind::Financials),
            "healthcare" => Ok(AssetSectorKind::Healthcare),
            "energy" => Ok(AssetSectorKind::Energy),
            "industrials" => Ok(AssetSectorKind::Industrials),
            "consumer-staples" => Ok(AssetSectorKind::ConsumerStaples),
            "consumer-discretionary" => Ok(AssetSectorKind::ConsumerDiscretionary),
            "utilities" => Ok(AssetSectorKind::Utilities),
            "materials" => Ok(AssetSectorKind::Materials),
            "real-estate" => Ok(AssetSectorKind::RealEstate),
            "other" => Ok(AssetSectorKind::Other),
            other => Err(format!("unknown asset-sector '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetSector {
    Single(AssetSectorKind),
    Weighted(HashMap<AssetSectorKind, rust_decimal::Decimal>),
}

/// A `commodity` definition entry.
///
/// ```text
/// commodity USD
///     note United States Dollars
///     note type: currency
///     format $1,000.00
/// ```
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct Commodity {
    /// Id of the owning book. Populated during normalization; absent on a
    /// freshly interpreted, tree-form commodity.
    #[builder(default)]
    pub book_id: Option<String>,
    /// Stable entity id, generated during normalization if not already
    /// present.
    #[builder(default)]
    pub stable_id: Option<String>,
    pub code: CommodityCode,
    pub title: String,
    #[builder(default)]
    pub description: Option<String>,
    /// The single currency-symbol character, e.g. `$`, when declared via
    /// `format $1,000.00`.
    #[builder(default)]
    pub currency_symbol: Option<char>,
    /// Number of decimal places implied by the `format` example, if any.
    #[builder(default)]
    pub precision: Option<u32>,
    #[builder(default)]
    pub asset_type: Option<AssetType>,
    #[builder(default)]
    pub asset_class: Option<AssetClass>,
    #[builder(default)]
    pub asset_sector: Option<AssetSector>,
    /// Raw source snippet this entity was interpreted from, when available.
    #[builder(default)]
    pub source: Option<String>,
}
