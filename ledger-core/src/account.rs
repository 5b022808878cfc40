use std::collections::HashSet;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::commodity::CommodityCode;

/// The closed set of account types an `account` declaration may carry via
/// `note type: ...`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    Cash,
    Savings,
    Checking,
    CreditCard,
    Brokerage,
    Retirement,
    Loan,
    Mortgage,
    Equity,
    Income,
    Expense,
    Liability,
    Asset,
}

impl TryFrom<&str> for AccountType {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "cash" => Ok(AccountType::Cash),
            "savings" => Ok(AccountType::Savings),
            "checking" => Ok(AccountType::Checking),
            "credit-card" => Ok(AccountType::CreditCard),
            "brokerage" => Ok(AccountType::Brokerage),
            "retirement" => Ok(AccountType::Retirement),
            "loan" => Ok(AccountType::Loan),
            "mortgage" => Ok(AccountType::Mortgage),
            "equity" => Ok(AccountType::Equity),
            "income" => Ok(AccountType::Income),
            "expense" => Ok(AccountType::Expense),
            "liability" => Ok(AccountType::Liability),
            "asset" => Ok(AccountType::Asset),
            other => Err(format!("unknown account type '{}'", other)),
        }
    }
}

/// An account declared (or implicitly referenced) within a book.
///
/// Identified by an ordered, non-empty path of segment strings, e.g.
/// `["Assets", "Cash", "Wallet"]` for `Assets:Cash:Wallet`. Declaration via
/// an `account` block is optional -- Ledger-cli style postings may reference
/// an undeclared path directly -- so most fields are optional.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct Account {
    /// Id of the owning book. Populated during normalization; absent on a
    /// freshly interpreted, tree-form account.
    #[builder(default)]
    pub book_id: Option<String>,
    /// Stable entity id, generated during normalization if not already
    /// present.
    #[builder(default)]
    pub stable_id: Option<String>,
    pub path: Vec<String>,
    #[builder(default)]
    pub title: Option<String>,
    #[builder(default)]
    pub description: Option<String>,
    /// A lowercase alias usable in postings in place of the full path, e.g.
    /// `alias wallet`.
    #[builder(default)]
    pub alias: Option<String>,
    #[builder(default)]
    pub account_type: Option<AccountType>,
    #[builder(default)]
    pub external_id: Option<String>,
    #[builder(default)]
    pub allowed_commodities: HashSet<CommodityCode>,
    #[builder(default)]
    pub links: HashSet<String>,
    #[builder(default)]
    pub source: Option<String>,
}

impl Account {
    pub fn path_str(&self) -> String {
        self.path.join(":")
    }

    /// True if `other`'s path is a strict, complete-segment prefix of this
    /// account's path -- the condition §3 flags as warning-worthy, never
    /// fatal, per the Open Questions in §9.
    pub fn is_strict_prefix_of(&self, other: &Account) -> bool {
        self.path.len() < other.path.len() && other.path.starts_with(&self.path[..])
    }

    /// Merges a redeclaration into this account: only fields actually
    /// present on `newer` overwrite this account's fields, per §4.6's
    /// "subsequent declarations update only fields present in the newer
    /// declaration" rule.
    pub fn merge_redeclaration(&mut self, newer: &Account) {
        if newer.title.is_some() {
            self.title = newer.title.clone();
        }
        if newer.description.is_some() {
            self.description = newer.description.clone();
        }
        if newer.alias.is_some() {
            self.alias = newer.alias.clone();
        }
        if newer.account_type.is_some() {
            self.account_type = newer.account_type;
        }
        if newer.external_id.is_some() {
            self.external_id = newer.external_id.clone();
        }
        if !newer.allowed_commodities.is_empty() {
            self.allowed_commodities = newer.allowed_commodities.clone();
        }
        if !newer.links.is_empty() {
            self.links.extend(newer.links.iter().cloned());
        }
    }
}

/// How a posting's account reference was written in the source: a full
/// path, an alias, a parenthesized virtual account, or a bracketed
/// balanced-virtual account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AccountRef {
    Path(Vec<String>),
    Alias(String),
}

impl AccountRef {
    pub fn display(&self) -> String {
        match self {
            AccountRef::Path(path) => path.join(":"),
            AccountRef::Alias(alias) => alias.clone(),
        }
    }
}
