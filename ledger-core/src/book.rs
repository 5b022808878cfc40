use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::account::Account;
use crate::price::PricePoint;
use crate::transaction::Transaction;

/// The top-level container for a single ingested ledger file: every
/// account declared in it, every price point observed in it, and its
/// chronologically-ordered transaction journal.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct Book {
    #[builder(default)]
    pub stable_id: Option<String>,
    #[builder(default)]
    pub title: Option<String>,
    #[builder(default)]
    pub description: Option<String>,
    #[builder(default)]
    pub accounts: Vec<Account>,
    #[builder(default)]
    pub prices: Vec<PricePoint>,
    #[builder(default)]
    pub journal: Vec<Transaction>,
}
