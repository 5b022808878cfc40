use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::entry::JournalEntry;
use crate::time::{Instant, LedgerDate};

/// A transaction's clearance flag, written as `*` (cleared) or `!` (pending)
/// immediately after the date.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionFlag {
    Pending,
    Cleared,
}

/// A transaction: a titled, dated group of journal entries whose real
/// postings must balance to zero per commodity (§4.4).
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct Transaction {
    #[builder(default)]
    pub book_id: Option<String>,
    #[builder(default)]
    pub stable_id: Option<String>,
    pub title: String,
    pub date: LedgerDate,
    #[builder(default)]
    pub time: Option<Instant>,
    #[builder(default)]
    pub flag: Option<TransactionFlag>,
    #[builder(default)]
    pub tags: HashSet<String>,
    #[builder(default)]
    pub links: HashSet<String>,
    pub entries: Vec<JournalEntry>,
    #[builder(default)]
    pub source: Option<String>,
}

impl Transaction {
    pub fn real_postings(&self) -> impl Iterator<Item = &crate::posting::Posting> {
        self.entries.iter().filter_map(|e| e.as_posting()).filter(|p| p.is_real())
    }
}
