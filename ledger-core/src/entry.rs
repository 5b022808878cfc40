use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::account::AccountRef;
use crate::posting::Posting;
use crate::quantity::Quantity;
use crate::time::{Instant, Interval, LedgerDate};

/// Fields shared by every journal entry variant, per §3's "Journal entry"
/// definition.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct EntryCommon {
    pub account_ref: AccountRef,
    /// The canonical account this entry's `account_ref` resolves to; set
    /// during normalization (§4.5, §4.6). `None` on a freshly interpreted,
    /// tree-form entry.
    #[builder(default)]
    pub account_id: Option<String>,
    pub date: LedgerDate,
    #[builder(default)]
    pub time: Option<Instant>,
    /// Tiebreak ordinal within a timestamp; stamped by the interpreter from
    /// the entry's position inside its owning transaction (§4.2).
    #[builder(default)]
    pub rank: Option<u32>,
    #[builder(default)]
    pub description: Option<String>,
    #[builder(default)]
    pub external_id: Option<String>,
    #[builder(default)]
    pub source_lines: Option<String>,
    /// Set once this entry has been resolved and flattened by
    /// normalization (§4.5); `None` on a freshly interpreted, tree-form
    /// entry.
    #[builder(default)]
    pub stable_id: Option<String>,
    #[builder(default)]
    pub transaction_id: Option<String>,
}

/// A journal entry: one line (and its attached metadata) inside a
/// transaction, or a standalone account lifecycle/assertion entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JournalEntry {
    OpenAccount(EntryCommon),
    CloseAccount(EntryCommon),
    /// Requires `common.description`; `interval` is optional.
    Note {
        common: EntryCommon,
        interval: Option<Interval>,
    },
    /// Requires `amount`: the quantity the account must equal.
    BalanceCheck { common: EntryCommon, amount: Quantity },
    Posting(Posting),
}

impl JournalEntry {
    pub fn common(&self) -> &EntryCommon {
        match self {
            JournalEntry::OpenAccount(c) => c,
            JournalEntry::CloseAccount(c) => c,
            JournalEntry::Note { common, .. } => common,
            JournalEntry::BalanceCheck { common, .. } => common,
            JournalEntry::Posting(p) => &p.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut EntryCommon {
        match self {
            JournalEntry::OpenAccount(c) => c,
            JournalEntry::CloseAccount(c) => c,
            JournalEntry::Note { common, .. } => common,
            JournalEntry::BalanceCheck { common, .. } => common,
            JournalEntry::Posting(p) => &mut p.common,
        }
    }

    pub fn as_posting(&self) -> Option<&Posting> {
        match self {
            JournalEntry::Posting(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_posting_mut(&mut self) -> Option<&mut Posting> {
        match self {
            JournalEntry::Posting(p) => Some(p),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            JournalEntry::OpenAccount(_) => "open-account",
            JournalEntry::CloseAccount(_) => "close-account",
            JournalEntry::Note { .. } => "note",
            JournalEntry::BalanceCheck { .. } => "balance-check",
            JournalEntry::Posting(_) => "posting",
        }
    }
}
