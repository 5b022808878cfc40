//! Data representation for a double-entry, Ledger-style plain text
//! accounting format.
//!
//! This crate owns every type that survives from "freshly parsed" all the
//! way through to "normalized and validated": commodities, accounts, books,
//! quantities, time values, and the tree-form/normal-form entity types.
//! It has no parsing or balancing logic of its own -- see `ledger-parser`
//! and `ledger-semantics`.

pub mod account;
pub mod book;
pub mod commodity;
pub mod entry;
pub mod invoice;
pub mod posting;
pub mod price;
pub mod quantity;
pub mod schema;
pub mod time;
pub mod transaction;

pub use account::{Account, AccountRef, AccountType};
pub use book::Book;
pub use commodity::{
    AssetClass, AssetClassKind, AssetSector, AssetSectorKind, AssetType, Commodity, CommodityCode,
};
pub use entry::{EntryCommon, JournalEntry};
pub use invoice::{Invoice, Item};
pub use posting::{Cost, Posting};
pub use price::PricePoint;
pub use quantity::Quantity;
pub use schema::SchemaCatalog;
pub use time::{Instant, Interval, LedgerDate, TimeZoneSpec};
pub use transaction::{Transaction, TransactionFlag};

/// A decimal value that preserves the scale it was written with.
///
/// `rust_decimal::Decimal` stores an unscaled mantissa plus an explicit
/// scale, so `10.00` and `10` compare equal but print back with their
/// original number of decimal places -- exactly the property the grammar's
/// `Number` production requires.
pub type Decimal = rust_decimal::Decimal;

/// A stable entity identifier, generated during normalization or lifted
/// verbatim from a source `UUID:` metadata tag.
pub type EntityId = String;
