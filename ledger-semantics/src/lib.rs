//! Posting weight derivation, transaction balancing/interpolation,
//! normalization to flat form, and account lookup -- the semantic layer
//! that sits between `ledger-parser`'s tree-form output and a validated,
//! query-ready dataset.
//!
//! `ledger-parser` produces tree-form entities (a `Transaction` owning its
//! entries, a `Posting` owning its invoice); this crate balances each
//! transaction in place ([`balance_transaction`]) and then flattens the
//! whole book into a normalized entity stream ([`normalize`]). Wiring the
//! two together over a full document, plus aggregating errors from both
//! stages, is the facade crate's job.

pub mod balance;
pub mod error;
pub mod idgen;
pub mod lookup;
pub mod normalize;
pub mod validate;
pub mod weight;

pub use balance::{balance_transaction, verify_balanced};
pub use error::{SemanticError, SemanticResult, Warning};
pub use idgen::IdGen;
pub use lookup::AccountTable;
pub use normalize::{normalize, NormalizeInput, NormalizedEntity};
pub use validate::{validate_balance_check_commodity, validate_commodity};
pub use weight::{derive_weight, validate_posting};
