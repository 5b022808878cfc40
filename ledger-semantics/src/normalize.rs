//! Flattening tree-form entities into normalized form, per §4.5.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset, TimeZone as _};
use ledger_core::{
    Account, AccountRef, Book, Commodity, EntryCommon, Instant, Interval, JournalEntry, Posting,
    PricePoint, Quantity, TimeZoneSpec, Transaction,
};
use serde::{Deserialize, Serialize};

use crate::error::{SemanticError, Warning};
use crate::idgen::IdGen;
use crate::lookup::AccountTable;
use crate::validate::{validate_balance_check_commodity, validate_commodity};
use crate::weight::validate_posting;

/// One flattened, cross-referenced record in the normalized output stream.
///
/// Mirrors `beancount_core::Directive`'s own closed enum over directive
/// kinds: one variant per type tag §6 names. Parent-child relationships
/// that were implicit in the tree-form input (a transaction owning its
/// entries, an entry owning its invoice) are carried here by the ids each
/// variant's `EntryCommon`/struct fields already expose (`transaction_id`,
/// `entry_id`, `invoice_id`, `book_id`), rather than by nesting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NormalizedEntity {
    Book(Book),
    Commodity(Commodity),
    Price(PricePoint),
    Account(Account),
    Transaction(Transaction),
    OpenAccount(EntryCommon),
    CloseAccount(EntryCommon),
    Note { common: EntryCommon, interval: Option<Interval> },
    BalanceCheck { common: EntryCommon, amount: Quantity },
    Posting(Posting),
    Invoice(ledger_core::Invoice),
    Item(ledger_core::Item),
}

/// Tree-form input to [`normalize`]: everything parsed (and, for
/// transactions, already balanced) out of one source document.
#[derive(Default)]
pub struct NormalizeInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub commodities: Vec<Commodity>,
    pub accounts: Vec<Account>,
    pub prices: Vec<PricePoint>,
    pub transactions: Vec<Transaction>,
}

/// Flattens `input` into a normalized entity stream, per the preferred
/// output order in §4.5: book, commodities, prices, accounts (depth-first
/// over the account tree), then the journal in time order (transaction,
/// its entries, and -- immediately after the posting that owns it -- that
/// posting's invoice and items).
///
/// Returns the entity stream, any non-fatal warnings, and any per-entry
/// errors (account references that did not resolve, posting validity
/// violations) found along the way -- processing does not stop at the
/// first one, per §7's propagation policy.
pub fn normalize(
    input: NormalizeInput,
    default_zone: &TimeZoneSpec,
) -> (Vec<NormalizedEntity>, Vec<Warning>, Vec<SemanticError>) {
    let mut out = Vec::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    let mut idgen = IdGen::new();

    let book_id = idgen.next_for("book", None);
    out.push(NormalizedEntity::Book(
        Book::builder().stable_id(Some(book_id.clone())).title(input.title).description(input.description).build(),
    ));

    for mut commodity in input.commodities {
        errors.extend(validate_commodity(&commodity));
        commodity.book_id = Some(book_id.clone());
        commodity.stable_id = Some(idgen.next_for("comm", commodity.stable_id.as_deref()));
        out.push(NormalizedEntity::Commodity(commodity));
    }

    let mut seen_prices: std::collections::HashSet<(ledger_core::CommodityCode, String)> = std::collections::HashSet::new();
    for mut price in input.prices {
        let key = (price.commodity.clone(), price.observed_at.to_string());
        if !seen_prices.insert(key) {
            let warning = Warning::DuplicatePrice { commodity: price.commodity.clone(), observed_at: price.observed_at.to_string() };
            log::warn!("{}", warning);
            warnings.push(warning);
        }
        price.book_id = Some(book_id.clone());
        price.stable_id = Some(idgen.next_for("price", price.stable_id.as_deref()));
        out.push(NormalizedEntity::Price(price));
    }

    let mut accounts = dedup_accounts(input.accounts, &mut warnings);
    warn_on_prefix_paths(&accounts, &mut warnings);
    register_implicit_accounts(&mut accounts, &input.transactions);

    accounts.sort_by(|a, b| a.path.cmp(&b.path));
    for account in &mut accounts {
        account.book_id = Some(book_id.clone());
        account.stable_id = Some(idgen.next_for("acct", account.external_id.as_deref()));
    }
    let account_table = AccountTable::build(&accounts);
    let allowed_commodities_by_id: HashMap<String, HashSet<ledger_core::CommodityCode>> = accounts
        .iter()
        .filter_map(|a| a.stable_id.clone().map(|id| (id, a.allowed_commodities.clone())))
        .collect();
    for account in accounts {
        out.push(NormalizedEntity::Account(account));
    }

    let mut transactions = input.transactions;
    transactions.sort_by_cached_key(|t| transaction_instant(t, default_zone));

    for mut transaction in transactions {
        let txn_id = idgen.next_for("txn", None);
        transaction.book_id = Some(book_id.clone());
        transaction.stable_id = Some(txn_id.clone());
        let entries = std::mem::take(&mut transaction.entries);
        out.push(NormalizedEntity::Transaction(transaction));

        for entry in entries {
            normalize_entry(entry, &txn_id, &account_table, &allowed_commodities_by_id, &mut idgen, &mut out, &mut errors);
        }
    }

    (out, warnings, errors)
}

/// Resolves a transaction's sort key into a concrete, comparable instant,
/// using `default_zone` when the transaction carries no zone of its own
/// and falling back to UTC midnight if the zone cannot be resolved at all
/// (an unknown named zone, say) rather than letting one bad timestamp
/// abort the whole sort.
fn transaction_instant(transaction: &Transaction, default_zone: &TimeZoneSpec) -> DateTime<FixedOffset> {
    let instant = transaction.time.clone().unwrap_or_else(|| Instant::midnight(transaction.date));
    instant.to_fixed_offset(default_zone).unwrap_or_else(|_| {
        let midnight = transaction.date.and_hms_opt(0, 0, 0).expect("midnight always valid");
        FixedOffset::east_opt(0).unwrap().from_utc_datetime(&midnight)
    })
}

fn normalize_entry(
    entry: JournalEntry,
    txn_id: &str,
    account_table: &AccountTable,
    allowed_commodities_by_id: &HashMap<String, HashSet<ledger_core::CommodityCode>>,
    idgen: &mut IdGen,
    out: &mut Vec<NormalizedEntity>,
    errors: &mut Vec<SemanticError>,
) {
    let resolve = |common: &mut EntryCommon, errors: &mut Vec<SemanticError>| {
        common.transaction_id = Some(txn_id.to_string());
        match (account_table.resolve(&common.account_ref), &common.account_ref) {
            (Some(id), _) => common.account_id = Some(id.to_string()),
            // A path reference to an account never declared via an `account`
            // block still resolves -- declaration is not mandatory in this
            // format. `register_implicit_accounts` already gave every such
            // path an id before entries were visited, so this arm is only
            // reachable if that invariant is ever broken.
            (None, AccountRef::Path(_)) => {
                log::debug!("posting referenced undeclared account path '{}'", common.account_ref.display());
            }
            (None, AccountRef::Alias(_)) => {
                log::debug!("unresolved account alias '{}'", common.account_ref.display());
                errors.push(SemanticError::UnknownAccount { reference: common.account_ref.display() });
            }
        }
        common.stable_id = Some(idgen.next_for("entry", common.external_id.as_deref()));
    };

    match entry {
        JournalEntry::OpenAccount(mut common) => {
            resolve(&mut common, errors);
            out.push(NormalizedEntity::OpenAccount(common));
        }
        JournalEntry::CloseAccount(mut common) => {
            resolve(&mut common, errors);
            out.push(NormalizedEntity::CloseAccount(common));
        }
        JournalEntry::Note { mut common, interval } => {
            resolve(&mut common, errors);
            out.push(NormalizedEntity::Note { common, interval });
        }
        JournalEntry::BalanceCheck { mut common, amount } => {
            resolve(&mut common, errors);
            if let Some(account_id) = &common.account_id {
                errors.extend(validate_balance_check_commodity(account_id, &amount.commodity, allowed_commodities_by_id));
            }
            out.push(NormalizedEntity::BalanceCheck { common, amount });
        }
        JournalEntry::Posting(mut posting) => {
            resolve(&mut posting.common, errors);
            errors.extend(validate_posting(&posting));
            let entry_id = posting.common.stable_id.clone().expect("stamped by resolve");
            let invoice = posting.invoice.take();
            out.push(NormalizedEntity::Posting(posting));

            if let Some(mut invoice) = invoice {
                invoice.entry_id = Some(entry_id.clone());
                invoice.stable_id = Some(idgen.next_for("inv", invoice.stable_id.as_deref()));
                let invoice_id = invoice.stable_id.clone().unwrap();
                let items = std::mem::take(&mut invoice.items);
                out.push(NormalizedEntity::Invoice(invoice));
                for mut item in items {
                    item.invoice_id = Some(invoice_id.clone());
                    item.stable_id = Some(idgen.next_for("item", item.stable_id.as_deref()));
                    out.push(NormalizedEntity::Item(item));
                }
            }
        }
    }
}

/// Merges accounts declared more than once under the same path, in
/// declaration order, per §4.6's "subsequent declarations update only
/// fields present in the newer declaration" rule. Reports one warning per
/// redeclaration.
fn dedup_accounts(accounts: Vec<Account>, warnings: &mut Vec<Warning>) -> Vec<Account> {
    let mut merged: Vec<Account> = Vec::new();
    for account in accounts {
        if let Some(existing) = merged.iter_mut().find(|a: &&mut Account| a.path == account.path) {
            existing.merge_redeclaration(&account);
            let warning = Warning::DuplicateAccountDeclaration { path: account.path.clone() };
            log::warn!("{}", warning);
            warnings.push(warning);
        } else {
            merged.push(account);
        }
    }
    merged
}

/// Gives every account path a posting refers to but no `account` block ever
/// declared a bare, title-less `Account` record, per §8 scenario 8: a path
/// reference resolves whether or not it was declared, so this must happen
/// before [`AccountTable::build`] runs. An *alias* reference that binds to
/// nothing declared remains an error -- only paths are implicit.
///
/// A single-segment path that matches an already-declared alias is left
/// alone here: it is the grammar's path-before-alias ambiguity for a
/// bracketed/parenthesized short name (e.g. `[wallet]`), not a genuinely new
/// account, and minting an implicit account for it would shadow the real,
/// already-declared account that alias names -- see `AccountTable::resolve`.
fn register_implicit_accounts(accounts: &mut Vec<Account>, transactions: &[Transaction]) {
    let mut known: HashSet<Vec<String>> = accounts.iter().map(|a| a.path.clone()).collect();
    let aliases: HashSet<&str> = accounts.iter().filter_map(|a| a.alias.as_deref()).collect();
    for transaction in transactions {
        for entry in &transaction.entries {
            if let AccountRef::Path(path) = entry_account_ref(entry) {
                if let [single] = path.as_slice() {
                    if aliases.contains(single.as_str()) {
                        continue;
                    }
                }
                if known.insert(path.clone()) {
                    accounts.push(Account::builder().path(path.clone()).build());
                }
            }
        }
    }
}

fn entry_account_ref(entry: &JournalEntry) -> &AccountRef {
    match entry {
        JournalEntry::OpenAccount(common) | JournalEntry::CloseAccount(common) => &common.account_ref,
        JournalEntry::Note { common, .. } => &common.account_ref,
        JournalEntry::BalanceCheck { common, .. } => &common.account_ref,
        JournalEntry::Posting(posting) => &posting.common.account_ref,
    }
}

/// Warns (never errors, per §3/§9) whenever one declared account's path is
/// a strict prefix of another's.
fn warn_on_prefix_paths(accounts: &[Account], warnings: &mut Vec<Warning>) {
    for a in accounts {
        for b in accounts {
            if a.is_strict_prefix_of(b) {
                let warning = Warning::AccountPathIsPrefix { prefix: a.path.clone(), of: b.path.clone() };
                log::warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }
}
