//! Account lookup within a book, per §4.6.

use std::collections::HashMap;

use ledger_core::{Account, AccountRef};

/// An index over a book's accounts, keyed by path and by alias, built once
/// after accounts have been assigned their stable ids.
pub struct AccountTable {
    by_path: HashMap<Vec<String>, String>,
    by_alias: HashMap<String, String>,
}

impl AccountTable {
    /// Builds a table from already-deduplicated, id-assigned accounts.
    /// Accounts with no `stable_id` are skipped -- every account normalize
    /// hands this function has one by construction.
    pub fn build(accounts: &[Account]) -> Self {
        let mut by_path = HashMap::new();
        let mut by_alias = HashMap::new();
        for account in accounts {
            let Some(id) = &account.stable_id else { continue };
            by_path.insert(account.path.clone(), id.clone());
            if let Some(alias) = &account.alias {
                by_alias.insert(alias.clone(), id.clone());
            }
        }
        AccountTable { by_path, by_alias }
    }

    /// Resolves a posting/entry's account reference to a canonical account
    /// id, or `None` if it matches no declared path or alias.
    ///
    /// A single-segment path reference (as produced by `[short-name]`/
    /// `(short-name)`, which the grammar resolves as a path before an alias)
    /// falls back to the alias table when no account was declared at that
    /// literal one-segment path -- otherwise a bracketed/parenthesized
    /// reference to a declared alias could never resolve to the account
    /// that alias actually names.
    pub fn resolve(&self, account_ref: &AccountRef) -> Option<&str> {
        match account_ref {
            AccountRef::Path(path) => self.by_path.get(path).map(String::as_str).or_else(|| {
                match path.as_slice() {
                    [single] => self.by_alias.get(single).map(String::as_str),
                    _ => None,
                }
            }),
            AccountRef::Alias(alias) => self.by_alias.get(alias).map(String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use ledger_core::Account;

    use super::*;

    fn account(path: &[&str], alias: Option<&str>, id: &str) -> Account {
        Account::builder()
            .path(path.iter().map(|s| s.to_string()).collect())
            .alias(alias.map(str::to_string))
            .stable_id(Some(id.to_string()))
            .build()
    }

    #[test]
    fn resolves_by_path() {
        let table = AccountTable::build(&[account(&["Assets", "Cash", "Wallet"], None, "acct-0")]);
        let resolved = table.resolve(&AccountRef::Path(vec!["Assets".into(), "Cash".into(), "Wallet".into()]));
        assert_eq!(resolved, Some("acct-0"));
    }

    #[test]
    fn resolves_by_alias() {
        let table = AccountTable::build(&[account(&["Assets", "Cash", "Wallet"], Some("wallet"), "acct-0")]);
        assert_eq!(table.resolve(&AccountRef::Alias("wallet".to_string())), Some("acct-0"));
    }

    #[test]
    fn unresolved_reference_is_none() {
        let table = AccountTable::build(&[account(&["Assets"], None, "acct-0")]);
        assert_eq!(table.resolve(&AccountRef::Alias("nope".to_string())), None);
    }

    #[test]
    fn single_segment_path_falls_back_to_the_alias_table() {
        let table = AccountTable::build(&[account(&["Assets", "Cash", "Wallet"], Some("wallet"), "acct-0")]);
        let resolved = table.resolve(&AccountRef::Path(vec!["wallet".to_string()]));
        assert_eq!(resolved, Some("acct-0"));
    }

    #[test]
    fn multi_segment_path_does_not_fall_back_to_the_alias_table() {
        let table = AccountTable::build(&[account(&["Assets", "Cash", "Wallet"], Some("wallet"), "acct-0")]);
        let resolved = table.resolve(&AccountRef::Path(vec!["Assets".to_string(), "Cash".to_string()]));
        assert_eq!(resolved, None);
    }
}
