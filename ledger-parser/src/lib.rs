//! Grammar, parse tree, and tree interpreter for the Ledger-style plain
//! text format `ledger-core` models.
//!
//! `parse_book_source` is the crate's single public entry point: it groups
//! raw input (§4.7), parses each group with the `pest` grammar, and walks
//! the resulting parse tree into `ledger-core` entities. It does not
//! balance transactions or normalize tree-form entities into flat
//! normal form -- see `ledger-semantics` for that.

use ledger_core::{Account, Commodity, PricePoint, SchemaCatalog, TimeZoneSpec, Transaction};
use pest::Parser;
use pest_derive::Parser as PestParser;

pub mod error;
mod group;
mod interpret;
mod tree;

use error::{ParseError, ParseResult};
use interpret::ParsedGroup;

#[derive(PestParser)]
#[grammar = "ledger.pest"]
pub struct LedgerParser;

/// Every entity the interpreter can produce from a single top-level entry
/// group, still in tree form (a `Transaction` owns its postings and their
/// invoices; normalization into flat, cross-referenced entities happens in
/// `ledger-semantics`).
#[derive(Default)]
pub struct ParsedBook {
    pub commodities: Vec<Commodity>,
    pub accounts: Vec<Account>,
    pub prices: Vec<PricePoint>,
    pub transactions: Vec<Transaction>,
}

/// Parses and interprets an entire Ledger source document.
///
/// Per §7's propagation policy, a structural parse failure aborts only the
/// group it occurred in; parsing continues with the remaining groups. The
/// returned error vector preserves each failure's original group text
/// alongside its `ParseError`.
pub fn parse_book_source(
    input: &str,
    schema: &SchemaCatalog,
    default_zone: &TimeZoneSpec,
) -> (ParsedBook, Vec<ParseError>) {
    let mut book = ParsedBook::default();
    let mut errors = Vec::new();

    for group_text in group::group_entries(input) {
        match parse_group(&group_text, schema, default_zone) {
            Ok(ParsedGroup::Commodity(c)) => book.commodities.push(c),
            Ok(ParsedGroup::Account(a)) => book.accounts.push(a),
            Ok(ParsedGroup::Price(p)) => book.prices.push(p),
            Ok(ParsedGroup::Transaction(t)) => book.transactions.push(t),
            Ok(ParsedGroup::Ignored) => {}
            Err(e) => errors.push(e),
        }
    }

    (book, errors)
}

/// Parses and interprets a single pre-grouped entry. Exposed separately
/// from [`parse_book_source`] so callers (and tests) can feed one fixture
/// at a time without manually grouping it first.
pub fn parse_group(
    group_text: &str,
    schema: &SchemaCatalog,
    default_zone: &TimeZoneSpec,
) -> ParseResult<ParsedGroup> {
    let mut pairs = LedgerParser::parse(Rule::file, group_text)?;
    let file_pair = pairs.next().ok_or_else(|| ParseError::invalid_state("non-empty parse result"))?;
    let entry_pair = file_pair
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or_else(|| ParseError::invalid_state("at least one top-level entry"))?;
    let inner = entry_pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::invalid_state("entry body"))?;
    interpret::interpret_entry(inner, schema, default_zone)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use ledger_core::SchemaCatalog;
    use pest::Parser;

    use super::*;

    macro_rules! parse_ok {
        ( $rule:ident, $input:expr ) => {
            assert_eq!(LedgerParser::parse(Rule::$rule, $input).unwrap().as_str(), $input);
        };
    }

    macro_rules! parse_fail {
        ( $rule:ident, $input:expr ) => {
            assert!(LedgerParser::parse(Rule::$rule, $input).is_err());
        };
    }

    #[test]
    fn date_rule() {
        parse_ok!(date, "2019-01-12");
        parse_ok!(date, "1979/01/01");
        parse_fail!(date, "2020-13");
    }

    #[test]
    fn quantity_rule() {
        parse_ok!(quantity, "$20.00");
        parse_ok!(quantity, "20.00 USD");
        parse_ok!(quantity, "0");
    }

    #[test]
    fn account_path_rule() {
        parse_ok!(account_path, "Assets:Cash:Wallet");
        parse_ok!(account_path, "Expenses:Transit:Taxi");
    }

    fn default_zone() -> ledger_core::TimeZoneSpec {
        ledger_core::TimeZoneSpec::Utc
    }

    #[test]
    fn parses_commodity_definition() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            commodity USD
                note United States Dollars
                note type: currency
        "};
        let group = super::group::group_entries(src);
        assert_eq!(group.len(), 1);
        match parse_group(&group[0], &schema, &default_zone()).unwrap() {
            ParsedGroup::Commodity(c) => {
                assert_eq!(c.code.as_str(), "USD");
                assert_eq!(c.description.as_deref(), Some("United States Dollars"));
                assert_eq!(c.asset_type, Some(ledger_core::AssetType::Currency));
            }
            _ => panic!("expected a commodity definition"),
        }
    }

    #[test]
    fn commodity_format_line_yields_currency_symbol_and_precision() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            commodity USD
                note United States Dollars
                note type: currency
                format $1,000.00
        "};
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Commodity(c) => {
                assert_eq!(c.currency_symbol, Some('$'));
                assert_eq!(c.precision, Some(2));
            }
            _ => panic!("expected a commodity definition"),
        }
    }

    #[test]
    fn commodity_asset_class_weights_parse_into_a_weighted_map() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            commodity VTSAX
                note Vanguard Total Stock Market Index Fund
                note type: mutual-fund
                asset-class: domestic-equity 0.6, international-equity 0.4
        "};
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Commodity(c) => match c.asset_class {
                Some(ledger_core::AssetClass::Weighted(map)) => {
                    assert_eq!(map.len(), 2);
                    assert_eq!(
                        map.get(&ledger_core::AssetClassKind::DomesticEquity).map(|d| d.to_string()),
                        Some("0.6".to_string())
                    );
                }
                other => panic!("expected a weighted asset class, got {:?}", other),
            },
            _ => panic!("expected a commodity definition"),
        }
    }

    #[test]
    fn account_assert_commodity_line_constrains_allowed_commodities() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            account Assets:Cash:Wallet
                alias wallet
                assert commodity == \"$\"
                note type: cash
        "};
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Account(a) => {
                assert_eq!(a.allowed_commodities, std::collections::HashSet::from([ledger_core::CommodityCode::new("USD")]));
            }
            _ => panic!("expected an account definition"),
        }
    }

    #[test]
    fn parses_account_definition_with_alias() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            account Assets:Cash:Wallet
                alias wallet
                note type: cash
        "};
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Account(a) => {
                assert_eq!(a.path, vec!["Assets", "Cash", "Wallet"]);
                assert_eq!(a.alias.as_deref(), Some("wallet"));
                assert_eq!(a.account_type, Some(ledger_core::AccountType::Cash));
            }
            _ => panic!("expected an account definition"),
        }
    }

    #[test]
    fn parses_commodity_price() {
        let schema = SchemaCatalog::standard();
        let src = "P 2016-05-20 17:05:30 TSLA $220.28\n";
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Price(p) => {
                assert_eq!(p.commodity.as_str(), "TSLA");
                assert_eq!(p.value.commodity.as_str(), "USD");
            }
            _ => panic!("expected a price point"),
        }
    }

    #[test]
    fn parses_opening_balance_transaction() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            2009-08-01 * Opening Balance
                wallet                                 $20.00
                Equity:Opening Balances
        "};
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Transaction(t) => {
                assert_eq!(t.title, "Opening Balance");
                assert_eq!(t.flag, Some(ledger_core::TransactionFlag::Cleared));
                assert_eq!(t.entries.len(), 2);
                let first = t.entries[0].as_posting().unwrap();
                assert_eq!(first.amount.complete().unwrap().value.to_string(), "20.00");
            }
            _ => panic!("expected a transaction"),
        }
    }

    #[test]
    fn parses_a_transaction_level_time_metadata_line() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            2016-04-16 ! Uber
                ; time: 14:03
                Expenses:Transit:Taxi     $8.19
                credit-card
        "};
        let expected_time = ledger_core::time::parse_time("14:03").unwrap();
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Transaction(t) => {
                assert_eq!(t.flag, Some(ledger_core::TransactionFlag::Pending));
                assert_eq!(t.entries.len(), 2);
                let time = t.time.as_ref().expect("transaction-level time resolved from the `; time:` line");
                assert_eq!(time.time, expected_time);
                // Distributed down to every entry that didn't carry its own.
                for entry in &t.entries {
                    let entry_time = entry.common().time.as_ref().expect("distributed time");
                    assert_eq!(entry_time.time, expected_time);
                }
            }
            _ => panic!("expected a transaction"),
        }
    }

    #[test]
    fn parses_balance_assertion_as_balance_check() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            2013-12-07 Balance Assertions
                [apple-checking]                          0 = $120.00
        "};
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Transaction(t) => {
                assert_eq!(t.entries.len(), 1);
                assert_eq!(t.entries[0].kind_name(), "balance-check");
            }
            _ => panic!("expected a transaction"),
        }
    }

    #[test]
    fn parses_a_tax_percentage_line_item() {
        let schema = SchemaCatalog::standard();
        let src = concat!(
            "2020-01-01 * Sale\n",
            "    Income:Sales                               $-139.51\n",
            "    Assets:Cash:Wallet                           $127.29\n",
            "        ; item: Widget $127.29 @ 9.6%\n",
        );
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Transaction(t) => {
                let wallet = t.entries[1].as_posting().unwrap();
                let invoice = wallet.invoice.as_ref().expect("invoice attached to the posting with the item");
                assert_eq!(invoice.items.len(), 1);
                let item = &invoice.items[0];
                assert_eq!(item.title, "Widget");
                assert_eq!(item.total.value.to_string(), "12.22");
                assert_eq!(item.total.commodity.as_str(), "USD");
            }
            _ => panic!("expected a transaction"),
        }
    }

    #[test]
    fn rejects_malformed_transaction() {
        let schema = SchemaCatalog::standard();
        let src = "not a valid entry at all\n";
        assert!(parse_group(src, &schema, &default_zone()).is_err());
    }

    #[test]
    fn parses_open_and_close_account_entries_inside_a_transaction() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {"
            2014-05-01 * Account Lifecycle
                open Assets:Brokerage
                close Assets:OldChecking
        "};
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Transaction(t) => {
                assert_eq!(t.entries.len(), 2);
                assert_eq!(t.entries[0].kind_name(), "open-account");
                assert_eq!(t.entries[1].kind_name(), "close-account");
            }
            _ => panic!("expected a transaction"),
        }
    }

    #[test]
    fn parses_a_note_entry_with_a_description_and_interval() {
        let schema = SchemaCatalog::standard();
        let src = indoc! {r#"
            2015-06-01 * Annual Review
                note Assets:Brokerage "Rebalanced to target allocation" [2015-01-01..2015-12-31]
        "#};
        match parse_group(src, &schema, &default_zone()).unwrap() {
            ParsedGroup::Transaction(t) => {
                assert_eq!(t.entries.len(), 1);
                match &t.entries[0] {
                    ledger_core::JournalEntry::Note { common, interval } => {
                        assert_eq!(common.description.as_deref(), Some("Rebalanced to target allocation"));
                        let interval = interval.as_ref().expect("parsed interval");
                        assert!(interval.end.is_some());
                    }
                    other => panic!("expected a note entry, got {:?}", other),
                }
            }
            _ => panic!("expected a transaction"),
        }
    }
}
