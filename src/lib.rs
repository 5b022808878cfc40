//! Wires `ledger-parser` and `ledger-semantics` into a single entry point:
//! `ingest()` takes raw Ledger-style source text and returns a normalized,
//! balanced, validated entity stream.
//!
//! Control flow, per the pipeline this system implements: group input by
//! blank lines, parse each group, interpret it into a tree-form entity,
//! balance every transaction's postings, then flatten the whole book into
//! [`ledger_semantics::NormalizedEntity`] records. Each stage's errors are
//! collected rather than aborting the run -- a malformed group, an
//! unbalanceable transaction, or an unresolved account reference is
//! reported against the entity it came from while ingestion continues
//! with the rest, per the propagation policy this system follows.

use ledger_core::{SchemaCatalog, TimeZoneSpec};
use ledger_parser::error::ParseError;
use ledger_semantics::{NormalizeInput, NormalizedEntity, SemanticError, Warning};
use thiserror::Error;

/// Configuration threaded explicitly into a single [`ingest`] call.
///
/// Nothing here is read from the process environment or a global: two
/// concurrent calls with different configurations (different default
/// time zones, different schema catalogs) cannot interfere with each
/// other.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Zone used to resolve an entry's instant when it carries no
    /// explicit `time:` metadata of its own.
    pub default_zone: TimeZoneSpec,
    /// Closed enumerations and metadata-tag lift table threaded into the
    /// interpreter.
    pub schema: SchemaCatalog,
    /// Book-level title; the source format carries no book header of its
    /// own, so this is supplied by the embedder.
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            default_zone: TimeZoneSpec::Utc,
            schema: SchemaCatalog::standard(),
            title: None,
            description: None,
        }
    }
}

/// The successful result of [`ingest`]: a normalized entity stream plus
/// every non-fatal warning discovered while producing it.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub entities: Vec<NormalizedEntity>,
    pub warnings: Vec<Warning>,
}

/// One error encountered at any stage of the pipeline, tagged with the
/// stage it came from. Aggregated, not nested -- `ingest()` returns every
/// error it found alongside whatever of the outcome it could still
/// produce, matching §7's "recoverable-per-entry errors are reported
/// against that entry and parsing continues" propagation policy.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("transaction {transaction_index} failed to balance: {source}")]
    Balance { transaction_index: usize, source: SemanticError },
    #[error("{0}")]
    Semantic(#[from] SemanticError),
}

/// Parses, balances, and normalizes `source` into an [`IngestOutcome`],
/// per `config`.
///
/// Always returns whatever it could produce alongside the errors it
/// found -- a group that fails to parse, a transaction that fails to
/// balance, or an entity that fails normalization does not stop the rest
/// of the document from being ingested.
pub fn ingest(source: &str, config: &IngestConfig) -> (IngestOutcome, Vec<IngestError>) {
    let mut errors = Vec::new();

    let (mut parsed, parse_errors) = ledger_parser::parse_book_source(source, &config.schema, &config.default_zone);
    errors.extend(parse_errors.into_iter().map(IngestError::Parse));

    for (index, transaction) in parsed.transactions.iter_mut().enumerate() {
        if let Err(source) = ledger_semantics::balance_transaction(transaction) {
            errors.push(IngestError::Balance { transaction_index: index, source });
        }
    }

    let input = NormalizeInput {
        title: config.title.clone(),
        description: config.description.clone(),
        commodities: parsed.commodities,
        accounts: parsed.accounts,
        prices: parsed.prices,
        transactions: parsed.transactions,
    };
    let (entities, warnings, semantic_errors) = ledger_semantics::normalize(input, &config.default_zone);
    errors.extend(semantic_errors.into_iter().map(IngestError::Semantic));

    (IngestOutcome { entities, warnings }, errors)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn ingests_an_opening_balance_transaction_end_to_end() {
        let source = indoc! {"
            account Assets:Cash:Wallet
                alias wallet

            2009-08-01 * Opening Balance
                wallet                                 $20.00
                Equity:Opening Balances
        "};
        let (outcome, errors) = ingest(source, &IngestConfig::default());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        let postings: Vec<_> = outcome
            .entities
            .iter()
            .filter_map(|e| match e {
                NormalizedEntity::Posting(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(postings.len(), 2);
        assert!(postings.iter().all(|p| p.common.account_id.is_some()));

        let interpolated = postings
            .iter()
            .find(|p| p.common.account_ref.display() == "Equity:Opening Balances")
            .unwrap();
        assert_eq!(interpolated.amount.complete().unwrap().value.to_string(), "-20.00");
    }

    #[test]
    fn balance_check_against_an_undeclared_account_still_resolves() {
        let source = indoc! {"
            2013-12-07 Balance Assertions
                [apple-checking]                          0 = $120.00
        "};
        let (outcome, errors) = ingest(source, &IngestConfig::default());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        assert!(outcome.entities.iter().any(|e| matches!(e, NormalizedEntity::BalanceCheck { .. })));
        assert!(outcome.entities.iter().any(|e| matches!(e, NormalizedEntity::Account(a) if a.path == vec!["apple-checking".to_string()])));
    }

    #[test]
    fn reports_an_unbound_alias_without_aborting_the_rest_of_the_book() {
        let source = indoc! {"
            2013-12-07 Balance Assertions
                apple-checking                             0 = $120.00
        "};
        let (outcome, errors) = ingest(source, &IngestConfig::default());
        assert!(!errors.is_empty());
        assert!(matches!(errors[0], IngestError::Semantic(SemanticError::UnknownAccount { .. })));
        assert!(outcome.entities.iter().any(|e| matches!(e, NormalizedEntity::BalanceCheck { .. })));
    }

    #[test]
    fn reports_an_ambiguous_interpolation_against_its_own_transaction() {
        let source = indoc! {"
            account Assets:Cash:Wallet
                alias wallet
            account Assets:Brokerage

            2020-01-01 Mixed Commodities
                wallet                    $20.00
                Assets:Brokerage          5.00 EUR
                Equity:Opening Balances
        "};
        let (_, errors) = ingest(source, &IngestConfig::default());
        assert!(errors
            .iter()
            .any(|e| matches!(e, IngestError::Balance { source: SemanticError::AmbiguousInterpolation { .. }, .. })));
    }

    #[test]
    fn account_commodity_assertion_flags_a_mismatched_balance_check() {
        let source = indoc! {"
            account Assets:Cash:Wallet
                alias wallet
                assert commodity == \"$\"

            2013-12-07 Balance Assertions
                [wallet]                                  0 = 50.00 EUR
        "};
        let (_, errors) = ingest(source, &IngestConfig::default());
        assert!(errors
            .iter()
            .any(|e| matches!(e, IngestError::Semantic(SemanticError::BalanceCheckAccountCommodityMismatch { .. }))));
    }

    #[test]
    fn commodity_format_line_feeds_currency_symbol_into_the_normalized_stream() {
        let source = indoc! {"
            commodity USD
                note United States Dollars
                note type: currency
                format $1,000.00
        "};
        let (outcome, errors) = ingest(source, &IngestConfig::default());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        let commodity = outcome.entities.iter().find_map(|e| match e {
            NormalizedEntity::Commodity(c) => Some(c),
            _ => None,
        });
        assert_eq!(commodity.unwrap().currency_symbol, Some('$'));
        assert_eq!(commodity.unwrap().precision, Some(2));
    }
}
