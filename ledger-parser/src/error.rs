use pest::Span;
use thiserror::Error;

use crate::Rule;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("parser reached an invalid state (please report this as a bug): expected {message}")]
    InvalidParserState { message: String },
    #[error("error parsing a number: {message}")]
    DecimalError { message: String },
    #[error("multiple distinct parses were produced for this input")]
    Ambiguity,
}

#[derive(Clone, Debug, PartialEq, Error)]
#[error("{kind} at line {}, column {}", location.0, location.1)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// `(line, column)` location of the error in the input.
    pub location: (usize, usize),
}

impl ParseError {
    pub(crate) fn invalid_state<T: ToString>(msg: T) -> ParseError {
        ParseError { kind: ParseErrorKind::InvalidParserState { message: msg.to_string() }, location: (0, 0) }
    }

    pub(crate) fn invalid_state_with_span<T: ToString>(msg: T, span: Span) -> ParseError {
        ParseError {
            kind: ParseErrorKind::InvalidParserState { message: msg.to_string() },
            location: span.start_pos().line_col(),
        }
    }

    pub(crate) fn invalid_input_with_span<T: ToString>(msg: T, span: Span) -> ParseError {
        ParseError {
            kind: ParseErrorKind::InvalidInput { message: msg.to_string() },
            location: span.start_pos().line_col(),
        }
    }

    pub(crate) fn decimal_error(err: rust_decimal::Error, span: Span) -> ParseError {
        ParseError {
            kind: ParseErrorKind::DecimalError { message: err.to_string() },
            location: span.start_pos().line_col(),
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let err = err.renamed_rules(|rule| {
            match *rule {
                Rule::EOI => "end of input",
                Rule::file => "ledger entry",
                Rule::entry => "top-level entry",
                Rule::date => "date",
                Rule::time => "time",
                Rule::timezone => "time zone",
                Rule::datetime => "date and time",
                Rule::number => "number",
                Rule::commodity_code => "commodity code",
                Rule::quantity => "quantity",
                Rule::account_path => "account path",
                Rule::account_alias => "account alias",
                Rule::posting_account_ref => "posting account reference",
                Rule::comment_header => "comment header",
                Rule::comment_block => "comment block",
                Rule::include_directive => "include directive",
                Rule::commodity_definition => "commodity definition",
                Rule::account_definition => "account definition",
                Rule::commodity_price => "commodity price",
                Rule::transaction => "transaction",
                Rule::entry_line => "transaction entry line",
                Rule::open_entry_line => "account-open entry",
                Rule::close_entry_line => "account-close entry",
                Rule::note_entry_line => "note entry",
                Rule::interval_annotation => "note interval",
                Rule::txn_meta_line => "transaction metadata line",
                Rule::posting => "posting",
                Rule::posting_line => "posting line",
                Rule::line_item => "line item",
                Rule::meta_entry_line => "metadata entry",
                Rule::lot_cost => "lot cost",
                Rule::lot_date => "lot date",
                Rule::price_annotation => "price annotation",
                Rule::balance_assertion => "balance assertion",
                Rule::txn_flag => "transaction flag",
                Rule::title => "title",
                _ => "ledger syntax",
            }
            .to_string()
        });
        let location = match &err.line_col {
            pest::error::LineColLocation::Pos(p) => *p,
            pest::error::LineColLocation::Span(p, _) => *p,
        };
        ParseError { kind: ParseErrorKind::InvalidInput { message: err.to_string() }, location }
    }
}
