use std::collections::{HashMap, HashSet};

use pest::iterators::{Pair, Pairs};

use crate::error::{ParseError, ParseResult};
use crate::Rule;

/// The unique child with label `rule`; an error if more than one exists.
/// Mirrors the reference's `optional_rule` helper, generalized to reject
/// ambiguity rather than silently taking the first match.
pub fn collect_one<'i>(pairs: &Pairs<'i, Rule>, rule: Rule) -> ParseResult<Option<Pair<'i, Rule>>> {
    let mut matches = pairs.clone().filter(|p| p.as_rule() == rule);
    let first = matches.next();
    if matches.next().is_some() {
        return Err(ParseError::invalid_state(format!("expected at most one {:?} child", rule)));
    }
    Ok(first)
}

/// The ordered sequence of children with label `rule`.
pub fn collect_all<'i>(pairs: &Pairs<'i, Rule>, rule: Rule) -> Vec<Pair<'i, Rule>> {
    pairs.clone().filter(|p| p.as_rule() == rule).collect()
}

/// The deduplicated set of source strings of children with label `rule`.
pub fn collect_set(pairs: &Pairs<Rule>, rule: Rule) -> HashSet<String> {
    pairs.clone().filter(|p| p.as_rule() == rule).map(|p| p.as_str().to_string()).collect()
}

/// Children with label `rule` merged into a key/value map, splitting each
/// child's text on its first `:`. Errors on a child with no `:` separator.
pub fn collect_map(pairs: &Pairs<Rule>, rule: Rule) -> ParseResult<HashMap<String, String>> {
    let mut map = HashMap::new();
    for pair in pairs.clone().filter(|p| p.as_rule() == rule) {
        let (key, value) = split_key_value(pair.as_str())
            .ok_or_else(|| ParseError::invalid_state_with_span("key: value pair", pair.as_span()))?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Splits a metadata line's text on its first `:`, trimming both sides and
/// stripping a leading `note` keyword if present. Returns `None` when the
/// line carries no `:` and so is a freeform comment, not a tagged entry.
pub fn split_key_value(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    let text = text.strip_prefix("note").map(str::trim_start).unwrap_or(text);
    let idx = text.find(':')?;
    let key = text[..idx].trim().to_lowercase();
    let value = text[idx + 1..].trim().to_string();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}
