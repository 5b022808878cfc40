use std::collections::HashSet;
use std::convert::TryFrom;
use std::str::FromStr;

use ledger_core::{
    Account, AccountRef, AccountType, AssetType, Commodity, CommodityCode, Cost, Decimal,
    EntryCommon, Instant, Interval, Invoice, Item, JournalEntry, LedgerDate, Posting, PricePoint,
    Quantity, SchemaCatalog, TimeZoneSpec, Transaction, TransactionFlag,
};
use ledger_core::invoice::{AmountOrCount, PriceOrPercentage};
use pest::iterators::Pair;

use crate::error::{ParseError, ParseResult};
use crate::tree::{collect_all, collect_one, split_key_value};
use crate::Rule;

fn parse_number(pair: &Pair<Rule>) -> ParseResult<Decimal> {
    let text: String = pair.as_str().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&text).map_err(|e| ParseError::decimal_error(e, pair.as_span()))
}

fn parse_commodity_code(pair: Pair<Rule>) -> CommodityCode {
    let text = pair.as_str();
    let stripped = text.trim_matches('"');
    CommodityCode::new(stripped)
}

fn parse_quantity(pair: Pair<Rule>) -> ParseResult<Quantity> {
    let span = pair.as_span();
    let inner = pair.into_inner().next().ok_or_else(|| ParseError::invalid_state_with_span("quantity", span.clone()))?;
    match inner.as_rule() {
        Rule::zero_quantity => Ok(Quantity::new(Decimal::ZERO, CommodityCode::USD)),
        Rule::commodity_first => {
            let mut parts = inner.into_inner();
            let code = parts.next().ok_or_else(|| ParseError::invalid_state("commodity code"))?;
            let num = parts.next().ok_or_else(|| ParseError::invalid_state("quantity value"))?;
            let value = parse_number(&num)?;
            Ok(Quantity::new(value, parse_commodity_code(code)))
        }
        Rule::number_first => {
            let mut parts = inner.into_inner();
            let num = parts.next().ok_or_else(|| ParseError::invalid_state("quantity value"))?;
            let code = parts.next().ok_or_else(|| ParseError::invalid_state("commodity code"))?;
            let value = parse_number(&num)?;
            Ok(Quantity::new(value, parse_commodity_code(code)))
        }
        other => Err(ParseError::invalid_state_with_span(format!("unexpected quantity shape {:?}", other), span)),
    }
}

fn parse_account_path(pair: &Pair<Rule>) -> Vec<String> {
    pair.as_str().split(':').map(|s| s.trim().to_string()).collect()
}

fn parse_datetime(pair: Pair<Rule>) -> ParseResult<Instant> {
    let span = pair.as_span();
    let mut parts = pair.into_inner();
    let date_pair = parts.next().ok_or_else(|| ParseError::invalid_state_with_span("date", span.clone()))?;
    let time_pair = parts.next().ok_or_else(|| ParseError::invalid_state_with_span("time", span.clone()))?;
    let date = ledger_core::time::parse_date(date_pair.as_str())
        .map_err(|e| ParseError::invalid_input_with_span(e, date_pair.as_span()))?;
    let time = ledger_core::time::parse_time(time_pair.as_str())
        .map_err(|e| ParseError::invalid_input_with_span(e, time_pair.as_span()))?;
    let zone = match parts.next() {
        Some(tz_pair) => Some(
            ledger_core::time::parse_zone(tz_pair.as_str())
                .map_err(|e| ParseError::invalid_input_with_span(e, tz_pair.as_span()))?,
        ),
        None => None,
    };
    Ok(Instant::with_time(date, time, zone))
}

/// One interpreted top-level entry group.
pub enum ParsedGroup {
    Commodity(Commodity),
    Account(Account),
    Price(PricePoint),
    Transaction(Transaction),
    /// Comment headers, comment blocks, and include directives produce no
    /// entity of their own; file inclusion is an embedder's concern (§1
    /// Non-goals), so `include` is accepted by the grammar but otherwise
    /// ignored here.
    Ignored,
}

pub fn interpret_entry(
    pair: Pair<Rule>,
    schema: &SchemaCatalog,
    default_zone: &TimeZoneSpec,
) -> ParseResult<ParsedGroup> {
    match pair.as_rule() {
        Rule::comment_header | Rule::comment_block | Rule::include_directive => Ok(ParsedGroup::Ignored),
        Rule::commodity_definition => Ok(ParsedGroup::Commodity(interpret_commodity(pair)?)),
        Rule::account_definition => Ok(ParsedGroup::Account(interpret_account(pair)?)),
        Rule::commodity_price => Ok(ParsedGroup::Price(interpret_price(pair)?)),
        Rule::transaction => Ok(ParsedGroup::Transaction(interpret_transaction(pair, schema, default_zone)?)),
        other => Err(ParseError::invalid_state_with_span(format!("unexpected top-level rule {:?}", other), pair.as_span())),
    }
}

fn interpret_commodity(pair: Pair<Rule>) -> ParseResult<Commodity> {
    let source = pair.as_str().to_string();
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let code_pair = inner.next().ok_or_else(|| ParseError::invalid_state_with_span("commodity code", span))?;
    let code = parse_commodity_code(code_pair);

    let mut title = code.to_string();
    let mut currency_symbol = None;
    let mut precision = None;
    let mut asset_type = None;
    let mut asset_class = None;
    let mut asset_sector = None;
    let mut description_lines: Vec<String> = Vec::new();

    for line in inner {
        let text = line.as_str();
        let trimmed = text.trim();

        // `format $1,000.00` is an example quantity in the commodity's own
        // notation, not a `key: value` attribute -- the currency symbol and
        // the decimal precision are both read off of it directly, per §3's
        // `currency-symbol`/`precision` fields.
        if let Some(example) = trimmed.strip_prefix("format ") {
            let example = example.trim();
            currency_symbol = example.chars().find(|c| c.is_alphabetic() || *c == '$');
            precision = example.rfind('.').map(|dot| (example.len() - dot - 1) as u32);
            continue;
        }

        match split_key_value(text) {
            Some((key, value)) => match key.as_str() {
                "title" => title = value,
                "currency-symbol" => currency_symbol = value.chars().next(),
                "precision" => precision = value.parse::<u32>().ok(),
                "type" => asset_type = AssetType::try_from(value.as_str()).ok(),
                "asset-class" => asset_class = parse_asset_class(&value),
                "asset-sector" => asset_sector = parse_asset_sector(&value),
                "description" => description_lines.push(value),
                _ => log::debug!("ignoring unrecognized commodity attribute '{}'", key),
            },
            None => {
                let freeform = text.trim().strip_prefix("note").map(str::trim_start).unwrap_or(text.trim());
                if !freeform.is_empty() {
                    description_lines.push(freeform.to_string());
                }
            }
        }
    }

    let description = if description_lines.is_empty() { None } else { Some(description_lines.join("\n")) };

    Ok(Commodity::builder()
        .code(code)
        .title(title)
        .description(description)
        .currency_symbol(currency_symbol)
        .precision(precision)
        .asset_type(asset_type)
        .asset_class(asset_class)
        .asset_sector(asset_sector)
        .source(Some(source))
        .build())
}

/// Parses an `asset-class:` value: either a single keyword (`domestic-equity`)
/// or a comma-separated probability map (`domestic-equity 0.6,
/// international-equity 0.4`), per §3's "one keyword or probability map
/// summing to 1" shape. Malformed entries are skipped rather than failing
/// the whole commodity -- `validate_commodity` catches a map that doesn't
/// sum to 1, not this parse step.
fn parse_asset_class(value: &str) -> Option<ledger_core::AssetClass> {
    use ledger_core::{AssetClass, AssetClassKind};
    if value.contains(',') || value.split_whitespace().count() > 1 {
        let mut map = std::collections::HashMap::new();
        for entry in value.split(',') {
            let entry = entry.trim();
            let mut parts = entry.rsplitn(2, char::is_whitespace);
            let weight = parts.next()?;
            let keyword = parts.next()?.trim();
            let kind = AssetClassKind::try_from(keyword).ok()?;
            let weight = Decimal::from_str(weight).ok()?;
            map.insert(kind, weight);
        }
        Some(AssetClass::Weighted(map))
    } else {
        AssetClassKind::try_from(value.trim()).ok().map(AssetClass::Single)
    }
}

/// Parses an `asset-sector:` value, shaped identically to [`parse_asset_class`].
fn parse_asset_sector(value: &str) -> Option<ledger_core::AssetSector> {
    use ledger_core::{AssetSector, AssetSectorKind};
    if value.contains(',') || value.split_whitespace().count() > 1 {
        let mut map = std::collections::HashMap::new();
        for entry in value.split(',') {
            let entry = entry.trim();
            let mut parts = entry.rsplitn(2, char::is_whitespace);
            let weight = parts.next()?;
            let keyword = parts.next()?.trim();
            let kind = AssetSectorKind::try_from(keyword).ok()?;
            let weight = Decimal::from_str(weight).ok()?;
            map.insert(kind, weight);
        }
        Some(AssetSector::Weighted(map))
    } else {
        AssetSectorKind::try_from(value.trim()).ok().map(AssetSector::Single)
    }
}

fn interpret_account(pair: Pair<Rule>) -> ParseResult<Account> {
    let source = pair.as_str().to_string();
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let path_pair = inner.next().ok_or_else(|| ParseError::invalid_state_with_span("account path", span))?;
    let path = parse_account_path(&path_pair);

    let mut alias = None;
    let mut account_type = None;
    let mut external_id = None;
    let mut description_lines: Vec<String> = Vec::new();
    let mut links = HashSet::new();
    let mut allowed_commodities = HashSet::new();

    for line in inner {
        let text = line.as_str();
        let trimmed = text.trim();

        // `assert commodity == "$"` is a freeform assertion, not a
        // `key: value` attribute -- it constrains §3's `allowed-commodities`
        // set rather than naming a field directly.
        if let Some(rest) = trimmed.strip_prefix("assert commodity") {
            if let Some(eq_idx) = rest.find("==") {
                let code = rest[eq_idx + 2..].trim().trim_matches('"');
                if !code.is_empty() {
                    allowed_commodities.insert(ledger_core::CommodityCode::new(code));
                }
            }
            continue;
        }

        match split_key_value(text) {
            Some((key, value)) => match key.as_str() {
                "alias" => alias = Some(value.to_lowercase()),
                "type" => account_type = AccountType::try_from(value.as_str()).ok(),
                "external-id" => external_id = Some(value),
                "link" => {
                    links.insert(value);
                }
                "description" => description_lines.push(value),
                _ => log::debug!("ignoring unrecognized account attribute '{}'", key),
            },
            None => {
                let freeform = text.trim().strip_prefix("note").map(str::trim_start).unwrap_or(text.trim());
                if !freeform.is_empty() {
                    description_lines.push(freeform.to_string());
                }
            }
        }
    }

    let description = if description_lines.is_empty() { None } else { Some(description_lines.join("\n")) };

    Ok(Account::builder()
        .path(path)
        .description(description)
        .alias(alias)
        .account_type(account_type)
        .external_id(external_id)
        .links(links)
        .allowed_commodities(allowed_commodities)
        .source(Some(source))
        .build())
}

fn interpret_price(pair: Pair<Rule>) -> ParseResult<PricePoint> {
    let source = pair.as_str().to_string();
    let span = pair.as_span();
    let inner = pair.into_inner();
    let datetime_pair = collect_one(&inner, Rule::datetime)?
        .ok_or_else(|| ParseError::invalid_state_with_span("datetime", span.clone()))?;
    let commodity_pair = collect_one(&inner, Rule::commodity_code)?
        .ok_or_else(|| ParseError::invalid_state_with_span("commodity code", span.clone()))?;
    let quantity_pair = collect_one(&inner, Rule::quantity)?
        .ok_or_else(|| ParseError::invalid_state_with_span("quantity", span))?;

    let observed_at = parse_datetime(datetime_pair)?;
    let commodity = parse_commodity_code(commodity_pair);
    let value = parse_quantity(quantity_pair)?;

    Ok(PricePoint::builder()
        .commodity(commodity)
        .observed_at(observed_at)
        .value(value)
        .source_lines(Some(source))
        .build())
}

fn parse_posting_account_ref(pair: Pair<Rule>) -> ParseResult<(AccountRef, bool, bool)> {
    let span = pair.as_span();
    let inner = pair.into_inner().next().ok_or_else(|| ParseError::invalid_state_with_span("account reference", span))?;
    match inner.as_rule() {
        Rule::real_account_ref => Ok((AccountRef::Path(parse_account_path(&inner)), false, false)),
        Rule::virtual_account_ref => {
            let target = inner.into_inner().next().ok_or_else(|| ParseError::invalid_state("virtual account target"))?;
            Ok((account_ref_of(target), true, false))
        }
        Rule::balanced_virtual_ref => {
            let target = inner.into_inner().next().ok_or_else(|| ParseError::invalid_state("balanced-virtual account target"))?;
            Ok((account_ref_of(target), false, true))
        }
        Rule::aliased_account_ref => Ok((AccountRef::Alias(inner.as_str().to_string()), false, false)),
        other => Err(ParseError::invalid_state(format!("unexpected account ref shape {:?}", other))),
    }
}

fn account_ref_of(pair: Pair<Rule>) -> AccountRef {
    match pair.as_rule() {
        Rule::account_path => AccountRef::Path(parse_account_path(&pair)),
        _ => AccountRef::Alias(pair.as_str().to_string()),
    }
}

fn interpret_transaction(
    pair: Pair<Rule>,
    schema: &SchemaCatalog,
    default_zone: &TimeZoneSpec,
) -> ParseResult<Transaction> {
    let source = pair.as_str().to_string();
    let span = pair.as_span();
    let mut inner = pair.into_inner();

    let date_pair = inner.next().ok_or_else(|| ParseError::invalid_state_with_span("date", span.clone()))?;
    let date = ledger_core::time::parse_date(date_pair.as_str())
        .map_err(|e| ParseError::invalid_input_with_span(e, date_pair.as_span()))?;

    let mut flag = None;
    if let Some(p) = inner.peek() {
        if p.as_rule() == Rule::txn_flag {
            flag = Some(if p.as_str() == "*" { TransactionFlag::Cleared } else { TransactionFlag::Pending });
            inner.next();
        }
    }

    let title_pair = inner.next().ok_or_else(|| ParseError::invalid_state_with_span("title", span.clone()))?;
    let title = title_pair.as_str().trim().to_string();

    let mut tags = HashSet::new();
    let mut links = HashSet::new();
    let mut entries = Vec::new();
    let mut txn_time_from_meta: Option<Instant> = None;

    // `txn_meta_line`s don't become entries of their own, so rank is
    // tracked separately from position in `entry_line+` to keep each
    // entry's ordinal tiebreak (§4.2) contiguous.
    let mut rank: u32 = 0;
    for entry_line_pair in collect_all(&inner, Rule::entry_line) {
        let child = entry_line_pair
            .into_inner()
            .next()
            .ok_or_else(|| ParseError::invalid_state("entry line body"))?;
        match child.as_rule() {
            Rule::posting => {
                entries.push(interpret_posting(child, schema, rank, date, &mut tags, &mut links)?);
                rank += 1;
            }
            Rule::open_entry_line => {
                entries.push(interpret_open_entry(child, rank, date)?);
                rank += 1;
            }
            Rule::close_entry_line => {
                entries.push(interpret_close_entry(child, rank, date)?);
                rank += 1;
            }
            Rule::note_entry_line => {
                entries.push(interpret_note_entry(child, rank, date)?);
                rank += 1;
            }
            Rule::txn_meta_line => {
                if let Some(instant) = interpret_txn_meta_line(child, date, &mut tags, &mut links)? {
                    txn_time_from_meta.get_or_insert(instant);
                }
            }
            other => return Err(ParseError::invalid_state(format!("unexpected entry line shape {:?}", other))),
        };
    }

    // Distribute the one resolved instant in this transaction (from a
    // transaction-level `; time:` line or a `; time:` tag on some entry) down
    // to every entry that didn't carry its own, filling in the configured
    // default zone where none was written explicitly (§4.2).
    let txn_time = txn_time_from_meta.or_else(|| entries.iter().find_map(|e| e.common().time.clone()));
    if let Some(instant) = &txn_time {
        for entry in entries.iter_mut() {
            let common = entry.common_mut();
            if common.time.is_none() {
                let mut distributed = instant.clone();
                if distributed.zone.is_none() {
                    distributed.zone = Some(default_zone.clone());
                }
                common.time = Some(distributed);
            }
        }
    }

    Ok(Transaction::builder()
        .title(title)
        .date(date)
        .time(txn_time)
        .flag(flag)
        .tags(tags)
        .links(links)
        .entries(entries)
        .source(Some(source))
        .build())
}

/// Common fields shared by `open`/`close`/`note` entry lines: everything but
/// the account reference and nl are already consumed by the caller's
/// `Pairs` positioning, so this just builds the `EntryCommon` each of the
/// three wraps.
fn entry_common_for(account_ref: AccountRef, rank: u32, date: LedgerDate, source: String) -> EntryCommon {
    EntryCommon::builder()
        .account_ref(account_ref)
        .date(date)
        .rank(Some(rank))
        .source_lines(Some(source))
        .build()
}

/// A `; time:`/`; link:`/bare-tag line attached directly to a transaction
/// (§6's `2016-04-16 ! Uber` example), as opposed to one of its postings.
/// Returns the resolved instant when this line carried a `time:` tag, so the
/// caller can fold it into the transaction's distributed time; tags and
/// links are inserted directly into the shared sets postings also write to.
fn interpret_txn_meta_line(
    pair: Pair<Rule>,
    date: LedgerDate,
    txn_tags: &mut HashSet<String>,
    txn_links: &mut HashSet<String>,
) -> ParseResult<Option<Instant>> {
    let child = pair.into_inner().next().ok_or_else(|| ParseError::invalid_state("transaction metadata line"))?;
    match child.as_rule() {
        Rule::meta_tag => {
            txn_tags.insert(child.as_str().trim_matches(':').to_string());
            Ok(None)
        }
        Rule::meta_kv | Rule::meta_comment => {
            let Some((key, value)) = split_key_value(child.as_str()) else { return Ok(None) };
            match key.as_str() {
                "time" => {
                    let time = ledger_core::time::parse_time(&value)
                        .map_err(|e| ParseError::invalid_input_with_span(e, child.as_span()))?;
                    Ok(Some(Instant::with_time(date, time, None)))
                }
                "link" => {
                    txn_links.insert(value);
                    Ok(None)
                }
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

fn interpret_open_entry(pair: Pair<Rule>, rank: u32, date: LedgerDate) -> ParseResult<JournalEntry> {
    let source = pair.as_str().to_string();
    let ref_pair = pair.into_inner().next().ok_or_else(|| ParseError::invalid_state("open entry account reference"))?;
    let (account_ref, _, _) = parse_posting_account_ref(ref_pair)?;
    Ok(JournalEntry::OpenAccount(entry_common_for(account_ref, rank, date, source)))
}

fn interpret_close_entry(pair: Pair<Rule>, rank: u32, date: LedgerDate) -> ParseResult<JournalEntry> {
    let source = pair.as_str().to_string();
    let ref_pair = pair.into_inner().next().ok_or_else(|| ParseError::invalid_state("close entry account reference"))?;
    let (account_ref, _, _) = parse_posting_account_ref(ref_pair)?;
    Ok(JournalEntry::CloseAccount(entry_common_for(account_ref, rank, date, source)))
}

fn interpret_note_entry(pair: Pair<Rule>, rank: u32, date: LedgerDate) -> ParseResult<JournalEntry> {
    let source = pair.as_str().to_string();
    let mut inner = pair.into_inner();
    let ref_pair = inner.next().ok_or_else(|| ParseError::invalid_state("note entry account reference"))?;
    let (account_ref, _, _) = parse_posting_account_ref(ref_pair)?;
    let description_pair = inner.next().ok_or_else(|| ParseError::invalid_state("note entry description"))?;
    let description = description_pair.as_str().trim_matches('"').to_string();

    let interval = match inner.next() {
        Some(interval_pair) => {
            let mut dates = interval_pair.into_inner();
            let start_pair = dates.next().ok_or_else(|| ParseError::invalid_state("note interval start date"))?;
            let start = ledger_core::time::parse_date(start_pair.as_str())
                .map_err(|e| ParseError::invalid_input_with_span(e, start_pair.as_span()))?;
            let end = match dates.next() {
                Some(end_pair) => Some(
                    ledger_core::time::parse_date(end_pair.as_str())
                        .map_err(|e| ParseError::invalid_input_with_span(e, end_pair.as_span()))?,
                ),
                None => None,
            };
            Some(Interval { start, end })
        }
        None => None,
    };

    let mut common = entry_common_for(account_ref, rank, date, source);
    common.description = Some(description);
    Ok(JournalEntry::Note { common, interval })
}

fn interpret_posting(
    pair: Pair<Rule>,
    schema: &SchemaCatalog,
    rank: u32,
    date: ledger_core::LedgerDate,
    txn_tags: &mut HashSet<String>,
    txn_links: &mut HashSet<String>,
) -> ParseResult<JournalEntry> {
    let source = pair.as_str().to_string();
    let mut inner = pair.into_inner();
    let line_pair = inner.next().ok_or_else(|| ParseError::invalid_state("posting line"))?;

    let mut line_inner = line_pair.into_inner();
    let ref_pair = line_inner.next().ok_or_else(|| ParseError::invalid_state("posting account reference"))?;
    let (account_ref, is_virtual, is_balanced_virtual) = parse_posting_account_ref(ref_pair)?;

    let mut amount = None;
    let mut lot_cost = None;
    let mut lot_date = None;
    let mut price = None;
    let mut balance_assertion = None;

    for p in line_inner {
        match p.as_rule() {
            Rule::quantity => amount = Some(parse_quantity(p)?),
            Rule::lot_cost => {
                let q = p.into_inner().next().ok_or_else(|| ParseError::invalid_state("lot cost quantity"))?;
                lot_cost = Some(parse_quantity(q)?);
            }
            Rule::lot_date => {
                let d = p.into_inner().next().ok_or_else(|| ParseError::invalid_state("lot date"))?;
                lot_date = Some(
                    ledger_core::time::parse_date(d.as_str())
                        .map_err(|e| ParseError::invalid_input_with_span(e, d.as_span()))?,
                );
            }
            Rule::price_annotation => {
                let q = p.into_inner().next().ok_or_else(|| ParseError::invalid_state("price quantity"))?;
                price = Some(parse_quantity(q)?);
            }
            Rule::balance_assertion => {
                let q = p.into_inner().next().ok_or_else(|| ParseError::invalid_state("balance assertion quantity"))?;
                balance_assertion = Some(parse_quantity(q)?);
            }
            _ => {}
        }
    }

    let cost = lot_cost.map(|amount| Cost::builder().amount(amount).date(lot_date).build());

    let mut payee = None;
    let mut external_id = None;
    let mut time_override: Option<Instant> = None;
    let mut items = Vec::new();

    for detail in inner {
        let child = detail.into_inner().next().ok_or_else(|| ParseError::invalid_state("posting detail"))?;
        match child.as_rule() {
            Rule::line_item => items.push(interpret_line_item(child, items.len() as u32)?),
            Rule::meta_tag => {
                let tag_text = child.as_str().trim_matches(':').to_string();
                txn_tags.insert(tag_text);
            }
            Rule::meta_kv | Rule::meta_comment => {
                if let Some((key, value)) = split_key_value(child.as_str()) {
                    match key.as_str() {
                        "time" => {
                            let time = ledger_core::time::parse_time(&value)
                                .map_err(|e| ParseError::invalid_input_with_span(e, child.as_span()))?;
                            time_override = Some(Instant::with_time(date, time, None));
                        }
                        "uuid" | "external-id" => external_id = Some(value),
                        "payee" => payee = Some(value),
                        "link" => {
                            txn_links.insert(value);
                        }
                        _ => {
                            if schema.lookup_tag(&key).is_none() {
                                log::debug!("ignoring unrecognized posting metadata tag '{}'", key);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let common = EntryCommon::builder()
        .account_ref(account_ref)
        .date(date)
        .time(time_override)
        .rank(Some(rank))
        .external_id(external_id)
        .source_lines(Some(source))
        .build();

    // A balanced-virtual posting with no real amount (absent, or the
    // literal `0` placeholder) and a balance assertion is a `balance-check`
    // in disguise (§4.2).
    let amount_is_absent = amount.as_ref().map_or(true, Quantity::is_zero);
    if is_balanced_virtual && amount_is_absent {
        if let Some(assertion) = balance_assertion {
            return Ok(JournalEntry::BalanceCheck { common, amount: assertion });
        }
    }

    let invoice = if items.is_empty() { None } else { Some(Invoice::builder().items(items).build()) };

    let posting = Posting::builder()
        .common(common)
        .amount(amount.map(Into::into).unwrap_or_default())
        .price(price)
        .cost(cost)
        .is_virtual(is_virtual)
        .is_balanced_virtual(is_balanced_virtual)
        .payee(payee)
        .balance_assertion(balance_assertion)
        .invoice(invoice)
        .build();

    Ok(JournalEntry::Posting(posting))
}

/// Splits a quantity written freestanding in text (not via the grammar) into
/// its value and commodity, mirroring the `zero_quantity`/`commodity_first`/
/// `number_first` productions of the `quantity` rule.
fn parse_quantity_str(s: &str) -> ParseResult<Quantity> {
    let s = s.trim();
    if s == "0" {
        return Ok(Quantity::new(Decimal::ZERO, CommodityCode::USD));
    }
    if let Some(rest) = s.strip_prefix('$') {
        return Ok(Quantity::new(parse_decimal_str(rest.trim())?, CommodityCode::USD));
    }
    let first = s.chars().next().ok_or_else(|| ParseError::invalid_state("empty quantity"))?;
    if first.is_ascii_alphabetic() || first == '"' {
        let idx = s
            .find(|c: char| c.is_ascii_digit() || c == '+' || c == '-')
            .ok_or_else(|| ParseError::invalid_state(format!("no numeric part in quantity '{}'", s)))?;
        let code = s[..idx].trim().trim_matches('"');
        let value = parse_decimal_str(s[idx..].trim())?;
        Ok(Quantity::new(value, CommodityCode::new(code)))
    } else {
        let idx = s
            .find(|c: char| c.is_ascii_alphabetic() || c == '"' || c == '$')
            .ok_or_else(|| ParseError::invalid_state(format!("no commodity part in quantity '{}'", s)))?;
        let value = parse_decimal_str(s[..idx].trim())?;
        let code = s[idx..].trim().trim_matches('"');
        Ok(Quantity::new(value, CommodityCode::new(code)))
    }
}

fn parse_decimal_str(s: &str) -> ParseResult<Decimal> {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned).map_err(|e| ParseError::invalid_state(format!("invalid number '{}': {}", s, e)))
}

/// Splits `"Title words... <amount>"` at the trailing quantity, the way the
/// grammar's `quantity` rule would if it weren't competing with a greedy
/// free-text title on the same line.
fn split_title_amount(s: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let last = *tokens.last()?;
    if last == "0" {
        return Some((tokens[..tokens.len() - 1].join(" "), "0".to_string()));
    }
    if last.starts_with('$') && last.len() > 1 {
        return Some((tokens[..tokens.len() - 1].join(" "), last.to_string()));
    }
    if tokens.len() >= 2 {
        let second_last = tokens[tokens.len() - 2];
        let last_is_numeric = last.chars().next().map_or(false, |c| c.is_ascii_digit());
        let second_is_numeric =
            second_last.trim_start_matches(['+', '-']).chars().next().map_or(false, |c| c.is_ascii_digit());
        if last_is_numeric != second_is_numeric {
            return Some((
                tokens[..tokens.len() - 2].join(" "),
                format!("{} {}", second_last, last),
            ));
        }
    }
    None
}

fn interpret_line_item(pair: Pair<Rule>, item_rank: u32) -> ParseResult<Item> {
    let rest_pair = pair.into_inner().next().ok_or_else(|| ParseError::invalid_state("item body"))?;
    let span = rest_pair.as_span();
    let mut text = rest_pair.as_str().trim().to_string();

    let taxed = if text.ends_with("taxed") {
        let candidate = &text[..text.len() - "taxed".len()];
        if candidate.is_empty() || candidate.ends_with(char::is_whitespace) {
            text = candidate.trim_end().to_string();
            true
        } else {
            false
        }
    } else {
        false
    };

    let mut tax_groups = HashSet::new();
    if text.ends_with(']') {
        let open = text.rfind('[').ok_or_else(|| ParseError::invalid_state_with_span("matching '[' for item tax groups", span.clone()))?;
        for group in text[open + 1..text.len() - 1].split(',') {
            let group = group.trim();
            if !group.is_empty() {
                tax_groups.insert(group.to_string());
            }
        }
        text = text[..open].trim_end().to_string();
    }

    let at_idx = text.rfind('@').ok_or_else(|| ParseError::invalid_state_with_span("item missing '@' price marker", span.clone()))?;
    let title_amount = text[..at_idx].trim();
    let price_str = text[at_idx + 1..].trim();

    let (title, amount_str) = split_title_amount(title_amount)
        .ok_or_else(|| ParseError::invalid_state_with_span(format!("no amount in item '{}'", title_amount), span.clone()))?;
    let amount = parse_quantity_str(&amount_str)?;

    let price = if let Some(pct) = price_str.strip_suffix('%') {
        PriceOrPercentage::Percentage(parse_decimal_str(pct)? / Decimal::from(100))
    } else {
        PriceOrPercentage::Quantity(parse_quantity_str(price_str)?)
    };

    let total = match &price {
        PriceOrPercentage::Percentage(pct) => Quantity::new((amount.value * pct).round_dp(2), amount.commodity.clone()),
        PriceOrPercentage::Quantity(unit_price) => {
            Quantity::new((amount.value * unit_price.value).round_dp(2), unit_price.commodity.clone())
        }
    };

    let tax_applied = if taxed { tax_groups.iter().next().cloned() } else { None };

    Ok(Item::builder()
        .rank(Some(item_rank))
        .title(title)
        .total(total)
        .amount(AmountOrCount::Quantity(amount))
        .price(price)
        .tax_groups(tax_groups)
        .tax_applied(tax_applied)
        .build())
}
