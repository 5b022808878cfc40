use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _};
use serde::{Deserialize, Serialize};

/// A calendar date with no time-of-day or zone component, e.g. the date on
/// a `commodity`, `account`, or `transaction` line.
pub type LedgerDate = NaiveDate;

/// A time zone as written in the source: `Z`, a signed `HH:MM` offset, or a
/// named zone (e.g. `America/New_York`).
///
/// Named zones are kept as the string the grammar matched rather than
/// eagerly resolved through `chrono-tz`, since a named zone's offset is
/// itself a function of the date (daylight saving transitions) -- it is
/// resolved at the point a concrete `Instant` is needed, against the date
/// it is paired with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimeZoneSpec {
    Utc,
    Offset(i32),
    Named(String),
}

impl TimeZoneSpec {
    /// Resolves this zone spec against a specific local date-time into a
    /// concrete fixed offset.
    pub fn resolve(&self, local: NaiveDateTime) -> Result<FixedOffset, String> {
        match self {
            TimeZoneSpec::Utc => Ok(FixedOffset::east_opt(0).unwrap()),
            TimeZoneSpec::Offset(seconds) => FixedOffset::east_opt(*seconds)
                .ok_or_else(|| format!("invalid zone offset of {} seconds", seconds)),
            TimeZoneSpec::Named(name) => {
                let tz: chrono_tz::Tz = name
                    .parse()
                    .map_err(|_| format!("unknown named time zone '{}'", name))?;
                let resolved = tz
                    .from_local_datetime(&local)
                    .single()
                    .ok_or_else(|| format!("ambiguous or nonexistent local time in '{}'", name))?;
                Ok(*resolved.offset())
            }
        }
    }
}

impl fmt::Display for TimeZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSpec::Utc => write!(f, "Z"),
            TimeZoneSpec::Offset(seconds) => {
                let sign = if *seconds < 0 { '-' } else { '+' };
                let abs = seconds.abs();
                write!(f, "{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
            }
            TimeZoneSpec::Named(name) => write!(f, "{}", name),
        }
    }
}

/// An instant in time: a calendar date, a time of day, and an optional zone.
///
/// When an entry carries no explicit `time:` metadata, the interpreter
/// constructs an `Instant` at local midnight with `zone: None`; the zone is
/// filled in from the pipeline's configured default zone (see
/// `IngestConfig` in the facade crate) only when a concrete offset is
/// actually needed, e.g. to order two instants against each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instant {
    pub date: LedgerDate,
    pub time: NaiveTime,
    pub zone: Option<TimeZoneSpec>,
}

impl Instant {
    pub fn midnight(date: LedgerDate) -> Self {
        Instant {
            date,
            time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            zone: None,
        }
    }

    pub fn with_time(date: LedgerDate, time: NaiveTime, zone: Option<TimeZoneSpec>) -> Self {
        Instant { date, time, zone }
    }

    fn naive(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time)
    }

    /// Resolves this instant to a concrete, comparable point in time, using
    /// `default_zone` when this instant carries none of its own.
    pub fn to_fixed_offset(
        &self,
        default_zone: &TimeZoneSpec,
    ) -> Result<DateTime<FixedOffset>, String> {
        let naive = self.naive();
        let zone = self.zone.as_ref().unwrap_or(default_zone);
        let offset = zone.resolve(naive)?;
        Ok(offset.from_local_datetime(&naive).single().ok_or_else(|| {
            format!("ambiguous or nonexistent local time {}", naive)
        })?)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time)?;
        if let Some(zone) = &self.zone {
            write!(f, "{}", zone)?;
        }
        Ok(())
    }
}

/// A half-open date interval, as may be attached to a `note` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: LedgerDate,
    pub end: Option<LedgerDate>,
}

/// Parses a `YYYY-MM-DD` or `YYYY/MM/DD` date, matching the grammar's
/// `Date` production (both separators are accepted, per §4.1).
pub fn parse_date(s: &str) -> Result<LedgerDate, String> {
    let normalized = s.replace('/', "-");
    NaiveDate::from_str(&normalized).map_err(|e| format!("invalid date '{}': {}", s, e))
}

/// Parses an `HH:MM[:SS]` time, matching the grammar's `Time` production.
pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    let fmt = if s.matches(':').count() == 2 {
        "%H:%M:%S"
    } else {
        "%H:%M"
    };
    NaiveTime::parse_from_str(s, fmt).map_err(|e| format!("invalid time '{}': {}", s, e))
}

/// Parses a zone suffix: `Z`, a signed `HH:MM` offset, or a bare identifier
/// treated as a named zone.
pub fn parse_zone(s: &str) -> Result<TimeZoneSpec, String> {
    if s == "Z" {
        return Ok(TimeZoneSpec::Utc);
    }
    if let Some(rest) = s.strip_prefix('+').or_else(|| s.strip_prefix('-')) {
        let sign = if s.starts_with('-') { -1 } else { 1 };
        let mut parts = rest.split(':');
        let hours: i32 = parts
            .next()
            .ok_or_else(|| format!("invalid zone offset '{}'", s))?
            .parse()
            .map_err(|_| format!("invalid zone offset '{}'", s))?;
        let minutes: i32 = parts
            .next()
            .unwrap_or("0")
            .parse()
            .map_err(|_| format!("invalid zone offset '{}'", s))?;
        return Ok(TimeZoneSpec::Offset(sign * (hours * 3600 + minutes * 60)));
    }
    Ok(TimeZoneSpec::Named(s.to_string()))
}
