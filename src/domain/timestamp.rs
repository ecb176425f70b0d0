//! Resolution of free-form feed timestamps into UTC instants.
//!
//! Feeds print publish times in many shapes: "Tue Jun 10, 5:00PM CDT",
//! "Sat Jun 10, 2023", "Fri, 07 Jun 2024 19:48", RFC 3339 and so on. Missing
//! pieces are filled in from fixed policy:
//!
//! - no offset: the feed's reporting offset
//! - no time of day: local noon, so date-only items stay inside their day
//! - no year: the caller's reference year

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{HarvestError, HarvestResult};

static MERIDIEM_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?\s*([ap])m\b").expect("valid regex")
});

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\b").expect("valid regex"));

static NUMERIC_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)([+-])(\d{2}):?(\d{2})\b").expect("valid regex"));

static UTC_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(utc|gmt|z)\b").expect("valid regex"));

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("valid regex"));

static SLASH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b").expect("valid regex")
});

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

const WEEKDAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

const FILLER_WORDS: &[&str] = &["at", "on", "of", "the"];

const ZONE_LABELS: &[&str] = &[
    "ET", "CT", "MT", "PT", "EST", "EDT", "CST", "CDT", "MST", "MDT", "PST", "PDT", "AKST",
    "AKDT", "HST", "BST", "IST", "CET", "CEST", "EET", "EEST", "WET", "WEST", "JST", "AEST",
    "AEDT",
];

/// The pieces a timestamp string actually carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParsedParts {
    year: Option<i32>,
    month: u32,
    day: u32,
    time: Option<NaiveTime>,
    offset: Option<FixedOffset>,
}

#[derive(Debug, Clone, Copy)]
pub struct TimestampNormalizer {
    fallback_offset: FixedOffset,
}

impl TimestampNormalizer {
    pub fn new(fallback_offset: FixedOffset) -> Self {
        Self { fallback_offset }
    }

    /// Resolve `raw` to a UTC instant, using `reference_year` when the string has no year
    pub fn normalize(&self, raw: &str, reference_year: i32) -> HarvestResult<DateTime<Utc>> {
        let parts = parse_parts(raw)?;

        let year = parts.year.unwrap_or(reference_year);
        let date = NaiveDate::from_ymd_opt(year, parts.month, parts.day).ok_or_else(|| {
            HarvestError::unparseable(
                raw,
                format!("no such date {}-{:02}-{:02}", year, parts.month, parts.day),
            )
        })?;

        let time = match parts.time {
            Some(time) => time,
            None => NaiveTime::from_hms_opt(12, 0, 0)
                .ok_or_else(|| HarvestError::unparseable(raw, "invalid noon"))?,
        };
        let offset = parts.offset.unwrap_or(self.fallback_offset);

        offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| HarvestError::unparseable(raw, "ambiguous local time"))
    }
}

fn parse_parts(raw: &str) -> HarvestResult<ParsedParts> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(HarvestError::unparseable(raw, "empty string"));
    }

    if let Some(parts) = parse_structured(text) {
        return Ok(parts);
    }

    parse_free_form(text)
}

/// Machine formats that chrono understands directly
fn parse_structured(text: &str) -> Option<ParsedParts> {
    let explicit = DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .ok();
    if let Some(dt) = explicit {
        let naive = dt.naive_local();
        return Some(ParsedParts {
            year: Some(naive.year()),
            month: naive.month(),
            day: naive.day(),
            time: Some(naive.time()),
            offset: Some(*dt.offset()),
        });
    }

    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .map(|naive| ParsedParts {
            year: Some(naive.year()),
            month: naive.month(),
            day: naive.day(),
            time: Some(naive.time()),
            offset: None,
        })
}

fn parse_free_form(raw: &str) -> HarvestResult<ParsedParts> {
    let mut rest = raw.to_string();

    // Offsets first: "+02:00" would otherwise read as a clock time
    let offset = take_offset(raw, &mut rest)?;
    let time = take_time(raw, &mut rest)?;

    let (year, month, day) = match take_numeric_date(raw, &mut rest)? {
        Some((year, month, day)) => {
            reject_leftovers(raw, &rest)?;
            (Some(year), month, day)
        }
        None => parse_date_tokens(raw, &rest)?,
    };

    Ok(ParsedParts {
        year,
        month,
        day,
        time,
        offset,
    })
}

fn take_time(raw: &str, rest: &mut String) -> HarvestResult<Option<NaiveTime>> {
    if let Some(caps) = MERIDIEM_TIME.captures(rest.as_str()) {
        let hour: u32 = number(raw, caps.get(1).map(|m| m.as_str()))?;
        let minute: u32 = optional_number(raw, caps.get(2).map(|m| m.as_str()))?;
        let second: u32 = optional_number(raw, caps.get(3).map(|m| m.as_str()))?;
        let is_pm = caps
            .get(4)
            .map(|m| m.as_str().eq_ignore_ascii_case("p"))
            .unwrap_or(false);

        if hour == 0 || hour > 12 {
            return Err(HarvestError::unparseable(raw, "12-hour clock out of range"));
        }
        let hour = match (hour, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };

        let range = caps.get(0).map(|m| m.range());
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| HarvestError::unparseable(raw, "invalid clock time"))?;
        if let Some(range) = range {
            rest.replace_range(range, " ");
        }
        return Ok(Some(time));
    }

    if let Some(caps) = CLOCK_TIME.captures(rest.as_str()) {
        let hour: u32 = number(raw, caps.get(1).map(|m| m.as_str()))?;
        let minute: u32 = number(raw, caps.get(2).map(|m| m.as_str()))?;
        let second: u32 = optional_number(raw, caps.get(3).map(|m| m.as_str()))?;

        let range = caps.get(0).map(|m| m.range());
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| HarvestError::unparseable(raw, "invalid clock time"))?;
        if let Some(range) = range {
            rest.replace_range(range, " ");
        }
        return Ok(Some(time));
    }

    Ok(None)
}

fn take_offset(raw: &str, rest: &mut String) -> HarvestResult<Option<FixedOffset>> {
    if let Some(caps) = NUMERIC_OFFSET.captures(rest.as_str()) {
        let sign = if caps.get(1).map(|m| m.as_str()) == Some("-") { -1 } else { 1 };
        let hours: i32 = number(raw, caps.get(2).map(|m| m.as_str()))?;
        let minutes: i32 = number(raw, caps.get(3).map(|m| m.as_str()))?;

        let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .ok_or_else(|| HarvestError::unparseable(raw, "offset out of range"))?;
        if let Some(range) = caps.get(0).map(|m| m.range()) {
            rest.replace_range(range, " ");
        }
        return Ok(Some(offset));
    }

    if let Some(range) = UTC_MARKER.find(rest.as_str()).map(|m| m.range()) {
        rest.replace_range(range, " ");
        return Ok(FixedOffset::east_opt(0));
    }

    Ok(None)
}

fn take_numeric_date(raw: &str, rest: &mut String) -> HarvestResult<Option<(i32, u32, u32)>> {
    if let Some(caps) = ISO_DATE.captures(rest.as_str()) {
        let year: i32 = number(raw, caps.get(1).map(|m| m.as_str()))?;
        let month: u32 = number(raw, caps.get(2).map(|m| m.as_str()))?;
        let day: u32 = number(raw, caps.get(3).map(|m| m.as_str()))?;
        if let Some(range) = caps.get(0).map(|m| m.range()) {
            rest.replace_range(range, " ");
        }
        return Ok(Some((year, month, day)));
    }

    // Month first, as US feeds print it
    if let Some(caps) = SLASH_DATE.captures(rest.as_str()) {
        let month: u32 = number(raw, caps.get(1).map(|m| m.as_str()))?;
        let day: u32 = number(raw, caps.get(2).map(|m| m.as_str()))?;
        let year: i32 = number(raw, caps.get(3).map(|m| m.as_str()))?;
        let year = if year < 100 { 2000 + year } else { year };
        if let Some(range) = caps.get(0).map(|m| m.range()) {
            rest.replace_range(range, " ");
        }
        return Ok(Some((year, month, day)));
    }

    Ok(None)
}

fn parse_date_tokens(raw: &str, rest: &str) -> HarvestResult<(Option<i32>, u32, u32)> {
    let mut year = None;
    let mut month = None;
    let mut day = None;

    for token in rest.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
        if token.chars().all(|c| c.is_ascii_digit()) {
            match token.len() {
                4 if year.is_none() => year = Some(number(raw, Some(token))?),
                1 | 2 if day.is_none() => day = Some(number(raw, Some(token))?),
                _ => {
                    return Err(HarvestError::unparseable(
                        raw,
                        format!("unexpected number '{}'", token),
                    ))
                }
            }
            continue;
        }

        if let Some(ordinal_day) = strip_ordinal(token) {
            if day.is_some() {
                return Err(HarvestError::unparseable(raw, "more than one day"));
            }
            day = Some(number(raw, Some(ordinal_day))?);
            continue;
        }

        let lower = token.to_lowercase();
        if let Some(index) = month_index(&lower) {
            if month.is_some() {
                return Err(HarvestError::unparseable(raw, "more than one month"));
            }
            month = Some(index);
            continue;
        }

        if is_ignorable(token, &lower) {
            continue;
        }

        return Err(HarvestError::unparseable(
            raw,
            format!("unrecognized token '{}'", token),
        ));
    }

    let month = month.ok_or_else(|| HarvestError::unparseable(raw, "no month"))?;
    let day = day.ok_or_else(|| HarvestError::unparseable(raw, "no day"))?;
    Ok((year, month, day))
}

/// After a numeric date only weekday names and zone labels may remain
fn reject_leftovers(raw: &str, rest: &str) -> HarvestResult<()> {
    for token in rest.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
        let lower = token.to_lowercase();
        if is_ignorable(token, &lower) {
            continue;
        }
        return Err(HarvestError::unparseable(
            raw,
            format!("unrecognized token '{}'", token),
        ));
    }
    Ok(())
}

fn month_index(lower: &str) -> Option<u32> {
    if lower.len() < 3 {
        return None;
    }
    // "sept" is a common extra abbreviation
    let lower = if lower == "sept" { "sep" } else { lower };
    MONTHS
        .iter()
        .position(|name| name.starts_with(lower))
        .map(|i| i as u32 + 1)
}

/// Words that may surround a date without changing it
fn is_ignorable(token: &str, lower: &str) -> bool {
    is_weekday(lower) || FILLER_WORDS.contains(&lower) || is_zone_abbreviation(token)
}

fn is_weekday(lower: &str) -> bool {
    lower.len() >= 3 && WEEKDAYS.iter().any(|name| name.starts_with(lower))
}

/// Labels like CDT or EST: recognised, but they carry no offset
fn is_zone_abbreviation(token: &str) -> bool {
    ZONE_LABELS.contains(&token)
}

fn strip_ordinal(token: &str) -> Option<&str> {
    let lower_suffix = token.get(token.len().saturating_sub(2)..)?.to_ascii_lowercase();
    if !matches!(lower_suffix.as_str(), "st" | "nd" | "rd" | "th") {
        return None;
    }
    let digits = &token[..token.len() - 2];
    if (1..=2).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

fn number<T: std::str::FromStr>(raw: &str, text: Option<&str>) -> HarvestResult<T> {
    text.and_then(|t| t.parse().ok())
        .ok_or_else(|| HarvestError::unparseable(raw, "malformed number"))
}

fn optional_number<T>(raw: &str, text: Option<&str>) -> HarvestResult<T>
where
    T: std::str::FromStr + Default,
{
    match text {
        Some(t) => number(raw, Some(t)),
        None => Ok(T::default()),
    }
}
