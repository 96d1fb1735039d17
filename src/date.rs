//! Date parsing for `date.parse`
//!
//! Two modes: a token-based format (`yyyy-MM-dd'T'HH:mm:ss.SSSX`) resolved
//! against a reference instant, and a strict ISO-8601 fallback. Invalid input
//! never raises; it yields `None`, which surfaces as JSON `null`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

const WEEKDAYS: [&str; 7] = [
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

/// A single element of a parsed format string
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(char, usize),
    Literal(String),
}

/// Components captured from the input, applied to the reference in order of
/// decreasing magnitude.
#[derive(Debug, Default)]
struct Captured {
    year: Option<i32>,
    two_digit_year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    hour12: Option<u32>,
    pm: Option<bool>,
    minute: Option<u32>,
    second: Option<u32>,
    millis: Option<u32>,
    offset_seconds: Option<i32>,
}

/// Parse `input` using format tokens. Missing components come from `reference`.
pub fn parse_formatted(input: &str, format: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let tokens = tokenize(format)?;
    let mut captured = Captured::default();
    let mut rest = input;

    for token in &tokens {
        rest = match token {
            Token::Literal(text) => rest.strip_prefix(text.as_str())?,
            Token::Field(letter, width) => capture_field(rest, *letter, *width, &mut captured)?,
        };
    }
    if !rest.is_empty() {
        return None;
    }

    resolve(captured, reference)
}

/// Parse an ISO-8601 date or date-time. Values without an offset are read as UTC.
pub fn parse_iso(input: &str) -> Option<DateTime<Utc>> {
    static ISO: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = ISO
        .get_or_init(|| {
            Regex::new(
                r"^([+-]?\d{4,6})(?:-(\d{2})(?:-(\d{2}))?)?(?:[T ](\d{2}):(\d{2})(?::(\d{2})(?:[.,](\d+))?)?(Z|[+-]\d{2}(?::?\d{2})?)?)?$",
            )
            .ok()
        })
        .as_ref()?;
    let caps = pattern.captures(input.trim())?;
    let number = |index: usize| caps.get(index).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(2).unwrap_or(1), number(3).unwrap_or(1))?;
    let millis = caps
        .get(7)
        .map(|m| fraction_to_millis(m.as_str()))
        .unwrap_or(0);
    let time = date.and_hms_milli_opt(
        number(4).unwrap_or(0),
        number(5).unwrap_or(0),
        number(6).unwrap_or(0),
        millis,
    )?;
    let offset = match caps.get(8) {
        Some(m) => parse_offset(m.as_str())?.1,
        None => 0,
    };

    let utc = time.checked_sub_signed(Duration::seconds(i64::from(offset)))?;
    Some(Utc.from_utc_datetime(&utc))
}

/// Interpret a JSON value as an instant: ISO strings or epoch milliseconds.
pub fn date_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_iso(s),
        Value::Number(n) => {
            let millis = n.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            Utc.timestamp_millis_opt(millis.trunc() as i64).single()
        }
        _ => None,
    }
}

/// Render a date the way a JSON serializer renders it; invalid dates become `null`.
pub fn date_to_value(date: Option<DateTime<Utc>>) -> Value {
    match date {
        Some(date) => Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => Value::Null,
    }
}

fn tokenize(format: &str) -> Option<Vec<Token>> {
    let chars: Vec<char> = format.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // '' is an escaped quote, otherwise read until the closing quote
            if chars.get(i + 1) == Some(&'\'') {
                push_literal(&mut tokens, "'");
                i += 2;
                continue;
            }
            let mut literal = String::new();
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        literal.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                literal.push(chars[i]);
                i += 1;
            }
            // skip the closing quote
            i += 1;
            push_literal(&mut tokens, &literal);
        } else if c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i] == c {
                i += 1;
            }
            if !"yMdHhmsSaXxE".contains(c) {
                return None;
            }
            tokens.push(Token::Field(c, i - start));
        } else {
            push_literal(&mut tokens, &c.to_string());
            i += 1;
        }
    }

    Some(tokens)
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Literal(existing)) = tokens.last_mut() {
        existing.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

fn capture_field<'a>(input: &'a str, letter: char, width: usize, captured: &mut Captured) -> Option<&'a str> {
    match letter {
        'y' => {
            if width == 2 {
                let (value, rest) = take_digits(input, 2, 2)?;
                captured.two_digit_year = Some(value as i32);
                Some(rest)
            } else {
                let (value, rest) = take_digits(input, width.max(1), width.max(4))?;
                captured.year = Some(value as i32);
                Some(rest)
            }
        }
        'M' if width >= 3 => {
            let (index, rest) = take_name(input, &MONTHS, width == 3)?;
            captured.month = Some(index as u32 + 1);
            Some(rest)
        }
        'M' => store(input, width, &mut captured.month),
        'd' => store(input, width, &mut captured.day),
        'H' => store(input, width, &mut captured.hour),
        'h' => store(input, width, &mut captured.hour12),
        'm' => store(input, width, &mut captured.minute),
        's' => store(input, width, &mut captured.second),
        'S' => {
            let (_, rest) = take_digits(input, width, width)?;
            let digits = &input[..input.len() - rest.len()];
            captured.millis = Some(fraction_to_millis(digits));
            Some(rest)
        }
        'a' => {
            let lower = input.get(..2)?.to_ascii_lowercase();
            captured.pm = match lower.as_str() {
                "am" => Some(false),
                "pm" => Some(true),
                _ => return None,
            };
            Some(&input[2..])
        }
        'X' | 'x' => {
            let (consumed, offset) = parse_offset_prefix(input, letter == 'X')?;
            captured.offset_seconds = Some(offset);
            Some(&input[consumed..])
        }
        'E' => {
            let (_, rest) = take_name(input, &WEEKDAYS, width <= 3)?;
            Some(rest)
        }
        _ => None,
    }
}

fn store<'a>(input: &'a str, width: usize, slot: &mut Option<u32>) -> Option<&'a str> {
    let (value, rest) = take_digits(input, width, width.max(2))?;
    *slot = Some(value);
    Some(rest)
}

/// Consume between `min` and `max` ASCII digits.
fn take_digits(input: &str, min: usize, max: usize) -> Option<(u32, &str)> {
    let count = input
        .bytes()
        .take(max)
        .take_while(|b| b.is_ascii_digit())
        .count();
    if count < min || count == 0 {
        return None;
    }
    let value = input[..count].parse::<u32>().ok()?;
    Some((value, &input[count..]))
}

fn take_name<'a>(input: &'a str, names: &[&str], abbreviated: bool) -> Option<(usize, &'a str)> {
    names.iter().enumerate().find_map(|(index, name)| {
        let candidate = if abbreviated { &name[..3] } else { name };
        let head = input.get(..candidate.len())?;
        head.eq_ignore_ascii_case(candidate)
            .then(|| (index, &input[candidate.len()..]))
    })
}

fn fraction_to_millis(digits: &str) -> u32 {
    let mut padded: String = digits.chars().take(3).collect();
    while padded.len() < 3 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

/// Parse a complete offset string such as `Z`, `+01`, `-0530` or `+05:30`.
fn parse_offset(text: &str) -> Option<(usize, i32)> {
    let (consumed, offset) = parse_offset_prefix(text, true)?;
    (consumed == text.len()).then_some((consumed, offset))
}

fn parse_offset_prefix(input: &str, allow_z: bool) -> Option<(usize, i32)> {
    let bytes = input.as_bytes();
    match bytes.first()? {
        b'Z' | b'z' if allow_z => Some((1, 0)),
        sign @ (b'+' | b'-') => {
            let (hours, rest) = take_digits(&input[1..], 2, 2)?;
            let mut consumed = 3;
            let mut minutes = 0;
            let after_colon = rest.strip_prefix(':');
            let minute_source = after_colon.unwrap_or(rest);
            if let Some((value, _)) = take_digits(minute_source, 2, 2) {
                minutes = value;
                consumed += 2 + usize::from(after_colon.is_some());
            }
            if hours > 23 || minutes > 59 {
                return None;
            }
            let seconds = (hours * 3600 + minutes * 60) as i32;
            Some((consumed, if *sign == b'-' { -seconds } else { seconds }))
        }
        _ => None,
    }
}

/// Map a two-digit year into the century window around the reference year.
fn normalize_two_digit_year(two_digit: i32, reference_year: i32) -> i32 {
    let abs_reference = if reference_year > 0 { reference_year } else { 1 - reference_year };
    if abs_reference <= 50 {
        return if two_digit == 0 { 100 } else { two_digit };
    }
    let range_end = abs_reference + 50;
    let range_end_century = (range_end / 100) * 100;
    let previous_century = two_digit >= range_end % 100;
    two_digit + range_end_century - if previous_century { 100 } else { 0 }
}

fn resolve(captured: Captured, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut current: NaiveDateTime = reference.naive_utc();
    let midnight = |date: NaiveDate| date.and_hms_opt(0, 0, 0);

    let year = captured
        .year
        .or_else(|| captured.two_digit_year.map(|yy| normalize_two_digit_year(yy, current.year())));
    if let Some(year) = year {
        current = midnight(NaiveDate::from_ymd_opt(year, 1, 1)?)?;
    }
    if let Some(month) = captured.month {
        current = midnight(NaiveDate::from_ymd_opt(current.year(), month, 1)?)?;
    }
    if let Some(day) = captured.day {
        current = midnight(NaiveDate::from_ymd_opt(current.year(), current.month(), day)?)?;
    }

    let hour = match (captured.hour, captured.hour12, captured.pm) {
        (Some(hour), _, _) => Some(hour),
        (None, Some(hour12), pm) => {
            if hour12 == 0 || hour12 > 12 {
                return None;
            }
            Some(match pm.unwrap_or(false) {
                true if hour12 < 12 => hour12 + 12,
                false if hour12 == 12 => 0,
                _ => hour12,
            })
        }
        (None, None, Some(pm)) => Some(if pm { 12 } else { 0 }),
        (None, None, None) => None,
    };
    if let Some(hour) = hour {
        current = current.date().and_hms_opt(hour, 0, 0)?;
    }
    if let Some(minute) = captured.minute {
        current = current.date().and_hms_opt(current.hour(), minute, 0)?;
    }
    if let Some(second) = captured.second {
        current = current.date().and_hms_opt(current.hour(), current.minute(), second)?;
    }
    if let Some(millis) = captured.millis {
        current = current.with_nanosecond(millis * 1_000_000)?;
    }

    let offset = captured.offset_seconds.unwrap_or(0);
    let utc = current.checked_sub_signed(Duration::seconds(i64::from(offset)))?;
    Some(Utc.from_utc_datetime(&utc))
}
