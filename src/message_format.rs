//! ICU MessageFormat subset used by `string.format`
//!
//! Supported syntax: `{name}`, `{n, number[, integer|percent|::skeleton]}`,
//! `{d, date[, short|medium|long|full|::skeleton]}`, `{t, time[, ...]}`,
//! `{n, plural, [offset:k] =0 {...} one {...} other {...}}` with `#`,
//! `{n, selectordinal, ...}`, `{g, select, ...}` and apostrophe quoting.

use crate::date::date_from_value;
use crate::error::FormatError;
use crate::value::{number_to_string, to_js_string};
use chrono::{DateTime, Utc};
use intl_pluralrules::{PluralCategory as CldrCategory, PluralRuleType, PluralRules};
use serde_json::{Map, Value};
use unic_langid::LanguageIdentifier;

/// A locale tag reduced to the parts the formatter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    tag: String,
    language: String,
}

impl Locale {
    /// Create a locale from a BCP 47 tag such as `en-US` or `nl`
    pub fn new(tag: &str) -> Self {
        let tag = tag.trim();
        let language = tag
            .split(|c: char| c == '-' || c == '_')
            .next()
            .filter(|lang| !lang.is_empty())
            .unwrap_or("en")
            .to_ascii_lowercase();
        Self {
            tag: if tag.is_empty() { "en".to_string() } else { tag.to_string() },
            language,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Group and decimal separators
    fn separators(&self) -> (&'static str, &'static str) {
        match self.language.as_str() {
            "nl" | "de" | "es" | "it" | "id" | "pt" | "da" | "tr" => (".", ","),
            "fr" => ("\u{202f}", ","),
            "sv" | "nb" | "fi" | "pl" | "ru" | "cs" => ("\u{a0}", ","),
            _ => (",", "."),
        }
    }

    /// Cardinal plural category of `n` according to the CLDR rules of the language
    pub fn plural_category(&self, n: f64) -> PluralCategory {
        self.select_plural(PluralRuleType::CARDINAL, n)
    }

    /// Ordinal plural category of `n` according to the CLDR rules of the language
    pub fn ordinal_category(&self, n: f64) -> PluralCategory {
        self.select_plural(PluralRuleType::ORDINAL, n)
    }

    /// Languages without CLDR rules fall back to `other`
    fn select_plural(&self, rule_type: PluralRuleType, n: f64) -> PluralCategory {
        let Ok(language) = self.language.parse::<LanguageIdentifier>() else {
            return PluralCategory::Other;
        };
        PluralRules::create(language, rule_type)
            .and_then(|rules| rules.select(n.abs()))
            .map(PluralCategory::from)
            .unwrap_or(PluralCategory::Other)
    }

    fn month_first(&self) -> bool {
        self.language == "en"
    }

    fn numeric_date_separator(&self) -> &'static str {
        match self.language.as_str() {
            "en" => "/",
            "nl" => "-",
            "de" | "ru" | "pl" | "cs" | "fi" | "nb" | "da" | "tr" => ".",
            _ => "/",
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl From<CldrCategory> for PluralCategory {
    fn from(category: CldrCategory) -> Self {
        match category {
            CldrCategory::ZERO => PluralCategory::Zero,
            CldrCategory::ONE => PluralCategory::One,
            CldrCategory::TWO => PluralCategory::Two,
            CldrCategory::FEW => PluralCategory::Few,
            CldrCategory::MANY => PluralCategory::Many,
            CldrCategory::OTHER => PluralCategory::Other,
        }
    }
}

impl PluralCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Element {
    Literal(String),
    Argument(String),
    Number { name: String, options: NumberOptions },
    Date { name: String, style: DateStyle },
    Time { name: String, style: DateStyle },
    Plural {
        name: String,
        offset: f64,
        ordinal: bool,
        options: Vec<(PluralSelector, Vec<Element>)>,
    },
    Select {
        name: String,
        options: Vec<(String, Vec<Element>)>,
    },
    Pound,
}

#[derive(Debug, Clone, PartialEq)]
enum PluralSelector {
    Exact(f64),
    Category(String),
}

#[derive(Debug, Clone, PartialEq)]
struct NumberOptions {
    percent: bool,
    min_fraction: usize,
    max_fraction: usize,
    grouping: bool,
}

impl Default for NumberOptions {
    fn default() -> Self {
        Self {
            percent: false,
            min_fraction: 0,
            max_fraction: 3,
            grouping: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DateStyle {
    Default,
    Short,
    Medium,
    Long,
    Full,
    Skeleton(String),
}

/// A parsed message ready to be formatted with values.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageFormat {
    pattern: String,
    locale: Locale,
    elements: Vec<Element>,
}

impl MessageFormat {
    /// Parse `pattern` for the given locale
    pub fn new(pattern: &str, locale: Locale) -> Result<Self, FormatError> {
        let elements = Parser::new(pattern).parse()?;
        Ok(Self {
            pattern: pattern.to_string(),
            locale,
            elements,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Format the message. Every referenced placeholder must be present in `values`.
    pub fn format(&self, values: &Map<String, Value>) -> Result<String, FormatError> {
        let mut out = String::new();
        self.format_elements(&self.elements, values, None, &mut out)?;
        Ok(out)
    }

    fn lookup<'v>(&self, values: &'v Map<String, Value>, name: &str) -> Result<&'v Value, FormatError> {
        values.get(name).ok_or_else(|| FormatError::MissingValue {
            name: name.to_string(),
            message: self.pattern.clone(),
        })
    }

    fn format_elements(
        &self,
        elements: &[Element],
        values: &Map<String, Value>,
        pound: Option<f64>,
        out: &mut String,
    ) -> Result<(), FormatError> {
        for element in elements {
            match element {
                Element::Literal(text) => out.push_str(text),
                Element::Argument(name) => match self.lookup(values, name)? {
                    Value::Null | Value::Bool(false) => {}
                    value => out.push_str(&to_js_string(value)),
                },
                Element::Number { name, options } => {
                    let value = self.lookup(values, name)?;
                    out.push_str(&self.format_number(coerce_number(value), options));
                }
                Element::Date { name, style } => {
                    let date = self.date_argument(values, name)?;
                    out.push_str(&self.format_date(date, style)?);
                }
                Element::Time { name, style } => {
                    let date = self.date_argument(values, name)?;
                    out.push_str(&self.format_time(date, style)?);
                }
                Element::Pound => {
                    if let Some(n) = pound {
                        out.push_str(&self.format_number(n, &NumberOptions::default()));
                    } else {
                        out.push('#');
                    }
                }
                Element::Plural {
                    name,
                    offset,
                    ordinal,
                    options,
                } => {
                    let value = self.lookup(values, name)?;
                    let n = plural_number(value).ok_or_else(|| FormatError::InvalidValue {
                        name: name.clone(),
                        reason: format!("expected a number, got {}", value),
                    })?;
                    let exact = options
                        .iter()
                        .find(|(selector, _)| matches!(selector, PluralSelector::Exact(x) if *x == n));
                    let category = if *ordinal {
                        self.locale.ordinal_category(n - offset)
                    } else {
                        self.locale.plural_category(n - offset)
                    };
                    let chosen = exact
                        .or_else(|| find_category(options, category.as_str()))
                        .or_else(|| find_category(options, "other"));
                    if let Some((_, body)) = chosen {
                        self.format_elements(body, values, Some(n - offset), out)?;
                    }
                }
                Element::Select { name, options } => {
                    let value = self.lookup(values, name)?;
                    let key = match value {
                        Value::Number(n) => number_to_string(n),
                        other => to_js_string(other),
                    };
                    let chosen = options
                        .iter()
                        .find(|(option, _)| *option == key)
                        .or_else(|| options.iter().find(|(option, _)| option == "other"));
                    match chosen {
                        Some((_, body)) => self.format_elements(body, values, pound, out)?,
                        None => {
                            return Err(FormatError::InvalidValue {
                                name: name.clone(),
                                reason: format!("no option matches \"{}\"", key),
                            })
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn date_argument(&self, values: &Map<String, Value>, name: &str) -> Result<DateTime<Utc>, FormatError> {
        let value = self.lookup(values, name)?;
        date_from_value(value).ok_or_else(|| FormatError::InvalidValue {
            name: name.to_string(),
            reason: "Invalid time value".to_string(),
        })
    }

    fn format_number(&self, value: f64, options: &NumberOptions) -> String {
        if value.is_nan() {
            return "NaN".to_string();
        }
        if value.is_infinite() {
            return if value > 0.0 { "∞" } else { "-∞" }.to_string();
        }

        let scaled = if options.percent { value * 100.0 } else { value };
        let factor = 10f64.powi(options.max_fraction as i32);
        let rounded = (scaled.abs() * factor).round() / factor;
        let fixed = format!("{:.*}", options.max_fraction, rounded);
        let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

        let mut fraction = fraction.to_string();
        while fraction.len() > options.min_fraction && fraction.ends_with('0') {
            fraction.pop();
        }

        let (group_separator, decimal_separator) = self.locale.separators();
        let mut out = String::new();
        if scaled < 0.0 && rounded != 0.0 {
            out.push('-');
        }
        if options.grouping {
            out.push_str(&group_digits(integer, group_separator));
        } else {
            out.push_str(integer);
        }
        if !fraction.is_empty() {
            out.push_str(decimal_separator);
            out.push_str(&fraction);
        }
        if options.percent {
            out.push('%');
        }
        out
    }

    fn format_date(&self, date: DateTime<Utc>, style: &DateStyle) -> Result<String, FormatError> {
        let english = self.locale.month_first();
        let sep = self.locale.numeric_date_separator();
        let pattern = match style {
            DateStyle::Default if english => "%-m/%-d/%Y".to_string(),
            DateStyle::Default => format!("%-d{sep}%-m{sep}%Y"),
            DateStyle::Short if english => "%-m/%-d/%y".to_string(),
            DateStyle::Short => format!("%d{sep}%m{sep}%Y"),
            DateStyle::Medium if english => "%b %-d, %Y".to_string(),
            DateStyle::Medium => "%-d %b %Y".to_string(),
            DateStyle::Long if english => "%B %-d, %Y".to_string(),
            DateStyle::Long => "%-d %B %Y".to_string(),
            DateStyle::Full if english => "%A, %B %-d, %Y".to_string(),
            DateStyle::Full => "%A %-d %B %Y".to_string(),
            DateStyle::Skeleton(skeleton) => self.skeleton_pattern(skeleton)?,
        };
        Ok(date.format(&pattern).to_string())
    }

    fn format_time(&self, date: DateTime<Utc>, style: &DateStyle) -> Result<String, FormatError> {
        let twelve_hour = self.locale.month_first();
        let pattern = match style {
            DateStyle::Short if twelve_hour => "%-I:%M %p".to_string(),
            DateStyle::Short => "%H:%M".to_string(),
            DateStyle::Default | DateStyle::Medium if twelve_hour => "%-I:%M:%S %p".to_string(),
            DateStyle::Default | DateStyle::Medium => "%H:%M:%S".to_string(),
            DateStyle::Long | DateStyle::Full if twelve_hour => "%-I:%M:%S %p UTC".to_string(),
            DateStyle::Long | DateStyle::Full => "%H:%M:%S UTC".to_string(),
            DateStyle::Skeleton(skeleton) => self.skeleton_pattern(skeleton)?,
        };
        Ok(date.format(&pattern).to_string())
    }

    /// Translate a date skeleton such as `yMMMd` or `yyyy` into a strftime pattern.
    /// Skeletons only name fields; their order and punctuation come from the locale.
    fn skeleton_pattern(&self, skeleton: &str) -> Result<String, FormatError> {
        let mut year = None;
        let mut month = None;
        let mut day = None;
        let mut weekday = None;
        let mut hour = None;
        let mut minute = None;
        let mut second = None;
        let mut twelve_hour = false;

        let chars: Vec<char> = skeleton.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let start = i;
            while i < chars.len() && chars[i] == c {
                i += 1;
            }
            let count = i - start;
            match c {
                'y' => year = Some(if count == 2 { "%y" } else { "%Y" }),
                'M' | 'L' => {
                    month = Some(match count {
                        1 => "%-m",
                        2 => "%m",
                        3 => "%b",
                        _ => "%B",
                    })
                }
                'd' => day = Some(if count == 1 { "%-d" } else { "%d" }),
                'E' => weekday = Some(if count <= 3 { "%a" } else { "%A" }),
                'h' => {
                    twelve_hour = true;
                    hour = Some(if count == 1 { "%-I" } else { "%I" });
                }
                'H' => hour = Some(if count == 1 { "%-H" } else { "%H" }),
                'm' => minute = Some("%M"),
                's' => second = Some("%S"),
                'a' => twelve_hour = true,
                c if c.is_whitespace() => {}
                other => {
                    return Err(FormatError::Syntax {
                        message: self.pattern.clone(),
                        offset: start,
                        reason: format!("unsupported date skeleton field '{}'", other),
                    })
                }
            }
        }

        let textual_month = matches!(month, Some("%b") | Some("%B"));
        let mut date_part = String::new();
        if textual_month {
            let mut pieces: Vec<String> = Vec::new();
            if self.locale.month_first() {
                let month_day = [month, day].iter().flatten().copied().collect::<Vec<_>>().join(" ");
                pieces.push(month_day);
                pieces.extend(year.map(str::to_string));
                date_part = pieces.join(", ");
            } else {
                date_part = [day, month, year].iter().flatten().copied().collect::<Vec<_>>().join(" ");
            }
        } else {
            let ordered = if self.locale.month_first() {
                [month, day, year]
            } else {
                [day, month, year]
            };
            date_part.push_str(
                &ordered
                    .iter()
                    .flatten()
                    .copied()
                    .collect::<Vec<_>>()
                    .join(self.locale.numeric_date_separator()),
            );
        }
        if let Some(weekday) = weekday {
            date_part = if date_part.is_empty() {
                weekday.to_string()
            } else {
                format!("{}, {}", weekday, date_part)
            };
        }

        let mut time_part = [hour, minute, second]
            .iter()
            .flatten()
            .copied()
            .collect::<Vec<_>>()
            .join(":");
        if twelve_hour && hour.is_some() {
            time_part.push_str(" %p");
        }

        Ok(match (date_part.is_empty(), time_part.is_empty()) {
            (false, false) => format!("{}, {}", date_part, time_part),
            (false, true) => date_part,
            (true, _) => time_part,
        })
    }
}

fn find_category<'e>(
    options: &'e [(PluralSelector, Vec<Element>)],
    category: &str,
) -> Option<&'e (PluralSelector, Vec<Element>)> {
    options
        .iter()
        .find(|(selector, _)| matches!(selector, PluralSelector::Category(c) if c == category))
}

fn group_digits(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(digit);
    }
    out
}

fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn plural_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<Element>, FormatError> {
        self.parse_message(false, false)
    }

    fn error(&self, reason: impl Into<String>) -> FormatError {
        FormatError::Syntax {
            message: self.source.to_string(),
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.pos += 1;
        }
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().map(&predicate).unwrap_or(false) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn expect(&mut self, expected: char) -> Result<(), FormatError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    /// Parse message text until the end of input, or until the closing brace
    /// of a nested option body when `nested` is set.
    fn parse_message(&mut self, in_plural: bool, nested: bool) -> Result<Vec<Element>, FormatError> {
        let mut elements = Vec::new();
        let mut literal = String::new();

        loop {
            let Some(c) = self.peek() else {
                if nested {
                    return Err(self.error("unclosed option body"));
                }
                break;
            };
            match c {
                '{' => {
                    self.pos += 1;
                    flush(&mut elements, &mut literal);
                    elements.push(self.parse_argument(in_plural)?);
                }
                '}' => {
                    if !nested {
                        return Err(self.error("unmatched '}'"));
                    }
                    self.pos += 1;
                    break;
                }
                '#' if in_plural => {
                    self.pos += 1;
                    flush(&mut elements, &mut literal);
                    elements.push(Element::Pound);
                }
                '\'' => {
                    self.pos += 1;
                    self.read_quoted(in_plural, &mut literal);
                }
                other => {
                    self.pos += 1;
                    literal.push(other);
                }
            }
        }

        flush(&mut elements, &mut literal);
        Ok(elements)
    }

    /// Apostrophe handling: `''` is a literal quote, a quote before a syntax
    /// character starts a quoted run, any other quote is literal.
    fn read_quoted(&mut self, in_plural: bool, literal: &mut String) {
        match self.peek() {
            Some('\'') => {
                self.pos += 1;
                literal.push('\'');
            }
            Some(c) if c == '{' || c == '}' || (c == '#' && in_plural) || c == '|' => {
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    if c == '\'' {
                        if self.peek() == Some('\'') {
                            self.pos += 1;
                            literal.push('\'');
                            continue;
                        }
                        return;
                    }
                    literal.push(c);
                }
            }
            _ => literal.push('\''),
        }
    }

    fn parse_argument(&mut self, in_plural: bool) -> Result<Element, FormatError> {
        self.skip_whitespace();
        let name = self.read_while(|c| !c.is_whitespace() && c != ',' && c != '}' && c != '{');
        if name.is_empty() {
            return Err(self.error("empty argument name"));
        }
        self.skip_whitespace();

        match self.peek() {
            Some('}') => {
                self.pos += 1;
                Ok(Element::Argument(name))
            }
            Some(',') => {
                self.pos += 1;
                self.skip_whitespace();
                let kind = self.read_while(|c| c.is_ascii_alphanumeric());
                self.skip_whitespace();
                match kind.as_str() {
                    "number" | "date" | "time" => {
                        let style = self.parse_style()?;
                        self.formatted_argument(name, &kind, style.as_deref())
                    }
                    "plural" | "selectordinal" => {
                        self.expect(',')?;
                        let (offset, options) = self.parse_plural_options()?;
                        Ok(Element::Plural {
                            name,
                            offset,
                            ordinal: kind == "selectordinal",
                            options,
                        })
                    }
                    "select" => {
                        self.expect(',')?;
                        let options = self.parse_select_options(in_plural)?;
                        Ok(Element::Select { name, options })
                    }
                    other => Err(self.error(format!("unknown argument type '{}'", other))),
                }
            }
            _ => Err(self.error("expected ',' or '}'")),
        }
    }

    /// Optional `, style` part of a simple argument, consuming the closing brace
    fn parse_style(&mut self) -> Result<Option<String>, FormatError> {
        match self.peek() {
            Some('}') => {
                self.pos += 1;
                Ok(None)
            }
            Some(',') => {
                self.pos += 1;
                let style = self.read_while(|c| c != '}' && c != '{');
                self.expect('}')?;
                Ok(Some(style.trim().to_string()))
            }
            _ => Err(self.error("expected ',' or '}'")),
        }
    }

    fn formatted_argument(&self, name: String, kind: &str, style: Option<&str>) -> Result<Element, FormatError> {
        if kind == "number" {
            let options = match style {
                None | Some("") => NumberOptions::default(),
                Some("integer") => NumberOptions {
                    max_fraction: 0,
                    ..NumberOptions::default()
                },
                Some("percent") => NumberOptions {
                    percent: true,
                    max_fraction: 0,
                    ..NumberOptions::default()
                },
                Some(style) => match style.strip_prefix("::") {
                    Some(skeleton) => self.number_skeleton(skeleton)?,
                    None => NumberOptions::default(),
                },
            };
            return Ok(Element::Number { name, options });
        }

        let style = match style {
            None | Some("") => DateStyle::Default,
            Some("short") => DateStyle::Short,
            Some("medium") => DateStyle::Medium,
            Some("long") => DateStyle::Long,
            Some("full") => DateStyle::Full,
            Some(style) => match style.strip_prefix("::") {
                Some(skeleton) => DateStyle::Skeleton(skeleton.trim().to_string()),
                None => DateStyle::Default,
            },
        };
        Ok(if kind == "date" {
            Element::Date { name, style }
        } else {
            Element::Time { name, style }
        })
    }

    fn number_skeleton(&self, skeleton: &str) -> Result<NumberOptions, FormatError> {
        let mut options = NumberOptions::default();
        let mut precision_set = false;
        for token in skeleton.split_whitespace() {
            match token {
                "percent" | "%" => options.percent = true,
                "group-off" | ",_" => options.grouping = false,
                "integer" => {
                    options.min_fraction = 0;
                    options.max_fraction = 0;
                    precision_set = true;
                }
                precision if precision.starts_with('.') => {
                    let digits = &precision[1..];
                    if !digits.chars().all(|c| c == '0' || c == '#') {
                        return Err(self.error(format!("invalid precision '{}'", precision)));
                    }
                    options.min_fraction = digits.chars().filter(|c| *c == '0').count();
                    options.max_fraction = digits.len();
                    precision_set = true;
                }
                other => return Err(self.error(format!("unsupported number skeleton '{}'", other))),
            }
        }
        if options.percent && !precision_set {
            options.max_fraction = 0;
        }
        Ok(options)
    }

    fn parse_plural_options(&mut self) -> Result<(f64, Vec<(PluralSelector, Vec<Element>)>), FormatError> {
        let mut offset = 0.0;
        let mut options = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("unclosed plural argument")),
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }

            let selector = self.read_while(|c| !c.is_whitespace() && c != '{' && c != '}');
            if let Some(rest) = selector.strip_prefix("offset:") {
                if !options.is_empty() {
                    return Err(self.error("offset must precede plural options"));
                }
                let text = if rest.is_empty() {
                    self.skip_whitespace();
                    self.read_while(|c| c.is_ascii_digit() || c == '.')
                } else {
                    rest.to_string()
                };
                offset = text.parse().map_err(|_| self.error("invalid plural offset"))?;
                continue;
            }
            if selector.is_empty() {
                return Err(self.error("expected plural selector"));
            }
            let selector = if selector.starts_with('=') {
                let exact = selector[1..]
                    .parse()
                    .map_err(|_| self.error(format!("invalid exact selector '{}'", selector)))?;
                PluralSelector::Exact(exact)
            } else {
                PluralSelector::Category(selector)
            };

            self.skip_whitespace();
            self.expect('{')?;
            let body = self.parse_message(true, true)?;
            options.push((selector, body));
        }

        if find_category(&options, "other").is_none() {
            return Err(self.error("plural argument is missing an 'other' option"));
        }
        Ok((offset, options))
    }

    fn parse_select_options(&mut self, in_plural: bool) -> Result<Vec<(String, Vec<Element>)>, FormatError> {
        let mut options = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("unclosed select argument")),
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            let selector = self.read_while(|c| !c.is_whitespace() && c != '{' && c != '}');
            if selector.is_empty() {
                return Err(self.error("expected select option"));
            }
            self.skip_whitespace();
            self.expect('{')?;
            let body = self.parse_message(in_plural, true)?;
            options.push((selector, body));
        }

        if !options.iter().any(|(option, _)| option == "other") {
            return Err(self.error("select argument is missing an 'other' option"));
        }
        Ok(options)
    }
}

fn flush(elements: &mut Vec<Element>, literal: &mut String) {
    if !literal.is_empty() {
        elements.push(Element::Literal(std::mem::take(literal)));
    }
}
