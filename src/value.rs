//! JavaScript-compatible coercions over JSON values
//!
//! Remapper definitions are authored against JavaScript semantics, so the
//! engine coerces values the way a browser would: `String(value)` for text
//! operators and truthiness for conditions.

use serde_json::{Number, Value};

/// Truthiness of a value as used by `if` and the unary `not`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a value the way `String(value)` does.
pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        // Array.prototype.toString joins elements, rendering null as empty
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Format a JSON number without a trailing `.0` for integral floats.
pub fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => float_to_string(f),
        None => n.to_string(),
    }
}

pub(crate) fn float_to_string(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{:.0}", f)
    } else {
        f.to_string()
    }
}

/// Coerce a value to an array the way `[].concat(value)` does.
pub fn to_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Null-propagating member access used by `prop` and `context`.
///
/// Objects are indexed by key, arrays by numeric index or `length`. Anything
/// else yields `None`.
pub fn member<'a>(value: &'a Value, key: &str) -> Option<MemberRef<'a>> {
    match value {
        Value::Object(map) => map.get(key).map(MemberRef::Borrowed),
        Value::Array(items) => {
            if key == "length" {
                return Some(MemberRef::Owned(Value::from(items.len())));
            }
            key.parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .map(MemberRef::Borrowed)
        }
        Value::String(s) if key == "length" => {
            Some(MemberRef::Owned(Value::from(s.encode_utf16().count())))
        }
        _ => None,
    }
}

/// Result of a member lookup: either a reference into the source value or a
/// value computed on the fly (such as `length`).
#[derive(Debug)]
pub enum MemberRef<'a> {
    Borrowed(&'a Value),
    Owned(Value),
}

/// Walk a dot-separated path, returning `Value::Null` as soon as a segment is missing.
///
/// Only the value reached by the last segment is cloned.
pub fn walk_path(root: &Value, path: &str) -> Value {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        match member(current, segment) {
            Some(MemberRef::Borrowed(Value::Null)) | None => return Value::Null,
            Some(MemberRef::Borrowed(value)) => current = value,
            // computed members are numbers, which have no members of their own
            Some(MemberRef::Owned(value)) => {
                return if segments.peek().is_none() { value } else { Value::Null };
            }
        }
    }
    current.clone()
}
