//! Typed remapper definitions
//!
//! A definition is parsed once from its serialized JSON/YAML shape into a
//! closed set of operators. Structural mistakes (steps with zero or several
//! keys, unknown operators, malformed arguments) are reported here, before any
//! data is evaluated.

use crate::error::DefinitionError;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

/// A parsed remapper definition.
#[derive(Debug, Clone)]
pub enum Remapper {
    /// A scalar or `null`, returned as-is regardless of the input
    Literal(Value),
    /// Steps folded left to right over the input
    Steps(Vec<Step>),
}

/// One operator application within a remapper.
#[derive(Debug, Clone)]
pub enum Step {
    Static(Value),
    Prop(String),
    Context(String),
    User(String),
    Root,
    Array(ArrayProperty),
    ObjectFrom(Vec<(String, Remapper)>),
    ObjectAssign(Vec<(String, Remapper)>),
    ObjectOmit(Vec<String>),
    ArrayMap(Vec<Remapper>),
    If(Box<Conditional>),
    Equals(Vec<Remapper>),
    Not(Vec<Remapper>),
    StringCase(StringCase),
    StringFormat(StringFormat),
    StringReplace(StringReplace),
    DateParse(Option<String>),
}

/// Branches of an `if` step
#[derive(Debug, Clone)]
pub struct Conditional {
    pub condition: Remapper,
    pub then: Remapper,
    pub otherwise: Remapper,
}

/// Properties of the enclosing `array.map` iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayProperty {
    Index,
    Length,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringCase {
    Upper,
    Lower,
    /// Any other value leaves the input unchanged
    Unchanged(Value),
}

#[derive(Debug, Clone)]
pub struct StringFormat {
    pub message_id: Option<String>,
    pub template: Option<String>,
    pub values: Vec<(String, Remapper)>,
}

/// A compiled `string.replace` step
#[derive(Debug, Clone)]
pub struct StringReplace {
    pub(crate) pattern: Regex,
    pub(crate) replacement: String,
    source: String,
    original_replacement: String,
}

impl StringReplace {
    /// Compile a replacement from a JavaScript-style regex source and replacement string
    pub fn new(source: &str, replacement: &str) -> Result<Self, DefinitionError> {
        let pattern = Regex::new(&format!("(?m){}", source)).map_err(|e| DefinitionError::InvalidRegex {
            reason: e.to_string(),
        })?;
        Ok(Self {
            replacement: translate_replacement(replacement, pattern.captures_len() - 1),
            pattern,
            source: source.to_string(),
            original_replacement: replacement.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn replacement(&self) -> &str {
        &self.original_replacement
    }
}

impl Remapper {
    /// Parse a serialized definition
    pub fn parse(definition: &Value) -> Result<Self, DefinitionError> {
        let parsed = match definition {
            Value::Array(steps) => steps
                .iter()
                .map(|step| match step {
                    Value::Object(map) => Step::parse(map),
                    other => Err(DefinitionError::InvalidShape {
                        found: type_name(other).to_string(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Remapper::Steps),
            // a bare step object stands for a single-step list
            Value::Object(map) => Step::parse(map).map(|step| Remapper::Steps(vec![step])),
            scalar => Ok(Remapper::Literal(scalar.clone())),
        };
        if let Err(err) = &parsed {
            warn!(error = %err, "rejected remapper definition");
        }
        parsed
    }

    /// Shorthand for a remapper consisting of a single step
    pub fn step(step: Step) -> Self {
        Remapper::Steps(vec![step])
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Remapper::Literal(_))
    }
}

impl Step {
    /// Parse a single `{ operator: args }` object
    pub fn parse(map: &Map<String, Value>) -> Result<Self, DefinitionError> {
        let mut entries = map.iter();
        let (operator, args) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(DefinitionError::DuplicateOperator {
                    found: map.len(),
                    keys: map.keys().cloned().collect::<Vec<_>>().join(", "),
                })
            }
        };

        let op = operator.as_str();
        let step = match op {
            "static" => Step::Static(args.clone()),
            "prop" => Step::Prop(path_argument(op, args)?),
            "context" => Step::Context(path_argument(op, args)?),
            "user" => Step::User(path_argument(op, args)?),
            "root" => Step::Root,
            "array" => match args.as_str() {
                Some("index") => Step::Array(ArrayProperty::Index),
                Some("length") => Step::Array(ArrayProperty::Length),
                _ => {
                    return Err(DefinitionError::invalid_arguments(op, "expected \"index\" or \"length\""))
                }
            },
            "object.from" => Step::ObjectFrom(remapper_map(op, args)?),
            "object.assign" => Step::ObjectAssign(remapper_map(op, args)?),
            "object.omit" => Step::ObjectOmit(string_list(op, args)?),
            "array.map" => Step::ArrayMap(remapper_list(op, args)?),
            "if" => Step::If(Box::new(conditional(args)?)),
            "equals" => Step::Equals(remapper_list(op, args)?),
            "not" => Step::Not(remapper_list(op, args)?),
            "string.case" => Step::StringCase(match args.as_str() {
                Some("upper") => StringCase::Upper,
                Some("lower") => StringCase::Lower,
                _ => StringCase::Unchanged(args.clone()),
            }),
            "string.format" => Step::StringFormat(string_format(args)?),
            "string.replace" => Step::StringReplace(string_replace(args)?),
            "date.parse" => Step::DateParse(match args {
                Value::Null => None,
                Value::String(format) if format.is_empty() => None,
                Value::String(format) => Some(format.clone()),
                _ => return Err(DefinitionError::invalid_arguments(op, "expected a format string")),
            }),
            unknown => {
                return Err(DefinitionError::UnknownOperator {
                    operator: unknown.to_string(),
                })
            }
        };
        Ok(step)
    }

    /// The serialized name of this operator
    pub fn operator_name(&self) -> &'static str {
        match self {
            Step::Static(_) => "static",
            Step::Prop(_) => "prop",
            Step::Context(_) => "context",
            Step::User(_) => "user",
            Step::Root => "root",
            Step::Array(_) => "array",
            Step::ObjectFrom(_) => "object.from",
            Step::ObjectAssign(_) => "object.assign",
            Step::ObjectOmit(_) => "object.omit",
            Step::ArrayMap(_) => "array.map",
            Step::If(_) => "if",
            Step::Equals(_) => "equals",
            Step::Not(_) => "not",
            Step::StringCase(_) => "string.case",
            Step::StringFormat(_) => "string.format",
            Step::StringReplace(_) => "string.replace",
            Step::DateParse(_) => "date.parse",
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn path_argument(operator: &str, args: &Value) -> Result<String, DefinitionError> {
    match args {
        Value::String(path) => Ok(path.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(DefinitionError::invalid_arguments(
            operator,
            format!("expected a string, got {}", type_name(other)),
        )),
    }
}

fn remapper_map(operator: &str, args: &Value) -> Result<Vec<(String, Remapper)>, DefinitionError> {
    let map = args.as_object().ok_or_else(|| {
        DefinitionError::invalid_arguments(operator, format!("expected an object, got {}", type_name(args)))
    })?;
    map.iter()
        .map(|(key, value)| Remapper::parse(value).map(|remapper| (key.clone(), remapper)))
        .collect()
}

fn remapper_list(operator: &str, args: &Value) -> Result<Vec<Remapper>, DefinitionError> {
    let list = args.as_array().ok_or_else(|| {
        DefinitionError::invalid_arguments(operator, format!("expected a list, got {}", type_name(args)))
    })?;
    list.iter().map(Remapper::parse).collect()
}

fn string_list(operator: &str, args: &Value) -> Result<Vec<String>, DefinitionError> {
    match args {
        Value::String(key) => Ok(vec![key.clone()]),
        Value::Array(keys) => keys
            .iter()
            .map(|key| {
                key.as_str().map(str::to_string).ok_or_else(|| {
                    DefinitionError::invalid_arguments(operator, "expected a list of strings")
                })
            })
            .collect(),
        other => Err(DefinitionError::invalid_arguments(
            operator,
            format!("expected a list of strings, got {}", type_name(other)),
        )),
    }
}

/// Missing branches evaluate to `null`
fn conditional(args: &Value) -> Result<Conditional, DefinitionError> {
    let map = args.as_object().ok_or_else(|| {
        DefinitionError::invalid_arguments("if", format!("expected an object, got {}", type_name(args)))
    })?;
    let branch = |key: &str| match map.get(key) {
        Some(value) => Remapper::parse(value),
        None => Ok(Remapper::Literal(Value::Null)),
    };
    Ok(Conditional {
        condition: branch("condition")?,
        then: branch("then")?,
        otherwise: branch("else")?,
    })
}

fn string_format(args: &Value) -> Result<StringFormat, DefinitionError> {
    let map = args.as_object().ok_or_else(|| {
        DefinitionError::invalid_arguments(
            "string.format",
            format!("expected an object, got {}", type_name(args)),
        )
    })?;
    let text = |key: &str| -> Result<Option<String>, DefinitionError> {
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(DefinitionError::invalid_arguments(
                "string.format",
                format!("{} must be a string, got {}", key, type_name(other)),
            )),
        }
    };
    let values = match map.get("values") {
        None | Some(Value::Null) => Vec::new(),
        Some(values) => remapper_map("string.format", values)?,
    };
    Ok(StringFormat {
        message_id: text("messageId")?,
        template: text("template")?,
        values,
    })
}

fn string_replace(args: &Value) -> Result<StringReplace, DefinitionError> {
    match args.as_object() {
        Some(map) if map.len() == 1 => {
            let (source, replacement) = map.iter().next().ok_or_else(|| {
                DefinitionError::invalid_arguments("string.replace", "expected a single entry")
            })?;
            let replacement = replacement.as_str().ok_or_else(|| {
                DefinitionError::invalid_arguments("string.replace", "replacement must be a string")
            })?;
            StringReplace::new(source, replacement)
        }
        _ => Err(DefinitionError::invalid_arguments(
            "string.replace",
            "expected an object with exactly one pattern",
        )),
    }
}

/// Rewrite a JavaScript replacement string (`$&`, `$1`, `$<name>`, `$$`)
/// into the syntax understood by the regex crate.
///
/// `$nn` refers to group `nn` only when the pattern has that many groups,
/// otherwise to group `n` followed by a literal digit. References to groups
/// that do not exist stay literal.
fn translate_replacement(replacement: &str, groups: usize) -> String {
    let chars: Vec<char> = replacement.chars().collect();
    let mut out = String::with_capacity(replacement.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let digit = |offset: usize| chars.get(i + offset).and_then(|c| c.to_digit(10)).map(|d| d as usize);
        match chars.get(i + 1) {
            Some('$') => {
                out.push_str("$$");
                i += 2;
            }
            Some('&') => {
                out.push_str("${0}");
                i += 2;
            }
            Some(c) if c.is_ascii_digit() => {
                let first = digit(1).unwrap_or(0);
                let two_digit = digit(2).map(|second| first * 10 + second);
                match two_digit {
                    Some(group) if (1..=groups).contains(&group) => {
                        out.push_str(&format!("${{{}}}", group));
                        i += 3;
                    }
                    _ if (1..=groups).contains(&first) => {
                        out.push_str(&format!("${{{}}}", first));
                        i += 2;
                    }
                    _ => {
                        out.push_str("$$");
                        i += 1;
                    }
                }
            }
            Some('<') => match chars[i + 2..].iter().position(|c| *c == '>') {
                Some(end) => {
                    let name: String = chars[i + 2..i + 2 + end].iter().collect();
                    out.push_str(&format!("${{{}}}", name));
                    i += end + 3;
                }
                None => {
                    out.push_str("$$");
                    i += 1;
                }
            },
            _ => {
                out.push_str("$$");
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_are_literals() {
        for value in [json!(null), json!("text"), json!(3), json!(true)] {
            assert!(Remapper::parse(&value).unwrap().is_literal());
        }
    }

    #[test]
    fn test_duplicate_operator() {
        let err = Remapper::parse(&json!([{"prop": "a", "static": "b"}])).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateOperator { found: 2, .. }));

        let err = Remapper::parse(&json!([{}])).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateOperator { found: 0, .. }));
    }

    #[test]
    fn test_unknown_operator() {
        let err = Remapper::parse(&json!([{"array.explode": true}])).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnknownOperator {
                operator: "array.explode".to_string()
            }
        );
    }

    #[test]
    fn test_nested_definitions_are_validated() {
        let definition = json!([{"object.from": {"ok": [{"prop": "a"}], "bad": [{"nope": 1}]}}]);
        assert!(matches!(
            Remapper::parse(&definition),
            Err(DefinitionError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(Remapper::parse(&json!([{"equals": "x"}])).is_err());
        assert!(Remapper::parse(&json!([{"prop": {"a": 1}}])).is_err());
        assert!(Remapper::parse(&json!([{"string.replace": {"a": "b", "c": "d"}}])).is_err());
        assert!(matches!(
            Remapper::parse(&json!([{"string.replace": {"(unclosed": ""}}])),
            Err(DefinitionError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_bare_step_object() {
        match Remapper::parse(&json!({"prop": "name"})).unwrap() {
            Remapper::Steps(steps) => {
                assert_eq!(steps.len(), 1);
                assert_eq!(steps[0].operator_name(), "prop");
            }
            other => panic!("expected steps, got {:?}", other),
        }
    }

    #[test]
    fn test_translate_replacement() {
        assert_eq!(translate_replacement("[$&]", 0), "[${0}]");
        assert_eq!(translate_replacement("$1a", 1), "${1}a");
        assert_eq!(translate_replacement("$<year>-", 1), "${year}-");
        assert_eq!(translate_replacement("cost: $$5", 0), "cost: $$5");
        assert_eq!(translate_replacement("$ alone", 0), "$$ alone");
    }

    #[test]
    fn test_two_digit_group_references() {
        assert_eq!(translate_replacement("$10", 1), "${1}0");
        assert_eq!(translate_replacement("$10", 10), "${10}");
        assert_eq!(translate_replacement("$01", 1), "${1}");
        assert_eq!(translate_replacement("$3", 1), "$$3");
        assert_eq!(translate_replacement("$0", 2), "$$0");

        let replace = StringReplace::new("(a)", "$10").unwrap();
        assert_eq!(replace.pattern.replace_all("banana", replace.replacement.as_str()), "ba0na0na0");
        assert_eq!(replace.replacement(), "$10");
    }
}
