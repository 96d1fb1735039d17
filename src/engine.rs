//! Remapper evaluation
//!
//! A remapper is folded left to right: each step receives the output of the
//! previous one. Steps that carry sub-remappers (`object.from`, `array.map`,
//! `if`, `equals`, ...) evaluate them recursively against the accumulator
//! they received, never against partially built output.

use crate::context::RemapperContext;
use crate::date::{date_to_value, parse_formatted, parse_iso};
use crate::definition::{ArrayProperty, Conditional, Remapper, Step, StringCase, StringFormat};
use crate::equal::all_equal;
use crate::error::RemapError;
use crate::traits::MessageDescriptor;
use crate::value::{is_truthy, to_array, to_js_string, walk_path};
use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Parse `definition` and evaluate it against `input`.
///
/// Callers evaluating the same definition repeatedly should parse it once
/// with [`Remapper::parse`] (or a [`crate::RemapperCache`]) and call
/// [`Remapper::remap`].
pub fn remap(definition: &Value, input: &Value, context: &RemapperContext) -> Result<Value, RemapError> {
    Remapper::parse(definition)?.remap(input, context)
}

/// Position within the enclosing `array.map`
#[derive(Debug, Clone, Copy)]
struct ArrayPosition {
    index: usize,
    length: usize,
}

/// Per-evaluation state passed down the recursion
#[derive(Debug, Clone, Copy)]
struct Scope<'a> {
    context: &'a RemapperContext,
    root: &'a Value,
    depth: usize,
    array: Option<ArrayPosition>,
}

impl<'a> Scope<'a> {
    fn nested(&self) -> Result<Self, RemapError> {
        let depth = self.depth + 1;
        if depth > self.context.max_depth() {
            return Err(RemapError::DepthExceeded {
                max_depth: self.context.max_depth(),
            });
        }
        Ok(Self { depth, ..*self })
    }

    fn in_array(&self, index: usize, length: usize) -> Self {
        Self {
            array: Some(ArrayPosition { index, length }),
            ..*self
        }
    }
}

impl Remapper {
    /// Evaluate this remapper against `input`
    pub fn remap(&self, input: &Value, context: &RemapperContext) -> Result<Value, RemapError> {
        let scope = Scope {
            context,
            root: input,
            depth: 0,
            array: None,
        };
        self.evaluate(input, &scope)
    }

    /// Evaluate this remapper against many inputs in parallel.
    ///
    /// Results keep the order of `inputs`. The first error aborts the batch.
    pub fn remap_many(&self, inputs: &[Value], context: &RemapperContext) -> Result<Vec<Value>, RemapError> {
        inputs
            .par_iter()
            .map(|input| self.remap(input, context))
            .collect()
    }

    fn evaluate(&self, input: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
        let steps = match self {
            Remapper::Literal(value) => return Ok(value.clone()),
            Remapper::Steps(steps) => steps,
        };
        let scope = scope.nested()?;

        let mut steps = steps.iter();
        let Some(first) = steps.next() else {
            return Ok(input.clone());
        };
        let mut acc = first.apply(input, &scope)?;
        for step in steps {
            acc = step.apply(&acc, &scope)?;
        }
        Ok(acc)
    }
}

impl Step {
    fn apply(&self, acc: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
        trace!(operator = self.operator_name(), depth = scope.depth, "applying remapper step");

        let result = match self {
            Step::Static(value) => value.clone(),
            Step::Prop(path) => walk_path(acc, path),
            Step::Context(path) => walk_path(scope.context.variables(), path),
            Step::User(key) => scope
                .context
                .user_info()
                .and_then(|user| user.get(key))
                .cloned()
                .unwrap_or(Value::Null),
            Step::Root => scope.root.clone(),
            Step::Array(property) => match (scope.array, property) {
                (Some(position), ArrayProperty::Index) => Value::from(position.index),
                (Some(position), ArrayProperty::Length) => Value::from(position.length),
                (None, _) => Value::Null,
            },
            Step::ObjectFrom(entries) => Value::Object(build_object(Map::new(), entries, acc, scope)?),
            Step::ObjectAssign(entries) => {
                let base = acc.as_object().cloned().unwrap_or_default();
                Value::Object(build_object(base, entries, acc, scope)?)
            }
            Step::ObjectOmit(keys) => match acc {
                Value::Object(map) => Value::Object(
                    map.iter()
                        .filter(|(key, _)| !keys.contains(key))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                ),
                other => other.clone(),
            },
            Step::ArrayMap(remappers) => {
                let items = to_array(acc);
                let length = items.len();
                let mut mapped = Vec::with_capacity(length * remappers.len());
                for (index, item) in items.iter().enumerate() {
                    let element_scope = scope.in_array(index, length);
                    for remapper in remappers {
                        mapped.push(remapper.evaluate(item, &element_scope)?);
                    }
                }
                Value::Array(mapped)
            }
            Step::If(conditional) => evaluate_conditional(conditional, acc, scope)?,
            Step::Equals(remappers) => {
                if remappers.len() <= 1 {
                    Value::Bool(true)
                } else {
                    Value::Bool(all_equal(&evaluate_all(remappers, acc, scope)?))
                }
            }
            Step::Not(remappers) => match remappers.as_slice() {
                [] => Value::Bool(false),
                [single] => Value::Bool(!is_truthy(&single.evaluate(acc, scope)?)),
                _ => Value::Bool(!all_equal(&evaluate_all(remappers, acc, scope)?)),
            },
            Step::StringCase(case) => match case {
                StringCase::Upper => Value::String(to_js_string(acc).to_uppercase()),
                StringCase::Lower => Value::String(to_js_string(acc).to_lowercase()),
                StringCase::Unchanged(_) => acc.clone(),
            },
            Step::StringFormat(format) => format_message(format, acc, scope)?,
            Step::StringReplace(replace) => Value::String(
                replace
                    .pattern
                    .replace_all(&to_js_string(acc), replace.replacement.as_str())
                    .into_owned(),
            ),
            Step::DateParse(Some(format)) => {
                date_to_value(parse_formatted(&to_js_string(acc), format, scope.context.now()))
            }
            Step::DateParse(None) => date_to_value(acc.as_str().and_then(parse_iso)),
        };

        Ok(result)
    }
}

fn build_object(
    mut base: Map<String, Value>,
    entries: &[(String, Remapper)],
    acc: &Value,
    scope: &Scope<'_>,
) -> Result<Map<String, Value>, RemapError> {
    for (key, remapper) in entries {
        base.insert(key.clone(), remapper.evaluate(acc, scope)?);
    }
    Ok(base)
}

fn evaluate_all(remappers: &[Remapper], acc: &Value, scope: &Scope<'_>) -> Result<Vec<Value>, RemapError> {
    remappers
        .iter()
        .map(|remapper| remapper.evaluate(acc, scope))
        .collect()
}

fn evaluate_conditional(conditional: &Conditional, acc: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let condition = conditional.condition.evaluate(acc, scope)?;
    if is_truthy(&condition) {
        conditional.then.evaluate(acc, scope)
    } else {
        conditional.otherwise.evaluate(acc, scope)
    }
}

/// Format failures never escape: they degrade to `{messageId}` or the error text.
fn format_message(format: &StringFormat, acc: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let mut values = Map::new();
    for (key, remapper) in &format.values {
        values.insert(key.clone(), remapper.evaluate(acc, scope)?);
    }

    let descriptor = MessageDescriptor::new(format.message_id.clone(), format.template.clone());
    let formatted = scope
        .context
        .get_message(&descriptor)
        .and_then(|message| message.format(&values));

    Ok(Value::String(match formatted {
        Ok(text) => text,
        Err(err) => {
            debug!(message_id = ?format.message_id, error = %err, "string.format fell back");
            match &format.message_id {
                Some(id) => format!("{{{}}}", id),
                None => err.to_string(),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn context() -> RemapperContext {
        RemapperContext::builder()
            .with_now(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .build()
    }

    fn run(definition: Value, input: Value) -> Value {
        remap(&definition, &input, &context()).unwrap()
    }

    #[test]
    fn test_literal_ignores_input() {
        assert_eq!(run(json!("fixed"), json!({"a": 1})), json!("fixed"));
        assert_eq!(run(json!(null), json!({"a": 1})), json!(null));
        assert_eq!(run(json!(42), json!("x")), json!(42));
    }

    #[test]
    fn test_empty_step_list_returns_input() {
        assert_eq!(run(json!([]), json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_prop_chain() {
        assert_eq!(run(json!([{"prop": "a.b"}]), json!({"a": {"b": 5}})), json!(5));
        assert_eq!(run(json!([{"prop": "a.b"}]), json!({"a": {}})), json!(null));
        assert_eq!(run(json!([{"prop": "a"}, {"prop": "b"}]), json!({"a": {"b": "x"}})), json!("x"));
    }

    #[test]
    fn test_object_from_uses_pre_operator_input() {
        let definition = json!([{"object.from": {
            "first": [{"prop": "name"}],
            "second": [{"prop": "name"}, {"string.case": "upper"}]
        }}]);
        assert_eq!(
            run(definition, json!({"name": "gary"})),
            json!({"first": "gary", "second": "GARY"})
        );
    }

    #[test]
    fn test_array_map_flattens_per_element() {
        let definition = json!([{"array.map": [{"static": "a"}, {"static": "b"}]}]);
        assert_eq!(run(definition, json!([1, 2])), json!(["a", "b", "a", "b"]));
    }

    #[test]
    fn test_array_map_wraps_non_arrays() {
        let definition = json!([{"array.map": [[{"prop": "id"}]]}]);
        assert_eq!(run(definition, json!({"id": 3})), json!([3]));
    }

    #[test]
    fn test_array_index_and_length() {
        let definition = json!([{"array.map": [{"object.from": {
            "index": [{"array": "index"}],
            "length": [{"array": "length"}]
        }}]}]);
        assert_eq!(
            run(definition, json!(["x", "y"])),
            json!([{"index": 0, "length": 2}, {"index": 1, "length": 2}])
        );
        assert_eq!(run(json!([{"array": "index"}]), json!(null)), json!(null));
    }

    #[test]
    fn test_if_only_evaluates_selected_branch() {
        let definition = json!([{"if": {
            "condition": [{"prop": "ok"}],
            "then": [{"static": "yes"}],
            "else": [{"static": "no"}]
        }}]);
        assert_eq!(run(definition.clone(), json!({"ok": true})), json!("yes"));
        assert_eq!(run(definition, json!({"ok": 0})), json!("no"));

        // the unselected branch would exceed the depth limit if it were evaluated
        let mut deep = json!([{"static": 1}]);
        for _ in 0..10 {
            deep = json!([{"if": {"condition": true, "then": deep.clone()}}]);
        }
        let shallow_context = RemapperContext::builder().with_max_depth(4).build();
        let guarded = json!([{"if": {"condition": false, "then": deep, "else": "safe"}}]);
        assert_eq!(remap(&guarded, &json!(null), &shallow_context).unwrap(), json!("safe"));
    }

    #[test]
    fn test_equals_and_not() {
        assert_eq!(run(json!([{"equals": []}]), json!(null)), json!(true));
        assert_eq!(run(json!([{"equals": [{"static": 1}]}]), json!(null)), json!(true));
        assert_eq!(
            run(json!([{"equals": [[{"prop": "a"}], [{"prop": "b"}]]}]), json!({"a": {"x": 1}, "b": {"x": 1}})),
            json!(true)
        );
        assert_eq!(
            run(json!([{"equals": [[{"prop": "a"}], [{"prop": "b"}]]}]), json!({"a": 1, "b": 2})),
            json!(false)
        );
        assert_eq!(run(json!([{"not": [[{"prop": "a"}], [{"prop": "b"}]]}]), json!({"a": 1, "b": 2})), json!(true));
        assert_eq!(run(json!([{"not": [{"prop": "flag"}]}]), json!({"flag": true})), json!(false));
        assert_eq!(run(json!([{"not": []}]), json!(null)), json!(false));
    }

    #[test]
    fn test_user_and_context() {
        let context = RemapperContext::builder()
            .with_user_info(json!({"name": "Squidward", "email": "sq@example.com"}))
            .with_context("page", json!({"title": "Home"}))
            .build();
        assert_eq!(
            remap(&json!([{"user": "name"}]), &json!(null), &context).unwrap(),
            json!("Squidward")
        );
        assert_eq!(
            remap(&json!([{"context": "page.title"}]), &json!(null), &context).unwrap(),
            json!("Home")
        );
        assert_eq!(remap(&json!([{"user": "name"}]), &json!(null), &RemapperContext::default()).unwrap(), json!(null));
    }

    #[test]
    fn test_string_case() {
        assert_eq!(run(json!([{"string.case": "upper"}]), json!("abc")), json!("ABC"));
        assert_eq!(run(json!([{"string.case": "lower"}]), json!("ABC")), json!("abc"));
        assert_eq!(run(json!([{"string.case": "title"}]), json!({"a": 1})), json!({"a": 1}));
        assert_eq!(run(json!([{"string.case": "upper"}]), json!(null)), json!("NULL"));
    }

    #[test]
    fn test_string_replace_is_global_and_multiline() {
        let definition = json!([{"string.replace": {"^-\\s*": "* "}}]);
        assert_eq!(run(definition, json!("- one\n- two")), json!("* one\n* two"));
        let definition = json!([{"string.replace": {"(\\d+)": "<$1>"}}]);
        assert_eq!(run(definition, json!(42)), json!("<42>"));
    }

    #[test]
    fn test_string_format_fallbacks() {
        let missing = json!([{"string.format": {"template": "Hi {name}"}}]);
        let output = run(missing, json!(null));
        assert!(output.as_str().unwrap().contains("name"));

        let with_id = json!([{"string.format": {"messageId": "greeting", "template": "Hi {name}"}}]);
        assert_eq!(run(with_id, json!(null)), json!("{greeting}"));

        let ok = json!([{"string.format": {"template": "Hi {name}", "values": {"name": [{"prop": "n"}]}}}]);
        assert_eq!(run(ok, json!({"n": "Pearl"})), json!("Hi Pearl"));
    }

    #[test]
    fn test_date_parse() {
        let definition = json!([{"date.parse": "yyyy-MM-dd"}]);
        assert_eq!(run(definition, json!("2020-05-17")), json!("2020-05-17T00:00:00.000Z"));
        assert_eq!(run(json!([{"date.parse": null}]), json!("2020-05-17T10:00:00Z")), json!("2020-05-17T10:00:00.000Z"));
        assert_eq!(run(json!([{"date.parse": "yyyy"}]), json!("garbage")), json!(null));
        assert_eq!(run(json!([{"date.parse": null}]), json!(12)), json!(null));
    }

    #[test]
    fn test_root_object_assign_and_omit() {
        let definition = json!([
            {"prop": "item"},
            {"object.assign": {"owner": [{"root": null}, {"prop": "owner"}]}},
            {"object.omit": ["secret"]}
        ]);
        let input = json!({"owner": "Plankton", "item": {"name": "formula", "secret": "x"}});
        assert_eq!(run(definition, input), json!({"name": "formula", "owner": "Plankton"}));
    }

    #[test]
    fn test_depth_limit() {
        let mut definition = json!([{"static": 1}]);
        for _ in 0..10 {
            definition = json!([{"object.from": {"nested": definition}}]);
        }
        let context = RemapperContext::builder().with_max_depth(5).build();
        let err = remap(&definition, &json!(null), &context).unwrap_err();
        assert!(matches!(err, RemapError::DepthExceeded { max_depth: 5 }));
    }

    #[test]
    fn test_remap_many_keeps_order() {
        let remapper = Remapper::parse(&json!([{"prop": "n"}])).unwrap();
        let inputs: Vec<Value> = (0..50).map(|n| json!({"n": n})).collect();
        let outputs = remapper.remap_many(&inputs, &context()).unwrap();
        assert_eq!(outputs, (0..50).map(Value::from).collect::<Vec<_>>());
    }
}
