//! Structural equality over JSON values

use serde_json::{Number, Value};

/// Compare two JSON values structurally.
///
/// Objects match when they have the same key set and equal values, regardless
/// of key order. Arrays match element by element. Numbers compare by numeric
/// value, so `1` equals `1.0`.
pub fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).map(|r| equal(l, r)).unwrap_or(false))
        }
        _ => false,
    }
}

/// Returns true when every value equals the first one. Empty and singleton
/// slices are vacuously equal.
pub fn all_equal(values: &[Value]) -> bool {
    match values.split_first() {
        Some((first, rest)) => rest.iter().all(|value| equal(first, value)),
        None => true,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(l), Some(r)) = (x.as_i64(), y.as_i64()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (x.as_u64(), y.as_u64()) {
        return l == r;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_key_order_is_ignored() {
        let a = json!({"x": 1, "y": [1, 2, {"z": null}]});
        let b = json!({"y": [1, 2, {"z": null}], "x": 1});
        assert!(equal(&a, &b));
    }

    #[test]
    fn test_different_shapes() {
        assert!(!equal(&json!({"x": 1}), &json!({"x": 1, "y": 2})));
        assert!(!equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!equal(&json!("1"), &json!(1)));
        assert!(!equal(&json!(null), &json!(false)));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(equal(&json!(1), &json!(1.0)));
        assert!(!equal(&json!(1), &json!(1.5)));
        assert!(equal(&json!(-3), &json!(-3)));
    }

    #[test]
    fn test_all_equal() {
        assert!(all_equal(&[]));
        assert!(all_equal(&[json!(1)]));
        assert!(all_equal(&[json!("a"), json!("a"), json!("a")]));
        assert!(!all_equal(&[json!("a"), json!("a"), json!("b")]));
    }
}
