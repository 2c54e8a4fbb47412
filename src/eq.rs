//! Structural equality scoped to what a shape declares.
//!
//! Keys a record does not declare are ignored. Two quirks are deliberate:
//! a partial field is compared only when both sides have it, and arrays are
//! compared element-wise up to the shorter length.
use serde_json::Value;

use crate::shape::{Shape, ShapeKind};
use crate::value::numbers_eq;

impl Shape {
    pub fn equals(&self, a: &Value, b: &Value) -> bool {
        equals(self, a, b)
    }
}

pub fn equals(shape: &Shape, a: &Value, b: &Value) -> bool {
    match shape.kind() {
        ShapeKind::Literals(_)
        | ShapeKind::String
        | ShapeKind::Number
        | ShapeKind::Boolean
        | ShapeKind::Int => primitive_eq(a, b),
        ShapeKind::LiteralsOr(ls, or) => {
            match (ls.iter().any(|l| l.matches(a)), ls.iter().any(|l| l.matches(b))) {
                (true, true) => primitive_eq(a, b),
                (false, false) => or.equals(a, b),
                _ => false,
            }
        }
        ShapeKind::UnknownArray => match (a, b) {
            (Value::Array(xs), Value::Array(ys)) => xs.len() == ys.len(),
            _ => false,
        },
        ShapeKind::UnknownRecord => match (a, b) {
            (Value::Object(x), Value::Object(y)) => x.len() == y.len() && x.keys().all(|k| y.contains_key(k)),
            _ => false,
        },
        ShapeKind::Type(fields) => match (a, b) {
            (Value::Object(x), Value::Object(y)) => fields.iter().all(|(k, s)| match (x.get(k), y.get(k)) {
                (Some(xv), Some(yv)) => s.equals(xv, yv),
                (None, None) => true,
                _ => false,
            }),
            _ => false,
        },
        ShapeKind::Partial(fields) => match (a, b) {
            (Value::Object(x), Value::Object(y)) => fields.iter().all(|(k, s)| match (x.get(k), y.get(k)) {
                (Some(xv), Some(yv)) => s.equals(xv, yv),
                // absence on either side matches anything
                _ => true,
            }),
            _ => false,
        },
        ShapeKind::Array(item) => match (a, b) {
            (Value::Array(xs), Value::Array(ys)) => xs.iter().zip(ys).all(|(x, y)| item.equals(x, y)),
            _ => false,
        },
        ShapeKind::Tuple(items) => match (a, b) {
            (Value::Array(xs), Value::Array(ys)) => {
                xs.len() >= items.len()
                    && ys.len() >= items.len()
                    && items.iter().enumerate().all(|(i, s)| s.equals(&xs[i], &ys[i]))
            }
            _ => false,
        },
        ShapeKind::Record(value) => match (a, b) {
            (Value::Object(x), Value::Object(y)) => {
                x.len() == y.len()
                    && x.iter().all(|(k, xv)| y.get(k).is_some_and(|yv| value.equals(xv, yv)))
            }
            _ => false,
        },
        ShapeKind::Intersection(members) => members.iter().all(|m| m.equals(a, b)),
        ShapeKind::Refinement { base, .. } | ShapeKind::WithExpected { base, .. } => base.equals(a, b),
        ShapeKind::Sum { tag, members } => {
            let ka = a.get(tag).and_then(Value::as_str);
            let kb = b.get(tag).and_then(Value::as_str);
            match (ka, kb) {
                (Some(ka), Some(kb)) if ka == kb => members.get(ka).is_some_and(|m| m.equals(a, b)),
                _ => false,
            }
        }
        ShapeKind::Lazy(l) => l.force().equals(a, b),
        ShapeKind::Recur(r) => r.get().is_some_and(|target| target.equals(a, b)),
        ShapeKind::Scope { root, .. } => root.equals(a, b),
    }
}

fn primitive_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        _ => a == b,
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::*;
    use crate::value::Literal;
    use serde_json::json;

    #[test]
    fn literal_sets() {
        let s = literals([Literal::from("a"), Literal::Null]);
        assert!(s.equals(&json!("a"), &json!("a")));
        assert!(s.equals(&Value::Null, &Value::Null));
        assert!(!s.equals(&json!("a"), &Value::Null));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(number().equals(&json!(1), &json!(1.0)));
        assert!(!number().equals(&json!(1), &json!(2)));
    }

    #[test]
    fn unknown_array_compares_length_only() {
        let s = unknown_array();
        assert!(s.equals(&json!(["a"]), &json!(["a"])));
        assert!(s.equals(&json!(["a"]), &json!(["b"])));
        assert!(!s.equals(&json!(["a"]), &json!(["a", "b"])));
    }

    #[test]
    fn unknown_record_compares_keys_only() {
        let s = unknown_record();
        assert!(s.equals(&json!({}), &json!({})));
        assert!(s.equals(&json!({"a": 1}), &json!({"a": 2})));
        assert!(!s.equals(&json!({"a": 1}), &json!({"a": 1, "b": true})));
        assert!(!s.equals(&json!({"a": 1, "b": true}), &json!({"a": 1})));
    }

    #[test]
    fn record_ignores_undeclared_keys() {
        let s = type_([("a", number())]);
        assert!(s.equals(&json!({"a": 1, "x": 1}), &json!({"a": 1, "x": 2})));
        assert!(!s.equals(&json!({"a": 1}), &json!({"a": 2})));
    }

    #[test]
    fn partial_compares_fields_present_on_both_sides() {
        let s = partial([("name", string()), ("age", number())]);
        assert!(s.equals(&json!({"name": "a"}), &json!({"name": "a"})));
        assert!(s.equals(&json!({}), &json!({})));
        assert!(s.equals(&json!({"name": "a", "age": 1}), &json!({"name": "a"})));
        assert!(s.equals(&json!({}), &json!({"age": 1})));
        assert!(!s.equals(&json!({"age": 1}), &json!({"age": 2})));
    }

    #[test]
    fn array_compares_up_to_the_shorter_length() {
        let s = array(number());
        assert!(s.equals(&json!([1, 2]), &json!([1, 2])));
        assert!(!s.equals(&json!([1, 2]), &json!([1, 3])));
        // documented quirk: a prefix equals the longer array
        assert!(s.equals(&json!([1]), &json!([1, 2, 3])));
        assert!(s.equals(&json!([]), &json!([9])));
    }

    #[test]
    fn tuples() {
        let s = tuple([string(), number()]);
        assert!(s.equals(&json!(["a", 1]), &json!(["a", 1])));
        assert!(!s.equals(&json!(["a", 1]), &json!(["b", 1])));
        assert!(!s.equals(&json!(["a", 1]), &json!(["a", 2])));
    }

    #[test]
    fn record_map_requires_same_keys() {
        let s = record(number());
        assert!(s.equals(&json!({"a": 1}), &json!({"a": 1})));
        assert!(!s.equals(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!s.equals(&json!({"a": 1}), &json!({"b": 1})));
    }

    #[test]
    fn intersections() {
        let s = intersection([type_([("a", string())]), type_([("b", number())])]);
        assert!(s.equals(&json!({"a": "a", "b": 1}), &json!({"a": "a", "b": 1})));
        assert!(!s.equals(&json!({"a": "a", "b": 1}), &json!({"a": "c", "b": 1})));
        assert!(!s.equals(&json!({"a": "a", "b": 1}), &json!({"a": "a", "b": 2})));
    }

    #[test]
    fn lazy_recursion() {
        let s = recursive("A", |rec| type_([("a", number()), ("b", array(rec))]));
        assert!(s.equals(&json!({"a": 1, "b": []}), &json!({"a": 1, "b": []})));
        assert!(s.equals(&json!({"a": 1, "b": [{"a": 2, "b": []}]}), &json!({"a": 1, "b": [{"a": 2, "b": []}]})));
        assert!(!s.equals(&json!({"a": 1, "b": []}), &json!({"a": 2, "b": []})));
        assert!(!s.equals(&json!({"a": 1, "b": [{"a": 2, "b": []}]}), &json!({"a": 1, "b": [{"a": 3, "b": []}]})));
    }

    #[test]
    fn sums() {
        let s = sum("_tag", [
            ("A", type_([("_tag", literal("A")), ("a", string())])),
            ("B", type_([("_tag", literal("B")), ("b", number())])),
        ]);
        assert!(s.equals(&json!({"_tag": "A", "a": "a"}), &json!({"_tag": "A", "a": "a"})));
        assert!(s.equals(&json!({"_tag": "B", "b": 1}), &json!({"_tag": "B", "b": 1})));
        assert!(!s.equals(&json!({"_tag": "A", "a": "a"}), &json!({"_tag": "B", "b": 1})));
        assert!(!s.equals(&json!({"_tag": "A", "a": "a"}), &json!({"_tag": "A", "a": "b"})));
        assert!(!s.equals(&json!({"_tag": "B", "b": 1}), &json!({"_tag": "B", "b": 2})));
    }
}
