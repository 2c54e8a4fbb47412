//! Encoding: typed value back to an untyped value. Total; no validation.
use serde_json::{Map, Value};

use crate::merge::merge;
use crate::shape::{Shape, ShapeKind};

impl Shape {
    /// Encodes a value that already conforms to this shape.
    ///
    /// Records emit their declared fields only; anything the shape does not
    /// describe passes through unchanged.
    pub fn encode(&self, a: &Value) -> Value {
        encode(self, a)
    }
}

pub fn encode(shape: &Shape, a: &Value) -> Value {
    match (shape.kind(), a) {
        (ShapeKind::LiteralsOr(ls, or), _) => {
            if ls.iter().any(|l| l.matches(a)) { a.clone() } else { or.encode(a) }
        }
        (ShapeKind::Type(fields) | ShapeKind::Partial(fields), Value::Object(obj)) => {
            let mut out = Map::new();
            for (k, field) in fields {
                if let Some(v) = obj.get(k) {
                    out.insert(k.clone(), field.encode(v));
                }
            }
            Value::Object(out)
        }
        (ShapeKind::Array(item), Value::Array(xs)) => Value::Array(xs.iter().map(|x| item.encode(x)).collect()),
        (ShapeKind::Tuple(items), Value::Array(xs)) => {
            Value::Array(items.iter().zip(xs).map(|(s, x)| s.encode(x)).collect())
        }
        (ShapeKind::Record(value), Value::Object(obj)) => {
            Value::Object(obj.iter().map(|(k, v)| (k.clone(), value.encode(v))).collect())
        }
        (ShapeKind::Intersection(members), _) => {
            merge(members.iter().map(|m| (m.clone(), m.encode(a))).collect()).unwrap_or_else(|| a.clone())
        }
        (ShapeKind::Refinement { base, .. } | ShapeKind::WithExpected { base, .. }, _) => base.encode(a),
        (ShapeKind::Sum { tag, members }, Value::Object(obj)) => {
            let Some((k, member)) = obj.get(tag).and_then(Value::as_str).and_then(|k| members.get_key_value(k)) else {
                return a.clone();
            };
            let mut out = member.encode(a);
            // members that do not declare the tag would otherwise drop it
            if let Value::Object(o) = &mut out {
                o.entry(tag.clone()).or_insert_with(|| Value::String(k.clone()));
            }
            out
        }
        (ShapeKind::Lazy(l), _) => l.force().encode(a),
        (ShapeKind::Recur(r), _) => r.get().map_or_else(|| a.clone(), |target| target.encode(a)),
        (ShapeKind::Scope { root, .. }, _) => root.encode(a),
        // primitives, literals and ill-typed input: identity
        _ => a.clone(),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::*;
    use serde_json::json;

    #[test]
    fn records_drop_undeclared_keys() {
        let s = type_([("name", string())]);
        assert_eq!(s.encode(&json!({"name": "a", "extra": 1})), json!({"name": "a"}));
    }

    #[test]
    fn partial_omits_absent_fields() {
        let s = partial([("name", string()), ("age", number())]);
        assert_eq!(s.encode(&json!({"age": 3})), json!({"age": 3}));
    }

    #[test]
    fn containers_encode_children_in_order() {
        let inner = type_([("a", number())]);
        assert_eq!(array(inner.clone()).encode(&json!([{"a": 1, "x": 0}, {"a": 2}])), json!([{"a": 1}, {"a": 2}]));
        assert_eq!(tuple([string(), inner.clone()]).encode(&json!(["s", {"a": 1, "x": 0}])), json!(["s", {"a": 1}]));
        assert_eq!(record(inner).encode(&json!({"k": {"a": 1, "x": 0}})), json!({"k": {"a": 1}}));
    }

    #[test]
    fn intersection_merges_member_encodings() {
        let s = intersection([type_([("a", string())]), type_([("b", number())])]);
        assert_eq!(s.encode(&json!({"a": "x", "b": 1, "c": true})), json!({"a": "x", "b": 1}));
    }

    #[test]
    fn refinement_encodes_like_its_base() {
        let s = refinement(type_([("n", number())]), |_| true, "Anything");
        assert_eq!(s.encode(&json!({"n": 1, "m": 2})), json!({"n": 1}));
    }

    #[test]
    fn sum_keeps_the_discriminant() {
        let s = sum("_tag", [("A", type_([("a", string())])), ("B", type_([("b", number())]))]);
        assert_eq!(s.encode(&json!({"_tag": "A", "a": "x", "z": 0})), json!({"_tag": "A", "a": "x"}));
    }

    #[test]
    fn lazy_encodes_through_the_forced_shape() {
        let rec = recursive("Rec", |rec| type_([("a", number()), ("b", array(rec))]));
        let v = json!({"a": 1, "b": [{"a": 2, "b": [], "x": 0}]});
        assert_eq!(rec.encode(&v), json!({"a": 1, "b": [{"a": 2, "b": []}]}));
    }

    #[test]
    fn intersection_prefers_the_member_that_declares_a_key() {
        let pair = type_([("a", tuple([number()]))]);
        let v = json!({"a": [1, 2]});
        for s in [intersection([unknown_record(), pair.clone()]), intersection([pair, unknown_record()])] {
            assert_eq!(s.encode(&v), json!({"a": [1]}));
        }
    }
}
