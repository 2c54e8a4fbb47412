//! Decoding: untyped value in, checked value or a full error tree out.
//!
//! Containers never stop at the first bad child. Every field, element and
//! intersection member is visited and all failures are reported together.
use log::trace;
use serde_json::{Map, Value};

use crate::error::{DecodeError, DecodeErrors, Location};
use crate::merge::merge;
use crate::shape::{literals_label, Shape, ShapeKind};
use crate::value::is_integral;

pub type Decoded = Result<Value, DecodeErrors>;

impl Shape {
    /// Validates `u` against this shape.
    ///
    /// On success the returned value is the normalized typed value: records
    /// keep unknown keys, tuples keep only their declared positions.
    pub fn decode(&self, u: &Value) -> Decoded {
        decode(self, u)
    }
}

pub fn decode(shape: &Shape, u: &Value) -> Decoded {
    match shape.kind() {
        ShapeKind::Literals(ls) => {
            if ls.iter().any(|l| l.matches(u)) {
                Ok(u.clone())
            } else {
                Err(DecodeErrors::leaf(u, shape.expected()))
            }
        }
        ShapeKind::LiteralsOr(ls, or) => {
            if ls.iter().any(|l| l.matches(u)) {
                return Ok(u.clone());
            }
            or.decode(u).map_err(|or_errors| {
                DecodeErrors::cons(
                    DecodeError::at(Location::Member(0), DecodeErrors::leaf(u, literals_label(ls))),
                    [DecodeError::at(Location::Member(1), or_errors)],
                )
            })
        }
        ShapeKind::String => primitive(u, u.is_string(), "string"),
        ShapeKind::Number => primitive(u, u.is_number(), "number"),
        ShapeKind::Boolean => primitive(u, u.is_boolean(), "boolean"),
        ShapeKind::Int => primitive(u, u.as_number().is_some_and(is_integral), "Int"),
        ShapeKind::UnknownArray => primitive(u, u.is_array(), "Array<unknown>"),
        ShapeKind::UnknownRecord => primitive(u, u.is_object(), "Record<string, unknown>"),
        ShapeKind::Type(fields) => {
            let Value::Object(obj) = u else {
                return Err(DecodeErrors::leaf(u, shape.expected()));
            };
            let mut out = obj.clone();
            let mut errors = Vec::new();
            for (k, field) in fields {
                match obj.get(k) {
                    None => errors.push(DecodeError::at(
                        Location::Key(k.clone()),
                        DecodeErrors::one(DecodeError::missing(field.expected())),
                    )),
                    Some(v) => match field.decode(v) {
                        Ok(a) => { out.insert(k.clone(), a); }
                        Err(e) => errors.push(DecodeError::at(Location::Key(k.clone()), e)),
                    },
                }
            }
            finish(Value::Object(out), errors)
        }
        ShapeKind::Partial(fields) => {
            let Value::Object(obj) = u else {
                return Err(DecodeErrors::leaf(u, shape.expected()));
            };
            let mut out = obj.clone();
            let mut errors = Vec::new();
            for (k, field) in fields {
                let Some(v) = obj.get(k) else { continue };
                match field.decode(v) {
                    Ok(a) => { out.insert(k.clone(), a); }
                    Err(e) => errors.push(DecodeError::at(Location::Key(k.clone()), e)),
                }
            }
            finish(Value::Object(out), errors)
        }
        ShapeKind::Array(item) => {
            let Value::Array(xs) = u else {
                return Err(DecodeErrors::leaf(u, shape.expected()));
            };
            let mut out = Vec::with_capacity(xs.len());
            let mut errors = Vec::new();
            for (i, x) in xs.iter().enumerate() {
                match item.decode(x) {
                    Ok(a) => out.push(a),
                    Err(e) => errors.push(DecodeError::at(Location::Index(i), e)),
                }
            }
            finish(Value::Array(out), errors)
        }
        ShapeKind::Tuple(items) => {
            let xs = match u {
                Value::Array(xs) if xs.len() >= items.len() => xs,
                _ => return Err(DecodeErrors::leaf(u, shape.expected())),
            };
            let mut out = Vec::with_capacity(items.len());
            let mut errors = Vec::new();
            for (i, (item, x)) in items.iter().zip(xs).enumerate() {
                match item.decode(x) {
                    Ok(a) => out.push(a),
                    Err(e) => errors.push(DecodeError::at(Location::Index(i), e)),
                }
            }
            finish(Value::Array(out), errors)
        }
        ShapeKind::Record(value) => {
            let Value::Object(obj) = u else {
                return Err(DecodeErrors::leaf(u, shape.expected()));
            };
            let mut out = Map::new();
            let mut errors = Vec::new();
            for (k, v) in obj {
                match value.decode(v) {
                    Ok(a) => { out.insert(k.clone(), a); }
                    Err(e) => errors.push(DecodeError::at(Location::Key(k.clone()), e)),
                }
            }
            finish(Value::Object(out), errors)
        }
        ShapeKind::Intersection(members) => {
            let mut parts = Vec::with_capacity(members.len());
            let mut errors = Vec::new();
            for (i, member) in members.iter().enumerate() {
                match member.decode(u) {
                    Ok(a) => parts.push((member.clone(), a)),
                    Err(e) => errors.push(DecodeError::at(Location::Member(i), e)),
                }
            }
            if !errors.is_empty() {
                return finish(Value::Null, errors);
            }
            // an empty intersection constrains nothing
            Ok(merge(parts).unwrap_or_else(|| u.clone()))
        }
        ShapeKind::Refinement { base, predicate, expected } => {
            let a = base.decode(u)?;
            if predicate(&a) {
                Ok(a)
            } else {
                Err(DecodeErrors::leaf(&a, expected.clone()))
            }
        }
        ShapeKind::Sum { tag, members } => {
            let Value::Object(obj) = u else {
                return Err(DecodeErrors::leaf(u, shape.expected()));
            };
            let found = obj.get(tag);
            match found.and_then(Value::as_str).and_then(|k| members.get_key_value(k)) {
                Some((k, member)) => {
                    trace!("sum `{tag}` dispatching to member `{k}`");
                    member.decode(u)
                }
                None => {
                    let leaf = match found {
                        Some(v) => DecodeError::leaf(v, tags_label(members.keys())),
                        None => DecodeError::missing(tags_label(members.keys())),
                    };
                    Err(DecodeErrors::one(DecodeError::at(Location::Key(tag.clone()), DecodeErrors::one(leaf))))
                }
            }
        }
        ShapeKind::Lazy(l) => l.force().decode(u),
        ShapeKind::Recur(r) => match r.get() {
            Some(target) => target.decode(u),
            None => Err(DecodeErrors::leaf(u, r.id())),
        },
        ShapeKind::Scope { root, .. } => root.decode(u),
        ShapeKind::WithExpected { base, expected } => base.decode(u).map_err(|e| e.with_expected(expected)),
    }
}

/// `"A" | "B"` for the discriminant values of a sum.
pub(crate) fn tags_label<'a>(keys: impl Iterator<Item = &'a String>) -> String {
    keys.map(|k| Value::String(k.clone()).to_string()).collect::<Vec<_>>().join(" | ")
}

fn primitive(u: &Value, ok: bool, expected: &str) -> Decoded {
    if ok { Ok(u.clone()) } else { Err(DecodeErrors::leaf(u, expected)) }
}

fn finish(out: Value, errors: Vec<DecodeError>) -> Decoded {
    match DecodeErrors::from_vec(errors) {
        None => Ok(out),
        Some(e) => Err(e),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::*;
    use crate::value::Literal;
    use serde_json::json;

    fn person() -> Shape {
        type_([("name", string()), ("age", number())])
    }

    #[test]
    fn literals_accept_members_only() {
        let s = literals([Literal::from("a"), Literal::Null]);
        assert_eq!(s.decode(&json!("a")), Ok(json!("a")));
        assert_eq!(s.decode(&Value::Null), Ok(Value::Null));
        let e = s.decode(&json!("b")).unwrap_err();
        let leaves = e.leaves();
        assert_eq!(leaves[0].expected, "\"a\" | null");
        assert_eq!(leaves[0].actual, Some(&json!("b")));
    }

    #[test]
    fn empty_literal_set_accepts_nothing() {
        let never = literals(Vec::<Literal>::new());
        assert!(never.decode(&json!(null)).is_err());
    }

    #[test]
    fn literals_or_reports_both_members() {
        let s = literals_or([Literal::Null], type_([("a", string())]));
        assert!(s.decode(&Value::Null).is_ok());
        assert!(s.decode(&json!({"a": "x"})).is_ok());
        let e = s.decode(&json!({"a": 1})).unwrap_err();
        assert_eq!(e.len(), 2);
        let leaves = e.leaves();
        assert_eq!(leaves[0].expected, "null");
        assert_eq!(leaves[1].path.to_string(), "a");
    }

    #[test]
    fn record_keeps_extra_keys() {
        let v = json!({"name": "a", "age": 1, "extra": true});
        assert_eq!(person().decode(&v), Ok(v.clone()));
    }

    #[test]
    fn record_reports_every_failing_field() {
        let e = person().decode(&json!({"name": 1})).unwrap_err();
        let leaves = e.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].path.to_string(), "name");
        assert_eq!(leaves[1].path.to_string(), "age");
        assert_eq!(leaves[1].actual, None);
    }

    #[test]
    fn record_rejects_non_objects_with_one_leaf() {
        let e = person().decode(&json!([1])).unwrap_err();
        assert_eq!(e.len(), 1);
        assert_eq!(e.leaves()[0].expected, "{ name: string, age: number }");
    }

    #[test]
    fn partial_skips_absent_keys_only() {
        let s = partial([("name", string()), ("age", number())]);
        assert_eq!(s.decode(&json!({})), Ok(json!({})));
        assert_eq!(s.decode(&json!({"age": 2})), Ok(json!({"age": 2})));
        // null is a present value, not absence
        assert!(s.decode(&json!({"age": null})).is_err());
    }

    #[test]
    fn array_visits_every_element() {
        let e = array(number()).decode(&json!([1, "a", 2, false])).unwrap_err();
        let paths: Vec<String> = e.leaves().iter().map(|l| l.path.to_string()).collect();
        assert_eq!(paths, vec!["[1]", "[3]"]);
    }

    #[test]
    fn tuple_ignores_trailing_elements() {
        let s = tuple([string(), number()]);
        assert_eq!(s.decode(&json!(["a", 1, "extra"])), Ok(json!(["a", 1])));
        assert!(s.decode(&json!(["a"])).is_err());
        let e = s.decode(&json!([1, 1])).unwrap_err();
        assert_eq!(e.leaves()[0].path.to_string(), "[0]");
    }

    #[test]
    fn record_map_locates_bad_values_by_key() {
        let s = record(number());
        assert_eq!(s.decode(&json!({"x": 1, "y": 2})), Ok(json!({"x": 1, "y": 2})));
        let e = s.decode(&json!({"x": 1, "y": "2"})).unwrap_err();
        assert_eq!(e.leaves()[0].path.to_string(), "y");
    }

    #[test]
    fn intersection_merges_and_groups_member_failures() {
        let s = intersection([type_([("a", string())]), type_([("b", number())])]);
        assert_eq!(s.decode(&json!({"a": "x", "b": 1})), Ok(json!({"a": "x", "b": 1})));
        let e = s.decode(&json!({"a": "x"})).unwrap_err();
        assert_eq!(e.len(), 1);
        let Some(DecodeError::Branch { at, .. }) = e.iter().next() else { panic!("expected branch") };
        assert_eq!(at, &Location::Member(1));
        assert_eq!(e.leaves()[0].path.to_string(), "b");
    }

    #[test]
    fn intersection_result_does_not_depend_on_member_order() {
        let single = refinement(tuple([number()]), |v| v.as_array().is_some_and(|xs| xs.len() == 1), "Single");
        let a = type_([("a", single)]);
        let b = type_([("b", number())]);
        let u = json!({"a": [1, 2], "b": 1});
        for s in [intersection([a.clone(), b.clone()]), intersection([b, a])] {
            assert_eq!(s.decode(&u), Ok(json!({"a": [1], "b": 1})));
        }
    }

    #[test]
    fn intersection_merges_nested_declared_fields() {
        let s = intersection([
            type_([("n", literals_or([Literal::from(0)], number()))]),
            type_([("n", number()), ("o", type_([("x", number())]))]),
            type_([("o", type_([("y", tuple([string()]))]))]),
        ]);
        let u = json!({"n": 0, "o": {"x": 1, "y": ["s", "t"]}, "extra": true});
        assert_eq!(s.decode(&u), Ok(json!({"n": 0, "o": {"x": 1, "y": ["s"]}, "extra": true})));
    }

    #[test]
    fn intersection_tie_break_keeps_the_earliest_member() {
        let one = type_([("a", tuple([number()]))]);
        let two = type_([("a", tuple([number(), number()]))]);
        let u = json!({"a": [1, 2, 3]});
        assert_eq!(intersection([one.clone(), two.clone()]).decode(&u), Ok(json!({"a": [1]})));
        assert_eq!(intersection([two, one]).decode(&u), Ok(json!({"a": [1, 2]})));
    }

    #[test]
    fn refinement_reports_decoded_value_and_label() {
        let positive = refinement(number(), |v| v.as_f64().is_some_and(|n| n > 0.0), "PositiveNumber");
        assert_eq!(positive.decode(&json!(5)), Ok(json!(5)));
        let e = positive.decode(&json!(-5)).unwrap_err();
        assert_eq!(e.leaves()[0].expected, "PositiveNumber");
        assert_eq!(e.leaves()[0].actual, Some(&json!(-5)));
        // base failures propagate unchanged
        assert_eq!(positive.decode(&json!("5")).unwrap_err().leaves()[0].expected, "number");
    }

    #[test]
    fn sum_dispatches_on_tag() {
        let s = sum("_tag", [
            ("A", type_([("_tag", literal("A")), ("a", string())])),
            ("B", type_([("_tag", literal("B")), ("b", number())])),
        ]);
        assert!(s.decode(&json!({"_tag": "A", "a": "x"})).is_ok());
        // the matched member alone decides
        let e = s.decode(&json!({"_tag": "B", "a": "x"})).unwrap_err();
        assert_eq!(e.leaves()[0].path.to_string(), "b");

        let e = s.decode(&json!({"_tag": "C"})).unwrap_err();
        let leaves = e.leaves();
        assert_eq!(leaves[0].path.to_string(), "_tag");
        assert_eq!(leaves[0].expected, "\"A\" | \"B\"");
        assert_eq!(leaves[0].actual, Some(&json!("C")));

        let e = s.decode(&json!({"a": "x"})).unwrap_err();
        assert_eq!(e.leaves()[0].actual, None);
    }

    #[test]
    fn lazy_recursion_locates_deep_errors() {
        let rec = recursive("Rec", |rec| type_([("a", number()), ("b", array(rec))]));
        assert!(rec.decode(&json!({"a": 1, "b": [{"a": 2, "b": []}]})).is_ok());
        let e = rec.decode(&json!({"a": 1, "b": [{"a": "x", "b": []}]})).unwrap_err();
        assert_eq!(e.leaves()[0].path.to_string(), "b[0].a");
    }

    #[test]
    fn with_expected_relabels_leaf_failures() {
        let s = with_expected(string(), "Name");
        assert_eq!(s.decode(&json!("x")), Ok(json!("x")));
        assert_eq!(s.decode(&json!(1)).unwrap_err().leaves()[0].expected, "Name");
    }

    #[test]
    fn int_rejects_fractions() {
        assert!(int().decode(&json!(3)).is_ok());
        assert!(int().decode(&json!(3.5)).is_err());
    }
}
