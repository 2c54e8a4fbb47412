//! Guard: a boolean membership test over untyped values.
//!
//! Accepts exactly what [`crate::decode`] accepts, without building error
//! trees. Values are only rebuilt under a refinement, and only where decoding
//! would change them.
use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::merge::merge;
use crate::shape::{Shape, ShapeKind};
use crate::value::is_integral;

impl Shape {
    /// `true` iff [`Shape::decode`] would succeed on `u`.
    pub fn is(&self, u: &Value) -> bool {
        is(self, u)
    }
}

pub fn is(shape: &Shape, u: &Value) -> bool {
    match shape.kind() {
        ShapeKind::Literals(ls) => ls.iter().any(|l| l.matches(u)),
        ShapeKind::LiteralsOr(ls, or) => ls.iter().any(|l| l.matches(u)) || or.is(u),
        ShapeKind::String => u.is_string(),
        ShapeKind::Number => u.is_number(),
        ShapeKind::Boolean => u.is_boolean(),
        ShapeKind::Int => u.as_number().is_some_and(is_integral),
        ShapeKind::UnknownArray => u.is_array(),
        ShapeKind::UnknownRecord => u.is_object(),
        ShapeKind::Type(fields) => match u {
            Value::Object(obj) => fields.iter().all(|(k, s)| obj.get(k).is_some_and(|v| s.is(v))),
            _ => false,
        },
        ShapeKind::Partial(fields) => match u {
            Value::Object(obj) => fields.iter().all(|(k, s)| obj.get(k).is_none_or(|v| s.is(v))),
            _ => false,
        },
        ShapeKind::Array(item) => match u {
            Value::Array(xs) => xs.iter().all(|x| item.is(x)),
            _ => false,
        },
        ShapeKind::Tuple(items) => match u {
            Value::Array(xs) => xs.len() >= items.len() && items.iter().zip(xs).all(|(s, x)| s.is(x)),
            _ => false,
        },
        ShapeKind::Record(value) => match u {
            Value::Object(obj) => obj.values().all(|v| value.is(v)),
            _ => false,
        },
        ShapeKind::Intersection(members) => members.iter().all(|m| m.is(u)),
        // the predicate sees the decoded value, as it does when decoding
        ShapeKind::Refinement { base, predicate, .. } => base.is(u) && predicate(normalized(base, u).as_ref()),
        ShapeKind::Sum { tag, members } => match u {
            Value::Object(obj) => obj.get(tag)
                .and_then(Value::as_str)
                .and_then(|k| members.get(k))
                .is_some_and(|m| m.is(u)),
            _ => false,
        },
        ShapeKind::Lazy(l) => l.force().is(u),
        ShapeKind::Recur(r) => r.get().is_some_and(|target| target.is(u)),
        ShapeKind::Scope { root, .. } => root.is(u),
        ShapeKind::WithExpected { base, .. } => base.is(u),
    }
}

/// The value decoding would produce from `u`, which `shape` already accepts.
/// Borrowed wherever decoding leaves the input as it is.
fn normalized<'a>(shape: &Shape, u: &'a Value) -> Cow<'a, Value> {
    match (shape.kind(), u) {
        (ShapeKind::LiteralsOr(ls, or), _) => {
            if ls.iter().any(|l| l.matches(u)) { Cow::Borrowed(u) } else { normalized(or, u) }
        }
        (ShapeKind::Type(fields) | ShapeKind::Partial(fields), Value::Object(obj)) => {
            let mut out: Option<Map<String, Value>> = None;
            for (k, field) in fields {
                let Some(v) = obj.get(k) else { continue };
                if let Cow::Owned(a) = normalized(field, v) {
                    out.get_or_insert_with(|| obj.clone()).insert(k.clone(), a);
                }
            }
            out.map_or(Cow::Borrowed(u), |o| Cow::Owned(Value::Object(o)))
        }
        (ShapeKind::Record(value), Value::Object(obj)) => {
            let mut out: Option<Map<String, Value>> = None;
            for (k, v) in obj {
                if let Cow::Owned(a) = normalized(value, v) {
                    out.get_or_insert_with(|| obj.clone()).insert(k.clone(), a);
                }
            }
            out.map_or(Cow::Borrowed(u), |o| Cow::Owned(Value::Object(o)))
        }
        (ShapeKind::Array(item), Value::Array(xs)) => {
            let parts: Vec<Cow<Value>> = xs.iter().map(|x| normalized(item, x)).collect();
            rebuilt(u, parts, false)
        }
        (ShapeKind::Tuple(items), Value::Array(xs)) => {
            let parts: Vec<Cow<Value>> = items.iter().zip(xs).map(|(s, x)| normalized(s, x)).collect();
            rebuilt(u, parts, xs.len() > items.len())
        }
        (ShapeKind::Intersection(members), _) => {
            let parts: Vec<(Shape, Cow<Value>)> = members.iter().map(|m| (m.clone(), normalized(m, u))).collect();
            if parts.iter().all(|(_, v)| matches!(v, Cow::Borrowed(_))) {
                return Cow::Borrowed(u);
            }
            let parts = parts.into_iter().map(|(m, v)| (m, v.into_owned())).collect();
            Cow::Owned(merge(parts).unwrap_or_else(|| u.clone()))
        }
        (ShapeKind::Refinement { base, .. } | ShapeKind::WithExpected { base, .. }, _) => normalized(base, u),
        (ShapeKind::Sum { tag, members }, _) => match u.get(tag).and_then(Value::as_str).and_then(|k| members.get(k)) {
            Some(member) => normalized(member, u),
            None => Cow::Borrowed(u),
        },
        (ShapeKind::Lazy(l), _) => normalized(l.force(), u),
        (ShapeKind::Recur(r), _) => match r.get() {
            Some(target) => normalized(&target, u),
            None => Cow::Borrowed(u),
        },
        (ShapeKind::Scope { root, .. }, _) => normalized(root, u),
        _ => Cow::Borrowed(u),
    }
}

fn rebuilt<'a>(u: &'a Value, parts: Vec<Cow<Value>>, trimmed: bool) -> Cow<'a, Value> {
    if !trimmed && parts.iter().all(|p| matches!(p, Cow::Borrowed(_))) {
        return Cow::Borrowed(u);
    }
    Cow::Owned(Value::Array(parts.into_iter().map(Cow::into_owned).collect()))
}

// ------------------------------- Tests ------------------------------------ //
