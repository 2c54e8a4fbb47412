//! Combining the per-member results of an intersection.
//!
//! Record members pass keys they do not declare through untouched. A member's
//! copy of such a key never beats the value produced by a member that
//! declares it. Keys declared by several members merge again with their field
//! shapes; a conflict between non-object values keeps the earliest member's.
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::shape::{self, Shape, ShapeKind};

/// Shape that `shape` gives `key` in the object `v` it produced, if it declares it.
fn declared_field(shape: &Shape, v: &Value, key: &str) -> Option<Shape> {
    match shape.kind() {
        ShapeKind::Type(fields) | ShapeKind::Partial(fields) => fields.get(key).cloned(),
        ShapeKind::Record(value) => Some(value.clone()),
        ShapeKind::LiteralsOr(_, or) => declared_field(or, v, key),
        ShapeKind::Intersection(members) => {
            let mut shapes: Vec<Shape> = members.iter().filter_map(|m| declared_field(m, v, key)).collect();
            match shapes.len() {
                0 | 1 => shapes.pop(),
                _ => Some(shape::intersection(shapes)),
            }
        }
        ShapeKind::Refinement { base, .. } | ShapeKind::WithExpected { base, .. } => declared_field(base, v, key),
        ShapeKind::Sum { tag, members } => {
            let k = v.get(tag).and_then(Value::as_str)?;
            let member = members.get(k)?;
            declared_field(member, v, key).or_else(|| (key == tag.as_str()).then(|| shape::literal(k)))
        }
        ShapeKind::Lazy(l) => declared_field(l.force(), v, key),
        ShapeKind::Recur(r) => r.get().and_then(|s| declared_field(&s, v, key)),
        ShapeKind::Scope { root, .. } => declared_field(root, v, key),
        _ => None,
    }
}

/// Merges member results in member order; `None` when there are no members.
pub(crate) fn merge(parts: Vec<(Shape, Value)>) -> Option<Value> {
    if !parts.iter().all(|(_, v)| v.is_object()) {
        return parts.into_iter().next().map(|(_, v)| v);
    }
    if parts.is_empty() {
        return None;
    }
    let mut out = Map::new();
    let mut claims: IndexMap<String, Vec<(Shape, Value)>> = IndexMap::new();
    for (shape, v) in &parts {
        let Value::Object(obj) = v else { continue };
        for (k, x) in obj {
            match declared_field(shape, v, k) {
                Some(field) => {
                    // placeholder keeps first-seen key order
                    out.entry(k.clone()).or_insert(Value::Null);
                    claims.entry(k.clone()).or_default().push((field, x.clone()));
                }
                None => {
                    out.entry(k.clone()).or_insert_with(|| x.clone());
                }
            }
        }
    }
    for (k, mut claimed) in claims {
        let merged = if claimed.len() == 1 { claimed.pop().map(|(_, x)| x) } else { merge(claimed) };
        if let Some(v) = merged {
            out.insert(k, v);
        }
    }
    Some(Value::Object(out))
}

// ------------------------------- Tests ------------------------------------ //
