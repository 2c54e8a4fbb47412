//! JSON shape descriptors: the constructor vocabulary as data.
//!
//! ```json
//! { "definitions": { "Rec": { "type": { "a": "number", "b": { "array": { "ref": "Rec" } } } } },
//!   "root": { "ref": "Rec" } }
//! ```
//!
//! Each definition compiles to one [`lazy`] shape, forced at most once, and
//! references are weak handles back to it, so definitions may be recursive.
//! Everything that can fail (unknown references, non-primitive literals, bad
//! patterns) is rejected before any shape is built.
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::CodecError;
use crate::path_de::from_str_with_path;
use crate::shape::{self, Shape, ShapeKind};
use crate::value::Literal;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Descriptor {
    #[serde(default)]
    pub definitions: IndexMap<String, Node>,
    pub root: Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Primitive {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "boolean")]
    Boolean,
    Int,
    UnknownArray,
    UnknownRecord,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Primitive(Primitive),
    Literals(LiteralsNode),
    Type(TypeNode),
    Partial(PartialNode),
    Array(ArrayNode),
    Tuple(TupleNode),
    Record(RecordNode),
    Intersection(IntersectionNode),
    Sum(SumNode),
    Ref(RefNode),
    Refine(RefineNode),
    Expected(ExpectedNode),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiteralsNode {
    pub literals: Vec<Value>,
    #[serde(default)]
    pub or: Option<Box<Node>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeNode {
    #[serde(rename = "type")]
    pub fields: IndexMap<String, Node>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialNode {
    pub partial: IndexMap<String, Node>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArrayNode {
    pub array: Box<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TupleNode {
    pub tuple: Vec<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordNode {
    pub record: Box<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntersectionNode {
    pub intersection: Vec<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SumNode {
    pub sum: SumBody,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SumBody {
    pub tag: String,
    pub members: IndexMap<String, Node>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefNode {
    #[serde(rename = "ref")]
    pub name: String,
}

/// Built-in predicates; every present bound must hold.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefineNode {
    pub refine: Box<Node>,
    pub expected: String,
    #[serde(default, deserialize_with = "de_pattern")]
    pub pattern: Option<Regex>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedNode {
    pub expected: String,
    pub shape: Box<Node>,
}

fn de_pattern<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Regex>, D::Error> {
    let src = Option::<String>::deserialize(d)?;
    src.map(|s| Regex::new(&s).map_err(serde::de::Error::custom)).transpose()
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error(transparent)]
    Parse(#[from] CodecError),
    #[error("unknown reference `{name}`")]
    UnknownRef { name: String },
    #[error("literal must be null, a boolean, a number or a string, got {value}")]
    BadLiteral { value: Value },
}

type Handles = IndexMap<String, Weak<ShapeKind>>;

impl Descriptor {
    pub fn parse(src: &str) -> Result<Self, DescriptorError> {
        Ok(from_str_with_path(src)?)
    }

    /// Checks the whole descriptor, then builds the root shape.
    pub fn compile(self) -> Result<Shape, DescriptorError> {
        for node in self.definitions.values() {
            check(node, &self.definitions)?;
        }
        check(&self.root, &self.definitions)?;
        if self.definitions.is_empty() {
            return Ok(build(&self.root, &Handles::new()));
        }
        let nodes = Arc::new(self.definitions);
        let handles: Arc<OnceCell<Handles>> = Arc::new(OnceCell::new());
        let definitions: IndexMap<String, Shape> = nodes
            .keys()
            .map(|name| {
                let (nodes, handles, key) = (Arc::clone(&nodes), Arc::clone(&handles), name.clone());
                let body = shape::lazy(name.clone(), move || match (nodes.get(&key), handles.get()) {
                    (Some(node), Some(handles)) => build(node, handles),
                    _ => shape::literals(Vec::<Literal>::new()),
                });
                (name.clone(), body)
            })
            .collect();
        let table: Handles = definitions.iter().map(|(k, s)| (k.clone(), s.downgrade())).collect();
        let root = build(&self.root, &table);
        // nothing has been forced yet, so the cell is still empty
        let _ = handles.set(table);
        Ok(shape::scope(root, definitions))
    }
}

fn check(node: &Node, defs: &IndexMap<String, Node>) -> Result<(), DescriptorError> {
    match node {
        Node::Primitive(_) => Ok(()),
        Node::Literals(n) => {
            if let Some(value) = n.literals.iter().find(|v| Literal::from_value(v).is_none()) {
                return Err(DescriptorError::BadLiteral { value: value.clone() });
            }
            n.or.as_deref().map_or(Ok(()), |or| check(or, defs))
        }
        Node::Type(TypeNode { fields }) | Node::Partial(PartialNode { partial: fields }) => {
            fields.values().try_for_each(|n| check(n, defs))
        }
        Node::Array(ArrayNode { array: n }) | Node::Record(RecordNode { record: n }) => check(n, defs),
        Node::Tuple(TupleNode { tuple: ns }) | Node::Intersection(IntersectionNode { intersection: ns }) => {
            ns.iter().try_for_each(|n| check(n, defs))
        }
        Node::Sum(SumNode { sum }) => sum.members.values().try_for_each(|n| check(n, defs)),
        Node::Ref(RefNode { name }) => {
            if defs.contains_key(name) {
                Ok(())
            } else {
                Err(DescriptorError::UnknownRef { name: name.clone() })
            }
        }
        Node::Refine(n) => check(&n.refine, defs),
        Node::Expected(n) => check(&n.shape, defs),
    }
}

/// Infallible once [`check`] passed.
fn build(node: &Node, defs: &Handles) -> Shape {
    match node {
        Node::Primitive(p) => match p {
            Primitive::String => shape::string(),
            Primitive::Number => shape::number(),
            Primitive::Boolean => shape::boolean(),
            Primitive::Int => shape::int(),
            Primitive::UnknownArray => shape::unknown_array(),
            Primitive::UnknownRecord => shape::unknown_record(),
        },
        Node::Literals(n) => {
            let ls: Vec<Literal> = n.literals.iter().filter_map(Literal::from_value).collect();
            match &n.or {
                None => shape::literals(ls),
                Some(or) => shape::literals_or(ls, build(or, defs)),
            }
        }
        Node::Type(n) => shape::type_(n.fields.iter().map(|(k, n)| (k.clone(), build(n, defs)))),
        Node::Partial(n) => shape::partial(n.partial.iter().map(|(k, n)| (k.clone(), build(n, defs)))),
        Node::Array(n) => shape::array(build(&n.array, defs)),
        Node::Tuple(n) => shape::tuple(n.tuple.iter().map(|n| build(n, defs))),
        Node::Record(n) => shape::record(build(&n.record, defs)),
        Node::Intersection(n) => shape::intersection(n.intersection.iter().map(|n| build(n, defs))),
        Node::Sum(n) => shape::sum(n.sum.tag.clone(), n.sum.members.iter().map(|(k, n)| (k.clone(), build(n, defs)))),
        Node::Ref(n) => shape::recur(n.name.clone(), defs.get(&n.name).cloned().unwrap_or_default()),
        Node::Refine(n) => {
            let base = build(&n.refine, defs);
            let bounds = Bounds {
                pattern: n.pattern.clone(),
                minimum: n.minimum,
                maximum: n.maximum,
                min_length: n.min_length,
                max_length: n.max_length,
            };
            shape::refinement(base, move |v| bounds.holds(v), n.expected.clone())
        }
        Node::Expected(n) => shape::with_expected(build(&n.shape, defs), n.expected.clone()),
    }
}

struct Bounds {
    pattern: Option<Regex>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl Bounds {
    fn holds(&self, v: &Value) -> bool {
        if let Some(rx) = &self.pattern {
            if !v.as_str().is_some_and(|s| rx.is_match(s)) {
                return false;
            }
        }
        if self.minimum.is_some() || self.maximum.is_some() {
            let Some(n) = v.as_f64() else { return false };
            if self.minimum.is_some_and(|min| n < min) || self.maximum.is_some_and(|max| n > max) {
                return false;
            }
        }
        if self.min_length.is_some() || self.max_length.is_some() {
            let len = match v {
                Value::String(s) => s.chars().count(),
                Value::Array(xs) => xs.len(),
                Value::Object(o) => o.len(),
                _ => return false,
            };
            if self.min_length.is_some_and(|min| len < min) || self.max_length.is_some_and(|max| len > max) {
                return false;
            }
        }
        true
    }
}

// ------------------------------- Tests ------------------------------------ //
