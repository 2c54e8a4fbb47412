//! Shape expressions: the closed constructor set every interpretation reads.
//!
//! A [`Shape`] is built once and shared read-only (cheap `Arc` clones). It
//! does not know about decoding, encoding, equality, guards or generation;
//! each of those lives in its own module as a `match` over [`ShapeKind`].
//!
//! Recursive shapes go through [`recursive`]: the body receives a non-owning
//! handle to the shape being defined, runs on first force, and its result is
//! memoized in a single-initialization cell. [`lazy`] is the plain deferred
//! form.
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use log::trace;
use once_cell::sync::OnceCell;

use crate::value::Literal;

pub type Predicate = Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync>;
pub type Supplier = Arc<dyn Fn() -> Shape + Send + Sync>;

/// Immutable, shareable shape expression.
#[derive(Clone)]
pub struct Shape(Arc<ShapeKind>);

pub enum ShapeKind {
    /// An empty set accepts nothing.
    Literals(Vec<Literal>),
    LiteralsOr(Vec<Literal>, Shape),
    String,
    Number,
    Boolean,
    Int,
    UnknownArray,
    UnknownRecord,
    Type(IndexMap<String, Shape>),
    Partial(IndexMap<String, Shape>),
    Array(Shape),
    Tuple(Vec<Shape>),
    /// Open-keyed map with a single value shape.
    Record(Shape),
    Intersection(Vec<Shape>),
    Refinement { base: Shape, predicate: Predicate, expected: String },
    Sum { tag: String, members: IndexMap<String, Shape> },
    Lazy(LazyShape),
    /// Back-reference to an enclosing recursive shape.
    Recur(RecurShape),
    /// A root together with the named definitions its references point at.
    Scope { root: Shape, definitions: IndexMap<String, Shape> },
    WithExpected { base: Shape, expected: String },
}

/// Deferred shape with a memoized supplier.
pub struct LazyShape {
    id: String,
    supplier: Supplier,
    cell: OnceCell<Shape>,
}

impl LazyShape {
    pub fn id(&self) -> &str { &self.id }

    /// Runs the supplier at most once; concurrent first callers wait for it.
    ///
    /// A supplier that forces its own shape (instead of only referencing it)
    /// never finishes: the cell is still being initialized.
    pub fn force(&self) -> &Shape {
        self.cell.get_or_init(|| {
            trace!("forcing lazy shape `{}`", self.id);
            (self.supplier)()
        })
    }

    pub fn is_forced(&self) -> bool { self.cell.get().is_some() }
}

/// Non-owning reference to a shape that (transitively) contains it.
pub struct RecurShape {
    id: String,
    target: Weak<ShapeKind>,
}

impl RecurShape {
    pub fn id(&self) -> &str { &self.id }

    /// `None` once every owning handle of the target has been dropped.
    pub fn get(&self) -> Option<Shape> { self.target.upgrade().map(Shape) }
}

impl Shape {
    fn new(kind: ShapeKind) -> Self { Shape(Arc::new(kind)) }

    pub fn kind(&self) -> &ShapeKind { &self.0 }

    /// Same underlying shape, not just an equal one.
    pub fn ptr_eq(&self, other: &Shape) -> bool { Arc::ptr_eq(&self.0, &other.0) }

    pub(crate) fn downgrade(&self) -> Weak<ShapeKind> { Arc::downgrade(&self.0) }

    /// Label used as `expected` in leaf errors.
    pub fn expected(&self) -> String {
        match self.kind() {
            ShapeKind::Literals(ls) => literals_label(ls),
            ShapeKind::LiteralsOr(ls, or) => format!("{} | {}", literals_label(ls), or.expected()),
            ShapeKind::String => "string".into(),
            ShapeKind::Number => "number".into(),
            ShapeKind::Boolean => "boolean".into(),
            ShapeKind::Int => "Int".into(),
            ShapeKind::UnknownArray => "Array<unknown>".into(),
            ShapeKind::UnknownRecord => "Record<string, unknown>".into(),
            ShapeKind::Type(fields) => fields_label(fields),
            ShapeKind::Partial(fields) => format!("Partial<{}>", fields_label(fields)),
            ShapeKind::Array(item) => format!("Array<{}>", item.expected()),
            ShapeKind::Tuple(items) => {
                let xs: Vec<String> = items.iter().map(Shape::expected).collect();
                format!("[{}]", xs.join(", "))
            }
            ShapeKind::Record(value) => format!("Record<string, {}>", value.expected()),
            ShapeKind::Intersection(members) => {
                let xs: Vec<String> = members.iter().map(Shape::expected).collect();
                format!("({})", xs.join(" & "))
            }
            ShapeKind::Refinement { expected, .. } => expected.clone(),
            ShapeKind::Sum { members, .. } => {
                let xs: Vec<String> = members.values().map(Shape::expected).collect();
                xs.join(" | ")
            }
            ShapeKind::Lazy(l) => l.id.clone(),
            ShapeKind::Recur(r) => r.id.clone(),
            ShapeKind::Scope { root, .. } => root.expected(),
            ShapeKind::WithExpected { expected, .. } => expected.clone(),
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shape").field(&self.expected()).finish()
    }
}

pub(crate) fn literals_label(ls: &[Literal]) -> String {
    if ls.is_empty() {
        return "never".into();
    }
    ls.iter().map(Literal::to_string).collect::<Vec<_>>().join(" | ")
}

fn fields_label(fields: &IndexMap<String, Shape>) -> String {
    if fields.is_empty() {
        return "{}".into();
    }
    let xs: Vec<String> = fields.iter().map(|(k, s)| format!("{k}: {}", s.expected())).collect();
    format!("{{ {} }}", xs.join(", "))
}

fn field_map<K: Into<String>>(fields: impl IntoIterator<Item = (K, Shape)>) -> IndexMap<String, Shape> {
    fields.into_iter().map(|(k, s)| (k.into(), s)).collect()
}

// ------------------------------ Constructors ------------------------------ //

pub fn literals<L: Into<Literal>>(ls: impl IntoIterator<Item = L>) -> Shape {
    Shape::new(ShapeKind::Literals(ls.into_iter().map(Into::into).collect()))
}

/// One literal; shorthand for a singleton [`literals`].
pub fn literal(l: impl Into<Literal>) -> Shape {
    literals([l.into()])
}

/// The literal set, or else `shape`.
pub fn literals_or<L: Into<Literal>>(ls: impl IntoIterator<Item = L>, shape: Shape) -> Shape {
    Shape::new(ShapeKind::LiteralsOr(ls.into_iter().map(Into::into).collect(), shape))
}

pub fn string() -> Shape { Shape::new(ShapeKind::String) }

pub fn number() -> Shape { Shape::new(ShapeKind::Number) }

pub fn boolean() -> Shape { Shape::new(ShapeKind::Boolean) }

pub fn int() -> Shape { Shape::new(ShapeKind::Int) }

pub fn unknown_array() -> Shape { Shape::new(ShapeKind::UnknownArray) }

pub fn unknown_record() -> Shape { Shape::new(ShapeKind::UnknownRecord) }

/// Record with required fields, in declaration order.
pub fn type_<K: Into<String>>(fields: impl IntoIterator<Item = (K, Shape)>) -> Shape {
    Shape::new(ShapeKind::Type(field_map(fields)))
}

/// Record whose fields may all be absent.
pub fn partial<K: Into<String>>(fields: impl IntoIterator<Item = (K, Shape)>) -> Shape {
    Shape::new(ShapeKind::Partial(field_map(fields)))
}

pub fn array(item: Shape) -> Shape { Shape::new(ShapeKind::Array(item)) }

pub fn tuple(items: impl IntoIterator<Item = Shape>) -> Shape {
    Shape::new(ShapeKind::Tuple(items.into_iter().collect()))
}

/// String-keyed map with an open key set.
pub fn record(value: Shape) -> Shape { Shape::new(ShapeKind::Record(value)) }

pub fn intersection(members: impl IntoIterator<Item = Shape>) -> Shape {
    Shape::new(ShapeKind::Intersection(members.into_iter().collect()))
}

pub fn refinement<F>(base: Shape, predicate: F, expected: impl Into<String>) -> Shape
where
    F: Fn(&serde_json::Value) -> bool + Send + Sync + 'static,
{
    Shape::new(ShapeKind::Refinement { base, predicate: Arc::new(predicate), expected: expected.into() })
}

/// Tagged sum dispatching on the string value of field `tag`.
pub fn sum<K: Into<String>>(tag: impl Into<String>, members: impl IntoIterator<Item = (K, Shape)>) -> Shape {
    Shape::new(ShapeKind::Sum { tag: tag.into(), members: field_map(members) })
}

/// Deferred shape; `id` names it in expected-labels.
///
/// For self-reference use [`recursive`]: a supplier that calls the function
/// defining it builds a fresh shape at every level of nesting.
pub fn lazy<F>(id: impl Into<String>, supplier: F) -> Shape
where
    F: Fn() -> Shape + Send + Sync + 'static,
{
    Shape::new(ShapeKind::Lazy(LazyShape {
        id: id.into(),
        supplier: Arc::new(supplier),
        cell: OnceCell::new(),
    }))
}

/// Self-referential shape; `body` gets a handle to the shape being defined.
///
/// ```
/// use shape_codec::{array, number, recursive, type_};
///
/// let rec = recursive("Rec", |rec| type_([("a", number()), ("b", array(rec))]));
/// assert!(rec.is(&serde_json::json!({"a": 1, "b": [{"a": 2, "b": []}]})));
/// ```
///
/// The handle does not own the shape, so the graph has no reference cycle;
/// it dangles (and rejects everything) once the returned shape and all its
/// clones are dropped. `body` runs once, on first force.
pub fn recursive<F>(id: impl Into<String>, body: F) -> Shape
where
    F: Fn(Shape) -> Shape + Send + Sync + 'static,
{
    let id = id.into();
    Shape(Arc::new_cyclic(|me: &Weak<ShapeKind>| {
        let this = recur(id.clone(), me.clone());
        ShapeKind::Lazy(LazyShape {
            id,
            supplier: Arc::new(move || body(this.clone())),
            cell: OnceCell::new(),
        })
    }))
}

pub(crate) fn recur(id: impl Into<String>, target: Weak<ShapeKind>) -> Shape {
    Shape::new(ShapeKind::Recur(RecurShape { id: id.into(), target }))
}

/// Keeps `definitions` alive for as long as `root` is reachable.
pub(crate) fn scope(root: Shape, definitions: IndexMap<String, Shape>) -> Shape {
    Shape::new(ShapeKind::Scope { root, definitions })
}

/// Overrides the label reported by the shape's own leaf errors.
pub fn with_expected(base: Shape, expected: impl Into<String>) -> Shape {
    Shape::new(ShapeKind::WithExpected { base, expected: expected.into() })
}

// ------------------------------- Tests ------------------------------------ //
