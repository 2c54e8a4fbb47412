//! Composable runtime shapes for JSON-like data.
//!
//! A [`Shape`] is built from combinators (primitives, literal sets, records,
//! partials, arrays, tuples, string-keyed maps, intersections, refinements,
//! tagged sums and lazy recursion) and then interpreted five ways:
//!
//! - [`Shape::decode`]: validate and normalize an untyped value, or explain
//!   every mismatch as a located error tree;
//! - [`Shape::encode`]: turn a conforming value back into its wire form;
//! - [`Shape::equals`]: structural equality scoped to what the shape declares;
//! - [`Shape::is`]: a boolean guard, `true` exactly when decoding succeeds;
//! - [`Shape::generate`]: random conforming instances for property tests.
//!
//! [`Codec`] pairs a decoder with an encoder and bridges to native types via
//! serde. [`descriptor`] reads shapes from JSON so they can be used without
//! writing Rust.
//!
//! ```
//! use shape_codec::{array, number, recursive, type_};
//! use serde_json::json;
//!
//! let rec = recursive("Rec", |rec| type_([("a", number()), ("b", array(rec))]));
//!
//! let errors = rec.decode(&json!({"a": 1, "b": [{"a": "x", "b": []}]})).unwrap_err();
//! assert_eq!(errors.leaves()[0].path.to_string(), "b[0].a");
//! ```
pub mod arbitrary;
pub mod codec;
pub mod decode;
pub mod descriptor;
pub mod encode;
pub mod eq;
pub mod error;
pub mod guard;
mod merge;
pub mod path_de;
pub mod shape;
pub mod value;

pub use arbitrary::{Arbitrary, ArbitraryConfig};
pub use codec::{Codec, Decode, Encode, Identity};
pub use decode::Decoded;
pub use descriptor::{Descriptor, DescriptorError};
pub use error::{CodecError, DecodeError, DecodeErrors, GenerateError, LeafError, Location, NonFiniteNumber, Path};
pub use shape::{
    array, boolean, int, intersection, lazy, literal, literals, literals_or, number, partial, record,
    recursive, refinement, string, sum, tuple, type_, unknown_array, unknown_record, with_expected,
    LazyShape, Predicate, RecurShape, Shape, ShapeKind, Supplier,
};
pub use value::Literal;

pub use serde_json::Value;
