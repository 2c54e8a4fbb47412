//! Untyped value model.
//!
//! The boundary format is plain `serde_json::Value` (null, bool, number,
//! string, array, string-keyed object). Decoding reads it, encoding writes
//! it. Literals are the one primitive carrier we own, so literal sets can be
//! ordered and hashed.
use std::fmt;

use ordered_float::OrderedFloat;
use serde_json::{Number, Value};

use crate::error::NonFiniteNumber;

/// A single allowed primitive in a literal shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(OrderedFloat<f64>),
    String(String),
}

impl Literal {
    /// Primitive equality; numbers compare by value so `1` matches `1.0`.
    pub fn matches(&self, v: &Value) -> bool {
        match (self, v) {
            (Literal::Null, Value::Null) => true,
            (Literal::Bool(a), Value::Bool(b)) => a == b,
            (Literal::Number(a), Value::Number(b)) => b.as_f64() == Some(a.0),
            (Literal::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Number literal; `None` for NaN and infinities, which JSON cannot carry.
    pub fn number(n: f64) -> Option<Self> {
        n.is_finite().then_some(Literal::Number(OrderedFloat(n)))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => number_value(n.0),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    /// Inverse of [`Literal::to_value`]; `None` for arrays and objects.
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Null => Some(Literal::Null),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => n.as_f64().map(|f| Literal::Number(OrderedFloat(f))),
            Value::String(s) => Some(Literal::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // JSON text doubles as the TS-ish literal syntax
        write!(f, "{}", self.to_value())
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self { Literal::String(s.to_string()) }
}

impl From<String> for Literal {
    fn from(s: String) -> Self { Literal::String(s) }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self { Literal::Bool(b) }
}

impl TryFrom<f64> for Literal {
    type Error = NonFiniteNumber;
    fn try_from(n: f64) -> Result<Self, Self::Error> {
        Literal::number(n).ok_or(NonFiniteNumber(n))
    }
}

macro_rules! integer_literals {
    ($($t:ty),*) => {$(
        impl From<$t> for Literal {
            fn from(n: $t) -> Self { Literal::Number(OrderedFloat(n as f64)) }
        }
    )*};
}

integer_literals!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<()> for Literal {
    fn from(_: ()) -> Self { Literal::Null }
}

// ------------------------------- Helpers --------------------------------- //

/// Prefer an integer `Number` when the float is integral, so `1.0` encodes as `1`.
pub fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.is_finite() && f.abs() < (i64::MAX as f64) {
        Value::Number(Number::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Numeric equality across int/float representations.
pub fn numbers_eq(a: &Number, b: &Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_f64() == b.as_f64(),
    }
}

pub fn is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

// ------------------------------- Tests ------------------------------------ //
