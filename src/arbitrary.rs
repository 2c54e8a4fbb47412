//! Generation: random well-typed instances of a shape, for property tests.
//!
//! Every generated value is accepted by the guard, decodes successfully and
//! survives an encode/decode round trip. Collections shrink to empty once
//! `max_depth` is reached, which is what lets recursive shapes terminate.
use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{Map, Value};

use crate::error::GenerateError;
use crate::shape::{Shape, ShapeKind};
use crate::merge::merge;
use crate::value::number_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitraryConfig {
    /// Depth after which arrays, maps and partial records come out empty.
    pub max_depth: usize,
    /// Upper bound for collection lengths and string sizes.
    pub max_len: usize,
    /// Rejection-sampling budget for refinements and intersections.
    pub max_attempts: usize,
}

impl Default for ArbitraryConfig {
    fn default() -> Self {
        Self { max_depth: 6, max_len: 4, max_attempts: 100 }
    }
}

/// Generator bound to one random source.
pub struct Arbitrary<'r, R: Rng> {
    rng: &'r mut R,
    config: ArbitraryConfig,
}

impl Shape {
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Result<Value, GenerateError> {
        Arbitrary::new(rng, ArbitraryConfig::default()).generate(self)
    }

    pub fn generate_with<R: Rng>(&self, rng: &mut R, config: ArbitraryConfig) -> Result<Value, GenerateError> {
        Arbitrary::new(rng, config).generate(self)
    }
}

impl<'r, R: Rng> Arbitrary<'r, R> {
    pub fn new(rng: &'r mut R, config: ArbitraryConfig) -> Self {
        Self { rng, config }
    }

    pub fn generate(&mut self, shape: &Shape) -> Result<Value, GenerateError> {
        self.arbitrary(shape, 0)
    }

    fn arbitrary(&mut self, shape: &Shape, depth: usize) -> Result<Value, GenerateError> {
        if depth > self.config.max_depth.saturating_mul(4) {
            return Err(GenerateError::TooDeep { depth });
        }
        let exhausted = depth >= self.config.max_depth;
        match shape.kind() {
            ShapeKind::Literals(ls) => {
                if ls.is_empty() {
                    return Err(GenerateError::Exhausted { expected: shape.expected(), attempts: 0 });
                }
                Ok(ls[self.rng.gen_range(0..ls.len())].to_value())
            }
            ShapeKind::LiteralsOr(ls, or) => {
                if !ls.is_empty() && (exhausted || self.rng.gen_bool(0.5)) {
                    Ok(ls[self.rng.gen_range(0..ls.len())].to_value())
                } else {
                    self.arbitrary(or, depth + 1)
                }
            }
            ShapeKind::String => Ok(Value::String(self.string())),
            ShapeKind::Number => Ok(self.number()),
            ShapeKind::Boolean => Ok(Value::Bool(self.rng.gen_bool(0.5))),
            ShapeKind::Int => Ok(Value::from(self.rng.gen_range(-1000i64..=1000))),
            ShapeKind::UnknownArray => {
                let n = self.len(exhausted);
                Ok(Value::Array((0..n).map(|_| self.primitive()).collect()))
            }
            ShapeKind::UnknownRecord => {
                let n = self.len(exhausted);
                let mut out = Map::new();
                for _ in 0..n {
                    let k = self.key();
                    let v = self.primitive();
                    out.insert(k, v);
                }
                Ok(Value::Object(out))
            }
            ShapeKind::Type(fields) => {
                let mut out = Map::new();
                for (k, field) in fields {
                    out.insert(k.clone(), self.arbitrary(field, depth + 1)?);
                }
                Ok(Value::Object(out))
            }
            ShapeKind::Partial(fields) => {
                let mut out = Map::new();
                for (k, field) in fields {
                    if !exhausted && self.rng.gen_bool(0.5) {
                        out.insert(k.clone(), self.arbitrary(field, depth + 1)?);
                    }
                }
                Ok(Value::Object(out))
            }
            ShapeKind::Array(item) => {
                let n = self.len(exhausted);
                let xs = (0..n).map(|_| self.arbitrary(item, depth + 1)).collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(xs))
            }
            ShapeKind::Tuple(items) => {
                let xs = items.iter().map(|s| self.arbitrary(s, depth + 1)).collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(xs))
            }
            ShapeKind::Record(value) => {
                let n = self.len(exhausted);
                let mut out = Map::new();
                for _ in 0..n {
                    let k = self.key();
                    out.insert(k, self.arbitrary(value, depth + 1)?);
                }
                Ok(Value::Object(out))
            }
            ShapeKind::Intersection(members) => {
                for attempt in 0..self.config.max_attempts {
                    let mut parts = Vec::with_capacity(members.len());
                    for m in members {
                        parts.push((m.clone(), self.arbitrary(m, depth + 1)?));
                    }
                    let merged = merge(parts).unwrap_or(Value::Null);
                    if shape.is(&merged) {
                        return Ok(merged);
                    }
                    debug!("intersection candidate rejected (attempt {attempt})");
                }
                Err(GenerateError::Exhausted { expected: shape.expected(), attempts: self.config.max_attempts })
            }
            ShapeKind::Refinement { base, predicate, expected } => {
                for attempt in 0..self.config.max_attempts {
                    let v = self.arbitrary(base, depth)?;
                    if predicate(&v) {
                        return Ok(v);
                    }
                    debug!("`{expected}` candidate rejected (attempt {attempt})");
                }
                Err(GenerateError::Exhausted { expected: expected.clone(), attempts: self.config.max_attempts })
            }
            ShapeKind::Sum { tag, members } => {
                if members.is_empty() {
                    return Err(GenerateError::Exhausted { expected: shape.expected(), attempts: 0 });
                }
                let i = self.rng.gen_range(0..members.len());
                let Some((k, member)) = members.get_index(i) else {
                    return Err(GenerateError::Exhausted { expected: shape.expected(), attempts: 0 });
                };
                let mut v = self.arbitrary(member, depth + 1)?;
                if let Value::Object(obj) = &mut v {
                    obj.insert(tag.clone(), Value::String(k.clone()));
                }
                Ok(v)
            }
            ShapeKind::Lazy(l) => self.arbitrary(l.force(), depth + 1),
            // the target is the enclosing lazy shape, which counts the level
            ShapeKind::Recur(r) => match r.get() {
                Some(target) => self.arbitrary(&target, depth),
                None => Err(GenerateError::Exhausted { expected: r.id().to_string(), attempts: 0 }),
            },
            ShapeKind::Scope { root, .. } => self.arbitrary(root, depth),
            ShapeKind::WithExpected { base, .. } => self.arbitrary(base, depth),
        }
    }

    fn len(&mut self, exhausted: bool) -> usize {
        if exhausted { 0 } else { self.rng.gen_range(0..=self.config.max_len) }
    }

    fn string(&mut self) -> String {
        let n = self.rng.gen_range(0..=self.config.max_len * 2);
        (0..n).map(|_| char::from(self.rng.sample(Alphanumeric))).collect()
    }

    fn key(&mut self) -> String {
        let n = self.rng.gen_range(1..=6);
        (0..n).map(|_| char::from(self.rng.sample(Alphanumeric))).collect()
    }

    fn number(&mut self) -> Value {
        if self.rng.gen_bool(0.5) {
            Value::from(self.rng.gen_range(-1000i64..=1000))
        } else {
            number_value(self.rng.gen_range(-1000.0..1000.0))
        }
    }

    fn primitive(&mut self) -> Value {
        match self.rng.gen_range(0..4) {
            0 => Value::Null,
            1 => Value::Bool(self.rng.gen_bool(0.5)),
            2 => self.number(),
            _ => Value::String(self.string()),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
