//! Structured decode errors plus the typed errors of the other entry points.
//!
//! A failing decode yields one [`DecodeErrors`]: a non-empty forest whose
//! leaves are expected/actual mismatches and whose branches carry the
//! location (key, index, union member) their children were found at.
use std::fmt;

use serde::Serialize;
use serde_json::Value;

// ------------------------------- Decoding --------------------------------- //

/// Where a group of child errors was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum Location {
    Key(String),
    Index(usize),
    /// Union or intersection member, zero-based.
    Member(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodeError {
    Leaf {
        /// `None` when the key was absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        actual: Option<Value>,
        expected: String,
    },
    Branch {
        at: Location,
        errors: DecodeErrors,
    },
}

/// Non-empty list of [`DecodeError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DecodeErrors(Vec<DecodeError>);

impl DecodeError {
    pub fn leaf(actual: &Value, expected: impl Into<String>) -> Self {
        DecodeError::Leaf { actual: Some(actual.clone()), expected: expected.into() }
    }

    pub fn missing(expected: impl Into<String>) -> Self {
        DecodeError::Leaf { actual: None, expected: expected.into() }
    }

    pub fn at(at: Location, errors: DecodeErrors) -> Self {
        DecodeError::Branch { at, errors }
    }
}

impl DecodeErrors {
    pub fn one(e: DecodeError) -> Self { DecodeErrors(vec![e]) }

    /// Head plus tail; non-empty by construction.
    pub fn cons(head: DecodeError, tail: impl IntoIterator<Item = DecodeError>) -> Self {
        let mut errors = vec![head];
        errors.extend(tail);
        DecodeErrors(errors)
    }

    /// `None` for an empty list, so the non-empty invariant holds.
    pub fn from_vec(errors: Vec<DecodeError>) -> Option<Self> {
        if errors.is_empty() { None } else { Some(DecodeErrors(errors)) }
    }

    /// Shorthand for a single located leaf.
    pub fn leaf(actual: &Value, expected: impl Into<String>) -> Self {
        Self::one(DecodeError::leaf(actual, expected))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecodeError> { self.0.iter() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { false }

    pub fn into_vec(self) -> Vec<DecodeError> { self.0 }

    /// Replace the expected label of the top-level leaves.
    pub fn with_expected(self, expected: &str) -> Self {
        DecodeErrors(
            self.0.into_iter()
                .map(|e| match e {
                    DecodeError::Leaf { actual, .. } => DecodeError::Leaf { actual, expected: expected.to_string() },
                    branch => branch,
                })
                .collect(),
        )
    }

    /// Every leaf with the path that leads to it, depth first.
    pub fn leaves(&self) -> Vec<LeafError<'_>> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        collect_leaves(&self.0, &mut path, &mut out);
        out
    }
}

impl<'a> IntoIterator for &'a DecodeErrors {
    type Item = &'a DecodeError;
    type IntoIter = std::slice::Iter<'a, DecodeError>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

/// A leaf mismatch together with its location path.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafError<'a> {
    pub path: Path,
    pub actual: Option<&'a Value>,
    pub expected: &'a str,
}

fn collect_leaves<'a>(errors: &'a [DecodeError], path: &mut Vec<Location>, out: &mut Vec<LeafError<'a>>) {
    for e in errors {
        match e {
            DecodeError::Leaf { actual, expected } => out.push(LeafError {
                path: Path(path.clone()),
                actual: actual.as_ref(),
                expected,
            }),
            DecodeError::Branch { at, errors } => {
                path.push(at.clone());
                collect_leaves(&errors.0, path, out);
                path.pop();
            }
        }
    }
}

/// Sequence of locations from the root to a leaf.
///
/// Displays as `b[0].a`; member segments are structural only and are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path(pub Vec<Location>);

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for loc in &self.0 {
            match loc {
                Location::Key(k) => {
                    if !first { f.write_str(".")?; }
                    f.write_str(k)?;
                    first = false;
                }
                Location::Index(i) => {
                    write!(f, "[{i}]")?;
                    first = false;
                }
                Location::Member(_) => {}
            }
        }
        Ok(())
    }
}

// ------------------------------- Others ----------------------------------- //

/// Failures of the serde bridge on [`crate::Codec`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("decode failed with {} error(s)", .0.len())]
    Decode(DecodeErrors),
    #[error("at JSON path {path} → {source}")]
    Deserialize { path: String, source: serde_json::Error },
    #[error("serialize failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Number literals are finite; JSON has no NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("number literal must be finite, got {0}")]
pub struct NonFiniteNumber(pub f64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("no candidate satisfied `{expected}` after {attempts} attempts")]
    Exhausted { expected: String, attempts: usize },
    #[error("recursion did not bottom out by depth {depth}")]
    TooDeep { depth: usize },
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested() -> DecodeErrors {
        DecodeErrors::one(DecodeError::at(
            Location::Key("b".into()),
            DecodeErrors::one(DecodeError::at(
                Location::Index(0),
                DecodeErrors::one(DecodeError::at(
                    Location::Key("a".into()),
                    DecodeErrors::leaf(&json!("x"), "number"),
                )),
            )),
        ))
    }

    #[test]
    fn leaves_carry_dotted_paths() {
        let errs = nested();
        let leaves = errs.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].path.to_string(), "b[0].a");
        assert_eq!(leaves[0].expected, "number");
        assert_eq!(leaves[0].actual, Some(&json!("x")));
    }

    #[test]
    fn member_segments_are_not_displayed() {
        let p = Path(vec![Location::Member(1), Location::Key("b".into())]);
        assert_eq!(p.to_string(), "b");
    }

    #[test]
    fn with_expected_only_touches_top_level_leaves() {
        let errs = DecodeErrors::from_vec(vec![
            DecodeError::leaf(&json!(1), "string"),
            nested().into_vec().remove(0),
        ]).unwrap();
        let relabeled = errs.with_expected("Name");
        let leaves = relabeled.leaves();
        assert_eq!(leaves[0].expected, "Name");
        assert_eq!(leaves[1].expected, "number");
    }

    #[test]
    fn empty_error_lists_are_rejected() {
        assert!(DecodeErrors::from_vec(vec![]).is_none());
    }

    #[test]
    fn serializes_as_tagged_tree() {
        let v = serde_json::to_value(nested()).unwrap();
        assert_eq!(v[0]["type"], "branch");
        assert_eq!(v[0]["at"], json!({"kind": "key", "at": "b"}));
        let missing = serde_json::to_value(DecodeError::missing("number")).unwrap();
        assert_eq!(missing, json!({"type": "leaf", "expected": "number"}));
    }
}
