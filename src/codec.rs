//! Codec: a decoder and an encoder for the same typed value, in one handle.
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::decode::Decoded;
use crate::error::CodecError;
use crate::path_de::from_value_with_path;
use crate::shape::Shape;

pub trait Decode: Send + Sync {
    fn decode(&self, u: &Value) -> Decoded;
}

pub trait Encode: Send + Sync {
    fn encode(&self, a: &Value) -> Value;
}

impl Decode for Shape {
    fn decode(&self, u: &Value) -> Decoded {
        crate::decode::decode(self, u)
    }
}

impl Encode for Shape {
    fn encode(&self, a: &Value) -> Value {
        crate::encode::encode(self, a)
    }
}

/// Encoder that hands the value back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Encode for Identity {
    fn encode(&self, a: &Value) -> Value {
        a.clone()
    }
}

#[derive(Clone)]
pub struct Codec {
    decoder: Arc<dyn Decode>,
    encoder: Arc<dyn Encode>,
}

impl Codec {
    /// Decoder and encoder of one shape.
    pub fn new(shape: Shape) -> Self {
        Self::make(shape.clone(), shape)
    }

    pub fn make(decoder: impl Decode + 'static, encoder: impl Encode + 'static) -> Self {
        Self { decoder: Arc::new(decoder), encoder: Arc::new(encoder) }
    }

    /// Pairs `decoder` with [`Identity`].
    pub fn from_decoder(decoder: impl Decode + 'static) -> Self {
        Self::make(decoder, Identity)
    }

    pub fn decode(&self, u: &Value) -> Decoded {
        self.decoder.decode(u)
    }

    pub fn encode(&self, a: &Value) -> Value {
        self.encoder.encode(a)
    }

    /// Maps decoded values with `f`; encoding first applies `g`.
    pub fn imap<F, G>(self, f: F, g: G) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
        G: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            decoder: Arc::new(MapDecoder { inner: self.decoder, f }),
            encoder: Arc::new(ContramapEncoder { inner: self.encoder, g }),
        }
    }

    /// Relabels the decoder's own leaf errors; encoding is untouched.
    pub fn with_expected(self, expected: impl Into<String>) -> Self {
        Self {
            decoder: Arc::new(ExpectedDecoder { inner: self.decoder, expected: expected.into() }),
            encoder: self.encoder,
        }
    }

    /// Decodes, then deserializes into a native type.
    pub fn decode_as<T: DeserializeOwned>(&self, u: &Value) -> Result<T, CodecError> {
        let a = self.decode(u).map_err(CodecError::Decode)?;
        from_value_with_path(&a)
    }

    /// Serializes a native value, then encodes it.
    pub fn encode_from<T: Serialize>(&self, t: &T) -> Result<Value, CodecError> {
        let a = serde_json::to_value(t).map_err(CodecError::Serialize)?;
        Ok(self.encode(&a))
    }
}

impl Decode for Codec {
    fn decode(&self, u: &Value) -> Decoded {
        self.decoder.decode(u)
    }
}

impl Encode for Codec {
    fn encode(&self, a: &Value) -> Value {
        self.encoder.encode(a)
    }
}

impl From<Shape> for Codec {
    fn from(shape: Shape) -> Self {
        Codec::new(shape)
    }
}

struct MapDecoder<F> {
    inner: Arc<dyn Decode>,
    f: F,
}

impl<F: Fn(Value) -> Value + Send + Sync> Decode for MapDecoder<F> {
    fn decode(&self, u: &Value) -> Decoded {
        self.inner.decode(u).map(&self.f)
    }
}

struct ContramapEncoder<G> {
    inner: Arc<dyn Encode>,
    g: G,
}

impl<G: Fn(&Value) -> Value + Send + Sync> Encode for ContramapEncoder<G> {
    fn encode(&self, a: &Value) -> Value {
        self.inner.encode(&(self.g)(a))
    }
}

struct ExpectedDecoder {
    inner: Arc<dyn Decode>,
    expected: String,
}

impl Decode for ExpectedDecoder {
    fn decode(&self, u: &Value) -> Decoded {
        self.inner.decode(u).map_err(|e| e.with_expected(&self.expected))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrors;
    use crate::shape::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        age: u32,
    }

    fn person() -> Codec {
        Codec::new(type_([("name", string()), ("age", int())]))
    }

    #[test]
    fn pairs_decoder_and_encoder_of_one_shape() {
        let c = person();
        assert_eq!(c.decode(&json!({"name": "a", "age": 1, "x": 0})), Ok(json!({"name": "a", "age": 1, "x": 0})));
        assert_eq!(c.encode(&json!({"name": "a", "age": 1, "x": 0})), json!({"name": "a", "age": 1}));
    }

    #[test]
    fn from_decoder_encodes_with_identity() {
        let c = Codec::from_decoder(type_([("a", number())]));
        assert_eq!(c.encode(&json!({"a": 1, "b": 2})), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn imap_maps_both_directions() {
        // cents on the wire, dollars in memory
        let c = Codec::new(number()).imap(
            |v| json!(v.as_f64().unwrap_or_default() / 100.0),
            |v| json!(v.as_f64().unwrap_or_default() * 100.0),
        );
        assert_eq!(c.decode(&json!(250)), Ok(json!(2.5)));
        assert_eq!(c.encode(&json!(2.5)), json!(250.0));
        assert!(c.decode(&json!("250")).is_err());
    }

    #[test]
    fn with_expected_only_changes_the_decoder_label() {
        let c = Codec::new(string()).with_expected("Name");
        let e: DecodeErrors = c.decode(&json!(1)).unwrap_err();
        assert_eq!(e.leaves()[0].expected, "Name");
        assert_eq!(c.encode(&json!("a")), json!("a"));
    }

    #[test]
    fn bridges_to_native_types() {
        let c = person();
        let p: Person = c.decode_as(&json!({"name": "a", "age": 3})).unwrap();
        assert_eq!(p, Person { name: "a".into(), age: 3 });
        assert_eq!(c.encode_from(&p).unwrap(), json!({"name": "a", "age": 3}));
    }

    #[test]
    fn bridge_reports_decode_then_deserialize_failures() {
        let c = person();
        assert!(matches!(c.decode_as::<Person>(&json!({"name": 1, "age": 3})), Err(CodecError::Decode(_))));
        // Int accepts -3 but u32 does not
        let err = c.decode_as::<Person>(&json!({"name": "a", "age": -3})).unwrap_err();
        assert!(matches!(err, CodecError::Deserialize { ref path, .. } if path == "age"));
    }
}
