//! Deserialize with JSON-path context in error messages.
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CodecError;

/// Deserialize an already-decoded value into a native type.
pub fn from_value_with_path<T: DeserializeOwned>(value: &Value) -> Result<T, CodecError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| CodecError::Deserialize {
        path: err.path().to_string(),
        source: err.into_inner(),
    })
}

/// Parse JSON text, reporting the path of the first mismatch.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, CodecError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| CodecError::Deserialize {
        path: err.path().to_string(),
        source: err.into_inner(),
    })
}
