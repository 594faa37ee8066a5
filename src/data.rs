//! Opaque payload attached to every entity, plus the codec contract used
//! to move it in and out of a persistence backend.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Domain tag on a node, edge, or component. A non-empty string code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type(String);

impl Type {
    /// Construct a `Type`, rejecting an empty code.
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        if code.is_empty() {
            return Err("type code must be non-empty".to_string());
        }
        Ok(Type(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque payload attached to every entity. The core never inspects
/// `payload` beyond moving it around and handing it to a codec; only the
/// `runtime_type_tag` is used by the core itself (for diagnostics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub runtime_type_tag: String,
    pub payload: serde_json::Value,
}

impl Data {
    pub fn new(runtime_type_tag: impl Into<String>, payload: serde_json::Value) -> Self {
        Data {
            runtime_type_tag: runtime_type_tag.into(),
            payload,
        }
    }

    /// A payload-free placeholder, useful in tests that only exercise
    /// structural behavior.
    pub fn empty() -> Self {
        Data {
            runtime_type_tag: "unit".to_string(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Serializes and deserializes a [`Data`] payload to/from an external,
/// codec-specific representation. Two canonical codecs are expected by
/// a key-value property codec and a JSON codec.
pub trait DataCodec {
    type Encoded;
    type Error: std::fmt::Debug;

    fn serialize(&self, data: &Data) -> Result<Self::Encoded, Self::Error>;
    fn deserialize(&self, encoded: Self::Encoded) -> Result<Data, Self::Error>;
}

/// JSON codec: encodes a [`Data`] as a single `serde_json::Value` object
/// carrying both the type tag and the payload.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl DataCodec for JsonCodec {
    type Encoded = serde_json::Value;
    type Error = serde_json::Error;

    fn serialize(&self, data: &Data) -> Result<Self::Encoded, Self::Error> {
        serde_json::to_value(data)
    }

    fn deserialize(&self, encoded: Self::Encoded) -> Result<Data, Self::Error> {
        serde_json::from_value(encoded)
    }
}

/// Key-value property codec: flattens a `Data` whose payload is a JSON
/// object into a `HashMap<String, String>`, matching the "entity tables
/// + side payload table" layout typical of property-graph
/// backends. Non-string/number/bool/null leaf values are rejected; nested
/// objects/arrays are not supported by this codec (use `JsonCodec` for
/// those).
#[derive(Debug, Clone, Default)]
pub struct PropertyCodec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyCodecError {
    #[error("property codec requires a flat JSON object payload")]
    NotAFlatObject,
    #[error("missing __type_tag property")]
    MissingTypeTag,
}

impl DataCodec for PropertyCodec {
    type Encoded = HashMap<String, String>;
    type Error = PropertyCodecError;

    fn serialize(&self, data: &Data) -> Result<Self::Encoded, Self::Error> {
        let obj = data
            .payload
            .as_object()
            .ok_or(PropertyCodecError::NotAFlatObject)?;
        let mut out = HashMap::with_capacity(obj.len() + 1);
        for (k, v) in obj {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(PropertyCodecError::NotAFlatObject)
                }
                other => other.to_string(),
            };
            out.insert(k.clone(), s);
        }
        out.insert("__type_tag".to_string(), data.runtime_type_tag.clone());
        Ok(out)
    }

    fn deserialize(&self, mut encoded: Self::Encoded) -> Result<Data, Self::Error> {
        let runtime_type_tag = encoded
            .remove("__type_tag")
            .ok_or(PropertyCodecError::MissingTypeTag)?;
        let map = encoded
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        Ok(Data {
            runtime_type_tag,
            payload: serde_json::Value::Object(map),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_rejects_empty_code() {
        assert!(Type::new("").is_err());
        assert!(Type::new("Person").is_ok());
    }

    #[test]
    fn json_codec_round_trips() {
        let codec = JsonCodec;
        let data = Data::new("Person", json!({"name": "Alice"}));
        let encoded = codec.serialize(&data).unwrap();
        let decoded = codec.deserialize(encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn property_codec_round_trips_flat_object() {
        let codec = PropertyCodec;
        let data = Data::new("Person", json!({"name": "Alice", "age": "30"}));
        let encoded = codec.serialize(&data).unwrap();
        let decoded = codec.deserialize(encoded).unwrap();
        assert_eq!(decoded.runtime_type_tag, "Person");
        assert_eq!(decoded.payload["name"], json!("Alice"));
    }

    #[test]
    fn property_codec_rejects_nested_payload() {
        let codec = PropertyCodec;
        let data = Data::new("Person", json!({"nested": {"a": 1}}));
        assert!(matches!(
            codec.serialize(&data),
            Err(PropertyCodecError::NotAFlatObject)
        ));
    }
}
