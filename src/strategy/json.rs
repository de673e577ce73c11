use super::core::{DeserializationStrategy, SerializationStrategy, Serializer};
use crate::error::{DeserializationError, SerializationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

const APPLICATION_JSON: &str = "application/json";
const APPLICATION_JSON_LINES: &str = "application/x-ndjson";

/// Rough size of the compact JSON encoding of `value`.
///
/// Walks the value shape without encoding it. Numbers are counted as eight
/// bytes and escapes are ignored, so the result is a hint, not a bound.
#[must_use]
pub fn estimate_json_size(value: &Value) -> usize {
    match value {
        Value::Null => 4,
        Value::Bool(b) => {
            if *b {
                4
            } else {
                5
            }
        }
        Value::Number(_) => 8,
        Value::String(s) => s.len() + 2,
        Value::Array(items) => {
            let inner: usize = items.iter().map(estimate_json_size).sum();
            inner + items.len().saturating_sub(1) + 2
        }
        Value::Object(map) => {
            let inner: usize = map
                .iter()
                .map(|(k, v)| k.len() + 3 + estimate_json_size(v))
                .sum();
            inner + map.len().saturating_sub(1) + 2
        }
    }
}

/// Compact JSON with a fixed `Content-Length`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerialization;

impl SerializationStrategy for JsonSerialization {
    fn serialize(&self, value: &Value, out: &mut Serializer<'_>) -> Result<(), SerializationError> {
        out.put_json(value)
    }

    fn is_streaming(&self) -> bool {
        false
    }

    fn estimated_serialized_size_in_bytes(&self, value: &Value) -> usize {
        estimate_json_size(value)
    }

    fn media_type(&self) -> Option<&'static str> {
        Some(APPLICATION_JSON)
    }
}

/// Newline-delimited JSON: each element of an array result on its own line.
///
/// Result sets of unbounded size are sent with chunked framing. `null` encodes
/// as an empty stream; any other non-array value is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesSerialization;

impl SerializationStrategy for JsonLinesSerialization {
    fn serialize(&self, value: &Value, out: &mut Serializer<'_>) -> Result<(), SerializationError> {
        match value {
            Value::Null => Ok(()),
            Value::Array(items) => {
                for item in items {
                    out.put_json(item)?;
                    out.put_bytes(b"\n");
                }
                Ok(())
            }
            other => Err(SerializationError::new(format!(
                "json lines output needs an array, got {}",
                value_kind(other)
            ))),
        }
    }

    fn is_streaming(&self) -> bool {
        true
    }

    fn estimated_serialized_size_in_bytes(&self, value: &Value) -> usize {
        match value {
            Value::Array(items) => items.iter().map(|v| estimate_json_size(v) + 1).sum(),
            _ => 0,
        }
    }

    fn media_type(&self) -> Option<&'static str> {
        Some(APPLICATION_JSON_LINES)
    }
}

/// Any well-formed JSON document; an empty body decodes to `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeserialization;

impl DeserializationStrategy for JsonDeserialization {
    fn deserialize(&self, raw: &[u8]) -> Result<Value, DeserializationError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(raw)?)
    }
}

/// JSON body that must decode into `T`.
///
/// The body is parsed into `T` (so missing fields and wrong types are
/// rejected as malformed input) and handed on as the normalized value.
pub struct TypedJsonDeserialization<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedJsonDeserialization<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedJsonDeserialization<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TypedJsonDeserialization<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedJsonDeserialization")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> DeserializationStrategy for TypedJsonDeserialization<T>
where
    T: DeserializeOwned + Serialize,
{
    fn deserialize(&self, raw: &[u8]) -> Result<Value, DeserializationError> {
        let typed: T = serde_json::from_slice(raw)?;
        Ok(serde_json::to_value(typed)?)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct CreateNode {
        name: String,
        weight: u32,
    }

    #[test]
    fn test_estimate_is_close_for_flat_object() {
        let value = json!({"name": "neo", "ok": true});
        let mut buf = Vec::new();
        JsonSerialization
            .serialize(&value, &mut Serializer::new(&mut buf))
            .unwrap();
        let estimate = estimate_json_size(&value);
        assert_eq!(estimate, buf.len());
    }

    #[test]
    fn test_json_lines_rejects_scalars() {
        let mut buf = Vec::new();
        let err = JsonLinesSerialization
            .serialize(&json!(42), &mut Serializer::new(&mut buf))
            .unwrap_err();
        assert!(err.message().contains("number"));
    }

    #[test]
    fn test_json_lines_null_is_empty_stream() {
        let mut buf = Vec::new();
        JsonLinesSerialization
            .serialize(&Value::Null, &mut Serializer::new(&mut buf))
            .unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_json_deserialization_blank_body() {
        assert_eq!(JsonDeserialization.deserialize(b"").unwrap(), Value::Null);
        assert_eq!(JsonDeserialization.deserialize(b" \r\n").unwrap(), Value::Null);
    }

    #[test]
    fn test_typed_json_rejects_missing_field() {
        let strategy = TypedJsonDeserialization::<CreateNode>::new();
        assert!(strategy.deserialize(br#"{"name":"a"}"#).is_err());

        let value = strategy
            .deserialize(br#"{"name":"a","weight":3,"extra":1}"#)
            .unwrap();
        assert_eq!(value, json!({"name": "a", "weight": 3}));
    }
}
