use crate::error::{DeserializationError, SerializationError};
use serde_json::Value;
use std::io;

/// Output sink a serialization strategy writes into.
///
/// Wraps the slot's reusable output buffer: the pipeline clears it before each
/// request but keeps its capacity, so steady-state serialization does not
/// allocate for the buffer itself.
#[derive(Debug)]
pub struct Serializer<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> Serializer<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    /// Reserve room for at least `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Append the compact JSON encoding of `value`.
    pub fn put_json(&mut self, value: &Value) -> Result<(), SerializationError> {
        serde_json::to_writer(&mut *self.buf, value)?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.buf
    }
}

impl io::Write for Serializer<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Encodes a domain value into response bytes.
pub trait SerializationStrategy: Send + Sync {
    /// Write the encoding of `value` into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] when `value` cannot be encoded by this
    /// strategy (for example a streaming strategy handed a non-array value).
    fn serialize(&self, value: &Value, out: &mut Serializer<'_>) -> Result<(), SerializationError>;

    /// Whether the encoded size is unbounded.
    ///
    /// Streaming output is framed with chunked transfer encoding instead of a
    /// fixed `Content-Length`.
    fn is_streaming(&self) -> bool;

    /// Best-effort hint used to pre-size the output buffer. Need not be exact.
    fn estimated_serialized_size_in_bytes(&self, value: &Value) -> usize;

    /// `Content-Type` of the encoded output, if any.
    fn media_type(&self) -> Option<&'static str> {
        None
    }
}

/// Decodes raw request bytes into a domain value.
pub trait DeserializationStrategy: Send + Sync {
    /// # Errors
    ///
    /// Returns [`DeserializationError`] on malformed input.
    fn deserialize(&self, raw: &[u8]) -> Result<Value, DeserializationError>;
}

/// Serialization strategy for endpoints with empty response bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSerialization;

impl SerializationStrategy for NoOpSerialization {
    fn serialize(
        &self,
        _value: &Value,
        _out: &mut Serializer<'_>,
    ) -> Result<(), SerializationError> {
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        false
    }

    fn estimated_serialized_size_in_bytes(&self, _value: &Value) -> usize {
        0
    }
}

/// Deserialization strategy for endpoints that ignore the request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDeserialization;

impl DeserializationStrategy for NoOpDeserialization {
    fn deserialize(&self, _raw: &[u8]) -> Result<Value, DeserializationError> {
        Ok(Value::Null)
    }
}

/// Shared no-op serialization instance.
pub static NO_OP_SERIALIZATION: NoOpSerialization = NoOpSerialization;

/// Shared no-op deserialization instance.
pub static NO_OP_DESERIALIZATION: NoOpDeserialization = NoOpDeserialization;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_no_op_serialization_writes_nothing() {
        let mut buf = Vec::new();
        let mut out = Serializer::new(&mut buf);
        let value = json!({"ignored": true});

        NO_OP_SERIALIZATION.serialize(&value, &mut out).unwrap();

        assert!(out.is_empty());
        assert!(!NO_OP_SERIALIZATION.is_streaming());
        assert_eq!(NO_OP_SERIALIZATION.estimated_serialized_size_in_bytes(&value), 0);
        assert_eq!(NO_OP_SERIALIZATION.media_type(), None);
    }

    #[test]
    fn test_no_op_deserialization_ignores_body() {
        let value = NO_OP_DESERIALIZATION.deserialize(b"{not json").unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_serializer_appends() {
        let mut buf = b"x".to_vec();
        let mut out = Serializer::new(&mut buf);
        out.put_str("ab");
        out.put_bytes(b"cd");
        write!(out, "{}", 7).unwrap();
        out.put_json(&json!([1])).unwrap();
        assert_eq!(out.as_bytes(), b"xabcd7[1]");
        assert_eq!(out.len(), 9);
    }
}
