//! Wire encoders and decoders.
//!
//! A codec is registered per MIME-type name in a
//! [`ContentTypeRegistry`](super::ContentTypeRegistry). Bodies travel through
//! the pipeline as [`serde_json::Value`]; typed access happens in
//! [`Input::body`](crate::input::Input::body) via `serde_json::from_value`.

use serde_json::Value;
use thiserror::Error;

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_YAML: &str = "application/yaml";
pub const TEXT_PLAIN: &str = "text/plain";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("failed to encode body: {0}")]
    Encode(String),
    #[error("failed to decode body: {0}")]
    Decode(String),
}

/// Serializes a response value into a byte sink.
pub trait Encoder: Send + Sync {
    fn encode(&self, sink: &mut Vec<u8>, value: &Value) -> Result<(), CodecError>;
}

/// Parses a request body into a value.
pub trait Decoder: Send + Sync {
    fn decode(&self, source: &[u8]) -> Result<Value, CodecError>;

    /// Decode with the request's full `Content-Type` value at hand, for
    /// formats that carry parameters such as a multipart boundary.
    fn decode_as(&self, _content_type: &str, source: &[u8]) -> Result<Value, CodecError> {
        self.decode(source)
    }
}

/// `application/json` via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Encoder for JsonCodec {
    fn encode(&self, sink: &mut Vec<u8>, value: &Value) -> Result<(), CodecError> {
        serde_json::to_writer(sink, value).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

impl Decoder for JsonCodec {
    fn decode(&self, source: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(source).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// `application/yaml` via `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Encoder for YamlCodec {
    fn encode(&self, sink: &mut Vec<u8>, value: &Value) -> Result<(), CodecError> {
        let text = serde_yaml::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))?;
        sink.extend_from_slice(text.as_bytes());
        Ok(())
    }
}

impl Decoder for YamlCodec {
    fn decode(&self, source: &[u8]) -> Result<Value, CodecError> {
        serde_yaml::from_slice(source).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// `text/plain`. Strings are written verbatim; any other value as its JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Encoder for TextCodec {
    fn encode(&self, sink: &mut Vec<u8>, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::String(s) => sink.extend_from_slice(s.as_bytes()),
            other => sink.extend_from_slice(other.to_string().as_bytes()),
        }
        Ok(())
    }
}

impl Decoder for TextCodec {
    fn decode(&self, source: &[u8]) -> Result<Value, CodecError> {
        std::str::from_utf8(source)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}
