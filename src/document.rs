//! Document decoding and encoding.
//!
//! A document is a `serde_json::Value`. Objects keep insertion order and
//! numbers keep their textual form, so anything the crate does not touch
//! re-encodes exactly as it was decoded.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::DecodeError;

/// An in-memory JSON value tree.
pub type Document = Value;

/// Decode a document from raw bytes.
///
/// # Errors
///
/// Returns `DecodeError::InvalidJson` if the bytes aren't valid JSON.
pub fn decode_document(bytes: &[u8]) -> Result<Document, DecodeError> {
    serde_json::from_slice(bytes).map_err(|source| DecodeError::InvalidJson { source })
}

/// Decode a document from a JSON string.
///
/// # Errors
///
/// Returns `DecodeError::InvalidJson` if the string isn't valid JSON.
pub fn decode_document_str(content: &str) -> Result<Document, DecodeError> {
    serde_json::from_str(content).map_err(|source| DecodeError::InvalidJson { source })
}

/// Decode caller-authored resource content.
///
/// Content may be the JSON text itself, or a JSON string literal wrapping
/// that text (as produced when a configuration language quotes the JSON).
/// A wrapped string is unquoted only when its contents are an object or array.
pub fn decode_content(content: &str) -> Result<Document, DecodeError> {
    let outer = decode_document_str(content)?;
    if let Value::String(inner) = &outer {
        if let Ok(doc @ (Value::Object(_) | Value::Array(_))) = decode_document_str(inner) {
            return Ok(doc);
        }
    }
    Ok(outer)
}

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `DecodeError::FileNotFound` if the file doesn't exist,
/// or `DecodeError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Document, DecodeError> {
    if !path.exists() {
        return Err(DecodeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| DecodeError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    decode_content(&content)
}

/// Encode a document to compact JSON bytes.
///
/// # Panics
///
/// Never in practice: a `Value` always has string keys, so serialization
/// cannot fail.
pub fn encode_document(doc: &Document) -> Vec<u8> {
    serde_json::to_vec(doc).expect("a JSON value with string keys always serializes")
}

/// Encode a document to indented JSON text.
pub fn encode_document_pretty(doc: &Document) -> String {
    serde_json::to_string_pretty(doc).expect("a JSON value with string keys always serializes")
}

/// Rebuild a document in canonical form.
///
/// Object keys are sorted; arrays keep their order; scalars are unchanged.
/// Two documents that differ only in object key order normalize to the
/// same tree.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(*b),
        Value::Number(n) => Value::Number(n.clone()),
        Value::String(s) => Value::String(s.clone()),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), normalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
    }
}
