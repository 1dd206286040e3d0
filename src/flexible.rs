//! Fields the remote schema allows as either a single string or a list.

use std::ops::Deref;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::error::DecodeError;

/// Ordered list of strings that decodes from a bare string or an array.
///
/// Always encodes as an array, including the one-element case: `"x"` decodes
/// to `["x"]` and re-encodes as `["x"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlexibleList(Vec<String>);

impl FlexibleList {
    pub fn new(items: Vec<String>) -> Self {
        FlexibleList(items)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Deref for FlexibleList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for FlexibleList {
    fn from(items: Vec<String>) -> Self {
        FlexibleList(items)
    }
}

/// Decode a string-or-list field located at `path`.
///
/// # Errors
///
/// Returns `DecodeError::InvalidStringList` carrying the raw value for any
/// shape other than a string or an array of strings.
pub fn decode_flexible_list_at(value: &Value, path: &str) -> Result<FlexibleList, DecodeError> {
    let invalid = || DecodeError::InvalidStringList {
        path: path.to_string(),
        raw: value.to_string(),
    };

    match value {
        Value::String(s) => Ok(FlexibleList(vec![s.clone()])),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(String::from).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()
            .map(FlexibleList),
        _ => Err(invalid()),
    }
}

/// Decode a string-or-list value.
pub fn decode_flexible_list(value: &Value) -> Result<FlexibleList, DecodeError> {
    decode_flexible_list_at(value, "(root)")
}

impl<'de> Deserialize<'de> for FlexibleList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode_flexible_list(&value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for FlexibleList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
