//! Document surgery: key removal, key probing and array mapping.
//!
//! All operations take the document by value and hand back the result, so a
//! caller never observes a half-edited tree: on error the input is dropped
//! and nothing is returned.

use serde_json::Value;

use crate::document::Document;
use crate::error::DecodeError;
use crate::types::{json_type_name, FieldSet};

/// Remove the given top-level keys from an object.
///
/// Keys not in `keys` keep their value and position. Keys that are already
/// absent are ignored.
///
/// # Errors
///
/// Returns `DecodeError::UnexpectedShape` if `doc` is not an object.
pub fn remove_keys(doc: Document, keys: &FieldSet) -> Result<Document, DecodeError> {
    let mut map = match doc {
        Value::Object(map) => map,
        other => return Err(DecodeError::not_object(json_type_name(&other))),
    };

    if !keys.is_empty() {
        map.retain(|key, _| !keys.contains(key));
    }

    Ok(Value::Object(map))
}

/// Report whether `key` is present at the top level of an object.
///
/// A key whose value is `null` is present.
///
/// # Errors
///
/// Returns `DecodeError::UnexpectedShape` if `doc` is not an object.
pub fn has_key(doc: &Document, key: &str) -> Result<bool, DecodeError> {
    doc.as_object()
        .map(|map| map.contains_key(key))
        .ok_or_else(|| DecodeError::not_object(json_type_name(doc)))
}

/// Report whether a nested key path is present.
///
/// Walks objects only; a path that runs into a non-object value before its
/// last segment is absent. An empty path is always present.
pub fn has_path(doc: &Document, path: &[&str]) -> bool {
    let mut current = doc;
    for segment in path {
        match current.get(*segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

/// Apply `transform` to every element of an array, in order.
///
/// The output has the same length and order as the input. Elements are
/// handed to the transform as-is, whatever their type. The first element
/// that fails aborts the whole call with that element's error.
///
/// # Errors
///
/// Returns `DecodeError::UnexpectedShape` if `doc` is not an array, or the
/// first error returned by `transform`.
pub fn map_array<F>(doc: Document, mut transform: F) -> Result<Document, DecodeError>
where
    F: FnMut(Document) -> Result<Document, DecodeError>,
{
    let items = match doc {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::UnexpectedShape {
                path: "(root)".to_string(),
                expected: "array",
                actual: json_type_name(&other),
            })
        }
    };

    items
        .into_iter()
        .map(&mut transform)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
