//! Request shaping - applies the backend's payload rules before a document
//! is sent, and passes responses through untouched.
//!
//! Rules, in the order they run:
//!
//! | Rule | Applies to | Effect |
//! |------|------------|--------|
//! | Empty threshold | every kind | drop `threshold` when its `field` list is empty |
//! | Exception reference | detection rules | append `{id, list_id, type, namespace_type}` to `exceptions_list` |
//! | Identifier override | updates | set `id` to the tracked id unless the provider key is present |
//! | Entry values | exception items | every `entries[*].value` must be a string or list of strings |

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::document::{decode_document, Document};
use crate::error::{DecodeError, InvariantViolation, PayloadError};
use crate::flexible::decode_flexible_list_at;
use crate::surgery::{has_key, map_array, remove_keys};
use crate::types::{
    json_type_name, ExceptionReference, FieldSet, Operation, PrepareOptions, ResourceKind,
    EXCEPTIONS_LIST_KEY, ID_KEY, THRESHOLD_FIELD_KEY, THRESHOLD_KEY,
};

/// Shape a caller document, or a list of them, for sending.
///
/// A top-level array is shaped element by element (see [`prepare_batch`]);
/// anything else must be a single object.
///
/// # Errors
///
/// Returns `PayloadError::Decode` for malformed input and
/// `PayloadError::Invariant` if batch shaping changed the element count.
pub fn prepare(doc: Document, options: &PrepareOptions) -> Result<Document, PayloadError> {
    if doc.is_array() {
        prepare_batch(doc, options)
    } else {
        Ok(prepare_document(doc, options)?)
    }
}

/// Shape a single resource document.
///
/// # Errors
///
/// Returns `DecodeError` if the document is not an object or one of the
/// substructures the rules inspect has the wrong shape.
pub fn prepare_document(doc: Document, options: &PrepareOptions) -> Result<Document, DecodeError> {
    if !doc.is_object() {
        return Err(DecodeError::not_object(json_type_name(&doc)));
    }

    let mut doc = strip_empty_threshold(doc)?;

    match options.exception_reference() {
        Some(reference) if options.kind == ResourceKind::DetectionRule => {
            doc = inject_exception_reference(doc, &reference)?;
        }
        Some(_) => {
            warn!(
                kind = options.kind.as_str(),
                "exception reference only applies to detection rules, ignoring"
            );
        }
        None if options.has_partial_exception_reference() => {
            warn!("exception container id, list id and type must all be set, not injecting");
        }
        None => {}
    }

    if options.operation == Operation::Update {
        match &options.tracked_id {
            Some(tracked_id) => doc = override_identifier(doc, options.kind, tracked_id)?,
            None => debug!(kind = options.kind.as_str(), "update without tracked id"),
        }
    }

    if options.kind == ResourceKind::ExceptionItem {
        check_entry_values(&doc)?;
    }

    Ok(doc)
}

/// Shape every element of an array of resource documents.
///
/// The first failing element aborts the batch; its error is wrapped with the
/// element index.
///
/// # Errors
///
/// Returns `PayloadError::Decode` on the first element that fails, and
/// `PayloadError::Invariant` if the output length differs from the input.
pub fn prepare_batch(doc: Document, options: &PrepareOptions) -> Result<Document, PayloadError> {
    let expected = doc.as_array().map(Vec::len);

    let mut index = 0;
    let shaped = map_array(doc, |item| {
        let current = index;
        index += 1;
        prepare_document(item, options).map_err(|source| DecodeError::Element {
            index: current,
            source: Box::new(source),
        })
    })?;

    let actual = shaped.as_array().map(Vec::len);
    if actual != expected {
        return Err(InvariantViolation {
            operation: "prepare_batch",
            message: format!("expected {:?} elements, got {:?}", expected, actual),
        }
        .into());
    }

    Ok(shaped)
}

/// Decode a backend response.
///
/// The document is returned as received; fields this crate does not know
/// about are kept.
pub fn accept_response(bytes: &[u8]) -> Result<Document, DecodeError> {
    let doc = decode_document(bytes)?;
    debug!(bytes = bytes.len(), "decoded response");
    Ok(doc)
}

/// Drop `threshold` when its `field` list is absent or empty.
///
/// The backend rejects a threshold with no fields. A non-object `threshold`
/// is left alone.
///
/// # Errors
///
/// Returns `DecodeError::InvalidStringList` if `threshold.field` is neither
/// a string nor a list of strings.
pub fn strip_empty_threshold(doc: Document) -> Result<Document, DecodeError> {
    let Some(threshold) = doc.get(THRESHOLD_KEY).and_then(Value::as_object) else {
        return Ok(doc);
    };

    let empty = match threshold.get(THRESHOLD_FIELD_KEY) {
        None => true,
        Some(field) => decode_flexible_list_at(field, "/threshold/field")?.is_empty(),
    };

    if !empty {
        return Ok(doc);
    }

    debug!("removing threshold with empty field list");
    remove_keys(doc, &[THRESHOLD_KEY].into_iter().collect::<FieldSet>())
}

/// Append an exception reference to `exceptions_list`.
///
/// The list is created when absent or null. A reference whose `id` is
/// already listed is not added twice.
///
/// # Errors
///
/// Returns `DecodeError::UnexpectedShape` if `doc` is not an object or
/// `exceptions_list` is not an array.
pub fn inject_exception_reference(
    doc: Document,
    reference: &ExceptionReference,
) -> Result<Document, DecodeError> {
    let mut map = match doc {
        Value::Object(map) => map,
        other => return Err(DecodeError::not_object(json_type_name(&other))),
    };

    let list = map
        .entry(EXCEPTIONS_LIST_KEY)
        .or_insert_with(|| Value::Array(Vec::new()));
    if list.is_null() {
        *list = Value::Array(Vec::new());
    }

    let items = match list {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::UnexpectedShape {
                path: format!("/{}", EXCEPTIONS_LIST_KEY),
                expected: "array",
                actual: json_type_name(other),
            })
        }
    };

    let already_listed = items
        .iter()
        .any(|item| item.get(ID_KEY).and_then(Value::as_str) == Some(reference.id.as_str()));

    if already_listed {
        debug!(id = %reference.id, "exception reference already present");
    } else {
        debug!(id = %reference.id, list_id = %reference.list_id, "injecting exception reference");
        items.push(json!({
            "id": reference.id,
            "list_id": reference.list_id,
            "type": reference.list_type,
            "namespace_type": reference.namespace_type,
        }));
    }

    Ok(Value::Object(map))
}

/// Set `id` to the tracked identifier unless the document carries the
/// kind's provider identifier key.
///
/// # Errors
///
/// Returns `DecodeError::UnexpectedShape` if `doc` is not an object.
pub fn override_identifier(
    doc: Document,
    kind: ResourceKind,
    tracked_id: &str,
) -> Result<Document, DecodeError> {
    if has_key(&doc, kind.identifier_key())? {
        debug!(
            key = kind.identifier_key(),
            "document carries its own identifier, keeping it"
        );
        return Ok(doc);
    }

    match doc {
        Value::Object(mut map) => {
            map.insert(ID_KEY.to_string(), Value::String(tracked_id.to_string()));
            Ok(Value::Object(map))
        }
        other => Err(DecodeError::not_object(json_type_name(&other))),
    }
}

/// Check that every exception entry value is a string or list of strings.
///
/// Nested entries (`type: "nested"`) are checked recursively. The document
/// is not modified.
///
/// # Errors
///
/// Returns the first offending value with its JSON Pointer.
pub fn check_entry_values(doc: &Document) -> Result<(), DecodeError> {
    check_entries(doc, "")
}

fn check_entries(parent: &Value, path: &str) -> Result<(), DecodeError> {
    let entries_path = format!("{}/entries", path);
    let entries = match parent.get("entries") {
        None => return Ok(()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(DecodeError::UnexpectedShape {
                path: entries_path,
                expected: "array",
                actual: json_type_name(other),
            })
        }
    };

    for (i, entry) in entries.iter().enumerate() {
        let entry_path = format!("{}/{}", entries_path, i);
        if let Some(value) = entry.get("value") {
            decode_flexible_list_at(value, &format!("{}/value", entry_path))?;
        }
        check_entries(entry, &entry_path)?;
    }

    Ok(())
}
