//! SIEM payload shaping
//!
//! Turns user-authored JSON documents describing detection rules, exception
//! containers and exception items into request payloads for the Kibana
//! detection engine API, and decodes responses back into documents.
//!
//! Documents are handled as `serde_json::Value` trees: fields this crate does
//! not understand are carried through unchanged, in their original order and
//! with numbers in their original textual form.
//!
//! # Example
//!
//! ```
//! use siem_payload::{prepare, Operation, PrepareOptions, ResourceKind};
//! use serde_json::json;
//!
//! let rule = json!({
//!     "rule_id": "7CE764F6",
//!     "name": "Suspicious login",
//!     "threshold": { "field": [], "value": 10 },
//!     "risk_score_mapping": [{ "field": "risk", "operator": "equals", "value": "" }]
//! });
//!
//! let options = PrepareOptions::new(ResourceKind::DetectionRule, Operation::Update)
//!     .tracked_id("0b1f6c1e")
//!     .exception_list("c-1", "trusted-hosts", "detection");
//! let payload = prepare(rule, &options).unwrap();
//!
//! // An empty threshold field list is dropped before sending
//! assert!(payload.get("threshold").is_none());
//! // The document carries rule_id, so the tracked id is not injected
//! assert!(payload.get("id").is_none());
//! // The exception container is linked
//! assert_eq!(payload["exceptions_list"][0]["namespace_type"], "single");
//! // Empty strings the rules don't target are kept
//! assert_eq!(payload["risk_score_mapping"][0]["value"], "");
//! ```
//!
//! # Payload Rules
//!
//! | Rule | Condition | Effect |
//! |------|-----------|--------|
//! | Empty threshold | `threshold.field` absent or `[]` | remove `threshold` |
//! | Exception reference | container id, list id and type all given | append to `exceptions_list` |
//! | Identifier override | update, provider id key absent | set `id` to the tracked id |

mod document;
mod error;
mod fingerprint;
mod flexible;
mod orchestrator;
mod resource;
mod store;
mod surgery;
mod transport;
mod types;

pub use document::{
    decode_content, decode_document, decode_document_str, encode_document,
    encode_document_pretty, load_document, normalize, Document,
};
pub use error::{DecodeError, InvariantViolation, PayloadError, StoreError, TransportError};
pub use fingerprint::{canonical_bytes, fingerprint, Fingerprint};
pub use flexible::{decode_flexible_list, decode_flexible_list_at, FlexibleList};
pub use orchestrator::{
    accept_response, check_entry_values, inject_exception_reference, override_identifier,
    prepare, prepare_batch, prepare_document, strip_empty_threshold,
};
pub use resource::ResourceClient;
pub use store::{FileStore, MemoryStore, StateStore, StoredResource};
pub use surgery::{has_key, has_path, map_array, remove_keys};
pub use transport::{ClientConfig, Transport, DEFAULT_TIMEOUT_SECS};
pub use types::{
    json_type_name, ExceptionReference, FieldSet, Operation, PrepareOptions, ResourceKind,
};

#[cfg(feature = "remote")]
pub use transport::HttpTransport;
