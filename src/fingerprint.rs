//! Content fingerprints for change detection.
//!
//! The digest is SHA-256 over the compact encoding of the normalized
//! document, so object key order does not affect it. It detects drift
//! between payloads; it is not a security boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::{encode_document, normalize, Document};

/// Fixed-length digest of a document's canonical content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Fingerprint(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid fingerprint: {s}")))
    }
}

/// Canonical byte encoding: sorted object keys, no whitespace.
pub fn canonical_bytes(doc: &Document) -> Vec<u8> {
    encode_document(&normalize(doc))
}

/// Compute the fingerprint of a document.
pub fn fingerprint(doc: &Document) -> Fingerprint {
    Fingerprint(Sha256::digest(canonical_bytes(doc)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_matter() {
        let a = json!({ "name": "rule", "tags": ["x", "y"], "meta": { "b": 1, "a": 2 } });
        let b = json!({ "meta": { "a": 2, "b": 1 }, "tags": ["x", "y"], "name": "rule" });
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn array_order_matters() {
        let a = json!({ "tags": ["x", "y"] });
        let b = json!({ "tags": ["y", "x"] });
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn null_differs_from_absent_and_empty() {
        let absent = json!({});
        let null = json!({ "value": null });
        let empty = json!({ "value": "" });
        assert_ne!(fingerprint(&absent), fingerprint(&null));
        assert_ne!(fingerprint(&null), fingerprint(&empty));
    }

    #[test]
    fn known_digest_of_empty_object() {
        // sha256("{}")
        assert_eq!(
            fingerprint(&json!({})).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn hex_round_trip() {
        let fp = fingerprint(&json!({ "a": 1 }));
        assert_eq!(Fingerprint::from_hex(&fp.to_hex()), Some(fp));
        assert_eq!(Fingerprint::from_hex("abc"), None);
    }

    #[test]
    fn serializes_as_hex_string() {
        let fp = fingerprint(&json!([]));
        let encoded = serde_json::to_value(fp).unwrap();
        assert_eq!(encoded.as_str().unwrap().len(), 64);
    }
}
