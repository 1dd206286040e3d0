//! Integration tests for payload shaping.

use serde_json::{json, Value};
use siem_payload::{
    decode_document, encode_document, prepare, DecodeError, Operation, PayloadError,
    PrepareOptions, ResourceKind,
};

fn rule(operation: Operation) -> PrepareOptions {
    PrepareOptions::new(ResourceKind::DetectionRule, operation)
}

// === Round trip ===

mod round_trip {
    use super::*;

    #[test]
    fn empty_string_in_nested_array_survives() {
        let text = r#"{"rule_id":"7CE764F6-36A7-4E72-AB8B-166170CD1C93","id":"testID","type":"detection","risk_score_mapping":[{"field":"risk.calculated_score_norm","operator":"equals","value":""}]}"#;
        let doc = decode_document(text.as_bytes()).unwrap();
        let payload = prepare(doc, &rule(Operation::Create)).unwrap();

        let encoded = encode_document(&payload);
        assert_eq!(String::from_utf8(encoded.clone()).unwrap(), text);

        let reparsed = decode_document(&encoded).unwrap();
        assert_eq!(reparsed["risk_score_mapping"][0]["value"], json!(""));
    }

    #[test]
    fn unknown_fields_survive_update() {
        let text = r#"{"name":"r","x_vendor":{"nested":[1.50,null,false,{"deep":""}]},"max_signals":100}"#;
        let doc = decode_document(text.as_bytes()).unwrap();
        let payload = prepare(doc, &rule(Operation::Update).tracked_id("uuid-1")).unwrap();

        assert_eq!(
            String::from_utf8(encode_document(&payload)).unwrap(),
            r#"{"name":"r","x_vendor":{"nested":[1.50,null,false,{"deep":""}]},"max_signals":100,"id":"uuid-1"}"#
        );
    }
}

// === Threshold ===

mod threshold {
    use super::*;

    #[test]
    fn empty_field_list_removed_from_encoding() {
        let doc = json!({ "type": "threshold", "threshold": { "field": [], "value": 100 } });
        let payload = prepare(doc, &rule(Operation::Create)).unwrap();
        let encoded = String::from_utf8(encode_document(&payload)).unwrap();
        assert!(!encoded.contains("threshold\":"));
        assert_eq!(payload, json!({ "type": "threshold" }));
    }

    #[test]
    fn non_empty_field_list_kept() {
        let doc = json!({
            "type": "threshold",
            "threshold": { "field": ["source.ip"], "value": 100, "cardinality": [] }
        });
        let payload = prepare(doc.clone(), &rule(Operation::Create)).unwrap();
        assert_eq!(payload, doc);
    }
}

// === Exception reference ===

mod exception_reference {
    use super::*;

    #[test]
    fn appends_exactly_one_entry() {
        let doc = json!({
            "name": "r",
            "exceptions_list": [
                { "id": "other", "list_id": "x", "type": "detection", "namespace_type": "agnostic" }
            ]
        });
        let options = rule(Operation::Create).exception_list("c-1", "trusted", "detection");
        let payload = prepare(doc, &options).unwrap();

        let list = payload["exceptions_list"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            list[1],
            json!({ "id": "c-1", "list_id": "trusted", "type": "detection", "namespace_type": "single" })
        );
        assert_eq!(list[0]["namespace_type"], "agnostic");
    }

    #[test]
    fn null_list_is_replaced() {
        let doc = json!({ "exceptions_list": null });
        let options = rule(Operation::Create).exception_list("c-1", "trusted", "detection");
        let payload = prepare(doc, &options).unwrap();
        assert_eq!(payload["exceptions_list"].as_array().unwrap().len(), 1);
    }
}

// === Identifier override ===

mod identifier_override {
    use super::*;

    #[test]
    fn provider_key_keeps_document_id() {
        let doc = json!({ "id": "caller-id", "rule_id": "R-1" });
        let payload = prepare(doc, &rule(Operation::Update).tracked_id("tracked")).unwrap();
        assert_eq!(payload["id"], "caller-id");
    }

    #[test]
    fn null_provider_key_counts_as_present() {
        let doc = json!({ "rule_id": null });
        let payload = prepare(doc, &rule(Operation::Update).tracked_id("tracked")).unwrap();
        assert!(payload.get("id").is_none());
    }

    #[test]
    fn missing_provider_key_sets_tracked_id() {
        let doc = json!({ "id": "caller-id", "name": "r" });
        let payload = prepare(doc, &rule(Operation::Update).tracked_id("tracked")).unwrap();
        assert_eq!(payload["id"], "tracked");
        // position of an existing key is kept
        let keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "name"]);
    }

    #[test]
    fn exception_container_uses_list_id() {
        let options = PrepareOptions::new(ResourceKind::ExceptionContainer, Operation::Update)
            .tracked_id("tracked");
        let kept = prepare(json!({ "list_id": "trusted" }), &options).unwrap();
        assert!(kept.get("id").is_none());

        let overridden = prepare(json!({ "rule_id": "irrelevant" }), &options).unwrap();
        assert_eq!(overridden["id"], "tracked");
    }
}

// === Batch ===

mod batch {
    use super::*;

    #[test]
    fn rules_apply_per_element() {
        let doc = json!([
            { "name": "a", "threshold": { "field": [] } },
            { "name": "b", "rule_id": "R-b" },
            { "name": "c", "exceptions_list": [{ "id": "c-1" }] }
        ]);
        let options = rule(Operation::Update)
            .tracked_id("tracked")
            .exception_list("c-1", "trusted", "detection");
        let payload = prepare(doc, &options).unwrap();
        let items = payload.as_array().unwrap();

        assert_eq!(items.len(), 3);
        assert!(items[0].get("threshold").is_none());
        assert_eq!(items[0]["id"], "tracked");
        assert!(items[1].get("id").is_none());
        assert_eq!(items[1]["exceptions_list"].as_array().unwrap().len(), 1);
        assert_eq!(items[2]["exceptions_list"], json!([{ "id": "c-1" }]));
    }

    #[test]
    fn first_failure_aborts_batch() {
        let doc = json!([{ "name": "a" }, 7, { "threshold": { "field": 1 } }]);
        let result = prepare(doc, &rule(Operation::Create));
        match result {
            Err(PayloadError::Decode(DecodeError::Element { index, source })) => {
                assert_eq!(index, 1);
                assert!(matches!(
                    *source,
                    DecodeError::UnexpectedShape { actual: "number", .. }
                ));
            }
            other => panic!("expected element error, got {:?}", other),
        }
    }

    #[test]
    fn empty_batch() {
        let payload = prepare(Value::Array(vec![]), &rule(Operation::Create)).unwrap();
        assert_eq!(payload, json!([]));
    }
}
