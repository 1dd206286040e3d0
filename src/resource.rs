//! Resource lifecycle on top of a transport and a state store.
//!
//! Each call shapes the payload, sends it, and records what was sent so the
//! next plan can detect drift by fingerprint. Nothing is retried here.

use serde_json::Value;
use tracing::info;

use crate::document::{decode_content, Document};
use crate::error::PayloadError;
use crate::fingerprint::fingerprint;
use crate::orchestrator::prepare_document;
use crate::store::{StateStore, StoredResource};
use crate::transport::Transport;
use crate::types::{Operation, PrepareOptions, ResourceKind, ID_KEY};

/// Lifecycle client for detection rules and exception lists.
pub struct ResourceClient<T, S> {
    transport: T,
    store: S,
}

impl<T: Transport, S: StateStore> ResourceClient<T, S> {
    pub fn new(transport: T, store: S) -> Self {
        Self { transport, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a resource from caller content; returns the new id.
    ///
    /// `options.operation` is forced to `Create`. Content must be a single
    /// object; nothing is sent otherwise.
    pub fn create(&mut self, content: &str, options: &PrepareOptions) -> Result<String, PayloadError> {
        let options = PrepareOptions {
            operation: Operation::Create,
            ..options.clone()
        };
        let payload = prepare_document(decode_content(content)?, &options)?;

        info!(kind = options.kind.as_str(), "creating resource");
        let response = self.transport.post(options.kind.api_path(), &payload)?;
        let id = response_id(&response, options.kind)?;

        self.remember(options.kind, &id, payload)?;
        Ok(id)
    }

    /// Fetch the remote document for a tracked resource.
    pub fn read(&self, kind: ResourceKind, id: &str) -> Result<Document, PayloadError> {
        Ok(self.transport.get(&kind.resource_path(id))?)
    }

    /// Update a tracked resource from caller content.
    ///
    /// The tracked `id` is injected unless the content carries the kind's
    /// provider identifier.
    pub fn update(
        &mut self,
        id: &str,
        content: &str,
        options: &PrepareOptions,
    ) -> Result<Document, PayloadError> {
        let payload = self.plan_update(id, content, options)?;

        info!(kind = options.kind.as_str(), id, "updating resource");
        let response = self.transport.put(options.kind.api_path(), &payload)?;

        self.remember(options.kind, id, payload)?;
        Ok(response)
    }

    /// Delete a resource and forget its stored state.
    pub fn delete(&mut self, kind: ResourceKind, id: &str) -> Result<(), PayloadError> {
        info!(kind = kind.as_str(), id, "deleting resource");
        self.transport.delete(&kind.resource_path(id))?;
        self.store.remove(kind, id)?;
        Ok(())
    }

    /// Adopt an existing remote resource: read it and store it as the
    /// last-known state.
    pub fn import(&mut self, kind: ResourceKind, id: &str) -> Result<Document, PayloadError> {
        let remote = self.read(kind, id)?;
        self.remember(kind, id, remote.clone())?;
        Ok(remote)
    }

    /// Report whether shaping `content` for an update would send something
    /// other than the last stored payload.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::UnknownResource` when nothing is stored for `id`.
    pub fn has_drifted(
        &self,
        id: &str,
        content: &str,
        options: &PrepareOptions,
    ) -> Result<bool, PayloadError> {
        let stored = self
            .store
            .load(options.kind, id)?
            .ok_or_else(|| PayloadError::UnknownResource {
                kind: options.kind.as_str(),
                id: id.to_string(),
            })?;
        let planned = self.plan_update(id, content, options)?;
        Ok(fingerprint(&planned) != stored.fingerprint)
    }

    fn plan_update(
        &self,
        id: &str,
        content: &str,
        options: &PrepareOptions,
    ) -> Result<Document, PayloadError> {
        let options = PrepareOptions {
            operation: Operation::Update,
            tracked_id: Some(id.to_string()),
            ..options.clone()
        };
        Ok(prepare_document(decode_content(content)?, &options)?)
    }

    fn remember(&mut self, kind: ResourceKind, id: &str, document: Document) -> Result<(), PayloadError> {
        let record = StoredResource {
            kind,
            id: id.to_string(),
            fingerprint: fingerprint(&document),
            document,
        };
        self.store.save(record)?;
        Ok(())
    }
}

fn response_id(response: &Value, kind: ResourceKind) -> Result<String, PayloadError> {
    response
        .get(ID_KEY)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or(PayloadError::MissingId {
            kind: kind.as_str(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, TransportError};
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::cell::RefCell;

    /// Records requests and answers with a fixed document.
    #[derive(Default)]
    struct FakeTransport {
        requests: RefCell<Vec<(&'static str, String, Option<Document>)>>,
        reply: Document,
    }

    impl FakeTransport {
        fn replying(reply: Document) -> Self {
            Self {
                reply,
                ..Self::default()
            }
        }

        fn record(&self, method: &'static str, path: &str, body: Option<&Document>) -> Document {
            self.requests
                .borrow_mut()
                .push((method, path.to_string(), body.cloned()));
            self.reply.clone()
        }
    }

    impl Transport for FakeTransport {
        fn post(&self, path: &str, body: &Document) -> Result<Document, TransportError> {
            Ok(self.record("POST", path, Some(body)))
        }
        fn put(&self, path: &str, body: &Document) -> Result<Document, TransportError> {
            Ok(self.record("PUT", path, Some(body)))
        }
        fn get(&self, path: &str) -> Result<Document, TransportError> {
            Ok(self.record("GET", path, None))
        }
        fn delete(&self, path: &str) -> Result<Document, TransportError> {
            Ok(self.record("DELETE", path, None))
        }
    }

    fn rule() -> PrepareOptions {
        PrepareOptions::new(ResourceKind::DetectionRule, Operation::Create)
    }

    #[test]
    fn create_posts_and_stores_payload() {
        let transport = FakeTransport::replying(json!({ "id": "uuid-1", "created_by": "elastic" }));
        let mut client = ResourceClient::new(transport, MemoryStore::new());

        let content = r#"{"name":"r","threshold":{"field":[],"value":1}}"#;
        let id = client.create(content, &rule()).unwrap();
        assert_eq!(id, "uuid-1");

        let requests = client.transport.requests.borrow();
        assert_eq!(requests[0].0, "POST");
        assert_eq!(requests[0].1, "/detection_engine/rules");
        assert_eq!(requests[0].2, Some(json!({ "name": "r" })));

        let stored = client
            .store()
            .load(ResourceKind::DetectionRule, "uuid-1")
            .unwrap()
            .unwrap();
        assert_eq!(stored.document, json!({ "name": "r" }));
    }

    #[test]
    fn create_without_id_in_response_fails() {
        let mut client = ResourceClient::new(FakeTransport::replying(json!({})), MemoryStore::new());
        let result = client.create(r#"{"name":"r"}"#, &rule());
        assert!(matches!(result, Err(PayloadError::MissingId { .. })));
        assert!(client.store().is_empty());
    }

    #[test]
    fn create_rejects_array_before_sending() {
        let transport = FakeTransport::replying(json!({ "id": "uuid-1" }));
        let mut client = ResourceClient::new(transport, MemoryStore::new());

        let result = client.create(r#"[{"name":"a"},{"name":"b"}]"#, &rule());
        assert!(matches!(
            result,
            Err(PayloadError::Decode(DecodeError::UnexpectedShape { actual: "array", .. }))
        ));
        assert!(client.transport.requests.borrow().is_empty());
        assert!(client.store().is_empty());
    }

    #[test]
    fn update_rejects_array_before_sending() {
        let mut client = ResourceClient::new(FakeTransport::replying(json!({})), MemoryStore::new());
        let result = client.update("uuid-1", r#"[{"name":"a"}]"#, &rule());
        assert!(matches!(result, Err(PayloadError::Decode(_))));
        assert!(client.transport.requests.borrow().is_empty());
    }

    #[test]
    fn update_puts_tracked_id() {
        let mut client = ResourceClient::new(FakeTransport::replying(json!({})), MemoryStore::new());
        client.update("uuid-1", r#"{"name":"r"}"#, &rule()).unwrap();

        let requests = client.transport.requests.borrow();
        assert_eq!(requests[0].0, "PUT");
        assert_eq!(requests[0].2, Some(json!({ "name": "r", "id": "uuid-1" })));
    }

    #[test]
    fn drift_detection_follows_content() {
        let transport = FakeTransport::replying(json!({ "id": "uuid-1" }));
        let mut client = ResourceClient::new(transport, MemoryStore::new());
        client.update("uuid-1", r#"{"name":"r","tags":["a"]}"#, &rule()).unwrap();

        // Same content, different key order
        assert!(!client
            .has_drifted("uuid-1", r#"{"tags":["a"],"name":"r"}"#, &rule())
            .unwrap());
        assert!(client
            .has_drifted("uuid-1", r#"{"name":"r","tags":["b"]}"#, &rule())
            .unwrap());
    }

    #[test]
    fn drift_of_unknown_resource_errors() {
        let client = ResourceClient::new(FakeTransport::default(), MemoryStore::new());
        let result = client.has_drifted("missing", "{}", &rule());
        assert!(matches!(result, Err(PayloadError::UnknownResource { .. })));
    }

    #[test]
    fn delete_forgets_state() {
        let mut client = ResourceClient::new(
            FakeTransport::replying(json!({ "id": "x" })),
            MemoryStore::new(),
        );
        client.import(ResourceKind::ExceptionItem, "x").unwrap();
        assert_eq!(client.store().len(), 1);

        client.delete(ResourceKind::ExceptionItem, "x").unwrap();
        assert!(client.store().is_empty());
        let requests = client.transport.requests.borrow();
        assert_eq!(requests[1].1, "/exception_lists/items?id=x");
    }
}
