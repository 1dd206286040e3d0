//! Core types for payload shaping.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Local identifier key shared by every resource kind.
pub const ID_KEY: &str = "id";

/// Threshold substructure on detection rules.
pub const THRESHOLD_KEY: &str = "threshold";

/// Field list inside the threshold substructure.
pub const THRESHOLD_FIELD_KEY: &str = "field";

/// Reference list linking a rule to its exception containers.
pub const EXCEPTIONS_LIST_KEY: &str = "exceptions_list";

/// Namespace assigned to injected exception references.
pub const DEFAULT_NAMESPACE_TYPE: &str = "single";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Remote resource the payload describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    DetectionRule,
    ExceptionContainer,
    ExceptionItem,
}

impl ResourceKind {
    /// API path for create/update, relative to the API root.
    pub fn api_path(&self) -> &'static str {
        match self {
            ResourceKind::DetectionRule => "/detection_engine/rules",
            ResourceKind::ExceptionContainer => "/exception_lists",
            ResourceKind::ExceptionItem => "/exception_lists/items",
        }
    }

    /// API path addressing one resource by its local id.
    pub fn resource_path(&self, id: &str) -> String {
        format!("{}?id={}", self.api_path(), id)
    }

    /// Provider-specific identifier key carried inside the document.
    ///
    /// When present, it takes precedence over the locally tracked `id`.
    pub fn identifier_key(&self) -> &'static str {
        match self {
            ResourceKind::DetectionRule => "rule_id",
            ResourceKind::ExceptionContainer => "list_id",
            ResourceKind::ExceptionItem => "item_id",
        }
    }

    /// Stable name used in logs and state paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::DetectionRule => "detection_rule",
            ResourceKind::ExceptionContainer => "exception_container",
            ResourceKind::ExceptionItem => "exception_item",
        }
    }

    /// Parse a kind from its name or CLI alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "detection_rule" | "rule" => Some(ResourceKind::DetectionRule),
            "exception_container" | "exception_list" => Some(ResourceKind::ExceptionContainer),
            "exception_item" => Some(ResourceKind::ExceptionItem),
            _ => None,
        }
    }
}

/// Lifecycle operation a payload is shaped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
}

impl Operation {
    /// Parse an operation name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "create" => Some(Operation::Create),
            "update" => Some(Operation::Update),
            _ => None,
        }
    }
}

/// Set of top-level keys to remove from a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet(BTreeSet<String>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FieldSet(iter.into_iter().map(Into::into).collect())
    }
}

/// Reference from a detection rule to an exception container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionReference {
    pub id: String,
    pub list_id: String,
    #[serde(rename = "type")]
    pub list_type: String,
    pub namespace_type: String,
}

/// Out-of-band parameters applied while shaping a payload.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Resource kind the document describes.
    pub kind: ResourceKind,
    /// Operation the payload is sent for.
    pub operation: Operation,
    /// Locally tracked identifier, used on update.
    pub tracked_id: Option<String>,
    /// Exception container to link, by its `id`.
    pub exception_container_id: Option<String>,
    /// Exception container to link, by its `list_id`.
    pub exception_list_id: Option<String>,
    /// Exception container type (e.g. "detection").
    pub exception_type: Option<String>,
}

impl PrepareOptions {
    /// Create options with no out-of-band parameters.
    pub fn new(kind: ResourceKind, operation: Operation) -> Self {
        Self {
            kind,
            operation,
            tracked_id: None,
            exception_container_id: None,
            exception_list_id: None,
            exception_type: None,
        }
    }

    /// Set the locally tracked identifier.
    pub fn tracked_id(mut self, id: impl Into<String>) -> Self {
        self.tracked_id = Some(id.into());
        self
    }

    /// Set all three exception container parameters.
    pub fn exception_list(
        mut self,
        container_id: impl Into<String>,
        list_id: impl Into<String>,
        list_type: impl Into<String>,
    ) -> Self {
        self.exception_container_id = Some(container_id.into());
        self.exception_list_id = Some(list_id.into());
        self.exception_type = Some(list_type.into());
        self
    }

    /// Build the exception reference when every parameter is supplied.
    pub fn exception_reference(&self) -> Option<ExceptionReference> {
        match (
            &self.exception_container_id,
            &self.exception_list_id,
            &self.exception_type,
        ) {
            (Some(id), Some(list_id), Some(list_type)) => Some(ExceptionReference {
                id: id.clone(),
                list_id: list_id.clone(),
                list_type: list_type.clone(),
                namespace_type: DEFAULT_NAMESPACE_TYPE.to_string(),
            }),
            _ => None,
        }
    }

    /// True when some, but not all, exception parameters are set.
    pub fn has_partial_exception_reference(&self) -> bool {
        let set = [
            self.exception_container_id.is_some(),
            self.exception_list_id.is_some(),
            self.exception_type.is_some(),
        ];
        set.iter().any(|s| *s) && !set.iter().all(|s| *s)
    }
}
