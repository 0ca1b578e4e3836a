//! Unstructured object snapshots
//!
//! A `StructuredObject` is a read-only view of one stored object (or of a
//! dry-run projection of it) kept as a plain JSON tree, so arbitrary kinds,
//! including custom resources, flow through the same code.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};

/// Kind whose data must never be shown
pub const SECRET_KIND: &str = "Secret";

/// Field-ownership bookkeeping maintained by the store under `metadata`
pub const MANAGED_FIELDS: &str = "managedFields";

/// Unstructured object with typed accessors for the well-known fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredObject {
    object: Map<String, JsonValue>,
}

impl StructuredObject {
    /// Create a minimal object with type and identity set
    pub fn new(api_version: &str, kind: &str, namespace: &str, name: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), JsonValue::from(name));
        if !namespace.is_empty() {
            metadata.insert("namespace".to_string(), JsonValue::from(namespace));
        }

        let mut object = Map::new();
        object.insert("apiVersion".to_string(), JsonValue::from(api_version));
        object.insert("kind".to_string(), JsonValue::from(kind));
        object.insert("metadata".to_string(), JsonValue::Object(metadata));

        Self { object }
    }

    /// Wrap a JSON value; it must be an object carrying a kind
    pub fn from_value(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(object) => {
                let obj = Self { object };
                if obj.kind().is_empty() {
                    return Err(CoreError::InvalidObject {
                        message: "object is missing 'kind'".to_string(),
                    });
                }
                Ok(obj)
            }
            other => Err(CoreError::InvalidObject {
                message: format!("expected a mapping, found {}", type_name(&other)),
            }),
        }
    }

    /// Parse a single YAML document
    pub fn from_yaml(doc: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(doc)?;
        Self::from_value(value)
    }

    /// Parse a multi-document YAML manifest, skipping empty documents
    pub fn parse_manifest(manifest: &str) -> Result<Vec<Self>> {
        let mut objects = Vec::new();

        for (index, doc) in serde_yaml::Deserializer::from_str(manifest).enumerate() {
            let value = JsonValue::deserialize(doc).map_err(|e| {
                CoreError::Serialization(format!("document {}: {}", index, e))
            })?;
            if value.is_null() {
                continue;
            }
            objects.push(Self::from_value(value)?);
        }

        Ok(objects)
    }

    /// Borrow the underlying tree
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.object
    }

    /// Clone the object into a JSON value
    pub fn to_value(&self) -> JsonValue {
        JsonValue::Object(self.object.clone())
    }

    /// Consume the object into a JSON value
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.object)
    }

    pub fn api_version(&self) -> &str {
        self.str_field("apiVersion")
    }

    pub fn kind(&self) -> &str {
        self.str_field("kind")
    }

    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    /// Namespace, empty for cluster-scoped objects
    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    /// Opaque version token, empty when the object was never persisted
    pub fn resource_version(&self) -> &str {
        self.metadata_str("resourceVersion")
    }

    pub fn is_secret(&self) -> bool {
        self.kind() == SECRET_KIND
    }

    /// Labels as a string map (non-string values are ignored)
    pub fn labels(&self) -> BTreeMap<String, String> {
        string_map(self.metadata_entry("labels"))
    }

    /// Annotations as a string map (non-string values are ignored)
    pub fn annotations(&self) -> BTreeMap<String, String> {
        string_map(self.metadata_entry("annotations"))
    }

    /// Raw entry under `metadata`
    pub fn metadata_entry(&self, key: &str) -> Option<&JsonValue> {
        self.metadata().and_then(|m| m.get(key))
    }

    /// Raw top-level field
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.object.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut JsonValue> {
        self.object.get_mut(name)
    }

    pub fn set_field(&mut self, name: &str, value: JsonValue) {
        self.object.insert(name.to_string(), value);
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        self.metadata_mut()
            .insert("namespace".to_string(), JsonValue::from(namespace));
    }

    pub fn set_resource_version(&mut self, version: &str) {
        self.metadata_mut()
            .insert("resourceVersion".to_string(), JsonValue::from(version));
    }

    pub fn set_label(&mut self, key: &str, value: &str) {
        self.metadata_map_mut("labels")
            .insert(key.to_string(), JsonValue::from(value));
    }

    pub fn set_annotation(&mut self, key: &str, value: &str) {
        self.metadata_map_mut("annotations")
            .insert(key.to_string(), JsonValue::from(value));
    }

    /// Builder form of [`Self::set_field`]
    pub fn with_field(mut self, name: &str, value: JsonValue) -> Self {
        self.set_field(name, value);
        self
    }

    /// Builder form of [`Self::set_label`]
    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.set_label(key, value);
        self
    }

    /// Builder form of [`Self::set_resource_version`]
    pub fn with_resource_version(mut self, version: &str) -> Self {
        self.set_resource_version(version);
        self
    }

    /// Remove an entry from `metadata`, returning it
    pub fn remove_metadata_entry(&mut self, key: &str) -> Option<JsonValue> {
        self.object
            .get_mut("metadata")
            .and_then(JsonValue::as_object_mut)
            .and_then(|m| m.remove(key))
    }

    /// Identity used in messages and change sets
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            kind: self.kind().to_string(),
            namespace: Some(self.namespace())
                .filter(|ns| !ns.is_empty())
                .map(String::from),
            name: self.name().to_string(),
        }
    }

    fn metadata(&self) -> Option<&Map<String, JsonValue>> {
        self.object.get("metadata").and_then(JsonValue::as_object)
    }

    fn metadata_mut(&mut self) -> &mut Map<String, JsonValue> {
        let entry = self
            .object
            .entry("metadata")
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !entry.is_object() {
            *entry = JsonValue::Object(Map::new());
        }
        match entry {
            JsonValue::Object(map) => map,
            _ => unreachable!("metadata was just normalized to a mapping"),
        }
    }

    fn metadata_map_mut(&mut self, key: &str) -> &mut Map<String, JsonValue> {
        let entry = self
            .metadata_mut()
            .entry(key)
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !entry.is_object() {
            *entry = JsonValue::Object(Map::new());
        }
        match entry {
            JsonValue::Object(map) => map,
            _ => unreachable!("metadata entry was just normalized to a mapping"),
        }
    }

    fn str_field(&self, key: &str) -> &str {
        self.object
            .get(key)
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
    }

    fn metadata_str(&self, key: &str) -> &str {
        self.metadata_entry(key)
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
    }
}

impl TryFrom<JsonValue> for StructuredObject {
    type Error = CoreError;

    fn try_from(value: JsonValue) -> Result<Self> {
        Self::from_value(value)
    }
}

impl fmt::Display for StructuredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.object_ref().fmt(f)
    }
}

/// Identity of an object: `Kind/namespace/name`, or `Kind/name` when cluster-scoped
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

fn string_map(value: Option<&JsonValue>) -> BTreeMap<String, String> {
    value
        .and_then(JsonValue::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}
