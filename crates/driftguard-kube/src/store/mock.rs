//! Mock object store for testing
//!
//! This store keeps objects in memory, useful for unit tests
//! without requiring a Kubernetes cluster. Dry-runs overlay the desired
//! object on the stored one, or return a scripted outcome.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use driftguard_core::{ApplyFailure, StructuredObject};

use super::{ObjectKey, ObjectStore, StoreError};

/// In-memory object store for testing
#[derive(Clone, Default)]
pub struct MockObjectStore {
    /// Stored objects
    objects: Arc<RwLock<HashMap<ObjectKey, StructuredObject>>>,
    /// Scripted dry-run outcomes, taking precedence over the overlay
    responses: Arc<RwLock<HashMap<ObjectKey, Result<StructuredObject, ApplyFailure>>>>,
    /// Reads that fail with a backend error
    broken: Arc<RwLock<HashMap<ObjectKey, String>>>,
    /// Delay added to every call
    latency: Option<Duration>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub namespace_lookups: usize,
    pub dry_runs: usize,
}

impl MockObjectStore {
    /// Create a new empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated objects
    pub fn with_objects(objects: Vec<StructuredObject>) -> Self {
        let store = Self::new();
        for object in objects {
            store.insert(object);
        }
        store
    }

    /// Add a namespace carrying `labels`
    pub fn with_namespace(self, name: &str, labels: &[(&str, &str)]) -> Self {
        let mut ns = StructuredObject::new("v1", "Namespace", "", name);
        for (k, v) in labels {
            ns.set_label(k, v);
        }
        self.insert(ns);
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store or replace an object
    pub fn insert(&self, object: StructuredObject) {
        let mut objects = self.objects.write().unwrap();
        objects.insert(ObjectKey::of(&object), object);
    }

    /// Script the dry-run outcome for the object stored under `key`
    pub fn respond(&self, key: ObjectKey, response: Result<StructuredObject, ApplyFailure>) {
        let mut responses = self.responses.write().unwrap();
        responses.insert(key, response);
    }

    /// Make reads of `key` fail with a backend error
    pub fn break_reads(&self, key: ObjectKey, message: &str) {
        let mut broken = self.broken.write().unwrap();
        broken.insert(key, message.to_string());
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        let mut ops = self.operations.write().unwrap();
        *ops = OperationCounts::default();
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn read(&self, key: &ObjectKey) -> Result<StructuredObject, StoreError> {
        if let Some(message) = self.broken.read().unwrap().get(key) {
            return Err(StoreError::Backend(message.clone()));
        }

        self.objects
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn get(&self, key: &ObjectKey) -> Result<StructuredObject, StoreError> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.gets += 1;
        }
        self.delay().await;
        self.read(key)
    }

    async fn namespace_labels(&self, namespace: &str) -> Result<BTreeMap<String, String>, StoreError> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.namespace_lookups += 1;
        }
        self.delay().await;
        self.read(&ObjectKey::namespace(namespace))
            .map(|ns| ns.labels())
    }

    async fn dry_run_apply(&self, object: &StructuredObject) -> Result<StructuredObject, ApplyFailure> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.dry_runs += 1;
        }
        self.delay().await;

        let key = ObjectKey::of(object);
        if let Some(response) = self.responses.read().unwrap().get(&key) {
            return response.clone();
        }

        let stored = self.objects.read().unwrap().get(&key).cloned();
        match stored {
            Some(existing) => {
                let mut merged = existing.to_value();
                overlay(&mut merged, &object.to_value());
                let mut projection = StructuredObject::from_value(merged).map_err(|e| {
                    ApplyFailure::Other {
                        reason: String::new(),
                        message: e.to_string(),
                    }
                })?;
                projection.set_resource_version(existing.resource_version());
                Ok(projection)
            }
            None => {
                let mut projection = object.clone();
                projection.remove_metadata_entry("resourceVersion");
                Ok(projection)
            }
        }
    }
}

/// Recursively overlay `desired` onto `base`; mappings merge, everything else is replaced
fn overlay(base: &mut JsonValue, desired: &JsonValue) {
    match (base, desired) {
        (JsonValue::Object(base_map), JsonValue::Object(desired_map)) => {
            for (key, value) in desired_map {
                match base_map.get_mut(key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, desired) => *base = desired.clone(),
    }
}
