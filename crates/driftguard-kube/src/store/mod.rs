//! Object store access
//!
//! The rest of the crate only talks to the cluster through [`ObjectStore`]:
//! - [`KubeStore`]: backed by a live API server through kube-rs
//! - [`MockObjectStore`]: in-memory store for tests, with scripted dry-run outcomes

mod kube_store;
mod mock;

pub use kube_store::{KubeStore, failure_from_status, from_dynamic, to_dynamic};
pub use mock::{MockObjectStore, OperationCounts};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use driftguard_core::{ApplyFailure, StructuredObject};

/// Errors returned by store reads
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Nothing is stored under the key
    #[error("{0} not found")]
    NotFound(ObjectKey),

    /// The store does not serve this kind
    #[error("no resource type {kind} in {api_version}")]
    UnknownKind { api_version: String, kind: String },

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Any other backend failure
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Address of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub api_version: String,
    pub kind: String,
    /// `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(api_version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(String::from),
            name: name.to_string(),
        }
    }

    /// Key of a namespace object
    pub fn namespace(name: &str) -> Self {
        Self::new("v1", "Namespace", None, name)
    }

    /// Key under which `object` is stored
    pub fn of(object: &StructuredObject) -> Self {
        Self::new(
            object.api_version(),
            object.kind(),
            Some(object.namespace()),
            object.name(),
        )
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Read and dry-run access to the object store
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the stored object under `key`
    async fn get(&self, key: &ObjectKey) -> Result<StructuredObject, StoreError>;

    /// Server-side apply `object` without persisting, returning the projection
    async fn dry_run_apply(&self, object: &StructuredObject) -> Result<StructuredObject, ApplyFailure>;

    /// Labels of a namespace
    async fn namespace_labels(&self, namespace: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.get(&ObjectKey::namespace(namespace))
            .await
            .map(|ns| ns.labels())
    }
}
