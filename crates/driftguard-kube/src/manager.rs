//! Drift evaluation against the object store
//!
//! For each object the manager fetches what is stored, dry-runs the desired
//! state and turns the pair into a [`ChangeSetEntry`]:
//! - nothing stored, or a projection without resourceVersion: created
//! - drift in labels, annotations or tracked fields: configured, with a diff
//! - otherwise: unchanged
//!
//! Every store call is bounded by the configured timeout. Nothing is retried.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use driftguard_core::{
    ChangeSet, ChangeSetEntry, CoreError, DiffRenderer, StructuredObject, classify_apply_error,
    evaluate_change,
};

use crate::error::{KubeError, Result};
use crate::options::ManagerOptions;
use crate::store::{ObjectKey, ObjectStore, StoreError};

/// Resource manager computing change sets through an object store
pub struct ResourceManager<S> {
    store: S,
    options: ManagerOptions,
    renderer: DiffRenderer,
}

impl<S: ObjectStore> ResourceManager<S> {
    /// Create a new ResourceManager
    pub fn new(store: S, options: ManagerOptions) -> Self {
        let renderer = options.renderer();
        Self {
            store,
            options,
            renderer,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Decide what applying `object` would do
    #[instrument(skip_all, fields(object = %object))]
    pub async fn diff(&self, object: &StructuredObject) -> Result<ChangeSetEntry> {
        let key = ObjectKey::of(object);

        debug!("fetching existing object");
        let existing = match deadline(self.options.timeout, "fetch", object, self.store.get(&key)).await? {
            Ok(existing) => existing,
            Err(StoreError::NotFound(_)) => object.clone(),
            Err(source) => {
                warn!(error = %source, "existing object could not be fetched");
                return Err(KubeError::LookupFailure {
                    object: key.to_string(),
                    source,
                });
            }
        };

        debug!("dry-run apply");
        let projection = deadline(
            self.options.timeout,
            "dry-run apply",
            object,
            self.store.dry_run_apply(object),
        )
        .await?
        .map_err(|failure| CoreError::from(classify_apply_error(object, failure)))?;

        let entry = evaluate_change(&existing, &projection, &self.renderer)?;
        info!(subject = %entry.subject, action = %entry.action, "evaluated");
        Ok(entry)
    }

    /// Diff each object in order, stopping at the first error
    pub async fn diff_all(&self, objects: &[StructuredObject]) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();
        for object in objects {
            changes.add(self.diff(object).await?);
        }
        Ok(changes)
    }
}

/// Bound a store call by `after`
pub(crate) async fn deadline<F, T>(
    after: Duration,
    operation: &str,
    object: &(dyn fmt::Display + Sync),
    call: F,
) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(after, call)
        .await
        .map_err(|_| KubeError::Timeout {
            operation: operation.to_string(),
            object: object.to_string(),
            after,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockObjectStore;
    use driftguard_core::{Action, ApplyFailure, InvalidCause};
    use serde_json::json;

    fn deployment(replicas: i64) -> StructuredObject {
        StructuredObject::new("apps/v1", "Deployment", "default", "web")
            .with_field("spec", json!({"replicas": replicas}))
    }

    fn stored_deployment() -> StructuredObject {
        deployment(3)
            .with_resource_version("41")
            .with_field(
                "spec",
                json!({"replicas": 3, "revisionHistoryLimit": 10, "progressDeadlineSeconds": 600}),
            )
            .with_field("status", json!({"readyReplicas": 3}))
    }

    fn manager(store: MockObjectStore) -> ResourceManager<MockObjectStore> {
        ResourceManager::new(store, ManagerOptions::default())
    }

    #[tokio::test]
    async fn test_unchanged_object() {
        let store = MockObjectStore::with_objects(vec![stored_deployment()]);
        let manager = manager(store.clone());

        let entry = manager.diff(&deployment(3)).await.unwrap();
        assert_eq!(entry.action, Action::Unchanged);
        assert!(entry.diff.is_none());

        let counts = store.operation_counts();
        assert_eq!(counts.gets, 1);
        assert_eq!(counts.dry_runs, 1);
    }

    #[tokio::test]
    async fn test_new_object_is_created() {
        let manager = manager(MockObjectStore::new());

        let entry = manager.diff(&deployment(3)).await.unwrap();
        assert_eq!(entry.action, Action::Created);
        assert_eq!(entry.to_string(), "Deployment/default/web created");
    }

    #[tokio::test]
    async fn test_changed_replicas_are_configured() {
        let manager = manager(MockObjectStore::with_objects(vec![stored_deployment()]));

        let entry = manager.diff(&deployment(5)).await.unwrap();
        assert_eq!(entry.action, Action::Configured);
        let diff = entry.diff.unwrap();
        assert!(diff.contains("-  replicas: 3"));
        assert!(diff.contains("+  replicas: 5"));
    }

    #[tokio::test]
    async fn test_apply_failure_is_classified() {
        let secret = StructuredObject::new("v1", "Secret", "default", "creds")
            .with_field("data", json!({"token": "c2VjcmV0"}));
        let store = MockObjectStore::new();
        store.respond(
            ObjectKey::of(&secret),
            Err(ApplyFailure::Invalid {
                reason: "Invalid".to_string(),
                cause: InvalidCause::Immutable,
                message: "data: Forbidden: field is immutable, token=c2VjcmV0".to_string(),
            }),
        );

        let err = manager(store).diff(&secret).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Secret/default/creds"));
        assert!(message.contains("secret is immutable"));
        assert!(!message.contains("c2VjcmV0"));
    }

    #[tokio::test]
    async fn test_lookup_failure_stops_before_dry_run() {
        let store = MockObjectStore::with_objects(vec![stored_deployment()]);
        store.break_reads(ObjectKey::of(&deployment(3)), "connection reset");

        let err = manager(store.clone()).diff(&deployment(3)).await.unwrap_err();
        assert!(matches!(err, KubeError::LookupFailure { .. }));
        assert!(err.to_string().contains("Deployment/default/web"));
        assert_eq!(store.operation_counts().dry_runs, 0);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = MockObjectStore::new().with_latency(Duration::from_millis(500));
        let options = ManagerOptions {
            timeout: Duration::from_millis(20),
            ..ManagerOptions::default()
        };

        let err = ResourceManager::new(store, options)
            .diff(&deployment(3))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().starts_with("fetch of Deployment/default/web timed out"));
    }

    #[tokio::test]
    async fn test_diff_all_keeps_order() {
        let store = MockObjectStore::with_objects(vec![stored_deployment()]);
        let config = StructuredObject::new("v1", "ConfigMap", "default", "settings")
            .with_field("data", json!({"mode": "fast"}));

        let changes = manager(store)
            .diff_all(&[config, deployment(3), deployment(4)])
            .await
            .unwrap();

        let actions: Vec<Action> = changes.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![Action::Created, Action::Unchanged, Action::Configured]
        );
        assert_eq!(changes.summary(), "1 created, 1 configured, 1 unchanged");
    }
}
