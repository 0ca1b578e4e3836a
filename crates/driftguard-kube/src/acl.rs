//! Cross-namespace reference authorization
//!
//! Wraps the pure decision of [`AccessRequest`] with the one store read it
//! needs: the labels of the requesting namespace, fetched only when the
//! reference leaves that namespace and a policy exists.

use std::time::Duration;
use tracing::{debug, instrument};

use driftguard_core::{AccessCheck, AccessPolicy, AccessRequest};

use crate::error::{KubeError, Result};
use crate::manager::deadline;
use crate::options::DEFAULT_TIMEOUT;
use crate::store::{ObjectKey, ObjectStore};

/// Authorizes references across namespaces
pub struct Authorization<S> {
    store: S,
    timeout: Duration,
}

impl<S: ObjectStore> Authorization<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound the namespace lookup by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check whether an object in `object_namespace` may reference
    /// `reference_namespace/reference_name`
    ///
    /// Returns `Ok(true)` when access is granted. Refusals are
    /// [`CoreError::AccessDenied`](driftguard_core::CoreError::AccessDenied).
    #[instrument(skip(self, policy))]
    pub async fn has_access_to_ref(
        &self,
        object_namespace: &str,
        reference_namespace: &str,
        reference_name: &str,
        policy: Option<&AccessPolicy>,
    ) -> Result<bool> {
        let request = AccessRequest::new(object_namespace, reference_namespace, reference_name);

        let policy = match request.precheck(policy)? {
            AccessCheck::Granted => {
                debug!("same namespace reference");
                return Ok(true);
            }
            AccessCheck::NeedsLabels(policy) => policy,
        };

        let key = ObjectKey::namespace(object_namespace);
        let labels = deadline(
            self.timeout,
            "namespace lookup",
            &key,
            self.store.namespace_labels(object_namespace),
        )
        .await?
        .map_err(|source| KubeError::LookupFailure {
            object: key.to_string(),
            source,
        })?;

        let granted = request.authorize(policy, &labels)?;
        debug!(reference = %request.reference(), "access granted");
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockObjectStore;
    use driftguard_core::CoreError;
    use std::collections::BTreeMap;

    fn policy(selectors: &[&[(&str, &str)]]) -> AccessPolicy {
        AccessPolicy::from_selectors(selectors.iter().map(|s| {
            s.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        }))
    }

    fn store() -> MockObjectStore {
        MockObjectStore::new()
            .with_namespace("apps", &[("tenant", "a"), ("env", "prod")])
            .with_namespace("sandbox", &[("tenant", "b")])
    }

    #[tokio::test]
    async fn test_same_namespace_skips_lookup() {
        let store = store();
        let auth = Authorization::new(store.clone());

        assert!(auth.has_access_to_ref("apps", "apps", "repo", None).await.unwrap());
        assert!(auth.has_access_to_ref("apps", "", "repo", None).await.unwrap());
        assert_eq!(store.operation_counts().namespace_lookups, 0);
    }

    #[tokio::test]
    async fn test_missing_policy_denied_without_lookup() {
        let store = store();
        let auth = Authorization::new(store.clone());

        let err = auth
            .has_access_to_ref("apps", "shared", "repo", None)
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
        insta::assert_snapshot!(
            err.to_string(),
            @"'shared/repo' can't be accessed from namespace 'apps': missing ACL on reference"
        );
        assert_eq!(store.operation_counts().namespace_lookups, 0);
    }

    #[tokio::test]
    async fn test_matching_selector_grants() {
        let store = store();
        let auth = Authorization::new(store.clone());
        let acl = policy(&[&[("tenant", "c")], &[("tenant", "a"), ("env", "prod")]]);

        let granted = auth
            .has_access_to_ref("apps", "shared", "repo", Some(&acl))
            .await
            .unwrap();
        assert!(granted);
        assert_eq!(store.operation_counts().namespace_lookups, 1);
    }

    #[tokio::test]
    async fn test_mismatch_denied() {
        let auth = Authorization::new(store());
        let acl = policy(&[&[("tenant", "a")]]);

        let err = auth
            .has_access_to_ref("sandbox", "shared", "repo", Some(&acl))
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
        let message = err.to_string();
        assert!(message.contains("shared/repo"));
        assert!(message.contains("'sandbox'"));
    }

    #[tokio::test]
    async fn test_missing_namespace_is_lookup_failure() {
        let auth = Authorization::new(store());
        let acl = policy(&[&[("tenant", "a")]]);

        let err = auth
            .has_access_to_ref("ghost", "shared", "repo", Some(&acl))
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::LookupFailure { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_selector() {
        let auth = Authorization::new(store());
        let acl = policy(&[&[("-bad", "a")]]);

        let err = auth
            .has_access_to_ref("apps", "shared", "repo", Some(&acl))
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::Core(CoreError::Selector { .. })));
    }

    #[tokio::test]
    async fn test_slow_lookup_times_out() {
        let store = store().with_latency(Duration::from_millis(500));
        let auth = Authorization::new(store).with_timeout(Duration::from_millis(20));
        let acl = policy(&[&[("tenant", "a")]]);

        let err = auth
            .has_access_to_ref("apps", "shared", "repo", Some(&acl))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
