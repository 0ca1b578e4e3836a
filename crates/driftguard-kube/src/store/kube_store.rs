//! Object store backed by a Kubernetes API server
//!
//! Kinds are resolved through API discovery, so custom resources work the same
//! as built-in ones. Dry-runs use Server-Side Apply with `dryRun=All`; nothing
//! is ever persisted.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    Client,
    api::{Api, DynamicObject, Patch, PatchParams},
    core::{GroupVersionKind, TypeMeta},
    discovery::{ApiCapabilities, ApiResource, Discovery, Scope},
};
use std::collections::BTreeMap;
use tracing::debug;

use driftguard_core::{ApplyFailure, CoreError, InvalidCause, StructuredObject};

use super::{ObjectKey, ObjectStore, StoreError};
use crate::error::{KubeError, Result};
use crate::options::ManagerOptions;

/// Object store talking to a live cluster
pub struct KubeStore {
    /// Kubernetes client
    client: Client,
    /// Cached discovery information
    discovery: Discovery,
    /// Field manager name for Server-Side Apply
    field_manager: String,
    /// Take ownership of conflicting fields
    force: bool,
}

impl KubeStore {
    /// Create a store and run discovery
    pub async fn new(client: Client, options: &ManagerOptions) -> Result<Self> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(|e| KubeError::Discovery(e.to_string()))?;

        Ok(Self::with_discovery(client, discovery, options))
    }

    /// Create a store for the current kube context
    pub async fn try_default(options: &ManagerOptions) -> Result<Self> {
        let client = Client::try_default().await?;
        Self::new(client, options).await
    }

    /// Create from existing client and discovery (for reuse)
    pub fn with_discovery(client: Client, discovery: Discovery, options: &ManagerOptions) -> Self {
        Self {
            client,
            discovery,
            field_manager: options.field_manager.clone(),
            force: options.force,
        }
    }

    /// Whether a kind is namespaced; `None` when the server does not serve it
    pub fn is_namespaced(&self, api_version: &str, kind: &str) -> Option<bool> {
        self.resolve(api_version, kind)
            .map(|(_, capabilities)| capabilities.scope == Scope::Namespaced)
    }

    fn resolve(&self, api_version: &str, kind: &str) -> Option<(ApiResource, ApiCapabilities)> {
        self.discovery.resolve_gvk(&gvk_from_api_version(api_version, kind))
    }

    /// Api client for a resolved kind; `None` when a namespaced kind has no namespace
    fn api_for(
        &self,
        resource: &ApiResource,
        capabilities: &ApiCapabilities,
        namespace: Option<&str>,
    ) -> Option<Api<DynamicObject>> {
        if capabilities.scope == Scope::Namespaced {
            let ns = namespace.filter(|ns| !ns.is_empty())?;
            Some(Api::namespaced_with(self.client.clone(), ns, resource))
        } else {
            Some(Api::all_with(self.client.clone(), resource))
        }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, key: &ObjectKey) -> std::result::Result<StructuredObject, StoreError> {
        let (resource, capabilities) =
            self.resolve(&key.api_version, &key.kind)
                .ok_or_else(|| StoreError::UnknownKind {
                    api_version: key.api_version.clone(),
                    kind: key.kind.clone(),
                })?;

        let Some(api) = self.api_for(&resource, &capabilities, key.namespace.as_deref()) else {
            return Err(StoreError::NotFound(key.clone()));
        };

        debug!(object = %key, "fetching object");
        match api.get(&key.name).await {
            Ok(obj) => from_dynamic(obj, &key.api_version, &key.kind)
                .map_err(|e| StoreError::Backend(e.to_string())),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Err(StoreError::NotFound(key.clone())),
            Err(e) => Err(StoreError::Api(e)),
        }
    }

    async fn namespace_labels(
        &self,
        namespace: &str,
    ) -> std::result::Result<BTreeMap<String, String>, StoreError> {
        let api: Api<Namespace> = Api::all(self.client.clone());

        debug!(namespace, "fetching namespace labels");
        match api.get(namespace).await {
            Ok(ns) => Ok(ns.metadata.labels.unwrap_or_default()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                Err(StoreError::NotFound(ObjectKey::namespace(namespace)))
            }
            Err(e) => Err(StoreError::Api(e)),
        }
    }

    async fn dry_run_apply(
        &self,
        object: &StructuredObject,
    ) -> std::result::Result<StructuredObject, ApplyFailure> {
        let (resource, capabilities) = self
            .resolve(object.api_version(), object.kind())
            .ok_or_else(|| ApplyFailure::Other {
                reason: String::new(),
                message: format!(
                    "no matches for kind \"{}\" in version \"{}\"",
                    object.kind(),
                    object.api_version()
                ),
            })?;

        let Some(api) = self.api_for(&resource, &capabilities, Some(object.namespace())) else {
            return Err(ApplyFailure::NotFound {
                message: "the server could not find the requested resource".to_string(),
            });
        };

        let dynamic = to_dynamic(object).map_err(|e| ApplyFailure::Other {
            reason: String::new(),
            message: e.to_string(),
        })?;

        let mut params = PatchParams::apply(&self.field_manager).dry_run();
        params.force = self.force;

        debug!(object = %object, "dry-run apply");
        let projection = api
            .patch(object.name(), &params, &Patch::Apply(&dynamic))
            .await
            .map_err(failure_from_kube)?;

        from_dynamic(projection, object.api_version(), object.kind()).map_err(|e| {
            ApplyFailure::Other {
                reason: String::new(),
                message: e.to_string(),
            }
        })
    }
}

/// Convert a kube-rs object, filling in type information the response omitted
pub fn from_dynamic(
    mut obj: DynamicObject,
    api_version: &str,
    kind: &str,
) -> std::result::Result<StructuredObject, CoreError> {
    obj.types.get_or_insert_with(|| TypeMeta {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
    });
    StructuredObject::from_value(serde_json::to_value(&obj)?)
}

/// Convert to a kube-rs object for the apply body
pub fn to_dynamic(object: &StructuredObject) -> std::result::Result<DynamicObject, CoreError> {
    Ok(serde_json::from_value(object.to_value())?)
}

/// Map an API status to a typed apply failure
///
/// Immutability is detected from the message, as the API server reports it
/// as a plain validation error.
pub fn failure_from_status(code: u16, reason: &str, message: &str) -> ApplyFailure {
    let message = message.to_string();

    if code == 404 || reason == "NotFound" {
        return ApplyFailure::NotFound { message };
    }

    if code == 409 && reason == "Conflict" {
        // Only Server-Side Apply ownership conflicts name a field manager
        let manager = conflicting_manager(&message);
        if manager.is_some() || message.starts_with("Apply failed with") {
            return ApplyFailure::Conflict { manager, message };
        }
        return ApplyFailure::Other {
            reason: reason.to_string(),
            message,
        };
    }

    let immutable = message.contains("immutable");
    if code == 422 || reason == "Invalid" || immutable {
        return ApplyFailure::Invalid {
            reason: reason.to_string(),
            cause: if immutable {
                InvalidCause::Immutable
            } else {
                InvalidCause::Other
            },
            message,
        };
    }

    ApplyFailure::Other {
        reason: reason.to_string(),
        message,
    }
}

fn failure_from_kube(err: kube::Error) -> ApplyFailure {
    match err {
        kube::Error::Api(resp) => failure_from_status(resp.code, &resp.reason, &resp.message),
        other => ApplyFailure::Other {
            reason: String::new(),
            message: other.to_string(),
        },
    }
}

/// First manager named in a Server-Side Apply conflict message
fn conflicting_manager(message: &str) -> Option<String> {
    const MARKER: &str = "conflict with \"";
    let start = message.find(MARKER)? + MARKER.len();
    let rest = &message[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Split an apiVersion into group and version:
/// - "apps/v1" -> group="apps", version="v1"
/// - "v1" -> group="", version="v1" (core API)
fn gvk_from_api_version(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = match api_version.rsplit_once('/') {
        Some((g, v)) => (g, v),
        None => ("", api_version),
    };
    GroupVersionKind::gvk(group, version, kind)
}
