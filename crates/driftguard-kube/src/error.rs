//! Error types for driftguard-kube

use std::time::Duration;
use thiserror::Error;

use driftguard_core::CoreError;

use crate::store::StoreError;

/// Result type for driftguard-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while talking to the object store
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Decision or transform failure from the core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A read the decision depends on failed
    #[error("failed to look up {object}: {source}")]
    LookupFailure {
        object: String,
        #[source]
        source: StoreError,
    },

    /// A store call exceeded the configured timeout
    #[error("{operation} of {object} timed out after {after:?}")]
    Timeout {
        operation: String,
        object: String,
        after: Duration,
    },

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// API discovery failed
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            KubeError::LookupFailure { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is an access denial
    pub fn is_access_denied(&self) -> bool {
        matches!(self, KubeError::Core(e) if e.is_access_denied())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, KubeError::Timeout { .. })
    }
}
