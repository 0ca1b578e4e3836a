//! Core error types

use thiserror::Error;

use crate::acl::DenyReason;
use crate::classify::ApplyValidationError;
use crate::selector::SelectorError;

/// Errors produced by the decision and transform layer
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Cross-namespace reference refused by the access policy
    #[error("'{reference}' can't be accessed from namespace '{requester}': {reason}")]
    AccessDenied {
        reference: String,
        requester: String,
        reason: DenyReason,
    },

    /// A namespace selector in the access policy is malformed
    #[error("invalid namespace selector on '{reference}': {source}")]
    Selector {
        reference: String,
        #[source]
        source: SelectorError,
    },

    /// Secret masking or diff serialization failed
    #[error("masking {object} failed: {message}")]
    Masking { object: String, message: String },

    /// Dry-run apply was rejected
    #[error(transparent)]
    ApplyValidation(#[from] ApplyValidationError),

    /// Input is not a usable object
    #[error("invalid object: {message}")]
    InvalidObject { message: String },

    /// Document could not be parsed
    #[error("failed to parse object: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(e: serde_yaml::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl CoreError {
    /// Check if this error is an access policy denial
    pub fn is_access_denied(&self) -> bool {
        matches!(self, CoreError::AccessDenied { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
