//! Classification of dry-run apply failures
//!
//! The store client reports failures as a closed set of [`ApplyFailure`]
//! variants, which [`classify_apply_error`] turns into messages carrying the
//! object identity. Failures on Secrets never repeat the upstream message,
//! since it may quote the rejected data.

use std::fmt;
use thiserror::Error;

use crate::object::{ObjectRef, StructuredObject};

/// Reason reported for field-manager ownership conflicts
pub const FIELD_MANAGER_CONFLICT: &str = "FieldManagerConflict";

/// Message substituted for upstream text on redacted failures
const REDACTED: &str = "<redacted>";

/// What made an invalid request invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidCause {
    /// An immutable field would change
    Immutable,
    /// Any other validation failure
    Other,
}

/// Typed failure of a dry-run apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyFailure {
    /// Target (or its namespace) does not exist
    NotFound { message: String },

    /// Another field manager owns a field being applied
    Conflict {
        manager: Option<String>,
        message: String,
    },

    /// Request rejected by validation or admission
    Invalid {
        reason: String,
        cause: InvalidCause,
        message: String,
    },

    /// Anything else; `reason` may be empty
    Other { reason: String, message: String },
}

impl ApplyFailure {
    /// Upstream reason code
    pub fn reason(&self) -> &str {
        match self {
            ApplyFailure::NotFound { .. } => "NotFound",
            ApplyFailure::Conflict { .. } => "Conflict",
            ApplyFailure::Invalid { reason, .. } | ApplyFailure::Other { reason, .. } => reason,
        }
    }

    /// Upstream message
    pub fn message(&self) -> &str {
        match self {
            ApplyFailure::NotFound { message }
            | ApplyFailure::Conflict { message, .. }
            | ApplyFailure::Invalid { message, .. }
            | ApplyFailure::Other { message, .. } => message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApplyFailure::NotFound { .. })
    }

    pub fn is_immutable(&self) -> bool {
        matches!(
            self,
            ApplyFailure::Invalid {
                cause: InvalidCause::Immutable,
                ..
            }
        )
    }

    /// Same failure with the upstream message removed
    pub fn redacted(&self) -> Self {
        let message = REDACTED.to_string();
        match self {
            ApplyFailure::NotFound { .. } => ApplyFailure::NotFound { message },
            ApplyFailure::Conflict { manager, .. } => ApplyFailure::Conflict {
                manager: manager.clone(),
                message,
            },
            ApplyFailure::Invalid { reason, cause, .. } => ApplyFailure::Invalid {
                reason: reason.clone(),
                cause: *cause,
                message,
            },
            ApplyFailure::Other { reason, .. } => ApplyFailure::Other {
                reason: reason.clone(),
                message,
            },
        }
    }
}

impl fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApplyFailure {}

/// Dry-run failure tagged with the object it concerns
#[derive(Debug, Error)]
pub enum ApplyValidationError {
    #[error("{object} namespace not specified, error: {source}")]
    NamespaceNotSpecified { object: ObjectRef, source: ApplyFailure },

    #[error("{object}{} secret is immutable", reason_token(.reason))]
    ImmutableSecret {
        object: ObjectRef,
        reason: String,
        source: ApplyFailure,
    },

    #[error("{object}{} data values must be of type string", reason_token(.reason))]
    InvalidSecret {
        object: ObjectRef,
        reason: String,
        source: ApplyFailure,
    },

    #[error("{object} dry-run failed{}, error: {source}", reason_clause(.reason))]
    DryRunFailed {
        object: ObjectRef,
        reason: String,
        source: ApplyFailure,
    },
}

impl ApplyValidationError {
    /// Object the failure concerns
    pub fn object(&self) -> &ObjectRef {
        match self {
            ApplyValidationError::NamespaceNotSpecified { object, .. }
            | ApplyValidationError::ImmutableSecret { object, .. }
            | ApplyValidationError::InvalidSecret { object, .. }
            | ApplyValidationError::DryRunFailed { object, .. } => object,
        }
    }

    /// Wrapped failure
    pub fn failure(&self) -> &ApplyFailure {
        match self {
            ApplyValidationError::NamespaceNotSpecified { source, .. }
            | ApplyValidationError::ImmutableSecret { source, .. }
            | ApplyValidationError::InvalidSecret { source, .. }
            | ApplyValidationError::DryRunFailed { source, .. } => source,
        }
    }
}

fn reason_token(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(" {}", reason)
    }
}

fn reason_clause(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(", reason: {}", reason)
    }
}

/// Describe a dry-run failure of `object`
pub fn classify_apply_error(object: &StructuredObject, failure: ApplyFailure) -> ApplyValidationError {
    let object_ref = object.object_ref();

    if failure.is_not_found() {
        return ApplyValidationError::NamespaceNotSpecified {
            object: object_ref,
            source: failure,
        };
    }

    if object.is_secret() {
        let reason = failure.reason().to_lowercase();
        let source = failure.redacted();
        return if failure.is_immutable() {
            ApplyValidationError::ImmutableSecret {
                object: object_ref,
                reason,
                source,
            }
        } else {
            ApplyValidationError::InvalidSecret {
                object: object_ref,
                reason,
                source,
            }
        };
    }

    let reason = match &failure {
        ApplyFailure::Conflict { .. } => FIELD_MANAGER_CONFLICT.to_string(),
        other => other.reason().to_string(),
    };

    ApplyValidationError::DryRunFailed {
        object: object_ref,
        reason,
        source: failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn deployment() -> StructuredObject {
        StructuredObject::new("apps/v1", "Deployment", "default", "web")
    }

    fn secret() -> StructuredObject {
        StructuredObject::new("v1", "Secret", "default", "creds")
    }

    #[test]
    fn test_not_found_means_missing_namespace() {
        let failure = ApplyFailure::NotFound {
            message: "namespaces \"staging\" not found".to_string(),
        };
        let err = classify_apply_error(&deployment(), failure.clone());

        assert_eq!(
            err.to_string(),
            "Deployment/default/web namespace not specified, error: namespaces \"staging\" not found"
        );
        assert_eq!(err.failure(), &failure);
    }

    #[test]
    fn test_not_found_takes_precedence_for_secrets() {
        let failure = ApplyFailure::NotFound {
            message: "namespaces \"staging\" not found".to_string(),
        };
        let err = classify_apply_error(&secret(), failure);
        assert!(matches!(err, ApplyValidationError::NamespaceNotSpecified { .. }));
    }

    #[test]
    fn test_immutable_secret() {
        let failure = ApplyFailure::Invalid {
            reason: "Invalid".to_string(),
            cause: InvalidCause::Immutable,
            message: "Secret \"creds\" is invalid: data: Forbidden: field is immutable when `immutable` is set".to_string(),
        };
        let err = classify_apply_error(&secret(), failure);

        insta::assert_snapshot!(err.to_string(), @"Secret/default/creds invalid secret is immutable");
        assert!(err.to_string().contains("secret is immutable"));
    }

    #[test]
    fn test_invalid_secret_hides_upstream_message() {
        let failure = ApplyFailure::Invalid {
            reason: "BadRequest".to_string(),
            cause: InvalidCause::Other,
            message: "json: cannot unmarshal number into Go value, data: hunter2".to_string(),
        };
        let err = classify_apply_error(&secret(), failure);

        assert_eq!(
            err.to_string(),
            "Secret/default/creds badrequest data values must be of type string"
        );
        let source = err.source().unwrap().to_string();
        assert!(!source.contains("hunter2"));
        assert_eq!(err.failure().reason(), "BadRequest");
    }

    #[test]
    fn test_secret_failure_without_reason() {
        let failure = ApplyFailure::Other {
            reason: String::new(),
            message: "connection reset by peer".to_string(),
        };
        let err = classify_apply_error(&secret(), failure);

        insta::assert_snapshot!(err.to_string(), @"Secret/default/creds data values must be of type string");
    }

    #[test]
    fn test_conflict_reason() {
        let failure = ApplyFailure::Conflict {
            manager: Some("kubectl".to_string()),
            message: "Apply failed with 1 conflict: conflict with \"kubectl\": .spec.replicas".to_string(),
        };
        let err = classify_apply_error(&deployment(), failure);

        assert_eq!(
            err.to_string(),
            "Deployment/default/web dry-run failed, reason: FieldManagerConflict, error: Apply failed with 1 conflict: conflict with \"kubectl\": .spec.replicas"
        );
    }

    #[test]
    fn test_generic_failure_with_and_without_reason() {
        let with_reason = classify_apply_error(
            &deployment(),
            ApplyFailure::Invalid {
                reason: "Invalid".to_string(),
                cause: InvalidCause::Other,
                message: "spec.replicas: Invalid value: -1".to_string(),
            },
        );
        insta::assert_snapshot!(
            with_reason.to_string(),
            @"Deployment/default/web dry-run failed, reason: Invalid, error: spec.replicas: Invalid value: -1"
        );

        let without_reason = classify_apply_error(
            &deployment(),
            ApplyFailure::Other {
                reason: String::new(),
                message: "no matches for kind \"Deployment\"".to_string(),
            },
        );
        assert_eq!(
            without_reason.to_string(),
            "Deployment/default/web dry-run failed, error: no matches for kind \"Deployment\""
        );
        assert!(without_reason.source().is_some());
    }

    #[test]
    fn test_cluster_scoped_identity() {
        let ns = StructuredObject::new("v1", "Namespace", "", "team-a");
        let err = classify_apply_error(
            &ns,
            ApplyFailure::Other {
                reason: "Forbidden".to_string(),
                message: "forbidden".to_string(),
            },
        );
        assert_eq!(err.object().to_string(), "Namespace/team-a");
        assert!(err.to_string().starts_with("Namespace/team-a dry-run failed, reason: Forbidden"));
    }
}
