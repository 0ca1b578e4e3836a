//! Cross-namespace access decisions
//!
//! The decision is split around the single external read it needs:
//! [`AccessRequest::precheck`] settles everything that can be decided without
//! the requester namespace's labels, and [`AccessRequest::authorize`] evaluates
//! the policy once the caller has fetched them. Same-namespace references never
//! reach the lookup.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::selector::AccessPolicy;

/// A namespaced object asking to reference another object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest<'a> {
    /// Namespace of the object holding the reference
    pub object_namespace: &'a str,
    /// Namespace of the referenced object; empty means "same namespace"
    pub reference_namespace: &'a str,
    /// Name of the referenced object
    pub reference_name: &'a str,
}

/// Outcome of the lookup-free part of the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCheck<'p> {
    /// Same namespace, nothing to evaluate
    Granted,
    /// Labels of the requester namespace are needed to evaluate this policy
    NeedsLabels(&'p AccessPolicy),
}

/// Why a reference was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The referenced object carries no ACL
    MissingAcl,
    /// No selector matched the requester namespace labels
    Mismatch,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::MissingAcl => write!(f, "missing ACL on reference"),
            DenyReason::Mismatch => write!(f, "ACL mismatch on namespace labels"),
        }
    }
}

impl<'a> AccessRequest<'a> {
    pub fn new(object_namespace: &'a str, reference_namespace: &'a str, reference_name: &'a str) -> Self {
        Self {
            object_namespace,
            reference_namespace,
            reference_name,
        }
    }

    /// True when the reference stays inside the requester namespace
    pub fn is_same_namespace(&self) -> bool {
        self.reference_namespace.is_empty() || self.reference_namespace == self.object_namespace
    }

    /// `namespace/name` of the referenced object
    pub fn reference(&self) -> String {
        let namespace = if self.reference_namespace.is_empty() {
            self.object_namespace
        } else {
            self.reference_namespace
        };
        format!("{}/{}", namespace, self.reference_name)
    }

    /// Decide what can be decided without reading namespace labels
    pub fn precheck<'p>(&self, policy: Option<&'p AccessPolicy>) -> Result<AccessCheck<'p>> {
        if self.is_same_namespace() {
            return Ok(AccessCheck::Granted);
        }

        match policy {
            Some(policy) => Ok(AccessCheck::NeedsLabels(policy)),
            None => Err(self.denied(DenyReason::MissingAcl)),
        }
    }

    /// Evaluate `policy` against the requester namespace labels
    ///
    /// Returns `Ok(true)` when a selector matches; a refusal is reported as
    /// [`CoreError::AccessDenied`] so the reference travels with it.
    pub fn authorize(
        &self,
        policy: &AccessPolicy,
        namespace_labels: &BTreeMap<String, String>,
    ) -> Result<bool> {
        for selector in &policy.namespace_selectors {
            let matcher = selector.matcher().map_err(|source| CoreError::Selector {
                reference: self.reference(),
                source,
            })?;
            if matcher.matches(namespace_labels) {
                return Ok(true);
            }
        }

        Err(self.denied(DenyReason::Mismatch))
    }

    /// Full decision for callers that already hold the labels
    pub fn evaluate(
        &self,
        policy: Option<&AccessPolicy>,
        namespace_labels: &BTreeMap<String, String>,
    ) -> Result<bool> {
        match self.precheck(policy)? {
            AccessCheck::Granted => Ok(true),
            AccessCheck::NeedsLabels(policy) => self.authorize(policy, namespace_labels),
        }
    }

    fn denied(&self, reason: DenyReason) -> CoreError {
        CoreError::AccessDenied {
            reference: self.reference(),
            requester: self.object_namespace.to_string(),
            reason,
        }
    }
}
