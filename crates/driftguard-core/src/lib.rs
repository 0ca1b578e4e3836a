//! Driftguard Core - the decision and transform layer of a reconciliation loop
//!
//! This crate provides the pure building blocks used by driftguard:
//! - `StructuredObject`: Unstructured snapshot of a stored object
//! - `compare`: Compatible-subset comparison of nested trees
//! - `acl`: Cross-namespace access decisions from namespace label selectors
//! - `drift`: Drift detection between a stored object and its dry-run projection
//! - `diff`: Masked, canonical text diffs
//! - `classify`: Apply failure classification with secret-safe messages
//! - `changeset`: Outcome records (created, configured, unchanged)

pub mod acl;
pub mod changeset;
pub mod classify;
pub mod compare;
pub mod diff;
pub mod drift;
pub mod error;
pub mod mask;
pub mod object;
pub mod selector;

pub use acl::{AccessCheck, AccessRequest, DenyReason};
pub use changeset::{Action, ChangeSet, ChangeSetEntry};
pub use classify::{ApplyFailure, ApplyValidationError, InvalidCause, classify_apply_error};
pub use compare::is_compatible_subset;
pub use diff::DiffRenderer;
pub use drift::{TRACKED_FIELDS, detect_drift, evaluate_change};
pub use error::{CoreError, Result};
pub use mask::MaskOptions;
pub use object::{ObjectRef, StructuredObject};
pub use selector::{AccessPolicy, LabelMatcher, NamespaceSelector, SelectorError};
