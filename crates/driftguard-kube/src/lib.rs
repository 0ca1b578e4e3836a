//! Driftguard Kube - Kubernetes integration for driftguard
//!
//! This crate provides:
//! - **Object Stores**: Read and dry-run access to a cluster (`KubeStore`) or to memory (`MockObjectStore`)
//! - **Resource Manager**: Change sets from fetch, dry-run apply and drift detection, with timeouts
//! - **Authorization**: Cross-namespace reference checks against namespace labels
//! - **Options**: Field manager, timeout, force and mask settings

pub mod acl;
pub mod error;
pub mod manager;
pub mod options;
pub mod store;

pub use acl::Authorization;
pub use error::{KubeError, Result};
pub use manager::ResourceManager;
pub use options::{DEFAULT_FIELD_MANAGER, DEFAULT_TIMEOUT, ManagerOptions};
pub use store::{KubeStore, MockObjectStore, ObjectKey, ObjectStore, OperationCounts, StoreError};
