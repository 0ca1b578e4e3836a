//! Drift detection between a stored object and its dry-run projection

use serde_json::{Map, Value as JsonValue};

use crate::changeset::ChangeSetEntry;
use crate::compare::is_compatible_subset;
use crate::diff::DiffRenderer;
use crate::error::Result;
use crate::object::StructuredObject;

/// Top-level fields inspected for drift, in evaluation order
pub const TRACKED_FIELDS: &[&str] = &[
    "spec",
    "webhooks",
    "rules",
    "subjects",
    "roleRef",
    "subsets",
    "data",
    "binaryData",
    "stringData",
    "immutable",
];

/// Check whether `projection` would change `existing`
///
/// Labels, annotations and every tracked field defined on `existing` are
/// compared with [`is_compatible_subset`]. Objects defining none of the tracked
/// fields (custom shapes) are compared as a whole.
pub fn detect_drift(existing: &StructuredObject, projection: &StructuredObject) -> bool {
    if projection.resource_version().is_empty() {
        return true;
    }

    for key in ["labels", "annotations"] {
        if !is_compatible_subset(&metadata_map(projection, key), &metadata_map(existing, key)) {
            return true;
        }
    }

    let mut found = false;
    for field in TRACKED_FIELDS {
        if let Some(current) = existing.field(field) {
            found = true;
            let desired = projection.field(field).unwrap_or(&JsonValue::Null);
            if !is_compatible_subset(desired, current) {
                return true;
            }
        }
    }

    if !found {
        return !is_compatible_subset(&projection.to_value(), &existing.to_value());
    }

    false
}

/// Turn a dry-run result into a change-set entry
///
/// `existing` is the stored object (or the desired object itself when nothing
/// is stored yet) and `projection` the dry-run result.
pub fn evaluate_change(
    existing: &StructuredObject,
    projection: &StructuredObject,
    renderer: &DiffRenderer,
) -> Result<ChangeSetEntry> {
    if projection.resource_version().is_empty() {
        return Ok(ChangeSetEntry::created(projection));
    }

    if detect_drift(existing, projection) {
        let diff = renderer.render(existing, projection)?;
        return Ok(ChangeSetEntry::configured(projection, diff));
    }

    Ok(ChangeSetEntry::unchanged(projection))
}

/// Labels or annotations; unset counts as an empty map
fn metadata_map(object: &StructuredObject, key: &str) -> JsonValue {
    match object.metadata_entry(key) {
        Some(value) if !value.is_null() => value.clone(),
        _ => JsonValue::Object(Map::new()),
    }
}
