//! Masked text diffs between a stored object and its dry-run projection
//!
//! Both sides are cleaned of field-ownership bookkeeping, Secrets are masked,
//! and each side is serialized to YAML with sorted keys before a line diff is
//! taken, so the output only changes when the objects do.

use serde_json::{Map, Value as JsonValue};
use similar::TextDiff;

use crate::error::{CoreError, Result};
use crate::mask::{MaskOptions, mask_secret_pair};
use crate::object::{MANAGED_FIELDS, StructuredObject};

/// Header of the stored side of a diff
pub const EXISTING_HEADER: &str = "existing";

/// Header of the projected side of a diff
pub const PROJECTION_HEADER: &str = "dry-run";

/// Renders unified diffs of objects
#[derive(Debug, Clone)]
pub struct DiffRenderer {
    /// Context lines around each change
    pub context_lines: usize,

    /// Secret masks
    pub masks: MaskOptions,
}

impl DiffRenderer {
    pub fn new() -> Self {
        Self {
            context_lines: 3,
            masks: MaskOptions::default(),
        }
    }

    /// Set the number of context lines
    pub fn with_context(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Set the Secret masks
    pub fn with_masks(mut self, masks: MaskOptions) -> Self {
        self.masks = masks;
        self
    }

    /// Render the diff from `existing` to `projection`
    ///
    /// Returns an empty string when the cleaned, masked serializations are
    /// identical.
    pub fn render(&self, existing: &StructuredObject, projection: &StructuredObject) -> Result<String> {
        let mut existing = existing.clone();
        let mut projection = projection.clone();

        existing.remove_metadata_entry(MANAGED_FIELDS);
        projection.remove_metadata_entry(MANAGED_FIELDS);

        if existing.is_secret() || projection.is_secret() {
            mask_secret_pair(&mut existing, &mut projection, &self.masks)?;
        }

        let old = canonical_yaml(&existing)?;
        let new = canonical_yaml(&projection)?;

        if old == new {
            return Ok(String::new());
        }

        let diff = TextDiff::from_lines(&old, &new);
        Ok(diff
            .unified_diff()
            .context_radius(self.context_lines)
            .header(EXISTING_HEADER, PROJECTION_HEADER)
            .to_string())
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize an object to YAML with keys sorted at every level
fn canonical_yaml(object: &StructuredObject) -> Result<String> {
    let sorted = sort_keys(&object.to_value());
    serde_yaml::to_string(&sorted).map_err(|e| CoreError::Masking {
        object: object.object_ref().to_string(),
        message: format!("serialization failed: {}", e),
    })
}

fn sort_keys(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key.as_str()]));
            }
            JsonValue::Object(sorted)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
