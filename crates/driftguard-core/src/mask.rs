//! Secret masking for rendered diffs
//!
//! Values under the data-bearing fields of a Secret are replaced by masks of a
//! fixed length that never depends on the real value. A key present on both
//! sides gets the shared mask on both sides; a key present on only one side
//! gets that side's mask, so added and removed keys stay visible in the diff.
//! Two secrets with the same keys but different values therefore render the
//! same.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{CoreError, Result};
use crate::object::StructuredObject;

/// Secret fields whose values are redacted
pub const SECRET_DATA_FIELDS: &[&str] = &["data", "stringData", "binaryData"];

/// Client-side apply annotation, which embeds a full copy of the object
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// Mask characters and length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaskOptions {
    /// Character for keys present on both sides
    pub shared: char,
    /// Character for keys only present on the stored object
    pub existing: char,
    /// Character for keys only present on the dry-run projection
    pub projection: char,
    /// Number of characters in every mask
    pub length: usize,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            shared: '*',
            existing: '-',
            projection: '+',
            length: 8,
        }
    }
}

impl MaskOptions {
    fn mask_string(&self, c: char) -> String {
        std::iter::repeat_n(c, self.length).collect()
    }

    fn mask(&self, c: char) -> JsonValue {
        JsonValue::String(self.mask_string(c))
    }
}

/// Redact both sides of a Secret diff in place
pub fn mask_secret_pair(
    existing: &mut StructuredObject,
    projection: &mut StructuredObject,
    options: &MaskOptions,
) -> Result<()> {
    for field in SECRET_DATA_FIELDS {
        let existing_keys = data_keys(existing, field)?;
        let projection_keys = data_keys(projection, field)?;

        if let Some(map) = existing.field_mut(field).and_then(JsonValue::as_object_mut) {
            mask_values(map, &projection_keys, options, options.existing);
        }
        if let Some(map) = projection.field_mut(field).and_then(JsonValue::as_object_mut) {
            mask_values(map, &existing_keys, options, options.projection);
        }
    }

    let existing_has = existing.annotations().contains_key(LAST_APPLIED_ANNOTATION);
    let projection_has = projection.annotations().contains_key(LAST_APPLIED_ANNOTATION);
    let (existing_char, projection_char) = if existing_has && projection_has {
        (options.shared, options.shared)
    } else {
        (options.existing, options.projection)
    };
    if existing_has {
        existing.set_annotation(LAST_APPLIED_ANNOTATION, &options.mask_string(existing_char));
    }
    if projection_has {
        projection.set_annotation(LAST_APPLIED_ANNOTATION, &options.mask_string(projection_char));
    }

    Ok(())
}

/// Keys of a data-bearing field; a non-mapping value cannot be masked
fn data_keys(object: &StructuredObject, field: &str) -> Result<Vec<String>> {
    match object.field(field) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Object(map)) => Ok(map.keys().cloned().collect()),
        Some(_) => Err(CoreError::Masking {
            object: object.object_ref().to_string(),
            message: format!("'{}' is not a mapping", field),
        }),
    }
}

fn mask_values(
    map: &mut Map<String, JsonValue>,
    other_keys: &[String],
    options: &MaskOptions,
    own: char,
) {
    for (key, value) in map.iter_mut() {
        let c = if other_keys.contains(key) {
            options.shared
        } else {
            own
        };
        *value = options.mask(c);
    }
}
