//! Compatible-subset comparison of nested value trees
//!
//! `is_compatible_subset(desired, existing)` answers "would persisting
//! `desired` leave `existing` unchanged?". Everything `desired` states must be
//! present in `existing` with an equal value, while anything the store added on
//! its own (defaults, status, admission mutations) is ignored.
//!
//! `null` on the desired side is always compatible. Empty mappings, empty
//! sequences and the empty string count as unset too, but only against a value
//! of the same shape: `{}` against `"x"` is a change.
//!
//! Sequences are compared by position, and `desired` may not be longer than
//! `existing`. Numbers compare by value, so `3` and `3.0` are equal.

use serde_json::{Number, Value as JsonValue};

/// Check whether `desired` is a compatible subset of `existing`
pub fn is_compatible_subset(desired: &JsonValue, existing: &JsonValue) -> bool {
    match (desired, existing) {
        (JsonValue::Null, _) => true,

        (JsonValue::Object(want), JsonValue::Object(have)) => want.iter().all(|(key, value)| {
            have.get(key)
                .is_some_and(|current| is_compatible_subset(value, current))
        }),

        (JsonValue::Array(want), JsonValue::Array(have)) => {
            want.len() <= have.len()
                && want
                    .iter()
                    .zip(have)
                    .all(|(value, current)| is_compatible_subset(value, current))
        }

        (JsonValue::String(want), JsonValue::String(have)) => want.is_empty() || want == have,

        (JsonValue::Number(want), JsonValue::Number(have)) => numbers_equal(want, have),

        (JsonValue::Bool(want), JsonValue::Bool(have)) => want == have,

        _ => false,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a == b {
        return true;
    }
    // Integers and floats of the same magnitude, e.g. 3 and 3.0
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (a.is_f64() || b.is_f64()) && x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_fields_on_existing_are_ignored() {
        let desired = json!({"env": "prod"});
        let existing = json!({"env": "prod", "team": "x"});
        assert!(is_compatible_subset(&desired, &existing));
        assert!(!is_compatible_subset(&existing, &desired));
    }

    #[test]
    fn test_nested_mismatch() {
        let desired = json!({"spec": {"replicas": 5, "template": {"image": "nginx"}}});
        let existing = json!({"spec": {"replicas": 3, "template": {"image": "nginx"}}});
        assert!(!is_compatible_subset(&desired, &existing));
    }

    #[test]
    fn test_server_defaults_tolerated() {
        let desired = json!({
            "containers": [{"name": "app", "image": "nginx"}]
        });
        let existing = json!({
            "containers": [{
                "name": "app",
                "image": "nginx",
                "imagePullPolicy": "Always",
                "terminationMessagePath": "/dev/termination-log"
            }],
            "dnsPolicy": "ClusterFirst"
        });
        assert!(is_compatible_subset(&desired, &existing));
    }

    #[test]
    fn test_sequences_compare_by_position() {
        assert!(is_compatible_subset(&json!(["a"]), &json!(["a", "b"])));
        assert!(!is_compatible_subset(&json!(["b"]), &json!(["a", "b"])));
        assert!(!is_compatible_subset(&json!(["a", "b", "c"]), &json!(["a", "b"])));
        assert!(is_compatible_subset(&json!([]), &json!(["a"])));
    }

    #[test]
    fn test_unset_values_are_compatible() {
        assert!(is_compatible_subset(&JsonValue::Null, &json!({"a": 1})));
        assert!(is_compatible_subset(&json!({}), &json!({"a": 1})));
        assert!(is_compatible_subset(&json!([]), &json!([1])));
        assert!(is_compatible_subset(&json!({"a": ""}), &json!({"a": "set"})));
        assert!(!is_compatible_subset(&json!({}), &JsonValue::Null));
        assert!(!is_compatible_subset(&json!([]), &JsonValue::Null));
    }

    #[test]
    fn test_missing_key_is_incompatible() {
        assert!(!is_compatible_subset(&json!({"a": 1}), &json!({})));
        assert!(!is_compatible_subset(&json!({"a": 1}), &JsonValue::Null));
        // An explicit null is still "unset"
        assert!(is_compatible_subset(&json!({"a": null}), &json!({"a": 1})));
    }

    #[test]
    fn test_scalars() {
        assert!(is_compatible_subset(&json!(3), &json!(3.0)));
        assert!(!is_compatible_subset(&json!(3), &json!(4)));
        assert!(is_compatible_subset(&json!(false), &json!(false)));
        assert!(!is_compatible_subset(&json!(false), &json!(true)));
        assert!(!is_compatible_subset(&json!("3"), &json!(3)));
        assert!(!is_compatible_subset(&json!({"a": 1}), &json!("a")));
    }

    #[test]
    fn test_empty_values_need_matching_shape() {
        assert!(!is_compatible_subset(&json!({"a": ""}), &json!({"a": 0})));
        assert!(!is_compatible_subset(&json!({"a": {}}), &json!({"a": "x"})));
        assert!(!is_compatible_subset(&json!({"a": []}), &json!({"a": {"b": 1}})));
        assert!(!is_compatible_subset(&json!({"a": ""}), &json!({"a": null})));
    }

    #[test]
    fn test_identical_trees() {
        let tree = json!({
            "spec": {"replicas": 2, "ports": [{"port": 80, "protocol": "TCP"}]},
            "immutable": true
        });
        assert!(is_compatible_subset(&tree, &tree));
    }
}
