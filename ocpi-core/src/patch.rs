//! JSON merge-patch engine with protected-field enforcement
//!
//! Implements RFC 7396 merge-patch semantics over `serde_json::Value`:
//! - a key mapped to `null` removes that key from the target
//! - a key mapped to an object merges recursively into an existing object
//! - any other value (scalar, array, object onto a non-object) replaces wholesale
//!
//! Protected keys are enforced at the top level of the patch only — OCPI
//! protects identity fields (`id`, `uid`, `country_code`, ...) and owned
//! sub-entity arrays (`evses`, `connectors`), all of which live at the top
//! level of the entity document. Nested merges are not re-checked.
//!
//! The engine is a pure transform: it builds a new document and never touches
//! its inputs, so a rejected patch leaves the original untouched.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while applying or gating a merge-patch
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// A top-level patch key is in the entity's protected set
    #[error("Patching the '{key}' of a {entity} is not allowed!")]
    ProtectedKey { entity: String, key: String },

    /// The patch document was absent or JSON `null`
    #[error("{entity} patch must not be null!")]
    NullPatch { entity: String },

    /// The patch document was not a JSON object
    #[error("The given JSON patch of a {entity} must be a JSON object!")]
    PatchNotAnObject { entity: String },

    /// The canonical target document was not a JSON object
    #[error("The canonical JSON of a {entity} must be a JSON object!")]
    TargetNotAnObject { entity: String },

    /// The patch `last_updated` is not newer than the entity's and downgrades
    /// were not allowed
    #[error("The 'last_updated' timestamp of the {entity} patch must be newer then the timestamp of the existing {entity}!")]
    StaleTimestamp { entity: String },

    /// The patch `last_updated` could not be parsed as an ISO-8601 timestamp
    #[error("The 'last_updated' timestamp '{value}' of the {entity} patch is invalid!")]
    InvalidTimestamp { entity: String, value: String },

    /// Serializing the current entity to its canonical document failed
    #[error("Serializing the {entity} failed: {message}")]
    Serialize { entity: String, message: String },

    /// The patched document no longer parses as a valid entity
    #[error("Parsing the patched {entity} failed: {message}")]
    Reparse { entity: String, message: String },
}

/// Apply an RFC 7396 merge-patch to a canonical entity document.
///
/// `protected` is the entity's top-level protected-key set; any patch touching
/// one of those keys is rejected outright and the target is returned untouched
/// (the function never mutates its inputs). `entity` is the entity type name
/// used in error messages.
pub fn apply_merge_patch(
    target: &Value,
    patch: &Value,
    protected: &[&str],
    entity: &str,
) -> Result<Value, PatchError> {
    let target_map = target.as_object().ok_or_else(|| PatchError::TargetNotAnObject {
        entity: entity.to_string(),
    })?;
    let patch_map = patch.as_object().ok_or_else(|| PatchError::PatchNotAnObject {
        entity: entity.to_string(),
    })?;

    // Protection applies to the entity's own top-level keys only.
    for key in patch_map.keys() {
        if protected.contains(&key.as_str()) {
            return Err(PatchError::ProtectedKey {
                entity: entity.to_string(),
                key: key.clone(),
            });
        }
    }

    Ok(Value::Object(merge_objects(target_map, patch_map)))
}

/// Recursive object merge: null deletes, object-onto-object merges,
/// everything else replaces.
fn merge_objects(target: &Map<String, Value>, patch: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = target.clone();

    for (key, value) in patch {
        match value {
            // Deleting an absent key is a no-op.
            Value::Null => {
                merged.remove(key);
            }
            Value::Object(nested) => match target.get(key) {
                Some(Value::Object(existing)) => {
                    merged.insert(key.clone(), Value::Object(merge_objects(existing, nested)));
                }
                // No object to merge into: replace verbatim.
                _ => {
                    merged.insert(key.clone(), value.clone());
                }
            },
            // Scalars and arrays replace wholesale; arrays are never
            // element-merged.
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_replace() {
        let target = json!({"status": "AVAILABLE", "floor_level": "2"});
        let patch = json!({"status": "BLOCKED"});

        let patched = apply_merge_patch(&target, &patch, &[], "EVSE").unwrap();
        assert_eq!(patched["status"], "BLOCKED");
        assert_eq!(patched["floor_level"], "2");
    }

    #[test]
    fn test_null_deletes_key() {
        let target = json!({"status": "AVAILABLE", "physical_reference": "A1"});
        let patch = json!({"physical_reference": null});

        let patched = apply_merge_patch(&target, &patch, &[], "EVSE").unwrap();
        assert!(patched.get("physical_reference").is_none());
    }

    #[test]
    fn test_null_delete_is_idempotent() {
        let target = json!({"status": "AVAILABLE"});
        let patch = json!({"physical_reference": null});

        let once = apply_merge_patch(&target, &patch, &[], "EVSE").unwrap();
        let twice = apply_merge_patch(&once, &patch, &[], "EVSE").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_patch_is_idempotent_on_own_output() {
        let target = json!({"status": "AVAILABLE", "nested": {"a": 1, "b": 2}});
        let patch = json!({"status": "BLOCKED", "nested": {"a": 3, "b": null}});

        let once = apply_merge_patch(&target, &patch, &[], "EVSE").unwrap();
        let twice = apply_merge_patch(&once, &patch, &[], "EVSE").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_nested_object_merges() {
        let target = json!({"energy_mix": {"supplier_name": "A", "is_green_energy": true}});
        let patch = json!({"energy_mix": {"supplier_name": "B"}});

        let patched = apply_merge_patch(&target, &patch, &[], "Location").unwrap();
        assert_eq!(patched["energy_mix"]["supplier_name"], "B");
        assert_eq!(patched["energy_mix"]["is_green_energy"], true);
    }

    #[test]
    fn test_object_onto_scalar_replaces() {
        let target = json!({"directions": "north"});
        let patch = json!({"directions": {"language": "en", "text": "turn left"}});

        let patched = apply_merge_patch(&target, &patch, &[], "Location").unwrap();
        assert_eq!(patched["directions"]["text"], "turn left");
    }

    #[test]
    fn test_array_replaced_wholesale() {
        let target = json!({"facilities": ["HOTEL", "CAFE"]});
        let patch = json!({"facilities": ["MALL"]});

        let patched = apply_merge_patch(&target, &patch, &[], "Location").unwrap();
        assert_eq!(patched["facilities"], json!(["MALL"]));
    }

    #[test]
    fn test_protected_key_rejected() {
        let target = json!({"uid": "EVSE-1", "status": "AVAILABLE"});
        let patch = json!({"uid": "EVSE-2"});

        let err = apply_merge_patch(&target, &patch, &["uid", "connectors"], "EVSE").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Patching the 'uid' of a EVSE is not allowed!"
        );
    }

    #[test]
    fn test_protection_is_top_level_only() {
        // A nested key sharing a protected name is not re-checked.
        let target = json!({"id": "LOC1", "operator": {"id": "OP1", "name": "Op"}});
        let patch = json!({"operator": {"id": "OP2"}});

        let patched = apply_merge_patch(&target, &patch, &["id"], "Location").unwrap();
        assert_eq!(patched["operator"]["id"], "OP2");
        assert_eq!(patched["id"], "LOC1");
    }

    #[test]
    fn test_rejection_leaves_target_untouched() {
        let target = json!({"uid": "EVSE-1", "status": "AVAILABLE"});
        let patch = json!({"status": "BLOCKED", "uid": "EVSE-2"});

        let before = target.clone();
        let _ = apply_merge_patch(&target, &patch, &["uid"], "EVSE").unwrap_err();
        assert_eq!(target, before);
    }

    #[test]
    fn test_non_object_patch_rejected() {
        let target = json!({"status": "AVAILABLE"});
        let err = apply_merge_patch(&target, &json!([1, 2]), &[], "EVSE").unwrap_err();
        assert!(matches!(err, PatchError::PatchNotAnObject { .. }));
    }
}
