//! ETag computation over the canonical JSON document
//!
//! The ETag is the SHA-256 of the UTF-8 bytes of the entity's canonical JSON,
//! base64-encoded. `serde_json` maps keep keys sorted, so the serialization is
//! already canonical regardless of the order fields arrived in on the wire.
//!
//! The inclusion flags must be held constant between computations for the hash
//! to be reproducible; entities compute their ETag with the default options at
//! construction time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Which volatile keys take part in the hash.
///
/// Held constant while hashing; changing the flags changes the ETag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtagOptions {
    /// Include the `created` timestamp
    pub include_created: bool,
    /// Include vendor `extensions`
    pub include_extensions: bool,
}

impl Default for EtagOptions {
    fn default() -> Self {
        Self {
            include_created: true,
            include_extensions: true,
        }
    }
}

/// Compute the ETag of a canonical entity document
pub fn etag_of(doc: &Value, options: &EtagOptions) -> String {
    let canonical = match doc {
        Value::Object(map) => {
            let mut map = map.clone();
            if !options.include_created {
                map.remove("created");
            }
            if !options.include_extensions {
                map.remove("extensions");
            }
            Value::Object(map)
        }
        other => other.clone(),
    };

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_etag_is_deterministic() {
        let doc = json!({"id": "LOC1", "name": "Depot", "last_updated": "2024-01-01T00:00:00.000Z"});
        let opts = EtagOptions::default();
        assert_eq!(etag_of(&doc, &opts), etag_of(&doc, &opts));
    }

    #[test]
    fn test_etag_changes_with_content() {
        let a = json!({"id": "LOC1", "name": "Depot"});
        let b = json!({"id": "LOC1", "name": "Depot 2"});
        let opts = EtagOptions::default();
        assert_ne!(etag_of(&a, &opts), etag_of(&b, &opts));
    }

    #[test]
    fn test_etag_ignores_key_order() {
        // serde_json sorts object keys, so arrival order cannot matter.
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        let opts = EtagOptions::default();
        assert_eq!(etag_of(&a, &opts), etag_of(&b, &opts));
    }

    #[test]
    fn test_excluded_keys_do_not_affect_hash() {
        let with_created = json!({"id": "LOC1", "created": "2023-01-01T00:00:00.000Z"});
        let without = json!({"id": "LOC1"});
        let opts = EtagOptions {
            include_created: false,
            include_extensions: true,
        };
        assert_eq!(etag_of(&with_created, &opts), etag_of(&without, &opts));

        // With default options the created timestamp is part of the hash.
        let opts = EtagOptions::default();
        assert_ne!(etag_of(&with_created, &opts), etag_of(&without, &opts));
    }
}
