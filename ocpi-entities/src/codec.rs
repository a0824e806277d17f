//! Entity codec and the optimistic-concurrency patch gate
//!
//! Every OCPI entity implements [`OcpiEntity`]: a name, a protected-key set,
//! and parse/serialize to its canonical JSON document. On top of that the
//! generic [`try_patch`] gate enforces the `last_updated` monotonicity rule,
//! runs the merge-patch engine and reconstructs the entity (recomputing its
//! ETag) from the patched document.
//!
//! [`EntitySlot`] is the shared mutable cell for one logical entity: patches
//! are applied compute-then-swap under an exclusive lock, so concurrent
//! patches on the same instance linearize and a stale second writer is
//! rejected by the timestamp check.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use ocpi_core::{apply_merge_patch, etag_of, timestamp, CorrelationId, EtagOptions, PatchError, PatchOutcome};

/// Errors raised while parsing or serializing an entity
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Mandatory field missing or a scalar failed validation
    #[error("Parsing the given JSON as a {entity} failed: {message}")]
    Malformed { entity: &'static str, message: String },

    /// URL-supplied and body-supplied identifiers disagree
    #[error("The {entity} identification '{url}' in the URL does not match the identification '{body}' in the body!")]
    IdentityMismatch {
        entity: &'static str,
        url: String,
        body: String,
    },

    /// Serializing the entity to its canonical document failed
    #[error("Serializing the {entity} failed: {message}")]
    Serialize { entity: &'static str, message: String },
}

/// A builder could not produce a valid immutable entity
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Mandatory fields were still unset when `build()` was called
    #[error("Cannot build a {entity}, mandatory fields are missing: {}", missing.join(", "))]
    MissingFields {
        entity: &'static str,
        missing: Vec<&'static str>,
    },

    /// The assembled entity failed to serialize while sealing its ETag
    #[error(transparent)]
    Seal(#[from] ParseError),
}

/// An OCPI resource with a canonical JSON document, an ETag and a
/// `last_updated` timestamp
pub trait OcpiEntity: Serialize + Clone + Sized {
    /// Entity type name used in wire-level error messages
    const ENTITY_NAME: &'static str;

    /// Top-level keys that may never be altered via merge-patch
    const PROTECTED_KEYS: &'static [&'static str];

    fn last_updated(&self) -> DateTime<Utc>;

    /// Content hash of the canonical document, computed at construction
    fn etag(&self) -> &str;

    /// Parse the canonical document, recomputing the ETag
    fn from_document(doc: &Value) -> Result<Self, ParseError>;

    /// Serialize to the canonical document (the ETag itself is not a wire field)
    fn to_document(&self) -> Result<Value, ParseError> {
        serde_json::to_value(self).map_err(|e| ParseError::Serialize {
            entity: Self::ENTITY_NAME,
            message: e.to_string(),
        })
    }
}

/// ETag of an entity's canonical document, with the fixed default inclusion
/// flags all entities hash under
pub(crate) fn compute_etag<E: OcpiEntity>(entity: &E) -> Result<String, ParseError> {
    Ok(etag_of(&entity.to_document()?, &EtagOptions::default()))
}

/// Reconcile a URL-supplied identifier with the body document.
///
/// Both present and equal: fine. Both present and different: hard failure.
/// Only the URL one present: injected into the document before parsing.
pub(crate) fn reconcile_identity(
    doc: &Value,
    key: &str,
    url_value: Option<&str>,
    entity: &'static str,
) -> Result<Value, ParseError> {
    let mut doc = doc.clone();
    let Some(url_value) = url_value else {
        return Ok(doc);
    };

    match doc.get(key) {
        Some(Value::String(body)) => {
            if body != url_value {
                return Err(ParseError::IdentityMismatch {
                    entity,
                    url: url_value.to_string(),
                    body: body.clone(),
                });
            }
            Ok(doc)
        }
        Some(Value::Null) | None => {
            let map = doc.as_object_mut().ok_or_else(|| ParseError::Malformed {
                entity,
                message: "expected a JSON object".to_string(),
            })?;
            map.insert(key.to_string(), Value::String(url_value.to_string()));
            Ok(doc)
        }
        // A non-string id is left for the field parser to reject.
        Some(_) => Ok(doc),
    }
}

/// Apply a merge-patch to an entity under the optimistic-concurrency rules.
///
/// A patch without `last_updated` gets the current wall clock injected, so a
/// successful patch always advances the timestamp. A patch that is not newer
/// than the entity is rejected unless `allow_downgrades` is set. On success a
/// new entity is built from the patched document with a fresh ETag; on
/// failure the prior entity is untouched.
pub fn try_patch<E: OcpiEntity>(
    current: &E,
    patch: Option<&Value>,
    allow_downgrades: bool,
    correlation_id: Option<CorrelationId>,
) -> PatchOutcome<E> {
    let cid = correlation_id.unwrap_or_default();
    match gate(current, patch, allow_downgrades) {
        Ok(next) => {
            debug!(
                correlation_id = %cid,
                entity = E::ENTITY_NAME,
                etag = next.etag(),
                "patch applied"
            );
            PatchOutcome::patched(cid, next)
        }
        Err(error) => {
            warn!(
                correlation_id = %cid,
                entity = E::ENTITY_NAME,
                %error,
                "patch rejected"
            );
            PatchOutcome::failed(cid, error)
        }
    }
}

fn gate<E: OcpiEntity>(
    current: &E,
    patch: Option<&Value>,
    allow_downgrades: bool,
) -> Result<E, PatchError> {
    let patch = match patch {
        Some(p) if !p.is_null() => p,
        _ => {
            return Err(PatchError::NullPatch {
                entity: E::ENTITY_NAME.to_string(),
            })
        }
    };

    let mut patch_map = patch
        .as_object()
        .ok_or_else(|| PatchError::PatchNotAnObject {
            entity: E::ENTITY_NAME.to_string(),
        })?
        .clone();

    match timestamp::patch_last_updated(patch, E::ENTITY_NAME)? {
        None => {
            // Every successful patch advances last_updated.
            patch_map.insert(
                "last_updated".to_string(),
                Value::String(timestamp::normalize(timestamp::now())),
            );
        }
        Some(patched_ts) => {
            if !allow_downgrades && patched_ts <= current.last_updated() {
                return Err(PatchError::StaleTimestamp {
                    entity: E::ENTITY_NAME.to_string(),
                });
            }
        }
    }

    let doc = current.to_document().map_err(|e| PatchError::Serialize {
        entity: E::ENTITY_NAME.to_string(),
        message: e.to_string(),
    })?;

    let patched = apply_merge_patch(&doc, &Value::Object(patch_map), E::PROTECTED_KEYS, E::ENTITY_NAME)?;

    E::from_document(&patched).map_err(|e| PatchError::Reparse {
        entity: E::ENTITY_NAME.to_string(),
        message: e.to_string(),
    })
}

/// Shared mutable slot for one logical entity instance.
///
/// Readers take cheap `Arc` snapshots; patching is compute-then-swap under
/// the slot's lock. The lock is held only for the in-memory transform, never
/// across I/O.
pub struct EntitySlot<E> {
    inner: Mutex<Arc<E>>,
}

impl<E: OcpiEntity> EntitySlot<E> {
    pub fn new(entity: E) -> Self {
        Self {
            inner: Mutex::new(Arc::new(entity)),
        }
    }

    /// Snapshot of the current entity
    pub fn get(&self) -> Arc<E> {
        self.inner.lock().clone()
    }

    /// Unconditionally swap in a new entity (dedicated PUT-style replace)
    pub fn replace(&self, entity: E) -> Arc<E> {
        let next = Arc::new(entity);
        *self.inner.lock() = next.clone();
        next
    }

    /// Patch the stored entity under the slot's exclusive lock.
    ///
    /// The timestamp check runs against the entity as it is at lock
    /// acquisition, so two racing patches serialize and the stale one loses.
    pub fn try_patch(
        &self,
        patch: Option<&Value>,
        allow_downgrades: bool,
        correlation_id: Option<CorrelationId>,
    ) -> PatchOutcome<Arc<E>> {
        let mut guard = self.inner.lock();
        let outcome = try_patch(guard.as_ref(), patch, allow_downgrades, correlation_id);
        let cid = outcome.correlation_id();
        match outcome.into_result() {
            Ok(next) => {
                let next = Arc::new(next);
                *guard = next.clone();
                PatchOutcome::patched(cid, next)
            }
            Err(error) => PatchOutcome::failed(cid, error),
        }
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for EntitySlot<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EntitySlot").field(&*self.inner.lock()).finish()
    }
}
