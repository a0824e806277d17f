//! Patch outcomes and correlation tokens
//!
//! Every patch application carries an opaque correlation id so log lines from
//! the gate, the engine and the caller can be tied together. The id is never
//! interpreted; a fresh one is generated when the caller supplies none.

use uuid::Uuid;

use crate::patch::PatchError;

/// Opaque correlation token for tracing a patch through the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a patch application: the correlation token plus either the
/// patched value or the failure that rejected the patch.
///
/// A failed outcome implies the prior entity is untouched; callers keep
/// serving its fields and ETag as if the patch never happened.
#[derive(Debug)]
pub struct PatchOutcome<T> {
    correlation_id: CorrelationId,
    result: Result<T, PatchError>,
}

impl<T> PatchOutcome<T> {
    /// Successful patch carrying the new value
    pub fn patched(correlation_id: CorrelationId, value: T) -> Self {
        Self {
            correlation_id,
            result: Ok(value),
        }
    }

    /// Rejected patch carrying the failure reason
    pub fn failed(correlation_id: CorrelationId, error: PatchError) -> Self {
        Self {
            correlation_id,
            result: Err(error),
        }
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn is_patched(&self) -> bool {
        self.result.is_ok()
    }

    /// The failure reason, if the patch was rejected
    pub fn error(&self) -> Option<&PatchError> {
        self.result.as_ref().err()
    }

    pub fn as_result(&self) -> Result<&T, &PatchError> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Result<T, PatchError> {
        self.result
    }

    /// Map the patched value, keeping the correlation id and any failure
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PatchOutcome<U> {
        PatchOutcome {
            correlation_id: self.correlation_id,
            result: self.result.map(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }

    #[test]
    fn test_outcome_accessors() {
        let cid = CorrelationId::new();
        let ok: PatchOutcome<u32> = PatchOutcome::patched(cid, 7);
        assert!(ok.is_patched());
        assert_eq!(ok.correlation_id(), cid);
        assert_eq!(ok.into_result().unwrap(), 7);

        let err: PatchOutcome<u32> = PatchOutcome::failed(
            cid,
            PatchError::NullPatch {
                entity: "EVSE".to_string(),
            },
        );
        assert!(!err.is_patched());
        assert_eq!(err.error().unwrap().to_string(), "EVSE patch must not be null!");
    }
}
