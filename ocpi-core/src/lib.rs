//! # OCPI Core
//!
//! Protocol-level building blocks shared by every OCPI entity:
//! - `patch`: JSON merge-patch engine (RFC 7396) with protected-field enforcement
//! - `outcome`: patch outcome carrying a correlation token for tracing
//! - `timestamp`: ISO-8601 normalization and `last_updated` handling
//! - `etag`: SHA-256/base64 ETag over the canonical JSON document
//!
//! The engine is deliberately small: OCPI "mutation" is always a merge-patch
//! against the canonical JSON of an immutable entity, gated by the entity's
//! protected keys and its `last_updated` timestamp. Everything entity-specific
//! (field tables, builders, the concurrency gate) lives in `ocpi-entities`.

pub mod etag;
pub mod outcome;
pub mod patch;
pub mod timestamp;

pub use etag::{etag_of, EtagOptions};
pub use outcome::{CorrelationId, PatchOutcome};
pub use patch::{apply_merge_patch, PatchError};
