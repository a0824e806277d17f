//! ISO-8601 timestamp handling for `last_updated` gating
//!
//! OCPI timestamps travel as ISO-8601 strings. For a reproducible canonical
//! document (and therefore a reproducible ETag) serialization is normalized to
//! a fixed-width, zero-padded, UTC-anchored form with millisecond precision.
//! Monotonicity checks compare parsed `DateTime<Utc>` values, never raw
//! strings, so no wire format can break the ordering.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde_json::Value;

use crate::patch::PatchError;

/// Fixed-width UTC format used in canonical documents
const ISO8601_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Render a timestamp in the fixed-width canonical form
pub fn normalize(ts: DateTime<Utc>) -> String {
    ts.format(ISO8601_MILLIS).to_string()
}

/// Parse an ISO-8601 timestamp, anchoring to UTC
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Current wall-clock time, truncated to the canonical millisecond precision
/// so that injected timestamps round-trip unchanged
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}

/// Extract and parse the `last_updated` key of a patch document.
///
/// Returns `Ok(None)` when the patch carries no `last_updated`; the gate then
/// injects the current wall clock. A present but unparseable timestamp is a
/// hard failure.
pub fn patch_last_updated(patch: &Value, entity: &str) -> Result<Option<DateTime<Utc>>, PatchError> {
    match patch.get("last_updated") {
        None => Ok(None),
        Some(Value::String(raw)) => match parse(raw) {
            Some(ts) => Ok(Some(ts)),
            None => Err(PatchError::InvalidTimestamp {
                entity: entity.to_string(),
                value: raw.clone(),
            }),
        },
        Some(other) => Err(PatchError::InvalidTimestamp {
            entity: entity.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Serde adapter serializing `DateTime<Utc>` in the canonical form
pub mod serde_iso8601 {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&normalize(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'")))
    }
}

/// Serde adapter for optional timestamps in the canonical form
pub mod serde_iso8601_opt {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_some(&normalize(*ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'"))),
        }
    }
}
