//! OCPI EVSE entity
//!
//! An EVSE is the part of a charging station that can charge one vehicle at
//! a time. Its `uid` and its owned `connectors` array are protected from
//! patching; connectors change through the dedicated collection operations
//! instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ocpi_core::timestamp;

use crate::codec::{compute_etag, reconcile_identity, BuildError, OcpiEntity, ParseError};
use crate::collection::OwnedCollection;
use crate::connector::Connector;
use crate::values::{
    Capability, ConnectorId, DisplayText, EvseId, EvseStatus, EvseUid, GeoLocation, Image,
    ParkingRestriction,
};

/// Planned status change of an EVSE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSchedule {
    #[serde(with = "timestamp::serde_iso8601")]
    pub period_begin: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::serde_iso8601_opt"
    )]
    pub period_end: Option<DateTime<Utc>>,
    pub status: EvseStatus,
}

/// One charging point of a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evse {
    pub uid: EvseUid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evse_id: Option<EvseId>,
    pub status: EvseStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_schedule: Vec<StatusSchedule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub connectors: OwnedCollection<Connector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directions: Vec<DisplayText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parking_restrictions: Vec<ParkingRestriction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::serde_iso8601_opt"
    )]
    pub created: Option<DateTime<Utc>>,
    #[serde(with = "timestamp::serde_iso8601")]
    pub last_updated: DateTime<Utc>,
    #[serde(skip)]
    etag: String,
}

impl Evse {
    /// Parse an EVSE document, reconciling an optional URL-supplied uid with
    /// the body (disagreement is a hard failure).
    pub fn parse(doc: &Value, url_uid: Option<&EvseUid>) -> Result<Self, ParseError> {
        let doc = reconcile_identity(doc, "uid", url_uid.map(|uid| uid.as_str()), Self::ENTITY_NAME)?;
        Self::from_document(&doc)
    }

    pub fn builder() -> EvseBuilder {
        EvseBuilder::default()
    }

    /// Connector by id, snapshot-read from the owned collection
    pub fn connector(&self, id: &ConnectorId) -> Option<Connector> {
        self.connectors.find(|c| &c.id == id)
    }

    /// Add or replace a connector by id, resealing the ETag; returns the
    /// collection version.
    pub fn upsert_connector(&mut self, connector: Connector) -> Result<u64, ParseError> {
        let version = self.connectors.upsert(connector, |a, b| a.id == b.id);
        self.etag = compute_etag(self)?;
        Ok(version)
    }

    /// Remove a connector by id, resealing the ETag if anything was removed
    pub fn remove_connector(&mut self, id: &ConnectorId) -> Result<Option<Connector>, ParseError> {
        let removed = self.connectors.remove(|c| &c.id == id);
        if removed.is_some() {
            self.etag = compute_etag(self)?;
        }
        Ok(removed)
    }
}

impl OcpiEntity for Evse {
    const ENTITY_NAME: &'static str = "EVSE";
    const PROTECTED_KEYS: &'static [&'static str] = &["uid", "connectors"];

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn etag(&self) -> &str {
        &self.etag
    }

    fn from_document(doc: &Value) -> Result<Self, ParseError> {
        let mut evse: Self = serde_json::from_value(doc.clone()).map_err(|e| ParseError::Malformed {
            entity: Self::ENTITY_NAME,
            message: e.to_string(),
        })?;
        evse.etag = compute_etag(&evse)?;
        Ok(evse)
    }
}

impl PartialOrd for Evse {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(
            self.uid
                .cmp(&other.uid)
                .then_with(|| self.last_updated.cmp(&other.last_updated)),
        )
    }
}

/// Mutable staging object for an [`Evse`]
#[derive(Debug, Clone, Default)]
pub struct EvseBuilder {
    pub uid: Option<EvseUid>,
    pub evse_id: Option<EvseId>,
    pub status: Option<EvseStatus>,
    pub status_schedule: Vec<StatusSchedule>,
    pub capabilities: Vec<Capability>,
    pub connectors: Vec<Connector>,
    pub floor_level: Option<String>,
    pub coordinates: Option<GeoLocation>,
    pub physical_reference: Option<String>,
    pub directions: Vec<DisplayText>,
    pub parking_restrictions: Vec<ParkingRestriction>,
    pub images: Vec<Image>,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl EvseBuilder {
    pub fn uid(mut self, uid: EvseUid) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn evse_id(mut self, evse_id: EvseId) -> Self {
        self.evse_id = Some(evse_id);
        self
    }

    pub fn status(mut self, status: EvseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn connector(mut self, connector: Connector) -> Self {
        self.connectors.push(connector);
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn floor_level(mut self, level: impl Into<String>) -> Self {
        self.floor_level = Some(level.into());
        self
    }

    pub fn coordinates(mut self, coordinates: GeoLocation) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn physical_reference(mut self, reference: impl Into<String>) -> Self {
        self.physical_reference = Some(reference.into());
        self
    }

    pub fn last_updated(mut self, ts: DateTime<Utc>) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Validate and seal into an immutable EVSE
    pub fn build(self) -> Result<Evse, BuildError> {
        let mut missing = Vec::new();
        if self.uid.is_none() {
            missing.push("uid");
        }
        if self.status.is_none() {
            missing.push("status");
        }

        let (Some(uid), Some(status)) = (self.uid, self.status) else {
            return Err(BuildError::MissingFields {
                entity: Evse::ENTITY_NAME,
                missing,
            });
        };

        let mut evse = Evse {
            uid,
            evse_id: self.evse_id,
            status,
            status_schedule: self.status_schedule,
            capabilities: self.capabilities,
            connectors: OwnedCollection::new(self.connectors),
            floor_level: self.floor_level,
            coordinates: self.coordinates,
            physical_reference: self.physical_reference,
            directions: self.directions,
            parking_restrictions: self.parking_restrictions,
            images: self.images,
            created: self.created,
            last_updated: self.last_updated.unwrap_or_else(timestamp::now),
            etag: String::new(),
        };
        evse.etag = compute_etag(&evse)?;
        Ok(evse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evse_doc() -> Value {
        json!({
            "uid": "EVSE-1",
            "evse_id": "DE*GEF*E*1",
            "status": "AVAILABLE",
            "connectors": [{
                "id": "1",
                "standard": "IEC_62196_T2",
                "format": "SOCKET",
                "power_type": "AC_3_PHASE",
                "max_voltage": 400,
                "max_amperage": 32,
                "last_updated": "2024-01-01T00:00:00.000Z"
            }],
            "floor_level": "2",
            "last_updated": "2024-01-01T00:00:00.000Z"
        })
    }

    #[test]
    fn test_round_trip() {
        let evse = Evse::from_document(&evse_doc()).unwrap();
        let doc = evse.to_document().unwrap();
        let reparsed = Evse::from_document(&doc).unwrap();

        assert_eq!(reparsed, evse);
        assert_eq!(reparsed.etag(), evse.etag());
    }

    #[test]
    fn test_connectors_default_to_empty() {
        let mut doc = evse_doc();
        doc.as_object_mut().unwrap().remove("connectors");

        let evse = Evse::from_document(&doc).unwrap();
        assert!(evse.connectors.is_empty());
    }

    #[test]
    fn test_connector_upsert_and_remove() {
        let mut evse = Evse::from_document(&evse_doc()).unwrap();
        let id = ConnectorId::new("1").unwrap();

        let mut replacement = evse.connector(&id).unwrap();
        replacement.max_amperage = 63;
        evse.upsert_connector(replacement).unwrap();
        assert_eq!(evse.connector(&id).unwrap().max_amperage, 63);
        assert_eq!(evse.connectors.version(), 1);

        assert!(evse.remove_connector(&id).unwrap().is_some());
        assert!(evse.connectors.is_empty());
        assert!(evse.remove_connector(&id).unwrap().is_none());
    }

    #[test]
    fn test_connector_mutation_reseals_etag() {
        let mut evse = Evse::from_document(&evse_doc()).unwrap();
        let id = ConnectorId::new("1").unwrap();
        let etag_before = evse.etag().to_string();

        let mut replacement = evse.connector(&id).unwrap();
        replacement.max_amperage = 63;
        evse.upsert_connector(replacement).unwrap();
        assert_ne!(evse.etag(), etag_before);

        // The resealed hash matches a fresh parse of the mutated document.
        let reparsed = Evse::from_document(&evse.to_document().unwrap()).unwrap();
        assert_eq!(reparsed.etag(), evse.etag());

        // Removing nothing leaves the seal alone.
        let etag_after = evse.etag().to_string();
        assert!(evse
            .remove_connector(&ConnectorId::new("9").unwrap())
            .unwrap()
            .is_none());
        assert_eq!(evse.etag(), etag_after);
    }

    #[test]
    fn test_uid_mismatch_rejected() {
        let url_uid = EvseUid::new("EVSE-2").unwrap();
        let err = Evse::parse(&evse_doc(), Some(&url_uid)).unwrap_err();
        assert!(matches!(err, ParseError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_builder_requires_uid_and_status() {
        let err = Evse::builder().build().unwrap_err();
        match err {
            BuildError::MissingFields { missing, .. } => {
                assert_eq!(missing, vec!["uid", "status"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_etag_tracks_field_state() {
        let a = Evse::from_document(&evse_doc()).unwrap();

        let mut doc = evse_doc();
        doc["status"] = json!("BLOCKED");
        let b = Evse::from_document(&doc).unwrap();

        assert_ne!(a.etag(), b.etag());
    }
}
