//! OCPI Location entity
//!
//! The root resource of the locations module: a site with one or more EVSEs.
//! Identity (`country_code`, `party_id`, `id`) and the owned `evses` array
//! are protected from patching; EVSEs change through the collection
//! operations, which keep their own lock so structural updates never contend
//! with patch application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ocpi_core::timestamp;

use crate::codec::{compute_etag, reconcile_identity, BuildError, OcpiEntity, ParseError};
use crate::collection::OwnedCollection;
use crate::evse::Evse;
use crate::values::{
    AdditionalGeoLocation, BusinessDetails, CountryCode, DisplayText, EnergyMix, EvseUid, Facility,
    GeoLocation, Hours, Image, LocationId, ParkingType, PartyId,
};

/// A charging site operated by one party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country_code: CountryCode,
    pub party_id: PartyId,
    pub id: LocationId,
    pub publish: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
    pub coordinates: GeoLocation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_locations: Vec<AdditionalGeoLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_type: Option<ParkingType>,
    #[serde(default)]
    pub evses: OwnedCollection<Evse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directions: Vec<DisplayText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<BusinessDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suboperator: Option<BusinessDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<BusinessDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facilities: Vec<Facility>,
    pub time_zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_times: Option<Hours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charging_when_closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_mix: Option<EnergyMix>,
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

impl Location {
    /// Parse a location document, reconciling an optional URL-supplied id
    /// with the body (disagreement is a hard failure).
    pub fn parse(doc: &Value, url_id: Option<&LocationId>) -> Result<Self, ParseError> {
        let doc = reconcile_identity(doc, "id", url_id.map(|id| id.as_str()), Self::ENTITY_NAME)?;
        Self::from_document(&doc)
    }

    pub fn builder() -> LocationBuilder {
        LocationBuilder::default()
    }

    /// EVSE by uid, snapshot-read from the owned collection
    pub fn evse(&self, uid: &EvseUid) -> Option<Evse> {
        self.evses.find(|e| &e.uid == uid)
    }

    /// Add or replace an EVSE by uid, resealing the ETag; returns the
    /// collection version.
    pub fn upsert_evse(&mut self, evse: Evse) -> Result<u64, ParseError> {
        let version = self.evses.upsert(evse, |a, b| a.uid == b.uid);
        self.etag = compute_etag(self)?;
        Ok(version)
    }

    /// Remove an EVSE by uid, resealing the ETag if anything was removed
    pub fn remove_evse(&mut self, uid: &EvseUid) -> Result<Option<Evse>, ParseError> {
        let removed = self.evses.remove(|e| &e.uid == uid);
        if removed.is_some() {
            self.etag = compute_etag(self)?;
        }
        Ok(removed)
    }
}

impl OcpiEntity for Location {
    const ENTITY_NAME: &'static str = "location";
    const PROTECTED_KEYS: &'static [&'static str] = &["country_code", "party_id", "id", "evses"];

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn etag(&self) -> &str {
        &self.etag
    }

    fn from_document(doc: &Value) -> Result<Self, ParseError> {
        let mut location: Self =
            serde_json::from_value(doc.clone()).map_err(|e| ParseError::Malformed {
                entity: Self::ENTITY_NAME,
                message: e.to_string(),
            })?;
        location.etag = compute_etag(&location)?;
        Ok(location)
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(
            self.id
                .cmp(&other.id)
                .then_with(|| self.last_updated.cmp(&other.last_updated)),
        )
    }
}

/// Mutable staging object for a [`Location`]
#[derive(Debug, Clone, Default)]
pub struct LocationBuilder {
    pub country_code: Option<CountryCode>,
    pub party_id: Option<PartyId>,
    pub id: Option<LocationId>,
    pub publish: Option<bool>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<GeoLocation>,
    pub related_locations: Vec<AdditionalGeoLocation>,
    pub parking_type: Option<ParkingType>,
    pub evses: Vec<Evse>,
    pub directions: Vec<DisplayText>,
    pub operator: Option<BusinessDetails>,
    pub suboperator: Option<BusinessDetails>,
    pub owner: Option<BusinessDetails>,
    pub facilities: Vec<Facility>,
    pub time_zone: Option<String>,
    pub opening_times: Option<Hours>,
    pub charging_when_closed: Option<bool>,
    pub images: Vec<Image>,
    pub energy_mix: Option<EnergyMix>,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl LocationBuilder {
    pub fn country_code(mut self, country_code: CountryCode) -> Self {
        self.country_code = Some(country_code);
        self
    }

    pub fn party_id(mut self, party_id: PartyId) -> Self {
        self.party_id = Some(party_id);
        self
    }

    pub fn id(mut self, id: LocationId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn publish(mut self, publish: bool) -> Self {
        self.publish = Some(publish);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn coordinates(mut self, coordinates: GeoLocation) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    pub fn evse(mut self, evse: Evse) -> Self {
        self.evses.push(evse);
        self
    }

    pub fn operator(mut self, operator: BusinessDetails) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn energy_mix(mut self, energy_mix: EnergyMix) -> Self {
        self.energy_mix = Some(energy_mix);
        self
    }

    pub fn last_updated(mut self, ts: DateTime<Utc>) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Validate and seal into an immutable location.
    ///
    /// `publish` defaults to `false`, `last_updated` to the current wall
    /// clock; everything else in the mandatory set must be present.
    pub fn build(self) -> Result<Location, BuildError> {
        let mut missing = Vec::new();
        if self.country_code.is_none() {
            missing.push("country_code");
        }
        if self.party_id.is_none() {
            missing.push("party_id");
        }
        if self.id.is_none() {
            missing.push("id");
        }
        if self.address.is_none() {
            missing.push("address");
        }
        if self.city.is_none() {
            missing.push("city");
        }
        if self.country.is_none() {
            missing.push("country");
        }
        if self.coordinates.is_none() {
            missing.push("coordinates");
        }
        if self.time_zone.is_none() {
            missing.push("time_zone");
        }

        let (
            Some(country_code),
            Some(party_id),
            Some(id),
            Some(address),
            Some(city),
            Some(country),
            Some(coordinates),
            Some(time_zone),
        ) = (
            self.country_code,
            self.party_id,
            self.id,
            self.address,
            self.city,
            self.country,
            self.coordinates,
            self.time_zone,
        )
        else {
            return Err(BuildError::MissingFields {
                entity: Location::ENTITY_NAME,
                missing,
            });
        };

        let mut location = Location {
            country_code,
            party_id,
            id,
            publish: self.publish.unwrap_or(false),
            name: self.name,
            address,
            city,
            postal_code: self.postal_code,
            state: self.state,
            country,
            coordinates,
            related_locations: self.related_locations,
            parking_type: self.parking_type,
            evses: OwnedCollection::new(self.evses),
            directions: self.directions,
            operator: self.operator,
            suboperator: self.suboperator,
            owner: self.owner,
            facilities: self.facilities,
            time_zone,
            opening_times: self.opening_times,
            charging_when_closed: self.charging_when_closed,
            images: self.images,
            energy_mix: self.energy_mix,
            created: self.created,
            last_updated: self.last_updated.unwrap_or_else(timestamp::now),
            etag: String::new(),
        };
        location.etag = compute_etag(&location)?;
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location_doc() -> Value {
        json!({
            "country_code": "DE",
            "party_id": "GEF",
            "id": "LOC0001",
            "publish": true,
            "name": "Depot Nord",
            "address": "Industriestrasse 1",
            "city": "Hamburg",
            "country": "DEU",
            "coordinates": {"latitude": "53.5511", "longitude": "9.9937"},
            "time_zone": "Europe/Berlin",
            "energy_mix": {
                "is_green_energy": true,
                "supplier_name": "A"
            },
            "evses": [{
                "uid": "EVSE-1",
                "status": "AVAILABLE",
                "last_updated": "2024-01-01T00:00:00.000Z"
            }],
            "last_updated": "2024-01-01T00:00:00.000Z"
        })
    }

    #[test]
    fn test_round_trip() {
        let location = Location::from_document(&location_doc()).unwrap();
        let doc = location.to_document().unwrap();
        let reparsed = Location::from_document(&doc).unwrap();

        assert_eq!(reparsed, location);
        assert_eq!(reparsed.etag(), location.etag());
    }

    #[test]
    fn test_missing_mandatory_fields_fail() {
        let mut doc = location_doc();
        doc.as_object_mut().unwrap().remove("coordinates");
        assert!(Location::from_document(&doc).is_err());
    }

    #[test]
    fn test_evse_collection_operations() {
        let mut location = Location::from_document(&location_doc()).unwrap();
        let uid = EvseUid::new("EVSE-1").unwrap();

        assert!(location.evse(&uid).is_some());

        let evse2 = Evse::builder()
            .uid(EvseUid::new("EVSE-2").unwrap())
            .status(crate::values::EvseStatus::Planned)
            .build()
            .unwrap();
        location.upsert_evse(evse2).unwrap();
        assert_eq!(location.evses.len(), 2);

        location.remove_evse(&uid).unwrap();
        assert!(location.evse(&uid).is_none());
        assert_eq!(location.evses.version(), 2);
    }

    #[test]
    fn test_evse_mutation_reseals_etag() {
        let mut location = Location::from_document(&location_doc()).unwrap();
        let etag_before = location.etag().to_string();

        let evse2 = Evse::builder()
            .uid(EvseUid::new("EVSE-2").unwrap())
            .status(crate::values::EvseStatus::Planned)
            .build()
            .unwrap();
        location.upsert_evse(evse2).unwrap();
        assert_ne!(location.etag(), etag_before);

        let reparsed = Location::from_document(&location.to_document().unwrap()).unwrap();
        assert_eq!(reparsed.etag(), location.etag());
    }

    #[test]
    fn test_builder_missing_fields_are_listed() {
        let err = Location::builder()
            .country_code(CountryCode::new("DE").unwrap())
            .party_id(PartyId::new("GEF").unwrap())
            .id(LocationId::new("LOC0001").unwrap())
            .build()
            .unwrap_err();

        match err {
            BuildError::MissingFields { missing, .. } => {
                assert_eq!(
                    missing,
                    vec!["address", "city", "country", "coordinates", "time_zone"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
