//! OCPI Parking entity
//!
//! Physical properties of the parking place belonging to an EVSE: admitted
//! vehicle classes, dimensional limits and amenities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ocpi_core::timestamp;

use crate::codec::{compute_etag, reconcile_identity, BuildError, OcpiEntity, ParseError};
use crate::values::{DisplayText, Image, ParkingId, VehicleType};

/// One parking place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parking {
    pub id: ParkingId,
    pub vehicle_types: Vec<VehicleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vehicle_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vehicle_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vehicle_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vehicle_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_bay_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_bay_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<DisplayText>,
    #[serde(default)]
    pub restricted_to_type: bool,
    #[serde(default)]
    pub reservation_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roofed: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refrigeration_outlet: Option<bool>,
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

impl Parking {
    /// Parse a parking document, reconciling an optional URL-supplied id
    /// with the body (disagreement is a hard failure).
    pub fn parse(doc: &Value, url_id: Option<&ParkingId>) -> Result<Self, ParseError> {
        let doc = reconcile_identity(doc, "id", url_id.map(|id| id.as_str()), Self::ENTITY_NAME)?;
        Self::from_document(&doc)
    }

    pub fn builder() -> ParkingBuilder {
        ParkingBuilder::default()
    }
}

impl OcpiEntity for Parking {
    const ENTITY_NAME: &'static str = "parking";
    const PROTECTED_KEYS: &'static [&'static str] = &["id"];

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn etag(&self) -> &str {
        &self.etag
    }

    fn from_document(doc: &Value) -> Result<Self, ParseError> {
        let mut parking: Self =
            serde_json::from_value(doc.clone()).map_err(|e| ParseError::Malformed {
                entity: Self::ENTITY_NAME,
                message: e.to_string(),
            })?;
        parking.etag = compute_etag(&parking)?;
        Ok(parking)
    }
}

impl PartialOrd for Parking {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(
            self.id
                .cmp(&other.id)
                .then_with(|| self.last_updated.cmp(&other.last_updated)),
        )
    }
}

/// Mutable staging object for a [`Parking`]
#[derive(Debug, Clone, Default)]
pub struct ParkingBuilder {
    pub id: Option<ParkingId>,
    pub vehicle_types: Vec<VehicleType>,
    pub max_vehicle_weight: Option<f64>,
    pub max_vehicle_height: Option<f64>,
    pub max_vehicle_length: Option<f64>,
    pub max_vehicle_width: Option<f64>,
    pub parking_bay_length: Option<f64>,
    pub parking_bay_width: Option<f64>,
    pub direction: Option<DisplayText>,
    pub restricted_to_type: Option<bool>,
    pub reservation_required: Option<bool>,
    pub time_limit: Option<u32>,
    pub roofed: Option<bool>,
    pub images: Vec<Image>,
    pub lighting: Option<bool>,
    pub refrigeration_outlet: Option<bool>,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ParkingBuilder {
    pub fn id(mut self, id: ParkingId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn vehicle_type(mut self, vehicle_type: VehicleType) -> Self {
        self.vehicle_types.push(vehicle_type);
        self
    }

    pub fn max_vehicle_weight(mut self, kg: f64) -> Self {
        self.max_vehicle_weight = Some(kg);
        self
    }

    pub fn max_vehicle_height(mut self, cm: f64) -> Self {
        self.max_vehicle_height = Some(cm);
        self
    }

    pub fn direction(mut self, direction: DisplayText) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn restricted_to_type(mut self, restricted: bool) -> Self {
        self.restricted_to_type = Some(restricted);
        self
    }

    pub fn reservation_required(mut self, required: bool) -> Self {
        self.reservation_required = Some(required);
        self
    }

    pub fn time_limit(mut self, minutes: u32) -> Self {
        self.time_limit = Some(minutes);
        self
    }

    pub fn last_updated(mut self, ts: DateTime<Utc>) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Validate and seal into an immutable parking place. `id` and at least
    /// one vehicle type are mandatory.
    pub fn build(self) -> Result<Parking, BuildError> {
        let mut missing = Vec::new();
        if self.id.is_none() {
            missing.push("id");
        }
        if self.vehicle_types.is_empty() {
            missing.push("vehicle_types");
        }

        let Some(id) = self.id else {
            return Err(BuildError::MissingFields {
                entity: Parking::ENTITY_NAME,
                missing,
            });
        };
        if !missing.is_empty() {
            return Err(BuildError::MissingFields {
                entity: Parking::ENTITY_NAME,
                missing,
            });
        }

        let mut parking = Parking {
            id,
            vehicle_types: self.vehicle_types,
            max_vehicle_weight: self.max_vehicle_weight,
            max_vehicle_height: self.max_vehicle_height,
            max_vehicle_length: self.max_vehicle_length,
            max_vehicle_width: self.max_vehicle_width,
            parking_bay_length: self.parking_bay_length,
            parking_bay_width: self.parking_bay_width,
            direction: self.direction,
            restricted_to_type: self.restricted_to_type.unwrap_or(false),
            reservation_required: self.reservation_required.unwrap_or(false),
            time_limit: self.time_limit,
            roofed: self.roofed,
            images: self.images,
            lighting: self.lighting,
            refrigeration_outlet: self.refrigeration_outlet,
            created: self.created,
            last_updated: self.last_updated.unwrap_or_else(timestamp::now),
            etag: String::new(),
        };
        parking.etag = compute_etag(&parking)?;
        Ok(parking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parking_doc() -> Value {
        json!({
            "id": "PARK-1",
            "vehicle_types": ["PERSONAL_VEHICLE", "VAN"],
            "max_vehicle_height": 210.0,
            "reservation_required": true,
            "last_updated": "2024-01-01T00:00:00.000Z"
        })
    }

    #[test]
    fn test_round_trip() {
        let parking = Parking::from_document(&parking_doc()).unwrap();
        let doc = parking.to_document().unwrap();
        let reparsed = Parking::from_document(&doc).unwrap();

        assert_eq!(reparsed, parking);
        assert_eq!(reparsed.etag(), parking.etag());
    }

    #[test]
    fn test_flags_default_to_false() {
        let doc = json!({
            "id": "PARK-2",
            "vehicle_types": ["MOTORCYCLE"],
            "last_updated": "2024-01-01T00:00:00.000Z"
        });
        let parking = Parking::from_document(&doc).unwrap();
        assert!(!parking.restricted_to_type);
        assert!(!parking.reservation_required);
    }

    #[test]
    fn test_builder_requires_vehicle_types() {
        let err = Parking::builder()
            .id(ParkingId::new("PARK-3").unwrap())
            .build()
            .unwrap_err();

        match err {
            BuildError::MissingFields { missing, .. } => {
                assert_eq!(missing, vec!["vehicle_types"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
