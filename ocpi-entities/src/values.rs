//! OCPI value types
//!
//! Scalar identifiers, wire enumerations and small composite types shared by
//! the entity DTOs. Identifiers are validated string newtypes (OCPI CiString
//! semantics: printable ASCII, at most 36 characters); enums carry their exact
//! OCPI wire spelling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A scalar failed its wire-format validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{value}' is not a valid {kind}")]
pub struct ValueError {
    pub kind: &'static str,
    pub value: String,
}

impl ValueError {
    fn invalid(kind: &'static str, value: String) -> Self {
        Self { kind, value }
    }
}

fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 36
        && value.chars().all(|c| c.is_ascii_graphic() || c == ' ')
}

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! ocpi_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
                let value = value.into();
                if is_valid_identifier(&value) {
                    Ok(Self(value))
                } else {
                    Err(ValueError::invalid($kind, value))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

ocpi_id!(
    /// Location identifier, unique within the issuing party
    LocationId,
    "location id"
);
ocpi_id!(
    /// Internal EVSE identifier, never shown to drivers
    EvseUid,
    "EVSE uid"
);
ocpi_id!(
    /// Official, eMI3-compliant EVSE identifier
    EvseId,
    "EVSE id"
);
ocpi_id!(
    /// Connector identifier, unique within its EVSE
    ConnectorId,
    "connector id"
);
ocpi_id!(
    /// Charging session identifier
    SessionId,
    "session id"
);
ocpi_id!(
    /// Tariff identifier
    TariffId,
    "tariff id"
);
ocpi_id!(
    /// Payment terminal identifier
    TerminalId,
    "terminal id"
);
ocpi_id!(
    /// Parking place identifier
    ParkingId,
    "parking id"
);

/// ISO 3166-1 alpha-2 country code of the issuing party
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into();
        if value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(value))
        } else {
            Err(ValueError::invalid("country code", value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Three-character party identifier of the issuing operator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyId(String);

impl PartyId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into();
        if value.len() == 3 && value.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(value))
        } else {
            Err(ValueError::invalid("party id", value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartyId {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartyId> for String {
    fn from(value: PartyId) -> Self {
        value.0
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// EVSE availability status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvseStatus {
    Available,
    Blocked,
    Charging,
    Inoperative,
    #[serde(rename = "OUTOFORDER")]
    OutOfOrder,
    Planned,
    Removed,
    Reserved,
    Unknown,
}

/// Charging session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Invalid,
    Pending,
}

/// Connector plug standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorStandard {
    #[serde(rename = "CHADEMO")]
    Chademo,
    #[serde(rename = "DOMESTIC_F")]
    DomesticF,
    #[serde(rename = "IEC_62196_T1")]
    Iec62196T1,
    #[serde(rename = "IEC_62196_T1_COMBO")]
    Iec62196T1Combo,
    #[serde(rename = "IEC_62196_T2")]
    Iec62196T2,
    #[serde(rename = "IEC_62196_T2_COMBO")]
    Iec62196T2Combo,
    #[serde(rename = "IEC_62196_T3A")]
    Iec62196T3a,
    #[serde(rename = "IEC_62196_T3C")]
    Iec62196T3c,
    #[serde(rename = "TESLA_R")]
    TeslaR,
    #[serde(rename = "TESLA_S")]
    TeslaS,
}

/// Connector mounting format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorFormat {
    Socket,
    Cable,
}

/// Electrical power type at a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerType {
    #[serde(rename = "AC_1_PHASE")]
    Ac1Phase,
    #[serde(rename = "AC_3_PHASE")]
    Ac3Phase,
    #[serde(rename = "DC")]
    Dc,
}

/// Kind of parking at a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkingType {
    AlongMotorway,
    ParkingGarage,
    ParkingLot,
    OnDriveway,
    OnStreet,
    UndergroundGarage,
}

/// Facility available at or near a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Facility {
    Hotel,
    Restaurant,
    Cafe,
    Mall,
    Supermarket,
    Sport,
    RecreationArea,
    Nature,
    Museum,
    BikeSharing,
    BusStop,
    TaxiStand,
    TramStop,
    MetroStation,
    TrainStation,
    Airport,
    ParkingLot,
    CarpoolParking,
    FuelStation,
    Wifi,
}

/// EVSE or terminal capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    ChargingProfileCapable,
    ChargingPreferencesCapable,
    ChipCardSupport,
    ContactlessCardSupport,
    CreditCardPayable,
    DebitCardPayable,
    PedTerminal,
    RemoteStartStopCapable,
    Reservable,
    RfidReader,
    TokenGroupCapable,
    UnlockCapable,
}

/// Who may park at an EVSE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkingRestriction {
    EvOnly,
    Plugged,
    Disabled,
    Customers,
    Motorcycles,
}

/// What an image illustrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageCategory {
    Charger,
    Entrance,
    Location,
    Network,
    Operator,
    Other,
    Owner,
}

/// Primary source of delivered energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergySourceCategory {
    Nuclear,
    GeneralFossil,
    Coal,
    Gas,
    GeneralGreen,
    Solar,
    Wind,
    Water,
}

/// Environmental impact category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentalImpactCategory {
    NuclearWaste,
    CarbonDioxide,
}

/// How a session was authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthMethod {
    AuthRequest,
    Command,
    Whitelist,
}

/// Kind of authorization token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    AdHocUser,
    AppUser,
    Other,
    Rfid,
}

/// Tariff applicability class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TariffType {
    AdHocPayment,
    ProfileCheap,
    ProfileFast,
    ProfileGreen,
    Regular,
}

/// Dimension a price component is charged over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TariffDimension {
    Energy,
    Flat,
    ParkingTime,
    Time,
}

/// Dimension of a charging-period measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CdrDimensionType {
    Energy,
    MaxCurrent,
    MinCurrent,
    MaxPower,
    MinPower,
    ParkingTime,
    ReservationTime,
    Time,
}

/// Weekday in tariff restrictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Vehicle class a parking place admits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Motorcycle,
    PersonalVehicle,
    PersonalVehicleWithTrailer,
    Van,
    Truck,
    Bus,
    Disabled,
}

// ============================================================================
// Composite types
// ============================================================================

/// WGS-84 coordinates; OCPI transports them as decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: String,
    pub longitude: String,
}

/// Coordinates of a related point of interest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalGeoLocation {
    pub latitude: String,
    pub longitude: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<DisplayText>,
}

/// Localized text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayText {
    pub language: String,
    pub text: String,
}

/// Operator, suboperator or owner details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDetails {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<Image>,
}

/// Reference to an image resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub category: ImageCategory,
    #[serde(rename = "type")]
    pub image_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Energy mix delivered at a location or under a tariff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyMix {
    pub is_green_energy: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub energy_sources: Vec<EnergySource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environ_impact: Vec<EnvironmentalImpact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_product_name: Option<String>,
}

/// Share of one energy source in the mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySource {
    pub source: EnergySourceCategory,
    pub percentage: f64,
}

/// Environmental impact of the delivered energy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalImpact {
    pub category: EnvironmentalImpactCategory,
    pub amount: f64,
}

/// Monetary amount, excluding and optionally including VAT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub excl_vat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incl_vat: Option<f64>,
}

/// Opening hours of a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hours {
    pub twentyfourseven: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regular_hours: Vec<RegularHours>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptional_openings: Vec<ExceptionalPeriod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptional_closings: Vec<ExceptionalPeriod>,
}

/// Recurring weekly opening period, times as "HH:MM"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularHours {
    pub weekday: u8,
    pub period_begin: String,
    pub period_end: String,
}

/// One-off opening or closing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionalPeriod {
    #[serde(with = "ocpi_core::timestamp::serde_iso8601")]
    pub period_begin: chrono::DateTime<chrono::Utc>,
    #[serde(with = "ocpi_core::timestamp::serde_iso8601")]
    pub period_end: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_country_code_validation() {
        assert!(CountryCode::new("DE").is_ok());
        assert!(CountryCode::new("de").is_err());
        assert!(CountryCode::new("DEU").is_err());
        assert!(CountryCode::new("").is_err());
    }

    #[test]
    fn test_party_id_validation() {
        assert!(PartyId::new("GEF").is_ok());
        assert!(PartyId::new("GE").is_err());
        assert!(PartyId::new("G!F").is_err());
    }

    #[test]
    fn test_identifier_limits() {
        assert!(EvseUid::new("DE*GEF*E*LOC0001*1").is_ok());
        assert!(EvseUid::new("").is_err());
        assert!(EvseUid::new("x".repeat(37)).is_err());
        assert!(EvseUid::new("bad\nuid").is_err());
    }

    #[test]
    fn test_malformed_scalar_fails_deserialization() {
        let result: Result<CountryCode, _> = serde_json::from_value(json!("germany"));
        assert!(result.is_err());
    }

    #[test]
    fn test_enum_wire_spelling() {
        assert_eq!(
            serde_json::to_value(EvseStatus::OutOfOrder).unwrap(),
            json!("OUTOFORDER")
        );
        assert_eq!(
            serde_json::to_value(ConnectorStandard::Iec62196T2Combo).unwrap(),
            json!("IEC_62196_T2_COMBO")
        );
        assert_eq!(serde_json::to_value(PowerType::Ac3Phase).unwrap(), json!("AC_3_PHASE"));
        assert_eq!(
            serde_json::to_value(SessionStatus::Completed).unwrap(),
            json!("COMPLETED")
        );
    }

    #[test]
    fn test_energy_mix_round_trip() {
        let mix = EnergyMix {
            is_green_energy: true,
            energy_sources: vec![EnergySource {
                source: EnergySourceCategory::Solar,
                percentage: 100.0,
            }],
            environ_impact: vec![],
            supplier_name: Some("Grid Co".to_string()),
            energy_product_name: None,
        };

        let json = serde_json::to_value(&mix).unwrap();
        assert!(json.get("environ_impact").is_none());
        let parsed: EnergyMix = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, mix);
    }
}
