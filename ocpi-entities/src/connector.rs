//! OCPI Connector entity
//!
//! A connector is one plug or cable on an EVSE. It is owned by its EVSE:
//! the `connectors` array of the parent is protected from patching and
//! mutated only through the EVSE's collection operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ocpi_core::timestamp;

use crate::codec::{compute_etag, reconcile_identity, BuildError, OcpiEntity, ParseError};
use crate::values::{ConnectorFormat, ConnectorId, ConnectorStandard, PowerType, TariffId};

/// Technical characteristics of one plug or cable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub standard: ConnectorStandard,
    pub format: ConnectorFormat,
    pub power_type: PowerType,
    pub max_voltage: u32,
    pub max_amperage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_electric_power: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tariff_ids: Vec<TariffId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions: Option<String>,
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

impl Connector {
    /// Parse a connector document, reconciling an optional URL-supplied id
    /// with the body (disagreement is a hard failure).
    pub fn parse(doc: &Value, url_id: Option<&ConnectorId>) -> Result<Self, ParseError> {
        let doc = reconcile_identity(doc, "id", url_id.map(|id| id.as_str()), Self::ENTITY_NAME)?;
        Self::from_document(&doc)
    }

    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::default()
    }
}

impl OcpiEntity for Connector {
    const ENTITY_NAME: &'static str = "connector";
    const PROTECTED_KEYS: &'static [&'static str] = &["id"];

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn etag(&self) -> &str {
        &self.etag
    }

    fn from_document(doc: &Value) -> Result<Self, ParseError> {
        let mut connector: Self =
            serde_json::from_value(doc.clone()).map_err(|e| ParseError::Malformed {
                entity: Self::ENTITY_NAME,
                message: e.to_string(),
            })?;
        connector.etag = compute_etag(&connector)?;
        Ok(connector)
    }
}

impl PartialOrd for Connector {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(
            self.id
                .cmp(&other.id)
                .then_with(|| self.last_updated.cmp(&other.last_updated)),
        )
    }
}

/// Mutable staging object for a [`Connector`]
#[derive(Debug, Clone, Default)]
pub struct ConnectorBuilder {
    pub id: Option<ConnectorId>,
    pub standard: Option<ConnectorStandard>,
    pub format: Option<ConnectorFormat>,
    pub power_type: Option<PowerType>,
    pub max_voltage: Option<u32>,
    pub max_amperage: Option<u32>,
    pub max_electric_power: Option<u32>,
    pub tariff_ids: Vec<TariffId>,
    pub terms_and_conditions: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ConnectorBuilder {
    pub fn id(mut self, id: ConnectorId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn standard(mut self, standard: ConnectorStandard) -> Self {
        self.standard = Some(standard);
        self
    }

    pub fn format(mut self, format: ConnectorFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn power_type(mut self, power_type: PowerType) -> Self {
        self.power_type = Some(power_type);
        self
    }

    pub fn max_voltage(mut self, volts: u32) -> Self {
        self.max_voltage = Some(volts);
        self
    }

    pub fn max_amperage(mut self, amps: u32) -> Self {
        self.max_amperage = Some(amps);
        self
    }

    pub fn max_electric_power(mut self, watts: u32) -> Self {
        self.max_electric_power = Some(watts);
        self
    }

    pub fn tariff_id(mut self, tariff_id: TariffId) -> Self {
        self.tariff_ids.push(tariff_id);
        self
    }

    pub fn terms_and_conditions(mut self, url: impl Into<String>) -> Self {
        self.terms_and_conditions = Some(url.into());
        self
    }

    pub fn last_updated(mut self, ts: DateTime<Utc>) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Validate and seal into an immutable connector.
    ///
    /// Fails listing every missing mandatory field; `last_updated` defaults
    /// to the current wall clock.
    pub fn build(self) -> Result<Connector, BuildError> {
        let mut missing = Vec::new();
        if self.id.is_none() {
            missing.push("id");
        }
        if self.standard.is_none() {
            missing.push("standard");
        }
        if self.format.is_none() {
            missing.push("format");
        }
        if self.power_type.is_none() {
            missing.push("power_type");
        }
        if self.max_voltage.is_none() {
            missing.push("max_voltage");
        }
        if self.max_amperage.is_none() {
            missing.push("max_amperage");
        }

        let (Some(id), Some(standard), Some(format), Some(power_type), Some(max_voltage), Some(max_amperage)) = (
            self.id,
            self.standard,
            self.format,
            self.power_type,
            self.max_voltage,
            self.max_amperage,
        ) else {
            return Err(BuildError::MissingFields {
                entity: Connector::ENTITY_NAME,
                missing,
            });
        };

        let mut connector = Connector {
            id,
            standard,
            format,
            power_type,
            max_voltage,
            max_amperage,
            max_electric_power: self.max_electric_power,
            tariff_ids: self.tariff_ids,
            terms_and_conditions: self.terms_and_conditions,
            created: self.created,
            last_updated: self.last_updated.unwrap_or_else(timestamp::now),
            etag: String::new(),
        };
        connector.etag = compute_etag(&connector)?;
        Ok(connector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connector_doc() -> Value {
        json!({
            "id": "1",
            "standard": "IEC_62196_T2",
            "format": "SOCKET",
            "power_type": "AC_3_PHASE",
            "max_voltage": 400,
            "max_amperage": 32,
            "tariff_ids": ["TARIFF-1"],
            "last_updated": "2024-01-01T00:00:00.000Z"
        })
    }

    #[test]
    fn test_round_trip() {
        let connector = Connector::from_document(&connector_doc()).unwrap();
        let doc = connector.to_document().unwrap();
        let reparsed = Connector::from_document(&doc).unwrap();

        assert_eq!(reparsed, connector);
        assert_eq!(reparsed.etag(), connector.etag());
    }

    #[test]
    fn test_missing_mandatory_field_fails() {
        let mut doc = connector_doc();
        doc.as_object_mut().unwrap().remove("standard");

        let err = Connector::from_document(&doc).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { entity: "connector", .. }));
    }

    #[test]
    fn test_url_body_id_mismatch() {
        let url_id = ConnectorId::new("2").unwrap();
        let err = Connector::parse(&connector_doc(), Some(&url_id)).unwrap_err();
        assert!(matches!(err, ParseError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_url_id_injected_when_body_omits_it() {
        let mut doc = connector_doc();
        doc.as_object_mut().unwrap().remove("id");

        let url_id = ConnectorId::new("1").unwrap();
        let connector = Connector::parse(&doc, Some(&url_id)).unwrap();
        assert_eq!(connector.id, url_id);
    }

    #[test]
    fn test_builder_collects_missing_fields() {
        let err = Connector::builder()
            .id(ConnectorId::new("1").unwrap())
            .max_voltage(400)
            .build()
            .unwrap_err();

        match err {
            BuildError::MissingFields { missing, .. } => {
                assert_eq!(missing, vec!["standard", "format", "power_type", "max_amperage"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builder_seals_etag() {
        let connector = Connector::builder()
            .id(ConnectorId::new("1").unwrap())
            .standard(ConnectorStandard::Iec62196T2)
            .format(ConnectorFormat::Socket)
            .power_type(PowerType::Ac3Phase)
            .max_voltage(400)
            .max_amperage(32)
            .build()
            .unwrap();

        assert!(!connector.etag().is_empty());
    }
}
