//! OCPI Tariff entity
//!
//! Pricing structure: an ordered list of tariff elements, each with price
//! components and optional restrictions. Elements are plain arrays on the
//! wire and therefore replaced wholesale by a merge-patch, never merged
//! element-wise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ocpi_core::timestamp;

use crate::codec::{compute_etag, reconcile_identity, BuildError, OcpiEntity, ParseError};
use crate::values::{
    CountryCode, DayOfWeek, DisplayText, EnergyMix, PartyId, Price, TariffDimension, TariffId,
    TariffType,
};

/// Price per unit of one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceComponent {
    #[serde(rename = "type")]
    pub component_type: TariffDimension,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat: Option<f64>,
    pub step_size: u32,
}

/// Conditions under which a tariff element applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TariffRestrictions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub day_of_week: Vec<DayOfWeek>,
}

/// Price components plus the restrictions that scope them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffElement {
    pub price_components: Vec<PriceComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<TariffRestrictions>,
}

/// A charging tariff issued by one party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub country_code: CountryCode,
    pub party_id: PartyId,
    pub id: TariffId,
    pub currency: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tariff_type: Option<TariffType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tariff_alt_text: Vec<DisplayText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tariff_alt_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Price>,
    pub elements: Vec<TariffElement>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::serde_iso8601_opt"
    )]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::serde_iso8601_opt"
    )]
    pub end_date_time: Option<DateTime<Utc>>,
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

impl Tariff {
    /// Parse a tariff document, reconciling an optional URL-supplied id
    /// with the body (disagreement is a hard failure).
    pub fn parse(doc: &Value, url_id: Option<&TariffId>) -> Result<Self, ParseError> {
        let doc = reconcile_identity(doc, "id", url_id.map(|id| id.as_str()), Self::ENTITY_NAME)?;
        Self::from_document(&doc)
    }

    pub fn builder() -> TariffBuilder {
        TariffBuilder::default()
    }
}

impl OcpiEntity for Tariff {
    const ENTITY_NAME: &'static str = "tariff";
    const PROTECTED_KEYS: &'static [&'static str] = &["country_code", "party_id", "id"];

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn etag(&self) -> &str {
        &self.etag
    }

    fn from_document(doc: &Value) -> Result<Self, ParseError> {
        let mut tariff: Self =
            serde_json::from_value(doc.clone()).map_err(|e| ParseError::Malformed {
                entity: Self::ENTITY_NAME,
                message: e.to_string(),
            })?;
        tariff.etag = compute_etag(&tariff)?;
        Ok(tariff)
    }
}

impl PartialOrd for Tariff {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(
            self.id
                .cmp(&other.id)
                .then_with(|| self.last_updated.cmp(&other.last_updated)),
        )
    }
}

/// Mutable staging object for a [`Tariff`]
#[derive(Debug, Clone, Default)]
pub struct TariffBuilder {
    pub country_code: Option<CountryCode>,
    pub party_id: Option<PartyId>,
    pub id: Option<TariffId>,
    pub currency: Option<String>,
    pub tariff_type: Option<TariffType>,
    pub tariff_alt_text: Vec<DisplayText>,
    pub tariff_alt_url: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub elements: Vec<TariffElement>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub energy_mix: Option<EnergyMix>,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TariffBuilder {
    pub fn country_code(mut self, country_code: CountryCode) -> Self {
        self.country_code = Some(country_code);
        self
    }

    pub fn party_id(mut self, party_id: PartyId) -> Self {
        self.party_id = Some(party_id);
        self
    }

    pub fn id(mut self, id: TariffId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn tariff_type(mut self, tariff_type: TariffType) -> Self {
        self.tariff_type = Some(tariff_type);
        self
    }

    pub fn element(mut self, element: TariffElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn min_price(mut self, price: Price) -> Self {
        self.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: Price) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn last_updated(mut self, ts: DateTime<Utc>) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Validate and seal into an immutable tariff. At least one element is
    /// required.
    pub fn build(self) -> Result<Tariff, BuildError> {
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
        if self.currency.is_none() {
            missing.push("currency");
        }
        if self.elements.is_empty() {
            missing.push("elements");
        }

        let (Some(country_code), Some(party_id), Some(id), Some(currency)) =
            (self.country_code, self.party_id, self.id, self.currency)
        else {
            return Err(BuildError::MissingFields {
                entity: Tariff::ENTITY_NAME,
                missing,
            });
        };
        if !missing.is_empty() {
            return Err(BuildError::MissingFields {
                entity: Tariff::ENTITY_NAME,
                missing,
            });
        }

        let mut tariff = Tariff {
            country_code,
            party_id,
            id,
            currency,
            tariff_type: self.tariff_type,
            tariff_alt_text: self.tariff_alt_text,
            tariff_alt_url: self.tariff_alt_url,
            min_price: self.min_price,
            max_price: self.max_price,
            elements: self.elements,
            start_date_time: self.start_date_time,
            end_date_time: self.end_date_time,
            energy_mix: self.energy_mix,
            created: self.created,
            last_updated: self.last_updated.unwrap_or_else(timestamp::now),
            etag: String::new(),
        };
        tariff.etag = compute_etag(&tariff)?;
        Ok(tariff)
    }
}
