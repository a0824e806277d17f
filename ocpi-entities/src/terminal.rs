//! OCPI Terminal entity
//!
//! A payment terminal serving one or more locations/EVSEs. Most fields are
//! optional: a terminal may be announced before it is physically installed
//! and addressed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ocpi_core::timestamp;

use crate::codec::{compute_etag, reconcile_identity, BuildError, OcpiEntity, ParseError};
use crate::values::{Capability, CountryCode, EvseUid, GeoLocation, LocationId, PartyId, TerminalId};

/// A payment terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    pub uid: TerminalId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<CountryCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location_ids: Vec<LocationId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evse_uids: Vec<EvseUid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<Capability>,
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

impl Terminal {
    /// Parse a terminal document, reconciling an optional URL-supplied uid
    /// with the body (disagreement is a hard failure).
    pub fn parse(doc: &Value, url_uid: Option<&TerminalId>) -> Result<Self, ParseError> {
        let doc = reconcile_identity(doc, "uid", url_uid.map(|uid| uid.as_str()), Self::ENTITY_NAME)?;
        Self::from_document(&doc)
    }

    pub fn builder() -> TerminalBuilder {
        TerminalBuilder::default()
    }
}

impl OcpiEntity for Terminal {
    const ENTITY_NAME: &'static str = "terminal";
    // `connectors` matches no Terminal field; it mirrors the EVSE protected
    // set, as the upstream wire contract specifies. Left as-is rather than
    // guessing the intended set.
    const PROTECTED_KEYS: &'static [&'static str] = &["uid", "connectors"];

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn etag(&self) -> &str {
        &self.etag
    }

    fn from_document(doc: &Value) -> Result<Self, ParseError> {
        let mut terminal: Self =
            serde_json::from_value(doc.clone()).map_err(|e| ParseError::Malformed {
                entity: Self::ENTITY_NAME,
                message: e.to_string(),
            })?;
        terminal.etag = compute_etag(&terminal)?;
        Ok(terminal)
    }
}

impl PartialOrd for Terminal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(
            self.uid
                .cmp(&other.uid)
                .then_with(|| self.last_updated.cmp(&other.last_updated)),
        )
    }
}

/// Mutable staging object for a [`Terminal`]
#[derive(Debug, Clone, Default)]
pub struct TerminalBuilder {
    pub uid: Option<TerminalId>,
    pub reference: Option<String>,
    pub country_code: Option<CountryCode>,
    pub party_id: Option<PartyId>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<GeoLocation>,
    pub invoice_base_url: Option<String>,
    pub location_ids: Vec<LocationId>,
    pub evse_uids: Vec<EvseUid>,
    pub capabilities: Vec<Capability>,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TerminalBuilder {
    pub fn uid(mut self, uid: TerminalId) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn country_code(mut self, country_code: CountryCode) -> Self {
        self.country_code = Some(country_code);
        self
    }

    pub fn party_id(mut self, party_id: PartyId) -> Self {
        self.party_id = Some(party_id);
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

    pub fn coordinates(mut self, coordinates: GeoLocation) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn invoice_base_url(mut self, url: impl Into<String>) -> Self {
        self.invoice_base_url = Some(url.into());
        self
    }

    pub fn location_id(mut self, location_id: LocationId) -> Self {
        self.location_ids.push(location_id);
        self
    }

    pub fn evse_uid(mut self, evse_uid: EvseUid) -> Self {
        self.evse_uids.push(evse_uid);
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn last_updated(mut self, ts: DateTime<Utc>) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Validate and seal into an immutable terminal. Only `uid` is mandatory.
    pub fn build(self) -> Result<Terminal, BuildError> {
        let Some(uid) = self.uid else {
            return Err(BuildError::MissingFields {
                entity: Terminal::ENTITY_NAME,
                missing: vec!["uid"],
            });
        };

        let mut terminal = Terminal {
            uid,
            reference: self.reference,
            country_code: self.country_code,
            party_id: self.party_id,
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            country: self.country,
            coordinates: self.coordinates,
            invoice_base_url: self.invoice_base_url,
            location_ids: self.location_ids,
            evse_uids: self.evse_uids,
            capabilities: self.capabilities,
            created: self.created,
            last_updated: self.last_updated.unwrap_or_else(timestamp::now),
            etag: String::new(),
        };
        terminal.etag = compute_etag(&terminal)?;
        Ok(terminal)
    }
}
