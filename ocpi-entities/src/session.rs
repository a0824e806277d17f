//! OCPI Session entity
//!
//! A charging session from plug-in to plug-out. Like every entity it is
//! "mutated" only by producing a new instance: via the merge-patch gate, via
//! [`Session::update`], or via the session-specific [`Session::complete`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ocpi_core::timestamp;

use crate::codec::{compute_etag, reconcile_identity, BuildError, OcpiEntity, ParseError};
use crate::values::{
    AuthMethod, CdrDimensionType, ConnectorId, CountryCode, EvseUid, LocationId, PartyId, Price,
    SessionId, SessionStatus, TariffId, TokenType,
};

/// Token a driver used to authorize the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdrToken {
    pub uid: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub contract_id: String,
}

/// One measured value within a charging period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdrDimension {
    #[serde(rename = "type")]
    pub dimension_type: CdrDimensionType,
    pub volume: f64,
}

/// A span of the session during which one tariff applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingPeriod {
    #[serde(with = "timestamp::serde_iso8601")]
    pub start_date_time: DateTime<Utc>,
    pub dimensions: Vec<CdrDimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tariff_id: Option<TariffId>,
}

/// One charging session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub country_code: CountryCode,
    pub party_id: PartyId,
    pub id: SessionId,
    #[serde(with = "timestamp::serde_iso8601")]
    pub start_date_time: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::serde_iso8601_opt"
    )]
    pub end_date_time: Option<DateTime<Utc>>,
    pub kwh: f64,
    pub cdr_token: CdrToken,
    pub auth_method: AuthMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_reference: Option<String>,
    pub location_id: LocationId,
    pub evse_uid: EvseUid,
    pub connector_id: ConnectorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_id: Option<String>,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charging_periods: Vec<ChargingPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Price>,
    pub status: SessionStatus,
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

impl Session {
    /// Parse a session document, reconciling an optional URL-supplied id
    /// with the body (disagreement is a hard failure).
    pub fn parse(doc: &Value, url_id: Option<&SessionId>) -> Result<Self, ParseError> {
        let doc = reconcile_identity(doc, "id", url_id.map(|id| id.as_str()), Self::ENTITY_NAME)?;
        Self::from_document(&doc)
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Produce a new session with the given changes applied, advancing
    /// `last_updated` and recomputing the ETag. The receiver is untouched.
    pub fn update(&self, apply: impl FnOnce(&mut Self)) -> Result<Self, ParseError> {
        let mut next = self.clone();
        apply(&mut next);
        next.last_updated = timestamp::now();
        next.etag = compute_etag(&next)?;
        Ok(next)
    }

    /// Close the session: set the end time and final energy, mark it
    /// COMPLETED. Produces a new instance.
    pub fn complete(&self, end_date_time: DateTime<Utc>, kwh: f64) -> Result<Self, ParseError> {
        self.update(|session| {
            session.end_date_time = Some(end_date_time);
            session.kwh = kwh;
            session.status = SessionStatus::Completed;
        })
    }
}

impl OcpiEntity for Session {
    const ENTITY_NAME: &'static str = "session";
    const PROTECTED_KEYS: &'static [&'static str] = &["country_code", "party_id", "id"];

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn etag(&self) -> &str {
        &self.etag
    }

    fn from_document(doc: &Value) -> Result<Self, ParseError> {
        let mut session: Self =
            serde_json::from_value(doc.clone()).map_err(|e| ParseError::Malformed {
                entity: Self::ENTITY_NAME,
                message: e.to_string(),
            })?;
        session.etag = compute_etag(&session)?;
        Ok(session)
    }
}

impl PartialOrd for Session {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(
            self.id
                .cmp(&other.id)
                .then_with(|| self.last_updated.cmp(&other.last_updated)),
        )
    }
}

/// Mutable staging object for a [`Session`]
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    pub country_code: Option<CountryCode>,
    pub party_id: Option<PartyId>,
    pub id: Option<SessionId>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub kwh: Option<f64>,
    pub cdr_token: Option<CdrToken>,
    pub auth_method: Option<AuthMethod>,
    pub authorization_reference: Option<String>,
    pub location_id: Option<LocationId>,
    pub evse_uid: Option<EvseUid>,
    pub connector_id: Option<ConnectorId>,
    pub meter_id: Option<String>,
    pub currency: Option<String>,
    pub charging_periods: Vec<ChargingPeriod>,
    pub total_cost: Option<Price>,
    pub status: Option<SessionStatus>,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl SessionBuilder {
    pub fn country_code(mut self, country_code: CountryCode) -> Self {
        self.country_code = Some(country_code);
        self
    }

    pub fn party_id(mut self, party_id: PartyId) -> Self {
        self.party_id = Some(party_id);
        self
    }

    pub fn id(mut self, id: SessionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn start_date_time(mut self, ts: DateTime<Utc>) -> Self {
        self.start_date_time = Some(ts);
        self
    }

    pub fn kwh(mut self, kwh: f64) -> Self {
        self.kwh = Some(kwh);
        self
    }

    pub fn cdr_token(mut self, token: CdrToken) -> Self {
        self.cdr_token = Some(token);
        self
    }

    pub fn auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = Some(auth_method);
        self
    }

    pub fn location_id(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn evse_uid(mut self, evse_uid: EvseUid) -> Self {
        self.evse_uid = Some(evse_uid);
        self
    }

    pub fn connector_id(mut self, connector_id: ConnectorId) -> Self {
        self.connector_id = Some(connector_id);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn charging_period(mut self, period: ChargingPeriod) -> Self {
        self.charging_periods.push(period);
        self
    }

    pub fn status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn last_updated(mut self, ts: DateTime<Utc>) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Validate and seal into an immutable session.
    ///
    /// `kwh` defaults to 0, `status` to PENDING, `last_updated` to the
    /// current wall clock.
    pub fn build(self) -> Result<Session, BuildError> {
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
        if self.start_date_time.is_none() {
            missing.push("start_date_time");
        }
        if self.cdr_token.is_none() {
            missing.push("cdr_token");
        }
        if self.auth_method.is_none() {
            missing.push("auth_method");
        }
        if self.location_id.is_none() {
            missing.push("location_id");
        }
        if self.evse_uid.is_none() {
            missing.push("evse_uid");
        }
        if self.connector_id.is_none() {
            missing.push("connector_id");
        }
        if self.currency.is_none() {
            missing.push("currency");
        }

        let (
            Some(country_code),
            Some(party_id),
            Some(id),
            Some(start_date_time),
            Some(cdr_token),
            Some(auth_method),
            Some(location_id),
            Some(evse_uid),
            Some(connector_id),
            Some(currency),
        ) = (
            self.country_code,
            self.party_id,
            self.id,
            self.start_date_time,
            self.cdr_token,
            self.auth_method,
            self.location_id,
            self.evse_uid,
            self.connector_id,
            self.currency,
        )
        else {
            return Err(BuildError::MissingFields {
                entity: Session::ENTITY_NAME,
                missing,
            });
        };

        let mut session = Session {
            country_code,
            party_id,
            id,
            start_date_time,
            end_date_time: self.end_date_time,
            kwh: self.kwh.unwrap_or(0.0),
            cdr_token,
            auth_method,
            authorization_reference: self.authorization_reference,
            location_id,
            evse_uid,
            connector_id,
            meter_id: self.meter_id,
            currency,
            charging_periods: self.charging_periods,
            total_cost: self.total_cost,
            status: self.status.unwrap_or(SessionStatus::Pending),
            created: self.created,
            last_updated: self.last_updated.unwrap_or_else(timestamp::now),
            etag: String::new(),
        };
        session.etag = compute_etag(&session)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_doc() -> Value {
        json!({
            "country_code": "DE",
            "party_id": "GEF",
            "id": "SESS-0001",
            "start_date_time": "2024-01-01T08:00:00.000Z",
            "kwh": 12.5,
            "cdr_token": {
                "uid": "TOKEN-1",
                "type": "RFID",
                "contract_id": "DE-8AA-CA2B3C4D5-L"
            },
            "auth_method": "WHITELIST",
            "location_id": "LOC0001",
            "evse_uid": "EVSE-1",
            "connector_id": "1",
            "currency": "EUR",
            "status": "ACTIVE",
            "last_updated": "2024-01-01T08:30:00.000Z"
        })
    }

    #[test]
    fn test_round_trip() {
        let session = Session::from_document(&session_doc()).unwrap();
        let doc = session.to_document().unwrap();
        let reparsed = Session::from_document(&doc).unwrap();

        assert_eq!(reparsed, session);
        assert_eq!(reparsed.etag(), session.etag());
    }

    #[test]
    fn test_complete_produces_new_instance() {
        let session = Session::from_document(&session_doc()).unwrap();
        let end = timestamp::parse("2024-01-01T10:00:00Z").unwrap();

        let completed = session.complete(end, 30.2).unwrap();

        assert_eq!(completed.status, SessionStatus::Completed);
        assert_eq!(completed.end_date_time, Some(end));
        assert_eq!(completed.kwh, 30.2);
        assert!(completed.last_updated > session.last_updated);
        assert_ne!(completed.etag(), session.etag());

        // The original is untouched.
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.end_date_time, None);
    }

    #[test]
    fn test_update_recomputes_etag() {
        let session = Session::from_document(&session_doc()).unwrap();
        let updated = session.update(|s| s.kwh = 13.0).unwrap();

        assert_eq!(updated.kwh, 13.0);
        assert_ne!(updated.etag(), session.etag());
    }

    #[test]
    fn test_builder_defaults() {
        let session = Session::builder()
            .country_code(CountryCode::new("DE").unwrap())
            .party_id(PartyId::new("GEF").unwrap())
            .id(SessionId::new("SESS-0002").unwrap())
            .start_date_time(timestamp::now())
            .cdr_token(CdrToken {
                uid: "TOKEN-1".to_string(),
                token_type: TokenType::AppUser,
                contract_id: "DE-8AA-CA2B3C4D5-L".to_string(),
            })
            .auth_method(AuthMethod::Command)
            .location_id(LocationId::new("LOC0001").unwrap())
            .evse_uid(EvseUid::new("EVSE-1").unwrap())
            .connector_id(ConnectorId::new("1").unwrap())
            .currency("EUR")
            .build()
            .unwrap();

        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.kwh, 0.0);
    }

    #[test]
    fn test_builder_missing_fields() {
        let err = Session::builder().build().unwrap_err();
        match err {
            BuildError::MissingFields { entity, missing } => {
                assert_eq!(entity, "session");
                assert!(missing.contains(&"cdr_token"));
                assert!(missing.contains(&"currency"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
