//! # OCPI Entities
//!
//! Immutable data-transfer objects for the OCPI protocol, one module per
//! resource:
//! - `location` / `evse` / `connector`: the locations module hierarchy
//! - `session`: charging sessions
//! - `tariff`: pricing
//! - `terminal`: payment terminals
//! - `parking`: parking places
//!
//! Shared machinery:
//! - `codec`: the [`OcpiEntity`] trait, the [`try_patch`] optimistic-
//!   concurrency gate and the [`EntitySlot`] compute-then-swap cell
//! - `collection`: version-tagged owned sub-entity lists
//! - `values`: identifiers, wire enums and small composites
//!
//! Every entity carries its canonical snake_case JSON mapping, an ETag
//! (SHA-256 of the canonical document) computed at construction, and a
//! `last_updated` timestamp enforced to advance monotonically by the patch
//! gate. "Mutation" always produces a new instance; a rejected patch leaves
//! the prior one bit-for-bit unchanged.

pub mod codec;
pub mod collection;
pub mod connector;
pub mod evse;
pub mod location;
pub mod parking;
pub mod session;
pub mod tariff;
pub mod terminal;
pub mod values;

pub use codec::{try_patch, BuildError, EntitySlot, OcpiEntity, ParseError};
pub use collection::OwnedCollection;
pub use connector::{Connector, ConnectorBuilder};
pub use evse::{Evse, EvseBuilder, StatusSchedule};
pub use location::{Location, LocationBuilder};
pub use parking::{Parking, ParkingBuilder};
pub use session::{CdrDimension, CdrToken, ChargingPeriod, Session, SessionBuilder};
pub use tariff::{PriceComponent, Tariff, TariffBuilder, TariffElement, TariffRestrictions};
pub use terminal::{Terminal, TerminalBuilder};

// Re-export the core types callers need to drive the gate.
pub use ocpi_core::{CorrelationId, PatchError, PatchOutcome};
