//! Incursion Core -- the campaign engine for a turn-based space wargame.
//!
//! Factions and their players hold planets, build ships, group them into
//! fleets, move resources around and send fleets between planets. The
//! engine owns the canonical state, validates every operation before it
//! writes, and resolves turns deterministically with fixed-point
//! arithmetic.
//!
//! # Turn Pipeline
//!
//! Each call to [`campaign::Campaign::advance_turn`] resolves one turn on a
//! copy of the state, then commits it in one swap:
//!
//! 1. **Income** -- Controlled planets pay `value x ratio`, split evenly
//!    among the controlling faction's members.
//! 2. **Transit** -- Every in-flight fleet pays for its next tick and
//!    advances, arrives, or stalls if it cannot pay.
//! 3. **Contact** -- Planets where more than one faction has ships are
//!    reported. Nothing is resolved automatically.
//! 4. **Production** -- Queued ships join their owner's stock.
//! 5. **Bookkeeping** -- Increment the turn counter, deliver events.
//!
//! # Key Types
//!
//! - [`campaign::Campaign`] -- State, config, turn phase and event bus; every
//!   operation is a method on it.
//! - [`campaign::CampaignState`] -- The persisted document.
//! - [`command::Command`] -- Serializable request enum for front ends.
//! - [`fixed::Resources`] -- Q32.32 fixed-point type for deterministic math.
//! - [`event::EventBus`] -- Buffered typed events with passive listeners.
//! - [`store::Session`] -- A campaign bound to a [`store::CampaignStore`].
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod campaign;
pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod fixed;
pub mod fleet;
pub mod galaxy;
pub mod id;
pub mod ledger;
pub mod production;
pub mod query;
pub mod registry;
pub mod serialize;
pub mod sim;
pub mod store;
pub mod transit;
pub mod turn;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use campaign::{Campaign, CampaignState, TurnPhase};
pub use command::{Command, CommandLog, Outcome};
pub use config::CampaignConfig;
pub use error::{CampaignError, EntityKind, ErrorKind};
pub use fixed::{Resources, Turn};
pub use fleet::Location;
pub use id::{FactionId, FleetName, PlanetId, PlayerId, ShipTypeId};
pub use ledger::{Fleet, ShipStock};
pub use transit::Propulsion;
pub use turn::TurnReport;
