//! Data-driven scenario and config loading for the Incursion engine.
//!
//! A scenario file (RON, TOML or JSON) describes the galaxy, the ship
//! catalog, the players and their starting holdings, plus an optional
//! opening script of [`incursion_core::Command`]s. Loading turns it into a
//! ready [`Scenario`].

pub mod loader;
pub mod scenario;
pub mod schema;

pub use loader::{DataLoadError, Format, load_config, load_scenario, load_scenario_dir};
pub use scenario::Scenario;
pub use schema::ScenarioData;
