//! The campaign: canonical state plus the machinery around it.
//!
//! [`CampaignState`] is the persisted document. [`Campaign`] owns one,
//! together with its config, turn phase and event bus, and exposes every
//! operation. Operations are spread across the module that owns their
//! concern (`galaxy`, `registry`, `ledger`, `production`, `fleet`,
//! `transit`, `turn`); each validates fully before its first write.

use crate::catalog::{ShipCatalog, ShipType};
use crate::config::{CampaignConfig, ConfigError};
use crate::error::{CampaignError, EntityKind};
use crate::event::{Event, EventBus, EventKind, PassiveListener};
use crate::fixed::Turn;
use crate::galaxy::Planet;
use crate::id::{FactionId, PlanetId, PlayerId, ShipTypeId};
use crate::ledger::{Fleet, PlayerPlanetState};
use crate::registry::Player;
use crate::transit::TransitOrder;
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// The full persisted campaign document.
///
/// Every map is ordered so that iteration, hashing and serialization are
/// deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignState {
    pub planets: BTreeMap<PlanetId, Planet>,
    pub players: BTreeMap<PlayerId, Player>,
    /// Reverse index of `Player::faction`.
    pub factions: BTreeMap<FactionId, BTreeSet<PlayerId>>,
    pub ships: ShipCatalog,
    pub turn: Turn,
}

impl CampaignState {
    pub fn planet(&self, id: &str) -> Result<&Planet, CampaignError> {
        self.planets
            .get(id)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Planet, id))
    }

    pub(crate) fn planet_mut(&mut self, id: &str) -> Result<&mut Planet, CampaignError> {
        self.planets
            .get_mut(id)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Planet, id))
    }

    pub fn player(&self, id: &str) -> Result<&Player, CampaignError> {
        self.players
            .get(id)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Player, id))
    }

    pub(crate) fn player_mut(&mut self, id: &str) -> Result<&mut Player, CampaignError> {
        self.players
            .get_mut(id)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Player, id))
    }

    /// A player's holdings on a planet. Planet is checked before player.
    pub fn holdings(&self, planet: &str, player: &str) -> Result<&PlayerPlanetState, CampaignError> {
        let planet_ref = self.planet(planet)?;
        self.player(player)?;
        planet_ref
            .states
            .get(player)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Player, player))
    }

    pub(crate) fn holdings_mut(
        &mut self,
        planet: &str,
        player: &str,
    ) -> Result<&mut PlayerPlanetState, CampaignError> {
        self.planet(planet)?;
        self.player(player)?;
        self.planet_mut(planet)?
            .states
            .get_mut(player)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Player, player))
    }

    pub(crate) fn ship_type(&self, ship: &str) -> Result<&ShipType, CampaignError> {
        self.ships
            .get(ship)
            .ok_or_else(|| CampaignError::UnknownShipType(ShipTypeId::from(ship)))
    }

    /// Members of a faction, sorted. Empty for factions without players.
    pub fn members(&self, faction: &str) -> impl Iterator<Item = &PlayerId> {
        self.factions.get(faction).into_iter().flatten()
    }

    /// Every faction with its members, both sorted. Owned so that callers
    /// can mutate the state while walking them.
    pub(crate) fn rosters(&self) -> Vec<(FactionId, Vec<PlayerId>)> {
        self.factions
            .iter()
            .map(|(faction, members)| (faction.clone(), members.iter().cloned().collect()))
            .collect()
    }

    /// Fails when `fleet` would overflow a same-named fleet it has to merge
    /// into at `destination`.
    pub(crate) fn check_dock(
        &self,
        destination: &str,
        player: &str,
        name: &str,
        fleet: &Fleet,
    ) -> Result<(), CampaignError> {
        let holdings = self.holdings(destination, player)?;
        match holdings.fleets.get(name) {
            Some(existing) if !existing.can_absorb(fleet) => Err(CampaignError::InvalidAmount(format!(
                "fleet {name} cannot merge into the {name} already at {destination}: counts overflow"
            ))),
            _ => Ok(()),
        }
    }

    /// Put a finished order's fleet into the destination's fleet table.
    /// Merges into a same-named fleet already there. Returns whether a
    /// merge happened.
    pub(crate) fn dock(&mut self, player: &str, order: TransitOrder) -> Result<bool, CampaignError> {
        self.check_dock(order.destination.as_str(), player, order.fleet_name.as_str(), &order.fleet)?;
        let holdings = self.holdings_mut(order.destination.as_str(), player)?;
        match holdings.fleets.entry(order.fleet_name) {
            Entry::Occupied(mut existing) => {
                existing
                    .get_mut()
                    .absorb(order.fleet)
                    .map_err(|_| CampaignError::InvalidAmount("fleet merge overflows".to_string()))?;
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(order.fleet);
                Ok(false)
            }
        }
    }
}

/// Whether the campaign accepts commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnPhase {
    #[default]
    Open,
    Resolving,
}

/// A campaign: state, config, turn phase and event bus.
#[derive(Debug)]
pub struct Campaign {
    pub(crate) state: CampaignState,
    pub(crate) config: CampaignConfig,
    pub(crate) phase: TurnPhase,
    pub(crate) events: EventBus,
}

impl Campaign {
    pub fn new(config: CampaignConfig) -> Result<Self, ConfigError> {
        Self::from_state(CampaignState::default(), config)
    }

    /// Wrap an existing state, e.g. one restored from a snapshot.
    pub fn from_state(state: CampaignState, config: CampaignConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let events = EventBus::new(config.event_buffer_capacity);
        Ok(Self {
            state,
            config,
            phase: TurnPhase::Open,
            events,
        })
    }

    pub fn state(&self) -> &CampaignState {
        &self.state
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    pub fn turn(&self) -> Turn {
        self.state.turn
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Register a passive listener for one event kind.
    pub fn on_event(&mut self, kind: EventKind, listener: PassiveListener) {
        self.events.on_passive(kind, listener);
    }

    /// Deliver buffered events now rather than at the next turn boundary.
    pub fn deliver_events(&mut self) {
        self.events.deliver();
    }

    /// Consume the campaign, returning its state and config.
    pub fn into_parts(self) -> (CampaignState, CampaignConfig) {
        (self.state, self.config)
    }

    pub(crate) fn ensure_open(&self) -> Result<(), CampaignError> {
        match self.phase {
            TurnPhase::Open => Ok(()),
            TurnPhase::Resolving => Err(CampaignError::TurnInProgress),
        }
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }

    /// Invariant sweep after a committed mutation. Debug builds only.
    pub(crate) fn debug_check(&self) {
        if cfg!(debug_assertions) {
            let violations = validation::check_invariants(&self.state);
            debug_assert!(violations.is_empty(), "invariants violated: {violations:?}");
        }
    }
}

impl Default for Campaign {
    fn default() -> Self {
        let config = CampaignConfig::default();
        let events = EventBus::new(config.event_buffer_capacity);
        Self {
            state: CampaignState::default(),
            config,
            phase: TurnPhase::Open,
            events,
        }
    }
}
