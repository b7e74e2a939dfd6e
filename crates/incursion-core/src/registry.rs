//! Players, factions and the ship catalog's registration surface.

use crate::campaign::Campaign;
use crate::catalog::{FleetStats, ShipType};
use crate::error::{CampaignError, EntityKind};
use crate::id::{FactionId, PlayerId, ShipTypeId, TransitId};
use crate::ledger::{PlayerPlanetState, ShipStock};
use crate::transit::TransitOrder;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// A registered player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub faction: FactionId,
    /// In-flight orders. At most one per fleet name.
    pub transits: SlotMap<TransitId, TransitOrder>,
}

impl Player {
    pub fn new(faction: FactionId) -> Self {
        Self {
            faction,
            transits: SlotMap::with_key(),
        }
    }

    /// The in-flight order carrying the named fleet, if any.
    pub fn transit_for(&self, fleet: &str) -> Option<(TransitId, &TransitOrder)> {
        self.transits
            .iter()
            .find(|(_, order)| order.fleet_name.as_str() == fleet)
    }
}

impl Campaign {
    /// Register a player in a faction. Every existing planet gets an empty
    /// holdings entry for them.
    pub fn add_player(&mut self, id: &str, faction: &str) -> Result<(), CampaignError> {
        self.ensure_open()?;
        if self.state.players.contains_key(id) {
            return Err(CampaignError::duplicate(EntityKind::Player, id));
        }
        let player = PlayerId::from(id);
        let faction_id = FactionId::from(faction);
        for planet in self.state.planets.values_mut() {
            planet
                .states
                .insert(player.clone(), PlayerPlanetState::default());
        }
        self.state
            .factions
            .entry(faction_id.clone())
            .or_default()
            .insert(player.clone());
        self.state.players.insert(player, Player::new(faction_id));
        tracing::debug!(player = id, faction, "player added");
        self.debug_check();
        Ok(())
    }

    /// Move a player to another faction.
    pub fn reassign_player(&mut self, id: &str, faction: &str) -> Result<(), CampaignError> {
        self.ensure_open()?;
        let player = self.state.player_mut(id)?;
        let previous = std::mem::replace(&mut player.faction, FactionId::from(faction));
        if let Some(members) = self.state.factions.get_mut(previous.as_str()) {
            members.remove(id);
            if members.is_empty() {
                self.state.factions.remove(previous.as_str());
            }
        }
        self.state
            .factions
            .entry(FactionId::from(faction))
            .or_default()
            .insert(PlayerId::from(id));
        tracing::debug!(player = id, from = %previous, to = faction, "player reassigned");
        self.debug_check();
        Ok(())
    }

    /// Insert or replace a ship template. Existing ships and fleets are not
    /// recalculated; stats computed afterwards use the new template.
    /// Returns the replaced template, if any.
    pub fn register_ship_type(
        &mut self,
        id: &str,
        points: u32,
        storage: u32,
        mass: u32,
    ) -> Result<Option<ShipType>, CampaignError> {
        self.ensure_open()?;
        let previous = self.state.ships.register(
            ShipTypeId::from(id),
            ShipType {
                points,
                storage,
                mass,
            },
        );
        tracing::debug!(ship = id, points, storage, mass, replaced = previous.is_some(), "ship type registered");
        Ok(previous)
    }

    /// Points, storage and mass of a composition against the current catalog.
    pub fn fleet_stats(&self, ships: &ShipStock) -> FleetStats {
        self.state.ships.stats(ships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn add_player_indexes_faction() {
        let mut c = Campaign::default();
        c.add_player("ann", "Red").unwrap();
        c.add_player("bob", "Red").unwrap();
        c.add_player("cat", "Blue").unwrap();
        let red: Vec<&str> = c.state().members("Red").map(|p| p.as_str()).collect();
        assert_eq!(red, vec!["ann", "bob"]);
        assert_eq!(c.state().members("Green").count(), 0);
    }

    #[test]
    fn duplicate_player_rejected() {
        let mut c = Campaign::default();
        c.add_player("ann", "Red").unwrap();
        let err = c.add_player("ann", "Blue").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEntity);
        assert_eq!(c.state().player("ann").unwrap().faction.as_str(), "Red");
    }

    #[test]
    fn new_player_backfills_planets() {
        let mut c = Campaign::default();
        c.add_planet("A", 1, "Red", "Red").unwrap();
        c.add_planet("B", 1, "Red", "Red").unwrap();
        c.add_player("ann", "Red").unwrap();
        for planet in c.state().planets.values() {
            assert!(planet.states.contains_key("ann"));
        }
    }

    #[test]
    fn reassign_moves_membership() {
        let mut c = Campaign::default();
        c.add_player("ann", "Red").unwrap();
        c.reassign_player("ann", "Blue").unwrap();
        assert_eq!(c.state().player("ann").unwrap().faction.as_str(), "Blue");
        assert!(!c.state().factions.contains_key("Red"));
        assert_eq!(c.state().members("Blue").count(), 1);
        assert_eq!(
            c.reassign_player("zed", "Blue").unwrap_err().kind(),
            ErrorKind::UnknownEntity
        );
    }

    #[test]
    fn register_ship_type_upserts() {
        let mut c = Campaign::default();
        assert_eq!(c.register_ship_type("Fighter", 5, 1, 10).unwrap(), None);
        let old = c.register_ship_type("Fighter", 6, 1, 10).unwrap();
        assert_eq!(old.map(|s| s.points), Some(5));
        assert_eq!(c.state().ships.get("Fighter").map(|s| s.points), Some(6));
    }

    #[test]
    fn fleet_stats_against_catalog() {
        let mut c = Campaign::default();
        c.register_ship_type("Fighter", 5, 2, 10).unwrap();
        let ships: ShipStock = [(ShipTypeId::from("Fighter"), 4)].into_iter().collect();
        let stats = c.fleet_stats(&ships);
        assert_eq!(stats.total_points, 20);
        assert_eq!(stats.total_storage, 8);
        assert_eq!(stats.total_mass, 40);
    }
}
