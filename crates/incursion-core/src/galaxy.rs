//! Planets and the connections between them.

use crate::campaign::Campaign;
use crate::error::{CampaignError, EntityKind};
use crate::id::{FactionId, PlanetId, PlayerId};
use crate::ledger::PlayerPlanetState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node in the galaxy graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    /// Income unit.
    pub value: u32,
    pub controlling_faction: FactionId,
    pub aligned_faction: FactionId,
    /// Neighbour -> distance. Kept symmetric with the neighbour's map.
    pub connections: BTreeMap<PlanetId, u32>,
    /// One entry per registered player.
    pub states: BTreeMap<PlayerId, PlayerPlanetState>,
}

impl Planet {
    pub fn distance_to(&self, other: &str) -> Option<u32> {
        self.connections.get(other).copied()
    }

    pub fn is_controlled_by(&self, faction: &str) -> bool {
        self.controlling_faction.as_str() == faction
    }
}

impl Campaign {
    /// Register a planet. Every existing player gets an empty holdings entry.
    pub fn add_planet(
        &mut self,
        id: &str,
        value: u32,
        controlling: &str,
        aligned: &str,
    ) -> Result<(), CampaignError> {
        self.ensure_open()?;
        if self.state.planets.contains_key(id) {
            return Err(CampaignError::duplicate(EntityKind::Planet, id));
        }
        let states = self
            .state
            .players
            .keys()
            .map(|player| (player.clone(), PlayerPlanetState::default()))
            .collect();
        self.state.planets.insert(
            PlanetId::from(id),
            Planet {
                value,
                controlling_faction: FactionId::from(controlling),
                aligned_faction: FactionId::from(aligned),
                connections: BTreeMap::new(),
                states,
            },
        );
        tracing::debug!(planet = id, value, controlling, aligned, "planet added");
        self.debug_check();
        Ok(())
    }

    /// Connect two planets in both directions. Re-adding an existing
    /// connection overwrites its distance on both sides.
    pub fn add_connection(&mut self, a: &str, b: &str, distance: u32) -> Result<(), CampaignError> {
        self.ensure_open()?;
        self.state.planet(a)?;
        self.state.planet(b)?;
        if distance == 0 {
            return Err(CampaignError::InvalidAmount(format!(
                "connection {a} <-> {b} must have a positive distance"
            )));
        }
        if a == b {
            return Err(CampaignError::InvalidAmount(format!(
                "planet {a} cannot connect to itself"
            )));
        }
        self.state
            .planet_mut(a)?
            .connections
            .insert(PlanetId::from(b), distance);
        self.state
            .planet_mut(b)?
            .connections
            .insert(PlanetId::from(a), distance);
        tracing::debug!(a, b, distance, "connection added");
        self.debug_check();
        Ok(())
    }

    /// Hand control of a planet to a faction.
    pub fn set_control(&mut self, planet: &str, faction: &str) -> Result<(), CampaignError> {
        self.ensure_open()?;
        self.state.planet_mut(planet)?.controlling_faction = FactionId::from(faction);
        tracing::debug!(planet, faction, "control changed");
        Ok(())
    }

    pub fn set_alignment(&mut self, planet: &str, faction: &str) -> Result<(), CampaignError> {
        self.ensure_open()?;
        self.state.planet_mut(planet)?.aligned_faction = FactionId::from(faction);
        tracing::debug!(planet, faction, "alignment changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn two_planets() -> Campaign {
        let mut c = Campaign::default();
        c.add_planet("A", 5, "Red", "Red").unwrap();
        c.add_planet("B", 3, "Blue", "Red").unwrap();
        c
    }

    #[test]
    fn duplicate_planet_rejected() {
        let mut c = two_planets();
        let err = c.add_planet("A", 1, "Blue", "Blue").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEntity);
        assert_eq!(c.state().planet("A").unwrap().value, 5);
    }

    #[test]
    fn connection_is_symmetric() {
        let mut c = two_planets();
        c.add_connection("A", "B", 4).unwrap();
        assert_eq!(c.state().planet("A").unwrap().distance_to("B"), Some(4));
        assert_eq!(c.state().planet("B").unwrap().distance_to("A"), Some(4));
    }

    #[test]
    fn readding_connection_overwrites_both_sides() {
        let mut c = two_planets();
        c.add_connection("A", "B", 4).unwrap();
        c.add_connection("B", "A", 7).unwrap();
        assert_eq!(c.state().planet("A").unwrap().distance_to("B"), Some(7));
        assert_eq!(c.state().planet("B").unwrap().distance_to("A"), Some(7));
    }

    #[test]
    fn connection_to_unknown_planet() {
        let mut c = two_planets();
        let err = c.add_connection("A", "Z", 1).unwrap_err();
        assert_eq!(err, CampaignError::unknown(EntityKind::Planet, "Z"));
        assert!(c.state().planet("A").unwrap().connections.is_empty());
    }

    #[test]
    fn zero_distance_and_self_loops_rejected() {
        let mut c = two_planets();
        assert_eq!(
            c.add_connection("A", "B", 0).unwrap_err().kind(),
            ErrorKind::InvalidAmount
        );
        assert_eq!(
            c.add_connection("A", "A", 2).unwrap_err().kind(),
            ErrorKind::InvalidAmount
        );
    }

    #[test]
    fn new_planet_backfills_existing_players() {
        let mut c = Campaign::default();
        c.add_player("ann", "Red").unwrap();
        c.add_planet("A", 1, "Red", "Red").unwrap();
        assert!(c.state().holdings("A", "ann").is_ok());
    }

    #[test]
    fn control_and_alignment_change() {
        let mut c = two_planets();
        c.set_control("B", "Red").unwrap();
        c.set_alignment("B", "Blue").unwrap();
        let b = c.state().planet("B").unwrap();
        assert!(b.is_controlled_by("Red"));
        assert_eq!(b.aligned_faction.as_str(), "Blue");
        assert_eq!(
            c.set_control("Z", "Red").unwrap_err().kind(),
            ErrorKind::UnknownEntity
        );
    }
}
