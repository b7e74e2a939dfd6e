//! Read-only query API for inspecting campaign state.
//!
//! Provides owned snapshot types that aggregate campaign state into views
//! for front ends. Nothing here borrows into the live state, so a view can
//! outlive further mutation.

use crate::campaign::Campaign;
use crate::catalog::{FleetStats, ShipType};
use crate::error::{CampaignError, EntityKind};
use crate::fixed::Resources;
use crate::id::{FactionId, FleetName, PlanetId, PlayerId, ShipTypeId};
use crate::ledger::{PlayerPlanetState, ShipStock};
use crate::transit::Propulsion;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Planet view
// ---------------------------------------------------------------------------

/// A fleet as seen on a planet, with stats against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetView {
    pub name: FleetName,
    pub ships: ShipStock,
    pub resources: Resources,
    pub stats: FleetStats,
}

/// One player's holdings on one planet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingsView {
    pub player: PlayerId,
    pub resources: Resources,
    pub ships: ShipStock,
    pub fleets: Vec<FleetView>,
    /// Ships queued for the next turn boundary.
    pub production: ShipStock,
}

impl HoldingsView {
    pub fn is_empty(&self) -> bool {
        self.resources == Resources::ZERO
            && self.ships.is_empty()
            && self.fleets.is_empty()
            && self.production.is_empty()
    }
}

/// An aggregated, read-only view of a single planet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanetDetails {
    pub id: PlanetId,
    pub value: u32,
    pub controlling_faction: FactionId,
    pub aligned_faction: FactionId,
    /// Neighbours with distances, sorted by name.
    pub connections: Vec<(PlanetId, u32)>,
    /// Every player's holdings, sorted by player, including empty ones.
    pub holdings: Vec<HoldingsView>,
}

// ---------------------------------------------------------------------------
// Player view
// ---------------------------------------------------------------------------

/// An in-flight order as seen from its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitView {
    pub fleet: FleetName,
    pub origin: PlanetId,
    pub destination: PlanetId,
    pub propulsion: Propulsion,
    pub progress: u32,
    pub distance: u32,
    pub cost_per_unit: Resources,
    pub ships: ShipStock,
    pub resources: Resources,
}

/// An aggregated, read-only view of a single player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDetails {
    pub id: PlayerId,
    pub faction: FactionId,
    /// Planets where the player holds anything, sorted by planet.
    pub holdings: Vec<(PlanetId, HoldingsView)>,
    /// In-flight orders in slot order.
    pub transits: Vec<TransitView>,
}

impl PlayerDetails {
    /// Resources summed across planet pools, fleets and transits.
    pub fn net_worth(&self) -> Resources {
        let docked = self.holdings.iter().flat_map(|(_, h)| {
            std::iter::once(h.resources).chain(h.fleets.iter().map(|f| f.resources))
        });
        docked
            .chain(self.transits.iter().map(|t| t.resources))
            .fold(Resources::ZERO, |acc, r| acc.saturating_add(r))
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipTypeDetails<'a> {
    pub id: &'a ShipTypeId,
    pub ship: ShipType,
}

// ---------------------------------------------------------------------------
// Lookup by name / listing
// ---------------------------------------------------------------------------

/// Result of [`Campaign::details`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Details {
    Planet(PlanetDetails),
    Player(PlayerDetails),
    ShipType { id: ShipTypeId, ship: ShipType },
}

/// Which table [`Campaign::list`] walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Planets,
    Players,
    Factions,
    Ships,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown listing '{0}' (expected planets, players, factions or ships)")]
pub struct UnknownListKind(pub String);

impl FromStr for ListKind {
    type Err = UnknownListKind;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "planets" => Ok(ListKind::Planets),
            "players" => Ok(ListKind::Players),
            "factions" => Ok(ListKind::Factions),
            "ships" => Ok(ListKind::Ships),
            _ => Err(UnknownListKind(s.to_owned())),
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListKind::Planets => "planets",
            ListKind::Players => "players",
            ListKind::Factions => "factions",
            ListKind::Ships => "ships",
        };
        f.write_str(s)
    }
}

/// Result of [`Campaign::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Planets(Vec<PlanetDetails>),
    Players(Vec<PlayerDetails>),
    /// Faction with its members.
    Factions(Vec<(FactionId, Vec<PlayerId>)>),
    Ships(Vec<(ShipTypeId, ShipType)>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Listing::Planets(v) => v.len(),
            Listing::Players(v) => v.len(),
            Listing::Factions(v) => v.len(),
            Listing::Ships(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Campaign {
    fn holdings_view(&self, player: &PlayerId, holdings: &PlayerPlanetState) -> HoldingsView {
        HoldingsView {
            player: player.clone(),
            resources: holdings.resources,
            ships: holdings.ships.clone(),
            fleets: holdings
                .fleets
                .iter()
                .map(|(name, fleet)| FleetView {
                    name: name.clone(),
                    ships: fleet.ships.clone(),
                    resources: fleet.resources,
                    stats: self.state.ships.stats(&fleet.ships),
                })
                .collect(),
            production: holdings.production.clone(),
        }
    }

    pub fn planet_details(&self, id: &str) -> Result<PlanetDetails, CampaignError> {
        let (id, planet) = self
            .state
            .planets
            .get_key_value(id)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Planet, id))?;
        Ok(PlanetDetails {
            id: id.clone(),
            value: planet.value,
            controlling_faction: planet.controlling_faction.clone(),
            aligned_faction: planet.aligned_faction.clone(),
            connections: planet
                .connections
                .iter()
                .map(|(to, distance)| (to.clone(), *distance))
                .collect(),
            holdings: planet
                .states
                .iter()
                .map(|(player, holdings)| self.holdings_view(player, holdings))
                .collect(),
        })
    }

    pub fn player_details(&self, id: &str) -> Result<PlayerDetails, CampaignError> {
        let (id, player) = self
            .state
            .players
            .get_key_value(id)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Player, id))?;
        let holdings = self
            .state
            .planets
            .iter()
            .filter_map(|(planet_id, planet)| {
                let view = self.holdings_view(id, planet.states.get(id)?);
                (!view.is_empty()).then(|| (planet_id.clone(), view))
            })
            .collect();
        let transits = player
            .transits
            .values()
            .map(|order| TransitView {
                fleet: order.fleet_name.clone(),
                origin: order.origin.clone(),
                destination: order.destination.clone(),
                propulsion: order.propulsion,
                progress: order.progress,
                distance: order.distance,
                cost_per_unit: order.cost_per_unit,
                ships: order.fleet.ships.clone(),
                resources: order.fleet.resources,
            })
            .collect();
        Ok(PlayerDetails {
            id: id.clone(),
            faction: player.faction.clone(),
            holdings,
            transits,
        })
    }

    pub fn ship_type(&self, id: &str) -> Result<ShipTypeDetails<'_>, CampaignError> {
        let (id, ship) = self
            .state
            .ships
            .iter()
            .find(|(ship_id, _)| ship_id.as_str() == id)
            .ok_or_else(|| CampaignError::UnknownShipType(ShipTypeId::from(id)))?;
        Ok(ShipTypeDetails { id, ship: *ship })
    }

    /// Look a name up in planets, then players, then ship types.
    pub fn details(&self, name: &str) -> Result<Details, CampaignError> {
        if self.state.planets.contains_key(name) {
            return self.planet_details(name).map(Details::Planet);
        }
        if self.state.players.contains_key(name) {
            return self.player_details(name).map(Details::Player);
        }
        if let Some(ship) = self.state.ships.get(name) {
            return Ok(Details::ShipType {
                id: ShipTypeId::from(name),
                ship: *ship,
            });
        }
        Err(CampaignError::unknown(EntityKind::Entry, name))
    }

    pub fn list(&self, kind: ListKind) -> Listing {
        match kind {
            ListKind::Planets => Listing::Planets(
                self.state
                    .planets
                    .keys()
                    .filter_map(|id| self.planet_details(id.as_str()).ok())
                    .collect(),
            ),
            ListKind::Players => Listing::Players(
                self.state
                    .players
                    .keys()
                    .filter_map(|id| self.player_details(id.as_str()).ok())
                    .collect(),
            ),
            ListKind::Factions => Listing::Factions(self.state.rosters()),
            ListKind::Ships => Listing::Ships(
                self.state
                    .ships
                    .iter()
                    .map(|(id, ship)| (id.clone(), *ship))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Location;

    fn galaxy() -> Campaign {
        let mut c = Campaign::default();
        c.add_planet("A", 10, "Red", "Red").unwrap();
        c.add_planet("B", 5, "Blue", "Red").unwrap();
        c.add_connection("A", "B", 3).unwrap();
        c.add_player("ann", "Red").unwrap();
        c.add_player("bob", "Blue").unwrap();
        c.register_ship_type("Fighter", 5, 2, 3).unwrap();
        c.grant_ships("A", "ann", "Fighter", 6).unwrap();
        c.grant_resources("A", "ann", Resources::from_num(40)).unwrap();
        c
    }

    #[test]
    fn planet_details_include_every_player() {
        let c = galaxy();
        let d = c.planet_details("A").unwrap();
        assert_eq!(d.connections, vec![(PlanetId::from("B"), 3)]);
        assert_eq!(d.holdings.len(), 2);
        assert_eq!(d.holdings[0].player.as_str(), "ann");
        assert_eq!(d.holdings[0].ships.count("Fighter"), 6);
        assert!(d.holdings[1].is_empty());
    }

    #[test]
    fn player_details_skip_empty_planets() {
        let mut c = galaxy();
        let ships: ShipStock = [(ShipTypeId::from("Fighter"), 2)].into_iter().collect();
        c.make_fleet("A", "ann", "Alpha", &ships).unwrap();
        c.transfer_resources(
            "A",
            Resources::from_num(4),
            "ann",
            &Location::Planet,
            "ann",
            &Location::fleet("Alpha"),
        )
        .unwrap();
        let d = c.player_details("ann").unwrap();
        assert_eq!(d.holdings.len(), 1);
        let fleet = &d.holdings[0].1.fleets[0];
        assert_eq!(fleet.stats.total_storage, 4);
        assert_eq!(d.net_worth(), Resources::from_num(40));
    }

    #[test]
    fn details_searches_planets_players_then_ships() {
        let c = galaxy();
        assert!(matches!(c.details("A").unwrap(), Details::Planet(_)));
        assert!(matches!(c.details("bob").unwrap(), Details::Player(_)));
        assert!(matches!(c.details("Fighter").unwrap(), Details::ShipType { .. }));
        assert_eq!(
            c.details("Nothing").unwrap_err(),
            CampaignError::unknown(EntityKind::Entry, "Nothing")
        );
    }

    #[test]
    fn list_kinds() {
        let c = galaxy();
        assert_eq!("PLANETS".parse::<ListKind>().unwrap(), ListKind::Planets);
        assert!("moons".parse::<ListKind>().is_err());
        assert_eq!(c.list(ListKind::Planets).len(), 2);
        assert_eq!(c.list(ListKind::Ships).len(), 1);
        let Listing::Factions(factions) = c.list(ListKind::Factions) else {
            panic!("expected factions");
        };
        assert_eq!(factions[0].0.as_str(), "Blue");
    }

    #[test]
    fn ship_type_lookup() {
        let c = galaxy();
        assert_eq!(c.ship_type("Fighter").unwrap().ship.points, 5);
        assert!(c.ship_type("Ghost").is_err());
    }
}
