//! Deterministic state hashing.
//!
//! Two campaigns fed the same command stream must hash identically; the
//! per-subsystem hashes narrow down which part diverged when they don't.

use crate::campaign::{Campaign, CampaignState};
use crate::fixed::Fixed64;
use crate::ledger::{Fleet, PlayerPlanetState, ShipStock};
use crate::transit::{Propulsion, TransitOrder};

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of campaign state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a Fixed64 by its raw bits.
    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Length-prefixed, so `("ab", "c")` and `("a", "bc")` differ.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }

    fn write_stock(&mut self, stock: &ShipStock) {
        self.write_u64(stock.len() as u64);
        for (ship, count) in stock.iter() {
            self.write_str(ship.as_str());
            self.write_u32(count);
        }
    }

    fn write_fleet(&mut self, fleet: &Fleet) {
        self.write_stock(&fleet.ships);
        self.write_fixed64(fleet.resources);
    }

    fn write_holdings(&mut self, holdings: &PlayerPlanetState) {
        self.write_fixed64(holdings.resources);
        self.write_stock(&holdings.ships);
        self.write_stock(&holdings.production);
        self.write_u64(holdings.fleets.len() as u64);
        for (name, fleet) in &holdings.fleets {
            self.write_str(name.as_str());
            self.write_fleet(fleet);
        }
    }

    fn write_order(&mut self, order: &TransitOrder) {
        self.write_str(order.fleet_name.as_str());
        self.write_fleet(&order.fleet);
        self.write_str(order.origin.as_str());
        self.write_str(order.destination.as_str());
        self.write_u32(order.distance);
        self.write_u32(match order.propulsion {
            Propulsion::Hohmann => 0,
            Propulsion::Brachistochrone => 1,
        });
        self.write_u32(order.progress);
        self.write_fixed64(order.cost_per_unit);
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// SubsystemHashes
// ---------------------------------------------------------------------------

/// Per-subsystem state hashes for debugging desyncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsystemHashes {
    /// Planets, values, control, alignment and connections.
    pub galaxy: u64,
    /// Per-(planet, player) resources, stock, fleets and production.
    pub ledgers: u64,
    /// Players, factions and in-flight orders.
    pub players: u64,
    pub catalog: u64,
    pub turn: u64,
}

impl CampaignState {
    pub fn subsystem_hashes(&self) -> SubsystemHashes {
        SubsystemHashes {
            galaxy: self.hash_galaxy(),
            ledgers: self.hash_ledgers(),
            players: self.hash_players(),
            catalog: self.hash_catalog(),
            turn: {
                let mut h = StateHash::new();
                h.write_u64(self.turn);
                h.finish()
            },
        }
    }

    /// Hash of the whole state, folded from the subsystem hashes.
    pub fn state_hash(&self) -> u64 {
        let hashes = self.subsystem_hashes();
        let mut h = StateHash::new();
        h.write_u64(hashes.galaxy);
        h.write_u64(hashes.ledgers);
        h.write_u64(hashes.players);
        h.write_u64(hashes.catalog);
        h.write_u64(hashes.turn);
        h.finish()
    }

    // -- Subsystem hash helpers --

    fn hash_galaxy(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.planets.len() as u64);
        for (id, planet) in &self.planets {
            h.write_str(id.as_str());
            h.write_u32(planet.value);
            h.write_str(planet.controlling_faction.as_str());
            h.write_str(planet.aligned_faction.as_str());
            h.write_u64(planet.connections.len() as u64);
            for (to, distance) in &planet.connections {
                h.write_str(to.as_str());
                h.write_u32(*distance);
            }
        }
        h.finish()
    }

    fn hash_ledgers(&self) -> u64 {
        let mut h = StateHash::new();
        for (id, planet) in &self.planets {
            h.write_str(id.as_str());
            h.write_u64(planet.states.len() as u64);
            for (player, holdings) in &planet.states {
                h.write_str(player.as_str());
                h.write_holdings(holdings);
            }
        }
        h.finish()
    }

    fn hash_players(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.players.len() as u64);
        for (id, player) in &self.players {
            h.write_str(id.as_str());
            h.write_str(player.faction.as_str());
            h.write_u64(player.transits.len() as u64);
            for order in player.transits.values() {
                h.write_order(order);
            }
        }
        h.write_u64(self.factions.len() as u64);
        for (faction, members) in &self.factions {
            h.write_str(faction.as_str());
            h.write_u64(members.len() as u64);
            for member in members {
                h.write_str(member.as_str());
            }
        }
        h.finish()
    }

    fn hash_catalog(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.ships.len() as u64);
        for (id, ship) in self.ships.iter() {
            h.write_str(id.as_str());
            h.write_u32(ship.points);
            h.write_u32(ship.storage);
            h.write_u32(ship.mass);
        }
        h.finish()
    }
}

impl Campaign {
    pub fn state_hash(&self) -> u64 {
        self.state.state_hash()
    }

    pub fn subsystem_hashes(&self) -> SubsystemHashes {
        self.state.subsystem_hashes()
    }
}
