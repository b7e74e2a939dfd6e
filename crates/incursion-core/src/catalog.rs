use crate::fixed::{self, Resources};
use crate::id::ShipTypeId;
use crate::ledger::ShipStock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A ship template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipType {
    /// Production cost, and the basis of scrap refunds.
    pub points: u32,
    /// Resource capacity contributed when held in a fleet.
    pub storage: u32,
    /// Drives transit cost.
    pub mass: u32,
}

/// Aggregate stats of a ship composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetStats {
    pub total_points: u64,
    pub total_storage: u64,
    pub total_mass: u64,
}

impl FleetStats {
    /// Storage capacity as a resource amount. Saturates at the fixed-point maximum.
    pub fn capacity(&self) -> Resources {
        fixed::checked_from_count(self.total_storage).unwrap_or(Resources::MAX)
    }
}

/// Global registry of ship templates.
///
/// Unlike a frozen registry, the catalog stays open for the whole campaign:
/// registering an existing name replaces the template. Nothing derived from
/// the old template is recomputed; fleet stats are always read fresh from
/// the catalog, so the new values apply from the next computation on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipCatalog {
    ships: BTreeMap<ShipTypeId, ShipType>,
}

impl ShipCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a template. Returns the replaced template, if any.
    pub fn register(&mut self, id: ShipTypeId, ship: ShipType) -> Option<ShipType> {
        self.ships.insert(id, ship)
    }

    pub fn get(&self, id: &str) -> Option<&ShipType> {
        self.ships.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ships.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ShipTypeId, &ShipType)> {
        self.ships.iter()
    }

    /// Sum points, storage and mass over a composition. Types missing from
    /// the catalog contribute nothing. Totals saturate at `u64::MAX`.
    pub fn stats(&self, ships: &ShipStock) -> FleetStats {
        let mut stats = FleetStats::default();
        for (id, count) in ships.iter() {
            let Some(ship) = self.ships.get(id) else {
                continue;
            };
            let count = u64::from(count);
            let add = |total: u64, per_ship: u32| total.saturating_add(count.saturating_mul(u64::from(per_ship)));
            stats.total_points = add(stats.total_points, ship.points);
            stats.total_storage = add(stats.total_storage, ship.storage);
            stats.total_mass = add(stats.total_mass, ship.mass);
        }
        stats
    }

    /// Point value of `amount` ships of `id`, as a resource amount.
    /// None if the type is unknown or the value overflows.
    pub fn valuation(&self, id: &str, amount: u32) -> Option<Resources> {
        let ship = self.ships.get(id)?;
        fixed::checked_from_count(u64::from(ship.points) * u64::from(amount))
    }
}
