//! Per-(planet, player) holdings: resources, ship stock, fleets and the
//! production queue, plus the grant, destroy and scrap operations on them.

use crate::campaign::Campaign;
use crate::error::CampaignError;
use crate::event::Event;
use crate::fixed::Resources;
use crate::id::{FleetName, ShipTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ship counts keyed by ship type. Zero counts are never stored: removing
/// the last ship of a type drops the entry, so absence and zero coincide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ShipTypeId, u32>",
    into = "BTreeMap<ShipTypeId, u32>"
)]
pub struct ShipStock(BTreeMap<ShipTypeId, u32>);

/// Zero entries are dropped on the way in.
impl From<BTreeMap<ShipTypeId, u32>> for ShipStock {
    fn from(mut counts: BTreeMap<ShipTypeId, u32>) -> Self {
        counts.retain(|_, count| *count > 0);
        Self(counts)
    }
}

impl From<ShipStock> for BTreeMap<ShipTypeId, u32> {
    fn from(stock: ShipStock) -> Self {
        stock.0
    }
}

impl ShipStock {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Count of a ship type. Zero when absent.
    pub fn count(&self, ship: &str) -> u32 {
        self.0.get(ship).copied().unwrap_or(0)
    }

    /// Add ships. Adding zero is a no-op. Returns false (and adds nothing)
    /// when the count would overflow.
    #[must_use = "false means nothing was added"]
    pub fn add(&mut self, ship: &ShipTypeId, amount: u32) -> bool {
        if amount == 0 {
            return true;
        }
        match self.count(ship.as_str()).checked_add(amount) {
            Some(updated) => {
                self.0.insert(ship.clone(), updated);
                true
            }
            None => false,
        }
    }

    /// Remove ships. Returns false (and removes nothing) when fewer than
    /// `amount` are held.
    #[must_use = "false means nothing was removed"]
    pub fn remove(&mut self, ship: &str, amount: u32) -> bool {
        let held = self.count(ship);
        if amount > held {
            return false;
        }
        if amount == held {
            self.0.remove(ship);
        } else if let Some(count) = self.0.get_mut(ship) {
            *count -= amount;
        }
        true
    }

    /// Add every entry of `other`, all or nothing. Returns false (and
    /// merges nothing) when any count would overflow.
    #[must_use = "false means nothing was merged"]
    pub fn merge(&mut self, other: &ShipStock) -> bool {
        if self.overflow(other).is_some() {
            return false;
        }
        for (ship, &amount) in &other.0 {
            *self.0.entry(ship.clone()).or_insert(0) += amount;
        }
        true
    }

    /// First type of `other` whose count here would overflow on a merge.
    pub fn overflow<'a>(&self, other: &'a ShipStock) -> Option<&'a ShipTypeId> {
        other
            .iter()
            .find(|(ship, amount)| self.count(ship.as_str()).checked_add(*amount).is_none())
            .map(|(ship, _)| ship)
    }

    /// Count `other` into this stock, capping each type at `u32::MAX`.
    /// For tallies such as contact reports, never for moving ships.
    pub fn tally(&mut self, other: &ShipStock) {
        for (ship, &amount) in &other.0 {
            let entry = self.0.entry(ship.clone()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// First entry of `demand` this stock cannot cover, as
    /// `(ship, required, available)`.
    pub fn shortfall<'a>(&self, demand: &'a ShipStock) -> Option<(&'a ShipTypeId, u32, u32)> {
        demand.iter().find_map(|(ship, required)| {
            let available = self.count(ship.as_str());
            (required > available).then_some((ship, required, available))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ShipTypeId, u32)> {
        self.0.iter().map(|(ship, &count)| (ship, count))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct ship types held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Total ships across all types.
    pub fn total(&self) -> u64 {
        self.0.values().map(|&c| u64::from(c)).sum()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Take all entries, leaving the stock empty.
    pub fn take(&mut self) -> ShipStock {
        std::mem::take(self)
    }

    /// True when no stored entry is zero.
    pub(crate) fn has_no_zero_entries(&self) -> bool {
        self.0.values().all(|&c| c > 0)
    }
}

/// Repeated types are summed, capped at `u32::MAX`.
impl FromIterator<(ShipTypeId, u32)> for ShipStock {
    fn from_iter<I: IntoIterator<Item = (ShipTypeId, u32)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (ship, amount) in iter {
            let entry: &mut u32 = counts.entry(ship).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
        Self::from(counts)
    }
}

/// A named grouping of ships carrying its own resource pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fleet {
    pub ships: ShipStock,
    pub resources: Resources,
}

impl Fleet {
    pub fn new(ships: ShipStock) -> Self {
        Self {
            ships,
            resources: Resources::ZERO,
        }
    }

    /// Whether `other` can be folded in without a ship count or the pool
    /// overflowing.
    pub fn can_absorb(&self, other: &Fleet) -> bool {
        self.ships.overflow(&other.ships).is_none() && self.resources.checked_add(other.resources).is_some()
    }

    /// Fold another fleet into this one. Hands it back untouched when
    /// [`Fleet::can_absorb`] fails.
    pub fn absorb(&mut self, other: Fleet) -> Result<(), Fleet> {
        let Some(resources) = self.resources.checked_add(other.resources) else {
            return Err(other);
        };
        if !self.ships.merge(&other.ships) {
            return Err(other);
        }
        self.resources = resources;
        Ok(())
    }
}

/// One player's holdings on one planet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPlanetState {
    pub resources: Resources,
    pub ships: ShipStock,
    pub fleets: BTreeMap<FleetName, Fleet>,
    /// Ships queued for completion at the next turn boundary.
    pub production: ShipStock,
}

impl PlayerPlanetState {
    /// Total ships present: stock plus every fleet's ships.
    pub fn ships_present(&self) -> ShipStock {
        let mut all = self.ships.clone();
        for fleet in self.fleets.values() {
            all.tally(&fleet.ships);
        }
        all
    }

    /// How many more ships of a type the stock can take. Ships still in
    /// the production queue already hold their place.
    pub fn room_for(&self, ship: &str) -> u32 {
        u32::MAX
            .saturating_sub(self.ships.count(ship))
            .saturating_sub(self.production.count(ship))
    }

    /// First type of `ships` that would not fit, per [`Self::room_for`].
    pub fn first_without_room<'a>(&self, ships: &'a ShipStock) -> Option<(&'a ShipTypeId, u32)> {
        ships
            .iter()
            .find(|(ship, amount)| *amount > self.room_for(ship.as_str()))
    }
}

impl Campaign {
    /// Credit resources to a player on a planet.
    pub fn grant_resources(
        &mut self,
        planet: &str,
        player: &str,
        amount: Resources,
    ) -> Result<(), CampaignError> {
        self.ensure_open()?;
        let balance = self.state.holdings(planet, player)?.resources;
        if amount < Resources::ZERO {
            return Err(CampaignError::InvalidAmount(format!(
                "cannot grant a negative amount ({amount})"
            )));
        }
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| CampaignError::InvalidAmount(format!("balance overflow granting {amount}")))?;
        self.state.holdings_mut(planet, player)?.resources = updated;
        tracing::debug!(planet, player, %amount, "resources granted");
        self.debug_check();
        Ok(())
    }

    /// Add ships to a player's stock on a planet. Granting zero stores nothing.
    pub fn grant_ships(
        &mut self,
        planet: &str,
        player: &str,
        ship: &str,
        amount: u32,
    ) -> Result<(), CampaignError> {
        self.ensure_open()?;
        let holdings = self.state.holdings(planet, player)?;
        self.state.ship_type(ship)?;
        if amount == 0 {
            return Ok(());
        }
        if amount > holdings.room_for(ship) {
            return Err(CampaignError::stock_overflow(ship, amount));
        }
        let added = self
            .state
            .holdings_mut(planet, player)?
            .ships
            .add(&ShipTypeId::from(ship), amount);
        debug_assert!(added);
        tracing::debug!(planet, player, ship, amount, "ships granted");
        self.debug_check();
        Ok(())
    }

    /// Remove resources without compensation.
    pub fn destroy_resources(
        &mut self,
        planet: &str,
        player: &str,
        amount: Resources,
    ) -> Result<(), CampaignError> {
        self.ensure_open()?;
        let available = self.state.holdings(planet, player)?.resources;
        if amount < Resources::ZERO {
            return Err(CampaignError::InvalidAmount(format!(
                "cannot destroy a negative amount ({amount})"
            )));
        }
        if amount > available {
            return Err(CampaignError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        self.state.holdings_mut(planet, player)?.resources = available - amount;
        tracing::debug!(planet, player, %amount, "resources destroyed");
        self.debug_check();
        Ok(())
    }

    /// Remove ships from stock without compensation.
    pub fn destroy_ships(
        &mut self,
        planet: &str,
        player: &str,
        ship: &str,
        amount: u32,
    ) -> Result<(), CampaignError> {
        self.ensure_open()?;
        self.check_stock(planet, player, ship, amount)?;
        let removed = self.state.holdings_mut(planet, player)?.ships.remove(ship, amount);
        debug_assert!(removed);
        tracing::debug!(planet, player, ship, amount, "ships destroyed");
        self.debug_check();
        Ok(())
    }

    /// Break ships up for `amount x points x scrap_ratio` resources.
    /// Returns the amount recovered.
    pub fn scrap_ships(
        &mut self,
        planet: &str,
        player: &str,
        ship: &str,
        amount: u32,
    ) -> Result<Resources, CampaignError> {
        self.ensure_open()?;
        let balance = self.check_stock(planet, player, ship, amount)?;
        let overflow = || CampaignError::InvalidAmount(format!("scrap value of {amount} {ship} overflows"));
        let recovered = self
            .state
            .ships
            .valuation(ship, amount)
            .and_then(|value| value.checked_mul(self.config.scrap_ratio_fixed()))
            .ok_or_else(overflow)?;
        let updated = balance.checked_add(recovered).ok_or_else(overflow)?;

        let holdings = self.state.holdings_mut(planet, player)?;
        let removed = holdings.ships.remove(ship, amount);
        debug_assert!(removed);
        holdings.resources = updated;
        let turn = self.state.turn;
        self.emit(Event::ShipsScrapped {
            planet: planet.into(),
            player: player.into(),
            ship: ship.into(),
            amount,
            recovered,
            turn,
        });
        tracing::debug!(planet, player, ship, amount, %recovered, "ships scrapped");
        self.debug_check();
        Ok(recovered)
    }

    /// Shared checks for removing ships from stock. Returns the player's
    /// resource balance on the planet.
    fn check_stock(
        &self,
        planet: &str,
        player: &str,
        ship: &str,
        amount: u32,
    ) -> Result<Resources, CampaignError> {
        let holdings = self.state.holdings(planet, player)?;
        self.state.ship_type(ship)?;
        let available = holdings.ships.count(ship);
        if amount > available {
            return Err(CampaignError::InsufficientStock {
                ship: ShipTypeId::from(ship),
                required: amount,
                available,
            });
        }
        Ok(holdings.resources)
    }
}
