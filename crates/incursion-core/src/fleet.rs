//! Fleet formation, disbanding, and resource transfers between a planet
//! pool and fleet pools.

use crate::campaign::Campaign;
use crate::error::{CampaignError, EntityKind};
use crate::fixed::Resources;
use crate::id::FleetName;
use crate::ledger::{Fleet, PlayerPlanetState, ShipStock};
use serde::{Deserialize, Serialize};

/// Where resources sit on a planet: the player's planet pool or one of
/// their fleets there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Planet,
    Fleet(FleetName),
}

impl Location {
    pub fn fleet(name: &str) -> Self {
        Location::Fleet(FleetName::from(name))
    }
}

fn balance_at(holdings: &PlayerPlanetState, location: &Location) -> Result<Resources, CampaignError> {
    match location {
        Location::Planet => Ok(holdings.resources),
        Location::Fleet(name) => holdings
            .fleets
            .get(name)
            .map(|fleet| fleet.resources)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Fleet, name.as_str())),
    }
}

fn pool_at<'a>(holdings: &'a mut PlayerPlanetState, location: &Location) -> Option<&'a mut Resources> {
    match location {
        Location::Planet => Some(&mut holdings.resources),
        Location::Fleet(name) => holdings.fleets.get_mut(name).map(|fleet| &mut fleet.resources),
    }
}

impl Campaign {
    /// Group ships from a player's stock into a new named fleet with an
    /// empty resource pool. Every demanded entry is checked before any
    /// ship moves.
    pub fn make_fleet(
        &mut self,
        planet: &str,
        player: &str,
        name: &str,
        demand: &ShipStock,
    ) -> Result<(), CampaignError> {
        self.ensure_open()?;
        let holdings = self.state.holdings(planet, player)?;
        if holdings.fleets.contains_key(name) {
            return Err(CampaignError::duplicate(EntityKind::Fleet, name));
        }
        if demand.is_empty() {
            return Err(CampaignError::InvalidAmount(format!(
                "fleet {name} must contain at least one ship"
            )));
        }
        if let Some((ship, required, available)) = holdings.ships.shortfall(demand) {
            return Err(CampaignError::InsufficientStock {
                ship: ship.clone(),
                required,
                available,
            });
        }

        let holdings = self.state.holdings_mut(planet, player)?;
        for (ship, count) in demand.iter() {
            let removed = holdings.ships.remove(ship.as_str(), count);
            debug_assert!(removed);
        }
        holdings
            .fleets
            .insert(FleetName::from(name), Fleet::new(demand.clone()));
        tracing::debug!(planet, player, fleet = name, ships = demand.total(), "fleet formed");
        self.debug_check();
        Ok(())
    }

    /// Dissolve a fleet, returning its ships to stock and its pool to the
    /// planet pool. Returns the dissolved fleet.
    pub fn disband_fleet(&mut self, planet: &str, player: &str, name: &str) -> Result<Fleet, CampaignError> {
        self.ensure_open()?;
        let holdings = self.state.holdings(planet, player)?;
        let fleet = holdings
            .fleets
            .get(name)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Fleet, name))?;
        if let Some((ship, amount)) = holdings.first_without_room(&fleet.ships) {
            return Err(CampaignError::stock_overflow(ship.as_str(), amount));
        }
        let balance = holdings
            .resources
            .checked_add(fleet.resources)
            .ok_or_else(|| CampaignError::InvalidAmount(format!("disbanding {name} overflows the planet pool")))?;

        let holdings = self.state.holdings_mut(planet, player)?;
        let Some(fleet) = holdings.fleets.remove(name) else {
            return Err(CampaignError::unknown(EntityKind::Fleet, name));
        };
        let merged = holdings.ships.merge(&fleet.ships);
        debug_assert!(merged);
        holdings.resources = balance;
        tracing::debug!(planet, player, fleet = name, "fleet disbanded");
        self.debug_check();
        Ok(fleet)
    }

    /// Move resources between pools on one planet, possibly across players.
    ///
    /// A fleet destination must have room: its pool may not exceed its
    /// storage capacity under the current catalog. Moving to the same pool
    /// validates like any other transfer and changes nothing.
    pub fn transfer_resources(
        &mut self,
        planet: &str,
        amount: Resources,
        from_player: &str,
        from: &Location,
        to_player: &str,
        to: &Location,
    ) -> Result<(), CampaignError> {
        self.ensure_open()?;
        let source = self.state.holdings(planet, from_player)?;
        let target = self.state.holdings(planet, to_player)?;
        let available = balance_at(source, from)?;
        let target_balance = balance_at(target, to)?;
        if amount < Resources::ZERO {
            return Err(CampaignError::InvalidAmount(format!(
                "cannot transfer a negative amount ({amount})"
            )));
        }
        if amount > available {
            return Err(CampaignError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        if from_player == to_player && from == to {
            return Ok(());
        }
        if let Location::Fleet(name) = to
            && let Some(fleet) = target.fleets.get(name)
        {
            let capacity = self.state.ships.stats(&fleet.ships).capacity();
            let free = capacity.saturating_sub(target_balance).max(Resources::ZERO);
            if amount > free {
                return Err(CampaignError::InsufficientCapacity {
                    fleet: name.clone(),
                    required: amount,
                    available: free,
                });
            }
        }
        let credited = target_balance
            .checked_add(amount)
            .ok_or_else(|| CampaignError::InvalidAmount(format!("transfer of {amount} overflows the destination")))?;

        if let Some(pool) = pool_at(self.state.holdings_mut(planet, from_player)?, from) {
            *pool -= amount;
        }
        if let Some(pool) = pool_at(self.state.holdings_mut(planet, to_player)?, to) {
            *pool = credited;
        }
        tracing::debug!(planet, from_player, ?from, to_player, ?to, %amount, "resources transferred");
        self.debug_check();
        Ok(())
    }
}
