//! In-flight fleets and the two propulsion models.
//!
//! A [`TransitOrder`] owns its fleet while in flight. Each turn the order
//! pays one tick of cost from the fleet's own pool and advances; when the
//! pool cannot cover the tick the order stalls in place. Pools never go
//! negative.
//!
//! # Propulsion
//!
//! - [`Propulsion::Hohmann`]: cheap, 1 distance unit per tick, each tick
//!   costs `cost_per_unit`.
//! - [`Propulsion::Brachistochrone`]: costly, 2 units per tick, each tick
//!   costs `2 x cost_per_unit`. With `prorate_final_burn`, a tick that
//!   covers only the last unit costs `1 x cost_per_unit`.

use crate::campaign::Campaign;
use crate::config::CampaignConfig;
use crate::error::{CampaignError, EntityKind};
use crate::event::Event;
use crate::fixed::{self, Resources};
use crate::id::{FleetName, PlanetId, TransitId};
use crate::ledger::Fleet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Propulsion {
    Hohmann,
    Brachistochrone,
}

impl Propulsion {
    /// Distance covered by one full tick.
    pub fn units_per_tick(self) -> u32 {
        match self {
            Propulsion::Hohmann => 1,
            Propulsion::Brachistochrone => 2,
        }
    }

    pub fn mass_ratio(self, config: &CampaignConfig) -> u32 {
        match self {
            Propulsion::Hohmann => config.hohmann_mass_ratio,
            Propulsion::Brachistochrone => config.brachistochrone_mass_ratio,
        }
    }

    /// `mass / mass_ratio`. None if the ratio is zero or the result is out of range.
    pub fn cost_per_unit(self, mass: u64, config: &CampaignConfig) -> Option<Resources> {
        fixed::ratio(mass, self.mass_ratio(config))
    }

    /// Whether a departure over `distance` completes without creating an order.
    pub fn is_instant(self, distance: u32) -> bool {
        self == Propulsion::Brachistochrone && distance == 1
    }
}

/// Distance and cost of the next tick of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    pub step: u32,
    /// None when the cost overflows.
    pub cost: Option<Resources>,
}

/// Result of paying (or failing to pay) one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced { paid: Resources },
    Arrived { paid: Resources },
    Stalled {
        required: Resources,
        available: Resources,
    },
}

/// A fleet moving between two connected planets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitOrder {
    pub fleet_name: FleetName,
    pub fleet: Fleet,
    pub origin: PlanetId,
    pub destination: PlanetId,
    /// Route length, fixed at departure.
    pub distance: u32,
    pub propulsion: Propulsion,
    /// Never exceeds `distance`.
    pub progress: u32,
    /// Fixed at departure from the fleet's mass at that instant.
    pub cost_per_unit: Resources,
}

impl TransitOrder {
    pub fn remaining(&self) -> u32 {
        self.distance.saturating_sub(self.progress)
    }

    pub fn has_arrived(&self) -> bool {
        self.progress >= self.distance
    }

    pub fn next_tick(&self, prorate_final_burn: bool) -> TickPlan {
        let full = self.propulsion.units_per_tick();
        let step = full.min(self.remaining());
        let charged = if prorate_final_burn { step } else { full };
        TickPlan {
            step,
            cost: fixed::checked_mul_count(self.cost_per_unit, u64::from(charged)),
        }
    }

    /// Required and available amounts when the next tick is unaffordable.
    pub fn shortfall(&self, prorate_final_burn: bool) -> Option<(Resources, Resources)> {
        let available = self.fleet.resources;
        match self.next_tick(prorate_final_burn).cost {
            Some(cost) if cost <= available => None,
            cost => Some((cost.unwrap_or(Resources::MAX), available)),
        }
    }

    /// Pay for and advance one tick, or stall without touching anything.
    pub fn tick(&mut self, prorate_final_burn: bool) -> TickOutcome {
        if let Some((required, available)) = self.shortfall(prorate_final_burn) {
            return TickOutcome::Stalled {
                required,
                available,
            };
        }
        let plan = self.next_tick(prorate_final_burn);
        let paid = plan.cost.unwrap_or(Resources::ZERO);
        self.fleet.resources -= paid;
        self.progress = self.progress.saturating_add(plan.step).min(self.distance);
        if self.has_arrived() {
            TickOutcome::Arrived { paid }
        } else {
            TickOutcome::Advanced { paid }
        }
    }

    /// Turn around: swap endpoints and mirror progress. Returns true when
    /// the reversed order is already at its new destination.
    pub fn reverse(&mut self) -> bool {
        std::mem::swap(&mut self.origin, &mut self.destination);
        self.progress = self.remaining();
        self.has_arrived()
    }
}

/// How a departure concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    InTransit(TransitId),
    /// Instant hop: the fleet is already at its destination.
    Arrived,
}

/// How a reversal concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reversal {
    InTransit,
    /// The order had not advanced yet; the fleet is back at its origin.
    Returned,
}

impl Campaign {
    /// Send a fleet along a connection.
    ///
    /// Only the first tick must be affordable at departure, except for an
    /// instant hop, which pays its single tick immediately.
    pub fn depart_fleet(
        &mut self,
        player: &str,
        fleet: &str,
        origin: &str,
        destination: &str,
        propulsion: Propulsion,
    ) -> Result<Departure, CampaignError> {
        self.ensure_open()?;
        let state = &self.state;
        let owner = state.player(player)?;
        let origin_planet = state.planet(origin)?;
        state.planet(destination)?;
        let holdings = state.holdings(origin, player)?;
        let source = holdings
            .fleets
            .get(fleet)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Fleet, fleet))?;
        let distance = *origin_planet
            .connections
            .get(destination)
            .ok_or_else(|| CampaignError::NoConnection {
                from: PlanetId::from(origin),
                to: PlanetId::from(destination),
            })?;
        if owner.transit_for(fleet).is_some() {
            return Err(CampaignError::duplicate(EntityKind::Transit, fleet));
        }

        let mass = state.ships.stats(&source.ships).total_mass;
        let cost_per_unit = propulsion
            .cost_per_unit(mass, &self.config)
            .ok_or_else(|| CampaignError::unaffordable(None, source.resources))?;
        let mut order = TransitOrder {
            fleet_name: FleetName::from(fleet),
            fleet: source.clone(),
            origin: PlanetId::from(origin),
            destination: PlanetId::from(destination),
            distance,
            propulsion,
            progress: 0,
            cost_per_unit,
        };
        let prorate = self.config.prorate_final_burn;
        if let Some((required, available)) = order.shortfall(prorate) {
            return Err(CampaignError::InsufficientFunds {
                required,
                available,
            });
        }
        if propulsion.is_instant(distance) {
            state.check_dock(destination, player, fleet, &order.fleet)?;
        }

        // Validated; commit.
        let turn = self.state.turn;
        if let Ok(holdings) = self.state.holdings_mut(origin, player) {
            holdings.fleets.remove(fleet);
        }
        self.emit(Event::FleetDeparted {
            player: player.into(),
            fleet: fleet.into(),
            origin: origin.into(),
            destination: destination.into(),
            propulsion,
            turn,
        });

        let departure = if propulsion.is_instant(distance) {
            let paid = match order.tick(prorate) {
                TickOutcome::Arrived { paid } => paid,
                _ => Resources::ZERO,
            };
            tracing::debug!(player, fleet, origin, destination, %paid, "instant hop");
            let merged = self.state.dock(player, order)?;
            self.emit(Event::FleetArrived {
                player: player.into(),
                fleet: fleet.into(),
                planet: destination.into(),
                merged,
                turn,
            });
            Departure::Arrived
        } else {
            tracing::debug!(player, fleet, origin, destination, distance, ?propulsion, "fleet departed");
            let id = self.state.player_mut(player)?.transits.insert(order);
            Departure::InTransit(id)
        };
        self.debug_check();
        Ok(departure)
    }

    /// Turn an in-flight fleet around.
    ///
    /// An order that has not advanced yet returns its fleet to the origin
    /// immediately. Otherwise the reversed order must be able to afford its
    /// next tick; nothing is charged now.
    pub fn reverse_transit(&mut self, player: &str, fleet: &str) -> Result<Reversal, CampaignError> {
        self.ensure_open()?;
        let owner = self.state.player(player)?;
        let (id, order) = owner
            .transit_for(fleet)
            .ok_or_else(|| CampaignError::unknown(EntityKind::Transit, fleet))?;
        let mut reversed = order.clone();
        let returned = reversed.reverse();
        if !returned && let Some((required, available)) = reversed.shortfall(self.config.prorate_final_burn) {
            return Err(CampaignError::InsufficientFunds {
                required,
                available,
            });
        }
        if returned {
            self.state
                .check_dock(reversed.destination.as_str(), player, fleet, &reversed.fleet)?;
        }

        let turn = self.state.turn;
        let destination = reversed.destination.clone();
        let outcome = if returned {
            self.state.player_mut(player)?.transits.remove(id);
            let merged = self.state.dock(player, reversed)?;
            self.emit(Event::FleetArrived {
                player: player.into(),
                fleet: fleet.into(),
                planet: destination.clone(),
                merged,
                turn,
            });
            Reversal::Returned
        } else {
            if let Some(slot) = self.state.player_mut(player)?.transits.get_mut(id) {
                *slot = reversed;
            }
            Reversal::InTransit
        };
        tracing::debug!(player, fleet, %destination, ?outcome, "transit reversed");
        self.emit(Event::FleetReversed {
            player: player.into(),
            fleet: fleet.into(),
            destination,
            turn,
        });
        self.debug_check();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ShipStock;

    fn order(propulsion: Propulsion, distance: u32, cost: i32, pool: i32) -> TransitOrder {
        TransitOrder {
            fleet_name: FleetName::from("Alpha"),
            fleet: Fleet {
                ships: ShipStock::new(),
                resources: Resources::from_num(pool),
            },
            origin: PlanetId::from("A"),
            destination: PlanetId::from("B"),
            distance,
            propulsion,
            progress: 0,
            cost_per_unit: Resources::from_num(cost),
        }
    }

    fn run_to_arrival(order: &mut TransitOrder, prorate: bool) -> (u32, Resources) {
        let mut ticks = 0;
        let mut total = Resources::ZERO;
        loop {
            ticks += 1;
            match order.tick(prorate) {
                TickOutcome::Advanced { paid } => total += paid,
                TickOutcome::Arrived { paid } => return (ticks, total + paid),
                TickOutcome::Stalled { .. } => panic!("unexpected stall"),
            }
        }
    }

    #[test]
    fn hohmann_costs_distance_times_unit() {
        let mut o = order(Propulsion::Hohmann, 5, 2, 100);
        let (ticks, total) = run_to_arrival(&mut o, false);
        assert_eq!(ticks, 5);
        assert_eq!(total, Resources::from_num(10));
        assert_eq!(o.fleet.resources, Resources::from_num(90));
    }

    #[test]
    fn brachistochrone_odd_distance_charges_full_final_tick() {
        let mut o = order(Propulsion::Brachistochrone, 5, 3, 100);
        let (ticks, total) = run_to_arrival(&mut o, false);
        assert_eq!(ticks, 3);
        assert_eq!(total, Resources::from_num(3 * 2 * 3));
        assert_eq!(o.progress, 5);
    }

    #[test]
    fn brachistochrone_prorated_final_tick() {
        let mut o = order(Propulsion::Brachistochrone, 5, 3, 100);
        let (ticks, total) = run_to_arrival(&mut o, true);
        assert_eq!(ticks, 3);
        assert_eq!(total, Resources::from_num(5 * 3));
    }

    #[test]
    fn stall_leaves_order_untouched() {
        let mut o = order(Propulsion::Hohmann, 3, 4, 5);
        assert!(matches!(o.tick(false), TickOutcome::Advanced { .. }));
        let before = o.clone();
        assert_eq!(
            o.tick(false),
            TickOutcome::Stalled {
                required: Resources::from_num(4),
                available: Resources::from_num(1),
            }
        );
        assert_eq!(o, before);
    }

    #[test]
    fn reverse_mirrors_progress() {
        let mut o = order(Propulsion::Hohmann, 5, 1, 10);
        o.progress = 2;
        assert!(!o.reverse());
        assert_eq!(o.progress, 3);
        assert_eq!(o.origin, PlanetId::from("B"));
        assert_eq!(o.destination, PlanetId::from("A"));
    }

    #[test]
    fn reverse_before_moving_returns_home() {
        let mut o = order(Propulsion::Hohmann, 5, 1, 10);
        assert!(o.reverse());
        assert_eq!(o.destination, PlanetId::from("A"));
    }

    #[test]
    fn cost_overflow_is_a_stall() {
        let mut o = order(Propulsion::Brachistochrone, 4, 0, 10);
        o.cost_per_unit = Resources::MAX;
        assert!(matches!(
            o.tick(false),
            TickOutcome::Stalled { required, .. } if required == Resources::MAX
        ));
    }

    #[test]
    fn instant_only_for_short_brachistochrone() {
        assert!(Propulsion::Brachistochrone.is_instant(1));
        assert!(!Propulsion::Brachistochrone.is_instant(2));
        assert!(!Propulsion::Hohmann.is_instant(1));
    }

    #[test]
    fn cost_per_unit_uses_config_ratio() {
        let config = CampaignConfig::default();
        assert_eq!(
            Propulsion::Hohmann.cost_per_unit(60, &config),
            Some(Resources::from_num(2))
        );
        assert_eq!(
            Propulsion::Brachistochrone.cost_per_unit(60, &config),
            Some(Resources::from_num(4))
        );
    }
}
