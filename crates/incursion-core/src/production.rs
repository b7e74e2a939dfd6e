//! Ship construction.
//!
//! Queueing debits the full cost immediately; queued ships join the stock
//! at the next turn boundary. Queues are additive and cannot be cancelled.

use crate::campaign::{Campaign, CampaignState};
use crate::error::CampaignError;
use crate::event::Event;
use crate::fixed::Resources;
use crate::id::{PlanetId, PlayerId, ShipTypeId};
use crate::ledger::ShipStock;

/// Ships finished for one player on one planet during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionCompletion {
    pub planet: PlanetId,
    pub player: PlayerId,
    pub ships: ShipStock,
}

impl Campaign {
    /// Queue ships for construction. The player's faction must control the
    /// planet. Returns the cost debited.
    pub fn queue_production(
        &mut self,
        planet: &str,
        player: &str,
        ship: &str,
        amount: u32,
    ) -> Result<Resources, CampaignError> {
        self.ensure_open()?;
        let holdings = self.state.holdings(planet, player)?;
        self.state.ship_type(ship)?;
        let planet_ref = self.state.planet(planet)?;
        let faction = &self.state.player(player)?.faction;
        if !planet_ref.is_controlled_by(faction.as_str()) {
            return Err(CampaignError::NotController {
                planet: PlanetId::from(planet),
                faction: faction.clone(),
                controller: planet_ref.controlling_faction.clone(),
            });
        }
        if amount == 0 {
            return Err(CampaignError::InvalidAmount(format!(
                "cannot queue zero {ship}"
            )));
        }
        if amount > holdings.room_for(ship) {
            return Err(CampaignError::stock_overflow(ship, amount));
        }
        let available = holdings.resources;
        let cost = self.state.ships.valuation(ship, amount);
        let cost = match cost {
            Some(cost) if cost <= available => cost,
            other => return Err(CampaignError::unaffordable(other, available)),
        };

        let holdings = self.state.holdings_mut(planet, player)?;
        holdings.resources = available - cost;
        let queued = holdings.production.add(&ShipTypeId::from(ship), amount);
        debug_assert!(queued);
        let turn = self.state.turn;
        self.emit(Event::ProductionQueued {
            planet: planet.into(),
            player: player.into(),
            ship: ship.into(),
            amount,
            cost,
            turn,
        });
        tracing::debug!(planet, player, ship, amount, %cost, "production queued");
        self.debug_check();
        Ok(cost)
    }
}

/// Move every queued ship into stock, faction by faction, planet by planet,
/// member by member. Fails if a stock cannot hold its finished ships, which
/// only a state that skipped the queueing checks can reach.
pub(crate) fn complete_production(
    state: &mut CampaignState,
    events: &mut Vec<Event>,
) -> Result<Vec<ProductionCompletion>, CampaignError> {
    let turn = state.turn;
    let mut completions = Vec::new();
    let rosters = state.rosters();

    for (_faction, members) in &rosters {
        for (planet_id, planet) in state.planets.iter_mut() {
            for player in members {
                let Some(holdings) = planet.states.get_mut(player) else {
                    continue;
                };
                if holdings.production.is_empty() {
                    continue;
                }
                if let Some(ship) = holdings.ships.overflow(&holdings.production) {
                    let queued = holdings.production.count(ship.as_str());
                    return Err(CampaignError::stock_overflow(ship.as_str(), queued));
                }
                let finished = holdings.production.take();
                let merged = holdings.ships.merge(&finished);
                debug_assert!(merged);
                for (ship, amount) in finished.iter() {
                    events.push(Event::ProductionCompleted {
                        planet: planet_id.clone(),
                        player: player.clone(),
                        ship: ship.clone(),
                        amount,
                        turn,
                    });
                }
                tracing::debug!(planet = %planet_id, player = %player, ships = finished.total(), "production completed");
                completions.push(ProductionCompletion {
                    planet: planet_id.clone(),
                    player: player.clone(),
                    ships: finished,
                });
            }
        }
    }
    Ok(completions)
}
