//! Turn resolution.
//!
//! `advance_turn` resolves a copy of the campaign state and swaps it in
//! only once every phase has completed, so the live state is never seen
//! half-resolved. Phases run in a fixed order, each over all factions
//! before the next begins:
//!
//! 1. **Income**: each faction's controlled planets pay
//!    `value x resource_generation_ratio`, split evenly among its members.
//! 2. **Transit**: every in-flight order pays and advances one tick,
//!    arrives, or stalls.
//! 3. **Contact**: planets holding ships of more than one faction are
//!    reported.
//! 4. **Production**: queued ships join the stock.
//! 5. The turn counter increments.

use crate::campaign::{Campaign, CampaignState, TurnPhase};
use crate::config::CampaignConfig;
use crate::error::CampaignError;
use crate::event::Event;
use crate::fixed::{self, Resources, Turn};
use crate::id::{FactionId, FleetName, PlanetId, PlayerId, TransitId};
use crate::ledger::ShipStock;
use crate::production::{self, ProductionCompletion};
use crate::transit::TickOutcome;
use std::collections::BTreeMap;

/// Income paid to one player for one planet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomeCredit {
    pub planet: PlanetId,
    pub player: PlayerId,
    pub amount: Resources,
}

/// What happened to one in-flight order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitReport {
    pub player: PlayerId,
    pub fleet: FleetName,
    pub destination: PlanetId,
    pub progress: u32,
    pub distance: u32,
    pub outcome: TickOutcome,
    /// The fleet arrived and merged into a same-named fleet.
    pub merged: bool,
}

/// Ships of more than one faction on the same planet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub planet: PlanetId,
    /// Ships present per faction: stock plus fleet contents.
    pub forces: BTreeMap<FactionId, ShipStock>,
}

/// Everything a turn resolution did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// The turn that was resolved. The campaign is now at `turn + 1`.
    pub turn: Turn,
    pub income: Vec<IncomeCredit>,
    pub transits: Vec<TransitReport>,
    pub contacts: Vec<Contact>,
    pub production: Vec<ProductionCompletion>,
}

impl TurnReport {
    pub fn stalled(&self) -> impl Iterator<Item = &TransitReport> {
        self.transits
            .iter()
            .filter(|t| matches!(t.outcome, TickOutcome::Stalled { .. }))
    }

    pub fn arrivals(&self) -> impl Iterator<Item = &TransitReport> {
        self.transits
            .iter()
            .filter(|t| matches!(t.outcome, TickOutcome::Arrived { .. }))
    }
}

/// Holds the phase at `Resolving` for its lifetime.
struct PhaseGuard<'a>(&'a mut TurnPhase);

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a mut TurnPhase) -> Self {
        *phase = TurnPhase::Resolving;
        Self(phase)
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.0 = TurnPhase::Open;
    }
}

impl Campaign {
    /// Resolve the current turn and move to the next.
    ///
    /// Buffered events, including those emitted by the resolution, are
    /// delivered to listeners after the new state is committed.
    pub fn advance_turn(&mut self) -> Result<TurnReport, CampaignError> {
        self.ensure_open()?;
        let mut next = self.state.clone();
        let resolved = {
            let _guard = PhaseGuard::enter(&mut self.phase);
            resolve(&mut next, &self.config)
        };
        let (report, events) = resolved?;
        self.state = next;
        self.events.emit_all(events);
        tracing::info!(
            turn = report.turn,
            income = report.income.len(),
            transits = report.transits.len(),
            contacts = report.contacts.len(),
            completed = report.production.len(),
            "turn resolved"
        );
        self.debug_check();
        self.events.deliver();
        Ok(report)
    }
}

/// Run every phase against `state`.
pub(crate) fn resolve(
    state: &mut CampaignState,
    config: &CampaignConfig,
) -> Result<(TurnReport, Vec<Event>), CampaignError> {
    let turn = state.turn;
    let mut events = Vec::new();
    let income = credit_income(state, config, &mut events);
    let transits = advance_transits(state, config, &mut events)?;
    let contacts = detect_contacts(state, &mut events);
    let production = production::complete_production(state, &mut events)?;
    state.turn += 1;
    events.push(Event::TurnAdvanced { resolved: turn });
    Ok((
        TurnReport {
            turn,
            income,
            transits,
            contacts,
            production,
        },
        events,
    ))
}

fn credit_income(
    state: &mut CampaignState,
    config: &CampaignConfig,
    events: &mut Vec<Event>,
) -> Vec<IncomeCredit> {
    let turn = state.turn;
    let mut credits = Vec::new();
    for (faction, members) in state.rosters() {
        let Ok(count) = u32::try_from(members.len()) else {
            continue;
        };
        if count == 0 {
            continue;
        }
        for (planet_id, planet) in state.planets.iter_mut() {
            if !planet.is_controlled_by(faction.as_str()) {
                continue;
            }
            let gross = u64::from(planet.value) * u64::from(config.resource_generation_ratio);
            let share = fixed::ratio(gross, count).unwrap_or(Resources::MAX);
            for player in &members {
                let Some(holdings) = planet.states.get_mut(player) else {
                    continue;
                };
                holdings.resources = holdings.resources.saturating_add(share);
                events.push(Event::IncomeCredited {
                    planet: planet_id.clone(),
                    player: player.clone(),
                    amount: share,
                    turn,
                });
                credits.push(IncomeCredit {
                    planet: planet_id.clone(),
                    player: player.clone(),
                    amount: share,
                });
            }
        }
    }
    credits
}

fn advance_transits(
    state: &mut CampaignState,
    config: &CampaignConfig,
    events: &mut Vec<Event>,
) -> Result<Vec<TransitReport>, CampaignError> {
    let turn = state.turn;
    let prorate = config.prorate_final_burn;
    let mut reports = Vec::new();
    for (_faction, members) in state.rosters() {
        for player in &members {
            let ids: Vec<TransitId> = state.player(player.as_str())?.transits.keys().collect();
            for id in ids {
                let transits = &mut state.player_mut(player.as_str())?.transits;
                let Some(order) = transits.get_mut(id) else {
                    continue;
                };
                let outcome = order.tick(prorate);
                let mut report = TransitReport {
                    player: player.clone(),
                    fleet: order.fleet_name.clone(),
                    destination: order.destination.clone(),
                    progress: order.progress,
                    distance: order.distance,
                    outcome,
                    merged: false,
                };
                match outcome {
                    TickOutcome::Advanced { paid } => {
                        tracing::debug!(player = %player, fleet = %report.fleet, progress = report.progress, distance = report.distance, %paid, "transit advanced");
                        events.push(Event::TransitAdvanced {
                            player: player.clone(),
                            fleet: report.fleet.clone(),
                            progress: report.progress,
                            distance: report.distance,
                            paid,
                            turn,
                        });
                    }
                    TickOutcome::Stalled {
                        required,
                        available,
                    } => {
                        tracing::warn!(player = %player, fleet = %report.fleet, %required, %available, "transit stalled");
                        events.push(Event::TransitStalled {
                            player: player.clone(),
                            fleet: report.fleet.clone(),
                            required,
                            available,
                            turn,
                        });
                    }
                    TickOutcome::Arrived { .. } => {
                        if let Some(order) = transits.remove(id) {
                            report.merged = state.dock(player.as_str(), order)?;
                        }
                        tracing::debug!(player = %player, fleet = %report.fleet, planet = %report.destination, merged = report.merged, "fleet arrived");
                        events.push(Event::FleetArrived {
                            player: player.clone(),
                            fleet: report.fleet.clone(),
                            planet: report.destination.clone(),
                            merged: report.merged,
                            turn,
                        });
                    }
                }
                reports.push(report);
            }
        }
    }
    Ok(reports)
}

fn detect_contacts(state: &CampaignState, events: &mut Vec<Event>) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for (planet_id, planet) in &state.planets {
        let mut forces: BTreeMap<FactionId, ShipStock> = BTreeMap::new();
        for (player_id, holdings) in &planet.states {
            let Some(player) = state.players.get(player_id) else {
                continue;
            };
            let present = holdings.ships_present();
            if present.is_empty() {
                continue;
            }
            forces.entry(player.faction.clone()).or_default().tally(&present);
        }
        if forces.len() > 1 {
            let factions: Vec<FactionId> = forces.keys().cloned().collect();
            tracing::warn!(planet = %planet_id, ?factions, "contact detected");
            events.push(Event::ContactDetected {
                planet: planet_id.clone(),
                factions,
                turn: state.turn,
            });
            contacts.push(Contact {
                planet: planet_id.clone(),
                forces,
            });
        }
    }
    contacts
}
