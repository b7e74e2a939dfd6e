//! Typed request/response boundary for console front ends.
//!
//! A [`Command`] names one campaign operation with its arguments;
//! [`Campaign::execute`] runs it and answers with an [`Outcome`] or a
//! [`CampaignError`]. Commands are serializable so they can be scripted in
//! scenario files, logged, and replayed.

use crate::campaign::Campaign;
use crate::catalog::ShipType;
use crate::error::CampaignError;
use crate::fixed::{Resources, Turn};
use crate::fleet::Location;
use crate::id::{FactionId, FleetName, PlanetId, PlayerId, ShipTypeId};
use crate::ledger::{Fleet, ShipStock};
use crate::transit::{Departure, Propulsion, Reversal};
use crate::turn::TurnReport;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// One campaign operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    AddPlanet {
        id: PlanetId,
        value: u32,
        controlling: FactionId,
        aligned: FactionId,
    },
    AddConnection {
        a: PlanetId,
        b: PlanetId,
        distance: u32,
    },
    SetControl {
        planet: PlanetId,
        faction: FactionId,
    },
    SetAlignment {
        planet: PlanetId,
        faction: FactionId,
    },
    AddPlayer {
        id: PlayerId,
        faction: FactionId,
    },
    ReassignPlayer {
        id: PlayerId,
        faction: FactionId,
    },
    RegisterShipType {
        id: ShipTypeId,
        points: u32,
        storage: u32,
        mass: u32,
    },
    GrantResources {
        planet: PlanetId,
        player: PlayerId,
        amount: Resources,
    },
    GrantShips {
        planet: PlanetId,
        player: PlayerId,
        ship: ShipTypeId,
        amount: u32,
    },
    DestroyResources {
        planet: PlanetId,
        player: PlayerId,
        amount: Resources,
    },
    DestroyShips {
        planet: PlanetId,
        player: PlayerId,
        ship: ShipTypeId,
        amount: u32,
    },
    ScrapShips {
        planet: PlanetId,
        player: PlayerId,
        ship: ShipTypeId,
        amount: u32,
    },
    QueueProduction {
        planet: PlanetId,
        player: PlayerId,
        ship: ShipTypeId,
        amount: u32,
    },
    MakeFleet {
        planet: PlanetId,
        player: PlayerId,
        name: FleetName,
        ships: ShipStock,
    },
    DisbandFleet {
        planet: PlanetId,
        player: PlayerId,
        name: FleetName,
    },
    TransferResources {
        planet: PlanetId,
        amount: Resources,
        from_player: PlayerId,
        from: Location,
        to_player: PlayerId,
        to: Location,
    },
    DepartFleet {
        player: PlayerId,
        fleet: FleetName,
        origin: PlanetId,
        destination: PlanetId,
        propulsion: Propulsion,
    },
    ReverseTransit {
        player: PlayerId,
        fleet: FleetName,
    },
    AdvanceTurn,
}

impl Command {
    /// Whether this command resolves a turn.
    pub fn is_turn_boundary(&self) -> bool {
        matches!(self, Command::AdvanceTurn)
    }
}

/// Success payload of an executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    ShipTypeRegistered { replaced: Option<ShipType> },
    Scrapped { recovered: Resources },
    ProductionQueued { cost: Resources },
    Disbanded(Fleet),
    Departed(Departure),
    Reversed(Reversal),
    Turn(TurnReport),
}

impl Campaign {
    /// Run one command.
    pub fn execute(&mut self, command: &Command) -> Result<Outcome, CampaignError> {
        use Command as C;
        let outcome = match command {
            C::AddPlanet {
                id,
                value,
                controlling,
                aligned,
            } => {
                self.add_planet(id.as_str(), *value, controlling.as_str(), aligned.as_str())?;
                Outcome::Done
            }
            C::AddConnection { a, b, distance } => {
                self.add_connection(a.as_str(), b.as_str(), *distance)?;
                Outcome::Done
            }
            C::SetControl { planet, faction } => {
                self.set_control(planet.as_str(), faction.as_str())?;
                Outcome::Done
            }
            C::SetAlignment { planet, faction } => {
                self.set_alignment(planet.as_str(), faction.as_str())?;
                Outcome::Done
            }
            C::AddPlayer { id, faction } => {
                self.add_player(id.as_str(), faction.as_str())?;
                Outcome::Done
            }
            C::ReassignPlayer { id, faction } => {
                self.reassign_player(id.as_str(), faction.as_str())?;
                Outcome::Done
            }
            C::RegisterShipType {
                id,
                points,
                storage,
                mass,
            } => Outcome::ShipTypeRegistered {
                replaced: self.register_ship_type(id.as_str(), *points, *storage, *mass)?,
            },
            C::GrantResources {
                planet,
                player,
                amount,
            } => {
                self.grant_resources(planet.as_str(), player.as_str(), *amount)?;
                Outcome::Done
            }
            C::GrantShips {
                planet,
                player,
                ship,
                amount,
            } => {
                self.grant_ships(planet.as_str(), player.as_str(), ship.as_str(), *amount)?;
                Outcome::Done
            }
            C::DestroyResources {
                planet,
                player,
                amount,
            } => {
                self.destroy_resources(planet.as_str(), player.as_str(), *amount)?;
                Outcome::Done
            }
            C::DestroyShips {
                planet,
                player,
                ship,
                amount,
            } => {
                self.destroy_ships(planet.as_str(), player.as_str(), ship.as_str(), *amount)?;
                Outcome::Done
            }
            C::ScrapShips {
                planet,
                player,
                ship,
                amount,
            } => Outcome::Scrapped {
                recovered: self.scrap_ships(planet.as_str(), player.as_str(), ship.as_str(), *amount)?,
            },
            C::QueueProduction {
                planet,
                player,
                ship,
                amount,
            } => Outcome::ProductionQueued {
                cost: self.queue_production(planet.as_str(), player.as_str(), ship.as_str(), *amount)?,
            },
            C::MakeFleet {
                planet,
                player,
                name,
                ships,
            } => {
                self.make_fleet(planet.as_str(), player.as_str(), name.as_str(), ships)?;
                Outcome::Done
            }
            C::DisbandFleet {
                planet,
                player,
                name,
            } => Outcome::Disbanded(self.disband_fleet(planet.as_str(), player.as_str(), name.as_str())?),
            C::TransferResources {
                planet,
                amount,
                from_player,
                from,
                to_player,
                to,
            } => {
                self.transfer_resources(
                    planet.as_str(),
                    *amount,
                    from_player.as_str(),
                    from,
                    to_player.as_str(),
                    to,
                )?;
                Outcome::Done
            }
            C::DepartFleet {
                player,
                fleet,
                origin,
                destination,
                propulsion,
            } => Outcome::Departed(self.depart_fleet(
                player.as_str(),
                fleet.as_str(),
                origin.as_str(),
                destination.as_str(),
                *propulsion,
            )?),
            C::ReverseTransit { player, fleet } => {
                Outcome::Reversed(self.reverse_transit(player.as_str(), fleet.as_str())?)
            }
            C::AdvanceTurn => Outcome::Turn(self.advance_turn()?),
        };
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// CommandLog
// ---------------------------------------------------------------------------

/// A command that failed during replay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command {index} failed: {source}")]
pub struct ReplayError {
    pub index: usize,
    pub source: CampaignError,
}

/// Executes commands and keeps a bounded history of the successful ones.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    /// (turn at execution, command).
    history: Vec<(Turn, Command)>,
    /// 0 = no history.
    max_history: usize,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            history: Vec::new(),
            max_history,
        }
    }

    /// Execute against `campaign`, recording the command if it succeeds.
    pub fn execute(&mut self, campaign: &mut Campaign, command: Command) -> Result<Outcome, CampaignError> {
        let turn = campaign.turn();
        let outcome = campaign.execute(&command)?;
        self.record(turn, command);
        Ok(outcome)
    }

    fn record(&mut self, turn: Turn, command: Command) {
        if self.max_history == 0 {
            return;
        }
        self.history.push((turn, command));
        let excess = self.history.len().saturating_sub(self.max_history);
        if excess > 0 {
            self.history.drain(..excess);
        }
    }

    pub fn history(&self) -> &[(Turn, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// The recorded commands, oldest first.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.history.iter().map(|(_, command)| command)
    }
}

/// Execute a command stream in order, stopping at the first failure.
pub fn replay<'a>(
    campaign: &mut Campaign,
    commands: impl IntoIterator<Item = &'a Command>,
) -> Result<Vec<Outcome>, ReplayError> {
    commands
        .into_iter()
        .enumerate()
        .map(|(index, command)| {
            campaign
                .execute(command)
                .map_err(|source| ReplayError { index, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn setup() -> Vec<Command> {
        vec![
            Command::AddPlanet {
                id: "A".into(),
                value: 10,
                controlling: "Red".into(),
                aligned: "Red".into(),
            },
            Command::AddPlayer {
                id: "ann".into(),
                faction: "Red".into(),
            },
            Command::RegisterShipType {
                id: "Fighter".into(),
                points: 5,
                storage: 1,
                mass: 3,
            },
        ]
    }

    // -----------------------------------------------------------------------
    // Test 1: execute maps operations to outcomes
    // -----------------------------------------------------------------------
    #[test]
    fn execute_returns_typed_outcomes() {
        let mut c = Campaign::default();
        replay(&mut c, &setup()).unwrap();
        let outcome = c
            .execute(&Command::GrantResources {
                planet: "A".into(),
                player: "ann".into(),
                amount: Resources::from_num(20),
            })
            .unwrap();
        assert_eq!(outcome, Outcome::Done);
        let outcome = c
            .execute(&Command::QueueProduction {
                planet: "A".into(),
                player: "ann".into(),
                ship: "Fighter".into(),
                amount: 2,
            })
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::ProductionQueued {
                cost: Resources::from_num(10)
            }
        );
        let Outcome::Turn(report) = c.execute(&Command::AdvanceTurn).unwrap() else {
            panic!("expected a turn report");
        };
        assert_eq!(report.production.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 2: errors pass through unchanged
    // -----------------------------------------------------------------------
    #[test]
    fn execute_surfaces_errors() {
        let mut c = Campaign::default();
        let err = c
            .execute(&Command::GrantShips {
                planet: "Nowhere".into(),
                player: "ann".into(),
                ship: "Fighter".into(),
                amount: 1,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownEntity);
    }

    // -----------------------------------------------------------------------
    // Test 3: history is bounded and skips failures
    // -----------------------------------------------------------------------
    #[test]
    fn history_bounded_and_successful_only() {
        let mut c = Campaign::default();
        let mut log = CommandLog::with_max_history(2);
        for command in setup() {
            log.execute(&mut c, command).unwrap();
        }
        assert!(log.execute(&mut c, setup().remove(0)).is_err());
        assert_eq!(log.history().len(), 2);
        assert!(matches!(log.history()[0].1, Command::AddPlayer { .. }));
        assert!(matches!(log.history()[1].1, Command::RegisterShipType { .. }));
    }

    // -----------------------------------------------------------------------
    // Test 4: no history by default
    // -----------------------------------------------------------------------
    #[test]
    fn default_log_keeps_nothing() {
        let mut c = Campaign::default();
        let mut log = CommandLog::new();
        log.execute(&mut c, setup().remove(0)).unwrap();
        assert!(log.history().is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 5: replay reports the failing index
    // -----------------------------------------------------------------------
    #[test]
    fn replay_stops_at_first_failure() {
        let mut c = Campaign::default();
        let mut commands = setup();
        commands.push(commands[0].clone());
        commands.push(Command::AdvanceTurn);
        let err = replay(&mut c, &commands).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.source.kind(), ErrorKind::DuplicateEntity);
        assert_eq!(c.turn(), 0);
    }

    // -----------------------------------------------------------------------
    // Test 6: commands round-trip through JSON
    // -----------------------------------------------------------------------
    #[test]
    fn commands_serialize() {
        let command = Command::TransferResources {
            planet: "A".into(),
            amount: Resources::from_num(2.5),
            from_player: "ann".into(),
            from: Location::Planet,
            to_player: "ann".into(),
            to: Location::fleet("Alpha"),
        };
        let json = serde_json::to_string(&command).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, command);
    }
}
