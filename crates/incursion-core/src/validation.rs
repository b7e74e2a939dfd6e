//! Structural invariant checks, campaign diffs and determinism validation.
//!
//! [`check_invariants`] is the sweep run in debug builds after every
//! committed mutation and on every imported document. The diff helpers
//! compare two campaigns to find where they diverge.

use crate::campaign::{Campaign, CampaignState};
use crate::command::{Command, ReplayError};
use crate::fixed::{Resources, Turn};
use crate::id::{FactionId, FleetName, PlanetId, PlayerId};
use crate::ledger::ShipStock;
use crate::serialize::DeserializeError;
use crate::sim::SubsystemHashes;
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

/// A broken structural invariant. Never produced by a correct sequence of
/// operations; seen only on hand-edited or corrupted documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("connection {from} -> {to} has no matching reverse edge")]
    AsymmetricConnection { from: PlanetId, to: PlanetId },
    #[error("connection {from} -> {to} is invalid (zero distance, self-loop or unknown planet)")]
    InvalidConnection { from: PlanetId, to: PlanetId },
    #[error("{planet} has no holdings entry for player {player}")]
    MissingHoldings { planet: PlanetId, player: PlayerId },
    #[error("{planet} holds state for unregistered player {player}")]
    OrphanHoldings { planet: PlanetId, player: PlayerId },
    #[error("negative resources at {location}")]
    NegativeResources { location: String },
    #[error("zero-count ship entry at {location}")]
    ZeroShipEntry { location: String },
    #[error("fleet {fleet} of {player} at {location} has no ships")]
    EmptyFleet {
        player: PlayerId,
        fleet: FleetName,
        location: String,
    },
    #[error("faction index disagrees with player {player}")]
    FactionIndexMismatch { player: PlayerId },
    #[error("faction {0} is indexed with no members")]
    EmptyFaction(FactionId),
    #[error("player {player} has more than one transit for fleet {fleet}")]
    DuplicateTransit { player: PlayerId, fleet: FleetName },
    #[error("transit of {fleet} for {player} is malformed")]
    MalformedTransit { player: PlayerId, fleet: FleetName },
    #[error("stock plus queued production at {location} exceeds the ship count limit")]
    QueueOverflow { location: String },
}

fn check_stock(stock: &ShipStock, location: impl FnOnce() -> String, out: &mut Vec<InvariantViolation>) {
    if !stock.has_no_zero_entries() {
        out.push(InvariantViolation::ZeroShipEntry { location: location() });
    }
}

fn check_pool(pool: Resources, location: impl FnOnce() -> String, out: &mut Vec<InvariantViolation>) {
    if pool < Resources::ZERO {
        out.push(InvariantViolation::NegativeResources { location: location() });
    }
}

/// Sweep the whole state and report every broken invariant.
pub fn check_invariants(state: &CampaignState) -> Vec<InvariantViolation> {
    let mut out = Vec::new();

    for (id, planet) in &state.planets {
        for (to, &distance) in &planet.connections {
            let back = state.planets.get(to).and_then(|p| p.distance_to(id.as_str()));
            if distance == 0 || to == id || !state.planets.contains_key(to) {
                out.push(InvariantViolation::InvalidConnection {
                    from: id.clone(),
                    to: to.clone(),
                });
            } else if back != Some(distance) {
                out.push(InvariantViolation::AsymmetricConnection {
                    from: id.clone(),
                    to: to.clone(),
                });
            }
        }

        for player in state.players.keys() {
            if !planet.states.contains_key(player) {
                out.push(InvariantViolation::MissingHoldings {
                    planet: id.clone(),
                    player: player.clone(),
                });
            }
        }

        for (player, holdings) in &planet.states {
            if !state.players.contains_key(player) {
                out.push(InvariantViolation::OrphanHoldings {
                    planet: id.clone(),
                    player: player.clone(),
                });
            }
            let at = || format!("{id}/{player}");
            check_pool(holdings.resources, at, &mut out);
            check_stock(&holdings.ships, || format!("{id}/{player} stock"), &mut out);
            check_stock(&holdings.production, || format!("{id}/{player} production"), &mut out);
            if holdings.ships.overflow(&holdings.production).is_some() {
                out.push(InvariantViolation::QueueOverflow { location: at() });
            }
            for (name, fleet) in &holdings.fleets {
                if fleet.ships.is_empty() {
                    out.push(InvariantViolation::EmptyFleet {
                        player: player.clone(),
                        fleet: name.clone(),
                        location: id.to_string(),
                    });
                }
                check_stock(&fleet.ships, || format!("{id}/{player}/{name}"), &mut out);
                check_pool(fleet.resources, || format!("{id}/{player}/{name}"), &mut out);
            }
        }
    }

    let mut indexed: BTreeMap<&FactionId, BTreeSet<&PlayerId>> = BTreeMap::new();
    for (id, player) in &state.players {
        indexed.entry(&player.faction).or_default().insert(id);
        if !state
            .factions
            .get(&player.faction)
            .is_some_and(|members| members.contains(id))
        {
            out.push(InvariantViolation::FactionIndexMismatch { player: id.clone() });
        }

        let mut seen = BTreeSet::new();
        for order in player.transits.values() {
            if !seen.insert(&order.fleet_name) {
                out.push(InvariantViolation::DuplicateTransit {
                    player: id.clone(),
                    fleet: order.fleet_name.clone(),
                });
            }
            let endpoints_known = state.planets.contains_key(&order.origin)
                && state.planets.contains_key(&order.destination);
            if order.distance == 0 || order.progress >= order.distance || !endpoints_known {
                out.push(InvariantViolation::MalformedTransit {
                    player: id.clone(),
                    fleet: order.fleet_name.clone(),
                });
            }
            let at = || format!("transit {id}/{}", order.fleet_name);
            check_stock(&order.fleet.ships, at, &mut out);
            check_pool(order.fleet.resources, at, &mut out);
        }
    }

    for (faction, members) in &state.factions {
        if members.is_empty() {
            out.push(InvariantViolation::EmptyFaction(faction.clone()));
            continue;
        }
        for member in members {
            if indexed.get(faction).is_none_or(|set| !set.contains(member)) {
                out.push(InvariantViolation::FactionIndexMismatch { player: member.clone() });
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// State diff
// ---------------------------------------------------------------------------

/// Difference at the entity level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDiff {
    PlanetOnlyInA(PlanetId),
    PlanetOnlyInB(PlanetId),
    PlayerOnlyInA(PlayerId),
    PlayerOnlyInB(PlayerId),
    /// Both sides have the planet; the named parts differ.
    PlanetMismatch { planet: PlanetId, description: String },
    PlayerMismatch { player: PlayerId, description: String },
}

/// Per-subsystem match results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsystemDiff {
    pub galaxy_matches: bool,
    pub ledgers_match: bool,
    pub players_match: bool,
    pub catalog_matches: bool,
    pub turn_matches: bool,
}

impl SubsystemDiff {
    pub fn all_match(&self) -> bool {
        self.galaxy_matches
            && self.ledgers_match
            && self.players_match
            && self.catalog_matches
            && self.turn_matches
    }
}

/// Full state diff between two campaigns.
#[derive(Debug, Clone)]
pub struct StateDiff {
    pub is_identical: bool,
    pub subsystem_diffs: SubsystemDiff,
    pub entity_diffs: Vec<EntityDiff>,
}

fn compare_hashes(a: SubsystemHashes, b: SubsystemHashes) -> SubsystemDiff {
    SubsystemDiff {
        galaxy_matches: a.galaxy == b.galaxy,
        ledgers_match: a.ledgers == b.ledgers,
        players_match: a.players == b.players,
        catalog_matches: a.catalog == b.catalog,
        turn_matches: a.turn == b.turn,
    }
}

/// Quick subsystem-level comparison using hashes.
pub fn quick_compare(a: &CampaignState, b: &CampaignState) -> SubsystemDiff {
    compare_hashes(a.subsystem_hashes(), b.subsystem_hashes())
}

/// Compute a detailed diff between two campaign states.
pub fn diff_states(a: &CampaignState, b: &CampaignState) -> StateDiff {
    let subsystem_diffs = quick_compare(a, b);
    let mut entity_diffs = Vec::new();

    for (id, planet_a) in &a.planets {
        let Some(planet_b) = b.planets.get(id) else {
            entity_diffs.push(EntityDiff::PlanetOnlyInA(id.clone()));
            continue;
        };
        let mut mismatches = Vec::new();
        if planet_a.value != planet_b.value {
            mismatches.push("value");
        }
        if planet_a.controlling_faction != planet_b.controlling_faction {
            mismatches.push("control");
        }
        if planet_a.aligned_faction != planet_b.aligned_faction {
            mismatches.push("alignment");
        }
        if planet_a.connections != planet_b.connections {
            mismatches.push("connections");
        }
        if planet_a.states != planet_b.states {
            mismatches.push("holdings");
        }
        if !mismatches.is_empty() {
            entity_diffs.push(EntityDiff::PlanetMismatch {
                planet: id.clone(),
                description: mismatches.join(", "),
            });
        }
    }
    for id in b.planets.keys().filter(|id| !a.planets.contains_key(*id)) {
        entity_diffs.push(EntityDiff::PlanetOnlyInB(id.clone()));
    }

    for (id, player_a) in &a.players {
        let Some(player_b) = b.players.get(id) else {
            entity_diffs.push(EntityDiff::PlayerOnlyInA(id.clone()));
            continue;
        };
        let mut mismatches = Vec::new();
        if player_a.faction != player_b.faction {
            mismatches.push("faction");
        }
        let orders_a = player_a.transits.values();
        let orders_b = player_b.transits.values();
        if player_a.transits.len() != player_b.transits.len() || orders_a.ne(orders_b) {
            mismatches.push("transits");
        }
        if !mismatches.is_empty() {
            entity_diffs.push(EntityDiff::PlayerMismatch {
                player: id.clone(),
                description: mismatches.join(", "),
            });
        }
    }
    for id in b.players.keys().filter(|id| !a.players.contains_key(*id)) {
        entity_diffs.push(EntityDiff::PlayerOnlyInB(id.clone()));
    }

    StateDiff {
        is_identical: entity_diffs.is_empty() && subsystem_diffs.all_match(),
        subsystem_diffs,
        entity_diffs,
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

/// Result of a determinism validation run.
#[derive(Debug)]
pub struct DeterminismResult {
    pub is_deterministic: bool,
    /// Turn at which divergence was first detected (if any).
    pub divergence_turn: Option<Turn>,
    /// (turn, hash_run1, hash_run2) after each resolved turn.
    pub hash_log: Vec<(Turn, u64, u64)>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeterminismError {
    #[error(transparent)]
    Snapshot(#[from] DeserializeError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Restore a snapshot twice, feed both copies the same commands, and
/// compare hashes after every turn boundary.
pub fn validate_determinism(snapshot: &[u8], commands: &[Command]) -> Result<DeterminismResult, DeterminismError> {
    let mut run_a = Campaign::from_snapshot(snapshot)?;
    let mut run_b = Campaign::from_snapshot(snapshot)?;

    let mut hash_log = Vec::new();
    let mut divergence_turn = None;

    for (index, command) in commands.iter().enumerate() {
        for run in [&mut run_a, &mut run_b] {
            run.execute(command)
                .map_err(|source| ReplayError { index, source })?;
        }
        if !command.is_turn_boundary() {
            continue;
        }
        let (hash_a, hash_b) = (run_a.state_hash(), run_b.state_hash());
        hash_log.push((run_a.turn(), hash_a, hash_b));
        if hash_a != hash_b && divergence_turn.is_none() {
            divergence_turn = Some(run_a.turn());
        }
    }

    Ok(DeterminismResult {
        is_deterministic: divergence_turn.is_none(),
        divergence_turn,
        hash_log,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ShipTypeId;
    use crate::ledger::Fleet;

    fn make_campaign() -> Campaign {
        let mut c = Campaign::default();
        c.add_planet("A", 10, "Red", "Red").unwrap();
        c.add_planet("B", 10, "Blue", "Blue").unwrap();
        c.add_connection("A", "B", 4).unwrap();
        c.add_player("ann", "Red").unwrap();
        c.add_player("bob", "Blue").unwrap();
        c.register_ship_type("Fighter", 5, 2, 3).unwrap();
        c.grant_ships("A", "ann", "Fighter", 3).unwrap();
        c
    }

    // -----------------------------------------------------------------------
    // Test 1: A campaign built through operations is clean
    // -----------------------------------------------------------------------
    #[test]
    fn operations_keep_invariants() {
        let c = make_campaign();
        assert!(check_invariants(c.state()).is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 2: Hand-broken documents are caught
    // -----------------------------------------------------------------------
    #[test]
    fn detects_asymmetric_connection() {
        let mut state = make_campaign().state().clone();
        state
            .planets
            .get_mut("B")
            .unwrap()
            .connections
            .insert(PlanetId::from("A"), 5);
        let violations = check_invariants(&state);
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], InvariantViolation::AsymmetricConnection { .. }));
    }

    #[test]
    fn detects_queue_that_cannot_fit() {
        let mut state = make_campaign().state().clone();
        let holdings = state.holdings_mut("A", "ann").unwrap();
        assert!(holdings.production.add(&ShipTypeId::from("Fighter"), u32::MAX));
        let violations = check_invariants(&state);
        assert_eq!(
            violations,
            vec![InvariantViolation::QueueOverflow {
                location: "A/ann".to_string()
            }]
        );
    }

    #[test]
    fn detects_missing_holdings_and_faction_drift() {
        let mut state = make_campaign().state().clone();
        state.planets.get_mut("A").unwrap().states.remove("bob");
        state.players.get_mut("ann").unwrap().faction = FactionId::from("Blue");
        let violations = check_invariants(&state);
        assert!(violations.contains(&InvariantViolation::MissingHoldings {
            planet: PlanetId::from("A"),
            player: PlayerId::from("bob"),
        }));
        assert!(violations.contains(&InvariantViolation::FactionIndexMismatch {
            player: PlayerId::from("ann"),
        }));
    }

    #[test]
    fn detects_negative_pool_and_empty_fleet() {
        let mut state = make_campaign().state().clone();
        let holdings = state
            .planets
            .get_mut("A")
            .unwrap()
            .states
            .get_mut("ann")
            .unwrap();
        holdings.resources = Resources::from_num(-1);
        holdings
            .fleets
            .insert(FleetName::from("Ghost"), Fleet::new(ShipStock::new()));
        let violations = check_invariants(&state);
        assert_eq!(violations.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Test 3: Diffs
    // -----------------------------------------------------------------------
    #[test]
    fn diff_identical_campaigns() {
        let a = make_campaign();
        let b = make_campaign();
        let diff = diff_states(a.state(), b.state());
        assert!(diff.is_identical);
    }

    #[test]
    fn diff_pinpoints_holdings() {
        let a = make_campaign();
        let mut b = make_campaign();
        b.grant_ships("A", "ann", "Fighter", 1).unwrap();
        let diff = diff_states(a.state(), b.state());
        assert!(!diff.is_identical);
        assert!(!diff.subsystem_diffs.ledgers_match);
        assert!(diff.subsystem_diffs.galaxy_matches);
        assert_eq!(
            diff.entity_diffs,
            vec![EntityDiff::PlanetMismatch {
                planet: PlanetId::from("A"),
                description: "holdings".into(),
            }]
        );
    }

    #[test]
    fn diff_detects_player_only_in_b() {
        let a = make_campaign();
        let mut b = make_campaign();
        b.add_player("cat", "Red").unwrap();
        let diff = diff_states(a.state(), b.state());
        assert!(diff.entity_diffs.contains(&EntityDiff::PlayerOnlyInB(PlayerId::from("cat"))));
    }

    // -----------------------------------------------------------------------
    // Test 4: Determinism from a snapshot
    // -----------------------------------------------------------------------
    #[test]
    fn replays_from_snapshot_are_deterministic() {
        let c = make_campaign();
        let snapshot = c.snapshot().unwrap();
        let commands = vec![
            Command::MakeFleet {
                planet: "A".into(),
                player: "ann".into(),
                name: "Alpha".into(),
                ships: [(ShipTypeId::from("Fighter"), 3)].into_iter().collect(),
            },
            Command::AdvanceTurn,
            Command::TransferResources {
                planet: "A".into(),
                amount: Resources::from_num(5),
                from_player: "ann".into(),
                from: crate::fleet::Location::Planet,
                to_player: "ann".into(),
                to: crate::fleet::Location::fleet("Alpha"),
            },
            Command::DepartFleet {
                player: "ann".into(),
                fleet: "Alpha".into(),
                origin: "A".into(),
                destination: "B".into(),
                propulsion: crate::transit::Propulsion::Hohmann,
            },
            Command::AdvanceTurn,
            Command::AdvanceTurn,
        ];
        let result = validate_determinism(&snapshot, &commands).unwrap();
        assert!(result.is_deterministic);
        assert_eq!(result.hash_log.len(), 3);
    }
}
