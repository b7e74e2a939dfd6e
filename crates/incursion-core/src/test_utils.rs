//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::campaign::Campaign;
use crate::fixed::Resources;
use crate::fleet::Location;
use crate::id::ShipTypeId;
use crate::ledger::ShipStock;
use crate::transit::Propulsion;

// ===========================================================================
// Value helpers
// ===========================================================================

pub fn res(v: f64) -> Resources {
    Resources::from_num(v)
}

/// A ship composition from `(type, count)` pairs.
pub fn stock(entries: &[(&str, u32)]) -> ShipStock {
    entries
        .iter()
        .map(|&(ship, count)| (ShipTypeId::from(ship), count))
        .collect()
}

// ===========================================================================
// Campaign fixtures
// ===========================================================================

/// Planet P (value 10, faction F), player A in F with 100 resources, and a
/// Fighter (5 points, 1 storage, 10 mass) in the catalog.
pub fn outpost() -> Campaign {
    let mut c = Campaign::default();
    c.add_planet("P", 10, "F", "F").expect("add P");
    c.add_player("A", "F").expect("add A");
    c.register_ship_type("Fighter", 5, 1, 10).expect("register Fighter");
    c.grant_resources("P", "A", res(100.0)).expect("grant");
    c
}

/// Two factions on a line of three planets:
///
/// ```text
///   Terra (Red, 10) --4-- Mars (Red, 6) --3-- Ceres (Blue, 8)
/// ```
///
/// Red has `ann` and `amy`, Blue has `bob`. The catalog holds Fighter
/// (5/2/3) and Freighter (8/20/12). Everyone starts with ships and 60
/// resources on their faction's first planet.
pub fn frontier() -> Campaign {
    let mut c = Campaign::default();
    c.add_planet("Terra", 10, "Red", "Red").expect("Terra");
    c.add_planet("Mars", 6, "Red", "Red").expect("Mars");
    c.add_planet("Ceres", 8, "Blue", "Blue").expect("Ceres");
    c.add_connection("Terra", "Mars", 4).expect("Terra-Mars");
    c.add_connection("Mars", "Ceres", 3).expect("Mars-Ceres");
    c.add_player("ann", "Red").expect("ann");
    c.add_player("amy", "Red").expect("amy");
    c.add_player("bob", "Blue").expect("bob");
    c.register_ship_type("Fighter", 5, 2, 3).expect("Fighter");
    c.register_ship_type("Freighter", 8, 20, 12).expect("Freighter");
    for (planet, player) in [("Terra", "ann"), ("Terra", "amy"), ("Ceres", "bob")] {
        c.grant_resources(planet, player, res(60.0)).expect("grant resources");
        c.grant_ships(planet, player, "Fighter", 6).expect("grant fighters");
        c.grant_ships(planet, player, "Freighter", 1).expect("grant freighter");
    }
    c
}

/// Form a fleet, load it with `cargo`, and send it on its way.
#[allow(clippy::too_many_arguments)]
pub fn launch(
    c: &mut Campaign,
    player: &str,
    fleet: &str,
    from: &str,
    to: &str,
    ships: &ShipStock,
    cargo: Resources,
    propulsion: Propulsion,
) {
    c.make_fleet(from, player, fleet, ships).expect("make fleet");
    c.transfer_resources(from, cargo, player, &Location::Planet, player, &Location::fleet(fleet))
        .expect("load fleet");
    c.depart_fleet(player, fleet, from, to, propulsion)
        .expect("depart");
}

/// Sum of every resource pool the campaign holds, in transit included.
pub fn total_resources(c: &Campaign) -> Resources {
    let state = c.state();
    let docked = state.planets.values().flat_map(|p| p.states.values()).flat_map(|h| {
        std::iter::once(h.resources).chain(h.fleets.values().map(|f| f.resources))
    });
    let flying = state
        .players
        .values()
        .flat_map(|p| p.transits.values())
        .map(|o| o.fleet.resources);
    docked.chain(flying).fold(Resources::ZERO, |acc, r| acc + r)
}

/// Total ships of every type, in stock, in fleets and in transit. Queued
/// production is not counted.
pub fn total_ships(c: &Campaign) -> u64 {
    let state = c.state();
    let docked: u64 = state
        .planets
        .values()
        .flat_map(|p| p.states.values())
        .map(|h| h.ships_present().total())
        .sum();
    let flying: u64 = state
        .players
        .values()
        .flat_map(|p| p.transits.values())
        .map(|o| o.fleet.ships.total())
        .sum();
    docked + flying
}
