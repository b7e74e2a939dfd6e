//! End-to-end campaign scenarios against the public API.

use incursion_core::command::{Command, CommandLog, Outcome, replay};
use incursion_core::event::{Event, EventKind};
use incursion_core::fixed::{Resources, checked_mul_count};
use incursion_core::fleet::Location;
use incursion_core::query::{Details, ListKind, Listing};
use incursion_core::test_utils::*;
use incursion_core::transit::{Departure, Propulsion, Reversal, TickOutcome};
use incursion_core::{CampaignConfig, CampaignError, ErrorKind};
use std::cell::RefCell;
use std::rc::Rc;

/// Cost of `units` distance units for a fleet of `mass`.
fn burn(propulsion: Propulsion, mass: u64, units: u64) -> Resources {
    let per_unit = propulsion
        .cost_per_unit(mass, &CampaignConfig::default())
        .unwrap();
    checked_mul_count(per_unit, units).unwrap()
}

// ===========================================================================
// Test 1: Production economics
// ===========================================================================
//
// P (value 10, faction F), A in F with 100 resources. Queue 10 Fighters at
// 5 points each, then resolve one turn.

#[test]
fn production_economics() {
    let mut c = outpost();
    let cost = c.queue_production("P", "A", "Fighter", 10).unwrap();
    assert_eq!(cost, res(50.0));
    assert_eq!(c.state().holdings("P", "A").unwrap().resources, res(50.0));
    assert_eq!(c.state().holdings("P", "A").unwrap().ships.count("Fighter"), 0);

    let report = c.advance_turn().unwrap();
    let h = c.state().holdings("P", "A").unwrap();
    assert_eq!(h.resources, res(150.0));
    assert_eq!(h.ships.count("Fighter"), 10);
    assert!(h.production.is_empty());
    assert_eq!(report.production.len(), 1);
    assert_eq!(c.turn(), 1);
}

// ===========================================================================
// Test 2: A full round trip between two planets
// ===========================================================================
//
// ann sends a loaded fleet Terra -> Mars by hohmann (4 units at 1/turn),
// it docks, is disbanded, and the cargo lands in the Mars pool.

#[test]
fn hohmann_delivery() {
    let mut c = frontier();
    let ships = stock(&[("Fighter", 3)]);
    launch(&mut c, "ann", "Alpha", "Terra", "Mars", &ships, res(10.0), Propulsion::Hohmann);

    // 3 fighters, mass 9, cost 0.3 per unit.
    for turn in 0..3 {
        let report = c.advance_turn().unwrap();
        assert!(
            matches!(report.transits[0].outcome, TickOutcome::Advanced { .. }),
            "turn {turn}: {:?}",
            report.transits[0]
        );
    }
    let report = c.advance_turn().unwrap();
    assert_eq!(report.arrivals().count(), 1);
    assert!(c.state().player("ann").unwrap().transits.is_empty());

    let fleet = c.disband_fleet("Mars", "ann", "Alpha").unwrap();
    assert_eq!(fleet.resources, res(10.0) - burn(Propulsion::Hohmann, 9, 4));
    let mars = c.state().holdings("Mars", "ann").unwrap();
    assert_eq!(mars.ships.count("Fighter"), 3);
}

// ===========================================================================
// Test 3: Stalls and reversals
// ===========================================================================

#[test]
fn stalled_fleet_turns_back() {
    let mut c = frontier();
    let ships = stock(&[("Freighter", 1)]);
    // Freighter mass 12; cargo for exactly two units.
    let cargo = burn(Propulsion::Hohmann, 12, 2);
    launch(&mut c, "ann", "Hauler", "Terra", "Mars", &ships, cargo, Propulsion::Hohmann);
    c.advance_turn().unwrap();
    c.advance_turn().unwrap();
    let report = c.advance_turn().unwrap();
    assert_eq!(report.stalled().count(), 1);
    let order = c.state().player("ann").unwrap().transit_for("Hauler").unwrap().1;
    assert_eq!(order.progress, 2);

    // Turning around needs the next tick to be affordable.
    let err = c.reverse_transit("ann", "Hauler").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(
        c.state().player("ann").unwrap().transit_for("Hauler").unwrap().1.destination.as_str(),
        "Mars"
    );
}

#[test]
fn reversal_before_first_tick_returns_immediately() {
    let mut c = frontier();
    let ships = stock(&[("Fighter", 2)]);
    launch(&mut c, "ann", "Alpha", "Terra", "Mars", &ships, res(2.0), Propulsion::Hohmann);
    assert_eq!(c.reverse_transit("ann", "Alpha").unwrap(), Reversal::Returned);
    let terra = c.state().holdings("Terra", "ann").unwrap();
    assert_eq!(terra.fleets["Alpha"].resources, res(2.0));
}

// ===========================================================================
// Test 4: Brachistochrone hop and merge on arrival
// ===========================================================================

#[test]
fn brachistochrone_hop_merges_with_waiting_fleet() {
    let mut c = frontier();
    c.add_planet("Phobos", 1, "Red", "Red").unwrap();
    c.add_connection("Mars", "Phobos", 1).unwrap();
    c.grant_ships("Mars", "ann", "Fighter", 1).unwrap();
    c.make_fleet("Mars", "ann", "Alpha", &stock(&[("Fighter", 1)])).unwrap();
    c.grant_ships("Phobos", "ann", "Fighter", 2).unwrap();
    c.make_fleet("Phobos", "ann", "Alpha", &stock(&[("Fighter", 2)])).unwrap();
    c.grant_resources("Mars", "ann", res(1.0)).unwrap();
    c.transfer_resources("Mars", res(1.0), "ann", &Location::Planet, "ann", &Location::fleet("Alpha"))
        .unwrap();

    // One full tick of two units for a single Fighter.
    let departure = c
        .depart_fleet("ann", "Alpha", "Mars", "Phobos", Propulsion::Brachistochrone)
        .unwrap();
    assert_eq!(departure, Departure::Arrived);
    let phobos = c.state().holdings("Phobos", "ann").unwrap();
    assert_eq!(phobos.fleets["Alpha"].ships.count("Fighter"), 3);
    assert_eq!(
        phobos.fleets["Alpha"].resources,
        res(1.0) - burn(Propulsion::Brachistochrone, 3, 2)
    );
}

// ===========================================================================
// Test 5: Contact detection
// ===========================================================================

#[test]
fn contact_reported_when_factions_meet() {
    let mut c = frontier();
    let ships = stock(&[("Fighter", 2)]);
    launch(&mut c, "bob", "Raiders", "Ceres", "Mars", &ships, res(3.0), Propulsion::Hohmann);
    c.grant_ships("Mars", "amy", "Fighter", 1).unwrap();

    let mut contacts = Vec::new();
    for _ in 0..3 {
        contacts.extend(c.advance_turn().unwrap().contacts);
    }
    assert_eq!(contacts.len(), 1);
    let contact = &contacts[0];
    assert_eq!(contact.planet.as_str(), "Mars");
    assert_eq!(contact.forces["Blue"].count("Fighter"), 2);
    assert_eq!(contact.forces["Red"].count("Fighter"), 1);
}

// ===========================================================================
// Test 6: Events reach listeners at the turn boundary
// ===========================================================================

#[test]
fn listeners_see_turn_events() {
    let mut c = outpost();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    c.on_event(
        EventKind::ProductionCompleted,
        Box::new(move |event: &Event| sink.borrow_mut().push(event.clone())),
    );
    c.queue_production("P", "A", "Fighter", 2).unwrap();
    assert!(seen.borrow().is_empty());
    c.advance_turn().unwrap();
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(matches!(&seen[0], Event::ProductionCompleted { amount: 2, .. }));
}

// ===========================================================================
// Test 7: Command log replays into an identical campaign
// ===========================================================================

#[test]
fn logged_commands_replay_identically() {
    let mut live = frontier();
    let mut log = CommandLog::with_max_history(100);
    let script = vec![
        Command::QueueProduction {
            planet: "Terra".into(),
            player: "ann".into(),
            ship: "Fighter".into(),
            amount: 4,
        },
        Command::MakeFleet {
            planet: "Ceres".into(),
            player: "bob".into(),
            name: "Raiders".into(),
            ships: stock(&[("Fighter", 3)]),
        },
        Command::TransferResources {
            planet: "Ceres".into(),
            amount: res(6.0),
            from_player: "bob".into(),
            from: Location::Planet,
            to_player: "bob".into(),
            to: Location::fleet("Raiders"),
        },
        Command::DepartFleet {
            player: "bob".into(),
            fleet: "Raiders".into(),
            origin: "Ceres".into(),
            destination: "Mars".into(),
            propulsion: Propulsion::Brachistochrone,
        },
        Command::AdvanceTurn,
        Command::AdvanceTurn,
    ];
    for command in script {
        log.execute(&mut live, command).unwrap();
    }

    let mut copy = frontier();
    let outcomes = replay(&mut copy, log.commands()).unwrap();
    assert_eq!(outcomes.len(), 6);
    assert!(matches!(outcomes[5], Outcome::Turn(_)));
    assert_eq!(copy.state_hash(), live.state_hash());
}

// ===========================================================================
// Test 8: Queries
// ===========================================================================

#[test]
fn queries_reflect_play() {
    let mut c = frontier();
    let ships = stock(&[("Fighter", 2)]);
    launch(&mut c, "ann", "Alpha", "Terra", "Mars", &ships, res(3.0), Propulsion::Hohmann);

    let Details::Player(ann) = c.details("ann").unwrap() else {
        panic!("ann is a player");
    };
    assert_eq!(ann.transits.len(), 1);
    assert_eq!(ann.transits[0].destination.as_str(), "Mars");
    assert_eq!(ann.net_worth(), res(60.0));

    let Listing::Planets(planets) = c.list(ListKind::Planets) else {
        panic!("planet listing");
    };
    let names: Vec<_> = planets.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(names, vec!["Ceres", "Mars", "Terra"]);

    let err = c.details("Vulcan").unwrap_err();
    assert!(matches!(err, CampaignError::UnknownEntity { .. }));
}
