//! Serde data file structs for scenario definitions.
//!
//! These structs define the on-disk format for a scenario. They are
//! deserialized from RON, JSON, or TOML and then turned into engine
//! commands by [`ScenarioData::setup_commands`]. Resource amounts are
//! decimal strings (`"12.5"`) in every format.

use incursion_core::command::Command;
use incursion_core::config::CampaignConfig;
use incursion_core::fixed::Resources;
use incursion_core::ledger::ShipStock;
use serde::Deserialize;

// ===========================================================================
// Scenario
// ===========================================================================

/// Top-level scenario definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Tunables embedded in the scenario. A separate config file in the
    /// scenario directory takes precedence.
    #[serde(default)]
    pub config: Option<CampaignConfig>,
    #[serde(default)]
    pub ships: Vec<ShipData>,
    pub planets: Vec<PlanetData>,
    #[serde(default)]
    pub connections: Vec<ConnectionData>,
    #[serde(default)]
    pub players: Vec<PlayerData>,
    #[serde(default)]
    pub grants: Vec<GrantData>,
    /// Opening moves, run by the caller after setup.
    #[serde(default)]
    pub orders: Vec<Command>,
}

/// A ship template.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipData {
    pub name: String,
    pub points: u32,
    pub storage: u32,
    pub mass: u32,
}

/// A planet. Alignment defaults to the controlling faction.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanetData {
    pub name: String,
    pub value: u32,
    pub controlling: String,
    #[serde(default)]
    pub aligned: Option<String>,
}

/// A symmetric connection between two planets.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionData {
    pub a: String,
    pub b: String,
    pub distance: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerData {
    pub name: String,
    pub faction: String,
}

/// Starting holdings for one player on one planet.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantData {
    pub planet: String,
    pub player: String,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub ships: ShipStock,
}

impl ScenarioData {
    /// The setup expressed as engine commands, in dependency order: ships,
    /// planets, connections, players, then grants.
    pub fn setup_commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        for ship in &self.ships {
            commands.push(Command::RegisterShipType {
                id: ship.name.as_str().into(),
                points: ship.points,
                storage: ship.storage,
                mass: ship.mass,
            });
        }
        for planet in &self.planets {
            let aligned = planet.aligned.as_deref().unwrap_or(&planet.controlling);
            commands.push(Command::AddPlanet {
                id: planet.name.as_str().into(),
                value: planet.value,
                controlling: planet.controlling.as_str().into(),
                aligned: aligned.into(),
            });
        }
        for connection in &self.connections {
            commands.push(Command::AddConnection {
                a: connection.a.as_str().into(),
                b: connection.b.as_str().into(),
                distance: connection.distance,
            });
        }
        for player in &self.players {
            commands.push(Command::AddPlayer {
                id: player.name.as_str().into(),
                faction: player.faction.as_str().into(),
            });
        }
        for grant in &self.grants {
            if grant.resources != Resources::ZERO {
                commands.push(Command::GrantResources {
                    planet: grant.planet.as_str().into(),
                    player: grant.player.as_str().into(),
                    amount: grant.resources,
                });
            }
            for (ship, amount) in grant.ships.iter() {
                commands.push(Command::GrantShips {
                    planet: grant.planet.as_str().into(),
                    player: grant.player.as_str().into(),
                    ship: ship.clone(),
                    amount,
                });
            }
        }
        commands
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use incursion_core::fleet::Location;
    use incursion_core::transit::Propulsion;

    const SKIRMISH_RON: &str = r#"
        (
            name: "Skirmish",
            ships: [(name: "Fighter", points: 5, storage: 2, mass: 3)],
            planets: [
                (name: "Terra", value: 10, controlling: "Red"),
                (name: "Mars", value: 6, controlling: "Red", aligned: Some("Blue")),
            ],
            connections: [(a: "Terra", b: "Mars", distance: 4)],
            players: [(name: "ann", faction: "Red")],
            grants: [(planet: "Terra", player: "ann", resources: "60.5", ships: {"Fighter": 6})],
            orders: [
                MakeFleet(planet: "Terra", player: "ann", name: "Alpha", ships: {"Fighter": 2}),
                TransferResources(
                    planet: "Terra",
                    amount: "3",
                    from_player: "ann",
                    from: Planet,
                    to_player: "ann",
                    to: Fleet("Alpha"),
                ),
                DepartFleet(player: "ann", fleet: "Alpha", origin: "Terra", destination: "Mars", propulsion: Hohmann),
                AdvanceTurn,
            ],
        )
    "#;

    // -----------------------------------------------------------------------
    // Format parsing
    // -----------------------------------------------------------------------

    #[test]
    fn scenario_from_ron() {
        let data: ScenarioData = ron::from_str(SKIRMISH_RON).unwrap();
        assert_eq!(data.name, "Skirmish");
        assert_eq!(data.planets.len(), 2);
        assert_eq!(data.planets[1].aligned.as_deref(), Some("Blue"));
        assert_eq!(data.grants[0].resources, Resources::from_num(60.5));
        assert_eq!(data.grants[0].ships.count("Fighter"), 6);
        assert_eq!(data.orders.len(), 4);
        assert!(matches!(
            &data.orders[1],
            Command::TransferResources { to: Location::Fleet(name), .. } if name.as_str() == "Alpha"
        ));
        assert!(matches!(
            data.orders[2],
            Command::DepartFleet { propulsion: Propulsion::Hohmann, .. }
        ));
        assert!(data.orders[3].is_turn_boundary());
    }

    #[test]
    fn scenario_from_toml() {
        let toml_str = r#"
            name = "Skirmish"

            [config]
            resource_generation_ratio = 4

            [[ships]]
            name = "Fighter"
            points = 5
            storage = 2
            mass = 3

            [[planets]]
            name = "Terra"
            value = 10
            controlling = "Red"

            [[players]]
            name = "ann"
            faction = "Red"

            [[grants]]
            planet = "Terra"
            player = "ann"
            resources = "25"
            ships = { Fighter = 3 }
        "#;
        let data: ScenarioData = toml::from_str(toml_str).unwrap();
        let config = data.config.clone().unwrap();
        assert_eq!(config.resource_generation_ratio, 4);
        assert_eq!(config.hohmann_mass_ratio, CampaignConfig::default().hohmann_mass_ratio);
        assert_eq!(data.grants[0].resources, Resources::from_num(25));
        assert!(data.orders.is_empty());
    }

    #[test]
    fn scenario_from_json() {
        let json = r#"{
            "name": "Skirmish",
            "planets": [{"name": "Terra", "value": 10, "controlling": "Red"}],
            "players": [{"name": "ann", "faction": "Red"}],
            "orders": [
                {"GrantResources": {"planet": "Terra", "player": "ann", "amount": "1.25"}},
                "AdvanceTurn"
            ]
        }"#;
        let data: ScenarioData = serde_json::from_str(json).unwrap();
        assert!(data.ships.is_empty());
        assert!(matches!(
            data.orders[0],
            Command::GrantResources { amount, .. } if amount == Resources::from_num(1.25)
        ));
    }

    #[test]
    fn missing_planets_is_a_parse_error() {
        let result: Result<ScenarioData, _> = ron::from_str(r#"(name: "Empty")"#);
        assert!(result.is_err());
    }

    // -----------------------------------------------------------------------
    // Setup commands
    // -----------------------------------------------------------------------

    #[test]
    fn setup_commands_follow_dependency_order() {
        let data: ScenarioData = ron::from_str(SKIRMISH_RON).unwrap();
        let commands = data.setup_commands();
        let names: Vec<&str> = commands
            .iter()
            .map(|c| match c {
                Command::RegisterShipType { .. } => "ship",
                Command::AddPlanet { .. } => "planet",
                Command::AddConnection { .. } => "connection",
                Command::AddPlayer { .. } => "player",
                Command::GrantResources { .. } => "resources",
                Command::GrantShips { .. } => "ships",
                _ => "other",
            })
            .collect();
        assert_eq!(
            names,
            vec!["ship", "planet", "planet", "connection", "player", "resources", "ships"]
        );
    }

    #[test]
    fn alignment_defaults_to_controller() {
        let data: ScenarioData = ron::from_str(SKIRMISH_RON).unwrap();
        let commands = data.setup_commands();
        let aligned: Vec<&str> = commands
            .iter()
            .filter_map(|c| match c {
                Command::AddPlanet { aligned, .. } => Some(aligned.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(aligned, vec!["Red", "Blue"]);
    }

    #[test]
    fn zero_resource_grant_is_skipped() {
        let data: ScenarioData = ron::from_str(
            r#"(
                name: "Bare",
                planets: [(name: "P", value: 1, controlling: "F")],
                players: [(name: "A", faction: "F")],
                grants: [(planet: "P", player: "A", ships: {"Fighter": 1})],
            )"#,
        )
        .unwrap();
        let commands = data.setup_commands();
        assert!(!commands.iter().any(|c| matches!(c, Command::GrantResources { .. })));
        assert!(commands.iter().any(|c| matches!(c, Command::GrantShips { amount: 1, .. })));
    }
}
