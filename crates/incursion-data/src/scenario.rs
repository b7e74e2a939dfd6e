//! Building a ready campaign from scenario data.

use crate::loader::{DataLoadError, check_unique};
use crate::schema::ScenarioData;
use incursion_core::campaign::Campaign;
use incursion_core::command::{Command, Outcome, ReplayError, replay};
use incursion_core::config::CampaignConfig;
use std::path::Path;

/// A loaded scenario: the campaign after setup, plus the commands that
/// built it and the opening orders still to run.
#[derive(Debug)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub campaign: Campaign,
    /// Commands that produced `campaign` from an empty one.
    pub setup: Vec<Command>,
    pub orders: Vec<Command>,
}

impl Scenario {
    /// Run the opening orders against the campaign, stopping at the first
    /// failure. Orders that ran before the failure stay applied.
    pub fn apply_orders(&mut self) -> Result<Vec<Outcome>, ReplayError> {
        let outcomes = replay(&mut self.campaign, &self.orders)?;
        tracing::info!(scenario = %self.name, orders = outcomes.len(), "opening orders applied");
        Ok(outcomes)
    }

    /// Setup followed by orders.
    pub fn script(&self) -> impl Iterator<Item = &Command> {
        self.setup.iter().chain(&self.orders)
    }
}

pub(crate) fn build_scenario(
    data: ScenarioData,
    config: CampaignConfig,
    file: &Path,
) -> Result<Scenario, DataLoadError> {
    check_unique(data.ships.iter().map(|s| s.name.as_str()), "ship", file)?;
    check_unique(data.planets.iter().map(|p| p.name.as_str()), "planet", file)?;
    check_unique(data.players.iter().map(|p| p.name.as_str()), "player", file)?;

    let mut campaign = Campaign::new(config).map_err(|source| DataLoadError::InvalidConfig {
        file: file.to_path_buf(),
        source,
    })?;
    let setup = data.setup_commands();
    replay(&mut campaign, &setup).map_err(|source| DataLoadError::Setup {
        file: file.to_path_buf(),
        source,
    })?;
    tracing::info!(
        scenario = %data.name,
        planets = data.planets.len(),
        players = data.players.len(),
        orders = data.orders.len(),
        "scenario loaded"
    );

    Ok(Scenario {
        name: data.name,
        description: data.description,
        campaign,
        setup,
        orders: data.orders,
    })
}
