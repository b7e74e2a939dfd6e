//! Headless runner: loads a scenario, plays its opening orders and a number
//! of turns through a persisted session, logs each turn, and optionally
//! verifies determinism.
//!
//! Run with:
//! `cargo run -p incursion-headless -- crates/incursion-data/scenarios/frontier --turns 12 --check-determinism`

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use incursion_core::campaign::Campaign;
use incursion_core::command::{Command, Outcome};
use incursion_core::config::ConfigError;
use incursion_core::fixed::{Resources, Turn};
use incursion_core::serialize::SerializeError;
use incursion_core::store::{CampaignStore, FileStore, FlushPolicy, MemoryStore, Session, SessionError, StoreError};
use incursion_core::turn::TurnReport;
use incursion_core::validation::{DeterminismError, validate_determinism};
use incursion_data::{DataLoadError, Scenario, load_config, load_scenario, load_scenario_dir};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "incursion-headless")]
#[command(about = "Run an Incursion scenario without a console", version)]
struct Cli {
    /// Scenario file, or a directory holding `scenario.*` and an optional `config.*`
    scenario: PathBuf,

    /// Turns to resolve after the opening orders
    #[arg(short, long, default_value_t = 10)]
    turns: u32,

    /// Config file overriding the scenario's tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the campaign snapshot to this file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Flush the save after every command instead of every turn
    #[arg(long, requires = "save")]
    flush_every_operation: bool,

    /// Replay the run twice from the post-setup snapshot and compare hashes
    #[arg(long)]
    check_determinism: bool,

    /// Write the final campaign document as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Load(#[from] DataLoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error(transparent)]
    Determinism(#[from] DeterminismError),
    #[error("replays diverged at turn {turn}")]
    Diverged { turn: Turn },
    #[error("stored run ended at {live:#018x} but the replay ended at {replay:#018x}")]
    StoreDrift { live: u64, replay: u64 },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "incursion=debug" } else { "incursion=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt().with_env_filter(filter).with_target(false).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let scenario = load(&cli.scenario, cli.config.as_deref())?;
    tracing::info!(scenario = %scenario.name, description = %scenario.description, "starting run");

    let baseline = scenario.campaign.snapshot()?;
    let commands = script(&scenario, cli.turns);
    let policy = if cli.flush_every_operation {
        FlushPolicy::EveryOperation
    } else {
        FlushPolicy::EveryTurn
    };

    let campaign = match &cli.save {
        Some(path) => play(FileStore::new(path), policy, &scenario.campaign, &commands)?,
        None => play(MemoryStore::new(), policy, &scenario.campaign, &commands)?,
    };

    if cli.check_determinism {
        verify(&baseline, &commands, &campaign)?;
    }
    if let Some(path) = &cli.json {
        std::fs::write(path, campaign.to_json()?).map_err(|source| RunError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "campaign document written");
    }

    tracing::info!(
        turn = campaign.turn(),
        hash = %format!("{:#018x}", campaign.state_hash()),
        "run complete"
    );
    Ok(())
}

/// Load a scenario file or directory, swapping in an override config.
fn load(path: &Path, config: Option<&Path>) -> Result<Scenario, RunError> {
    let mut scenario = if path.is_dir() {
        load_scenario_dir(path)?
    } else {
        load_scenario(path)?
    };
    if let Some(config_path) = config {
        let config = load_config(config_path)?;
        scenario.campaign = Campaign::from_state(scenario.campaign.state().clone(), config)?;
    }
    Ok(scenario)
}

/// Opening orders followed by `turns` turn boundaries.
fn script(scenario: &Scenario, turns: u32) -> Vec<Command> {
    let mut commands = scenario.orders.clone();
    commands.extend(std::iter::repeat_n(Command::AdvanceTurn, turns as usize));
    commands
}

/// Seed the store with the starting campaign, resume it through a session,
/// and run every command.
fn play<S: CampaignStore>(
    mut store: S,
    policy: FlushPolicy,
    start: &Campaign,
    commands: &[Command],
) -> Result<Campaign, RunError> {
    store.flush(start)?;
    let mut session = Session::open(store, policy, start.config().clone())?.with_history(commands.len());
    for command in commands {
        match session.execute(command.clone())? {
            Outcome::Turn(report) => log_turn(&report, session.campaign()),
            outcome => tracing::debug!(?outcome, "order applied"),
        }
    }
    let (campaign, _store) = session.close()?;
    Ok(campaign)
}

fn log_turn(report: &TurnReport, campaign: &Campaign) {
    let income = report
        .income
        .iter()
        .fold(Resources::ZERO, |acc, credit| acc.saturating_add(credit.amount));
    let built: u64 = report.production.iter().map(|p| p.ships.total()).sum();
    tracing::info!(
        turn = report.turn,
        %income,
        transits = report.transits.len(),
        arrivals = report.arrivals().count(),
        stalled = report.stalled().count(),
        contacts = report.contacts.len(),
        built,
        hash = %format!("{:#018x}", campaign.state_hash()),
        "turn resolved"
    );
}

/// Replay the commands twice from the baseline and check both copies agree
/// with each other and with the stored run.
fn verify(baseline: &[u8], commands: &[Command], live: &Campaign) -> Result<(), RunError> {
    let result = validate_determinism(baseline, commands)?;
    if let Some(turn) = result.divergence_turn {
        return Err(RunError::Diverged { turn });
    }
    if commands.last().is_some_and(Command::is_turn_boundary)
        && let Some(&(_, replay, _)) = result.hash_log.last()
        && replay != live.state_hash()
    {
        return Err(RunError::StoreDrift {
            live: live.state_hash(),
            replay,
        });
    }
    tracing::info!(turns = result.hash_log.len(), "determinism: PASS");
    Ok(())
}
