//! Durable campaign storage.
//!
//! A [`CampaignStore`] holds at most one campaign. [`FileStore`] keeps a
//! bitcode snapshot on disk and replaces it atomically; [`MemoryStore`]
//! keeps the bytes in memory for tests and tools. A [`Session`] couples a
//! campaign with a store and flushes according to a [`FlushPolicy`].

use crate::campaign::Campaign;
use crate::command::{CommandLog, Command, Outcome};
use crate::config::CampaignConfig;
use crate::error::CampaignError;
use crate::serialize::{DeserializeError, SerializeError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error(transparent)]
    Deserialize(#[from] DeserializeError),
}

/// Somewhere a campaign can be saved and loaded.
pub trait CampaignStore {
    /// The stored campaign, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Campaign>, StoreError>;

    /// Persist the campaign, replacing whatever was stored.
    fn flush(&mut self, campaign: &Campaign) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// A snapshot file. Writes go to a sibling temp file which is then renamed
/// over the target, so a crash mid-write leaves the previous save intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CampaignStore for FileStore {
    fn load(&self) -> Result<Option<Campaign>, StoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        Ok(Some(Campaign::from_snapshot(&data)?))
    }

    fn flush(&mut self, campaign: &Campaign) -> Result<(), StoreError> {
        let data = campaign.snapshot()?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &data).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), bytes = data.len(), turn = campaign.turn(), "campaign flushed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Keeps the last flushed snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Option<Vec<u8>>,
    flushes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful flushes so far.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

impl CampaignStore for MemoryStore {
    fn load(&self) -> Result<Option<Campaign>, StoreError> {
        self.data
            .as_deref()
            .map(Campaign::from_snapshot)
            .transpose()
            .map_err(StoreError::from)
    }

    fn flush(&mut self, campaign: &Campaign) -> Result<(), StoreError> {
        self.data = Some(campaign.snapshot()?);
        self.flushes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// When a [`Session`] writes through to its store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushPolicy {
    /// After every resolved turn.
    #[default]
    EveryTurn,
    /// After every successful command.
    EveryOperation,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Campaign(#[from] CampaignError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// A campaign bound to a store.
#[derive(Debug)]
pub struct Session<S: CampaignStore> {
    campaign: Campaign,
    store: S,
    policy: FlushPolicy,
    log: CommandLog,
}

impl<S: CampaignStore> Session<S> {
    /// Resume the stored campaign, or start a fresh one with `config` if the
    /// store is empty.
    pub fn open(store: S, policy: FlushPolicy, config: CampaignConfig) -> Result<Self, SessionError> {
        let campaign = match store.load()? {
            Some(campaign) => {
                tracing::info!(turn = campaign.turn(), "campaign resumed");
                campaign
            }
            None => {
                tracing::info!("no stored campaign, starting fresh");
                Campaign::new(config)?
            }
        };
        Ok(Self {
            campaign,
            store,
            policy,
            log: CommandLog::new(),
        })
    }

    /// Keep up to `max_history` successful commands.
    pub fn with_history(mut self, max_history: usize) -> Self {
        self.log = CommandLog::with_max_history(max_history);
        self
    }

    /// Run a command and flush if the policy asks for it. A failed command
    /// never flushes.
    pub fn execute(&mut self, command: Command) -> Result<Outcome, SessionError> {
        let boundary = command.is_turn_boundary();
        let outcome = self.log.execute(&mut self.campaign, command)?;
        let due = match self.policy {
            FlushPolicy::EveryOperation => true,
            FlushPolicy::EveryTurn => boundary,
        };
        if due {
            self.flush()?;
        }
        Ok(outcome)
    }

    pub fn flush(&mut self) -> Result<(), SessionError> {
        self.store.flush(&self.campaign)?;
        Ok(())
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }

    pub fn history(&self) -> &CommandLog {
        &self.log
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Flush one last time and hand back the campaign and store.
    pub fn close(mut self) -> Result<(Campaign, S), SessionError> {
        self.flush()?;
        Ok((self.campaign, self.store))
    }
}
