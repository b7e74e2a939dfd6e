//! Snapshot and document support for campaigns.
//!
//! Provides binary serialization via `bitcode` with a versioned header,
//! and (behind the `json` feature) the human-readable campaign document.
//! Both paths run the invariant sweep on restore; a document that parses
//! but describes an impossible campaign is rejected.

use crate::campaign::{Campaign, CampaignState};
use crate::config::{CampaignConfig, ConfigError};
use crate::fixed::Turn;
use crate::validation::{self, InvariantViolation};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an Incursion campaign snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x1CC5_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("json encoding failed: {0}")]
    Json(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("json decoding failed: {0}")]
    Json(String),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("campaign violates {} invariant(s); first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    Invariants(Vec<InvariantViolation>),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot. Enables format detection
/// and version checking before the payload is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Turn at the time the snapshot was taken.
    pub turn: Turn,
}

impl SnapshotHeader {
    pub fn new(turn: Turn) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            turn,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// The serializable portion of a campaign. The event bus (closures) and
/// the turn phase are not persisted.
#[derive(Debug, Serialize, Deserialize)]
struct CampaignSnapshot {
    header: SnapshotHeader,
    state: CampaignState,
    config: CampaignConfig,
}

/// Read just the header from serialized data.
///
/// bitcode has no partial decoding, so this decodes the whole snapshot.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: CampaignSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

fn restore(state: CampaignState, config: CampaignConfig) -> Result<Campaign, DeserializeError> {
    let violations = validation::check_invariants(&state);
    if !violations.is_empty() {
        return Err(DeserializeError::Invariants(violations));
    }
    Ok(Campaign::from_state(state, config)?)
}

impl Campaign {
    /// Serialize state and config to a binary blob via bitcode.
    ///
    /// Resources are stored as exact fixed-point bits, so a restored
    /// campaign hashes identically.
    pub fn snapshot(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = CampaignSnapshot {
            header: SnapshotHeader::new(self.state.turn),
            state: self.state.clone(),
            config: self.config.clone(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore a campaign from a binary blob.
    ///
    /// The header is validated before the payload is used. The event bus is
    /// recreated empty; listeners must be registered again.
    pub fn from_snapshot(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: CampaignSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        restore(snapshot.state, snapshot.config)
    }
}

#[cfg(feature = "json")]
impl Campaign {
    /// The campaign document as pretty-printed JSON. Resources appear as
    /// decimal strings.
    pub fn to_json(&self) -> Result<String, SerializeError> {
        serde_json::to_string_pretty(&self.state).map_err(|e| SerializeError::Json(e.to_string()))
    }

    /// Load a campaign document. The config is not part of the document.
    pub fn from_json(json: &str, config: CampaignConfig) -> Result<Self, DeserializeError> {
        let state: CampaignState = serde_json::from_str(json).map_err(|e| DeserializeError::Json(e.to_string()))?;
        restore(state, config)
    }
}
