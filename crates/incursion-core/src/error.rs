//! Caller-facing errors for campaign operations.
//!
//! Every variant is an expected, recoverable outcome. An operation that
//! returns one of these has left the campaign untouched.

use crate::fixed::Resources;
use crate::id::{FactionId, FleetName, PlanetId, ShipTypeId};
use std::fmt;

/// The kind of entity an identity error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Planet,
    Player,
    Faction,
    Fleet,
    Transit,
    /// Any named entry; used by lookups that search every table.
    Entry,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Planet => "planet",
            EntityKind::Player => "player",
            EntityKind::Faction => "faction",
            EntityKind::Fleet => "fleet",
            EntityKind::Transit => "transit",
            EntityKind::Entry => "entry",
        };
        f.write_str(s)
    }
}

/// Fieldless category of a [`CampaignError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateEntity,
    UnknownEntity,
    UnknownShipType,
    NotController,
    InsufficientFunds,
    InsufficientStock,
    InsufficientCapacity,
    NoConnection,
    InvalidAmount,
    TurnInProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CampaignError {
    #[error("{kind} '{name}' already exists")]
    DuplicateEntity { kind: EntityKind, name: String },
    #[error("unknown {kind} '{name}'")]
    UnknownEntity { kind: EntityKind, name: String },
    #[error("ship type '{0}' is not in the catalog")]
    UnknownShipType(ShipTypeId),
    #[error("{planet} is controlled by '{controller}', not '{faction}'")]
    NotController {
        planet: PlanetId,
        faction: FactionId,
        controller: FactionId,
    },
    #[error("insufficient funds: {required} required, {available} available")]
    InsufficientFunds {
        required: Resources,
        available: Resources,
    },
    #[error("insufficient stock of '{ship}': {required} required, {available} available")]
    InsufficientStock {
        ship: ShipTypeId,
        required: u32,
        available: u32,
    },
    #[error("fleet '{fleet}' cannot hold {required} more resources ({available} free)")]
    InsufficientCapacity {
        fleet: FleetName,
        required: Resources,
        available: Resources,
    },
    #[error("no connection between {from} and {to}")]
    NoConnection { from: PlanetId, to: PlanetId },
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("a turn is being resolved; the campaign is closed to commands")]
    TurnInProgress,
}

impl CampaignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CampaignError::DuplicateEntity { .. } => ErrorKind::DuplicateEntity,
            CampaignError::UnknownEntity { .. } => ErrorKind::UnknownEntity,
            CampaignError::UnknownShipType(_) => ErrorKind::UnknownShipType,
            CampaignError::NotController { .. } => ErrorKind::NotController,
            CampaignError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            CampaignError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CampaignError::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
            CampaignError::NoConnection { .. } => ErrorKind::NoConnection,
            CampaignError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            CampaignError::TurnInProgress => ErrorKind::TurnInProgress,
        }
    }

    pub(crate) fn unknown(kind: EntityKind, name: &str) -> Self {
        CampaignError::UnknownEntity {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: EntityKind, name: &str) -> Self {
        CampaignError::DuplicateEntity {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn unaffordable(required: Option<Resources>, available: Resources) -> Self {
        CampaignError::InsufficientFunds {
            required: required.unwrap_or(Resources::MAX),
            available,
        }
    }

    pub(crate) fn stock_overflow(ship: &str, amount: u32) -> Self {
        CampaignError::InvalidAmount(format!("{amount} more {ship} would overflow the ship count"))
    }
}
