//! Loading pipeline: finds data files, parses them by extension, and builds
//! scenarios and configs.
//!
//! A scenario directory holds `scenario.{ron,toml,json}` and optionally
//! `config.{ron,toml,json}`. A single scenario file can also be loaded on
//! its own.

use crate::scenario::{Scenario, build_scenario};
use crate::schema::ScenarioData;
use incursion_core::command::ReplayError;
use incursion_core::config::{CampaignConfig, ConfigError};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name was declared twice in one scenario.
    #[error("duplicate {kind} '{name}' in {file}")]
    DuplicateName {
        file: PathBuf,
        kind: &'static str,
        name: String,
    },

    /// The campaign tunables are out of range.
    #[error("invalid config in {file}: {source}")]
    InvalidConfig {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// A setup entry was rejected by the engine.
    #[error("scenario setup failed in {file}: {source}")]
    Setup {
        file: PathBuf,
        #[source]
        source: ReplayError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Formats and discovery
// ===========================================================================

/// A data file format, named by its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Order in which a directory is searched.
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    /// The format `path`'s extension names.
    pub fn of(path: &Path) -> Result<Format, DataLoadError> {
        let extension = path.extension().and_then(|e| e.to_str());
        Self::ALL
            .into_iter()
            .find(|format| extension == Some(format.extension()))
            .ok_or_else(|| DataLoadError::UnsupportedFormat {
                file: path.to_path_buf(),
            })
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, String> {
        match self {
            Format::Ron => ron::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// The `{stem}.*` data file in `dir`, if any. A stem present in two
/// formats is ambiguous.
pub fn find_data_file(dir: &Path, stem: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = Format::ALL
        .into_iter()
        .map(|format| dir.join(format!("{stem}.{}", format.extension())))
        .filter(|path| path.is_file());
    match (present.next(), present.next()) {
        (Some(a), Some(b)) => Err(DataLoadError::ConflictingFormats { a, b }),
        (found, _) => Ok(found),
    }
}

pub fn require_data_file(dir: &Path, stem: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, stem)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: stem.to_string(),
        dir: dir.to_path_buf(),
    })
}

/// Parse a data file in the format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = Format::of(path)?;
    let text = std::fs::read_to_string(path)?;
    format.parse(&text).map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

/// Reject the first name that appears twice.
pub fn check_unique<'a>(
    names: impl IntoIterator<Item = &'a str>,
    kind: &'static str,
    file: &Path,
) -> Result<(), DataLoadError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

// ===========================================================================
// Entry points
// ===========================================================================

/// Load and validate a standalone config file.
pub fn load_config(path: &Path) -> Result<CampaignConfig, DataLoadError> {
    let config: CampaignConfig = deserialize_file(path)?;
    config.validate().map_err(|source| DataLoadError::InvalidConfig {
        file: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(file = %path.display(), "config loaded");
    Ok(config)
}

/// Load a single scenario file, using its embedded config or the defaults.
pub fn load_scenario(path: &Path) -> Result<Scenario, DataLoadError> {
    let data: ScenarioData = deserialize_file(path)?;
    let config = data.config.clone().unwrap_or_default();
    build_scenario(data, config, path)
}

/// Load `scenario.*` from a directory. A `config.*` file next to it
/// overrides any config embedded in the scenario.
pub fn load_scenario_dir(dir: &Path) -> Result<Scenario, DataLoadError> {
    let path = require_data_file(dir, "scenario")?;
    let data: ScenarioData = deserialize_file(&path)?;
    let config = match find_data_file(dir, "config")? {
        Some(config_path) => {
            if data.config.is_some() {
                tracing::debug!(file = %config_path.display(), "config file overrides embedded config");
            }
            load_config(&config_path)?
        }
        None => data.config.clone().unwrap_or_default(),
    };
    build_scenario(data, config, &path)
}

// ===========================================================================
// Tests
// ===========================================================================
