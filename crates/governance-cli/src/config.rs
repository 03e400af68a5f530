// governance-cli/src/config.rs
// ============================================================================
// Module: Genesis Configuration
// Description: Loads the TOML genesis file: entities, metrics, protocol
//              bundle paths, the boot budget, and an optional durable store.
// Purpose: The only place this crate reads configuration from disk.
// Dependencies: governance-core, governance-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! A genesis file describes everything a kernel needs before it can boot:
//! the registered entities (reusing [`Entity`]'s own hex-public-key
//! encoding), the metric catalog, paths to signed protocol bundle files,
//! the initial commit budget, and, optionally, a SQLite store to mirror the
//! audit log to. Entities and metrics are embedded directly rather than
//! through a parallel DTO, since both already carry the hex/TOML-friendly
//! `Serialize`/`Deserialize` impls the kernel itself uses.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use governance_core::Entity;
use governance_core::LogicalTimestamp;
use governance_core::MetricDefinition;
use governance_core::ProtocolBundle;
use governance_store_sqlite::SqliteStoreConfig;
use governance_store_sqlite::SqliteStoreMode;
use governance_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading a genesis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The genesis file could not be read.
    #[error("failed to read genesis file {path}: {source}")]
    Read {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The genesis file's TOML could not be parsed.
    #[error("failed to parse genesis file {path}: {source}")]
    Parse {
        /// The path whose contents failed to parse.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },
    /// A referenced protocol bundle file could not be read or parsed.
    #[error("failed to load protocol bundle {path}: {reason}")]
    Bundle {
        /// The bundle file's path.
        path: PathBuf,
        /// Why loading it failed.
        reason: String,
    },
}

/// The root genesis configuration, read from a single TOML file.
#[derive(Debug, Deserialize)]
pub struct GenesisConfig {
    /// The initial commit budget, consulted by the Budget Guard.
    pub boot_budget: u64,
    /// The kernel's genesis timestamp. Defaults to `0:0`.
    #[serde(default)]
    pub genesis_timestamp: Option<LogicalTimestamp>,
    /// Entities registered before the kernel boots.
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// Metric definitions registered before the kernel boots.
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
    /// Paths (relative to the genesis file) to signed protocol bundle
    /// files, each holding one JSON-encoded [`ProtocolBundle`].
    #[serde(default)]
    pub protocol_bundles: Vec<PathBuf>,
    /// An optional durable event store to mirror the audit log to.
    pub store: Option<StoreConfig>,
}

/// The `[store]` table of a genesis file.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Filesystem path to the SQLite database.
    pub path: PathBuf,
    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// SQLite journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// SQLite synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl StoreConfig {
    /// Converts this genesis-file store table into a
    /// [`SqliteStoreConfig`] the store crate understands.
    #[must_use]
    pub fn into_sqlite_config(self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

impl GenesisConfig {
    /// Loads and parses a genesis file from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Loads every protocol bundle named in `protocol_bundles`, resolving
    /// relative paths against `base_dir` (the genesis file's own
    /// directory).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bundle`] if a bundle file cannot be read or
    /// does not parse as a [`ProtocolBundle`].
    pub fn load_bundles(&self, base_dir: &Path) -> Result<Vec<ProtocolBundle>, ConfigError> {
        self.protocol_bundles
            .iter()
            .map(|relative| {
                let full_path = base_dir.join(relative);
                let raw = fs::read_to_string(&full_path)
                    .map_err(|err| ConfigError::Bundle { path: full_path.clone(), reason: err.to_string() })?;
                serde_json::from_str(&raw).map_err(|err| ConfigError::Bundle { path: full_path, reason: err.to_string() })
            })
            .collect()
    }
}
