// governance-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Event Store
// Description: Durable EventStore backed by SQLite WAL.
// Purpose: Mirror every appended Evidence entry to disk so a kernel can be
//          reconstructed by the Replay Engine across process restarts.
// Dependencies: governance-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`EventStore`] using `SQLite`. Each
//! append writes the entry's canonical JSON encoding into a single
//! append-only table, alongside a hash of the stored bytes. Reads recompute
//! that hash and fail closed on any mismatch rather than returning
//! corrupted data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use governance_core::EventStore;
use governance_core::EventStoreError;
use governance_core::Evidence;
use governance_core::HashDigest;
use governance_core::primitives::hash_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum encoded size of a single Evidence entry accepted by the store.
pub const MAX_EVIDENCE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` event store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Store payload exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl SqliteStoreError {
    /// Wraps this error as the append-side variant of [`EventStoreError`].
    fn into_append_error(self) -> EventStoreError {
        EventStoreError::AppendFailed(self.to_string())
    }

    /// Wraps this error as the read-side variant of [`EventStoreError`].
    fn into_read_error(self) -> EventStoreError {
        EventStoreError::ReadFailed(self.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed event store with WAL support.
#[derive(Clone)]
pub struct SqliteEventStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    /// Opens an `SQLite`-backed event store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }
}

impl EventStore for SqliteEventStore {
    fn append(&mut self, evidence: &Evidence) -> Result<(), EventStoreError> {
        self.append_entry(evidence).map_err(SqliteStoreError::into_append_error)
    }

    fn get_history(&self) -> Result<Vec<Evidence>, EventStoreError> {
        self.read_history().map_err(SqliteStoreError::into_read_error)
    }

    fn get_latest(&self) -> Result<Option<Evidence>, EventStoreError> {
        self.read_latest().map_err(SqliteStoreError::into_read_error)
    }
}

impl SqliteEventStore {
    /// Appends one entry to the event log.
    fn append_entry(&self, evidence: &Evidence) -> Result<(), SqliteStoreError> {
        let evidence_json = serde_json::to_vec(evidence)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if evidence_json.len() > MAX_EVIDENCE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_EVIDENCE_BYTES,
                actual_bytes: evidence_json.len(),
            });
        }
        let row_hash = hash_bytes(&evidence_json).to_hex();
        let appended_at = unix_millis();
        let mut guard =
            self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let result = tx.execute(
            "INSERT INTO evidence_log (
                evidence_id, previous_evidence_id, evidence_json, row_hash, appended_at
             ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                evidence.evidence_id.to_string(),
                evidence.previous_evidence_id.to_string(),
                evidence_json,
                row_hash,
                appended_at,
            ],
        );
        match result {
            Ok(_) => tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string())),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(SqliteStoreError::Invalid(format!(
                    "evidence {} already appended",
                    evidence.evidence_id
                )))
            }
            Err(err) => Err(SqliteStoreError::Db(err.to_string())),
        }
    }

    /// Reads the full event history in append order, verifying each row's
    /// stored hash before decoding it.
    fn read_history(&self) -> Result<Vec<Evidence>, SqliteStoreError> {
        let guard =
            self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let mut stmt = guard
            .prepare("SELECT evidence_json, row_hash FROM evidence_log ORDER BY seq ASC")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![], |row| {
                let evidence_json: Vec<u8> = row.get(0)?;
                let row_hash: String = row.get(1)?;
                Ok((evidence_json, row_hash))
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            let (evidence_json, row_hash) =
                row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            out.push(decode_and_verify(&evidence_json, &row_hash)?);
        }
        Ok(out)
    }

    /// Reads the most recently appended entry, verifying its stored hash.
    fn read_latest(&self) -> Result<Option<Evidence>, SqliteStoreError> {
        let guard =
            self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let row = guard
            .query_row(
                "SELECT evidence_json, row_hash FROM evidence_log ORDER BY seq DESC LIMIT 1",
                params![],
                |row| {
                    let evidence_json: Vec<u8> = row.get(0)?;
                    let row_hash: String = row.get(1)?;
                    Ok((evidence_json, row_hash))
                },
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|(evidence_json, row_hash)| decode_and_verify(&evidence_json, &row_hash)).transpose()
    }
}

/// Decodes one stored row, rejecting it if its bytes no longer match the
/// hash recorded alongside them at append time.
fn decode_and_verify(evidence_json: &[u8], row_hash: &str) -> Result<Evidence, SqliteStoreError> {
    let expected = hash_bytes(evidence_json).to_hex();
    if expected != row_hash {
        return Err(SqliteStoreError::Corrupt("evidence row hash mismatch".to_string()));
    }
    serde_json::from_slice(evidence_json).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS evidence_log (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    evidence_id TEXT NOT NULL UNIQUE,
                    previous_evidence_id TEXT NOT NULL,
                    evidence_json BLOB NOT NULL,
                    row_hash TEXT NOT NULL,
                    appended_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_evidence_log_previous
                    ON evidence_log (previous_evidence_id);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Exposed for `sqlite_crash_writer` and tests that need to recompute a
/// row hash outside the store itself.
#[must_use]
pub fn row_hash_for(evidence_json: &[u8]) -> HashDigest {
    hash_bytes(evidence_json)
}
