//! `SQLite` crash writer for event store durability tests.
// governance-store-sqlite/src/bin/sqlite_crash_writer.rs
// ============================================================================
// Binary: SQLite Crash Writer
// Description: Simulates a crash during an uncommitted evidence-log write.
// Purpose: Support durability tests for rollback/crash recovery behavior.
// Dependencies: governance-core, governance-store-sqlite, rusqlite
// ============================================================================

use std::env;
use std::path::PathBuf;

use governance_core::Action;
use governance_core::ActionId;
use governance_core::ActionPayload;
use governance_core::EntityId;
use governance_core::Evidence;
use governance_core::EvidenceId;
use governance_core::EvidenceStatus;
use governance_core::LogicalTimestamp;
use governance_core::MetricId;
use governance_core::MetricValue;
use governance_core::primitives::hash_bytes;
use governance_store_sqlite::SqliteEventStore;
use governance_store_sqlite::SqliteStoreConfig;
use governance_store_sqlite::SqliteStoreMode;
use governance_store_sqlite::SqliteSyncMode;
use rusqlite::params;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let path = args.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing sqlite path")
    })?;
    let action_id = args.next().unwrap_or_else(|| "crash-1".to_string());
    let path = PathBuf::from(path);

    let config = SqliteStoreConfig {
        path: path.clone(),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
    };
    let _store = SqliteEventStore::new(&config)?;
    let evidence = sample_evidence(&action_id);
    let evidence_json = serde_json::to_vec(&evidence)?;
    let row_hash = hash_bytes(&evidence_json).to_hex();

    let mut conn = rusqlite::Connection::open(&path)?;
    conn.execute_batch("PRAGMA journal_mode = wal; PRAGMA synchronous = full;")?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO evidence_log (
            evidence_id, previous_evidence_id, evidence_json, row_hash, appended_at
         ) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            evidence.evidence_id.to_string(),
            evidence.previous_evidence_id.to_string(),
            evidence_json,
            row_hash,
            0_i64,
        ],
    )?;

    std::process::abort();
}

/// Builds a minimal Evidence entry used by the crash writer.
fn sample_evidence(action_id: &str) -> Evidence {
    let action = Action {
        action_id: ActionId::new(action_id),
        initiator: EntityId::new("alice"),
        payload: ActionPayload {
            metric_id: MetricId::new("wealth"),
            value: MetricValue::from_i64(1),
            protocol_id: None,
        },
        timestamp: LogicalTimestamp::new(1, 0),
        expires_at: LogicalTimestamp::ZERO,
        signature: "deadbeef".to_string(),
    };
    Evidence {
        evidence_id: EvidenceId::from_digest(hash_bytes(b"crash-writer-sample")),
        previous_evidence_id: EvidenceId::zero(),
        action,
        status: EvidenceStatus::Success,
        timestamp: LogicalTimestamp::new(1, 0),
        metadata: None,
    }
}
