// governance-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Event Store
// Description: Durable EventStore backend using SQLite WAL.
// Purpose: Provide production-grade persistence for the governance kernel's
//          audit log.
// Dependencies: governance-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`EventStore`] implementation that
//! mirrors every appended Evidence entry into an append-only table. It is
//! the only concrete persistence the governance kernel ships with; the
//! in-memory `AuditLog` inside a running `Kernel` remains authoritative,
//! and this store becomes the source of truth only across process restarts,
//! via the Replay Engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_EVIDENCE_BYTES;
pub use store::SqliteEventStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
