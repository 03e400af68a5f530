// governance-cli/src/bootstrap.rs
// ============================================================================
// Module: Kernel Bootstrap
// Description: Wires a Kernel's collaborators from a GenesisConfig and,
//              when a store is configured, replays prior history into it.
// Purpose: The one-time setup every subcommand needs before it can act.
// Dependencies: governance-core, governance-store-sqlite, rand
// ============================================================================

use std::path::Path;

use governance_core::AuditLog;
use governance_core::AuthorityEngine;
use governance_core::EventStore;
use governance_core::IdentityManager;
use governance_core::Kernel;
use governance_core::LogicalTimestamp;
use governance_core::MetricRegistry;
use governance_core::PrivateKey;
use governance_core::ProjectionEngine;
use governance_core::ProtocolEngine;
use governance_core::replay;
use governance_store_sqlite::SqliteEventStore;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::config::ConfigError;
use crate::config::GenesisConfig;

/// Errors raised while bootstrapping a kernel from a genesis config.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Loading the genesis file or a referenced bundle failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Opening the configured durable store failed.
    #[error("failed to open event store: {0}")]
    Store(#[from] governance_store_sqlite::SqliteStoreError),
    /// Reading the store's persisted history failed.
    #[error("failed to read event store history: {0}")]
    StoreRead(String),
    /// Registering a genesis entity, metric, or bundle failed.
    #[error("genesis registration failed: {0}")]
    Registration(String),
    /// Replaying prior history into the reconstructed kernel failed.
    #[error("replay failed: {0}")]
    Replay(String),
    /// Booting the constituted kernel failed.
    #[error("boot failed: {0}")]
    Boot(String),
}

/// A freshly constituted, booted kernel plus the entry count replay
/// reconstructed it from (zero on a first run with no store history).
pub struct BootResult {
    /// The booted kernel, ready to accept Attempts.
    pub kernel: Kernel,
    /// Evidence entries replayed from the store, if any was configured.
    pub replayed_entries: usize,
}

/// Builds and boots a kernel from `config`, resolving any relative protocol
/// bundle paths against `base_dir`.
///
/// If `config.store` is set, the store's persisted history is replayed into
/// the new kernel before it boots, so a restarted CLI process resumes from
/// where a prior invocation left off.
///
/// # Errors
///
/// Returns [`BootstrapError`] if a bundle cannot be loaded, genesis
/// registration fails, the store cannot be opened or read, replay fails, or
/// the kernel cannot transition to `ACTIVE`.
pub fn boot_kernel(config: &GenesisConfig, base_dir: &Path) -> Result<BootResult, BootstrapError> {
    let mut identities = IdentityManager::new();
    for entity in &config.entities {
        identities
            .register(entity.clone())
            .map_err(|err| BootstrapError::Registration(err.to_string()))?;
    }

    let mut registry = MetricRegistry::new();
    for metric in &config.metrics {
        registry
            .register(metric.clone())
            .map_err(|err| BootstrapError::Registration(err.to_string()))?;
    }

    let mut protocols = ProtocolEngine::new();
    let bundles = config.load_bundles(base_dir)?;
    for bundle in &bundles {
        protocols
            .load_bundle(bundle, &bundle.owner.entity_id)
            .map_err(|err| BootstrapError::Registration(err.to_string()))?;
    }

    let (history, store) = match &config.store {
        Some(store_config) => {
            let store = SqliteEventStore::new(&store_config.clone().into_sqlite_config())?;
            let history = store.get_history().map_err(|err| BootstrapError::StoreRead(err.to_string()))?;
            (history, Some(store))
        }
        None => (Vec::new(), None),
    };
    let replayed_entries = history.len();

    let replay_source = AuditLog::from_history(history.clone(), None);
    let kernel_audit =
        AuditLog::from_history(history, store.map(|store| Box::new(store) as Box<dyn EventStore + Send>));

    let genesis_timestamp = config.genesis_timestamp.unwrap_or(LogicalTimestamp::ZERO);
    let signing_key = PrivateKey::generate(&mut OsRng);
    let mut kernel = Kernel::new(identities, AuthorityEngine::new(), registry, kernel_audit, protocols, genesis_timestamp, signing_key);

    if replayed_entries > 0 {
        replay(&replay_source, &mut kernel, &mut ProjectionEngine::new())
            .map_err(|violation| BootstrapError::Replay(format!("{:?}: {}", violation.code, violation.reason)))?;
    }

    kernel
        .boot()
        .map_err(|violation| BootstrapError::Boot(format!("{:?}: {}", violation.code, violation.reason)))?;

    Ok(BootResult { kernel, replayed_entries })
}
