// governance-cli/src/main.rs
// ============================================================================
// Binary: governance-cli
// Description: Thin operator shell over the governance kernel.
// Purpose: Load a genesis configuration, boot a kernel, submit actions from
//          a file or stdin, and print receipts and evidence.
// Dependencies: governance-core, governance-store-sqlite, clap, serde_json
// ============================================================================

//! ## Overview
//! This binary does not keep a kernel running between invocations: each
//! subcommand loads the genesis file, replays any configured store's prior
//! history into a fresh kernel, does its one job, and exits. There is no
//! logging crate here by design — every outcome is an explicit `Result`,
//! printed once at this boundary, same as evidence and receipts.

mod bootstrap;
mod config;

use std::io::Read;
use std::io::stdin;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use governance_core::Action;
use governance_core::ActionId;
use governance_core::Budget;
use governance_core::EntityId;
use governance_core::EventStore;
use governance_core::ProtocolId;
use governance_store_sqlite::SqliteEventStore;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::bootstrap::boot_kernel;
use crate::config::ConfigError;
use crate::config::GenesisConfig;

/// Operator shell for the governance kernel.
#[derive(Debug, Parser)]
#[command(name = "governance-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Boots a kernel from a genesis file and reports its lifecycle state.
    Boot(ConfigArgs),
    /// Submits one action, from a file or stdin, and prints its receipt.
    Submit(SubmitArgs),
    /// Prints the evidence history from a genesis file's configured store.
    Evidence(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Path to the genesis TOML file.
    #[arg(long, default_value = "governance.toml")]
    config: PathBuf,
}

#[derive(Debug, Args)]
struct SubmitArgs {
    #[command(flatten)]
    config_args: ConfigArgs,
    /// Path to a JSON-encoded submission request. Reads stdin if omitted.
    #[arg(long)]
    action: Option<PathBuf>,
}

/// The on-disk/stdin shape of one action submission: the actor and cost are
/// operational metadata the signed [`Action`](governance_core::Action)
/// itself does not carry.
#[derive(Debug, Deserialize)]
struct SubmitRequest {
    actor: EntityId,
    #[serde(default)]
    protocol_id: Option<ProtocolId>,
    cost: u64,
    action: Action,
}

/// JSON view of a successful commit, since
/// [`CommitReceipt`](governance_core::CommitReceipt) itself does not derive
/// `Serialize`.
#[derive(Debug, Serialize)]
struct ReceiptView {
    attempt_id: ActionId,
    timestamp: String,
    new_state_hash: String,
    status: String,
}

/// This binary's single error type: every failure mode collapses to a
/// message printed once at the process boundary.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error("failed to read action input: {0}")]
    ActionInput(std::io::Error),
    #[error("failed to parse action input: {0}")]
    ActionParse(serde_json::Error),
    #[error("{0:?}: {1}")]
    Guard(governance_core::ErrorCode, String),
    #[error("no store is configured in this genesis file")]
    NoStore,
    #[error(transparent)]
    Store(#[from] governance_store_sqlite::SqliteStoreError),
    #[error("failed to read event store history: {0}")]
    StoreRead(governance_core::EventStoreError),
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Command::Boot(args) => command_boot(&args),
        Command::Submit(args) => command_submit(&args),
        Command::Evidence(args) => command_evidence(&args),
    }
}

fn base_dir_of(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn command_boot(args: &ConfigArgs) -> CliResult<ExitCode> {
    let genesis = GenesisConfig::load(&args.config)?;
    let result = boot_kernel(&genesis, base_dir_of(&args.config))?;

    let view = serde_json::json!({
        "lifecycle": format!("{:?}", result.kernel.lifecycle()),
        "signing_public_key": hex_encode(&result.kernel.signing_public_key().to_bytes()),
        "replayed_entries": result.replayed_entries,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(ExitCode::SUCCESS)
}

fn command_submit(args: &SubmitArgs) -> CliResult<ExitCode> {
    let genesis = GenesisConfig::load(&args.config_args.config)?;
    let mut result = boot_kernel(&genesis, base_dir_of(&args.config_args.config))?;

    let raw = read_action_input(args.action.as_deref())?;
    let request: SubmitRequest = serde_json::from_str(&raw).map_err(CliError::ActionParse)?;

    let mut budget = Budget::new(genesis.boot_budget);
    let receipt = result
        .kernel
        .execute(request.actor, request.protocol_id, request.action, request.cost, &mut budget)
        .map_err(|violation| CliError::Guard(violation.code, violation.reason))?;

    let view = ReceiptView {
        attempt_id: receipt.attempt_id,
        timestamp: receipt.timestamp.to_string(),
        new_state_hash: receipt.new_state_hash.to_hex(),
        status: format!("{:?}", receipt.status),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(ExitCode::SUCCESS)
}

fn command_evidence(args: &ConfigArgs) -> CliResult<ExitCode> {
    let genesis = GenesisConfig::load(&args.config)?;
    let store_config = genesis.store.clone().ok_or(CliError::NoStore)?;
    let store = SqliteEventStore::new(&store_config.into_sqlite_config())?;
    let history = store.get_history().map_err(CliError::StoreRead)?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(ExitCode::SUCCESS)
}

fn read_action_input(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(CliError::ActionInput),
        None => {
            let mut buffer = String::new();
            stdin().read_to_string(&mut buffer).map_err(CliError::ActionInput)?;
            Ok(buffer)
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
