//! QC-Upgrade: Quantum-Chain upgrade CLI
//!
//! Queries version tallies and the pending upgrade, and submits signalling
//! transactions to a node.

use anyhow::Context;
use clap::{Parser, Subcommand};
use shared_types::{AppVersion, ValidatorAddress};

use quantum_telemetry::{init_telemetry, TelemetryConfig};
use qc_upgrade::{Command, UpgradeApiClient};

/// QC-Upgrade: coordinated app-version upgrades
#[derive(Parser, Debug)]
#[command(name = "qc-upgrade")]
#[command(about = "Inspect and drive quorum-based app version upgrades")]
struct Args {
    /// JSON-RPC endpoint of a node that serves the signal_* methods
    #[arg(short, long, default_value = "http://127.0.0.1:8545")]
    endpoint: String,

    /// Validator address (hex) that signs submitted transactions
    #[arg(long)]
    from: Option<ValidatorAddress>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Voting power signalled for a version
    Tally { version: AppVersion },
    /// Signal readiness to run a version
    Signal { version: AppVersion },
    /// Schedule the upgrade if quorum is reached
    TryUpgrade,
    /// Show the scheduled upgrade, if any
    Pending,
}

impl From<Cmd> for Command {
    fn from(cmd: Cmd) -> Self {
        match cmd {
            Cmd::Tally { version } => Command::Tally { version },
            Cmd::Signal { version } => Command::Signal { version },
            Cmd::TryUpgrade => Command::TryUpgrade,
            Cmd::Pending => Command::Pending,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _telemetry = init_telemetry(TelemetryConfig {
        service_name: "qc-upgrade".to_string(),
        log_level: args.log_level.clone(),
        ..TelemetryConfig::default()
    })?;

    let client = UpgradeApiClient::new(&args.endpoint)
        .with_context(|| format!("Failed to create API client for {}", args.endpoint))?;

    let command = Command::from(args.command);
    let output = command.run(&client, args.from).await?;
    println!("{output}");
    Ok(())
}
