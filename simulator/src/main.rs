//! ledgerd Simulator
//!
//! Drives a running ledgerd server with random transfers and reports how
//! many moved value and how long acknowledgments took.

use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerd_client::{ClientConfig, LedgerClient};

mod controller;
mod metrics;
mod scenario;

use controller::SimulationController;
use scenario::Scenario;

/// ledgerd Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Load simulator for the ledgerd datagram ledger")]
struct Args {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:4000")]
    server: String,

    /// Number of transfers to send
    #[arg(short, long, default_value = "100")]
    transfers: usize,

    /// Number of destination identities (10.0.0.1 upwards)
    #[arg(short, long, default_value = "4")]
    destinations: u32,

    /// Largest amount per transfer
    #[arg(long, default_value = "20")]
    max_amount: u32,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Pause between transfers in milliseconds
    #[arg(long, default_value = "0")]
    interval_ms: u64,

    /// Acknowledgment timeout in milliseconds
    #[arg(long, default_value = "250")]
    ack_timeout_ms: u64,

    /// Transmissions per request
    #[arg(long, default_value = "8")]
    max_attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(server = %args.server, seed = ?args.seed, "Starting ledgerd simulator");

    let mut config = ClientConfig::for_server(args.server.clone());
    config.ack_timeout = Duration::from_millis(args.ack_timeout_ms);
    config.max_attempts = args.max_attempts;

    let client = LedgerClient::connect(config).await?;

    let scenario = Scenario {
        transfers: args.transfers,
        destinations: args.destinations,
        max_amount: args.max_amount,
        interval: Duration::from_millis(args.interval_ms),
    };
    let mut controller = SimulationController::new(client, scenario, args.seed);

    let started = Instant::now();
    tokio::select! {
        result = controller.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Interrupted");
        }
    }

    let metrics = controller.metrics();
    info!(
        sent = metrics.sent(),
        applied = metrics.applied,
        insufficient = metrics.insufficient,
        unclassified = metrics.unclassified,
        failed = metrics.failed,
        moved = metrics.moved,
        mean_latency_us = metrics.mean_latency().as_micros() as u64,
        p99_latency_us = metrics.p99_latency().as_micros() as u64,
        elapsed_ms = started.elapsed().as_millis() as u64,
        final_balance = ?controller.final_balance(),
        "Simulation complete"
    );

    Ok(())
}
