//! ledgerd Server Binary

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerd_server::{LedgerServer, ServerConfig, UdpTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting ledgerd");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    // Generate node ID if not provided
    let node_id = config
        .node_id
        .clone()
        .unwrap_or_else(|| format!("ledgerd-{}", uuid::Uuid::new_v4()));

    info!(node_id = %node_id, "Node ID assigned");

    let transport = match UdpTransport::bind(config.socket_addr()?).await {
        Ok(transport) => transport,
        Err(e) => {
            error!(error = %e, "Failed to bind UDP socket");
            return Err(anyhow::anyhow!("Bind error: {}", e));
        }
    };

    let server = LedgerServer::new(config.clone(), node_id.clone());
    server.start().await?;

    info!(
        node_id = %node_id,
        listen_addr = %transport.local_addr()?,
        "ledgerd running"
    );

    tokio::select! {
        result = server.serve(&transport) => {
            if let Err(e) = result {
                error!(error = %e, "Receive loop failed");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
            }
        }
    }

    if let Some(report) = server.stop().await? {
        info!(
            reports = report.snapshots_emitted,
            transaction_count = report.last.stats.transaction_count,
            total_balance = report.last.stats.total_balance,
            "Final ledger stats"
        );
    }

    info!("ledgerd shutdown complete");
    Ok(())
}
