//! Core server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use ledgerd_common::{ClientId, LedgerError, Result, TransferRequest};
use ledgerd_ledger::Ledger;
use ledgerd_protocol::Packet;

use crate::config::ServerConfig;
use crate::metrics::{ServerMetrics, SharedMetrics};
use crate::observer::{ObserverReport, StatsObserver};
use crate::registration::RegistrationHandler;
use crate::state::ServerState;
use crate::transfer::TransferHandler;
use crate::transport::{Inbound, UdpTransport};

/// The ledger server: receive loop, handlers and stats observer.
pub struct LedgerServer {
    /// Configuration.
    config: ServerConfig,
    /// Node ID for this server instance.
    node_id: String,
    /// Current server state.
    state: RwLock<ServerState>,
    /// Shared account table.
    ledger: Arc<Ledger>,
    /// Discovery handler, run inline by the receive loop.
    registration: RegistrationHandler,
    /// Transfer handler, shared with transfer tasks.
    transfers: Arc<TransferHandler>,
    /// Bounds the number of transfer tasks in flight.
    permits: Arc<Semaphore>,
    /// Counters.
    metrics: SharedMetrics,
    /// Running stats observer.
    observer: Mutex<Option<JoinHandle<ObserverReport>>>,
    /// Stops the receive loop.
    stop_tx: watch::Sender<bool>,
}

impl LedgerServer {
    /// Create a new server instance.
    pub fn new(config: ServerConfig, node_id: String) -> Self {
        let ledger = Arc::new(Ledger::new(config.initial_balance));
        let metrics = Arc::new(ServerMetrics::new());
        let (stop_tx, _) = watch::channel(false);
        let permits = Arc::new(Semaphore::new(
            config.dispatch.max_concurrent_transfers as usize,
        ));

        Self {
            registration: RegistrationHandler::new(ledger.clone(), metrics.clone()),
            transfers: Arc::new(TransferHandler::new(ledger.clone(), metrics.clone())),
            config,
            node_id,
            state: RwLock::new(ServerState::Starting),
            ledger,
            permits,
            metrics,
            observer: Mutex::new(None),
            stop_tx,
        }
    }

    /// Start the stats observer and begin accepting datagrams.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            match *state {
                ServerState::Starting => *state = ServerState::Running,
                ServerState::Running => {
                    warn!("Server already running");
                    return Ok(());
                }
                ServerState::ShuttingDown | ServerState::Stopped => {
                    return Err(LedgerError::ShuttingDown);
                }
            }
        }

        let observer = StatsObserver::new(
            self.ledger.subscribe(),
            self.config.observer.report_interval,
        );
        *self.observer.lock() = Some(tokio::spawn(observer.run()));

        info!(
            initial_balance = self.config.initial_balance,
            max_concurrent_transfers = self.config.dispatch.max_concurrent_transfers,
            "Server started"
        );
        Ok(())
    }

    /// Run the receive loop on `transport` until [`LedgerServer::stop`] is called.
    ///
    /// Datagrams are handled in arrival order. Discoveries are answered
    /// inline; each transfer runs on its own task once a dispatch slot is free.
    pub async fn serve(&self, transport: &UdpTransport) -> Result<()> {
        if !self.is_accepting_requests() {
            return Err(LedgerError::NotStarted);
        }

        let mut stop_rx = self.stop_tx.subscribe();
        let stopped = async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        };
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                _ = &mut stopped => break,
                inbound = transport.recv() => match inbound {
                    Ok(inbound) => self.dispatch(transport, inbound).await,
                    Err(e) => {
                        self.metrics.receive_failed();
                        warn!(error = %e, "Failed to receive datagram");
                    }
                },
            }
        }

        debug!("Receive loop stopped");
        Ok(())
    }

    /// Stop the server gracefully.
    ///
    /// Stops the receive loop, waits for in-flight transfers to send their
    /// acknowledgments, then shuts the observer down and returns its summary.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub async fn stop(&self) -> Result<Option<ObserverReport>> {
        {
            let mut state = self.state.write();
            if matches!(*state, ServerState::ShuttingDown | ServerState::Stopped) {
                return Err(LedgerError::ShuttingDown);
            }
            *state = ServerState::ShuttingDown;
        }

        info!("Stopping server");
        self.stop_tx.send_replace(true);

        // Holding every permit means no transfer task is still running.
        match self
            .permits
            .acquire_many(self.config.dispatch.max_concurrent_transfers)
            .await
        {
            Ok(drained) => drained.forget(),
            Err(e) => warn!(error = %e, "Dispatch semaphore already closed"),
        }
        self.permits.close();

        self.ledger.close();
        let observer = self.observer.lock().take();
        let report = match observer {
            Some(handle) => match handle.await {
                Ok(report) => Some(report),
                Err(e) => {
                    error!(error = %e, "Stats observer failed");
                    None
                }
            },
            None => None,
        };

        *self.state.write() = ServerState::Stopped;

        let metrics = self.metrics.snapshot();
        info!(
            datagrams_received = metrics.datagrams_received,
            discoveries = metrics.discoveries,
            transfers = metrics.transfers_total(),
            acks_sent = metrics.acks_sent,
            dropped = metrics.malformed_dropped + metrics.unknown_kind_dropped,
            "Server stopped"
        );
        Ok(report)
    }

    /// Shared ledger.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Server counters.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Node ID.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Check if the server is accepting datagrams.
    pub fn is_accepting_requests(&self) -> bool {
        self.state.read().accepts_requests()
    }

    /// Get the current server state.
    pub fn state(&self) -> ServerState {
        *self.state.read()
    }

    // --- Private methods ---

    async fn dispatch(&self, transport: &UdpTransport, inbound: Inbound) {
        self.metrics.datagram_received();

        let packet = match inbound.packet {
            Ok(packet) => packet,
            Err(LedgerError::UnknownPacketKind(kind)) => {
                self.metrics.unknown_kind_dropped();
                warn!(from = %inbound.from, kind, "Dropping packet of unknown kind");
                return;
            }
            Err(e) => {
                self.metrics.malformed_dropped();
                debug!(from = %inbound.from, error = %e, "Dropping malformed datagram");
                return;
            }
        };

        let Some(client) = ClientId::from_socket_addr(&inbound.from) else {
            self.metrics.packet_ignored();
            warn!(from = %inbound.from, "Ignoring datagram from non-IPv4 sender");
            return;
        };

        match packet {
            Packet::Discovery { sequence_number } => {
                let ack = self.registration.register(client, sequence_number);
                send_ack(transport, &self.metrics, inbound.from, ack).await;
            }
            Packet::TransferRequest {
                sequence_number,
                destination,
                amount,
            } => {
                let permit = match self.permits.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        debug!(client = %client, "Dispatch closed, dropping transfer");
                        return;
                    }
                };

                let request = TransferRequest::new(client, destination, amount, sequence_number);
                let handler = self.transfers.clone();
                let metrics = self.metrics.clone();
                let transport = transport.clone();
                let to = inbound.from;

                tokio::spawn(async move {
                    let ack = handler.handle(&request);
                    send_ack(&transport, &metrics, to, ack).await;
                    drop(permit);
                });
            }
            Packet::DiscoveryAck { .. } | Packet::TransferAck { .. } => {
                self.metrics.packet_ignored();
                warn!(
                    client = %client,
                    kind = ?packet.kind(),
                    "Ignoring acknowledgment sent to server"
                );
            }
        }
    }
}

async fn send_ack(transport: &UdpTransport, metrics: &ServerMetrics, to: SocketAddr, ack: Packet) {
    match transport.send(to, &ack).await {
        Ok(()) => metrics.ack_sent(),
        Err(e) => {
            metrics.send_failed();
            warn!(to = %to, error = %e, "Failed to send acknowledgment");
        }
    }
}
