//! Simulation controller.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use ledgerd_client::LedgerClient;

use crate::metrics::{AckedOutcome, SimulationMetrics};
use crate::scenario::Scenario;

/// Drives one client through a scenario.
pub struct SimulationController {
    /// Client under load.
    client: LedgerClient,
    /// Workload.
    scenario: Scenario,
    /// Random number generator.
    rng: StdRng,
    /// Simulation metrics.
    metrics: SimulationMetrics,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(client: LedgerClient, scenario: Scenario, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            client,
            scenario,
            rng,
            metrics: SimulationMetrics::new(),
        }
    }

    /// Discover, synchronize, then send every planned transfer.
    ///
    /// Unacknowledged transfers are counted and skipped; any other client
    /// error ends the run.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.client.discover().await?;
        let last_seq = self.client.synchronize().await?;

        let plan = self.scenario.plan(&mut self.rng);
        info!(
            transfers = plan.len(),
            destinations = self.scenario.destinations,
            first_seq = last_seq.saturating_add(1),
            "Running scenario"
        );

        for (index, transfer) in plan.iter().enumerate() {
            if index > 0 && !self.scenario.interval.is_zero() {
                tokio::time::sleep(self.scenario.interval).await;
            }

            let before = self.client.last_balance();
            let started = Instant::now();
            match self.client.transfer(transfer.destination, transfer.amount).await {
                Ok(ack) => {
                    let outcome = AckedOutcome::classify(before, transfer.amount, ack.balance);
                    self.metrics.record_ack(outcome, transfer.amount, started.elapsed());
                    debug!(
                        seq = ack.sequence_number,
                        dest = %transfer.destination,
                        amount = transfer.amount,
                        balance = ack.balance,
                        outcome = ?outcome,
                        "Transfer acknowledged"
                    );
                }
                Err(e) if e.is_retryable() => {
                    self.metrics.record_failure();
                    warn!(error = %e, dest = %transfer.destination, "Transfer failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Get simulation metrics.
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Balance from the last acknowledged transfer.
    pub fn final_balance(&self) -> Option<u32> {
        self.client.last_balance()
    }
}
