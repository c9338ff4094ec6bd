//! Simulation scenarios.

use std::net::Ipv4Addr;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;

use ledgerd_common::ClientId;

/// First synthetic destination identity.
const FIRST_DESTINATION: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

/// Random transfer workload.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Number of transfers to send.
    pub transfers: usize,
    /// Number of synthetic destination identities.
    pub destinations: u32,
    /// Largest amount per transfer.
    pub max_amount: u32,
    /// Pause between transfers.
    pub interval: Duration,
}

/// One transfer the simulator will send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTransfer {
    /// Destination identity.
    pub destination: ClientId,
    /// Amount to send.
    pub amount: u32,
}

impl Scenario {
    /// Destination identities, `10.0.0.1` upwards.
    pub fn destination_ids(&self) -> impl Iterator<Item = ClientId> {
        let base = u32::from(FIRST_DESTINATION);
        (0..self.destinations).map(move |offset| ClientId::new(base.wrapping_add(offset)))
    }

    /// Draw the transfer plan from `rng`.
    ///
    /// Amounts are uniform in `1..=max_amount`; the same seed always yields
    /// the same plan.
    pub fn plan(&self, rng: &mut StdRng) -> Vec<PlannedTransfer> {
        let destinations: Vec<ClientId> = self.destination_ids().collect();
        if destinations.is_empty() {
            return Vec::new();
        }

        (0..self.transfers)
            .map(|_| PlannedTransfer {
                destination: destinations[rng.gen_range(0..destinations.len())],
                amount: rng.gen_range(1..=self.max_amount.max(1)),
            })
            .collect()
    }
}
