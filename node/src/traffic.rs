//! # Traffic Generator
//!
//! Keeps a simulated network busy. On every tick one wallet does one thing:
//! usually a signed transfer to another wallet, and on every
//! `reservation_every`-th tick an operation on the reservation contract.
//! A wallet that holds the reservation cancels it; any other wallet tries
//! to take it.
//!
//! Contract decisions are made against the longest published chain, the
//! same view the `/contract` endpoint reports.

use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{debug, info};

use longchain_contracts::ReservationContract;
use longchain_protocol::network::InMemoryNetwork;
use longchain_protocol::storage::Chain;
use longchain_protocol::transaction::{Value, Wallet};

use crate::api::longest_published;

const MAX_TRANSFER: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct TrafficConfig {
    pub interval: Duration,
    /// Every n-th tick is a contract operation. `0` disables them.
    pub reservation_every: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(750),
            reservation_every: 5,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrafficAction {
    Transfer {
        from: String,
        to: String,
        amount: u64,
    },
    Reserve {
        wallet: String,
    },
    Cancel {
        wallet: String,
    },
    /// The contract refused the operation; nothing was sent.
    Refused {
        wallet: String,
    },
}

pub struct TrafficGenerator {
    wallets: Vec<Wallet>,
    network: Arc<InMemoryNetwork>,
    contract: Arc<ReservationContract>,
    config: TrafficConfig,
    rng: StdRng,
    ticks: u64,
}

impl TrafficGenerator {
    /// `wallet_count` fresh wallets. At least one is always created.
    pub fn new(
        wallet_count: usize,
        network: Arc<InMemoryNetwork>,
        contract: Arc<ReservationContract>,
        config: TrafficConfig,
    ) -> Self {
        Self::with_rng(wallet_count, network, contract, config, StdRng::from_entropy())
    }

    pub fn with_rng(
        wallet_count: usize,
        network: Arc<InMemoryNetwork>,
        contract: Arc<ReservationContract>,
        config: TrafficConfig,
        rng: StdRng,
    ) -> Self {
        let wallets = (0..wallet_count.max(1)).map(|_| Wallet::generate()).collect();
        Self {
            wallets,
            network,
            contract,
            config,
            rng,
            ticks: 0,
        }
    }

    pub fn wallets(&self) -> &[Wallet] {
        &self.wallets
    }

    /// Perform one tick's worth of traffic.
    pub fn step(&mut self) -> TrafficAction {
        self.ticks += 1;
        let idx = self.rng.gen_range(0..self.wallets.len());

        let every = self.config.reservation_every;
        if every > 0 && self.ticks % every == 0 {
            return self.contract_step(idx);
        }

        let to_idx = (idx + 1) % self.wallets.len();
        let amount = self.rng.gen_range(1..=MAX_TRANSFER);
        let from = &self.wallets[idx];
        let to = self.wallets[to_idx].address();
        from.send(self.network.as_ref(), &to, Value::Amount(amount));
        debug!(amount, "transfer submitted");
        TrafficAction::Transfer {
            from: from.address(),
            to,
            amount,
        }
    }

    fn contract_step(&mut self, idx: usize) -> TrafficAction {
        let wallet = &self.wallets[idx];
        let address = wallet.address();
        let chain = longest_published(&self.network)
            .map(|(_, chain)| chain)
            .unwrap_or_else(Chain::genesis);
        let holds = self.contract.current_state(&chain).sender() == Some(address.as_str());

        let network = self.network.as_ref();
        if holds {
            if self.contract.cancel_reservation(wallet, network, &chain) {
                return TrafficAction::Cancel { wallet: address };
            }
        } else if self.contract.make_a_reservation(wallet, network, &chain) {
            return TrafficAction::Reserve { wallet: address };
        }
        TrafficAction::Refused { wallet: address }
    }

    /// Tick until `shutdown` flips to `true` or its sender drops. Returns the
    /// number of ticks.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval(self.config.interval);
        info!(
            wallets = self.wallets.len(),
            interval_ms = self.config.interval.as_millis() as u64,
            "traffic generator started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.step();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(ticks = self.ticks, "traffic generator stopped");
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longchain_contracts::ReservationState;
    use longchain_protocol::network::{
        AdmissionPolicy, ConsensusEngine, ConsensusLoop, ConsensusLoopConfig, NodeId,
    };

    fn setup(reservation_every: u64) -> (Arc<InMemoryNetwork>, NodeId, TrafficGenerator) {
        let net = Arc::new(InMemoryNetwork::new());
        let id = NodeId::new();
        net.register(id);
        let generator = TrafficGenerator::with_rng(
            2,
            Arc::clone(&net),
            Arc::new(ReservationContract::new("court-7")),
            TrafficConfig {
                interval: Duration::from_millis(10),
                reservation_every,
            },
            StdRng::seed_from_u64(7),
        );
        (net, id, generator)
    }

    #[test]
    fn transfers_are_queued_and_signed() {
        let (net, id, mut generator) = setup(0);
        for _ in 0..3 {
            match generator.step() {
                TrafficAction::Transfer { from, to, amount } => {
                    assert_ne!(from, to);
                    assert!((1..=MAX_TRANSFER).contains(&amount));
                }
                other => panic!("expected a transfer, got {other:?}"),
            }
        }
        assert_eq!(net.queue_depth(id), (3, 0));
    }

    #[test]
    fn every_nth_tick_touches_the_contract() {
        let (net, id, mut generator) = setup(2);
        assert!(matches!(generator.step(), TrafficAction::Transfer { .. }));
        assert!(matches!(generator.step(), TrafficAction::Reserve { .. }));
        assert_eq!(net.queue_depth(id).0, 2);
    }

    #[test]
    fn holder_cancels_once_reservation_lands() {
        let (net, id, mut generator) = setup(1);
        let mut node = ConsensusLoop::new(
            ConsensusEngine::new(id, AdmissionPolicy::strict()),
            Arc::clone(&net),
            ConsensusLoopConfig::default(),
        );
        let contract = ReservationContract::new("court-7");

        let TrafficAction::Reserve { wallet: holder } = generator.step() else {
            panic!("expected a reservation");
        };
        node.run_cycle();
        assert_eq!(
            contract.current_state(node.chain()).sender(),
            Some(holder.as_str())
        );

        // Keep stepping until the holder is picked; the other wallet is refused.
        loop {
            match generator.step() {
                TrafficAction::Cancel { wallet } => {
                    assert_eq!(wallet, holder);
                    break;
                }
                TrafficAction::Refused { wallet } => assert_ne!(wallet, holder),
                other => panic!("unexpected {other:?}"),
            }
        }
        node.run_cycle();
        assert_eq!(contract.current_state(node.chain()), ReservationState::Available);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown() {
        let (_net, _id, generator) = setup(0);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(generator.run(rx));

        tokio::time::sleep(Duration::from_millis(35)).await;
        tx.send(true).unwrap();
        let ticks = handle.await.unwrap();
        assert!(ticks >= 3);
    }
}
