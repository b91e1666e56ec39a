//! A wallet: one keypair that builds, signs and submits transactions.

use tracing::debug;

use super::builder::Transaction;
use super::signing::sign_transaction;
use super::types::Value;
use crate::crypto::keys::Keypair;
use crate::network::transport::Transport;

/// Key holder for a ledger participant. Its address is the hex public key.
#[derive(Debug, Clone)]
pub struct Wallet {
    keypair: Keypair,
}

impl Wallet {
    pub fn generate() -> Self {
        Self::from_keypair(Keypair::generate())
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// The identity other participants send to, and the `sender` on
    /// everything this wallet signs.
    pub fn address(&self) -> String {
        self.keypair.public_key().to_hex()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Build and sign a transaction from this wallet.
    pub fn build(&self, receiver: &str, value: Value) -> Transaction {
        let tx = Transaction::new(self.address(), receiver, value);
        sign_transaction(tx, &self.keypair)
    }

    /// Build, sign and hand a transaction to the transport. Returns what was
    /// submitted.
    pub fn send<T>(&self, transport: &T, receiver: &str, value: Value) -> Transaction
    where
        T: Transport + ?Sized,
    {
        let tx = self.build(receiver, value);
        debug!(tx = %tx.short_id(), value = %tx.value(), "wallet submitting transaction");
        transport.submit_transaction(tx.clone());
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::memory::InMemoryNetwork;
    use crate::network::transport::NodeId;
    use crate::transaction::verification::is_authorized;

    #[test]
    fn built_transactions_are_authorized() {
        let wallet = Wallet::generate();
        let tx = wallet.build("bob", Value::Amount(3));
        assert_eq!(tx.sender(), wallet.address());
        assert!(is_authorized(&tx));
    }

    #[test]
    fn send_reaches_every_registered_node() {
        let net = InMemoryNetwork::new();
        let a = NodeId::new();
        let b = NodeId::new();
        net.register(a);
        net.register(b);

        let wallet = Wallet::generate();
        let tx = wallet.send(&net, "bob", Value::memo("reservation"));

        assert_eq!(net.get_pending_transactions(a), vec![tx.clone()]);
        assert_eq!(net.get_pending_transactions(b), vec![tx]);
    }
}
