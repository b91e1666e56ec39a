//! Transaction signing with Ed25519 keypairs.
//!
//! Signing is separate from building because the key may not be at hand when
//! the transaction is assembled. The signed data is
//! [`Transaction::signable_bytes`], which excludes the signature field.

use tracing::trace;

use super::builder::Transaction;
use crate::crypto::keys::Keypair;
use crate::crypto::signatures::sign;

/// Sign `tx` with `keypair`, consuming the unsigned value.
///
/// Any existing signature is replaced. The caller is responsible for the
/// keypair matching `tx.sender()`; a mismatch produces a transaction that
/// [`super::verify_transaction`] rejects with `InvalidSignature`.
///
/// ```
/// use longchain_protocol::crypto::Keypair;
/// use longchain_protocol::transaction::{sign_transaction, verify_transaction, Transaction, Value};
///
/// let keypair = Keypair::generate();
/// let tx = Transaction::new(keypair.public_key().to_hex(), "bob", Value::Amount(10));
/// let signed = sign_transaction(tx, &keypair);
/// assert!(verify_transaction(&signed).is_ok());
/// ```
pub fn sign_transaction(tx: Transaction, keypair: &Keypair) -> Transaction {
    let signature = sign(keypair, &tx.signable_bytes());
    let signed = tx.with_signature(signature.to_hex());
    trace!(tx = %signed.short_id(), "transaction signed");
    signed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{PublicKey, Signature};
    use crate::transaction::Value;

    #[test]
    fn signature_covers_signable_bytes() {
        let kp = Keypair::generate();
        let tx = Transaction::new(kp.public_key().to_hex(), "r", Value::Amount(9));
        let signed = sign_transaction(tx.clone(), &kp);

        let sig = Signature::from_hex(signed.signature().unwrap()).unwrap();
        let pk = PublicKey::from_hex(signed.sender()).unwrap();
        assert!(pk.verify(&tx.signable_bytes(), &sig));
    }

    #[test]
    fn signing_is_deterministic() {
        let kp = Keypair::from_seed(&[3u8; 32]);
        let tx = Transaction::new(kp.public_key().to_hex(), "r", Value::memo("cancel"));
        assert_eq!(
            sign_transaction(tx.clone(), &kp),
            sign_transaction(tx, &kp)
        );
    }

    #[test]
    fn resigning_replaces_signature() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let tx = Transaction::new(kp1.public_key().to_hex(), "r", Value::Amount(1));
        let once = sign_transaction(tx, &kp2);
        let twice = sign_transaction(once.clone(), &kp1);
        assert_ne!(once.signature(), twice.signature());
    }
}
