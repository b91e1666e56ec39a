//! # Digital Signatures
//!
//! Ed25519 signing and verification. Transaction signing and the
//! authorization check both go through these two functions.
//!
//! Verification never says *why* it failed. "Bad key", "bad signature" and
//! "wrong message" all come back as the same `false`.

use super::keys::{Keypair, PublicKey, Signature};

/// Sign a message with a keypair.
///
/// ```
/// use longchain_protocol::crypto::{Keypair, sign, verify};
///
/// let keypair = Keypair::generate();
/// let signature = sign(&keypair, b"pay bob 10");
/// assert!(verify(&keypair.public_key(), b"pay bob 10", &signature));
/// ```
pub fn sign(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

/// Verify a signature against a public key and message.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature)
}
