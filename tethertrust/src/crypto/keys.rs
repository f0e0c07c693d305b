// Ed25519 identity keypairs and pre-provisioned peer public keys.
//
// One identity serves both roles of the handshake: Ed25519 for signatures and
// its birationally-equivalent X25519 form for session key transport.

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::crypto::signature;
use crate::error::{Result, TetherTrustError};

/// A named Ed25519 identity keypair ("server", "client", ...).
///
/// Loaded once per process and shared read-only by every connection.
pub struct IdentityKeyPair {
    name: String,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl IdentityKeyPair {
    /// Generate a fresh random keypair from the OS entropy source.
    pub fn generate(name: impl Into<String>) -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng
            .try_fill_bytes(&mut seed[..])
            .map_err(|e| TetherTrustError::Entropy(e.to_string()))?;
        Ok(Self::from_seed(name, &seed))
    }

    /// Reconstruct from a 32-byte secret seed.
    pub fn from_seed(name: impl Into<String>, seed: &[u8; 32]) -> Self {
        Self::from_signing_key(name, SigningKey::from_bytes(seed))
    }

    /// Wrap an already-parsed signing key.
    pub fn from_signing_key(name: impl Into<String>, signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            name: name.into(),
            signing_key,
            verifying_key,
        }
    }

    /// Identity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Access the raw signing (private) key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Access the raw verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// The public half, in the form a peer would have it provisioned.
    pub fn public(&self) -> PeerPublicKey {
        PeerPublicKey {
            name: self.name.clone(),
            verifying_key: self.verifying_key,
        }
    }

    /// Sign `message` (SHA-256 digest, then Ed25519).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        signature::sign(message, &self.signing_key)
    }

    /// X25519 secret used to unwrap session keys addressed to this identity.
    pub(crate) fn x25519_secret(&self) -> StaticSecret {
        StaticSecret::from(self.signing_key.to_scalar_bytes())
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("name", &self.name)
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// The counterparty's public key, known in advance.
#[derive(Clone, PartialEq, Eq)]
pub struct PeerPublicKey {
    name: String,
    verifying_key: VerifyingKey,
}

impl PeerPublicKey {
    /// Build from a parsed verifying key.
    pub fn new(name: impl Into<String>, verifying_key: VerifyingKey) -> Self {
        Self {
            name: name.into(),
            verifying_key,
        }
    }

    /// Build from raw 32-byte Ed25519 public key bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8; 32]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| TetherTrustError::CryptoSetup(format!("invalid public key: {e}")))?;
        Ok(Self::new(name, verifying_key))
    }

    /// Peer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The 32-byte Ed25519 public key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Access the raw verifying key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Verify a signature produced by [`IdentityKeyPair::sign`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        signature::verify(message, signature, &self.verifying_key)
    }

    /// X25519 public key used to wrap session keys for this peer.
    pub(crate) fn x25519_public(&self) -> X25519Public {
        X25519Public::from(self.verifying_key.to_montgomery().to_bytes())
    }
}

impl fmt::Debug for PeerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerPublicKey")
            .field("name", &self.name)
            .field("public_key", &hex::encode(self.to_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_seed_roundtrip() {
        let kp = IdentityKeyPair::generate("server").unwrap();
        let kp2 = IdentityKeyPair::from_seed("server", &kp.signing_key().to_bytes());
        assert_eq!(kp.public_key_bytes(), kp2.public_key_bytes());
    }

    #[test]
    fn public_half_matches() {
        let kp = IdentityKeyPair::generate("client").unwrap();
        let peer = kp.public();
        assert_eq!(peer.name(), "client");
        assert_eq!(peer.to_bytes(), kp.public_key_bytes());
    }

    #[test]
    fn x25519_forms_agree() {
        // The Montgomery form of the verifying key must be the public key of
        // the X25519 secret derived from the signing key.
        let kp = IdentityKeyPair::generate("server").unwrap();
        let from_secret = X25519Public::from(&kp.x25519_secret());
        assert_eq!(from_secret.as_bytes(), kp.public().x25519_public().as_bytes());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = IdentityKeyPair::from_seed("server", &[7u8; 32]);
        let rendered = format!("{kp:?}");
        assert!(!rendered.contains(&hex::encode([7u8; 32])));
    }
}
