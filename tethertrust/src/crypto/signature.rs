// Signature service: SHA-256 digest signed with Ed25519.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{Result, TetherTrustError};

/// Length of an encoded signature.
pub const SIGNATURE_LEN: usize = 64;

/// SHA-256 digest of `message`.
pub fn digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// Hash `message` and sign the digest with `key`.
pub fn sign(message: &[u8], key: &SigningKey) -> Result<Vec<u8>> {
    let sig: Signature = key
        .try_sign(&digest(message))
        .map_err(|e| TetherTrustError::Signing(e.to_string()))?;
    Ok(sig.to_bytes().to_vec())
}

/// Recompute the digest of `message` and check `signature` against `key`.
///
/// Any mismatch, including a signature of the wrong length, is reported as
/// [`TetherTrustError::Verification`].
pub fn verify(message: &[u8], signature: &[u8], key: &VerifyingKey) -> Result<()> {
    let sig = Signature::from_slice(signature).map_err(|_| TetherTrustError::Verification)?;
    key.verify_strict(&digest(message), &sig)
        .map_err(|_| TetherTrustError::Verification)
}
