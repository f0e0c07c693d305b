// Session key transport: X25519 + HKDF-SHA256 + ChaCha20-Poly1305.
//
// Wire form:
//   [ephemeral_pub:32B][ciphertext:N][tag:16B]
//
// kek = HKDF-Expand(HKDF-Extract(salt = ephemeral_pub || recipient_pub, ikm = dh), "tether key wrap v1", 32)
//
// The KEK is used exactly once, so the AEAD nonce is fixed at zero.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::crypto::keys::{IdentityKeyPair, PeerPublicKey};
use crate::error::{Result, TetherTrustError};

const WRAP_INFO: &[u8] = b"tether key wrap v1";
const WRAP_NONCE: [u8; 12] = [0u8; 12];

/// Length of the ephemeral public key prefix.
pub const EPHEMERAL_LEN: usize = 32;
/// Length of the Poly1305 tag.
pub const TAG_LEN: usize = 16;

/// Encrypt `session_key` so only the holder of `peer`'s private key can recover it.
pub fn wrap(session_key: &[u8], peer: &PeerPublicKey) -> Result<Vec<u8>> {
    let mut secret = Zeroizing::new([0u8; 32]);
    OsRng
        .try_fill_bytes(&mut secret[..])
        .map_err(|e| TetherTrustError::Entropy(e.to_string()))?;
    let ephemeral = StaticSecret::from(*secret);
    let ephemeral_pub = X25519Public::from(&ephemeral);
    let recipient_pub = peer.x25519_public();

    let shared = ephemeral.diffie_hellman(&recipient_pub);
    if !shared.was_contributory() {
        return Err(TetherTrustError::Wrap("non-contributory peer key".into()));
    }

    let kek = derive_kek(shared.as_bytes(), ephemeral_pub.as_bytes(), recipient_pub.as_bytes())
        .map_err(TetherTrustError::Wrap)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&kek[..])
        .map_err(|e| TetherTrustError::Wrap(format!("cipher init: {e}")))?;
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&WRAP_NONCE),
            Payload {
                msg: session_key,
                aad: ephemeral_pub.as_bytes(),
            },
        )
        .map_err(|e| TetherTrustError::Wrap(e.to_string()))?;

    let mut out = Vec::with_capacity(EPHEMERAL_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_pub.as_bytes());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Recover a session key wrapped for `own`.
///
/// Every failure (short input, low-order point, bad tag) collapses into
/// [`TetherTrustError::Unwrap`].
pub fn unwrap(wrapped: &[u8], own: &IdentityKeyPair) -> Result<Zeroizing<Vec<u8>>> {
    if wrapped.len() < EPHEMERAL_LEN + TAG_LEN {
        return Err(TetherTrustError::Unwrap);
    }
    let (eph_bytes, ciphertext) = wrapped.split_at(EPHEMERAL_LEN);
    let mut eph = [0u8; EPHEMERAL_LEN];
    eph.copy_from_slice(eph_bytes);
    let ephemeral_pub = X25519Public::from(eph);

    let secret = own.x25519_secret();
    let recipient_pub = X25519Public::from(&secret);
    let shared = secret.diffie_hellman(&ephemeral_pub);
    if !shared.was_contributory() {
        return Err(TetherTrustError::Unwrap);
    }

    let kek = derive_kek(shared.as_bytes(), ephemeral_pub.as_bytes(), recipient_pub.as_bytes())
        .map_err(|_| TetherTrustError::Unwrap)?;
    let cipher =
        ChaCha20Poly1305::new_from_slice(&kek[..]).map_err(|_| TetherTrustError::Unwrap)?;
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&WRAP_NONCE),
            Payload {
                msg: ciphertext,
                aad: ephemeral_pub.as_bytes(),
            },
        )
        .map_err(|_| TetherTrustError::Unwrap)?;
    Ok(Zeroizing::new(plaintext))
}

fn derive_kek(
    shared: &[u8; 32],
    ephemeral_pub: &[u8; 32],
    recipient_pub: &[u8; 32],
) -> std::result::Result<Zeroizing<[u8; 32]>, String> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_pub);
    salt[32..].copy_from_slice(recipient_pub);
    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut kek = Zeroizing::new([0u8; 32]);
    hk.expand(WRAP_INFO, &mut kek[..])
        .map_err(|e| format!("HKDF expand error: {e}"))?;
    Ok(kek)
}
