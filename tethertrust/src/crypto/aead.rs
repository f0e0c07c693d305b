// Session payload cipher: AES-256-GCM and ChaCha20-Poly1305 keyed by an
// established session key. Available to callers once a handshake completes;
// the handshake itself never uses it.

// Both aes-gcm and chacha20poly1305 re-export the same `aead` traits.
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaChaNonce};

use crate::error::{Result, TetherTrustError};
use crate::freshness::SessionKey;

/// Cipher suite identifier (wire value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherSuite {
    /// AES-256-GCM: suite ID 0x0001.
    #[default]
    Aes256Gcm,
    /// ChaCha20-Poly1305: suite ID 0x0002.
    ChaCha20Poly1305,
}

impl CipherSuite {
    /// Wire ID.
    pub fn wire_id(self) -> u16 {
        match self {
            CipherSuite::Aes256Gcm => 0x0001,
            CipherSuite::ChaCha20Poly1305 => 0x0002,
        }
    }

    /// Resolve from a wire ID.
    pub fn from_wire_id(id: u16) -> Option<Self> {
        match id {
            0x0001 => Some(CipherSuite::Aes256Gcm),
            0x0002 => Some(CipherSuite::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// AEAD keyed by a session key, dispatching on the chosen suite.
pub enum SessionCipher {
    Aes256Gcm(Box<Aes256Gcm>),
    ChaCha20Poly1305(Box<ChaCha20Poly1305>),
}

impl SessionCipher {
    /// Construct from a session key and the desired cipher suite.
    pub fn new(suite: CipherSuite, key: &SessionKey) -> Result<Self> {
        let key = key.as_bytes();
        Ok(match suite {
            CipherSuite::Aes256Gcm => SessionCipher::Aes256Gcm(Box::new(
                Aes256Gcm::new_from_slice(key)
                    .map_err(|e| TetherTrustError::Encryption(format!("aes-gcm init: {e}")))?,
            )),
            CipherSuite::ChaCha20Poly1305 => SessionCipher::ChaCha20Poly1305(Box::new(
                ChaCha20Poly1305::new_from_slice(key)
                    .map_err(|e| TetherTrustError::Encryption(format!("cipher init: {e}")))?,
            )),
        })
    }

    pub fn suite(&self) -> CipherSuite {
        match self {
            SessionCipher::Aes256Gcm(_) => CipherSuite::Aes256Gcm,
            SessionCipher::ChaCha20Poly1305(_) => CipherSuite::ChaCha20Poly1305,
        }
    }

    /// Encrypt `plaintext` with a 12-byte `nonce` and associated data `aad`.
    ///
    /// Returns ciphertext || 16-byte tag. Nonces must never repeat under one key.
    pub fn seal(&self, nonce: &[u8; 12], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg: plaintext, aad };
        let sealed = match self {
            SessionCipher::Aes256Gcm(c) => c.encrypt(AesNonce::from_slice(nonce), payload),
            SessionCipher::ChaCha20Poly1305(c) => {
                c.encrypt(ChaChaNonce::from_slice(nonce), payload)
            }
        };
        sealed.map_err(|e| TetherTrustError::Encryption(e.to_string()))
    }

    /// Decrypt and authenticate `ciphertext` produced by [`SessionCipher::seal`].
    pub fn open(&self, nonce: &[u8; 12], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload {
            msg: ciphertext,
            aad,
        };
        let opened = match self {
            SessionCipher::Aes256Gcm(c) => c.decrypt(AesNonce::from_slice(nonce), payload),
            SessionCipher::ChaCha20Poly1305(c) => {
                c.decrypt(ChaChaNonce::from_slice(nonce), payload)
            }
        };
        opened.map_err(|_| TetherTrustError::Decryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; 32])
    }

    #[test]
    fn aes_gcm_roundtrip_with_aad() {
        let cipher = SessionCipher::new(CipherSuite::Aes256Gcm, &key(0x42)).unwrap();
        let ct = cipher.seal(&[1u8; 12], b"payload", b"header").unwrap();
        assert_eq!(cipher.open(&[1u8; 12], &ct, b"header").unwrap(), b"payload");
    }

    #[test]
    fn chacha_wrong_aad_fails() {
        let cipher = SessionCipher::new(CipherSuite::ChaCha20Poly1305, &key(0xAA)).unwrap();
        let ct = cipher.seal(&[2u8; 12], b"data", b"good aad").unwrap();
        assert!(cipher.open(&[2u8; 12], &ct, b"bad aad").is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let enc = SessionCipher::new(CipherSuite::Aes256Gcm, &key(0x11)).unwrap();
        let dec = SessionCipher::new(CipherSuite::Aes256Gcm, &key(0x22)).unwrap();
        let ct = enc.seal(&[0u8; 12], b"secret", b"").unwrap();
        assert!(matches!(
            dec.open(&[0u8; 12], &ct, b"").unwrap_err(),
            TetherTrustError::Decryption
        ));
    }

    #[test]
    fn cipher_suite_wire_ids() {
        assert_eq!(CipherSuite::from_wire_id(0x0001), Some(CipherSuite::Aes256Gcm));
        assert_eq!(CipherSuite::from_wire_id(0x0002), Some(CipherSuite::ChaCha20Poly1305));
        assert_eq!(CipherSuite::from_wire_id(0x9999), None);
        assert_eq!(CipherSuite::default().wire_id(), 0x0001);
    }
}
