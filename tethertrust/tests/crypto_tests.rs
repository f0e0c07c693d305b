// Integration tests for the TetherTrust crypto layer.

use tethertrust::crypto::aead::{CipherSuite, SessionCipher};
use tethertrust::crypto::signature::{self, SIGNATURE_LEN};
use tethertrust::crypto::wrap;
use tethertrust::{FreshnessSource, IdentityKeyPair, SystemFreshness, TetherTrustError};

// ── Key transport ────────────────────────────────────────────────────────

#[test]
fn unwrap_recovers_wrapped_key_for_many_keypairs() {
    for i in 0..32 {
        let recipient = IdentityKeyPair::generate(format!("peer-{i}")).unwrap();
        let key = SystemFreshness.new_session_key().unwrap();
        let wrapped = wrap::wrap(key.as_bytes(), &recipient.public()).unwrap();
        let recovered = wrap::unwrap(&wrapped, &recipient).unwrap();
        assert_eq!(recovered.as_slice(), key.as_bytes().as_slice());
    }
}

#[test]
fn unwrap_failure_is_not_fatal() {
    let recipient = IdentityKeyPair::generate("server").unwrap();
    let err = wrap::unwrap(&[0u8; 80], &recipient).unwrap_err();
    assert!(matches!(err, TetherTrustError::Unwrap));
    assert!(!err.is_fatal());
}

// ── Signatures ───────────────────────────────────────────────────────────

#[test]
fn signature_roundtrip_with_peer_key() {
    let kp = IdentityKeyPair::generate("client").unwrap();
    let sig = kp.sign(b"tether integration message").unwrap();
    assert_eq!(sig.len(), SIGNATURE_LEN);
    kp.public()
        .verify(b"tether integration message", &sig)
        .expect("valid signature");
}

#[test]
fn wrong_key_rejects() {
    let kp1 = IdentityKeyPair::generate("a").unwrap();
    let kp2 = IdentityKeyPair::generate("b").unwrap();
    let sig = kp1.sign(b"cross-key test").unwrap();
    let err = signature::verify(b"cross-key test", &sig, kp2.verifying_key()).unwrap_err();
    assert!(matches!(err, TetherTrustError::Verification));
}

// ── Session cipher ───────────────────────────────────────────────────────

#[test]
fn session_cipher_with_established_key() {
    let key = SystemFreshness.new_session_key().unwrap();
    for suite in [CipherSuite::Aes256Gcm, CipherSuite::ChaCha20Poly1305] {
        let cipher = SessionCipher::new(suite, &key).unwrap();
        assert_eq!(cipher.suite(), suite);
        let mut ct = cipher.seal(&[9u8; 12], b"bulk payload", b"").unwrap();
        assert_eq!(cipher.open(&[9u8; 12], &ct, b"").unwrap(), b"bulk payload");
        ct[0] ^= 0xFF;
        assert!(cipher.open(&[9u8; 12], &ct, b"").is_err());
    }
}
