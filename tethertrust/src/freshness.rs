// Freshness material: nonces, timestamps and session keys.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, TetherTrustError};

/// Length of a handshake nonce.
pub const NONCE_LEN: usize = 12;
/// Length of a session key.
pub const SESSION_KEY_LEN: usize = 32;

/// A 12-byte single-use random value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice, which must be exactly [`NONCE_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; NONCE_LEN]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

/// Textual rendering of the wall-clock time a message was built at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp(String);

impl Timestamp {
    /// RFC 3339, UTC, millisecond precision.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Wrap an already-rendered timestamp (e.g. one received off the wire).
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into a point in time, if the text is well formed.
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw symmetric key bytes established by one handshake.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice, which must be exactly [`SESSION_KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; SESSION_KEY_LEN]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &SessionKey) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Source of nonces, timestamps and session keys.
///
/// Randomness failures surface as [`TetherTrustError::Entropy`]; an
/// implementation must never fall back to weaker randomness.
pub trait FreshnessSource: Send + Sync {
    fn new_nonce(&self) -> Result<Nonce>;

    fn now_stamp(&self) -> Timestamp;

    fn new_session_key(&self) -> Result<SessionKey>;
}

/// OS CSPRNG and system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFreshness;

impl SystemFreshness {
    fn fill(buf: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| TetherTrustError::Entropy(e.to_string()))
    }
}

impl FreshnessSource for SystemFreshness {
    fn new_nonce(&self) -> Result<Nonce> {
        let mut bytes = [0u8; NONCE_LEN];
        Self::fill(&mut bytes)?;
        Ok(Nonce(bytes))
    }

    fn now_stamp(&self) -> Timestamp {
        Timestamp::from_datetime(Utc::now())
    }

    fn new_session_key(&self) -> Result<SessionKey> {
        let mut key = SessionKey([0u8; SESSION_KEY_LEN]);
        Self::fill(&mut key.0)?;
        Ok(key)
    }
}
