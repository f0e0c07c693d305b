// TetherTrust error types

use std::fmt;

use thiserror::Error;

/// Top-level error type for the TetherTrust crate.
#[derive(Debug, Error)]
pub enum TetherTrustError {
    // ── Setup errors ────────────────────────────────────────────────────
    #[error("crypto setup failed: {0}")]
    CryptoSetup(String),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    // ── Crypto errors ───────────────────────────────────────────────────
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("signature verification failed")]
    Verification,

    #[error("session key wrap failed: {0}")]
    Wrap(String),

    #[error("session key unwrap failed")]
    Unwrap,

    #[error("AEAD encryption failed: {0}")]
    Encryption(String),

    #[error("AEAD decryption failed")]
    Decryption,

    // ── Handshake errors ────────────────────────────────────────────────
    #[error("freshness check failed: {0}")]
    Freshness(String),

    #[error("key confirmation mismatch")]
    KeyConfirmation,

    #[error("invalid handshake state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // ── Codec errors ────────────────────────────────────────────────────
    #[error("record encode error: {0}")]
    Encode(String),

    #[error("record decode error: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure classes used for operator-facing logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    CryptoSetup,
    Entropy,
    Signing,
    Verification,
    Wrap,
    Unwrap,
    Freshness,
    Decode,
    Connection,
    Protocol,
}

impl ErrorClass {
    /// Stable label used in structured log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::CryptoSetup => "crypto_setup",
            ErrorClass::Entropy => "entropy",
            ErrorClass::Signing => "signing",
            ErrorClass::Verification => "verification",
            ErrorClass::Wrap => "wrap",
            ErrorClass::Unwrap => "unwrap",
            ErrorClass::Freshness => "freshness",
            ErrorClass::Decode => "decode",
            ErrorClass::Connection => "connection",
            ErrorClass::Protocol => "protocol",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TetherTrustError {
    /// The failure class this error is reported under.
    pub fn class(&self) -> ErrorClass {
        match self {
            TetherTrustError::CryptoSetup(_) => ErrorClass::CryptoSetup,
            TetherTrustError::Entropy(_) => ErrorClass::Entropy,
            TetherTrustError::Signing(_) => ErrorClass::Signing,
            TetherTrustError::Verification | TetherTrustError::KeyConfirmation => {
                ErrorClass::Verification
            }
            TetherTrustError::Wrap(_) | TetherTrustError::Encryption(_) => ErrorClass::Wrap,
            TetherTrustError::Unwrap | TetherTrustError::Decryption => ErrorClass::Unwrap,
            TetherTrustError::Freshness(_) => ErrorClass::Freshness,
            TetherTrustError::Decode(_) => ErrorClass::Decode,
            TetherTrustError::Encode(_) => ErrorClass::Protocol,
            TetherTrustError::Io(_) => ErrorClass::Connection,
            TetherTrustError::InvalidStateTransition { .. } => ErrorClass::Protocol,
        }
    }

    /// Fatal errors must propagate to process exit; everything else is
    /// contained to one connection or handshake attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TetherTrustError::CryptoSetup(_) | TetherTrustError::Entropy(_)
        )
    }
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, TetherTrustError>;
