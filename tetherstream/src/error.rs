use std::time::Duration;

use thiserror::Error;
use tethertrust::TetherTrustError;

/// All errors produced by the TetherStream layer.
#[derive(Debug, Error)]
pub enum TetherStreamError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("connection closed by peer mid-command")]
    ConnectionClosed,

    #[error("connection idle for longer than {0:?}")]
    IdleTimeout(Duration),

    #[error("line exceeds maximum of {max} bytes")]
    LineTooLong { max: usize },

    #[error("line is not valid utf-8")]
    InvalidLine,

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("command {0:?} is already registered")]
    DuplicateCommand(String),

    #[error("expected {expected} keyword, got {actual:?}")]
    UnexpectedKeyword { expected: &'static str, actual: String },

    #[error("payload must be a single line")]
    MultiLinePayload,

    #[error(transparent)]
    Trust(#[from] TetherTrustError),
}

impl TetherStreamError {
    /// Failure class for operator-facing logs.
    pub fn class(&self) -> &'static str {
        match self {
            TetherStreamError::Transport(_) => "transport",
            TetherStreamError::Connection(_)
            | TetherStreamError::ConnectionClosed
            | TetherStreamError::IdleTimeout(_) => "connection",
            TetherStreamError::LineTooLong { .. }
            | TetherStreamError::InvalidLine
            | TetherStreamError::UnknownCommand(_)
            | TetherStreamError::DuplicateCommand(_)
            | TetherStreamError::UnexpectedKeyword { .. }
            | TetherStreamError::MultiLinePayload => "protocol",
            TetherStreamError::Trust(e) => e.class().as_str(),
        }
    }

    /// Fatal errors (entropy loss, key setup) must stop the process rather
    /// than just the connection they surfaced on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TetherStreamError::Trust(e) if e.is_fatal())
    }

    /// True when the error is a handshake or record rejection rather than a
    /// transport problem.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TetherStreamError::Trust(e) if !e.is_fatal() && !matches!(e, TetherTrustError::Io(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, TetherStreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(TetherStreamError::Transport("bind".into()).class(), "transport");
        assert_eq!(TetherStreamError::ConnectionClosed.class(), "connection");
        assert_eq!(TetherStreamError::UnknownCommand("Z".into()).class(), "protocol");
        assert_eq!(
            TetherStreamError::from(TetherTrustError::Decode("short".into())).class(),
            "decode"
        );
        assert_eq!(
            TetherStreamError::from(TetherTrustError::Verification).class(),
            "verification"
        );
    }

    #[test]
    fn fatal_only_for_fatal_trust_errors() {
        assert!(TetherStreamError::from(TetherTrustError::Entropy("rng".into())).is_fatal());
        assert!(!TetherStreamError::from(TetherTrustError::Verification).is_fatal());
        assert!(!TetherStreamError::Transport("accept".into()).is_fatal());
    }

    #[test]
    fn rejections() {
        assert!(TetherStreamError::from(TetherTrustError::Unwrap).is_rejection());
        assert!(!TetherStreamError::from(TetherTrustError::Entropy("rng".into())).is_rejection());
        assert!(!TetherStreamError::ConnectionClosed.is_rejection());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(!TetherStreamError::from(TetherTrustError::Io(io)).is_rejection());
    }
}
