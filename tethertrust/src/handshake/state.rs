// Handshake state machine (initiator side).

use crate::freshness::{Nonce, SessionKey};

/// Outcome of a completed handshake, local to one connection.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    /// Name of the authenticated peer.
    pub peer: String,
    /// The agreed session key.
    pub session_key: SessionKey,
    /// Initiator nonce.
    pub nonce_a: Nonce,
    /// Responder nonce.
    pub nonce_b: Nonce,
}

/// The current state of a TetherTrust initiator.
#[derive(Debug)]
pub enum InitiatorState {
    /// No handshake in progress.
    Idle,

    /// Request sent, waiting for the reply.
    RequestSent {
        /// The nonce the reply must echo.
        nonce_a: Nonce,
        /// The session key transported in the request.
        session_key: SessionKey,
    },

    /// Reply accepted.
    Complete { session: EstablishedSession },

    /// The attempt was abandoned. There is no retry at this layer.
    Failed,
}

impl InitiatorState {
    /// Human-readable label for the current state (used in error messages).
    pub fn label(&self) -> &'static str {
        match self {
            InitiatorState::Idle => "Idle",
            InitiatorState::RequestSent { .. } => "RequestSent",
            InitiatorState::Complete { .. } => "Complete",
            InitiatorState::Failed => "Failed",
        }
    }
}
