// TetherTrust handshake protocol: one round trip with signed records and a
// wrapped session key.
//
//   Initiator                                   Responder
//     |--- {nonce_a, ts_a, wrap(k), sig_a} ------->|
//     |<-- {nonce_b, nonce_a, ts_b, wrap(k'), sig_b}|
//
// k' is k (KeyConfirmation::Rewrap) or a new key (KeyConfirmation::Fresh).

use std::sync::Arc;

use crate::crypto::wrap;
use crate::error::{Result, TetherTrustError};
use crate::freshness::SessionKey;
use crate::handshake::context::{HandshakeContext, KeyConfirmation};
use crate::handshake::messages::{
    reply_signable, request_signable, HandshakeReply, HandshakeRequest,
};
pub use crate::handshake::state::EstablishedSession;
use crate::handshake::state::InitiatorState;

// ── Initiator ────────────────────────────────────────────────────────────

/// Client-side (initiator) of the TetherTrust handshake.
///
/// Any failure moves the initiator to `Failed`; a new attempt needs a new
/// initiator.
pub struct HandshakeInitiator {
    ctx: Arc<HandshakeContext>,
    state: InitiatorState,
}

impl HandshakeInitiator {
    pub fn new(ctx: Arc<HandshakeContext>) -> Self {
        Self {
            ctx,
            state: InitiatorState::Idle,
        }
    }

    /// Step 1: build the signed request carrying a fresh wrapped session key.
    pub fn create_request(&mut self) -> Result<HandshakeRequest> {
        if !matches!(self.state, InitiatorState::Idle) {
            return Err(self.transition_error("RequestSent"));
        }
        match self.build_request() {
            Ok((request, session_key)) => {
                self.state = InitiatorState::RequestSent {
                    nonce_a: request.nonce_a,
                    session_key,
                };
                Ok(request)
            }
            Err(e) => {
                self.state = InitiatorState::Failed;
                Err(e)
            }
        }
    }

    fn build_request(&self) -> Result<(HandshakeRequest, SessionKey)> {
        let freshness = self.ctx.freshness();
        let nonce_a = freshness.new_nonce()?;
        let timestamp_a = freshness.now_stamp();
        let session_key = freshness.new_session_key()?;

        let wrapped = wrap::wrap(session_key.as_bytes(), self.ctx.peer())?;
        let signature = self
            .ctx
            .identity()
            .sign(&request_signable(&nonce_a, &timestamp_a, &wrapped))?;

        Ok((
            HandshakeRequest {
                nonce_a,
                timestamp_a,
                wrapped_session_key: wrapped,
                signature,
            },
            session_key,
        ))
    }

    /// Step 2: authenticate the reply and accept the session.
    pub fn process_reply(&mut self, reply: &HandshakeReply) -> Result<EstablishedSession> {
        let (nonce_a, sent_key) =
            match std::mem::replace(&mut self.state, InitiatorState::Failed) {
                InitiatorState::RequestSent {
                    nonce_a,
                    session_key,
                } => (nonce_a, session_key),
                other => {
                    let err = TetherTrustError::InvalidStateTransition {
                        from: other.label().into(),
                        to: "Complete".into(),
                    };
                    self.state = other;
                    return Err(err);
                }
            };

        let ctx = &self.ctx;
        ctx.peer()
            .verify(&reply.signable_bytes(), &reply.signature)?;

        if reply.nonce_a_echo != nonce_a {
            return Err(TetherTrustError::Freshness("nonce echo mismatch".into()));
        }
        ctx.check_skew(&reply.timestamp_b)?;

        let unwrapped = wrap::unwrap(&reply.wrapped_session_key, ctx.identity())?;
        let returned_key = SessionKey::from_slice(&unwrapped).ok_or(TetherTrustError::Unwrap)?;

        let session_key = match ctx.config().key_confirmation {
            KeyConfirmation::Rewrap => {
                if !returned_key.ct_eq(&sent_key) {
                    return Err(TetherTrustError::KeyConfirmation);
                }
                sent_key
            }
            KeyConfirmation::Fresh => returned_key,
        };

        tracing::debug!(peer = ctx.peer().name(), "handshake reply accepted");
        let session = EstablishedSession {
            peer: ctx.peer().name().to_string(),
            session_key,
            nonce_a,
            nonce_b: reply.nonce_b,
        };
        self.state = InitiatorState::Complete {
            session: session.clone(),
        };
        Ok(session)
    }

    /// The established session, once the reply has been accepted.
    pub fn session(&self) -> Option<&EstablishedSession> {
        match &self.state {
            InitiatorState::Complete { session } => Some(session),
            _ => None,
        }
    }

    pub fn state(&self) -> &InitiatorState {
        &self.state
    }

    fn transition_error(&self, to: &str) -> TetherTrustError {
        TetherTrustError::InvalidStateTransition {
            from: self.state.label().into(),
            to: to.into(),
        }
    }
}

// ── Responder ────────────────────────────────────────────────────────────

/// Server-side (responder) of the TetherTrust handshake.
///
/// Stateless between rounds; each call to [`respond`](Self::respond) handles
/// one request.
#[derive(Clone)]
pub struct HandshakeResponder {
    ctx: Arc<HandshakeContext>,
}

impl HandshakeResponder {
    pub fn new(ctx: Arc<HandshakeContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &HandshakeContext {
        &self.ctx
    }

    /// Validate `request` and build the signed reply.
    ///
    /// On error nothing may be sent back to the peer.
    pub fn respond(
        &self,
        request: &HandshakeRequest,
    ) -> Result<(HandshakeReply, EstablishedSession)> {
        let ctx = &self.ctx;
        ctx.peer()
            .verify(&request.signable_bytes(), &request.signature)?;
        ctx.check_skew(&request.timestamp_a)?;

        let unwrapped = wrap::unwrap(&request.wrapped_session_key, ctx.identity())?;
        let session_key = SessionKey::from_slice(&unwrapped).ok_or(TetherTrustError::Unwrap)?;

        ctx.config().replay_guard.check_and_record(&request.nonce_a)?;

        let freshness = ctx.freshness();
        let nonce_b = freshness.new_nonce()?;
        let timestamp_b = freshness.now_stamp();

        let confirmed_key = match ctx.config().key_confirmation {
            KeyConfirmation::Rewrap => session_key,
            KeyConfirmation::Fresh => freshness.new_session_key()?,
        };
        let rewrapped = wrap::wrap(confirmed_key.as_bytes(), ctx.peer())?;
        let signature = ctx.identity().sign(&reply_signable(
            &nonce_b,
            &request.nonce_a,
            &timestamp_b,
            &rewrapped,
        ))?;

        tracing::debug!(peer = ctx.peer().name(), "handshake request accepted");
        let reply = HandshakeReply {
            nonce_b,
            nonce_a_echo: request.nonce_a,
            timestamp_b,
            wrapped_session_key: rewrapped,
            signature,
        };
        let session = EstablishedSession {
            peer: ctx.peer().name().to_string(),
            session_key: confirmed_key,
            nonce_a: request.nonce_a,
            nonce_b,
        };
        Ok((reply, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::IdentityKeyPair;

    fn contexts() -> (Arc<HandshakeContext>, Arc<HandshakeContext>) {
        let client = IdentityKeyPair::generate("client").unwrap();
        let server = IdentityKeyPair::generate("server").unwrap();
        let client_pub = client.public();
        let server_pub = server.public();
        (
            Arc::new(HandshakeContext::new(client, server_pub)),
            Arc::new(HandshakeContext::new(server, client_pub)),
        )
    }

    #[test]
    fn full_handshake() {
        let (client_ctx, server_ctx) = contexts();
        let mut initiator = HandshakeInitiator::new(client_ctx);
        let responder = HandshakeResponder::new(server_ctx);

        let request = initiator.create_request().unwrap();
        let (reply, server_session) = responder.respond(&request).unwrap();
        let client_session = initiator.process_reply(&reply).unwrap();

        assert_eq!(client_session.peer, "server");
        assert_eq!(server_session.peer, "client");
        assert_eq!(client_session.session_key, server_session.session_key);
        assert_eq!(client_session.nonce_b, server_session.nonce_b);
    }

    #[test]
    fn create_request_twice_fails() {
        let (client_ctx, _) = contexts();
        let mut initiator = HandshakeInitiator::new(client_ctx);
        initiator.create_request().unwrap();
        assert!(matches!(
            initiator.create_request().unwrap_err(),
            TetherTrustError::InvalidStateTransition { .. }
        ));
    }

    #[test]
    fn reply_before_request_fails() {
        let (client_ctx, server_ctx) = contexts();
        let mut other = HandshakeInitiator::new(client_ctx.clone());
        let (reply, _) = HandshakeResponder::new(server_ctx)
            .respond(&other.create_request().unwrap())
            .unwrap();

        let mut initiator = HandshakeInitiator::new(client_ctx);
        assert!(initiator.process_reply(&reply).is_err());
        assert_eq!(initiator.state().label(), "Idle");
    }

    #[test]
    fn failed_reply_leaves_initiator_failed() {
        let (client_ctx, server_ctx) = contexts();
        let mut initiator = HandshakeInitiator::new(client_ctx);
        let request = initiator.create_request().unwrap();
        let (mut reply, _) = HandshakeResponder::new(server_ctx).respond(&request).unwrap();
        reply.signature[0] ^= 0x01;

        assert!(matches!(
            initiator.process_reply(&reply).unwrap_err(),
            TetherTrustError::Verification
        ));
        assert_eq!(initiator.state().label(), "Failed");
        assert!(initiator.session().is_none());
    }
}
