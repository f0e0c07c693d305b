// Immutable per-process handshake context.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::crypto::keys::{IdentityKeyPair, PeerPublicKey};
use crate::error::{Result, TetherTrustError};
use crate::freshness::{FreshnessSource, SystemFreshness, Timestamp};
use crate::handshake::replay::{NoReplayGuard, ReplayGuard};

/// How the responder confirms the session key in its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyConfirmation {
    /// Re-wrap the initiator's session key for the initiator; the initiator
    /// requires the unwrapped key to equal the one it sent.
    #[default]
    Rewrap,
    /// Issue a new session key; the initiator adopts it.
    Fresh,
}

/// Handshake policy knobs. Both ends must agree on `key_confirmation`.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub key_confirmation: KeyConfirmation,
    /// Maximum tolerated distance between a peer timestamp and local time.
    /// `None` disables the check.
    pub max_skew: Option<Duration>,
    /// Inbound nonce history.
    pub replay_guard: Arc<dyn ReplayGuard>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            key_confirmation: KeyConfirmation::default(),
            max_skew: None,
            replay_guard: Arc::new(NoReplayGuard),
        }
    }
}

/// Own identity, the peer's public key, freshness source and policy.
///
/// Built once at startup and shared behind an `Arc` by every connection.
pub struct HandshakeContext {
    identity: IdentityKeyPair,
    peer: PeerPublicKey,
    freshness: Arc<dyn FreshnessSource>,
    config: HandshakeConfig,
}

impl HandshakeContext {
    /// Context with the system freshness source and default policy.
    pub fn new(identity: IdentityKeyPair, peer: PeerPublicKey) -> Self {
        Self {
            identity,
            peer,
            freshness: Arc::new(SystemFreshness),
            config: HandshakeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HandshakeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_freshness(mut self, freshness: Arc<dyn FreshnessSource>) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    pub fn peer(&self) -> &PeerPublicKey {
        &self.peer
    }

    pub fn freshness(&self) -> &dyn FreshnessSource {
        self.freshness.as_ref()
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Apply the configured skew window to a peer timestamp.
    pub(crate) fn check_skew(&self, stamp: &Timestamp) -> Result<()> {
        let Some(max_skew) = self.config.max_skew else {
            return Ok(());
        };
        let at = stamp
            .parse()
            .ok_or_else(|| TetherTrustError::Freshness("unparsable timestamp".into()))?;
        let skew = (Utc::now() - at).abs();
        let limit = chrono::Duration::from_std(max_skew)
            .map_err(|_| TetherTrustError::Freshness("skew window out of range".into()))?;
        if skew > limit {
            return Err(TetherTrustError::Freshness(format!(
                "timestamp {stamp} outside {}s window",
                max_skew.as_secs()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for HandshakeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeContext")
            .field("identity", &self.identity)
            .field("peer", &self.peer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(max_skew: Option<Duration>) -> HandshakeContext {
        let own = IdentityKeyPair::generate("server").unwrap();
        let peer = IdentityKeyPair::generate("client").unwrap().public();
        HandshakeContext::new(own, peer).with_config(HandshakeConfig {
            max_skew,
            ..HandshakeConfig::default()
        })
    }

    #[test]
    fn skew_disabled_accepts_anything() {
        let ctx = context(None);
        ctx.check_skew(&Timestamp::from_text("not a time")).unwrap();
    }

    #[test]
    fn skew_window_enforced() {
        let ctx = context(Some(Duration::from_secs(30)));
        ctx.check_skew(&SystemFreshness.now_stamp()).unwrap();

        let old = Timestamp::from_datetime(Utc::now() - chrono::Duration::minutes(5));
        assert!(matches!(
            ctx.check_skew(&old).unwrap_err(),
            TetherTrustError::Freshness(_)
        ));
        assert!(ctx.check_skew(&Timestamp::from_text("garbage")).is_err());
    }
}
