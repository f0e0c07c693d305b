// TetherTrust -- mutual-authentication handshake and session key transport.
//
// Crate root: module declarations and public re-exports.

pub mod crypto;
pub mod error;
pub mod freshness;
pub mod handshake;

// Re-export key types at crate root for convenience.
pub use crypto::keys::{IdentityKeyPair, PeerPublicKey};
pub use crypto::master_key::{derive_master_key, MasterKeyParams};
pub use error::{ErrorClass, Result, TetherTrustError};
pub use freshness::{FreshnessSource, Nonce, SessionKey, SystemFreshness, Timestamp};
pub use handshake::context::{HandshakeConfig, HandshakeContext, KeyConfirmation};
pub use handshake::messages::{HandshakeReply, HandshakeRequest};
pub use handshake::protocol::{EstablishedSession, HandshakeInitiator, HandshakeResponder};
