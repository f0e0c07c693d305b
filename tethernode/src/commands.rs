use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use tethertrust::crypto::keystore;
use tethertrust::{
    HandshakeContext, HandshakeInitiator, HandshakeResponder, IdentityKeyPair, TetherTrustError,
};
use tetherstream::{standard_table, Client, CommandRouter, Server, ServerConfig, TetherStreamError};

/// Identity names for the two roles.
pub(crate) const SERVER_IDENTITY: &str = "server";
pub(crate) const CLIENT_IDENTITY: &str = "client";

#[derive(Debug, Error)]
pub(crate) enum NodeError {
    #[error(transparent)]
    Trust(#[from] TetherTrustError),

    #[error(transparent)]
    Stream(#[from] TetherStreamError),
}

impl NodeError {
    pub(crate) fn class(&self) -> &'static str {
        match self {
            NodeError::Trust(e) => e.class().as_str(),
            NodeError::Stream(e) => e.class(),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, NodeError>;

/// Load this process's key pair and the peer's public key.
fn load_context(keys_dir: &Path, own: &str, peer: &str) -> Result<Arc<HandshakeContext>> {
    let identity = keystore::load_key_pair(keys_dir, own)?;
    let peer = keystore::load_public_key(keys_dir, peer)?;
    info!(identity = own, peer = peer.name(), "key material loaded");
    Ok(Arc::new(HandshakeContext::new(identity, peer)))
}

pub(crate) async fn cmd_server(
    keys_dir: &Path,
    port: u16,
    idle_timeout: Option<u64>,
    heartbeat: Option<u64>,
) -> Result<()> {
    let ctx = load_context(keys_dir, SERVER_IDENTITY, CLIENT_IDENTITY)?;
    let router = CommandRouter::new(standard_table(HandshakeResponder::new(ctx))?);
    let config = ServerConfig {
        idle_timeout: idle_timeout.filter(|s| *s > 0).map(Duration::from_secs),
        heartbeat_interval: heartbeat.filter(|s| *s > 0).map(Duration::from_secs),
        ..ServerConfig::with_port(port)
    };

    let server = Server::bind(config, router).await?;
    server
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

pub(crate) async fn cmd_client(
    keys_dir: &Path,
    host: &str,
    port: u16,
    echo: Option<&str>,
) -> Result<()> {
    let ctx = load_context(keys_dir, CLIENT_IDENTITY, SERVER_IDENTITY)?;
    let mut client = Client::connect((host, port)).await?;

    let mut initiator = HandshakeInitiator::new(ctx);
    let session = client.handshake(&mut initiator).await?;
    info!(peer = %session.peer, nonce_b = ?session.nonce_b, "session established");

    if let Some(payload) = echo {
        let ack = client.echo(payload).await?;
        info!(ack = %ack, "echo acknowledged");
    }
    client.close().await?;
    Ok(())
}

pub(crate) fn cmd_generate_keys(keys_dir: &Path, name: &str) -> Result<()> {
    let keypair = IdentityKeyPair::generate(name)?;
    keystore::save_key_pair(keys_dir, &keypair)?;
    Ok(())
}
