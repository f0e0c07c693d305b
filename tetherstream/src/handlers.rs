//! Built-in command handlers.

use std::sync::Arc;

use futures::future::BoxFuture;
use tethertrust::handshake::codec;
use tethertrust::HandshakeResponder;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{Result, TetherStreamError};
use crate::framing::{ECHO, ECHO_ACK, HANDSHAKE, MAX_PAYLOAD_LINE, REPLY};
use crate::router::{CommandHandler, CommandTable};

/// Runs one responder round: decode a request, validate it, write the reply.
///
/// Any decode or validation failure is returned before anything is written,
/// so a rejected peer sees only the connection closing.
pub struct HandshakeHandler {
    responder: HandshakeResponder,
}

impl HandshakeHandler {
    pub fn new(responder: HandshakeResponder) -> Self {
        Self { responder }
    }
}

impl CommandHandler for HandshakeHandler {
    fn handle<'a>(&'a self, conn: &'a mut Connection) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let request = codec::read_request(conn.reader()).await?;
            let (reply, session) = self.responder.respond(&request)?;

            let record = codec::encode_reply(&reply)?;
            conn.write_record(REPLY, &record).await?;
            conn.flush().await?;
            info!(
                peer = %conn.peer(),
                identity = %session.peer,
                nonce_a = ?session.nonce_a,
                "handshake complete"
            );
            Ok(())
        })
    }
}

/// Reads one payload line and acknowledges it.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

impl CommandHandler for EchoHandler {
    fn handle<'a>(&'a self, conn: &'a mut Connection) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let payload = conn
                .read_line(MAX_PAYLOAD_LINE)
                .await?
                .ok_or(TetherStreamError::ConnectionClosed)?;
            debug!(peer = %conn.peer(), len = payload.len(), "echo payload received");

            conn.write_line(ECHO_ACK).await?;
            conn.flush().await
        })
    }
}

/// The server's command table: `HANDSHAKE` and `ECHO`.
pub fn standard_table(responder: HandshakeResponder) -> Result<CommandTable> {
    let mut table = CommandTable::new();
    table.register(HANDSHAKE, Arc::new(HandshakeHandler::new(responder)))?;
    table.register(ECHO, Arc::new(EchoHandler))?;
    Ok(table)
}
