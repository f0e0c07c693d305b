//! Client side of a Tether connection.

use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info};

use tethertrust::handshake::codec;
use tethertrust::{EstablishedSession, HandshakeInitiator};

use crate::connection::Connection;
use crate::error::{Result, TetherStreamError};
use crate::framing::{ECHO, ECHO_ACK, HANDSHAKE, MAX_COMMAND_LINE, REPLY};

/// A dialed connection to a Tether server.
#[derive(Debug)]
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Dial `addr`. Failure is a [`TetherStreamError::Transport`].
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TetherStreamError::Transport(format!("dial failed: {e}")))?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let _ = stream.set_nodelay(true);
        info!(peer = %peer, "connected");
        Ok(Self::from_connection(Connection::new(stream, peer)))
    }

    /// Use an already-established connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Run one handshake round trip with `initiator`.
    ///
    /// Sends the request, waits for exactly one reply and validates it. Any
    /// failure abandons the attempt; there is no retry.
    pub async fn handshake(
        &mut self,
        initiator: &mut HandshakeInitiator,
    ) -> Result<EstablishedSession> {
        let request = initiator.create_request()?;
        let record = codec::encode_request(&request)?;
        self.conn.write_record(HANDSHAKE, &record).await?;
        self.conn.flush().await?;
        debug!(peer = %self.conn.peer(), nonce_a = ?request.nonce_a, "handshake request sent");

        let keyword = self
            .conn
            .read_command()
            .await?
            .ok_or(TetherStreamError::ConnectionClosed)?;
        if keyword != REPLY {
            return Err(TetherStreamError::UnexpectedKeyword {
                expected: REPLY,
                actual: keyword,
            });
        }
        let reply = codec::read_reply(self.conn.reader()).await?;
        let session = initiator.process_reply(&reply)?;
        info!(peer = %self.conn.peer(), identity = %session.peer, "handshake complete");
        Ok(session)
    }

    /// Send `payload` with the echo command and return the acknowledgement.
    pub async fn echo(&mut self, payload: &str) -> Result<String> {
        if payload.contains('\n') {
            return Err(TetherStreamError::MultiLinePayload);
        }
        self.conn.write_line(ECHO).await?;
        self.conn.write_line(payload).await?;
        self.conn.flush().await?;

        let ack = self
            .conn
            .read_line(MAX_COMMAND_LINE)
            .await?
            .ok_or(TetherStreamError::ConnectionClosed)?;
        if ack != ECHO_ACK {
            return Err(TetherStreamError::UnexpectedKeyword {
                expected: ECHO_ACK,
                actual: ack,
            });
        }
        Ok(ack)
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Close the write half so the server sees a clean end-of-stream.
    pub async fn close(mut self) -> Result<()> {
        self.conn.shutdown().await
    }
}
