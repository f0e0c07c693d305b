//! A single accepted or dialed connection.
//!
//! Wraps a type-erased duplex stream in a `BufReader` so keyword lines and
//! encoded records can be consumed from the same buffered cursor.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Result, TetherStreamError};
use crate::framing::MAX_COMMAND_LINE;

/// Any bidirectional byte stream a connection can run over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// Buffered duplex stream plus a label identifying the remote peer.
pub struct Connection {
    stream: BufReader<Box<dyn AsyncStream>>,
    peer: String,
    idle_timeout: Option<Duration>,
}

impl Connection {
    pub fn new<S: AsyncStream + 'static>(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream: BufReader::new(Box::new(stream)),
            peer: peer.into(),
            idle_timeout: None,
        }
    }

    /// Bound how long the connection may sit waiting for its next command.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Read the next command keyword.
    ///
    /// Returns `Ok(None)` on a clean end-of-stream between commands.
    pub async fn read_command(&mut self) -> Result<Option<String>> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_line(MAX_COMMAND_LINE))
                .await
                .map_err(|_| TetherStreamError::IdleTimeout(limit))?,
            None => self.read_line(MAX_COMMAND_LINE).await,
        }
    }

    /// Read one `\n`-terminated line of at most `max` bytes (terminator
    /// included), stripping the terminator and any trailing `\r`.
    ///
    /// Returns `Ok(None)` if the stream ends before any byte is read. A stream
    /// that ends mid-line is a connection error.
    pub async fn read_line(&mut self, max: usize) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let mut limited = (&mut self.stream).take(max as u64);
        let n = limited.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') {
            if n >= max {
                return Err(TetherStreamError::LineTooLong { max });
            }
            return Err(TetherStreamError::ConnectionClosed);
        }
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        String::from_utf8(buf)
            .map(Some)
            .map_err(|_| TetherStreamError::InvalidLine)
    }

    /// Write `line` followed by `\n`. Not flushed.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let inner = self.stream.get_mut();
        inner.write_all(line.as_bytes()).await?;
        inner.write_all(b"\n").await?;
        Ok(())
    }

    /// Write a keyword line followed by one encoded record. Not flushed.
    pub async fn write_record(&mut self, keyword: &str, record: &[u8]) -> Result<()> {
        self.write_line(keyword).await?;
        self.stream.get_mut().write_all(record).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.stream.get_mut().flush().await?;
        Ok(())
    }

    /// Buffered reader positioned at the next unread byte, for decoders that
    /// consume a record directly from the stream.
    pub fn reader(&mut self) -> &mut (impl AsyncRead + Unpin) {
        &mut self.stream
    }

    /// Shut down the write half.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt};

    #[tokio::test]
    async fn reads_lines_and_strips_cr() {
        let (a, mut b) = duplex(1024);
        let mut conn = Connection::new(a, "test");
        b.write_all(b"ECHO\r\nhello\n").await.unwrap();
        assert_eq!(conn.read_command().await.unwrap().as_deref(), Some("ECHO"));
        assert_eq!(conn.read_line(64).await.unwrap().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn clean_eof_is_none() {
        let (a, b) = duplex(64);
        drop(b);
        let mut conn = Connection::new(a, "test");
        assert!(conn.read_command().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_mid_line_is_error() {
        let (a, mut b) = duplex(64);
        b.write_all(b"HAND").await.unwrap();
        drop(b);
        let mut conn = Connection::new(a, "test");
        assert!(matches!(
            conn.read_command().await.unwrap_err(),
            TetherStreamError::ConnectionClosed
        ));
    }

    #[tokio::test]
    async fn overlong_line_rejected() {
        let (a, mut b) = duplex(4096);
        b.write_all(&[b'A'; 300]).await.unwrap();
        let mut conn = Connection::new(a, "test");
        assert!(matches!(
            conn.read_command().await.unwrap_err(),
            TetherStreamError::LineTooLong { max: MAX_COMMAND_LINE }
        ));
    }

    #[tokio::test]
    async fn non_utf8_line_rejected() {
        let (a, mut b) = duplex(64);
        b.write_all(&[0xFF, 0xFE, b'\n']).await.unwrap();
        let mut conn = Connection::new(a, "test");
        assert!(matches!(
            conn.read_command().await.unwrap_err(),
            TetherStreamError::InvalidLine
        ));
    }

    #[tokio::test]
    async fn record_follows_keyword_line() {
        let (a, b) = duplex(1024);
        let mut tx = Connection::new(a, "tx");
        let mut rx = Connection::new(b, "rx");
        tx.write_record("REPLY", &[1, 2, 3]).await.unwrap();
        tx.flush().await.unwrap();

        assert_eq!(rx.read_command().await.unwrap().as_deref(), Some("REPLY"));
        let mut record = [0u8; 3];
        rx.reader().read_exact(&mut record).await.unwrap();
        assert_eq!(record, [1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_fires() {
        let (a, _b) = duplex(64);
        let mut conn = Connection::new(a, "test").with_idle_timeout(Some(Duration::from_secs(5)));
        assert!(matches!(
            conn.read_command().await.unwrap_err(),
            TetherStreamError::IdleTimeout(_)
        ));
    }
}
