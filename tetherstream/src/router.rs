//! Keyword-to-handler dispatch for one connection.
//!
//! The command table is filled once before any connection is accepted and is
//! shared read-only afterwards, so dispatch needs no locking.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{Result, TetherStreamError};

/// Handler for one command keyword.
///
/// The router has already consumed the keyword line; the handler reads the
/// rest of its command from `conn` and writes any response. Returning an
/// error terminates the connection.
pub trait CommandHandler: Send + Sync {
    fn handle<'a>(&'a self, conn: &'a mut Connection) -> BoxFuture<'a, Result<()>>;
}

/// Mapping from command keyword to handler.
#[derive(Default)]
pub struct CommandTable {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `keyword`. Each keyword may be registered once.
    pub fn register(
        &mut self,
        keyword: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<()> {
        let keyword = keyword.into();
        if self.handlers.contains_key(&keyword) {
            return Err(TetherStreamError::DuplicateCommand(keyword));
        }
        self.handlers.insert(keyword, handler);
        Ok(())
    }

    pub fn get(&self, keyword: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.handlers.contains_key(keyword)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered keywords, sorted.
    pub fn keywords(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// Drives the command loop of a connection against a frozen table.
#[derive(Clone)]
pub struct CommandRouter {
    table: Arc<CommandTable>,
}

impl CommandRouter {
    pub fn new(table: CommandTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Serve commands on `conn` until it closes.
    ///
    /// Commands are handled strictly in order; the next keyword is not read
    /// until the current handler has returned. Returns `Ok(())` on a clean
    /// end-of-stream between commands. Any other outcome is an error and the
    /// connection is dropped without writing anything further to the peer.
    pub async fn serve_connection(&self, mut conn: Connection) -> Result<()> {
        let mut served: u64 = 0;
        loop {
            let Some(keyword) = conn.read_command().await? else {
                debug!(peer = %conn.peer(), served, "peer closed connection");
                return Ok(());
            };

            let Some(handler) = self.table.get(&keyword).cloned() else {
                warn!(peer = %conn.peer(), command = %keyword, "unknown command, closing connection");
                return Err(TetherStreamError::UnknownCommand(keyword));
            };

            debug!(peer = %conn.peer(), command = %keyword, "dispatching command");
            handler.handle(&mut conn).await?;
            served += 1;
        }
    }
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("commands", &self.table.keywords())
            .finish()
    }
}
