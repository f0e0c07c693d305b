//! TetherStream -- command-multiplexed stream transport for the Tether handshake.
//!
//! A connection carries a sequence of commands, each introduced by a keyword
//! line:
//! - **HANDSHAKE**: one encoded handshake request follows; the server answers
//!   with a `REPLY` line and one encoded reply record
//! - **ECHO**: one payload line follows; the server answers `OK`
//!
//! The server side runs one task per accepted connection, each driving a
//! [`CommandRouter`] over a table built once at startup.

pub mod client;
pub mod connection;
pub mod error;
pub mod framing;
pub mod handlers;
pub mod heartbeat;
pub mod router;
pub mod server;

// Re-export key public types at crate root.
pub use client::Client;
pub use connection::Connection;
pub use error::{Result, TetherStreamError};
pub use handlers::{standard_table, EchoHandler, HandshakeHandler};
pub use heartbeat::HeartbeatGuard;
pub use router::{CommandHandler, CommandRouter, CommandTable};
pub use server::{Server, ServerConfig};
