//! Command keywords and line limits shared by the server and client.

/// Structured-record command: one encoded handshake request follows.
pub const HANDSHAKE: &str = "HANDSHAKE";

/// Keyword line preceding the server's encoded handshake reply.
pub const REPLY: &str = "REPLY";

/// Plain-text command: one payload line follows.
pub const ECHO: &str = "ECHO";

/// Fixed acknowledgement written after an echo payload.
pub const ECHO_ACK: &str = "OK";

/// Maximum length of a command line, terminator included.
pub const MAX_COMMAND_LINE: usize = 256;

/// Maximum length of an echo payload line, terminator included.
pub const MAX_PAYLOAD_LINE: usize = 64 * 1024;
