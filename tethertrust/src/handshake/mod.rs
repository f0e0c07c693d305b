// Handshake module declarations

pub mod codec;
pub mod context;
pub mod messages;
pub mod protocol;
pub mod replay;
pub mod state;
