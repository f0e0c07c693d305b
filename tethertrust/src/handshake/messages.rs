// Handshake records exchanged during the TetherTrust single round trip.
//
//   Initiator                              Responder
//     |--- HANDSHAKE + HandshakeRequest ------>|
//     |<------------ REPLY + HandshakeReply ---|
//
// Each signature covers the plain concatenation of the record's other fields
// in declaration order, with no separators or length prefixes.

use crate::freshness::{Nonce, Timestamp};

/// Message 1: Initiator -> Responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Initiator's fresh nonce.
    pub nonce_a: Nonce,
    /// Initiator's construction time.
    pub timestamp_a: Timestamp,
    /// Session key wrapped for the responder.
    pub wrapped_session_key: Vec<u8>,
    /// Initiator's signature over `nonce_a || timestamp_a || wrapped_session_key`.
    pub signature: Vec<u8>,
}

impl HandshakeRequest {
    /// The exact bytes the signature covers.
    pub fn signable_bytes(&self) -> Vec<u8> {
        request_signable(&self.nonce_a, &self.timestamp_a, &self.wrapped_session_key)
    }
}

/// Message 2: Responder -> Initiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeReply {
    /// Responder's fresh nonce.
    pub nonce_b: Nonce,
    /// The initiator's nonce, echoed back.
    pub nonce_a_echo: Nonce,
    /// Responder's construction time.
    pub timestamp_b: Timestamp,
    /// Session key wrapped for the initiator.
    pub wrapped_session_key: Vec<u8>,
    /// Responder's signature over
    /// `nonce_b || nonce_a_echo || timestamp_b || wrapped_session_key`.
    pub signature: Vec<u8>,
}

impl HandshakeReply {
    /// The exact bytes the signature covers.
    pub fn signable_bytes(&self) -> Vec<u8> {
        reply_signable(
            &self.nonce_b,
            &self.nonce_a_echo,
            &self.timestamp_b,
            &self.wrapped_session_key,
        )
    }
}

pub(crate) fn request_signable(nonce_a: &Nonce, timestamp_a: &Timestamp, wrapped: &[u8]) -> Vec<u8> {
    let ts = timestamp_a.as_str().as_bytes();
    let mut buf = Vec::with_capacity(nonce_a.as_bytes().len() + ts.len() + wrapped.len());
    buf.extend_from_slice(nonce_a.as_bytes());
    buf.extend_from_slice(ts);
    buf.extend_from_slice(wrapped);
    buf
}

pub(crate) fn reply_signable(
    nonce_b: &Nonce,
    nonce_a: &Nonce,
    timestamp_b: &Timestamp,
    wrapped: &[u8],
) -> Vec<u8> {
    let ts = timestamp_b.as_str().as_bytes();
    let mut buf = Vec::with_capacity(24 + ts.len() + wrapped.len());
    buf.extend_from_slice(nonce_b.as_bytes());
    buf.extend_from_slice(nonce_a.as_bytes());
    buf.extend_from_slice(ts);
    buf.extend_from_slice(wrapped);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_signable_is_plain_concatenation() {
        let req = HandshakeRequest {
            nonce_a: Nonce::from_bytes([0x41; 12]),
            timestamp_a: Timestamp::from_text("T"),
            wrapped_session_key: vec![0xEE, 0xFF],
            signature: vec![0; 64],
        };
        let mut expected = vec![0x41; 12];
        expected.push(b'T');
        expected.extend_from_slice(&[0xEE, 0xFF]);
        assert_eq!(req.signable_bytes(), expected);
    }

    #[test]
    fn reply_signable_field_order() {
        let reply = HandshakeReply {
            nonce_b: Nonce::from_bytes([0x02; 12]),
            nonce_a_echo: Nonce::from_bytes([0x01; 12]),
            timestamp_b: Timestamp::from_text("ts"),
            wrapped_session_key: vec![0x09],
            signature: vec![],
        };
        let bytes = reply.signable_bytes();
        assert_eq!(&bytes[..12], &[0x02; 12]);
        assert_eq!(&bytes[12..24], &[0x01; 12]);
        assert_eq!(&bytes[24..26], b"ts");
        assert_eq!(bytes[26], 0x09);
        assert_eq!(bytes.len(), 27);
    }
}
