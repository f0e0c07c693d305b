// Handshake record codec.
//
// Wire format (big-endian):
// [tag:1B][version:1B]{[len:2B][bytes:lenB]}*
//
// Request fields: nonce_a(12), timestamp_a(utf8), wrapped_session_key, signature
// Reply fields:   nonce_b(12), nonce_a_echo(12), timestamp_b(utf8), wrapped_session_key, signature
//
// Records carry no overall length: a decoder consumes exactly one record and
// stops, so records can be read straight off a command stream.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, TetherTrustError};
use crate::freshness::{Nonce, Timestamp};
use crate::handshake::messages::{HandshakeReply, HandshakeRequest};

/// Current record format version.
pub const RECORD_VERSION: u8 = 0x01;

/// Upper bound on a single field, enforced before allocation.
pub const MAX_FIELD_LEN: usize = 1024;

/// Record type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    Request = 0x01,
    Reply = 0x02,
}

impl RecordType {
    fn field_count(self) -> usize {
        match self {
            RecordType::Request => 4,
            RecordType::Reply => 5,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RecordType::Request => "request",
            RecordType::Reply => "reply",
        }
    }
}

impl TryFrom<u8> for RecordType {
    type Error = TetherTrustError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(RecordType::Request),
            0x02 => Ok(RecordType::Reply),
            other => Err(decode_err(format!("unknown record tag: 0x{other:02x}"))),
        }
    }
}

// ── Encoding ─────────────────────────────────────────────────────────────

/// Serialize a [`HandshakeRequest`].
///
/// Fails with [`TetherTrustError::Encode`] if any field exceeds
/// [`MAX_FIELD_LEN`]; nothing the decoder would reject is ever produced.
pub fn encode_request(req: &HandshakeRequest) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(160);
    buf.put_u8(RecordType::Request as u8);
    buf.put_u8(RECORD_VERSION);
    put_field(&mut buf, req.nonce_a.as_bytes())?;
    put_field(&mut buf, req.timestamp_a.as_str().as_bytes())?;
    put_field(&mut buf, &req.wrapped_session_key)?;
    put_field(&mut buf, &req.signature)?;
    Ok(buf.freeze())
}

/// Serialize a [`HandshakeReply`]. Same field limit as [`encode_request`].
pub fn encode_reply(reply: &HandshakeReply) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(176);
    buf.put_u8(RecordType::Reply as u8);
    buf.put_u8(RECORD_VERSION);
    put_field(&mut buf, reply.nonce_b.as_bytes())?;
    put_field(&mut buf, reply.nonce_a_echo.as_bytes())?;
    put_field(&mut buf, reply.timestamp_b.as_str().as_bytes())?;
    put_field(&mut buf, &reply.wrapped_session_key)?;
    put_field(&mut buf, &reply.signature)?;
    Ok(buf.freeze())
}

fn put_field(buf: &mut BytesMut, field: &[u8]) -> Result<()> {
    if field.len() > MAX_FIELD_LEN {
        return Err(TetherTrustError::Encode(format!(
            "field length {} exceeds maximum {MAX_FIELD_LEN}",
            field.len()
        )));
    }
    buf.put_u16(field.len() as u16);
    buf.put_slice(field);
    Ok(())
}

// ── Decoding from a buffer ───────────────────────────────────────────────

/// Decode one [`HandshakeRequest`] from `buf`, leaving the cursor just past it.
pub fn decode_request(buf: &mut impl Buf) -> Result<HandshakeRequest> {
    request_from_fields(take_fields(buf, RecordType::Request)?)
}

/// Decode one [`HandshakeReply`] from `buf`, leaving the cursor just past it.
pub fn decode_reply(buf: &mut impl Buf) -> Result<HandshakeReply> {
    reply_from_fields(take_fields(buf, RecordType::Reply)?)
}

fn take_fields(buf: &mut impl Buf, expected: RecordType) -> Result<Vec<Vec<u8>>> {
    if buf.remaining() < 2 {
        return Err(truncated());
    }
    check_header(buf.get_u8(), buf.get_u8(), expected)?;

    let mut fields = Vec::with_capacity(expected.field_count());
    for _ in 0..expected.field_count() {
        if buf.remaining() < 2 {
            return Err(truncated());
        }
        let len = check_len(buf.get_u16())?;
        if buf.remaining() < len {
            return Err(truncated());
        }
        let mut field = vec![0u8; len];
        buf.copy_to_slice(&mut field);
        fields.push(field);
    }
    Ok(fields)
}

// ── Decoding from a stream ───────────────────────────────────────────────

/// Read exactly one [`HandshakeRequest`] from `reader`.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<HandshakeRequest> {
    request_from_fields(read_fields(reader, RecordType::Request).await?)
}

/// Read exactly one [`HandshakeReply`] from `reader`.
pub async fn read_reply<R: AsyncRead + Unpin>(reader: &mut R) -> Result<HandshakeReply> {
    reply_from_fields(read_fields(reader, RecordType::Reply).await?)
}

async fn read_fields<R: AsyncRead + Unpin>(
    reader: &mut R,
    expected: RecordType,
) -> Result<Vec<Vec<u8>>> {
    let tag = reader.read_u8().await.map_err(stream_err)?;
    let version = reader.read_u8().await.map_err(stream_err)?;
    check_header(tag, version, expected)?;

    let mut fields = Vec::with_capacity(expected.field_count());
    for _ in 0..expected.field_count() {
        let len = check_len(reader.read_u16().await.map_err(stream_err)?)?;
        let mut field = vec![0u8; len];
        reader.read_exact(&mut field).await.map_err(stream_err)?;
        fields.push(field);
    }
    Ok(fields)
}

// ── Shared field validation ──────────────────────────────────────────────

fn check_header(tag: u8, version: u8, expected: RecordType) -> Result<()> {
    let kind = RecordType::try_from(tag)?;
    if kind != expected {
        return Err(decode_err(format!(
            "expected {} record, found {}",
            expected.label(),
            kind.label()
        )));
    }
    if version != RECORD_VERSION {
        return Err(decode_err(format!("unsupported record version: {version}")));
    }
    Ok(())
}

fn check_len(len: u16) -> Result<usize> {
    let len = len as usize;
    if len > MAX_FIELD_LEN {
        return Err(decode_err(format!(
            "field length {len} exceeds maximum {MAX_FIELD_LEN}"
        )));
    }
    Ok(len)
}

fn request_from_fields(fields: Vec<Vec<u8>>) -> Result<HandshakeRequest> {
    let mut it = fields.into_iter();
    let mut next = || it.next().ok_or_else(truncated);
    Ok(HandshakeRequest {
        nonce_a: nonce(&next()?)?,
        timestamp_a: timestamp(next()?)?,
        wrapped_session_key: next()?,
        signature: next()?,
    })
}

fn reply_from_fields(fields: Vec<Vec<u8>>) -> Result<HandshakeReply> {
    let mut it = fields.into_iter();
    let mut next = || it.next().ok_or_else(truncated);
    Ok(HandshakeReply {
        nonce_b: nonce(&next()?)?,
        nonce_a_echo: nonce(&next()?)?,
        timestamp_b: timestamp(next()?)?,
        wrapped_session_key: next()?,
        signature: next()?,
    })
}

fn nonce(field: &[u8]) -> Result<Nonce> {
    Nonce::from_slice(field)
        .ok_or_else(|| decode_err(format!("nonce must be 12 bytes, got {}", field.len())))
}

fn timestamp(field: Vec<u8>) -> Result<Timestamp> {
    String::from_utf8(field)
        .map(Timestamp::from_text)
        .map_err(|e| decode_err(format!("invalid utf8 timestamp: {e}")))
}

fn stream_err(err: std::io::Error) -> TetherTrustError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        truncated()
    } else {
        TetherTrustError::Io(err)
    }
}

fn truncated() -> TetherTrustError {
    decode_err("unexpected end of data".into())
}

fn decode_err(msg: String) -> TetherTrustError {
    TetherTrustError::Decode(msg)
}
