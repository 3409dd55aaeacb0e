//! # Peer-Fetch Wire Framing
//!
//! Purpose: Encode and decode the peer-fetch request/response pair without
//! external serialization dependencies, keeping allocations under control.
//! Carries the `{group, key}` request and `{value|err}` response shape
//! over a small length-prefixed binary framing.
//!
//! ## Design Principles
//! 1. **Length-Prefixed Framing**: Every variable-length field is a `u32`
//!    big-endian length followed by its bytes; no delimiter scanning.
//! 2. **Binary-Safe**: Groups, keys, and values are treated as raw bytes.
//! 3. **Fail Fast**: Truncated or oversized frames return a protocol error
//!    immediately rather than attempting partial recovery.
//! 4. **Canonical Content Tag**: [`CONTENT_TAG`] identifies this framing on
//!    the wire so interoperating clients can negotiate it explicitly.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Canonical tag identifying this wire encoding, exposed for interop.
pub const CONTENT_TAG: &str = "application/x-gcache-peer-v1";

/// Frame marker for a request.
const REQUEST_TAG: u8 = b'G';

/// Response status: payload is a value.
const STATUS_VALUE: u8 = 0;
/// Response status: key not found.
const STATUS_NOT_FOUND: u8 = 1;
/// Response status: opaque error string follows.
const STATUS_ERROR: u8 = 2;

/// Largest field this framing accepts, guarding against a corrupt or
/// malicious length prefix forcing an unbounded allocation.
const MAX_FRAME_FIELD: u32 = 64 * 1024 * 1024;

/// A peer-fetch request: `{group, key}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub group: String,
    pub key: String,
}

/// A peer-fetch response: a value, a not-found marker, or an opaque error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetResponse {
    Value(Vec<u8>),
    NotFound,
    Err(String),
}

/// Wire-framing errors. Kept distinct from [`crate::Error`] since framing
/// failures are a transport concern, not a cache-semantics one.
#[derive(Debug)]
pub enum WireError {
    Io(std::io::Error),
    Protocol(&'static str),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::Io(err) => write!(f, "io error: {err}"),
            WireError::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        WireError::Io(err)
    }
}

pub type WireResult<T> = Result<T, WireError>;

/// Encodes a request frame into `out`, appending to any existing contents.
pub fn encode_request(request: &GetRequest, out: &mut Vec<u8>) {
    out.push(REQUEST_TAG);
    push_field(out, request.group.as_bytes());
    push_field(out, request.key.as_bytes());
}

/// Reads one request frame from an async reader.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> WireResult<GetRequest> {
    let tag = reader.read_u8().await?;
    if tag != REQUEST_TAG {
        return Err(WireError::Protocol("unexpected request tag"));
    }
    let group = read_string_field(reader).await?;
    let key = read_string_field(reader).await?;
    Ok(GetRequest { group, key })
}

/// Encodes a response frame into `out`, appending to any existing contents.
pub fn encode_response(response: &GetResponse, out: &mut Vec<u8>) {
    match response {
        GetResponse::Value(bytes) => {
            out.push(STATUS_VALUE);
            push_field(out, bytes);
        }
        GetResponse::NotFound => {
            out.push(STATUS_NOT_FOUND);
        }
        GetResponse::Err(message) => {
            out.push(STATUS_ERROR);
            push_field(out, message.as_bytes());
        }
    }
}

/// Reads one response frame from an async reader.
pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> WireResult<GetResponse> {
    let status = reader.read_u8().await?;
    match status {
        STATUS_VALUE => Ok(GetResponse::Value(read_bytes_field(reader).await?)),
        STATUS_NOT_FOUND => Ok(GetResponse::NotFound),
        STATUS_ERROR => {
            let message = read_string_field(reader).await?;
            Ok(GetResponse::Err(message))
        }
        _ => Err(WireError::Protocol("unexpected response status")),
    }
}

/// Writes a frame to an async writer and flushes it. Kept as a thin helper
/// so callers don't need to hand-roll the encode-then-write-then-flush
/// sequence at every call site.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> WireResult<()> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

fn push_field(out: &mut Vec<u8>, field: &[u8]) {
    out.extend_from_slice(&(field.len() as u32).to_be_bytes());
    out.extend_from_slice(field);
}

async fn read_bytes_field<R: AsyncRead + Unpin>(reader: &mut R) -> WireResult<Vec<u8>> {
    let len = reader.read_u32().await?;
    if len > MAX_FRAME_FIELD {
        return Err(WireError::Protocol("field exceeds maximum frame size"));
    }
    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

async fn read_string_field<R: AsyncRead + Unpin>(reader: &mut R) -> WireResult<String> {
    let bytes = read_bytes_field(reader).await?;
    String::from_utf8(bytes).map_err(|_| WireError::Protocol("field is not valid utf-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn request_round_trips() {
        let request = GetRequest {
            group: "scores".to_string(),
            key: "Tom".to_string(),
        };
        let mut buf = Vec::new();
        encode_request(&request, &mut buf);

        let mut cursor = Cursor::new(buf);
        let decoded = read_request(&mut cursor).await.unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn value_response_round_trips() {
        let response = GetResponse::Value(b"630".to_vec());
        let mut buf = Vec::new();
        encode_response(&response, &mut buf);

        let mut cursor = Cursor::new(buf);
        let decoded = read_response(&mut cursor).await.unwrap();
        assert_eq!(decoded, response);
    }

    #[tokio::test]
    async fn not_found_response_round_trips() {
        let mut buf = Vec::new();
        encode_response(&GetResponse::NotFound, &mut buf);
        assert_eq!(buf, vec![STATUS_NOT_FOUND]);

        let mut cursor = Cursor::new(buf);
        let decoded = read_response(&mut cursor).await.unwrap();
        assert_eq!(decoded, GetResponse::NotFound);
    }

    #[tokio::test]
    async fn error_response_round_trips() {
        let response = GetResponse::Err(crate::NOT_FOUND_MSG.to_string());
        let mut buf = Vec::new();
        encode_response(&response, &mut buf);

        let mut cursor = Cursor::new(buf);
        let decoded = read_response(&mut cursor).await.unwrap();
        assert_eq!(decoded, response);
    }

    #[tokio::test]
    async fn rejects_bad_request_tag() {
        let mut cursor = Cursor::new(vec![b'X', 0, 0, 0, 0]);
        let err = read_request(&mut cursor).await.unwrap_err();
        assert!(matches!(err, WireError::Protocol(_)));
    }

    #[tokio::test]
    async fn rejects_oversized_field() {
        let mut buf = Vec::new();
        buf.push(STATUS_VALUE);
        buf.extend_from_slice(&(MAX_FRAME_FIELD + 1).to_be_bytes());
        let mut cursor = Cursor::new(buf);
        let err = read_response(&mut cursor).await.unwrap_err();
        assert!(matches!(err, WireError::Protocol(_)));
    }
}
