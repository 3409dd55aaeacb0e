//! # Peer-Fetch Client
//!
//! Purpose: Implement [`gcache_core::PeerClient`] over the pooled TCP
//! connections in [`crate::pool`], speaking the wire framing defined in
//! `gcache_common::wire`: acquire a connection, run the request, return
//! it to the pool.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use gcache_common::wire::{self, GetRequest, GetResponse};
use gcache_core::PeerClient;
use tracing::warn;

use crate::pool::{ConnectionPool, PoolConfig};

/// Result type for the peer-fetch client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the peer-fetch client.
#[derive(Debug)]
pub enum ClientError {
    Io(std::io::Error),
    Wire(wire::WireError),
    Timeout,
    PoolExhausted,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(err) => write!(f, "io error: {err}"),
            ClientError::Wire(err) => write!(f, "wire error: {err}"),
            ClientError::Timeout => write!(f, "connect timed out"),
            ClientError::PoolExhausted => write!(f, "connection pool exhausted"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err)
    }
}

impl From<wire::WireError> for ClientError {
    fn from(err: wire::WireError) -> Self {
        ClientError::Wire(err)
    }
}

/// Configuration for a peer-fetch client and its connection pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Peer address, e.g. "127.0.0.1:7070".
    pub addr: String,
    pub max_idle: usize,
    pub max_total: usize,
    pub connect_timeout: Option<Duration>,
    /// Upper bound on one request's round trip.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:7070".to_string(),
            max_idle: 8,
            max_total: 64,
            connect_timeout: Some(Duration::from_secs(2)),
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// A pooled async client for one peer, implementing [`PeerClient`].
pub struct RpcClient {
    pool: ConnectionPool,
    request_timeout: Duration,
}

impl RpcClient {
    pub fn connect(addr: impl Into<String>) -> Self {
        let mut config = ClientConfig::default();
        config.addr = addr.into();
        Self::with_config(config)
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let request_timeout = config.request_timeout;
        let pool = ConnectionPool::new(PoolConfig {
            addr: config.addr,
            max_idle: config.max_idle,
            max_total: config.max_total,
            connect_timeout: config.connect_timeout,
        });
        RpcClient {
            pool,
            request_timeout,
        }
    }

    async fn fetch(&self, group: &str, key: &str) -> ClientResult<GetResponse> {
        let mut conn = self.pool.acquire().await?;
        let request = GetRequest {
            group: group.to_string(),
            key: key.to_string(),
        };
        let mut frame = Vec::new();
        wire::encode_request(&request, &mut frame);

        let result = tokio::time::timeout(self.request_timeout, async {
            wire::write_frame(conn.stream_mut(), &frame).await?;
            wire::read_response(conn.stream_mut()).await
        })
        .await;

        match result {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                conn.invalidate();
                Err(err.into())
            }
            Err(_) => {
                conn.invalidate();
                Err(ClientError::Timeout)
            }
        }
    }
}

#[async_trait]
impl PeerClient for RpcClient {
    async fn get(&self, group: &str, key: &str) -> gcache_common::Result<Vec<u8>> {
        match self.fetch(group, key).await {
            Ok(GetResponse::Value(bytes)) => Ok(bytes),
            Ok(GetResponse::NotFound) => Err(gcache_common::Error::NotFound),
            Ok(GetResponse::Err(message)) => Err(gcache_common::Error::from_wire_message(&message)),
            Err(err) => {
                warn!(group, key, error = %err, "peer-fetch transport error");
                Err(gcache_common::Error::PeerTransport(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn spawn_single_shot_server(response: GetResponse) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = wire::read_request(&mut socket).await;
            let mut buf = Vec::new();
            wire::encode_response(&response, &mut buf);
            let _ = socket.write_all(&buf).await;
            let _ = socket.flush().await;
            let mut discard = [0u8; 1];
            let _ = socket.read(&mut discard).await;
        });
        addr
    }

    #[tokio::test]
    async fn value_response_is_returned() {
        let addr = spawn_single_shot_server(GetResponse::Value(b"42".to_vec())).await;
        let client = RpcClient::connect(addr);
        let value = client.get("scores", "Tom").await.unwrap();
        assert_eq!(value, b"42");
    }

    #[tokio::test]
    async fn not_found_response_becomes_not_found_error() {
        let addr = spawn_single_shot_server(GetResponse::NotFound).await;
        let client = RpcClient::connect(addr);
        let err = client.get("scores", "nobody").await.unwrap_err();
        assert_eq!(err, gcache_common::Error::NotFound);
    }

    #[tokio::test]
    async fn error_response_round_trips_the_sentinel() {
        let addr = spawn_single_shot_server(GetResponse::Err(gcache_common::NOT_FOUND_MSG.to_string())).await;
        let client = RpcClient::connect(addr);
        let err = client.get("scores", "nobody").await.unwrap_err();
        assert_eq!(err, gcache_common::Error::NotFound);
    }

    #[tokio::test]
    async fn opaque_error_response_becomes_peer_transport() {
        let addr = spawn_single_shot_server(GetResponse::Err("boom".to_string())).await;
        let client = RpcClient::connect(addr);
        let err = client.get("scores", "nobody").await.unwrap_err();
        assert_eq!(err, gcache_common::Error::PeerTransport("boom".to_string()));
    }
}
