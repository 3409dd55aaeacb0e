//! # Peer-Fetch TCP Server
//!
//! Accepts peer-fetch connections and dispatches each request frame to
//! the process-wide group registry, one task per connection, speaking
//! the `{group, key}` wire contract from `gcache_common::wire`.

use std::sync::Arc;
use std::time::Instant;

use gcache_common::wire::{self, GetRequest, GetResponse};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::metrics::Metrics;

/// Configuration for the peer-fetch server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. "0.0.0.0:7070".
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: "127.0.0.1:7070".to_string(),
        }
    }
}

/// Runs the accept loop until the listener errors. Each connection is
/// handled on its own task so a slow or stalled peer cannot block others.
pub async fn run(config: ServerConfig, metrics: Arc<Metrics>) -> std::io::Result<()> {
    let listener = TcpListener::bind(&config.addr).await?;
    info!(addr = %config.addr, "peer-fetch server listening");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let metrics = metrics.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, metrics).await {
                warn!(%peer_addr, error = %err, "connection ended with an error");
            }
        });
    }
}

/// Handles one peer connection: read a request frame, dispatch it against
/// the group registry, write the response frame, repeat until the peer
/// closes the connection.
pub async fn handle_connection(mut stream: TcpStream, metrics: Arc<Metrics>) -> std::io::Result<()> {
    loop {
        let request = match wire::read_request(&mut stream).await {
            Ok(request) => request,
            Err(wire::WireError::Io(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(());
            }
            Err(err) => return Err(to_io_error(err)),
        };

        metrics.record_request_start();
        let start = Instant::now();
        let response = dispatch(&request).await;
        if matches!(response, GetResponse::Err(_)) {
            metrics.record_error();
        }
        metrics.record_request_end(start.elapsed());

        let mut frame = Vec::new();
        wire::encode_response(&response, &mut frame);
        wire::write_frame(&mut stream, &frame)
            .await
            .map_err(to_io_error)?;
    }
}

async fn dispatch(request: &GetRequest) -> GetResponse {
    let Some(group) = gcache_core::registry::get(&request.group) else {
        return GetResponse::Err(format!("gcache: unknown group {}", request.group));
    };
    match group.get(&request.key).await {
        Ok(value) => GetResponse::Value(value.to_vec()),
        Err(err) if err.is_not_found() => GetResponse::NotFound,
        Err(err) => GetResponse::Err(err.to_wire_message()),
    }
}

fn to_io_error(err: wire::WireError) -> std::io::Error {
    match err {
        wire::WireError::Io(err) => err,
        wire::WireError::Protocol(msg) => std::io::Error::new(std::io::ErrorKind::InvalidData, msg),
    }
}
