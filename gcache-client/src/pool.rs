//! # Async Connection Pool
//!
//! Purpose: Reuse TCP connections to peer nodes to avoid paying a
//! handshake on every cache fetch. An async object pool over
//! `tokio::net::TcpStream`, locked with `tokio::sync::Mutex` since peer
//! fetches run on the async `Group::get` path.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections.
//! 3. **Fail Fast**: Exceeding the pool limit returns an error immediately.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::client::{ClientError, ClientResult};

/// Pool configuration for the peer-fetch client.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Peer address, e.g. "127.0.0.1:7070".
    pub addr: String,
    /// Maximum number of idle connections to keep.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Timeout for establishing a new connection.
    pub connect_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            addr: String::new(),
            max_idle: 8,
            max_total: 64,
            connect_timeout: Some(Duration::from_secs(2)),
        }
    }
}

struct PoolState {
    idle: VecDeque<TcpStream>,
    total: usize,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

/// Connection pool handle. Cheap to clone; clones share the same backing
/// pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    total: 0,
                }),
            }),
        }
    }

    /// Acquires a connection, reusing an idle one or dialing a new one if
    /// the pool has spare capacity.
    pub async fn acquire(&self) -> ClientResult<PooledConnection> {
        if let Some(conn) = self.pop_idle().await {
            return Ok(PooledConnection::new(self.inner.clone(), conn));
        }
        if !self.try_reserve().await {
            return Err(ClientError::PoolExhausted);
        }
        match self.dial().await {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                self.release_slot().await;
                Err(err)
            }
        }
    }

    async fn pop_idle(&self) -> Option<TcpStream> {
        self.inner.state.lock().await.idle.pop_front()
    }

    async fn try_reserve(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.total >= self.inner.config.max_total {
            return false;
        }
        state.total += 1;
        true
    }

    async fn release_slot(&self) {
        let mut state = self.inner.state.lock().await;
        state.total = state.total.saturating_sub(1);
    }

    async fn dial(&self) -> ClientResult<TcpStream> {
        let connect = TcpStream::connect(&self.inner.config.addr);
        let stream = match self.inner.config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| ClientError::Timeout)??,
            None => connect.await?,
        };
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// RAII-ish handle returning its connection to the pool on drop. Since
/// `Drop` cannot await, the return happens via a spawned task that
/// acquires the async lock on its own.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<TcpStream>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: TcpStream) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        self.conn.as_mut().expect("connection exists")
    }

    /// Marks this connection as unfit for reuse (protocol error, reset,
    /// etc). It will be closed rather than returned to the pool on drop.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };
        let pool = self.pool.clone();
        let valid = self.valid;
        tokio::spawn(async move {
            let mut state = pool.state.lock().await;
            if valid && state.idle.len() < pool.config.max_idle {
                state.idle.push_back(conn);
            } else {
                state.total = state.total.saturating_sub(1);
            }
        });
    }
}
