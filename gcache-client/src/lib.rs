//! # gcache-client
//!
//! Pooled async peer-fetch client. [`RpcClient`] implements
//! [`gcache_core::PeerClient`] over the binary wire framing in
//! `gcache_common::wire`, the network-facing counterpart to
//! `gcache-server`.

pub mod client;
pub mod pool;

pub use client::{ClientConfig, ClientError, ClientResult, RpcClient};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
