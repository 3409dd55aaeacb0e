//! # gcache-discovery
//!
//! Peer-membership discovery: the [`feed::MembershipFeed`] trait plus a
//! fixed-list implementation and, behind the `etcd` feature, a live
//! etcd-backed one. Feeds a [`gcache_core::peers::ClientPicker`]'s
//! `set_peers` via `gcache-node`'s wiring.

pub mod feed;

#[cfg(feature = "etcd")]
pub mod etcd_feed;

pub use feed::{MembershipFeed, MembershipStream, StaticFeed};

#[cfg(feature = "etcd")]
pub use etcd_feed::EtcdFeed;
