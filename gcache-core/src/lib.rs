//! # gcache-core
//!
//! The local cache tiers, the consistent-hash ring, single-flight
//! coalescing, and the [`Group`] read path that ties them together with
//! peer routing and a loader fallback. This crate has no networking code
//! of its own — [`peers::PeerClient`] is the seam `gcache-client` and
//! `gcache-server` implement against.

pub mod byteview;
pub mod cache;
pub mod group;
pub mod hashring;
pub mod peers;
pub mod registry;
pub mod singleflight;
pub mod store;

pub use byteview::ByteView;
pub use cache::{Cache, CacheOptions, CacheStats, StoreKind};
pub use group::{Group, GroupBuilder, Loader, LoaderFn};
pub use hashring::{HashFn, HashRing};
pub use peers::{ClientPicker, PeerClient, PeerPicker, DEFAULT_REPLICA_COUNT};
pub use singleflight::SingleFlight;
pub use store::{CacheValue, Lru, Lru2, Store};
