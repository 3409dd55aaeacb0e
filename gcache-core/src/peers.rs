//! # Peer Picker
//!
//! Composes a [`crate::hashring::HashRing`] with a pool of peer client
//! handles. `pick` returning `None` when the ring selects this node
//! itself is the hook [`crate::group::Group`] uses to fall back to its
//! own loader.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::hashring::{HashFn, HashRing};

/// Default number of virtual nodes contributed per peer, matching the
/// original's `NewClientPicker` default.
pub const DEFAULT_REPLICA_COUNT: usize = 50;

/// A handle capable of fetching a key from one remote peer.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn get(&self, group: &str, key: &str) -> gcache_common::Result<Vec<u8>>;
}

/// Routes a key to the peer responsible for it.
pub trait PeerPicker: Send + Sync {
    /// Returns the remote peer for `key`, or `None` if this node owns the
    /// key itself.
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerClient>>;
}

/// Default [`PeerPicker`]: a consistent-hash ring plus a map from peer
/// address to a live client handle.
pub struct ClientPicker {
    self_addr: String,
    replica_count: usize,
    hash_fn: Option<HashFn>,
    ring: RwLock<HashRing>,
    clients: RwLock<HashMap<String, Arc<dyn PeerClient>>>,
}

impl ClientPicker {
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_replica_count(self_addr, DEFAULT_REPLICA_COUNT)
    }

    pub fn with_replica_count(self_addr: impl Into<String>, replica_count: usize) -> Self {
        ClientPicker {
            self_addr: self_addr.into(),
            replica_count,
            hash_fn: None,
            ring: RwLock::new(HashRing::new(replica_count, None)),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Overrides the ring's hash function, mainly for deterministic tests.
    pub fn with_hash_fn(mut self, hash_fn: HashFn) -> Self {
        self.hash_fn = Some(hash_fn);
        self.ring = RwLock::new(HashRing::new(self.replica_count, Some(hash_fn)));
        self
    }

    /// Replaces the ring membership and client table from a fresh address
    /// list. The ring is built from `addrs` unfiltered, including
    /// `self_addr` if present — every node must rebuild the same ring from
    /// the same membership list, or independently-built rings across the
    /// fleet disagree on key ownership. Self-exclusion happens only in
    /// [`ClientPicker::pick`]'s owner comparison. `make_client` builds a
    /// handle for each non-self address not already present; existing
    /// handles for addresses that remain are reused so in-flight requests
    /// on them are not disrupted.
    pub fn set_peers<F>(&self, addrs: &[String], make_client: F)
    where
        F: Fn(&str) -> Arc<dyn PeerClient>,
    {
        {
            let mut ring = self.ring.write();
            *ring = HashRing::new(self.replica_count, self.hash_fn);
            ring.add(addrs.iter());
        }
        let mut clients = self.clients.write();
        clients.retain(|addr, _| addrs.contains(addr));
        for addr in addrs {
            if addr == &self.self_addr {
                continue;
            }
            clients
                .entry(addr.clone())
                .or_insert_with(|| make_client(addr));
        }
    }

    /// Drops every peer client handle, releasing their connections.
    pub fn close(&self) {
        self.clients.write().clear();
    }

    pub fn peer_count(&self) -> usize {
        self.clients.read().len()
    }
}

impl PeerPicker for ClientPicker {
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerClient>> {
        let owner = self.ring.read().get(key);
        if owner.is_empty() || owner == self.self_addr {
            return None;
        }
        self.clients.read().get(&owner).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubClient;

    #[async_trait]
    impl PeerClient for StubClient {
        async fn get(&self, _group: &str, _key: &str) -> gcache_common::Result<Vec<u8>> {
            Ok(b"stub".to_vec())
        }
    }

    fn stub_factory(_addr: &str) -> Arc<dyn PeerClient> {
        Arc::new(StubClient)
    }

    #[test]
    fn picking_self_returns_none() {
        // Every virtual node hashes to 0 except peer:1's, so any ordinary
        // lookup key (which never equals a virtual-node input) resolves to
        // self's virtual node. The ring still carries self per §4.6 ("build
        // a fresh ring from the input list"); `pick` is what filters it out.
        fn self_wins(data: &[u8]) -> u32 {
            if data == b"0peer:1" {
                100
            } else {
                0
            }
        }
        let picker = ClientPicker::with_replica_count("self:1", 1).with_hash_fn(self_wins);
        picker.set_peers(&["self:1".to_string(), "peer:1".to_string()], stub_factory);
        assert!(picker.pick("any-key").is_none());
    }

    #[test]
    fn picking_a_remote_owner_returns_a_client() {
        // Self's virtual node is pinned to the top of the ring; both peers
        // collide at 0, so every ordinary key deterministically resolves to
        // a remote owner.
        fn remote_wins(data: &[u8]) -> u32 {
            if data == b"0self:1" {
                u32::MAX
            } else {
                0
            }
        }
        let picker = ClientPicker::with_replica_count("self:1", 1).with_hash_fn(remote_wins);
        picker.set_peers(
            &["self:1".to_string(), "peer:1".to_string(), "peer:2".to_string()],
            stub_factory,
        );
        assert!(picker.pick("k").is_some());
    }

    #[test]
    fn set_peers_with_only_self_yields_no_clients() {
        let picker = ClientPicker::new("self:1");
        picker.set_peers(&["self:1".to_string()], stub_factory);
        assert_eq!(picker.peer_count(), 0);
        assert!(picker.pick("k").is_none());
    }

    #[test]
    fn close_drops_all_clients() {
        let picker = ClientPicker::new("self:1");
        picker.set_peers(&["self:1".to_string(), "peer:1".to_string()], stub_factory);
        assert_eq!(picker.peer_count(), 1);
        picker.close();
        assert_eq!(picker.peer_count(), 0);
    }

    #[test]
    fn reusing_an_address_keeps_the_same_handle() {
        let picker = ClientPicker::new("self:1");
        let built = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let built_cb = built.clone();
        let factory = move |_addr: &str| -> Arc<dyn PeerClient> {
            built_cb.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Arc::new(StubClient)
        };
        picker.set_peers(&["self:1".to_string(), "peer:1".to_string()], factory.clone());
        picker.set_peers(&["self:1".to_string(), "peer:1".to_string()], factory);
        assert_eq!(built.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
