//! # Membership Feed
//!
//! Purpose: Abstract over however a fleet's address list is discovered,
//! so `gcache-node` can swap a fixed list for a live etcd watch without
//! touching the peer-picker wiring. Emits full snapshots rather than
//! deltas: every membership change triggers a fresh complete listing,
//! not an incremental diff.

use std::pin::Pin;

use futures_core::Stream;

/// A stream of full peer-address-list snapshots.
pub type MembershipStream = Pin<Box<dyn Stream<Item = Vec<String>> + Send>>;

/// Discovers the addresses backing a named service.
pub trait MembershipFeed: Send + Sync {
    /// Starts watching `service`, yielding a full snapshot immediately and
    /// again on every subsequent membership change.
    fn watch(&self, service: &str) -> MembershipStream;
}

/// A feed that emits one fixed snapshot, for tests and single-process
/// demos where the fleet never changes.
pub struct StaticFeed {
    addrs: Vec<String>,
}

impl StaticFeed {
    pub fn new(addrs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        StaticFeed {
            addrs: addrs.into_iter().map(Into::into).collect(),
        }
    }
}

impl MembershipFeed for StaticFeed {
    fn watch(&self, _service: &str) -> MembershipStream {
        Box::pin(tokio_stream::once(self.addrs.clone()))
    }
}
