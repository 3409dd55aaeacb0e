//! # Group
//!
//! A named cache namespace: local cache, then the peer picker, then the
//! caller-supplied loader, with single-flight coalescing around the whole
//! fallback chain. Construction is fallible rather than panicking, per
//! the no-panics-in-library-code convention.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use gcache_common::{Error, Result};

use crate::byteview::ByteView;
use crate::cache::{Cache, CacheOptions, CacheStats, StoreKind};
use crate::peers::PeerPicker;
use crate::singleflight::SingleFlight;

/// Loads a value for a key that is missing from every cache tier. The
/// original's `Getter`/`GetterFunc` pair collapses into one async trait.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<u8>>;
}

/// Adapts an async closure to [`Loader`], the `GetterFunc` equivalent.
pub struct LoaderFn<F>(pub F);

#[async_trait]
impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<u8>>> + Send,
{
    async fn load(&self, key: &str) -> Result<Vec<u8>> {
        (self.0)(key.to_string()).await
    }
}

/// Builds a [`Group`] with functional-options-style configuration.
pub struct GroupBuilder {
    name: String,
    max_bytes: u64,
    store_kind: StoreKind,
    default_ttl: Option<Duration>,
    peer_picker: Option<Arc<dyn PeerPicker>>,
}

impl GroupBuilder {
    pub fn new(name: impl Into<String>, max_bytes: u64) -> Self {
        GroupBuilder {
            name: name.into(),
            max_bytes,
            store_kind: StoreKind::Lru,
            default_ttl: None,
            peer_picker: None,
        }
    }

    pub fn with_store_kind(mut self, store_kind: StoreKind) -> Self {
        self.store_kind = store_kind;
        self
    }

    pub fn with_expiration(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn with_peers(mut self, picker: Arc<dyn PeerPicker>) -> Self {
        self.peer_picker = Some(picker);
        self
    }

    /// Builds the group and installs it in the process-wide registry under
    /// its name, matching `original_source/group.go`'s `NewGroup` (which
    /// inserts into `group_map` unconditionally before returning) and
    /// spec.md §4.7's invariant "the registry contains the group after
    /// construction returns". Fails only if `name` is empty — every other
    /// field has a workable default, and the loader is a required
    /// constructor argument, so there is nothing else to validate.
    pub fn build(self, loader: Arc<dyn Loader>) -> Result<Arc<Group>> {
        if self.name.is_empty() {
            return Err(Error::EmptyKey);
        }
        let group = Arc::new(Group {
            name: self.name,
            loader,
            cache: Cache::new(CacheOptions {
                store_kind: self.store_kind,
                max_bytes: self.max_bytes,
            }),
            load_group: SingleFlight::new(),
            default_ttl: self.default_ttl,
            peer_picker: parking_lot::RwLock::new(self.peer_picker),
        });
        crate::registry::register(group.clone());
        Ok(group)
    }
}

/// A named cache namespace orchestrating the local cache, peer routing,
/// and the loader fallback.
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    cache: Cache,
    load_group: SingleFlight<ByteView, Error>,
    default_ttl: Option<Duration>,
    peer_picker: parking_lot::RwLock<Option<Arc<dyn PeerPicker>>>,
}

impl Group {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs or replaces the peer picker, the Rust analogue of the
    /// original's `RegisterPeers`.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        *self.peer_picker.write() = Some(picker);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Retrieves `key`: local cache, then peer routing, then the loader,
    /// coalescing concurrent callers for the same key into one fallback
    /// execution.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if let Some(value) = self.cache.get(key) {
            trace!(group = %self.name, key, "local cache hit");
            return Ok(value);
        }
        self.load(key).await
    }

    /// Populates the cache directly, bypassing the loader and single-flight
    /// path entirely.
    pub fn set(&self, key: impl Into<String>, value: Vec<u8>) {
        self.cache.set(key, ByteView::from_vec(value), self.default_ttl);
    }

    pub fn remove(&self, key: &str) {
        self.cache.remove(key);
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        let (result, was_shared) = self
            .load_group
            .do_call(key, || self.fill(key))
            .await;
        if was_shared {
            debug!(group = %self.name, key, "coalesced concurrent load");
        }
        result
    }

    fn fill<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<ByteView>> + Send + 'a>> {
        Box::pin(async move {
            let picker = self.peer_picker.read().clone();
            if let Some(picker) = picker {
                if let Some(peer) = picker.pick(key) {
                    match peer.get(&self.name, key).await {
                        // Peer-sourced values are returned but not cached here:
                        // the owning peer already caches them, and mirroring
                        // would double memory use and undercut the ring. Any
                        // peer error, including `not-found`, falls back to the
                        // local loader rather than propagating.
                        Ok(bytes) => return Ok(ByteView::from_vec(bytes)),
                        Err(err) => {
                            warn!(
                                group = %self.name,
                                key,
                                kind = gcache_common::error_kind(&err),
                                error = %err,
                                "peer fetch failed, falling back locally"
                            );
                        }
                    }
                }
            }
            self.load_locally(key).await
        })
    }

    async fn load_locally(&self, key: &str) -> Result<ByteView> {
        let bytes = self.loader.load(key).await?;
        let value = ByteView::from_vec(bytes);
        self.cache.set(key, value.clone(), self.default_ttl);
        Ok(value)
    }
}
