//! # gcache-node
//!
//! A thin binary wiring a [`gcache_core::Group`], a
//! [`gcache_core::ClientPicker`], the peer-fetch server, and a membership
//! feed (static or etcd-backed) into one runnable process, with a small
//! in-memory demo `Loader` for smoke-testing a node end to end.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use gcache_client::RpcClient;
use gcache_core::{ClientPicker, GroupBuilder, Loader, PeerClient, PeerPicker};
use gcache_discovery::{MembershipFeed, StaticFeed};
use gcache_server::{Metrics, ServerConfig};
use tokio_stream::StreamExt;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Runs one node of a distributed in-memory cache")]
struct Cli {
    /// Address this node listens on and advertises to peers.
    #[arg(long, default_value = "127.0.0.1:9000")]
    addr: String,

    /// Logical service name, used for discovery.
    #[arg(long, default_value = "gcache")]
    svc: String,

    /// Comma-separated peer addresses. Ignored when `--etcd` is set.
    #[arg(long, default_value = "")]
    peers: String,

    /// Comma-separated etcd endpoints; when set, membership is watched
    /// live instead of taken from `--peers`. Requires the `etcd` feature.
    #[arg(long, default_value = "")]
    etcd: String,

    /// Cache size budget in megabytes.
    #[arg(long, default_value_t = 64)]
    cache_mb: u64,

    /// Default entry expiration in milliseconds; 0 means no expiration.
    #[arg(long, default_value_t = 0)]
    expire_ms: u64,

    /// Optional key to fetch once at startup, for smoke-testing a node.
    #[arg(long, default_value = "")]
    get: String,
}

struct DemoLoader {
    data: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl Loader for DemoLoader {
    async fn load(&self, key: &str) -> gcache_common::Result<Vec<u8>> {
        match self.data.get(key) {
            Some(value) => {
                info!(key, "loaded from demo dataset");
                Ok(value.as_bytes().to_vec())
            }
            None => Err(gcache_common::Error::NotFound),
        }
    }
}

fn make_rpc_client(addr: &str) -> Arc<dyn PeerClient> {
    Arc::new(RpcClient::connect(addr))
}

/// Builds the membership feed for this run: an etcd watch when `--etcd`
/// is set, else a fixed snapshot of `--peers`.
async fn build_feed(cli: &Cli) -> anyhow::Result<Box<dyn MembershipFeed>> {
    if cli.etcd.is_empty() {
        let peers: Vec<String> = cli
            .peers
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect();
        return Ok(Box::new(StaticFeed::new(peers)));
    }

    #[cfg(feature = "etcd")]
    {
        let endpoints: Vec<String> = cli.etcd.split(',').map(str::to_string).collect();
        let feed = gcache_discovery::EtcdFeed::connect(&endpoints)
            .await
            .context("connecting to etcd")?;
        Ok(Box::new(feed))
    }
    #[cfg(not(feature = "etcd"))]
    {
        anyhow::bail!(
            "--etcd was given ({}) but this binary was built without the `etcd` feature",
            cli.etcd
        );
    }
}

/// Drives `feed`, installing each membership snapshot onto `picker`.
fn spawn_membership_watch(feed: Box<dyn MembershipFeed>, svc: String, picker: Arc<ClientPicker>) {
    let mut stream = feed.watch(&svc);
    tokio::spawn(async move {
        while let Some(addrs) = stream.next().await {
            picker.set_peers(&addrs, make_rpc_client);
            info!(svc = %svc, ?addrs, "peer list updated");
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let loader = Arc::new(DemoLoader {
        data: HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")]),
    });

    let mut builder = GroupBuilder::new("scores", cli.cache_mb << 20);
    if cli.expire_ms > 0 {
        builder = builder.with_expiration(Duration::from_millis(cli.expire_ms));
    }
    let group = builder.build(loader).context("building group")?;

    let picker = Arc::new(ClientPicker::new(cli.addr.clone()));
    group.register_peers(picker.clone() as Arc<dyn PeerPicker>);

    let feed = build_feed(&cli).await?;
    spawn_membership_watch(feed, cli.svc.clone(), picker.clone());

    let metrics = Arc::new(Metrics::new());
    let server_config = ServerConfig { addr: cli.addr.clone() };
    tokio::spawn(async move {
        if let Err(err) = gcache_server::run(server_config, metrics).await {
            tracing::error!(error = %err, "peer-fetch server exited");
        }
    });
    info!(addr = %cli.addr, svc = %cli.svc, "node started");

    if !cli.get.is_empty() {
        match group.get(&cli.get).await {
            Ok(value) => info!(key = %cli.get, value = %value.to_string_lossy(), "get succeeded"),
            Err(err) => info!(key = %cli.get, error = %err, "get failed"),
        }
    }

    std::future::pending::<()>().await;
    Ok(())
}
