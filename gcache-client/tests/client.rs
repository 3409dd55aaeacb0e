use std::sync::Arc;

use async_trait::async_trait;
use gcache_client::RpcClient;
use gcache_core::{GroupBuilder, Loader, PeerClient};
use gcache_server::{Metrics, ServerConfig};
use tokio::net::TcpListener;

struct CountingLoader;

#[async_trait]
impl Loader for CountingLoader {
    async fn load(&self, key: &str) -> gcache_common::Result<Vec<u8>> {
        if key == "missing" {
            return Err(gcache_common::Error::NotFound);
        }
        Ok(format!("remote-{key}").into_bytes())
    }
}

async fn spawn_server(group_name: &str) -> String {
    GroupBuilder::new(group_name, 1 << 16)
        .build(Arc::new(CountingLoader))
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let metrics = Arc::new(Metrics::new());
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let metrics = metrics.clone();
            tokio::spawn(async move {
                let _ = gcache_server::handle_connection(stream, metrics).await;
            });
        }
    });
    addr
}

#[tokio::test]
async fn client_fetches_a_value_from_a_real_server() {
    let addr = spawn_server("client-it-known").await;
    let client = RpcClient::connect(addr);
    let value = client.get("client-it-known", "Tom").await.unwrap();
    assert_eq!(value, b"remote-Tom");
}

#[tokio::test]
async fn client_surfaces_not_found_from_a_real_server() {
    let addr = spawn_server("client-it-missing").await;
    let client = RpcClient::connect(addr);
    let err = client.get("client-it-missing", "missing").await.unwrap_err();
    assert_eq!(err, gcache_common::Error::NotFound);
}

#[tokio::test]
async fn client_reuses_connections_across_several_requests() {
    let addr = spawn_server("client-it-repeat").await;
    let client = RpcClient::connect(addr);
    for i in 0..5 {
        let value = client
            .get("client-it-repeat", &format!("k{i}"))
            .await
            .unwrap();
        assert_eq!(value, format!("remote-k{i}").into_bytes());
    }
}

#[tokio::test]
async fn unknown_group_surfaces_as_peer_transport_error() {
    let addr = spawn_server("client-it-unused").await;
    let client = RpcClient::connect(addr);
    let err = client.get("no-such-group", "k").await.unwrap_err();
    assert!(matches!(err, gcache_common::Error::PeerTransport(_)));
}
