//! # Etcd-Backed Membership Feed
//!
//! Purpose: Watch a `{service}/` key prefix in etcd and re-emit the full
//! address list on every change: list-then-watch, re-list on every watch
//! event, and a capacity-1 outbound channel so a slow consumer only ever
//! observes the latest snapshot rather than backing up a queue of stale
//! ones.

use etcd_client::{Client, GetOptions, WatchOptions};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::feed::{MembershipFeed, MembershipStream};

/// Discovers peer addresses by watching an etcd key prefix.
pub struct EtcdFeed {
    client: Client,
}

impl EtcdFeed {
    /// Connects to the given etcd endpoints.
    pub async fn connect(endpoints: &[String]) -> Result<Self, etcd_client::Error> {
        let client = Client::connect(endpoints, None).await?;
        Ok(EtcdFeed { client })
    }

    async fn list(client: &mut Client, service: &str) -> Vec<String> {
        let prefix = format!("{service}/");
        let options = GetOptions::new().with_prefix();
        let response = match client.get(prefix.as_bytes(), Some(options)).await {
            Ok(response) => response,
            Err(err) => {
                warn!(service, error = %err, "etcd list failed");
                return Vec::new();
            }
        };
        response
            .kvs()
            .iter()
            .filter_map(|kv| {
                let key = kv.key_str().ok()?;
                let addr = key.strip_prefix(&prefix)?;
                (!addr.is_empty()).then(|| addr.to_string())
            })
            .collect()
    }
}

impl MembershipFeed for EtcdFeed {
    fn watch(&self, service: &str) -> MembershipStream {
        let mut client = self.client.clone();
        let service = service.to_string();
        let (tx, rx) = tokio::sync::mpsc::channel(1);

        tokio::spawn(async move {
            let snapshot = Self::list(&mut client, &service).await;
            let _ = tx.try_send(snapshot);

            let prefix = format!("{service}/");
            let options = WatchOptions::new().with_prefix();
            let (mut watcher, mut stream) = match client.watch(prefix.as_bytes(), Some(options)).await {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(service = %service, error = %err, "etcd watch failed to start");
                    return;
                }
            };

            loop {
                match stream.message().await {
                    Ok(Some(_event)) => {
                        let snapshot = Self::list(&mut client, &service).await;
                        let _ = tx.try_send(snapshot);
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(service = %service, error = %err, "etcd watch stream error");
                        break;
                    }
                }
            }
            let _ = watcher.cancel().await;
        });

        Box::pin(ReceiverStream::new(rx))
    }
}
