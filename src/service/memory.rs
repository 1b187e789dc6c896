use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{MarketService, ServiceError};
use crate::model::{Market, MarketCreateRequest, MarketId};
use crate::persist::{read_json, write_json};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarketSnapshot {
    next_id: u64,
    markets: Vec<Market>,
}

/// In-process market service. Optionally mirrors its contents to a JSON
/// snapshot file after every successful create.
///
/// Creates are serialized by `write_gate`; `inner` is only locked for
/// in-memory reads and the final commit, never across file I/O.
pub struct MarketStore {
    inner: Mutex<MarketSnapshot>,
    write_gate: tokio::sync::Mutex<()>,
    snapshot_path: Option<PathBuf>,
}

impl MarketStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(MarketSnapshot {
                next_id: 1,
                markets: Vec::new(),
            }),
            write_gate: tokio::sync::Mutex::new(()),
            snapshot_path: None,
        }
    }

    /// Open a store backed by `path`. A missing file starts empty.
    pub fn open(path: &Path) -> Result<Self, ServiceError> {
        let snapshot = if path.exists() {
            read_json::<MarketSnapshot>(path)?
        } else {
            MarketSnapshot {
                next_id: 1,
                markets: Vec::new(),
            }
        };
        tracing::debug!(path = %path.display(), markets = snapshot.markets.len(), "opened market store");
        Ok(Self {
            inner: Mutex::new(snapshot),
            write_gate: tokio::sync::Mutex::new(()),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.lock().markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MarketService for MarketStore {
    async fn create(&self, request: MarketCreateRequest) -> Result<Market, ServiceError> {
        let _gate = self.write_gate.lock().await;

        let (market, next) = {
            let inner = self.inner.lock();
            if inner.markets.iter().any(|m| m.name == request.name) {
                return Err(ServiceError::AlreadyExists {
                    what: format!("market \"{}\"", request.name),
                });
            }
            let market = Market::from_request(MarketId(inner.next_id), request);
            let mut next = inner.clone();
            next.next_id += 1;
            next.markets.push(market.clone());
            (market, next)
        };

        // Only creates mutate `inner` and they hold the gate, so `next` is
        // still current when it is committed below.
        let next = match &self.snapshot_path {
            Some(path) => write_snapshot(path.clone(), next).await?,
            None => next,
        };
        *self.inner.lock() = next;
        Ok(market)
    }

    async fn list(&self, profile_id: Option<u64>) -> Result<Vec<Market>, ServiceError> {
        let inner = self.inner.lock();
        Ok(inner
            .markets
            .iter()
            .filter(|m| profile_id.is_none_or(|p| m.profile_id == p))
            .cloned()
            .collect())
    }
}

async fn write_snapshot(path: PathBuf, snapshot: MarketSnapshot) -> Result<MarketSnapshot, ServiceError> {
    tokio::task::spawn_blocking(move || write_json(&path, &snapshot).map(|()| snapshot))
        .await
        .map_err(|e| ServiceError::Storage {
            message: format!("snapshot writer stopped: {e}"),
        })?
        .map_err(ServiceError::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::MarketType;

    fn request(profile_id: u64, name: &str) -> MarketCreateRequest {
        MarketCreateRequest {
            profile_id,
            name: name.to_string(),
            market_type: MarketType::Marketplace,
            receive_key: "K1".to_string(),
            receive_address: "A1".to_string(),
            publish_key: "K1".to_string(),
            publish_address: "A1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = MarketStore::in_memory();
        let a = store.create(request(1, "a")).await.unwrap();
        let b = store.create(request(1, "b")).await.unwrap();
        assert_eq!(a.id, MarketId(1));
        assert_eq!(b.id, MarketId(2));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let store = MarketStore::in_memory();
        store.create(request(1, "mymarket")).await.unwrap();
        let err = store.create(request(2, "mymarket")).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_profile() {
        let store = MarketStore::in_memory();
        store.create(request(1, "a")).await.unwrap();
        store.create(request(2, "b")).await.unwrap();
        store.create(request(1, "c")).await.unwrap();

        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        let mine = store.list(Some(1)).await.unwrap();
        assert_eq!(mine.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(store.list(Some(99)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = std::env::temp_dir().join("market_rpc_test_store");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("markets.json");

        let store = MarketStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.create(request(7, "persisted")).await.unwrap();

        let reopened = MarketStore::open(&path).unwrap();
        let markets = reopened.list(None).await.unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].name, "persisted");
        let next = reopened.create(request(7, "second")).await.unwrap();
        assert_eq!(next.id, MarketId(2));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_leaves_store_unchanged() {
        // A regular file where the data dir should be: every write fails.
        let blocker = std::env::temp_dir().join("market_rpc_test_store_blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let store = MarketStore::open(&blocker.join("markets.json")).unwrap();

        let err = store.create(request(1, "lost")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage { .. }));
        assert!(store.is_empty());
        assert!(store.list(None).await.unwrap().is_empty());

        let _ = std::fs::remove_file(&blocker);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_with_snapshot() {
        let dir = std::env::temp_dir().join("market_rpc_test_store_concurrent");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("markets.json");
        let store = std::sync::Arc::new(MarketStore::open(&path).unwrap());

        let creates = (0..16).map(|i| {
            let store = std::sync::Arc::clone(&store);
            async move { store.create(request(1, &format!("m{i}"))).await }
        });
        let results = futures_util::future::join_all(creates).await;
        let mut ids: Vec<u64> = results.into_iter().map(|r| r.unwrap().id.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());

        let reopened = MarketStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 16);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
