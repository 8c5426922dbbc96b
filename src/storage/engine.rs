//! Meal Hat Tree Store
//!
//! The store orchestrates all storage components:
//! - Write path: payload → sanitize → WAL → Tree → notify listeners
//! - Read path: Tree → subtree clone
//! - Subscriptions: listeners registered on a path receive the whole subtree
//!   once on registration and again after every write that touches it
//!
//! Thread-safe via Tokio's async RwLock for concurrent access.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::path::DbPath;
use crate::storage::snapshot::{read_snapshot, write_snapshot};
use crate::storage::tree::{sanitize, to_payload, Tree};
use crate::storage::wal::{WalEntry, WalSyncMode, WriteAheadLog};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};
use uuid::Uuid;

/// Configuration for the tree store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for all data
    pub data_dir: PathBuf,
    /// Interval between background snapshots in milliseconds (default: 30000)
    pub snapshot_interval_ms: u64,
    /// Log every write before applying it
    pub wal_enabled: bool,
    /// WAL sync strategy
    pub wal_sync: WalSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("mealhat_data"),
            snapshot_interval_ms: 30_000,
            wal_enabled: true,
            wal_sync: WalSyncMode::Batched,
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Get path to the WAL file
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("wal").join("current.wal")
    }

    /// Get path to the tree snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("meta").join("tree.snap")
    }
}

/// Identity of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A whole-subtree value delivered to a listener
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: DbPath,
    /// `None` when nothing is stored at the path
    pub value: Option<Value>,
    /// Store write counter at the time the value was read
    pub version: u64,
}

struct Listener {
    path: DbPath,
    sender: mpsc::UnboundedSender<Snapshot>,
}

type ListenerMap = Mutex<HashMap<ListenerId, Listener>>;

fn lock(listeners: &ListenerMap) -> MutexGuard<'_, HashMap<ListenerId, Listener>> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Receiving side of a listener. Dropping it unsubscribes.
pub struct Subscription {
    id: ListenerId,
    path: DbPath,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    registry: Weak<ListenerMap>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    /// Wait for the next snapshot; `None` once the listener is removed
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Take a pending snapshot without waiting
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).remove(&self.id);
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub listeners: usize,
    pub wal_entries: u64,
    pub partitions: usize,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partitions={}, listeners={}, wal_entries={}",
            self.partitions, self.listeners, self.wal_entries
        )
    }
}

/// The Meal Hat tree store
pub struct TreeStore {
    config: StoreConfig,
    tree: RwLock<Tree>,
    wal: Option<tokio::sync::Mutex<WriteAheadLog>>,
    listeners: Arc<ListenerMap>,
    /// Incremented under the tree write lock on every applied write
    version: AtomicU64,
    shutdown: RwLock<bool>,
}

impl TreeStore {
    /// Open the store, loading the last snapshot and replaying the WAL
    pub async fn open(config: StoreConfig) -> StorageResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let mut tree = match read_snapshot(&config.snapshot_path())? {
            Some(root) => Tree::from_value(root),
            None => Tree::new(),
        };

        let wal = if config.wal_enabled {
            let wal = WriteAheadLog::open(config.wal_path(), config.wal_sync)?;
            let entries = wal.recover()?;
            if !entries.is_empty() {
                tracing::info!("Replaying {} writes from WAL", entries.len());
            }
            for entry in entries {
                apply_entry(&mut tree, &entry)?;
            }
            Some(tokio::sync::Mutex::new(wal))
        } else {
            None
        };

        tracing::info!(
            partitions = tree.top_level_keys(),
            data_dir = ?config.data_dir,
            "Tree store opened"
        );

        Ok(Self {
            config,
            tree: RwLock::new(tree),
            wal,
            listeners: Arc::new(Mutex::new(HashMap::new())),
            version: AtomicU64::new(0),
            shutdown: RwLock::new(false),
        })
    }

    /// Read the subtree at `path`
    pub async fn get(&self, path: &DbPath) -> Option<Value> {
        self.tree.read().await.get(path).cloned()
    }

    /// Read the subtree at `path` together with the current write version
    pub async fn get_snapshot(&self, path: &DbPath) -> Snapshot {
        let tree = self.tree.read().await;
        Snapshot {
            path: path.clone(),
            value: tree.get(path).cloned(),
            version: self.version.load(Ordering::Acquire),
        }
    }

    /// Read and deserialize the record at `path`
    pub async fn get_record<T: DeserializeOwned>(&self, path: &DbPath) -> StorageResult<Option<T>> {
        match self.get(path).await {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Replace the whole subtree at `path`. `Value::Null` removes it.
    pub async fn set(&self, path: &DbPath, value: Value) -> StorageResult<()> {
        if *self.shutdown.read().await {
            return Err(StorageError::ShutDown);
        }

        let payload = sanitize(value);
        if path.is_root() && !matches!(payload, Some(Value::Object(_)) | None) {
            return Err(StorageError::InvalidPayload(path.to_string()));
        }

        let mut tree = self.tree.write().await;

        if let Some(wal) = &self.wal {
            let encoded = payload.as_ref().map(serde_json::to_string).transpose()?;
            let entry = WalEntry::new(path.segments().join("/"), encoded);
            wal.lock().await.append(&entry)?;
        }

        tree.set(path, payload)?;
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.notify(&tree, path, version);

        tracing::trace!(path = %path, "Tree write applied");
        Ok(())
    }

    /// Serialize `record` and store it at `path`
    pub async fn set_record<T: Serialize>(&self, path: &DbPath, record: &T) -> StorageResult<()> {
        let payload = to_payload(record)?.unwrap_or(Value::Null);
        self.set(path, payload).await
    }

    /// Remove the subtree at `path`
    pub async fn remove(&self, path: &DbPath) -> StorageResult<()> {
        self.set(path, Value::Null).await
    }

    /// Store `record` under a fresh key below `parent`, with an `id` field
    /// equal to that key. Returns the key.
    pub async fn push<T: Serialize>(&self, parent: &DbPath, record: &T) -> StorageResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut payload = to_payload(record)?.unwrap_or_else(|| Value::Object(Default::default()));
        match payload.as_object_mut() {
            Some(map) => {
                map.insert("id".to_string(), Value::String(id.clone()));
            }
            None => return Err(StorageError::InvalidPayload(parent.to_string())),
        }

        self.set(&parent.child(&id)?, payload).await?;
        Ok(id)
    }

    /// Register a listener on `path`. The current value is delivered at once.
    pub async fn subscribe(&self, path: &DbPath) -> StorageResult<Subscription> {
        if *self.shutdown.read().await {
            return Err(StorageError::ShutDown);
        }

        // Holding the read lock orders the initial value before any later write.
        let tree = self.tree.read().await;
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = ListenerId::new();

        let _ = sender.send(Snapshot {
            path: path.clone(),
            value: tree.get(path).cloned(),
            version: self.version.load(Ordering::Acquire),
        });

        lock(&self.listeners).insert(
            id,
            Listener {
                path: path.clone(),
                sender,
            },
        );

        tracing::debug!(listener_id = %id, path = %path, "Listener registered");

        Ok(Subscription {
            id,
            path: path.clone(),
            receiver,
            registry: Arc::downgrade(&self.listeners),
        })
    }

    /// Remove a listener. Its subscription stops receiving snapshots.
    pub fn unsubscribe(&self, id: ListenerId) -> StorageResult<()> {
        match lock(&self.listeners).remove(&id) {
            Some(listener) => {
                tracing::debug!(listener_id = %id, path = %listener.path, "Listener removed");
                Ok(())
            }
            None => Err(StorageError::ListenerNotFound(id.to_string())),
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Deliver fresh snapshots to every listener affected by a write at `written`
    fn notify(&self, tree: &Tree, written: &DbPath, version: u64) {
        let mut listeners = lock(&self.listeners);
        let mut closed = Vec::new();

        for (id, listener) in listeners.iter() {
            if !listener.path.is_affected_by(written) {
                continue;
            }
            let snapshot = Snapshot {
                path: listener.path.clone(),
                value: tree.get(&listener.path).cloned(),
                version,
            };
            if listener.sender.send(snapshot).is_err() {
                closed.push(*id);
            }
        }

        for id in closed {
            listeners.remove(&id);
        }
    }

    /// Write a snapshot of the whole tree and truncate the WAL
    pub async fn snapshot(&self) -> StorageResult<()> {
        let tree = self.tree.read().await;
        let bytes = write_snapshot(&self.config.snapshot_path(), tree.root())?;

        if let Some(wal) = &self.wal {
            wal.lock().await.truncate()?;
        }

        tracing::debug!(bytes, "Tree snapshot written");
        Ok(())
    }

    /// Start the background snapshot task
    pub fn start_background_snapshot(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        let period = Duration::from_millis(self.config.snapshot_interval_ms.max(1));

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if *store.shutdown.read().await {
                    break;
                }

                let pending = match &store.wal {
                    Some(wal) => wal.lock().await.has_pending(),
                    None => true,
                };
                if !pending {
                    continue;
                }

                if let Err(e) = store.snapshot().await {
                    tracing::error!("Background snapshot failed: {}", e);
                }
            }
        })
    }

    /// Stop accepting writes, snapshot, and drop all listeners
    pub async fn shutdown(&self) -> StorageResult<()> {
        *self.shutdown.write().await = true;
        self.snapshot().await?;
        lock(&self.listeners).clear();
        tracing::info!("Tree store shut down");
        Ok(())
    }

    pub async fn stats(&self) -> StoreStats {
        let wal_entries = match &self.wal {
            Some(wal) => wal.lock().await.entry_count(),
            None => 0,
        };
        StoreStats {
            listeners: self.listener_count(),
            wal_entries,
            partitions: self.tree.read().await.top_level_keys(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub async fn is_shut_down(&self) -> bool {
        *self.shutdown.read().await
    }
}

fn apply_entry(tree: &mut Tree, entry: &WalEntry) -> StorageResult<()> {
    let path = DbPath::parse(&entry.path)?;
    let payload = match &entry.payload {
        Some(json) => Some(serde_json::from_str(json)?),
        None => None,
    };
    tree.set(&path, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    async fn create_test_store() -> (TreeStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let store = TreeStore::open(config).await.unwrap();
        (store, dir)
    }

    fn path(raw: &str) -> DbPath {
        DbPath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _dir) = create_test_store().await;

        store
            .set(&path("k/meals/1"), json!({"id": "1", "title": "Tacos"}))
            .await
            .unwrap();

        assert_eq!(
            store.get(&path("k/meals/1/title")).await,
            Some(json!("Tacos"))
        );
    }

    #[tokio::test]
    async fn test_push_assigns_id() {
        let (store, _dir) = create_test_store().await;

        let id = store
            .push(&path("k/meals"), &json!({"title": "Soup"}))
            .await
            .unwrap();

        let stored = store.get(&path("k/meals").child(&id).unwrap()).await.unwrap();
        assert_eq!(stored["id"], json!(id));
        assert_eq!(stored["title"], json!("Soup"));
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_updates() {
        let (store, _dir) = create_test_store().await;
        store
            .set(&path("k/meals/1"), json!({"title": "Tacos"}))
            .await
            .unwrap();

        let mut sub = store.subscribe(&path("k/meals")).await.unwrap();
        let initial = sub.next().await.unwrap();
        assert_eq!(initial.value, Some(json!({"1": {"title": "Tacos"}})));

        store
            .set(&path("k/meals/2"), json!({"title": "Soup"}))
            .await
            .unwrap();
        let update = sub.next().await.unwrap();
        assert!(update.version > initial.version);
        assert_eq!(update.value.unwrap().as_object().unwrap().len(), 2);
        assert_eq!(store.get_snapshot(&path("k/meals")).await.version, update.version);

        // Unrelated writes are not delivered
        store
            .set(&path("k/drawnMeals/a"), json!({"mealId": "1"}))
            .await
            .unwrap();
        assert!(sub.try_next().is_none());

        // Writes above the listener path are delivered
        store.remove(&path("k")).await.unwrap();
        assert_eq!(sub.next().await.unwrap().value, None);
    }

    #[tokio::test]
    async fn test_unsubscribe_and_drop() {
        let (store, _dir) = create_test_store().await;

        let mut sub = store.subscribe(&path("k/meals")).await.unwrap();
        let other = store.subscribe(&path("k/meals")).await.unwrap();
        assert_eq!(store.listener_count(), 2);

        store.unsubscribe(sub.id()).unwrap();
        assert!(matches!(
            store.unsubscribe(sub.id()),
            Err(StorageError::ListenerNotFound(_))
        ));

        drop(other);
        assert_eq!(store.listener_count(), 0);

        // Initial snapshot was queued before removal; nothing after it
        assert!(sub.next().await.is_some());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_nan_payload_is_sanitized() {
        let (store, _dir) = create_test_store().await;

        #[derive(Serialize)]
        struct Ingredient {
            name: String,
            quantity: f64,
        }

        store
            .set_record(
                &path("k/meals/1/ingredients/0"),
                &Ingredient {
                    name: "rice".to_string(),
                    quantity: f64::NAN,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            store.get(&path("k/meals/1/ingredients/0")).await,
            Some(json!({"name": "rice"}))
        );
    }

    #[tokio::test]
    async fn test_persistence_via_wal() {
        let dir = tempdir().unwrap();

        {
            let store = TreeStore::open(StoreConfig::new(dir.path())).await.unwrap();
            store
                .set(&path("k/meals/1"), json!({"title": "Tacos"}))
                .await
                .unwrap();
            store
                .set(&path("k/meals/2"), json!({"title": "Soup"}))
                .await
                .unwrap();
            store.remove(&path("k/meals/1")).await.unwrap();
        }

        let store = TreeStore::open(StoreConfig::new(dir.path())).await.unwrap();
        assert!(store.get(&path("k/meals/1")).await.is_none());
        assert_eq!(
            store.get(&path("k/meals/2/title")).await,
            Some(json!("Soup"))
        );
    }

    #[tokio::test]
    async fn test_persistence_via_snapshot() {
        let dir = tempdir().unwrap();

        {
            let store = TreeStore::open(StoreConfig::new(dir.path())).await.unwrap();
            store
                .set(&path("k/meals/1"), json!({"title": "Tacos"}))
                .await
                .unwrap();
            store.shutdown().await.unwrap();
            assert_eq!(store.stats().await.wal_entries, 0);
            assert!(matches!(
                store.set(&path("k/x"), json!(1)).await,
                Err(StorageError::ShutDown)
            ));
        }

        let store = TreeStore::open(StoreConfig::new(dir.path())).await.unwrap();
        assert_eq!(
            store.get(&path("k/meals/1/title")).await,
            Some(json!("Tacos"))
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, _dir) = create_test_store().await;
        store.set(&path("a/x"), json!(1)).await.unwrap();
        store.set(&path("b/x"), json!(1)).await.unwrap();
        let _sub = store.subscribe(&path("a")).await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.partitions, 2);
        assert_eq!(stats.listeners, 1);
        assert_eq!(stats.wal_entries, 2);
    }
}
