//! Meal Hat Tree Store
//!
//! An embedded realtime database: a JSON tree addressed by slash-separated
//! paths, with whole-subtree writes and subtree subscriptions.
//!
//! - **path**: Validated paths (`DbPath`)
//! - **tree**: In-memory tree and payload sanitization
//! - **wal**: Write-ahead log for durability
//! - **snapshot**: LZ4-compressed tree snapshots
//! - **engine**: The store orchestrating all components
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   payload → sanitize → WAL (crc) → Tree → listeners (whole subtree)
//!
//! Recovery:
//!   snapshot (lz4) → replay WAL → Tree
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use mealhat::storage::{DbPath, StoreConfig, TreeStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = TreeStore::open(StoreConfig::new("./data")).await?;
//!
//!     let meals = DbPath::parse("alice-example-com/meals")?;
//!     let mut sub = store.subscribe(&meals).await?;
//!
//!     store.push(&meals, &json!({"title": "Tacos", "frequencyDays": 7})).await?;
//!
//!     while let Some(snapshot) = sub.next().await {
//!         println!("meals are now {:?}", snapshot.value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod path;
pub mod snapshot;
pub mod tree;
pub mod wal;

pub use engine::{ListenerId, Snapshot, StoreConfig, StoreStats, Subscription, TreeStore};
pub use error::{StorageError, StorageResult};
pub use path::DbPath;
pub use tree::{sanitize, to_payload, Tree};
pub use wal::{WalEntry, WalSyncMode, WriteAheadLog};
