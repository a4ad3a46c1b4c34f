//! # Local persistence
//!
//! Saved analyses and the assistant conversation are kept as JSON blobs
//! behind the [`BlobStore`] trait:
//!
//! - [`FileBlobStore`]: one `{key}.json` file per key under the history directory
//! - [`InMemoryBlobStore`]: process-local, used in tests and when history is disabled
//!
//! [`HistoryRepository`] maps the three history collections onto their keys.
//!
//! ## Usage Example
//!
//! ```no_run
//! use orcid_analyst::repositories::{HistoryRepository, InMemoryBlobStore};
//! use orcid_analyst::models::ChatMessage;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let history = HistoryRepository::new(Arc::new(InMemoryBlobStore::new()));
//! history.save_chat(&[ChatMessage::user("How many articles?")]).await?;
//! assert_eq!(history.load_chat().await?.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod history;

pub use blob::{FileBlobStore, InMemoryBlobStore};
pub use history::{HistoryEntry, HistoryRepository, ANALYSES_KEY, CHAT_HISTORY_KEY, GROUPS_KEY};

use crate::Result;
use async_trait::async_trait;

/// Key-value storage of serialized blobs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stored value, or `None` when the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Delete `key`; false when it did not exist
    async fn remove(&self, key: &str) -> Result<bool>;
}
