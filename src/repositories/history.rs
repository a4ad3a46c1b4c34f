use super::{BlobStore, FileBlobStore, InMemoryBlobStore};
use crate::config::HistoryConfig;
use crate::models::{ChatMessage, GroupAnalysis, SubjectAnalysis};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Storage key of the assistant conversation
pub const CHAT_HISTORY_KEY: &str = "orcid-chat-history";
/// Storage key of saved single-researcher analyses
pub const ANALYSES_KEY: &str = "orcid_analyses";
/// Storage key of saved group analyses
pub const GROUPS_KEY: &str = "orcid_groups";

/// A saved analysis snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<T> {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub analysis: T,
}

impl<T> HistoryEntry<T> {
    pub fn new(name: impl Into<String>, analysis: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            timestamp: Utc::now(),
            analysis,
        }
    }
}

/// Saved analyses and the assistant conversation
#[derive(Clone)]
pub struct HistoryRepository {
    store: Arc<dyn BlobStore>,
}

impl HistoryRepository {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// File-backed repository, or an in-memory one when history is disabled
    #[must_use]
    pub fn from_config(config: &HistoryConfig) -> Self {
        if config.enabled {
            info!("History stored in {}", config.directory.display());
            Self::new(Arc::new(FileBlobStore::new(&config.directory)))
        } else {
            debug!("History persistence disabled");
            Self::new(Arc::new(InMemoryBlobStore::new()))
        }
    }

    pub async fn load_chat(&self) -> Result<Vec<ChatMessage>> {
        self.load_list(CHAT_HISTORY_KEY).await
    }

    pub async fn save_chat(&self, messages: &[ChatMessage]) -> Result<()> {
        self.store_list(CHAT_HISTORY_KEY, messages).await
    }

    pub async fn clear_chat(&self) -> Result<()> {
        self.store.remove(CHAT_HISTORY_KEY).await?;
        Ok(())
    }

    /// Saved single analyses, newest first
    pub async fn analyses(&self) -> Result<Vec<HistoryEntry<SubjectAnalysis>>> {
        self.load_list(ANALYSES_KEY).await
    }

    pub async fn save_analysis(
        &self,
        name: impl Into<String>,
        analysis: SubjectAnalysis,
    ) -> Result<HistoryEntry<SubjectAnalysis>> {
        self.prepend(ANALYSES_KEY, HistoryEntry::new(name, analysis)).await
    }

    /// Saved group analyses, newest first
    pub async fn groups(&self) -> Result<Vec<HistoryEntry<GroupAnalysis>>> {
        self.load_list(GROUPS_KEY).await
    }

    pub async fn save_group(
        &self,
        name: impl Into<String>,
        analysis: GroupAnalysis,
    ) -> Result<HistoryEntry<GroupAnalysis>> {
        self.prepend(GROUPS_KEY, HistoryEntry::new(name, analysis)).await
    }

    /// Remove a saved analysis or group by id; false when no entry matched
    pub async fn remove_entry(&self, id: Uuid) -> Result<bool> {
        let removed_analysis = self.remove_from::<SubjectAnalysis>(ANALYSES_KEY, id).await?;
        let removed_group = self.remove_from::<GroupAnalysis>(GROUPS_KEY, id).await?;
        Ok(removed_analysis || removed_group)
    }

    /// Drop the conversation and every saved analysis
    pub async fn clear_all(&self) -> Result<()> {
        for key in [CHAT_HISTORY_KEY, ANALYSES_KEY, GROUPS_KEY] {
            self.store.remove(key).await?;
        }
        info!("History cleared");
        Ok(())
    }

    async fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| {
            warn!("Stored history '{}' is unreadable: {}", key, e);
            Error::Storage {
                operation: format!("read {key}"),
                reason: e.to_string(),
            }
        })
    }

    async fn store_list<T: Serialize + Sync>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.store.put(key, raw).await
    }

    async fn prepend<T>(&self, key: &str, entry: HistoryEntry<T>) -> Result<HistoryEntry<T>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync,
    {
        let mut entries: Vec<HistoryEntry<T>> = self.load_list(key).await?;
        entries.insert(0, entry.clone());
        self.store_list(key, &entries).await?;
        debug!("Saved '{}' to {} ({} entries)", entry.name, key, entries.len());
        Ok(entry)
    }

    async fn remove_from<T>(&self, key: &str, id: Uuid) -> Result<bool>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let mut entries: Vec<HistoryEntry<T>> = self.load_list(key).await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.store_list(key, &entries).await?;
        Ok(true)
    }
}
