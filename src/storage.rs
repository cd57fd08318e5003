//! # Extension-local Storage
//!
//! Persistent key/value state shared by every component: the AI API key,
//! the selected chain and the trade history. Components re-read it on
//! demand instead of caching it, so a restart always sees the last write.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Maximum number of trades kept in history, oldest dropped first
pub const TRADE_HISTORY_LIMIT: usize = 50;

pub const DEFAULT_CHAIN_ID: &str = "1";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Everything persisted, keyed the way the extension's local storage is
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredState {
    #[serde(rename = "CLAUDE_API_KEY", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "BLOCKSCOUT_CHAIN_ID", default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(rename = "TRADE_HISTORY", default)]
    pub trade_history: Vec<TradeRecord>,
}

/// The process-wide configuration view of [`StoredState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionConfig {
    pub api_key: Option<String>,
    pub chain_id: String,
}

impl ExtensionConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    /// Key with everything past the vendor prefix hidden
    pub fn masked_key(&self) -> Option<String> {
        self.api_key.as_deref().map(mask_key)
    }
}

pub fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(10).collect();
    format!("{visible}…")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub from_token: String,
    pub to_token: String,
    pub amount: String,
    pub expected_output: String,
    pub tx_hash: String,
    pub wallet_address: String,
    pub timestamp: DateTime<Utc>,
}

impl StoredState {
    pub fn config(&self) -> ExtensionConfig {
        ExtensionConfig {
            api_key: self.api_key.clone(),
            chain_id: self
                .chain_id
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAIN_ID.to_string()),
        }
    }

    pub fn push_trade(&mut self, record: TradeRecord) {
        self.trade_history.push(record);
        if self.trade_history.len() > TRADE_HISTORY_LIMIT {
            let overflow = self.trade_history.len() - TRADE_HISTORY_LIMIT;
            self.trade_history.drain(..overflow);
        }
    }
}

pub type StateUpdate<'a> = Box<dyn FnOnce(&mut StoredState) + Send + 'a>;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> Result<StoredState, StorageError>;

    /// Read-modify-write under the store's own lock
    async fn update(&self, apply: StateUpdate<'_>) -> Result<StoredState, StorageError>;

    async fn config(&self) -> Result<ExtensionConfig, StorageError> {
        Ok(self.load().await?.config())
    }
}

/// JSON file on disk, written atomically through a sibling temp file
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io { path: self.path.display().to_string(), source }
    }

    async fn read(&self) -> Result<StoredState, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(StoredState::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("[Storage] File {} not found, starting empty", self.path.display());
                Ok(StoredState::default())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn load(&self) -> Result<StoredState, StorageError> {
        self.read().await
    }

    async fn update(&self, apply: StateUpdate<'_>) -> Result<StoredState, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.read().await?;
        apply(&mut state);

        let bytes = serde_json::to_vec_pretty(&state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| self.io_error(e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            warn!("[Storage] Atomic rename failed for {}: {}", self.path.display(), e);
            return Err(self.io_error(e));
        }
        Ok(state)
    }
}

/// Process-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoredState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StoredState) -> Self {
        Self { state: Mutex::new(state) }
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load(&self) -> Result<StoredState, StorageError> {
        Ok(self.state.lock().await.clone())
    }

    async fn update(&self, apply: StateUpdate<'_>) -> Result<StoredState, StorageError> {
        let mut state = self.state.lock().await;
        apply(&mut *state);
        Ok(state.clone())
    }
}
