//! Durable key-value storage for the knowledge base and chat history.
//!
//! Every persisted value is a JSON array stored under a fixed key:
//!
//! | Key | Contents |
//! |-----|----------|
//! | [`KNOWLEDGE_BASE_KEY`] | `Vec<Document>` |
//! | [`RAG_CHUNKS_KEY`] | `Vec<Chunk>` |
//! | [`CHAT_HISTORY_KEY`] | `Vec<ConversationTurn>` |
//!
//! A missing key is a valid empty state. Callers go through [`load_json`]
//! and [`save_json`], which log storage failures instead of returning them,
//! so in-memory state stays authoritative when the disk misbehaves.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::Config;
use crate::{db, migrate};

pub const KNOWLEDGE_BASE_KEY: &str = "academiaKnowledgeBase";
pub const RAG_CHUNKS_KEY: &str = "academiaRAGChunks";
pub const CHAT_HISTORY_KEY: &str = "kbChatHistory";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A string-valued key-value store.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Load and decode the JSON value under `key`.
///
/// Returns `None` when the key is absent, unreadable, or not valid JSON for
/// `T`; the latter two are logged.
pub async fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.load(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, "failed to load persisted state: {}", e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, "ignoring malformed persisted state: {}", e);
            None
        }
    }
}

/// Encode `value` as JSON and store it under `key`. Failures are logged.
pub async fn save_json<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(key, "failed to encode state: {}", e);
            return;
        }
    };
    if let Err(e) = storage.save(key, &raw).await {
        tracing::warn!(key, "failed to persist state: {}", e);
    }
}

/// Delete `key`. Failures are logged.
pub async fn remove_key(storage: &dyn Storage, key: &str) {
    if let Err(e) = storage.remove(key).await {
        tracing::warn!(key, "failed to remove persisted state: {}", e);
    }
}

// ============ SQLite ============

/// Storage in the `kv_store` table of the configured SQLite database.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open the database at `storage.path`, creating it and its table if needed.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============ In-memory ============

/// Process-local storage; used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
