//! Application façade wiring storage, knowledge store, gateway, and
//! orchestrator together from one [`Config`].

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::chat::ChatSession;
use crate::config::Config;
use crate::gateway::{Gateway, HealthReport, QueryContext};
use crate::knowledge::{IngestOutcome, KnowledgeStore};
use crate::models::{Document, KnowledgeStats, SearchHit};
use crate::notify::{NoopNotifier, Notifier};
use crate::orchestrator::{Orchestrator, QueryResponse};
use crate::storage::{SqliteStorage, Storage};

pub struct RagService {
    config: Config,
    storage: Arc<dyn Storage>,
    sqlite: Option<Arc<SqliteStorage>>,
    knowledge: Arc<KnowledgeStore>,
    gateway: Option<Arc<Gateway>>,
    orchestrator: Arc<Orchestrator>,
}

impl RagService {
    /// Open the configured SQLite storage and build every component.
    pub async fn init(config: Config) -> Result<Self> {
        Self::init_with_notifier(config, Arc::new(NoopNotifier)).await
    }

    pub async fn init_with_notifier(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let sqlite = Arc::new(SqliteStorage::open(&config).await?);
        let mut service = Self::with_storage(config, sqlite.clone(), notifier).await?;
        service.sqlite = Some(sqlite);
        Ok(service)
    }

    /// Build every component on top of an existing storage backend.
    pub async fn with_storage(
        config: Config,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let knowledge =
            Arc::new(KnowledgeStore::load(&config, storage.clone(), notifier).await?);
        let gateway = if config.gateway.enabled {
            Some(Arc::new(Gateway::new(&config.gateway)?))
        } else {
            tracing::info!("live data gateway disabled; answering from documents only");
            None
        };
        let orchestrator = Arc::new(Orchestrator::new(knowledge.clone(), gateway.clone()));

        Ok(Self {
            config,
            storage,
            sqlite: None,
            knowledge,
            gateway,
            orchestrator,
        })
    }

    /// Close the storage backend. State is persisted after every mutation,
    /// so nothing is flushed here.
    pub async fn shutdown(&self) {
        if let Some(sqlite) = &self.sqlite {
            sqlite.close().await;
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub async fn query(&self, question: &str) -> QueryResponse {
        self.query_with_context(question, &QueryContext::default())
            .await
    }

    pub async fn query_with_context(&self, question: &str, ctx: &QueryContext) -> QueryResponse {
        self.orchestrator.hybrid_query(question, ctx).await
    }

    pub async fn add_document(&self, doc: Document) -> Document {
        self.knowledge.add_document(doc).await
    }

    pub async fn remove_document(&self, id: &str) -> bool {
        self.knowledge.remove_document(id).await
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.knowledge.search(query)
    }

    pub async fn ingest(&self, path: &Path) -> Result<Vec<IngestOutcome>> {
        self.knowledge.ingest_path(path).await
    }

    pub async fn reprocess(&self, id: &str) -> Result<Document> {
        self.knowledge.reprocess_document(id).await
    }

    pub async fn reindex(&self) -> usize {
        self.knowledge.reindex().await
    }

    pub async fn clear_knowledge(&self) {
        self.knowledge.clear().await
    }

    pub fn stats(&self) -> KnowledgeStats {
        self.knowledge.stats()
    }

    /// Empty the gateway cache. No-op when the gateway is disabled.
    pub fn clear_cache(&self) {
        if let Some(gateway) = &self.gateway {
            gateway.clear_cache();
        }
    }

    /// Probe the core endpoints; `None` when the gateway is disabled.
    pub async fn health_check(&self) -> Option<HealthReport> {
        match &self.gateway {
            Some(gateway) => Some(gateway.health_check().await),
            None => None,
        }
    }

    /// Start a chat session over this service's orchestrator.
    pub async fn chat(&self) -> ChatSession {
        ChatSession::init(
            self.orchestrator.clone(),
            self.storage.clone(),
            self.config.chat.replay_turns,
        )
        .await
    }
}
