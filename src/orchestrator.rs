//! Hybrid query orchestration.
//!
//! A query moves through `received → classified → retrieving → composed`.
//! Document search and the live-data groups for the intent run
//! concurrently. Group failures end up inside the answer text; only a
//! failing document search turns the whole response into `success: false`,
//! in which case a second best-effort search is returned as `fallback`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::compose;
use crate::gateway::{DataGroup, Gateway, GroupOutcome, QueryContext};
use crate::intent::{classify_intent, Intent};
use crate::knowledge::KnowledgeStore;
use crate::models::SearchHit;

/// Document retrieval as seen by the orchestrator.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

#[async_trait]
impl DocumentSearch for KnowledgeStore {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        Ok(KnowledgeStore::search(self, query))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub documents: usize,
    pub apis: usize,
}

/// Live-data slots fetched for one intent.
#[derive(Debug, Clone, Serialize)]
pub struct LiveDataSnapshot {
    pub intent: Intent,
    pub timestamp: String,
    pub groups: Vec<(DataGroup, GroupOutcome)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub question: String,
    pub intent: Option<Intent>,
    pub answer: Option<String>,
    pub sources: SourceCounts,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback: Vec<SearchHit>,
}

pub struct Orchestrator {
    documents: Arc<dyn DocumentSearch>,
    gateway: Option<Arc<Gateway>>,
}

impl Orchestrator {
    /// `gateway: None` answers from documents only.
    pub fn new(documents: Arc<dyn DocumentSearch>, gateway: Option<Arc<Gateway>>) -> Self {
        Self { documents, gateway }
    }

    pub fn classify_intent(&self, question: &str) -> Intent {
        classify_intent(question)
    }

    /// Fetch the live-data groups mapped to `intent`, concurrently.
    pub async fn fetch_live_data(&self, intent: Intent, ctx: &QueryContext) -> LiveDataSnapshot {
        let groups = match &self.gateway {
            Some(gateway) => gateway.fetch_groups(intent.data_groups(), ctx).await,
            None => Vec::new(),
        };
        LiveDataSnapshot {
            intent,
            timestamp: chrono::Utc::now().to_rfc3339(),
            groups,
        }
    }

    pub async fn hybrid_query(&self, question: &str, ctx: &QueryContext) -> QueryResponse {
        let intent = classify_intent(question);
        tracing::info!(%intent, "processing query");

        let (search, live) = tokio::join!(
            self.documents.search(question),
            self.fetch_live_data(intent, ctx)
        );

        match search {
            Ok(hits) => {
                let answer = if self.gateway.is_some() {
                    compose::compose_answer(intent, question, &hits, &live.groups)
                } else {
                    compose::document_answer(&hits)
                };
                QueryResponse {
                    success: true,
                    question: question.to_string(),
                    intent: Some(intent),
                    answer: Some(answer),
                    sources: SourceCounts {
                        documents: hits.len(),
                        apis: live.groups.len(),
                    },
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    error: None,
                    fallback: Vec::new(),
                }
            }
            Err(e) => {
                tracing::warn!("document search failed: {:#}", e);
                let fallback = self.documents.search(question).await.unwrap_or_default();
                QueryResponse {
                    success: false,
                    question: question.to_string(),
                    intent: Some(intent),
                    answer: None,
                    sources: SourceCounts::default(),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    error: Some(e.to_string()),
                    fallback,
                }
            }
        }
    }

    /// Documents-only answer.
    pub async fn document_answer(&self, question: &str) -> Result<String> {
        let hits = self.documents.search(question).await?;
        Ok(compose::document_answer(&hits))
    }
}
