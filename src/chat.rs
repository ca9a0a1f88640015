//! Chat surface: an ordered turn log over the orchestrator.
//!
//! The transcript is what a user sees; the history is what gets persisted
//! under `kbChatHistory`. On start-up the full history is loaded but only the
//! last `chat.replay_turns` turns are replayed into the transcript.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::gateway::QueryContext;
use crate::models::ConversationTurn;
use crate::orchestrator::{Orchestrator, QueryResponse};
use crate::storage::{self, Storage, CHAT_HISTORY_KEY};

/// One line of the visible transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "text", rename_all = "lowercase")]
pub enum TranscriptEntry {
    User(String),
    Assistant(String),
    /// Placeholder shown while a query is outstanding.
    Loading,
}

pub struct ChatSession {
    orchestrator: Arc<Orchestrator>,
    storage: Arc<dyn Storage>,
    context: QueryContext,
    history: Mutex<Vec<ConversationTurn>>,
    transcript: Mutex<Vec<TranscriptEntry>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ChatSession {
    /// Load the persisted history and replay the most recent turns.
    pub async fn init(
        orchestrator: Arc<Orchestrator>,
        storage: Arc<dyn Storage>,
        replay_turns: usize,
    ) -> Self {
        let history: Vec<ConversationTurn> =
            storage::load_json(storage.as_ref(), CHAT_HISTORY_KEY)
                .await
                .unwrap_or_default();

        let skip = history.len().saturating_sub(replay_turns);
        let transcript = history[skip..]
            .iter()
            .flat_map(|turn| {
                [
                    TranscriptEntry::User(turn.user.clone()),
                    TranscriptEntry::Assistant(turn.assistant.clone()),
                ]
            })
            .collect();

        tracing::debug!(turns = history.len(), "chat history loaded");
        Self {
            orchestrator,
            storage,
            context: QueryContext::default(),
            history: Mutex::new(history),
            transcript: Mutex::new(transcript),
        }
    }

    pub fn with_context(mut self, context: QueryContext) -> Self {
        self.context = context;
        self
    }

    /// Submit one message. Blank input is ignored and returns `None`;
    /// otherwise the assistant line added to the transcript is returned.
    pub async fn submit(&self, message: &str) -> Option<String> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }

        {
            let mut transcript = lock(&self.transcript);
            transcript.push(TranscriptEntry::User(message.to_string()));
            transcript.push(TranscriptEntry::Loading);
        }

        let response = self.orchestrator.hybrid_query(message, &self.context).await;

        let reply = {
            let mut transcript = lock(&self.transcript);
            if let Some(pos) = transcript
                .iter()
                .rposition(|e| *e == TranscriptEntry::Loading)
            {
                transcript.remove(pos);
            }
            let reply = assistant_line(&response);
            transcript.push(TranscriptEntry::Assistant(reply.clone()));
            reply
        };

        if response.success {
            lock(&self.history).push(ConversationTurn {
                user: message.to_string(),
                assistant: reply.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                intent: response.intent.map(|i| i.to_string()),
            });
        }
        self.persist().await;

        Some(reply)
    }

    async fn persist(&self) {
        let history = lock(&self.history).clone();
        storage::save_json(self.storage.as_ref(), CHAT_HISTORY_KEY, &history).await;
    }

    /// Empty the history, the transcript, and the persisted log.
    pub async fn clear_history(&self) {
        lock(&self.history).clear();
        lock(&self.transcript).clear();
        storage::remove_key(self.storage.as_ref(), CHAT_HISTORY_KEY).await;
        tracing::info!("chat history cleared");
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        lock(&self.transcript).clone()
    }

    pub fn history(&self) -> Vec<ConversationTurn> {
        lock(&self.history).clone()
    }
}

fn assistant_line(response: &QueryResponse) -> String {
    if response.success {
        response
            .answer
            .clone()
            .unwrap_or_else(|| "Resposta processada com sucesso".to_string())
    } else {
        format!(
            "❌ Erro: {}",
            response
                .error
                .as_deref()
                .unwrap_or("Não foi possível processar sua pergunta")
        )
    }
}
