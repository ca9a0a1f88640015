//! The knowledge store: document corpus, derived chunks, keyword retrieval.
//!
//! Documents and chunks live together behind one lock so that every
//! mutation replaces the chunk set in the same critical section as the
//! document list change. The chunk set is always regenerated in full from
//! the documents (see [`crate::chunk`]), never patched incrementally.
//!
//! Every mutation persists both lists afterwards. Writes are serialized so
//! the stored pair always comes from one snapshot, and loading rebuilds the
//! chunks from the stored documents regardless of what the chunk key holds.
//! Persistence failures are logged by [`crate::storage`] and never fail the
//! mutation itself.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::chunk::chunk_document;
use crate::config::{Config, IngestConfig};
use crate::connector_fs::scan_directory;
use crate::extract::{self, Confidence, PdfExtractor};
use crate::models::{
    Chunk, Document, DocumentType, KnowledgeStats, Relevance, SearchHit, TechniqueHit,
};
use crate::notify::{Notifier, NotifyLevel};
use crate::storage::{self, Storage, KNOWLEDGE_BASE_KEY, RAG_CHUNKS_KEY};

const KRAV_PATTERNS: &[&str] = &[
    "defesa",
    "ataque",
    "chute",
    "soco",
    "joelhada",
    "cotovelada",
    "estrangulamento",
    "agarrar",
    "derrubar",
    "bloquear",
    "esquivar",
    "contra",
    "frontal",
    "lateral",
    "por trás",
    "posição",
    "stance",
];

pub const DEFAULT_TECHNIQUE_RESULTS: usize = 10;

#[derive(Default)]
struct Corpus {
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
}

/// Result of a technique search: the top hits plus how many chunks matched.
#[derive(Debug, Clone)]
pub struct TechniqueSearch {
    pub query: String,
    pub results: Vec<TechniqueHit>,
    pub total_found: usize,
}

/// Outcome of ingesting one file during a path ingest.
#[derive(Debug)]
pub struct IngestOutcome {
    pub path: PathBuf,
    pub result: Result<Document>,
}

pub struct KnowledgeStore {
    corpus: RwLock<Corpus>,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    pdf: Box<dyn PdfExtractor>,
    max_chars: usize,
    ingest: IngestConfig,
    write_lock: tokio::sync::Mutex<()>,
}

impl KnowledgeStore {
    /// Build an empty store. Use [`KnowledgeStore::load`] to restore state.
    pub fn new(
        config: &Config,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        Ok(Self {
            corpus: RwLock::new(Corpus::default()),
            storage,
            notifier,
            pdf: extract::pdf_extractor_for(&config.ingest.pdf_extractor)?,
            max_chars: config.chunking.max_chars,
            ingest: config.ingest.clone(),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Build a store and restore the persisted corpus.
    ///
    /// Absent keys mean an empty corpus. Chunks are always rebuilt from the
    /// documents; a stored chunk list that disagrees is rewritten.
    pub async fn load(
        config: &Config,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let store = Self::new(config, storage, notifier)?;

        let documents: Vec<Document> =
            storage::load_json(store.storage.as_ref(), KNOWLEDGE_BASE_KEY)
                .await
                .unwrap_or_default();
        let chunks: Option<Vec<Chunk>> =
            storage::load_json(store.storage.as_ref(), RAG_CHUNKS_KEY).await;

        let rebuilt = regenerate_chunks(&documents, store.max_chars);
        let stale = match &chunks {
            Some(stored) => *stored != rebuilt,
            None => !documents.is_empty(),
        };
        if stale {
            tracing::warn!("stored chunks out of date, regenerating");
        }
        {
            let mut corpus = store.corpus_mut();
            corpus.chunks = rebuilt;
            corpus.documents = documents;
            tracing::info!(
                documents = corpus.documents.len(),
                chunks = corpus.chunks.len(),
                "knowledge base loaded"
            );
        }
        if stale {
            store.persist().await;
        }

        Ok(store)
    }

    fn corpus(&self) -> RwLockReadGuard<'_, Corpus> {
        self.corpus.read().unwrap_or_else(|e| e.into_inner())
    }

    fn corpus_mut(&self) -> RwLockWriteGuard<'_, Corpus> {
        self.corpus.write().unwrap_or_else(|e| e.into_inner())
    }

    async fn persist(&self) {
        let _guard = self.write_lock.lock().await;
        let (documents, chunks) = {
            let corpus = self.corpus();
            (corpus.documents.clone(), corpus.chunks.clone())
        };
        storage::save_json(self.storage.as_ref(), KNOWLEDGE_BASE_KEY, &documents).await;
        storage::save_json(self.storage.as_ref(), RAG_CHUNKS_KEY, &chunks).await;
    }

    // ============ Corpus mutation ============

    /// Append a document and rebuild the chunk set.
    ///
    /// An empty `id` is replaced by a fresh UUID and an empty `content_hash`
    /// is computed. Ids are not checked for duplicates.
    pub async fn add_document(&self, mut doc: Document) -> Document {
        if doc.id.is_empty() {
            doc.id = uuid::Uuid::new_v4().to_string();
        }
        if doc.content_hash.is_empty() {
            doc.content_hash = content_hash(&doc.content);
        }

        {
            let mut corpus = self.corpus_mut();
            corpus.documents.push(doc.clone());
            corpus.chunks = regenerate_chunks(&corpus.documents, self.max_chars);
            tracing::debug!(id = %doc.id, chunks = corpus.chunks.len(), "document added");
        }
        self.persist().await;

        self.notifier.notify(
            NotifyLevel::Success,
            &format!("Documento \"{}\" adicionado à base de conhecimento", doc.title),
        );
        doc
    }

    /// Remove the first document with `id`. Returns `false` if none matched.
    pub async fn remove_document(&self, id: &str) -> bool {
        let removed = {
            let mut corpus = self.corpus_mut();
            match corpus.documents.iter().position(|d| d.id == id) {
                Some(index) => {
                    let doc = corpus.documents.remove(index);
                    corpus.chunks = regenerate_chunks(&corpus.documents, self.max_chars);
                    Some(doc)
                }
                None => None,
            }
        };

        match removed {
            Some(doc) => {
                self.persist().await;
                tracing::debug!(id, "document removed");
                self.notifier
                    .notify(NotifyLevel::Success, &format!("Documento \"{}\" removido", doc.title));
                true
            }
            None => false,
        }
    }

    /// Drop every document and chunk and delete both storage keys.
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        {
            let mut corpus = self.corpus_mut();
            corpus.documents.clear();
            corpus.chunks.clear();
        }
        storage::remove_key(self.storage.as_ref(), KNOWLEDGE_BASE_KEY).await;
        storage::remove_key(self.storage.as_ref(), RAG_CHUNKS_KEY).await;
        self.notifier
            .notify(NotifyLevel::Info, "Base de conhecimento limpa");
    }

    /// Regenerate chunks from the current documents; returns the chunk count.
    pub async fn reindex(&self) -> usize {
        let count = {
            let mut corpus = self.corpus_mut();
            corpus.chunks = regenerate_chunks(&corpus.documents, self.max_chars);
            corpus.chunks.len()
        };
        self.persist().await;
        tracing::info!(chunks = count, "knowledge base reindexed");
        count
    }

    /// Re-clean a stored document's content and rebuild its chunks.
    pub async fn reprocess_document(&self, id: &str) -> Result<Document> {
        let updated = {
            let mut corpus = self.corpus_mut();
            let doc = corpus
                .documents
                .iter_mut()
                .find(|d| d.id == id)
                .with_context(|| format!("Document not found: {}", id))?;

            doc.content =
                extract::reprocess_text(doc.doc_type == DocumentType::Pdf, &doc.content);
            doc.word_count = word_count(&doc.content);
            doc.content_hash = content_hash(&doc.content);
            doc.last_reprocessed = Some(chrono::Utc::now().to_rfc3339());
            let updated = doc.clone();

            corpus.chunks = regenerate_chunks(&corpus.documents, self.max_chars);
            updated
        };
        self.persist().await;

        self.notifier.notify(
            NotifyLevel::Success,
            &format!("Documento \"{}\" reprocessado", updated.title),
        );
        Ok(updated)
    }

    // ============ Ingestion ============

    /// Read a file and ingest it. Read failures are returned, not retried.
    pub async fn ingest_file(&self, path: &Path) -> Result<Document> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime = extract::guess_mime(&name);
        Ok(self.ingest_bytes(&name, mime, &bytes).await)
    }

    /// Extract text from `bytes`, build a document, and add it.
    ///
    /// With `ingest.skip_duplicates`, content identical to an existing
    /// document returns that document instead.
    pub async fn ingest_bytes(&self, file_name: &str, mime: &str, bytes: &[u8]) -> Document {
        let (raw, doc_type) = self.extract_content(file_name, mime, bytes);
        let content = extract::clean_text_content(&raw);
        let hash = content_hash(&content);

        if self.ingest.skip_duplicates {
            let existing = self
                .corpus()
                .documents
                .iter()
                .find(|d| d.content_hash == hash)
                .cloned();
            if let Some(existing) = existing {
                tracing::info!(id = %existing.id, file_name, "duplicate content, skipping");
                self.notifier.notify(
                    NotifyLevel::Info,
                    &format!("\"{}\" já está na base de conhecimento", file_name),
                );
                return existing;
            }
        }

        let doc = Document {
            id: String::new(),
            title: file_name.to_string(),
            word_count: word_count(&content),
            content,
            doc_type,
            original_type: mime.to_string(),
            upload_date: chrono::Utc::now().to_rfc3339(),
            tags: Vec::new(),
            size: bytes.len() as u64,
            last_reprocessed: None,
            content_hash: hash,
        };
        self.add_document(doc).await
    }

    fn extract_content(&self, file_name: &str, mime: &str, bytes: &[u8]) -> (String, DocumentType) {
        let lower = file_name.to_lowercase();
        if mime == extract::MIME_PDF || lower.ends_with(".pdf") {
            let extraction = self.pdf.extract(bytes);
            if extraction.confidence == Confidence::Low {
                tracing::warn!(file_name, extractor = self.pdf.name(), "unreliable PDF extraction");
                self.notifier.notify(
                    NotifyLevel::Warning,
                    &format!("Texto de \"{}\" extraído com baixa confiabilidade", file_name),
                );
            }
            return (extraction.text, DocumentType::Pdf);
        }
        if mime.starts_with("text/") || lower.ends_with(".txt") || lower.ends_with(".md") {
            return (String::from_utf8_lossy(bytes).into_owned(), DocumentType::Text);
        }
        if mime == extract::MIME_DOCX || lower.ends_with(".docx") {
            match extract::extract_docx(bytes) {
                Ok(text) => return (text, DocumentType::Document),
                Err(e) => tracing::warn!(file_name, "falling back to raw text: {}", e),
            }
        }
        (String::from_utf8_lossy(bytes).into_owned(), DocumentType::Unknown)
    }

    /// Ingest a file, or every matching file under a directory.
    ///
    /// Each file's outcome is reported on its own; one failure does not stop
    /// the rest. Errors only for an unreadable or unwalkable root.
    pub async fn ingest_path(&self, path: &Path) -> Result<Vec<IngestOutcome>> {
        let files = if path.is_dir() {
            scan_directory(path, &self.ingest)?
        } else {
            vec![path.to_path_buf()]
        };

        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let result = self.ingest_file(&file).await;
            if let Err(e) = &result {
                tracing::warn!(path = %file.display(), "ingest failed: {:#}", e);
            }
            outcomes.push(IngestOutcome { path: file, result });
        }
        Ok(outcomes)
    }

    // ============ Retrieval ============

    /// Keyword search over every chunk.
    ///
    /// Each whitespace token of the lowercased query that occurs as a
    /// substring of the lowercased chunk adds one point. Chunks scoring zero
    /// are dropped; ties keep chunk order.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let corpus = self.corpus();
        score_chunks(corpus.chunks.iter(), query)
    }

    /// [`KnowledgeStore::search`] restricted to one document's chunks.
    pub fn search_document(&self, doc_id: &str, query: &str) -> Vec<SearchHit> {
        let corpus = self.corpus();
        score_chunks(
            corpus.chunks.iter().filter(|c| c.source_id == doc_id),
            query,
        )
    }

    /// Technique lookup used by course imports.
    ///
    /// Scores +10 for the exact phrase, +2 per query term, and +1 per
    /// Krav Maga pattern word found in the chunk.
    pub fn search_technique(&self, name: &str, max_results: usize) -> TechniqueSearch {
        let phrase = name.to_lowercase();
        let terms: Vec<&str> = phrase.split_whitespace().collect();

        let corpus = self.corpus();
        let mut hits: Vec<TechniqueHit> = corpus
            .chunks
            .iter()
            .filter_map(|chunk| {
                let content = chunk.content.to_lowercase();
                let mut score = 0u32;
                let mut matches = Vec::new();

                if !phrase.trim().is_empty() && content.contains(phrase.as_str()) {
                    score += 10;
                    matches.push("exact_phrase".to_string());
                }
                for term in &terms {
                    if content.contains(term) {
                        score += 2;
                        matches.push(term.to_string());
                    }
                }
                for pattern in KRAV_PATTERNS {
                    if content.contains(pattern) {
                        score += 1;
                        matches.push(format!("pattern_{}", pattern));
                    }
                }

                (score > 0).then(|| TechniqueHit {
                    chunk: chunk.clone(),
                    score,
                    matches,
                    relevance: relevance(score),
                })
            })
            .collect();
        drop(corpus);

        hits.sort_by(|a, b| b.score.cmp(&a.score));
        let total_found = hits.len();
        hits.truncate(max_results);

        TechniqueSearch {
            query: name.to_string(),
            results: hits,
            total_found,
        }
    }

    // ============ Inspection ============

    pub fn documents(&self) -> Vec<Document> {
        self.corpus().documents.clone()
    }

    pub fn chunks(&self) -> Vec<Chunk> {
        self.corpus().chunks.clone()
    }

    pub fn get_document(&self, id: &str) -> Option<Document> {
        self.corpus().documents.iter().find(|d| d.id == id).cloned()
    }

    pub fn stats(&self) -> KnowledgeStats {
        let corpus = self.corpus();
        KnowledgeStats {
            total_items: corpus.documents.len(),
            total_chunks: corpus.chunks.len(),
            total_documents: corpus.documents.len(),
        }
    }
}

fn regenerate_chunks(documents: &[Document], max_chars: usize) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| chunk_document(doc, max_chars))
        .collect()
}

fn score_chunks<'a>(chunks: impl Iterator<Item = &'a Chunk>, query: &str) -> Vec<SearchHit> {
    let query = query.to_lowercase();
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = chunks
        .filter_map(|chunk| {
            let content = chunk.content.to_lowercase();
            let score = tokens.iter().filter(|t| content.contains(*t)).count() as u32;
            (score > 0).then(|| SearchHit {
                chunk: chunk.clone(),
                score,
            })
        })
        .collect();

    // sort_by is stable: equal scores keep chunk order.
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits
}

fn relevance(score: u32) -> Relevance {
    if score > 5 {
        Relevance::High
    } else if score > 2 {
        Relevance::Medium
    } else {
        Relevance::Low
    }
}

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}
