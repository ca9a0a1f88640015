//! Core data models used throughout the knowledge base.
//!
//! These types represent the documents, chunks, search hits, and chat turns
//! that flow through ingestion, retrieval, and the chat surface. All of them
//! serialize with camelCase keys so the persisted JSON arrays keep the shape
//! the academy front-end has always stored.

use serde::{Deserialize, Serialize};

/// Coarse document kind assigned at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Text,
    Document,
    Unknown,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Text => "text",
            DocumentType::Document => "document",
            DocumentType::Unknown => "unknown",
        }
    }
}

/// An ingested document. Owned exclusively by the knowledge store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub original_type: String,
    pub upload_date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reprocessed: Option<String>,
    #[serde(default)]
    pub content_hash: String,
}

/// A slice of a document's content; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub source_id: String,
    pub source_title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Never computed; retrieval is keyword overlap only.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

/// A chunk matched by a keyword search, with its additive score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: u32,
}

/// Relevance bucket attached to technique search hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    Medium,
    Low,
}

/// A chunk matched by the technique search used by the course importer.
#[derive(Debug, Clone, Serialize)]
pub struct TechniqueHit {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: u32,
    pub matches: Vec<String>,
    pub relevance: Relevance,
}

/// One question/answer exchange of the chat surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
    pub timestamp: String,
    #[serde(default)]
    pub intent: Option<String>,
}

/// Corpus counters shown by `dojo stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KnowledgeStats {
    pub total_items: usize,
    pub total_chunks: usize,
    pub total_documents: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_serializes_camel_case() {
        let doc = Document {
            id: "d1".to_string(),
            title: "Aula 1".to_string(),
            content: "Conteúdo.".to_string(),
            doc_type: DocumentType::Text,
            original_type: "text/plain".to_string(),
            upload_date: "2024-01-01T00:00:00Z".to_string(),
            tags: vec![],
            size: 9,
            word_count: 1,
            last_reprocessed: None,
            content_hash: String::new(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["originalType"], "text/plain");
        assert_eq!(json["wordCount"], 1);
        assert!(json.get("lastReprocessed").is_none());
    }

    #[test]
    fn test_chunk_embedding_serializes_null() {
        let chunk = Chunk {
            id: "d1_0".to_string(),
            source_id: "d1".to_string(),
            source_title: "Aula 1".to_string(),
            content: "x".to_string(),
            doc_type: DocumentType::Pdf,
            tags: vec![],
            embedding: None,
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json["embedding"].is_null());
        assert_eq!(json["sourceId"], "d1");
    }

    #[test]
    fn test_search_hit_flattens_chunk() {
        let hit = SearchHit {
            chunk: Chunk {
                id: "d1_0".to_string(),
                source_id: "d1".to_string(),
                source_title: "t".to_string(),
                content: "c".to_string(),
                doc_type: DocumentType::Text,
                tags: vec![],
                embedding: None,
            },
            score: 2,
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["id"], "d1_0");
        assert_eq!(json["score"], 2);
    }
}
