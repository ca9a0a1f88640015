//! Knowledge base behaviour against the real SQLite backend.

use std::path::Path;

use tempfile::TempDir;

use dojo_rag::config::Config;
use dojo_rag::models::{Document, DocumentType};
use dojo_rag::service::RagService;

fn test_config(root: &Path) -> Config {
    let mut config = Config::minimal();
    config.storage.path = root.join("data").join("dojo.sqlite");
    config.gateway.enabled = false;
    config
}

fn document(title: &str, content: &str) -> Document {
    Document {
        id: String::new(),
        title: title.to_string(),
        content: content.to_string(),
        doc_type: DocumentType::Text,
        original_type: "text/plain".to_string(),
        upload_date: "2026-01-10T12:00:00+00:00".to_string(),
        tags: vec!["faixa-branca".to_string()],
        size: content.len() as u64,
        word_count: content.split_whitespace().count(),
        last_reprocessed: None,
        content_hash: String::new(),
    }
}

/// Twelve 100-character sentences; only the last four mention `keyword`.
fn twelve_sentences(keyword: &str) -> String {
    (0..12)
        .map(|i| {
            let word = if i >= 8 { keyword } else { "texto" };
            format!("{:x<99}.", word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::test]
async fn test_search_on_fresh_database_is_empty() {
    let tmp = TempDir::new().unwrap();
    let service = RagService::init(test_config(tmp.path())).await.unwrap();

    assert!(service.search("qualquer coisa").is_empty());
    assert_eq!(service.stats().total_chunks, 0);

    let response = service.query("qualquer coisa").await;
    assert!(response.success);
    assert_eq!(response.sources.documents, 0);
    service.shutdown().await;
}

#[tokio::test]
async fn test_corpus_survives_restart() {
    let tmp = TempDir::new().unwrap();

    let service = RagService::init(test_config(tmp.path())).await.unwrap();
    let kept = service
        .add_document(document("Defesas", "Defesa contra soco direto. Esquiva lateral."))
        .await;
    let dropped = service
        .add_document(document("Rascunho", "Anotações temporárias."))
        .await;
    assert!(service.remove_document(&dropped.id).await);
    let chunks_before = service.knowledge().chunks();
    service.shutdown().await;

    let reopened = RagService::init(test_config(tmp.path())).await.unwrap();
    let documents = reopened.knowledge().documents();
    assert_eq!(documents, vec![kept.clone()]);
    assert_eq!(reopened.knowledge().chunks(), chunks_before);
    assert_eq!(reopened.search("esquiva").len(), 1);
    reopened.shutdown().await;
}

#[tokio::test]
async fn test_long_document_is_chunked_on_sentence_boundaries() {
    let tmp = TempDir::new().unwrap();
    let service = RagService::init(test_config(tmp.path())).await.unwrap();

    let doc = service
        .add_document(document("Apostila", &twelve_sentences("cotovelada")))
        .await;

    let chunks = service.knowledge().chunks();
    let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
    assert_eq!(
        ids,
        vec![
            format!("{}_0", doc.id),
            format!("{}_1", doc.id),
            format!("{}_2", doc.id),
        ]
    );
    for chunk in &chunks {
        assert!(chunk.content.chars().count() <= 500);
        assert!(chunk.content.ends_with('.'));
        assert_eq!(chunk.source_title, "Apostila");
        assert_eq!(chunk.tags, vec!["faixa-branca".to_string()]);
    }

    let hits = service.search("cotovelada");
    assert_eq!(hits.len(), 1);
    assert!(hits[0].chunk.id.ends_with("_2"));
    service.shutdown().await;
}

#[tokio::test]
async fn test_chunks_are_always_derived_from_documents() {
    let tmp = TempDir::new().unwrap();
    let service = RagService::init(test_config(tmp.path())).await.unwrap();

    let a = service
        .add_document(document("A", "Primeira frase. Segunda frase."))
        .await;
    let b = service
        .add_document(document("B", &twelve_sentences("joelhada")))
        .await;
    assert_eq!(service.stats().total_chunks, 4);

    assert!(service.remove_document(&b.id).await);
    let chunks = service.knowledge().chunks();
    assert_eq!(chunks.len(), 1);
    assert!(chunks.iter().all(|c| c.source_id == a.id));

    assert!(!service.remove_document(&b.id).await);
    assert_eq!(service.reindex().await, 1);
    service.shutdown().await;
}

#[tokio::test]
async fn test_search_orders_by_score_then_chunk_order() {
    let tmp = TempDir::new().unwrap();
    let service = RagService::init(test_config(tmp.path())).await.unwrap();

    service
        .add_document(document("Um", "Chute frontal básico."))
        .await;
    service
        .add_document(document("Dois", "Chute frontal e soco cruzado."))
        .await;
    service
        .add_document(document("Tres", "Soco cruzado com giro."))
        .await;

    let hits = service.search("soco chute");
    let titles: Vec<&str> = hits.iter().map(|h| h.chunk.source_title.as_str()).collect();
    assert_eq!(titles, vec!["Dois", "Um", "Tres"]);
    assert_eq!(hits[0].score, 2);
    service.shutdown().await;
}

#[tokio::test]
async fn test_chat_history_is_replayed_after_restart() {
    let tmp = TempDir::new().unwrap();

    let service = RagService::init(test_config(tmp.path())).await.unwrap();
    service
        .add_document(document("Regras", "A faixa branca treina duas vezes por semana."))
        .await;
    {
        let session = service.chat().await;
        assert!(session.submit("   ").await.is_none());
        let reply = session.submit("faixa branca").await.unwrap();
        assert!(reply.contains("Regras"), "{}", reply);
        assert_eq!(session.history().len(), 1);
    }
    service.shutdown().await;

    let reopened = RagService::init(test_config(tmp.path())).await.unwrap();
    let session = reopened.chat().await;
    let history = session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user, "faixa branca");
    assert!(session.transcript().len() >= 2);

    session.clear_history().await;
    assert!(session.history().is_empty());
    reopened.shutdown().await;
}

#[tokio::test]
async fn test_clear_removes_persisted_state() {
    let tmp = TempDir::new().unwrap();

    let service = RagService::init(test_config(tmp.path())).await.unwrap();
    service
        .add_document(document("Plano", "Plano de curso faixa branca."))
        .await;
    service.clear_knowledge().await;
    service.shutdown().await;

    let reopened = RagService::init(test_config(tmp.path())).await.unwrap();
    assert_eq!(reopened.stats().total_documents, 0);
    assert_eq!(reopened.stats().total_chunks, 0);
    reopened.shutdown().await;
}
