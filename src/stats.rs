//! Knowledge base statistics.
//!
//! Summarises what is indexed: document and chunk counts, a per-type
//! breakdown, and when the last document arrived. Used by `dojo stats`.

use anyhow::Result;

use crate::models::{Document, DocumentType};
use crate::service::RagService;

/// Per-type breakdown of documents, chunks, and words.
#[derive(Debug, Default, PartialEq, Eq)]
struct TypeStats {
    doc_count: usize,
    chunk_count: usize,
    word_count: usize,
}

/// Run the stats command: summarise the corpus and print it.
pub async fn run_stats(service: &RagService) -> Result<()> {
    let stats = service.stats();
    let documents = service.knowledge().documents();
    let chunks = service.knowledge().chunks();
    let storage_path = &service.config().storage.path;

    let db_size = std::fs::metadata(storage_path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Dojo: Knowledge Base Stats");
    println!("===========================");
    println!();
    println!("  Storage:     {}", storage_path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", stats.total_documents);
    println!("  Chunks:      {}", stats.total_chunks);
    if let Some(latest) = latest_upload(&documents) {
        println!("  Last upload: {}", format_ts_relative(latest));
    }

    let by_type: Vec<(DocumentType, TypeStats)> = [
        DocumentType::Pdf,
        DocumentType::Text,
        DocumentType::Document,
        DocumentType::Unknown,
    ]
    .into_iter()
    .map(|doc_type| {
        let docs: Vec<&Document> = documents.iter().filter(|d| d.doc_type == doc_type).collect();
        let type_stats = TypeStats {
            doc_count: docs.len(),
            chunk_count: chunks.iter().filter(|c| c.doc_type == doc_type).count(),
            word_count: docs.iter().map(|d| d.word_count).sum(),
        };
        (doc_type, type_stats)
    })
    .filter(|(_, s)| s.doc_count > 0)
    .collect();

    if !by_type.is_empty() {
        println!();
        println!("  By type:");
        println!("  {:<12} {:>6} {:>8} {:>10}", "TYPE", "DOCS", "CHUNKS", "WORDS");
        println!("  {}", "-".repeat(40));
        for (doc_type, s) in &by_type {
            println!(
                "  {:<12} {:>6} {:>8} {:>10}",
                doc_type.as_str(),
                s.doc_count,
                s.chunk_count,
                s.word_count
            );
        }
    }

    println!();
    Ok(())
}

fn latest_upload(documents: &[Document]) -> Option<i64> {
    documents
        .iter()
        .filter_map(|d| chrono::DateTime::parse_from_rfc3339(&d.upload_date).ok())
        .map(|dt| dt.timestamp())
        .max()
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;
    if delta < 0 {
        return format_ts_iso(ts);
    }

    let plural = |n: i64| if n == 1 { "" } else { "s" };
    match delta {
        d if d < 60 => "just now".to_string(),
        d if d < 3600 => format!("{} min{} ago", d / 60, plural(d / 60)),
        d if d < 86400 => format!("{} hour{} ago", d / 3600, plural(d / 3600)),
        d if d < 86400 * 30 => format!("{} day{} ago", d / 86400, plural(d / 86400)),
        _ => format_ts_iso(ts),
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_ts_relative() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 3600), "1 hour ago");
        assert_eq!(format_ts_relative(now - 3 * 86400), "3 days ago");
    }

    #[test]
    fn test_latest_upload_ignores_bad_dates() {
        let mut a = Document {
            id: "a".to_string(),
            title: "a".to_string(),
            content: String::new(),
            doc_type: DocumentType::Text,
            original_type: String::new(),
            upload_date: "2024-01-01T00:00:00Z".to_string(),
            tags: vec![],
            size: 0,
            word_count: 0,
            last_reprocessed: None,
            content_hash: String::new(),
        };
        let mut b = a.clone();
        b.upload_date = "ontem".to_string();
        assert_eq!(latest_upload(&[a.clone(), b]), Some(1704067200));
        a.upload_date = "x".to_string();
        assert_eq!(latest_upload(&[a]), None);
    }
}
