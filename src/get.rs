//! `dojo list` and `dojo get`: inspect stored documents.

use anyhow::{bail, Result};

use crate::service::RagService;

pub fn run_list(service: &RagService) -> Result<()> {
    let documents = service.knowledge().documents();
    if documents.is_empty() {
        println!("Knowledge base is empty.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<8} {:>7}  {:<10}  TITLE",
        "ID", "TYPE", "WORDS", "UPLOADED"
    );
    for doc in &documents {
        let uploaded = chrono::DateTime::parse_from_rfc3339(&doc.upload_date)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| doc.upload_date.clone());
        println!(
            "{:<36}  {:<8} {:>7}  {:<10}  {}",
            doc.id,
            doc.doc_type.as_str(),
            doc.word_count,
            uploaded,
            doc.title
        );
    }
    Ok(())
}

pub fn run_get(service: &RagService, id: &str) -> Result<()> {
    let Some(doc) = service.knowledge().get_document(id) else {
        bail!("Document not found: {}", id);
    };
    let chunks: Vec<_> = service
        .knowledge()
        .chunks()
        .into_iter()
        .filter(|c| c.source_id == doc.id)
        .collect();

    println!("--- Document ---");
    println!("id:            {}", doc.id);
    println!("title:         {}", doc.title);
    println!("type:          {} ({})", doc.doc_type.as_str(), doc.original_type);
    println!("uploaded:      {}", doc.upload_date);
    if let Some(ts) = &doc.last_reprocessed {
        println!("reprocessed:   {}", ts);
    }
    println!("size:          {} bytes", doc.size);
    println!("words:         {}", doc.word_count);
    if !doc.tags.is_empty() {
        println!("tags:          {}", doc.tags.join(", "));
    }
    println!("content_hash:  {}", doc.content_hash);
    println!();

    println!("--- Content ---");
    println!("{}", doc.content);
    println!();

    println!("--- Chunks ({}) ---", chunks.len());
    for chunk in &chunks {
        println!("[{}]", chunk.id);
        println!("{}", chunk.content);
        println!();
    }
    Ok(())
}
