//! `dojo ingest`: add files and directories to the knowledge base.

use std::path::PathBuf;

use anyhow::Result;

use crate::service::RagService;

/// Ingest every path, printing one line per file. Returns the failure count.
pub async fn run_ingest(service: &RagService, paths: &[PathBuf]) -> Result<usize> {
    let mut added = 0usize;
    let mut failed = 0usize;

    for path in paths {
        let outcomes = match service.ingest(path).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                eprintln!("  ✗ {}: {:#}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        if outcomes.is_empty() {
            println!("  - {}: no matching files", path.display());
        }

        for outcome in outcomes {
            match outcome.result {
                Ok(doc) => {
                    added += 1;
                    println!(
                        "  ✓ {} → {} ({}, {} words)",
                        outcome.path.display(),
                        doc.id,
                        doc.doc_type.as_str(),
                        doc.word_count
                    );
                }
                Err(e) => {
                    failed += 1;
                    eprintln!("  ✗ {}: {:#}", outcome.path.display(), e);
                }
            }
        }
    }

    let stats = service.stats();
    println!();
    println!(
        "Ingest complete: {} ingested, {} failed ({} documents, {} chunks total)",
        added, failed, stats.total_documents, stats.total_chunks
    );
    Ok(failed)
}
