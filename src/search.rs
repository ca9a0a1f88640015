//! `dojo search`: print keyword or technique hits.

use anyhow::Result;

use crate::knowledge::DEFAULT_TECHNIQUE_RESULTS;
use crate::models::{Relevance, SearchHit};
use crate::service::RagService;

/// Hits shown by a plain search when `--limit` is not given.
pub const DEFAULT_SEARCH_RESULTS: usize = 20;

fn excerpt(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " ");
    let trimmed = flat.trim();
    if trimmed.chars().count() > max_chars {
        format!("{}...", trimmed.chars().take(max_chars).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

fn print_hit(rank: usize, hit: &SearchHit) {
    println!("{}. [{}] {}", rank, hit.score, hit.chunk.source_title);
    println!("    excerpt: \"{}\"", excerpt(&hit.chunk.content, 160));
    println!("    chunk: {}", hit.chunk.id);
    println!();
}

pub fn run_search(
    service: &RagService,
    query: &str,
    document: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let mut hits = match document {
        Some(doc_id) => service.knowledge().search_document(doc_id, query),
        None => service.search(query),
    };

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let total = hits.len();
    hits.truncate(limit.unwrap_or(DEFAULT_SEARCH_RESULTS));
    for (i, hit) in hits.iter().enumerate() {
        print_hit(i + 1, hit);
    }
    if total > hits.len() {
        println!("({} of {} matches shown)", hits.len(), total);
    }
    Ok(())
}

pub fn run_technique_search(
    service: &RagService,
    name: &str,
    limit: Option<usize>,
) -> Result<()> {
    let found = service
        .knowledge()
        .search_technique(name, limit.unwrap_or(DEFAULT_TECHNIQUE_RESULTS));

    if found.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in found.results.iter().enumerate() {
        let relevance = match hit.relevance {
            Relevance::High => "high",
            Relevance::Medium => "medium",
            Relevance::Low => "low",
        };
        println!(
            "{}. [{} {}] {}",
            i + 1,
            hit.score,
            relevance,
            hit.chunk.source_title
        );
        println!("    matches: {}", hit.matches.join(", "));
        println!("    excerpt: \"{}\"", excerpt(&hit.chunk.content, 160));
        println!();
    }
    println!("{} matching chunks", found.total_found);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_flattens_and_truncates() {
        assert_eq!(excerpt("  linha\num  ", 20), "linha um");
        assert_eq!(excerpt("abcdef", 3), "abc...");
    }
}
