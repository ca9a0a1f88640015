//! Sentence-boundary text chunker.
//!
//! Splits document content into [`Chunk`]s of at most `max_chars`
//! characters. Sentences end at runs of `.`, `!`, or `?`; there is no
//! abbreviation handling, so "Dr." ends a sentence like any other.
//!
//! # Algorithm
//!
//! 1. Cut the text after every terminator run, keeping the terminators.
//! 2. Trim each sentence and drop empty ones.
//! 3. Accumulate sentences (joined by a single space) until adding the next
//!    one would exceed `max_chars`, then flush and start a new chunk.
//! 4. A single sentence longer than `max_chars` becomes its own chunk,
//!    unsplit.
//!
//! Chunk ids are `<document id>_<index>`, so regenerating chunks for an
//! unchanged document always yields an identical chunk set.

use crate::models::{Chunk, Document};

/// Split text into sentence-aligned pieces of at most `max_chars` chars.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if current_len > 0 && current_len + 1 + sentence_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += sentence_len;
    }

    if current_len > 0 {
        chunks.push(current);
    }

    chunks
}

/// Derive the chunks of one document.
pub fn chunk_document(doc: &Document, max_chars: usize) -> Vec<Chunk> {
    chunk_text(&doc.content, max_chars)
        .into_iter()
        .enumerate()
        .map(|(index, content)| Chunk {
            id: format!("{}_{}", doc.id, index),
            source_id: doc.id.clone(),
            source_title: doc.title.clone(),
            content,
            doc_type: doc.doc_type,
            tags: doc.tags.clone(),
            embedding: None,
        })
        .collect()
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut in_terminator = false;

    for (pos, ch) in text.char_indices() {
        let is_terminator = matches!(ch, '.' | '!' | '?');
        if in_terminator && !is_terminator {
            push_trimmed(&mut sentences, &text[start..pos]);
            start = pos;
        }
        in_terminator = is_terminator;
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, piece: &'a str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}
