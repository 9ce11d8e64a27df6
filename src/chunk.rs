//! Token-budget text chunker.
//!
//! Splits document text into [`Segment`]s that respect a configurable
//! `max_tokens` limit. Splitting occurs on paragraph boundaries (`\n\n`)
//! first, with a word-level split for paragraphs that exceed the budget
//! on their own, so segments never overlap and reassemble to the source
//! text under whitespace normalization.
//!
//! Token counting is pluggable: the exact tokenizer is an external
//! collaborator, so the chunker only sees a [`TokenCounter`] function.

use anyhow::{bail, Result};

use crate::models::{Document, Segment};

/// Approximate chars-per-token ratio for the heuristic counter.
const CHARS_PER_TOKEN: usize = 4;

/// Counts approximate tokens in a piece of text.
pub type TokenCounter = fn(&str) -> usize;

/// Resolve a token counter by its configured name.
pub fn counter_for(name: &str) -> Result<TokenCounter> {
    match name {
        "heuristic" => Ok(heuristic_tokens),
        "whitespace" => Ok(whitespace_tokens),
        other => bail!("Unknown tokenizer: '{}'. Must be heuristic or whitespace.", other),
    }
}

/// Character-count heuristic: one token per ~4 characters, rounded up.
pub fn heuristic_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// One token per whitespace-separated word.
pub fn whitespace_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split a document into segments of at most `max_tokens` tokens each.
/// Returns segments with contiguous indices starting at 0.
///
/// A document that fits within the budget yields exactly one segment.
pub fn split_document(
    document: &Document,
    max_tokens: usize,
    count: TokenCounter,
) -> Result<Vec<Segment>> {
    if max_tokens == 0 {
        bail!("chunking.max_tokens must be > 0");
    }

    let mut texts: Vec<String> = Vec::new();
    let mut current_buf = String::new();

    for para in document.text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // If adding this paragraph would exceed the budget, flush first
        let would_be = if current_buf.is_empty() {
            count(trimmed)
        } else {
            count(&current_buf) + count(trimmed)
        };

        if would_be > max_tokens && !current_buf.is_empty() {
            texts.push(std::mem::take(&mut current_buf));
        }

        if count(trimmed) > max_tokens {
            // A single paragraph over budget: pack words greedily instead
            if !current_buf.is_empty() {
                texts.push(std::mem::take(&mut current_buf));
            }
            texts.extend(split_words(trimmed, max_tokens, count));
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        texts.push(current_buf);
    }

    // Guarantee at least one segment
    if texts.is_empty() {
        texts.push(document.text.trim().to_string());
    }

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Segment {
            source: document.source.clone(),
            index,
            text,
        })
        .collect())
}

/// Greedily pack whitespace-separated words into pieces of at most
/// `max_tokens` tokens. A single word over the budget becomes its own
/// piece, since there is no smaller boundary to split on.
fn split_words(text: &str, max_tokens: usize, count: TokenCounter) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if count(&candidate) > max_tokens && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
