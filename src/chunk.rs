//! Sentence-boundary text chunker and PDF text cleanup.
//!
//! [`clean_text`] normalizes extracted PDF text: collapses blank-line runs,
//! strips `Page <n>` artifacts and bare page-number lines, and squeezes
//! whitespace runs to single spaces. Cleaning is idempotent.
//!
//! [`chunk_text`] splits cleaned text into segments of at most `chunk_size`
//! characters. Sentences are accumulated into the current chunk until the
//! next one would overflow; a sentence that alone exceeds the limit is
//! hard-sliced into exact `chunk_size`-character pieces. Inputs larger than
//! `hard_split_size` are pre-split into fixed blocks before sentence
//! splitting, so pathological documents never hold one giant sentence scan.
//!
//! Chunks carry no overlap. The `chunk_overlap` configuration field is
//! accepted for compatibility and ignored here.

use regex::Regex;
use std::sync::LazyLock;

static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("static regex"));
static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Page\s*\d+").expect("static regex"));
static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("static regex"));

/// Normalize raw PDF text for chunking and indexing.
///
/// Re-running on already-cleaned text is a no-op.
pub fn clean_text(text: &str) -> String {
    let text = MULTI_NEWLINE.replace_all(text, "\n");
    let text = PAGE_MARKER.replace_all(&text, "");

    // Drop lines that are only a page number.
    let text = text
        .lines()
        .filter(|line| !is_bare_number(line))
        .collect::<Vec<_>>()
        .join("\n");

    let text = MULTI_SPACE.replace_all(&text, " ");
    text.trim().to_string()
}

fn is_bare_number(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Split text into sentences on terminal punctuation followed by whitespace.
///
/// A deliberately small stand-in for a full sentence segmenter; adequate for
/// cleaned prose. Text without terminal punctuation is one sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut after_terminal = false;

    for (i, c) in text.char_indices() {
        if after_terminal && c.is_whitespace() {
            let sentence = text[start..i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = i + c.len_utf8();
            after_terminal = false;
            continue;
        }
        after_terminal = matches!(c, '.' | '!' | '?');
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Split cleaned text into chunks of at most `chunk_size` characters.
///
/// Returns chunks in input order, covering the input with no loss: joining
/// the output with single spaces reconstructs the cleaned text, except
/// across hard-sliced pieces of an oversized sentence, which concatenate
/// directly.
pub fn chunk_text(text: &str, chunk_size: usize, hard_split_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    if text.is_empty() {
        return chunks;
    }
    for block in split_at_chars(text, hard_split_size) {
        chunk_block(block, chunk_size, &mut chunks);
    }
    chunks
}

fn chunk_block(block: &str, chunk_size: usize, chunks: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(block) {
        let sentence_len = sentence.chars().count();

        if sentence_len > chunk_size {
            // Flush first so the slices land in document order.
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            for piece in split_at_chars(sentence, chunk_size) {
                chunks.push(piece.to_string());
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(sentence);
            current_len = sentence_len;
        } else if current_len + 1 + sentence_len <= chunk_size {
            current.push(' ');
            current.push_str(sentence);
            current_len += 1 + sentence_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(sentence);
            current_len = sentence_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
}

/// Cut a string into consecutive pieces of at most `max_chars` characters,
/// respecting UTF-8 boundaries. The final piece may be shorter.
fn split_at_chars(s: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (i, _) in s.char_indices() {
        if count == max_chars {
            pieces.push(&s[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < s.len() {
        pieces.push(&s[start..]);
    }
    pieces
}
