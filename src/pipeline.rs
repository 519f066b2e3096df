//! End-to-end question answering pipeline.
//!
//! One invocation is strictly linear: retrieve top-k chunks, join and
//! truncate the context, build the prompt, call the generator, shape the
//! response. No retries and no partial results; the first error propagates
//! to the caller. Latency covers the whole span, measured here rather than
//! in the HTTP layer.

use anyhow::Result;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::generate::{extract_answer, Generator};
use crate::models::{RagResponse, RetrievalResult, SourceRef};
use crate::store::VectorStore;

/// Characters of chunk text included in each source preview.
const PREVIEW_CHARS: usize = 500;

/// Build the generation prompt from truncated context and the raw question.
/// The template ends with the `Answer:` marker that answer extraction keys
/// off when a backend echoes its prompt.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant.\n\
         \n\
         Answer the question using ONLY the provided context.\n\
         If the answer is not in the context, say so clearly.\n\
         Do not mention page numbers.\n\
         Write a complete and well-structured answer.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Answer:"
    )
}

/// Run retrieval, prompt assembly, and generation for one question.
///
/// `top_k` overrides `retrieval.top_k` when given (the CLI exposes this;
/// the HTTP endpoint always uses the configured value).
pub async fn run(
    store: &dyn VectorStore,
    generator: &dyn Generator,
    retrieval: &RetrievalConfig,
    question: &str,
    top_k: Option<usize>,
) -> Result<RagResponse> {
    let start = Instant::now();

    let k = top_k.unwrap_or(retrieval.top_k);
    let results = store.query(question, k).await?;

    let context = truncate_chars(
        &results.documents.join("\n\n"),
        retrieval.max_context_chars,
    );
    let prompt = build_prompt(&context, question);

    let decoded = generator.generate(&prompt).await?;
    let answer = extract_answer(&decoded).to_string();

    Ok(RagResponse {
        answer,
        sources: shape_sources(&results),
        latency_seconds: start.elapsed().as_secs_f64(),
    })
}

/// Turn retrieval output into client-facing source references, preserving
/// rank order. Missing metadata or ids degrade to `None` fields.
fn shape_sources(results: &RetrievalResult) -> Vec<SourceRef> {
    results
        .documents
        .iter()
        .enumerate()
        .map(|(i, document)| {
            let metadata = results.metadatas.get(i).and_then(|m| m.as_ref());
            SourceRef {
                id: results.ids.get(i).cloned(),
                source: metadata.map(|m| m.source.clone()),
                chunk_index: metadata.map(|m| m.chunk),
                preview: preview(document),
            }
        })
        .collect()
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Blunt character-budget cut; may land mid-sentence but never inside a
/// code point.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
