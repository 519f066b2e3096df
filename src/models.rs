//! Core data types flowing through the ingestion and question-answering
//! pipeline.

use serde::{Deserialize, Serialize};

/// Metadata stored alongside each chunk in the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path of the PDF the chunk was extracted from.
    pub source: String,
    /// Zero-based position of the chunk within its source document.
    pub chunk: i64,
}

/// Ranked output of a similarity query: parallel vectors in rank order.
///
/// A store may omit metadata for a chunk; alignment with `documents` is
/// preserved by keeping the slot as `None`. Never persisted; rebuilt per
/// request.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub documents: Vec<String>,
    pub metadatas: Vec<Option<ChunkMetadata>>,
    pub ids: Vec<String>,
}

/// One entry of the `sources` array returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: Option<String>,
    pub source: Option<String>,
    pub chunk_index: Option<i64>,
    /// First 500 characters of the chunk text, with `...` appended when the
    /// chunk is longer.
    pub preview: String,
}

/// Structured output of one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    /// Wall-clock duration of the retrieve-to-generate span.
    pub latency_seconds: f64,
}
