//! Offline ingestion: scan, extract, clean, chunk, index.
//!
//! Runs out-of-band from the query path. Per-file extraction failures are
//! logged and skipped; a store failure aborts the run. Re-running against a
//! populated collection appends new ids rather than replacing old ones, so
//! deployers re-ingesting from scratch should drop the collection first.

use anyhow::Result;
use tracing::warn;

use crate::chunk::{chunk_text, clean_text};
use crate::config::Config;
use crate::extract;
use crate::models::ChunkMetadata;
use crate::scan;
use crate::store::VectorStore;

pub async fn run_ingest(
    config: &Config,
    store: &dyn VectorStore,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mut files = scan::scan_pdfs(&config.documents)?;
    if let Some(lim) = limit {
        files.truncate(lim);
    }

    if files.is_empty() {
        println!(
            "No PDFs found under {}",
            config.documents.root.display()
        );
        return Ok(());
    }

    println!("Found {} PDFs. Starting ingestion...", files.len());

    // Ids are doc_<n> with one counter across the whole run, matching the
    // scan order.
    let mut id_counter = 0u64;
    let mut files_indexed = 0u64;
    let mut files_skipped = 0u64;
    let mut chunks_written = 0u64;

    for file in &files {
        let raw = match extract::extract_pdf_file(&file.path) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to read {}: {}", file.path.display(), e);
                files_skipped += 1;
                continue;
            }
        };

        let text = clean_text(&raw);
        if text.is_empty() {
            println!("  {} -> no extractable text, skipping", file.relative);
            files_skipped += 1;
            continue;
        }

        let chunks = chunk_text(
            &text,
            config.chunking.chunk_size,
            config.chunking.hard_split_size,
        );

        if dry_run {
            println!("  {} -> {} chunks (dry-run)", file.relative, chunks.len());
            files_indexed += 1;
            chunks_written += chunks.len() as u64;
            id_counter += chunks.len() as u64;
            continue;
        }

        let source = file.path.display().to_string();
        let mut metadatas = Vec::with_capacity(chunks.len());
        let mut ids = Vec::with_capacity(chunks.len());
        for chunk_index in 0..chunks.len() {
            metadatas.push(ChunkMetadata {
                source: source.clone(),
                chunk: chunk_index as i64,
            });
            ids.push(format!("doc_{}", id_counter));
            id_counter += 1;
        }

        store.add(&chunks, &metadatas, &ids).await?;

        println!("  {} -> {} chunks", file.relative, chunks.len());
        files_indexed += 1;
        chunks_written += chunks.len() as u64;
    }

    println!("ingest");
    println!("  pdfs found: {}", files.len());
    println!("  pdfs indexed: {}", files_indexed);
    println!("  pdfs skipped: {}", files_skipped);
    if dry_run {
        println!("  estimated chunks: {}", chunks_written);
    } else {
        println!("  chunks written: {}", chunks_written);
    }
    println!("ok");

    Ok(())
}
