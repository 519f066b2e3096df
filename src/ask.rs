//! One-shot question answering from the command line.

use anyhow::Result;

use crate::config::Config;
use crate::generate::create_generator;
use crate::pipeline;
use crate::store::ChromaStore;

pub async fn run_ask(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("question must not be empty");
    }

    let store = ChromaStore::new(&config.store, &config.embedding)?;
    let generator = create_generator(&config.generation)?;

    let response = pipeline::run(
        &store,
        generator.as_ref(),
        &config.retrieval,
        question,
        top_k,
    )
    .await?;

    println!("{}", response.answer);

    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &response.sources {
            println!(
                "  [{}] {} (chunk {})",
                source.id.as_deref().unwrap_or("-"),
                source.source.as_deref().unwrap_or("unknown"),
                source
                    .chunk_index
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    println!();
    println!("latency: {:.2}s", response.latency_seconds);

    Ok(())
}
