use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub documents: DocumentsConfig,
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub collection: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `openai` or `ollama`.
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider. Ignored by the OpenAI provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `openai` or `ollama`.
    pub provider: String,
    pub model: String,
    /// Base URL for the Ollama provider. Ignored by the OpenAI provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    /// Passed verbatim to the backend on every call; 0.0 yields greedy
    /// decoding. There is no separate sampling on/off switch.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Permits for concurrent generation calls sharing one backend.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Parsed for compatibility with existing deployment configs. The
    /// sentence chunker applies no overlap between chunks.
    #[serde(default = "default_chunk_overlap")]
    #[allow(dead_code)]
    pub chunk_overlap: usize,
    /// Very large documents are pre-split into blocks of this many
    /// characters before sentence splitting.
    #[serde(default = "default_hard_split_size")]
    pub hard_split_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            hard_split_size: default_hard_split_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Joined context is cut to this many characters before prompt assembly.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    0
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_generation_timeout_secs() -> u64 {
    120
}
fn default_max_new_tokens() -> u32 {
    80
}
fn default_temperature() -> f64 {
    0.2
}
fn default_max_concurrent() -> usize {
    1
}
fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    100
}
fn default_hard_split_size() -> usize {
    50_000
}
fn default_top_k() -> usize {
    2
}
fn default_max_context_chars() -> usize {
    2000
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.hard_split_size < config.chunking.chunk_size {
        anyhow::bail!("chunking.hard_split_size must be >= chunking.chunk_size");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.max_context_chars == 0 {
        anyhow::bail!("retrieval.max_context_chars must be > 0");
    }

    // Validate store
    if config.store.host.is_empty() {
        anyhow::bail!("store.host must not be empty");
    }
    if config.store.collection.is_empty() {
        anyhow::bail!("store.collection must not be empty");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    if config.embedding.model.is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0 when set");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    if config.generation.model.is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }
    if config.generation.max_concurrent < 1 {
        anyhow::bail!("generation.max_concurrent must be >= 1");
    }
    if config.generation.temperature < 0.0 {
        anyhow::bail!("generation.temperature must be >= 0");
    }

    Ok(config)
}

/// Commented starting-point configuration written by `askdocs init`.
pub const EXAMPLE_CONFIG: &str = r#"[documents]
# Directory scanned recursively for PDFs at ingest time.
root = "~/pdfs"
include_globs = ["**/*.pdf"]
exclude_globs = []
follow_symlinks = false

[store]
# Chroma server hosting the vector collection.
host = "localhost"
port = 8000
collection = "my_pdfs"

[embedding]
# openai or ollama
provider = "ollama"
model = "nomic-embed-text"
url = "http://localhost:11434"
batch_size = 64

[generation]
# openai or ollama
provider = "ollama"
model = "tinyllama"
url = "http://localhost:11434"
max_new_tokens = 80
# Passed to the backend verbatim; 0.0 is greedy decoding.
temperature = 0.2
# Concurrent generation requests admitted against the shared backend.
max_concurrent = 1

[chunking]
chunk_size = 500
# Accepted but not applied by the sentence chunker.
chunk_overlap = 100
hard_split_size = 50000

[retrieval]
top_k = 2
max_context_chars = 2000

[server]
bind = "127.0.0.1:7080"
"#;

/// Write [`EXAMPLE_CONFIG`] to `path`, creating parent directories.
/// Refuses to overwrite an existing file.
pub fn scaffold_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[documents]
root = "/tmp/pdfs"

[store]
host = "localhost"
port = 8000
collection = "my_pdfs"

[embedding]
provider = "ollama"
model = "nomic-embed-text"

[generation]
provider = "ollama"
model = "tinyllama"

[server]
bind = "127.0.0.1:7080"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.documents.include_globs, vec!["**/*.pdf"]);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.chunking.hard_split_size, 50_000);
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(config.retrieval.max_context_chars, 2000);
        assert_eq!(config.generation.max_new_tokens, 80);
        assert_eq!(config.generation.max_concurrent, 1);
        assert_eq!(config.generation.max_retries, 0);
        assert!((config.generation.temperature - 0.2).abs() < 1e-9);
    }

    #[test]
    fn example_config_parses() {
        parse_config(EXAMPLE_CONFIG).unwrap();
    }

    #[test]
    fn store_base_url() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.store.base_url(), "http://localhost:8000");
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let bad = MINIMAL.to_string() + "\n[chunking]\nchunk_size = 0\n";
        assert!(parse_config(&bad).is_err());
    }

    #[test]
    fn hard_split_smaller_than_chunk_rejected() {
        let bad = MINIMAL.to_string() + "\n[chunking]\nchunk_size = 500\nhard_split_size = 100\n";
        assert!(parse_config(&bad).is_err());
    }

    #[test]
    fn unknown_embedding_provider_rejected() {
        let bad = MINIMAL.replace("provider = \"ollama\"\nmodel = \"nomic-embed-text\"", "provider = \"cohere\"\nmodel = \"x\"");
        assert!(parse_config(&bad).is_err());
    }

    #[test]
    fn zero_top_k_rejected() {
        let bad = MINIMAL.to_string() + "\n[retrieval]\ntop_k = 0\n";
        assert!(parse_config(&bad).is_err());
    }
}
