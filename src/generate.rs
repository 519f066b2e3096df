//! Text generation backends and answer extraction.
//!
//! Decoding policy is uniform across backends: the configured `temperature`
//! is passed verbatim on every call, with `max_new_tokens` as the completion
//! budget. Setting `temperature = 0.0` yields greedy decoding; there is no
//! separate sampling switch.
//!
//! The decoded output is post-processed by [`extract_answer`]: backends that
//! echo the prompt produce the prompt's trailing `Answer:` marker in the
//! output, and only the text after its last occurrence is the answer.
//! Backends that do not echo return no marker, and the whole trimmed output
//! is passed through. Both paths are intended behavior.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::config::GenerationConfig;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const ANSWER_MARKER: &str = "Answer:";

#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the decoded completion for `prompt`. Returns the raw decoded
    /// text; marker stripping is the caller's job.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Locate the final `Answer:` marker and return what follows, trimmed.
/// Without a marker the whole output is returned trimmed.
pub fn extract_answer(decoded: &str) -> &str {
    match decoded.rfind(ANSWER_MARKER) {
        Some(pos) => decoded[pos + ANSWER_MARKER.len()..].trim(),
        None => decoded.trim(),
    }
}

/// Instantiate the backend named by `generation.provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaGenerator::new(config)?)),
        "openai" => Ok(Box::new(OpenAiGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

/// Bounded admission around a shared generation backend.
///
/// All requests funnel through `max_concurrent` semaphore permits, so a
/// burst of questions queues instead of contending for the one loaded
/// model behind the backend.
pub struct AdmissionControlled {
    inner: Box<dyn Generator>,
    permits: Semaphore,
}

impl AdmissionControlled {
    pub fn new(inner: Box<dyn Generator>, max_concurrent: usize) -> Self {
        Self {
            inner,
            permits: Semaphore::new(max_concurrent.max(1)),
        }
    }
}

#[async_trait]
impl Generator for AdmissionControlled {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let _permit = self.permits.acquire().await?;
        self.inner.generate(prompt).await
    }
}

// ============ Ollama backend ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    max_new_tokens: u32,
    temperature: f64,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: config.model.clone(),
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_new_tokens,
            },
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!("retrying Ollama generate call (attempt {})", attempt + 1);
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/generate", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let text = json
                            .get("response")
                            .and_then(|r| r.as_str())
                            .ok_or_else(|| {
                                anyhow::anyhow!("Invalid Ollama response: missing response field")
                            })?;
                        return Ok(text.to_string());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Ollama API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url,
                        e
                    ));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama generation failed after retries")))
    }
}

// ============ OpenAI backend ============

pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_new_tokens: u32,
    temperature: f64,
    max_retries: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.max_new_tokens,
            "temperature": self.temperature,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!("retrying OpenAI generate call (attempt {})", attempt + 1);
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let text = json
                            .pointer("/choices/0/message/content")
                            .and_then(|c| c.as_str())
                            .ok_or_else(|| {
                                anyhow::anyhow!("Invalid OpenAI response: missing message content")
                            })?;
                        return Ok(text.to_string());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("OpenAI generation failed after retries")))
    }
}
