//! Vector store boundary.
//!
//! The store is an opaque remote service: documents go in as (text,
//! metadata, id) triples, ranked documents come back for a query text. No
//! similarity threshold is applied; a query returns up to `k` results even
//! when none are relevant.
//!
//! [`ChromaStore`] speaks the Chroma HTTP API. Texts are embedded
//! client-side (see [`crate::embedding`]) and shipped alongside the
//! documents, so the server never has to run its own embedding function.
//! The collection is resolved once per process via `get_or_create` and the
//! id is cached for the lifetime of the handle.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::{EmbeddingConfig, StoreConfig};
use crate::embedding;
use crate::models::{ChunkMetadata, RetrievalResult};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add parallel (document, metadata, id) triples to the collection.
    /// Re-adding existing ids is the store's problem, not ours: ingestion
    /// never deduplicates.
    async fn add(
        &self,
        documents: &[String],
        metadatas: &[ChunkMetadata],
        ids: &[String],
    ) -> Result<()>;

    /// Top-`k` chunks by embedding similarity to `text`, best first.
    async fn query(&self, text: &str, k: usize) -> Result<RetrievalResult>;
}

pub struct ChromaStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    embedding: EmbeddingConfig,
    collection_id: OnceCell<String>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<String>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<ChunkMetadata>>>,
}

impl ChromaStore {
    pub fn new(store: &StoreConfig, embedding: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(store.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: store.base_url(),
            collection: store.collection.clone(),
            embedding: embedding.clone(),
            collection_id: OnceCell::new(),
        })
    }

    /// Resolve the collection id, creating the collection on first use.
    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/api/v1/collections", self.base_url);
                let response = self
                    .client
                    .post(&url)
                    .json(&serde_json::json!({
                        "name": self.collection,
                        "get_or_create": true,
                    }))
                    .send()
                    .await
                    .map_err(|e| {
                        anyhow::anyhow!(
                            "vector store connection error (is Chroma running at {}?): {}",
                            self.base_url,
                            e
                        )
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    anyhow::bail!("vector store error {}: {}", status, body);
                }

                let collection: CollectionResponse = response
                    .json()
                    .await
                    .context("Invalid collection response from vector store")?;
                Ok::<_, anyhow::Error>(collection.id)
            })
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn add(
        &self,
        documents: &[String],
        metadatas: &[ChunkMetadata],
        ids: &[String],
    ) -> Result<()> {
        anyhow::ensure!(
            documents.len() == metadatas.len() && documents.len() == ids.len(),
            "documents, metadatas, and ids must be the same length"
        );

        let collection_id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{}/add", self.base_url, collection_id);

        // One embedding call and one store call per batch.
        let batch_size = self.embedding.batch_size;
        for start in (0..documents.len()).step_by(batch_size) {
            let end = (start + batch_size).min(documents.len());
            let docs = &documents[start..end];
            let embeddings = embedding::embed_texts(&self.embedding, docs).await?;

            let response = self
                .client
                .post(&url)
                .json(&serde_json::json!({
                    "ids": &ids[start..end],
                    "embeddings": embeddings,
                    "documents": docs,
                    "metadatas": &metadatas[start..end],
                }))
                .send()
                .await
                .map_err(|e| {
                    anyhow::anyhow!(
                        "vector store connection error (is Chroma running at {}?): {}",
                        self.base_url,
                        e
                    )
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("vector store add failed ({}): {}", status, body);
            }
        }

        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<RetrievalResult> {
        let collection_id = self.collection_id().await?;
        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.base_url, collection_id
        );

        let query_embedding = embedding::embed_query(&self.embedding, text).await?;

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "query_embeddings": [query_embedding],
                "n_results": k,
                "include": ["documents", "metadatas"],
            }))
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "vector store connection error (is Chroma running at {}?): {}",
                    self.base_url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("vector store query failed ({}): {}", status, body);
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .context("Invalid query response from vector store")?;

        // One query text in, so only the first result row matters.
        Ok(RetrievalResult {
            documents: parsed.documents.into_iter().next().unwrap_or_default(),
            metadatas: parsed.metadatas.into_iter().next().unwrap_or_default(),
            ids: parsed.ids.into_iter().next().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_store(server: &MockServer) -> ChromaStore {
        let addr = server.address();
        let store_config = StoreConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            collection: "my_pdfs".to_string(),
            timeout_secs: 5,
        };
        let embedding_config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dims: None,
            url: Some(server.uri()),
            batch_size: 2,
            max_retries: 0,
            timeout_secs: 5,
        };
        ChromaStore::new(&store_config, &embedding_config).unwrap()
    }

    async fn mount_collection(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/collections"))
            .and(body_partial_json(serde_json::json!({
                "name": "my_pdfs",
                "get_or_create": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "col-1",
                "name": "my_pdfs",
            })))
            .mount(server)
            .await;
    }

    async fn mount_embed(server: &MockServer, count: usize) {
        let embeddings: Vec<Vec<f32>> = (0..count).map(|i| vec![i as f32, 1.0]).collect();
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": embeddings,
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn add_posts_batches() {
        let server = MockServer::start().await;
        mount_collection(&server).await;
        mount_embed(&server, 2).await;
        // batch_size = 2 and 4 documents: two add calls expected
        Mock::given(method("POST"))
            .and(path("/api/v1/collections/col-1/add"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!(true)))
            .expect(2)
            .mount(&server)
            .await;

        let store = test_store(&server);
        let documents: Vec<String> = (0..4).map(|i| format!("chunk {}", i)).collect();
        let metadatas: Vec<ChunkMetadata> = (0..4)
            .map(|i| ChunkMetadata {
                source: "a.pdf".to_string(),
                chunk: i,
            })
            .collect();
        let ids: Vec<String> = (0..4).map(|i| format!("doc_{}", i)).collect();

        store.add(&documents, &metadatas, &ids).await.unwrap();
    }

    #[tokio::test]
    async fn add_rejects_misaligned_input() {
        let server = MockServer::start().await;
        let store = test_store(&server);
        let err = store
            .add(&["a".to_string()], &[], &["doc_0".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("same length"));
    }

    #[tokio::test]
    async fn query_flattens_first_row() {
        let server = MockServer::start().await;
        mount_collection(&server).await;
        mount_embed(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/collections/col-1/query"))
            .and(body_partial_json(serde_json::json!({ "n_results": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ids": [["doc_4", "doc_9"]],
                "documents": [["first chunk", "second chunk"]],
                "metadatas": [[
                    { "source": "a.pdf", "chunk": 4 },
                    null
                ]],
            })))
            .mount(&server)
            .await;

        let store = test_store(&server);
        let result = store.query("question", 2).await.unwrap();
        assert_eq!(result.documents, vec!["first chunk", "second chunk"]);
        assert_eq!(result.ids, vec!["doc_4", "doc_9"]);
        assert_eq!(
            result.metadatas[0],
            Some(ChunkMetadata {
                source: "a.pdf".to_string(),
                chunk: 4
            })
        );
        assert!(result.metadatas[1].is_none());
    }

    #[tokio::test]
    async fn store_error_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/collections"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = test_store(&server);
        let err = store.query("q", 2).await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }
}
