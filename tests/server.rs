//! In-process HTTP tests for the `/ask` and `/health` endpoints.
//!
//! The router is driven directly with substitute store and generator
//! handles, so no network services are needed.

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::util::ServiceExt;

use askdocs::config::{self, Config};
use askdocs::generate::Generator;
use askdocs::models::{ChunkMetadata, RetrievalResult};
use askdocs::server::{build_router, AppState};
use askdocs::store::VectorStore;

const TEST_CONFIG: &str = r#"
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

fn test_config() -> Config {
    config::parse_config(TEST_CONFIG).unwrap()
}

/// Store handle pre-seeded with fixed ranked chunks.
struct SeededStore {
    result: RetrievalResult,
}

#[async_trait]
impl VectorStore for SeededStore {
    async fn add(&self, _: &[String], _: &[ChunkMetadata], _: &[String]) -> Result<()> {
        Ok(())
    }

    async fn query(&self, _text: &str, _k: usize) -> Result<RetrievalResult> {
        Ok(self.result.clone())
    }
}

struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn add(&self, _: &[String], _: &[ChunkMetadata], _: &[String]) -> Result<()> {
        Err(anyhow::anyhow!("connection refused"))
    }

    async fn query(&self, _: &str, _: usize) -> Result<RetrievalResult> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

/// Generator handle that echoes its prompt and appends a completion, the
/// way small instruction-tuned models tend to.
struct EchoingGenerator {
    completion: String,
}

#[async_trait]
impl Generator for EchoingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(format!("{} {}", prompt, self.completion))
    }
}

fn state_with(store: Arc<dyn VectorStore>, generator: Arc<dyn Generator>) -> AppState {
    AppState {
        config: Arc::new(test_config()),
        store,
        generator,
    }
}

async fn post_ask(state: AppState, body: &str) -> (StatusCode, serde_json::Value) {
    let app = build_router(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ask")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn ask_answers_from_seeded_store() {
    let fact = "A goroutine is a lightweight thread managed by the Go runtime.";
    let store = Arc::new(SeededStore {
        result: RetrievalResult {
            documents: vec![fact.to_string()],
            metadatas: vec![Some(ChunkMetadata {
                source: "/data/pdfs/go-concurrency.pdf".to_string(),
                chunk: 3,
            })],
            ids: vec!["doc_17".to_string()],
        },
    });
    let generator = Arc::new(EchoingGenerator {
        completion: fact.to_string(),
    });

    let (status, json) = post_ask(
        state_with(store, generator),
        r#"{"question": "What is a goroutine?"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let answer = json["answer"].as_str().unwrap();
    assert!(answer.contains(fact), "unexpected answer: {}", answer);

    let sources = json["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["id"], "doc_17");
    assert_eq!(sources[0]["source"], "/data/pdfs/go-concurrency.pdf");
    assert_eq!(sources[0]["chunk_index"], 3);
    assert_eq!(sources[0]["preview"], fact);

    assert!(json["latency"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn empty_question_is_bad_request() {
    let store = Arc::new(SeededStore {
        result: RetrievalResult::default(),
    });
    let generator = Arc::new(EchoingGenerator {
        completion: "unused".to_string(),
    });

    let (status, json) = post_ask(state_with(store, generator), r#"{"question": "   "}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let generator = Arc::new(EchoingGenerator {
        completion: "unused".to_string(),
    });

    let (status, json) = post_ask(
        state_with(Arc::new(FailingStore), generator),
        r#"{"question": "anything"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "internal");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn health_reports_ok() {
    let store = Arc::new(SeededStore {
        result: RetrievalResult::default(),
    });
    let generator = Arc::new(EchoingGenerator {
        completion: "unused".to_string(),
    });

    let app = build_router(state_with(store, generator));
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
}
