//! # askdocs
//!
//! A retrieval-augmented question answering service for local PDF
//! collections.
//!
//! PDFs are ingested out-of-band into a Chroma vector collection; at query
//! time the top-k chunks for a question are retrieved, assembled into a
//! fixed instruction prompt, and handed to a language model, which must
//! answer from that context alone.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────┐
//! │   PDFs   │──▶│   Ingestion    │──▶│  Chroma   │
//! │ (scan)   │   │ clean + chunk │   │ (vectors) │
//! └──────────┘   └───────────────┘   └────┬─────┘
//!                                         │ top-k
//!                                    ┌────▼─────┐   ┌───────────┐
//!                                    │ Pipeline │──▶│ Generator │
//!                                    │  prompt  │   │ (LLM API) │
//!                                    └────┬─────┘   └───────────┘
//!                                         │
//!                             ┌───────────┴───────┐
//!                             ▼                   ▼
//!                        ┌──────────┐       ┌──────────┐
//!                        │   CLI    │       │   HTTP   │
//!                        │(askdocs) │       │  (/ask)  │
//!                        └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! askdocs init                   # scaffold config
//! askdocs ingest                 # index PDFs into the vector store
//! askdocs ask "What is a goroutine?"
//! askdocs serve                  # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`scan`] | Recursive PDF discovery |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Text cleanup and sentence-boundary chunking |
//! | [`embedding`] | Embedding backends (openai, ollama) |
//! | [`store`] | Vector store boundary and Chroma client |
//! | [`generate`] | Generation backends and answer extraction |
//! | [`pipeline`] | Retrieve, prompt, generate, shape |
//! | [`ingest`] | Offline ingestion run |
//! | [`ask`] | One-shot CLI question answering |
//! | [`server`] | HTTP server |

pub mod ask;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod scan;
pub mod server;
pub mod store;
