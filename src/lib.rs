//! # askdoc
//!
//! A document question-answering backend with pluggable content storage.
//!
//! askdoc ingests uploaded documents (PDF, DOCX, plain text), chunks and
//! indexes their text in one of several interchangeable backends, and
//! answers questions over the corpus by retrieving relevant fragments and
//! handing them to a hosted LLM. A JSON HTTP API serves the chat frontend;
//! a CLI covers local ingestion and search.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────────┐
//! │ Uploads  │──▶│   Pipeline    │──▶│   SearchFacade    │
//! │ PDF/DOCX │   │ Extract+Chunk │   │ memory/sqlite/vec │
//! └──────────┘   └──────┬───────┘   └─────────┬─────────┘
//!                       │                     │
//!                       ▼                     ▼
//!                ┌────────────┐        ┌────────────┐
//!                │  Registry  │        │    Chat    │
//!                │ (catalog)  │        │ (LLM call) │
//!                └────────────┘        └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! askdoc init                       # create the SQLite database (sqlite backend)
//! askdoc ingest ./docs              # index local files
//! askdoc search "revenue growth"    # query the index
//! askdoc serve                      # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping-window text chunking |
//! | [`score`] | Keyword relevance scoring |
//! | [`extract`] | PDF/DOCX/text extraction |
//! | [`store`] | Content store backends |
//! | [`search`] | Backend-agnostic search façade |
//! | [`registry`] | Document metadata catalog |
//! | [`ingest`] | Upload pipeline |
//! | [`chat`] | Question answering orchestration |
//! | [`llm`] | Hosted LLM client |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`server`] | HTTP API server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod registry;
pub mod score;
pub mod search;
pub mod server;
pub mod store;
