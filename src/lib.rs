//! # Hindsight
//!
//! A retrieval-augmented question answering service over your browsing
//! history.
//!
//! Hindsight ingests history records collected by a browser extension,
//! renders each one to a canonical text block, embeds it into a per-user
//! vector collection, and answers natural-language questions by retrieving
//! relevant records, applying deterministic post-retrieval filters (date,
//! domain, artist, content-type exclusions), and rendering a structured,
//! cited answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────────────┐   ┌───────────┐
//! │ Collector  │──▶│ Normalize + Chunk │──▶│  SQLite   │
//! │ (batches)  │   │    + Embed        │   │ (vectors) │
//! └────────────┘   └───────────────────┘   └─────┬─────┘
//!                                                │
//! ┌──────────┐   ┌───────────┐   ┌─────────┐     │
//! │ Question │──▶│ Interpret │──▶│ Retrieve│◀────┘
//! └──────────┘   └───────────┘   └────┬────┘
//!                                     ▼
//!                     ┌────────┐   ┌─────────┐
//!                     │ Filter │──▶│ Compose │──▶ cited answer
//!                     └────────┘   └─────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`categorize`] | URL categories and day-period buckets |
//! | [`normalize`] | Canonical record text and metadata |
//! | [`chunk`] | Text splitting |
//! | [`query`] | Question interpretation and expansion |
//! | [`artist`] | Artist resolution from candidate titles |
//! | [`filter`] | Post-retrieval structured filtering |
//! | [`compose`] | Answer rendering with citations |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`chat`] | Single-turn chat completion |
//! | [`store`] | Vector store backends |
//! | [`ingest`] | Batch ingestion pipeline |
//! | [`ask`] | Question pipeline orchestration |
//! | [`distill`] | Durable-memory distillation |
//! | [`server`] | HTTP API server |

pub mod artist;
pub mod ask;
pub mod categorize;
pub mod chat;
pub mod chunk;
pub mod compose;
pub mod config;
pub mod distill;
pub mod embedding;
pub mod filter;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod query;
pub mod server;
pub mod store;
