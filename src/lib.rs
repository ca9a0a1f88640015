//! # Dojo RAG
//!
//! Knowledge base and hybrid question answering for martial-arts academy
//! management.
//!
//! Dojo keeps a local corpus of course documents (PDF, text, Markdown,
//! Word), chunks them for keyword retrieval, and answers natural-language
//! questions by combining document hits with live data from the academy's
//! REST API (students, financial plans, courses, analytics, techniques).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────┐
//! │  Files   │──▶│ KnowledgeStore │──▶│ SQLite (kv)  │
//! │ PDF/TXT  │   │ extract+chunk  │   └──────────────┘
//! └──────────┘   └───────┬────────┘
//!                        │ search
//!   question ──▶ intent ──┼──────────▶ Orchestrator ──▶ answer template
//!                        │ groups
//!                ┌───────┴────────┐
//!                │    Gateway     │──▶ academy REST API
//!                │  (TTL cache)   │
//!                └────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Documents, chunks, hits, chat turns |
//! | [`extract`] | PDF / DOCX / text extraction |
//! | [`chunk`] | Sentence-boundary chunking |
//! | [`knowledge`] | Document corpus and keyword search |
//! | [`storage`] | Persisted key-value state |
//! | [`gateway`] | Cached academy REST API access |
//! | [`intent`] | Question classification |
//! | [`compose`] | Answer templates |
//! | [`orchestrator`] | Hybrid query pipeline |
//! | [`chat`] | Conversation log |
//! | [`service`] | Wiring and entry points |

pub mod chat;
pub mod chunk;
pub mod compose;
pub mod config;
pub mod connector_fs;
pub mod db;
pub mod extract;
pub mod gateway;
pub mod get;
pub mod health;
pub mod ingest;
pub mod intent;
pub mod knowledge;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod search;
pub mod service;
pub mod stats;
pub mod storage;
