//! # docqa
//!
//! Upload a batch of documents, build a semantic index over them, and ask
//! questions answered from their content.
//!
//! Each upload replaces the working set entirely: the working directory is
//! cleared, the previous index is dropped, the new files are written (PDF and
//! DOCX files also get an extracted `.txt` sibling), and a fresh index is built
//! over the directory. Queries are answered against whichever index is
//! installed at the time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────┐   ┌──────────┐
//! │  Upload  │──▶│  FileStore   │──▶│  Index    │──▶│  SQLite  │
//! │  batch   │   │ decode+extract│  │  Builder  │   │  vectors │
//! └──────────┘   └──────────────┘   └─────┬─────┘   └────┬─────┘
//!                                         ▼              │
//!                  ┌──────────┐     ┌──────────┐         │
//!                  │ Question │──▶  │ Session  │ ◀───────┘
//!                  └──────────┘     │  State   │──▶ Generator
//!                                   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Failure taxonomy |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF/DOCX text extraction |
//! | [`store`] | Working-directory file store |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Answer synthesis providers |
//! | [`index`] | Index construction and retrieval |
//! | [`session`] | Current-index holder |
//! | [`pipeline`] | Upload-to-index cycle |
//! | [`query`] | Query resolution |
//! | [`service`] | Shared service handle |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod server;
pub mod service;
pub mod session;
pub mod store;

pub use error::PipelineError;
pub use service::DocumentQa;
