//! Core data types flowing through ingestion and query resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One file of an upload event: a name plus a data-URL payload
/// (`<metadata>;base64,<data>`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadFile {
    pub name: String,
    pub content: String,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A file persisted into the working directory for the current batch.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub size_bytes: usize,
    /// Text extracted from a binary document, when extraction succeeded and
    /// produced something.
    pub derived_text: Option<String>,
}

/// Outcome of a successful ingestion cycle.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Number of uploaded files in the batch.
    pub documents: usize,
    /// Number of `.txt` siblings derived from binary documents.
    pub derived_texts: usize,
    /// Number of working-directory files that made it into the index.
    pub indexed_files: usize,
    pub chunks: usize,
    pub files: Vec<String>,
    /// Identifier of the index built by this cycle; `None` for an empty batch.
    pub build_id: Option<String>,
    pub indexed_at: Option<DateTime<Utc>>,
}

impl IngestReport {
    pub(crate) fn empty() -> Self {
        Self {
            documents: 0,
            derived_texts: 0,
            indexed_files: 0,
            chunks: 0,
            files: Vec::new(),
            build_id: None,
            indexed_at: None,
        }
    }
}

/// A passage of a working-directory file, as stored in the vector collection.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub file_name: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A chunk retrieved for a question, with its cosine similarity.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedPassage {
    pub file_name: String,
    pub chunk_index: i64,
    pub text: String,
    pub score: f32,
}

/// Result of a successful query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    NoRelevantResult,
}

impl Answer {
    pub const NO_RELEVANT_MESSAGE: &'static str = "No relevant documents found.";
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Text(t) => f.write_str(t),
            Answer::NoRelevantResult => f.write_str(Self::NO_RELEVANT_MESSAGE),
        }
    }
}
