//! Error taxonomy for ingestion cycles and queries.
//!
//! Every failure surfaced to a caller is a [`PipelineError`]. Each variant
//! carries a stable machine-readable [`code`](PipelineError::code) used by the
//! HTTP layer and the CLI.
//!
//! | Variant | Code | Raised by |
//! |---------|------|-----------|
//! | [`Decode`](PipelineError::Decode) | `decode_failure` | malformed upload payload |
//! | [`Io`](PipelineError::Io) | `io_failure` | working-directory clear/save |
//! | [`Extraction`](PipelineError::Extraction) | `extraction_failure` | unparsable document (absorbed per file) |
//! | [`IndexBuild`](PipelineError::IndexBuild) | `index_build_failure` | empty input, embedding or store errors |
//! | [`NoIndex`](PipelineError::NoIndex) | `no_index` | query before a successful build |
//! | [`Query`](PipelineError::Query) | `query_failure` | retrieval or generation errors |
//! | [`Configuration`](PipelineError::Configuration) | `configuration_failure` | missing credentials at startup |

use thiserror::Error;

use crate::extract::ExtractError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed upload payload for '{name}': {reason}")]
    Decode { name: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("index build failed: {0}")]
    IndexBuild(String),

    #[error("index has not been constructed yet.")]
    NoIndex,

    #[error("query failed: {0}")]
    Query(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn decode(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn index_build(message: impl std::fmt::Display) -> Self {
        Self::IndexBuild(message.to_string())
    }

    pub fn query(message: impl std::fmt::Display) -> Self {
        Self::Query(message.to_string())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode_failure",
            Self::Io { .. } => "io_failure",
            Self::Extraction(_) => "extraction_failure",
            Self::IndexBuild(_) => "index_build_failure",
            Self::NoIndex => "no_index",
            Self::Query(_) => "query_failure",
            Self::Configuration(_) => "configuration_failure",
        }
    }
}
