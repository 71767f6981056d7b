//! Error types for collocate-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for collocate-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for collocate-core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tab-separated table error.
    #[error("table error: {0}")]
    Csv(#[from] csv::Error),

    /// A dependency edge or lookup references a token that the sentence does not have.
    #[error("malformed annotation: sentence {sentence} has no token {token}")]
    MalformedAnnotation { sentence: usize, token: usize },

    /// An alias occurrence points at a sentence the document does not have.
    #[error("malformed annotation: document has no sentence {0}")]
    MissingSentence(usize),

    /// Parse error in one of the external formats.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Story id not present under the corpus root.
    #[error("{0} does not correspond to a story in the corpus ({1})")]
    UnknownDocument(String, PathBuf),
}

impl Error {
    /// Create a parse error.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the error means the annotation itself is unusable.
    pub fn is_malformed_annotation(&self) -> bool {
        matches!(
            self,
            Error::MalformedAnnotation { .. } | Error::MissingSentence(_)
        )
    }
}
