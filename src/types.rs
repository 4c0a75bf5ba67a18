//! Shared error type for the ragweld pipeline.

use thiserror::Error;

/// Errors surfaced by chunking, ingestion, retrieval, and export.
///
/// Collaborator failures (embedder, vector store) are wrapped as strings so
/// backends with arbitrary error types can map into them without leaking
/// driver-specific types through the crate's public surface.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking or configuration validation failed.
    #[error("chunking failed: {0}")]
    Chunking(String),

    /// The embedding collaborator returned an error or a malformed batch.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector store collaborator returned an error.
    #[error("storage operation failed: {0}")]
    Storage(String),

    /// Filesystem failure while exporting stored chunks.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
