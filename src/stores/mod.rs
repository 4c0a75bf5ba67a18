//! Vector store collaborator contract.
//!
//! This module provides a unified [`VectorStore`] trait that abstracts over
//! concrete vector databases, so the ingestion pipeline and the hybrid
//! retriever can work against any backend offering batched idempotent
//! upserts, a disjunctive token match, nearest-neighbor search, and a
//! cursor-paginated full scan.
//!
//! # Architecture
//!
//! ```text
//!                  ┌───────────────────┐
//!                  │ VectorStore trait │
//!                  │   (async CRUD)    │
//!                  └─────────┬─────────┘
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │                           │
//!              ▼                           ▼
//!       ┌─────────────┐            ┌──────────────┐
//!       │ MemoryStore │            │   (yours)    │
//!       │  reference  │            │ qdrant, pg…  │
//!       └─────────────┘            └──────────────┘
//! ```
//!
//! # Supported backends
//!
//! - [`memory::MemoryStore`] — in-process reference backend used by the test
//!   suite and small corpora.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ingestion::chunk::{CHUNK_ORDER_KEY, SOURCE_KEY};
use crate::types::RagError;

pub use memory::MemoryStore;

/// Payload persisted alongside each vector.
///
/// `tokenized_text` is derived at ingest time (stop-word-filtered,
/// whitespace-joined) and exists purely for the store's lexical match; the
/// core never mutates it after upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPayload {
    /// Normalized chunk text.
    pub text: String,
    /// Lexical index field derived from `text`.
    pub tokenized_text: String,
    /// Chunk metadata (`source`, `chunk_order`, loader extras).
    pub metadata: Map<String, Value>,
}

impl PointPayload {
    /// Originating document identifier, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }

    /// Position within the source document's chunk sequence.
    pub fn chunk_order(&self) -> Option<u64> {
        self.metadata.get(CHUNK_ORDER_KEY).and_then(Value::as_u64)
    }
}

/// One upsert record: content-addressed id, embedding, payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A probe result.
///
/// `score` is `None` when the probe mechanism has no intrinsic relevance
/// score (a presence-only lexical match); fusion treats an absent score as
/// zero without conflating it with a legitimate zero score at the wire level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: u64,
    pub payload: PointPayload,
    pub score: Option<f32>,
}

/// Opaque continuation token for [`VectorStore::scroll`].
///
/// Backends define the meaning of the inner value; callers only pass it back
/// unchanged to fetch the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollCursor(pub u64);

/// A vector database offering the operations the core depends on.
///
/// All operations must be safe to call concurrently. `upsert` must be
/// idempotent by id: re-upserting an existing id overwrites, never
/// duplicates — this is the ultimate safety net for duplicate ids produced
/// by concurrent ingestion runs.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite a batch of records, keyed by id.
    async fn upsert(&self, points: Vec<PointRecord>) -> Result<(), RagError>;

    /// Return up to `limit` records whose `tokenized_text` matches *any* of
    /// the given tokens (disjunctive match). An empty token slice matches
    /// nothing, never everything.
    async fn match_any(
        &self,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, RagError>;

    /// Return the `limit` nearest neighbors of `vector` under cosine
    /// similarity, best first.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, RagError>;

    /// Fetch one page of the full scan. Pass `None` to start; a returned
    /// `None` cursor signals the final page.
    async fn scroll(
        &self,
        cursor: Option<ScrollCursor>,
        limit: usize,
    ) -> Result<(Vec<PointRecord>, Option<ScrollCursor>), RagError>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize, RagError>;

    /// Remove all stored records.
    async fn clear(&self) -> Result<(), RagError>;
}

#[async_trait]
impl<T: VectorStore + ?Sized> VectorStore for &T {
    async fn upsert(&self, points: Vec<PointRecord>) -> Result<(), RagError> {
        (**self).upsert(points).await
    }

    async fn match_any(
        &self,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, RagError> {
        (**self).match_any(tokens, limit).await
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, RagError> {
        (**self).search(vector, limit).await
    }

    async fn scroll(
        &self,
        cursor: Option<ScrollCursor>,
        limit: usize,
    ) -> Result<(Vec<PointRecord>, Option<ScrollCursor>), RagError> {
        (**self).scroll(cursor, limit).await
    }

    async fn count(&self) -> Result<usize, RagError> {
        (**self).count().await
    }

    async fn clear(&self) -> Result<(), RagError> {
        (**self).clear().await
    }
}

#[async_trait]
impl<T: VectorStore + ?Sized> VectorStore for std::sync::Arc<T> {
    async fn upsert(&self, points: Vec<PointRecord>) -> Result<(), RagError> {
        (**self).upsert(points).await
    }

    async fn match_any(
        &self,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, RagError> {
        (**self).match_any(tokens, limit).await
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, RagError> {
        (**self).search(vector, limit).await
    }

    async fn scroll(
        &self,
        cursor: Option<ScrollCursor>,
        limit: usize,
    ) -> Result<(Vec<PointRecord>, Option<ScrollCursor>), RagError> {
        (**self).scroll(cursor, limit).await
    }

    async fn count(&self) -> Result<usize, RagError> {
        (**self).count().await
    }

    async fn clear(&self) -> Result<(), RagError> {
        (**self).clear().await
    }
}
