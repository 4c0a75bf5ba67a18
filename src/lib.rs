//! Deduplicating document chunking and hybrid retrieval fusion.
//!
//! ```text
//! Raw documents ──► ingestion::Chunker ──► deduplicated Chunks
//!                              │
//!                              ▼
//!              ingestion::IngestionPipeline
//!                  │ embed batches (Embedder)
//!                  └─► batched upserts ──► stores::VectorStore
//!
//! Query ──► normalize / lexical tokens ─┬─► lexical probe ──┐
//!        └─► Embedder::embed_one ───────┴─► vector probe ───┤
//!                                                           ▼
//!                         retrieval::HybridRetriever (weighted fusion)
//!                                                           │
//! Stored chunks ──► export::export_all ──► per-source reconstruction
//! ```
//!
//! Chunk ids are content-addressed (MD5 of the normalized text, mod 1e9),
//! so identical text anywhere in the corpus maps to the same id and the
//! store's idempotent upsert-by-id absorbs duplicates across runs. The
//! embedding model and the vector database are external collaborators
//! behind the [`embedding::Embedder`] and [`stores::VectorStore`] traits.

pub mod config;
pub mod embedding;
pub mod export;
pub mod ingestion;
pub mod normalize;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use config::RagConfig;
pub use embedding::{Embedder, MockEmbedder};
pub use export::{CancelFlag, ExportReport, export_all};
pub use ingestion::{Chunk, Chunker, DedupIndex, IngestReport, IngestionPipeline, RawDocument};
pub use retrieval::{HybridRetriever, MatchSource, RetrievalCandidate, ScoreNormalization, fuse};
pub use stores::{
    MemoryStore, PointPayload, PointRecord, ScoredPoint, ScrollCursor, VectorStore,
};
pub use types::RagError;
