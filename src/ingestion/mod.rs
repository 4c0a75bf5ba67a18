//! Turning raw documents into deduplicated, embedded, stored chunks.
//!
//! The helpers in this module provide the write side of the pipeline:
//!
//! * [`chunk`] — sliding-window splitting, content hashing, and the
//!   run-scoped [`chunk::DedupIndex`].
//! * [`pipeline`] — embedding batches and fixed-size store upserts with a
//!   second, insert-time dedup pass.

pub mod chunk;
pub mod pipeline;

pub use chunk::{Chunk, Chunker, DedupIndex, RawDocument, chunk_id, content_digest};
pub use pipeline::{IngestReport, IngestionPipeline};
