//! Ingestion orchestration: embed surviving chunks and upsert them in
//! fixed-size batches.

use tracing::{debug, info};

use crate::config::RagConfig;
use crate::embedding::Embedder;
use crate::ingestion::chunk::{Chunk, DedupIndex, content_digest};
use crate::normalize;
use crate::stores::{PointPayload, PointRecord, VectorStore};
use crate::types::RagError;

/// Summary of one [`IngestionPipeline::ingest`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Chunks embedded and upserted.
    pub ingested: usize,
    /// Chunks dropped by the insert-time dedup pass.
    pub duplicates_dropped: usize,
    /// Chunks skipped because their normalized text was blank.
    pub skipped_blank: usize,
    /// Number of upsert batches sent to the store.
    pub batches: usize,
}

/// Drives chunks through embedding and into the store.
///
/// Each `ingest` call runs its own dedup pass with a fresh [`DedupIndex`],
/// independent of any chunker's state: multiple call sites may each chunk
/// overlapping inputs, and this pass guarantees a single call never sends
/// duplicate ids to the store. Failures of a store batch propagate to the
/// caller; batches committed before the failure stay committed.
pub struct IngestionPipeline<E, S> {
    embedder: E,
    store: S,
    config: RagConfig,
}

impl<E, S> IngestionPipeline<E, S>
where
    E: Embedder,
    S: VectorStore,
{
    /// Create a pipeline over the given collaborators.
    pub fn new(embedder: E, store: S, config: RagConfig) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self {
            embedder,
            store,
            config,
        })
    }

    /// The store this pipeline writes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The embedder this pipeline calls.
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Embed, deduplicate, and upsert the given chunks.
    ///
    /// Re-normalizes each candidate (idempotent, but defensive against
    /// callers constructing [`Chunk`]s directly), drops within-call
    /// duplicates, embeds all survivors in one batch call, and upserts in
    /// batches of `config.batch_size`.
    pub async fn ingest(&self, chunks: Vec<Chunk>) -> Result<IngestReport, RagError> {
        let mut report = IngestReport::default();
        if chunks.is_empty() {
            return Ok(report);
        }

        let mut dedup = DedupIndex::new();
        let mut survivors = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let text = normalize::normalize(&chunk.text);
            if text.trim().is_empty() {
                report.skipped_blank += 1;
                continue;
            }
            if !dedup.insert(content_digest(&text)) {
                report.duplicates_dropped += 1;
                continue;
            }
            survivors.push(Chunk {
                id: chunk.id,
                text,
                metadata: chunk.metadata,
            });
        }
        if survivors.is_empty() {
            return Ok(report);
        }

        let texts: Vec<String> = survivors.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).await?;
        if vectors.len() != survivors.len() {
            return Err(RagError::Embedding(format!(
                "expected {} vectors, got {}",
                survivors.len(),
                vectors.len()
            )));
        }

        let points: Vec<PointRecord> = survivors
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| PointRecord {
                id: chunk.id,
                vector,
                payload: PointPayload {
                    tokenized_text: normalize::tokenize_for_lexical(&chunk.text),
                    text: chunk.text,
                    metadata: chunk.metadata,
                },
            })
            .collect();

        report.ingested = points.len();
        for batch in points.chunks(self.config.batch_size) {
            self.store.upsert(batch.to_vec()).await?;
            report.batches += 1;
            debug!(batch = report.batches, size = batch.len(), "upserted batch");
        }

        info!(
            ingested = report.ingested,
            duplicates_dropped = report.duplicates_dropped,
            skipped_blank = report.skipped_blank,
            batches = report.batches,
            "ingestion complete"
        );
        Ok(report)
    }
}
