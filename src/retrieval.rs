//! Hybrid lexical + vector retrieval fusion.
//!
//! A query is probed twice against the store — a disjunctive token match and
//! a cosine nearest-neighbor search — and the two result sets are merged by
//! chunk text into one list ranked by a weighted fused score. The merge,
//! rescale, fuse, and sort steps live in the pure [`fuse`] function so the
//! ranking semantics are testable without collaborators.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::RagConfig;
use crate::embedding::Embedder;
use crate::normalize;
use crate::stores::{ScoredPoint, VectorStore};
use crate::types::RagError;

/// Which probe(s) produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSource {
    /// Found only by the token match.
    Lexical,
    /// Found only by the nearest-neighbor search.
    Vector,
    /// Found by both probes; carries both raw scores.
    Hybrid,
}

/// One ranked retrieval result. Query-scoped; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    /// Normalized chunk text.
    pub text: String,
    /// Probe provenance.
    pub source: MatchSource,
    /// Raw lexical score (0.0 when absent or lexical-missed).
    pub lexical_score: f32,
    /// Raw vector similarity (0.0 when vector-missed).
    pub vector_score: f32,
    /// `alpha * lexical + (1 - alpha) * vector`, after optional rescaling.
    pub final_score: f32,
    /// Stored chunk metadata, carried through for observability.
    pub metadata: Map<String, Value>,
}

/// Pre-fusion rescaling of each probe's score column.
///
/// The default combines the raw scores under one linear weight even though
/// lexical and vector scores may live on very different numeric ranges;
/// the other variants correct the scale mismatch without changing the
/// fusion's shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreNormalization {
    /// Use raw scores as returned by the probes.
    #[default]
    None,
    /// Rescale each column to `[0, 1]` by its min and max.
    MinMax,
    /// Center each column on its mean and divide by its standard deviation.
    ZScore,
}

/// Runs both probes and fuses their results into one ranked list.
pub struct HybridRetriever<E, S> {
    embedder: E,
    store: S,
    config: RagConfig,
    normalization: ScoreNormalization,
}

impl<E, S> HybridRetriever<E, S>
where
    E: Embedder,
    S: VectorStore,
{
    /// Create a retriever over the given collaborators.
    pub fn new(embedder: E, store: S, config: RagConfig) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self {
            embedder,
            store,
            config,
            normalization: ScoreNormalization::default(),
        })
    }

    /// Select a score-rescaling strategy (default: raw scores).
    #[must_use]
    pub fn with_score_normalization(mut self, strategy: ScoreNormalization) -> Self {
        self.normalization = strategy;
        self
    }

    /// Search with the configured `top_k`.
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievalCandidate>, RagError> {
        self.search_top_k(query, self.config.top_k).await
    }

    /// Run the lexical and vector probes and return the fused ranking.
    ///
    /// A query whose tokens are all stop words issues no lexical probe; a
    /// query with zero hits on both probes yields an empty list, not an
    /// error.
    pub async fn search_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalCandidate>, RagError> {
        let query = normalize::normalize(query);
        let tokens = normalize::lexical_tokens(&query);

        let lexical_hits = if tokens.is_empty() {
            Vec::new()
        } else {
            self.store.match_any(&tokens, top_k).await?
        };

        let query_vector = self.embedder.embed_one(&query).await?;
        let vector_hits = self.store.search(&query_vector, top_k).await?;

        debug!(
            lexical = lexical_hits.len(),
            vector = vector_hits.len(),
            tokens = tokens.len(),
            "hybrid probes complete"
        );

        Ok(fuse(
            lexical_hits,
            vector_hits,
            self.config.alpha,
            self.normalization,
        ))
    }
}

/// Merge the two probe result sets and rank them by fused score.
///
/// Lexical hits are inserted first, in probe order; a text also present in
/// the vector hits becomes `Hybrid` and gains its vector score, while
/// vector-only texts are appended as `Vector` entries. After optional
/// per-column rescaling, `final_score = alpha * lexical + (1 - alpha) *
/// vector` and the list is stably sorted descending — ties keep merge
/// insertion order, so a lexical-origin entry never sorts after a
/// vector-only entry with the same score. Zero-score entries are retained.
pub fn fuse(
    mut lexical: Vec<ScoredPoint>,
    mut vector: Vec<ScoredPoint>,
    alpha: f32,
    normalization: ScoreNormalization,
) -> Vec<RetrievalCandidate> {
    rescale(&mut lexical, normalization);
    rescale(&mut vector, normalization);

    let mut candidates: Vec<RetrievalCandidate> = Vec::new();
    let mut index_by_text: FxHashMap<String, usize> = FxHashMap::default();

    for hit in lexical {
        if index_by_text.contains_key(&hit.payload.text) {
            continue;
        }
        index_by_text.insert(hit.payload.text.clone(), candidates.len());
        candidates.push(RetrievalCandidate {
            text: hit.payload.text,
            source: MatchSource::Lexical,
            lexical_score: hit.score.unwrap_or(0.0),
            vector_score: 0.0,
            final_score: 0.0,
            metadata: hit.payload.metadata,
        });
    }

    for hit in vector {
        match index_by_text.get(&hit.payload.text) {
            Some(&index) => {
                let entry = &mut candidates[index];
                // Only a lexical-origin entry becomes Hybrid; a repeated
                // text within the vector hits keeps its first occurrence.
                if entry.source == MatchSource::Lexical {
                    entry.source = MatchSource::Hybrid;
                    entry.vector_score = hit.score.unwrap_or(0.0);
                }
            }
            None => {
                index_by_text.insert(hit.payload.text.clone(), candidates.len());
                candidates.push(RetrievalCandidate {
                    text: hit.payload.text,
                    source: MatchSource::Vector,
                    lexical_score: 0.0,
                    vector_score: hit.score.unwrap_or(0.0),
                    final_score: 0.0,
                    metadata: hit.payload.metadata,
                });
            }
        }
    }

    for candidate in &mut candidates {
        candidate.final_score =
            alpha * candidate.lexical_score + (1.0 - alpha) * candidate.vector_score;
    }

    // sort_by is stable: equal scores keep merge insertion order.
    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(Ordering::Equal)
    });
    candidates
}

/// Rescale the scored subset of one probe column in place. Points without a
/// score stay unscored.
fn rescale(points: &mut [ScoredPoint], strategy: ScoreNormalization) {
    let scores: Vec<f32> = points.iter().filter_map(|p| p.score).collect();
    if scores.is_empty() {
        return;
    }
    match strategy {
        ScoreNormalization::None => {}
        ScoreNormalization::MinMax => {
            let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
            let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let range = max - min;
            for point in points.iter_mut() {
                if let Some(score) = point.score {
                    // A degenerate column keeps its presence signal.
                    point.score = Some(if range > 0.0 { (score - min) / range } else { 1.0 });
                }
            }
        }
        ScoreNormalization::ZScore => {
            let mean = scores.iter().sum::<f32>() / scores.len() as f32;
            let variance =
                scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / scores.len() as f32;
            let std_dev = variance.sqrt();
            for point in points.iter_mut() {
                if let Some(score) = point.score {
                    point.score = Some(if std_dev > 0.0 { (score - mean) / std_dev } else { 0.0 });
                }
            }
        }
    }
}
