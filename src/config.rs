//! Configuration shared across chunking, ingestion, and retrieval.

use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// Tunables consumed by the chunker, ingestion pipeline, and hybrid retriever.
///
/// Uses a builder pattern — all setters are `#[must_use]`. Call
/// [`RagConfig::validate`] after construction; the pipeline entry points do so
/// on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RagConfig {
    /// Window size in characters for the sliding-window chunker.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows. Must be smaller than
    /// `chunk_size`.
    pub chunk_overlap: usize,
    /// Default number of results requested from each retrieval probe.
    pub top_k: usize,
    /// Fusion weight: `final = alpha * lexical + (1 - alpha) * vector`.
    pub alpha: f32,
    /// Batch size for store upserts during ingestion.
    pub batch_size: usize,
    /// Page size used when scrolling the full store during export.
    pub scroll_page_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 4,
            alpha: 0.5,
            batch_size: 20,
            scroll_page_size: 1000,
        }
    }
}

impl RagConfig {
    /// Create a config with the default tunables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk window size in characters.
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive windows, in characters.
    #[must_use]
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    /// Set the per-probe result limit.
    #[must_use]
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the lexical/vector fusion weight. Must lie in `[0, 1]`.
    #[must_use]
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the upsert batch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the export scroll page size.
    #[must_use]
    pub fn scroll_page_size(mut self, page_size: usize) -> Self {
        self.scroll_page_size = page_size;
        self
    }

    /// Check internal consistency of the tunables.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Chunking("chunk_size must be non-zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Chunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(RagError::Chunking(format!(
                "alpha ({}) must lie in [0, 1]",
                self.alpha
            )));
        }
        if self.batch_size == 0 {
            return Err(RagError::Chunking("batch_size must be non-zero".into()));
        }
        if self.scroll_page_size == 0 {
            return Err(RagError::Chunking(
                "scroll_page_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let config = RagConfig::new().chunk_size(100).chunk_overlap(100);
        assert!(config.validate().is_err());

        let config = RagConfig::new().chunk_size(100).chunk_overlap(99);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn alpha_outside_unit_interval_is_rejected() {
        assert!(RagConfig::new().alpha(1.5).validate().is_err());
        assert!(RagConfig::new().alpha(-0.1).validate().is_err());
        assert!(RagConfig::new().alpha(1.0).validate().is_ok());
        assert!(RagConfig::new().alpha(0.0).validate().is_ok());
    }

    #[test]
    fn zero_batch_sizes_are_rejected() {
        assert!(RagConfig::new().batch_size(0).validate().is_err());
        assert!(RagConfig::new().scroll_page_size(0).validate().is_err());
    }
}
