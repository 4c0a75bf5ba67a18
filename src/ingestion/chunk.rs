//! Sliding-window chunking with content-addressed deduplication.
//!
//! Documents are split into overlapping character windows; each window is
//! canonicalized, hashed, and either emitted as a [`Chunk`] or silently
//! dropped when its content hash was already seen in the current run.
//! Chunk ids are a pure function of the normalized text, so identical
//! content anywhere in the corpus maps to the same id.

use md5::{Digest, Md5};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RagConfig;
use crate::normalize;
use crate::types::RagError;

/// Chunk ids are content hashes reduced modulo this value.
pub const CHUNK_ID_MODULUS: u64 = 1_000_000_000;

/// Metadata key carrying the originating document identifier.
pub const SOURCE_KEY: &str = "source";

/// Metadata key carrying the window's position within its source document.
pub const CHUNK_ORDER_KEY: &str = "chunk_order";

/// MD5 digest of a normalized chunk text.
pub type ContentDigest = [u8; 16];

/// Hash normalized text into its content digest.
pub fn content_digest(text: &str) -> ContentDigest {
    Md5::digest(text.as_bytes()).into()
}

/// Derive the deterministic chunk id for normalized text.
///
/// The 128-bit digest is interpreted as a big-endian integer and reduced
/// modulo [`CHUNK_ID_MODULUS`]. Two chunks with identical normalized text
/// always collide on the same id; the collision policy (drop the later
/// chunk) lives in [`Chunker::split_documents`].
pub fn chunk_id(normalized_text: &str) -> u64 {
    id_from_digest(&content_digest(normalized_text))
}

fn id_from_digest(digest: &ContentDigest) -> u64 {
    (u128::from_be_bytes(*digest) % u128::from(CHUNK_ID_MODULUS)) as u64
}

/// An already-extracted text span handed to the chunker by external loaders.
///
/// Immutable once constructed; the chunker never mutates its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    /// Raw text content.
    pub text: String,
    /// Loader-provided metadata; always carries a `source` entry.
    pub metadata: Map<String, Value>,
}

impl RawDocument {
    /// Create a document with the mandatory `source` metadata entry.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert(SOURCE_KEY.to_owned(), Value::String(source.into()));
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Attach an additional metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A content-addressed span of normalized text derived from a source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id derived from the normalized text (see [`chunk_id`]).
    pub id: u64,
    /// Normalized chunk text.
    pub text: String,
    /// Source metadata merged with the window's `chunk_order`.
    pub metadata: Map<String, Value>,
}

impl Chunk {
    /// Originating document identifier, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }

    /// Position of this chunk within its source document's split sequence.
    ///
    /// Order numbers may be non-contiguous: duplicate windows are dropped but
    /// the surviving windows keep their original indices.
    pub fn chunk_order(&self) -> Option<u64> {
        self.metadata.get(CHUNK_ORDER_KEY).and_then(Value::as_u64)
    }
}

/// Run-scoped set of content digests used to suppress duplicate chunks.
///
/// One instance is owned by whoever drives an ingestion run and is never
/// persisted; cross-run dedup relies on content-addressed ids plus the
/// store's idempotent upsert-by-id.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    seen: FxHashSet<ContentDigest>,
}

impl DedupIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a digest. Returns `true` on first sighting, `false` when the
    /// digest was already present (the caller should drop the chunk).
    pub fn insert(&mut self, digest: ContentDigest) -> bool {
        self.seen.insert(digest)
    }

    /// Whether the digest has been seen in this run.
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.seen.contains(digest)
    }

    /// Clear all recorded digests, starting an independent run.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// Number of distinct digests recorded so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// `true` when no digest has been recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Splits documents into overlapping windows and deduplicates by content hash.
///
/// The dedup state is scoped to the chunker instance: reuse one instance for
/// the windows of a single ingestion run, and construct a fresh one (or call
/// [`Chunker::reset`]) when runs must not see each other's hashes.
#[derive(Debug)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    dedup: DedupIndex,
}

impl Chunker {
    /// Create a chunker with explicit window geometry.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Chunking("chunk_size must be non-zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Chunking(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            dedup: DedupIndex::new(),
        })
    }

    /// Create a chunker from the shared config.
    pub fn from_config(config: &RagConfig) -> Result<Self, RagError> {
        config.validate()?;
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Clear the run-scoped dedup state.
    pub fn reset(&mut self) {
        self.dedup.reset();
    }

    /// Digests seen so far in this run.
    pub fn dedup_index(&self) -> &DedupIndex {
        &self.dedup
    }

    /// Split documents into normalized, deduplicated chunks.
    ///
    /// Windows are processed in original order. For each window: normalize,
    /// skip blanks, hash, skip digests already seen in this run (first
    /// occurrence wins, even across documents), otherwise emit a [`Chunk`]
    /// whose metadata merges the source document's entries with the window's
    /// `chunk_order`.
    pub fn split_documents(&mut self, documents: &[RawDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for (order, window) in
                split_windows(&document.text, self.chunk_size, self.chunk_overlap)
                    .into_iter()
                    .enumerate()
            {
                let normalized = normalize::normalize(&window);
                if normalized.trim().is_empty() {
                    continue;
                }
                let digest = content_digest(&normalized);
                if !self.dedup.insert(digest) {
                    continue;
                }
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_ORDER_KEY.to_owned(), Value::from(order as u64));
                chunks.push(Chunk {
                    id: id_from_digest(&digest),
                    text: normalized,
                    metadata,
                });
            }
        }
        chunks
    }
}

/// Cut text into overlapping windows of `size` characters with `overlap`
/// characters shared between consecutive windows. Windows never cross
/// document boundaries; the final window may be shorter than `size`.
fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let stride = size - overlap;
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += stride;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str, source: &str) -> RawDocument {
        RawDocument::new(text, source)
    }

    #[test]
    fn chunk_id_matches_md5_mod_1e9() {
        // md5("hello world") = 5eb63bbbe01eeed093cb22bb8f5acdc3;
        // taken as an integer mod 10^9 that is 361764291.
        assert_eq!(chunk_id("hello world"), 361_764_291);
    }

    #[test]
    fn chunk_id_is_pure_in_normalized_text() {
        assert_eq!(chunk_id("same text"), chunk_id("same text"));
        assert_ne!(chunk_id("same text"), chunk_id("other text"));
        // Equivalent Unicode forms normalize to the same text and thus id.
        let composed = normalize::normalize("caf\u{E9}");
        let decomposed = normalize::normalize("cafe\u{301}");
        assert_eq!(chunk_id(&composed), chunk_id(&decomposed));
    }

    #[test]
    fn windows_share_the_configured_overlap() {
        let text: String = ('a'..='t').collect(); // 20 chars
        let windows = split_windows(&text, 10, 3);
        assert_eq!(windows, vec!["abcdefghij", "hijklmnopq", "opqrst"]);
        // Consecutive windows share exactly 3 characters.
        assert!(windows[1].starts_with(&windows[0][7..]));
        assert!(windows[2].starts_with(&windows[1][7..]));
    }

    #[test]
    fn short_text_yields_a_single_window() {
        assert_eq!(split_windows("tiny", 10, 3), vec!["tiny"]);
        assert!(split_windows("", 10, 3).is_empty());
    }

    #[test]
    fn blank_documents_yield_no_chunks() {
        let mut chunker = Chunker::new(10, 2).unwrap();
        assert!(chunker.split_documents(&[doc("", "a.txt")]).is_empty());
        assert!(chunker.split_documents(&[doc("   \n\t ", "b.txt")]).is_empty());
    }

    #[test]
    fn duplicate_windows_are_dropped_first_occurrence_wins() {
        let mut chunker = Chunker::new(50, 0).unwrap();
        let chunks = chunker.split_documents(&[
            doc("identical paragraph", "first.txt"),
            doc("identical paragraph", "second.txt"),
        ]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source(), Some("first.txt"));
    }

    #[test]
    fn duplicate_drop_leaves_order_gaps() {
        // Three windows with no overlap; the middle one repeats the first.
        let mut chunker = Chunker::new(4, 0).unwrap();
        let chunks = chunker.split_documents(&[doc("aaaaaaaabbbb", "doc.txt")]);
        // Windows: "aaaa" (0), "aaaa" (1, duplicate), "bbbb" (2).
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_order(), Some(0));
        assert_eq!(chunks[1].chunk_order(), Some(2));
    }

    #[test]
    fn metadata_is_merged_and_chunk_order_added() {
        let mut chunker = Chunker::new(100, 0).unwrap();
        let document = doc("some content here", "notes.txt")
            .with_metadata("page", Value::from(7));
        let chunks = chunker.split_documents(&[document]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source(), Some("notes.txt"));
        assert_eq!(chunks[0].metadata.get("page"), Some(&Value::from(7)));
        assert_eq!(chunks[0].chunk_order(), Some(0));
    }

    #[test]
    fn reset_starts_an_independent_run() {
        let mut chunker = Chunker::new(50, 0).unwrap();
        let first = chunker.split_documents(&[doc("repeated text", "a.txt")]);
        assert_eq!(first.len(), 1);

        // Same run: dropped.
        assert!(chunker.split_documents(&[doc("repeated text", "a.txt")]).is_empty());

        // Fresh run: emitted again with the same id.
        chunker.reset();
        let again = chunker.split_documents(&[doc("repeated text", "a.txt")]);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, first[0].id);
    }

    #[test]
    fn equivalent_unicode_forms_dedup_against_each_other() {
        let mut chunker = Chunker::new(50, 0).unwrap();
        let chunks = chunker.split_documents(&[
            doc("caf\u{E9} menu", "a.txt"),
            doc("cafe\u{301} menu", "b.txt"),
        ]);
        assert_eq!(chunks.len(), 1, "NFKC-equal text must collide");
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(10, 10).is_err());
        assert!(Chunker::new(10, 12).is_err());
    }
}
