//! Full-store export and reconstruction.
//!
//! Streams every stored record via cursor pagination, regroups chunks by
//! their source document, and writes each source back out in `chunk_order`
//! — the inverse of the chunking pipeline. Faithful reconstruction depends
//! entirely on `chunk_order` having survived chunking, dedup, and storage.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;
use tokio::fs;
use tracing::{debug, info};

use crate::stores::{ScrollCursor, VectorStore};
use crate::types::RagError;

/// Fallback file stem for records missing a `source` metadata entry.
pub const UNKNOWN_SOURCE: &str = "unknown_source";

/// Cooperative cancellation handle for a long-running export.
///
/// Cloneable; cancelling from any clone stops the export before its next
/// page request. There is no other resource to release mid-stream.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Summary of one [`export_all`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Source files written.
    pub sources: usize,
    /// Chunks written across all sources.
    pub chunks: usize,
    /// `true` when the scan stopped early due to cancellation; the report
    /// then covers only the pages fetched before the stop.
    pub cancelled: bool,
}

/// Export every stored chunk, grouped by source and ordered by `chunk_order`.
///
/// Writes one `<source stem>.txt` per source document into `out_dir`, each
/// chunk preceded by a `### Chunk Order: N` marker. Blank-text records are
/// skipped. Returns the counts written.
pub async fn export_all<S: VectorStore>(
    store: &S,
    out_dir: &Path,
    page_size: usize,
    cancel: &CancelFlag,
) -> Result<ExportReport, RagError> {
    fs::create_dir_all(out_dir).await?;

    let mut groups: FxHashMap<String, Vec<(u64, String)>> = FxHashMap::default();
    let mut cursor: Option<ScrollCursor> = None;
    let mut cancelled = false;

    loop {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        let (points, next) = store.scroll(cursor.take(), page_size).await?;
        debug!(page_len = points.len(), "export page fetched");
        for point in points {
            if point.payload.text.trim().is_empty() {
                continue;
            }
            let source = point
                .payload
                .source()
                .unwrap_or(UNKNOWN_SOURCE)
                .to_owned();
            let order = point.payload.chunk_order().unwrap_or(0);
            groups
                .entry(source)
                .or_default()
                .push((order, point.payload.text));
        }
        match next {
            Some(token) => cursor = Some(token),
            None => break,
        }
    }

    let mut report = ExportReport {
        sources: groups.len(),
        chunks: 0,
        cancelled,
    };

    for (source, mut entries) in groups {
        entries.sort_by_key(|(order, _)| *order);

        let stem = Path::new(&source)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(UNKNOWN_SOURCE);
        let path = out_dir.join(format!("{stem}.txt"));

        let mut body = String::new();
        for (order, text) in &entries {
            body.push_str(&format!("### Chunk Order: {order}\n"));
            body.push_str(text.trim());
            body.push_str("\n\n---\n\n");
        }
        fs::write(&path, body).await?;
        report.chunks += entries.len();
    }

    info!(
        sources = report.sources,
        chunks = report.chunks,
        cancelled = report.cancelled,
        "export complete"
    );
    Ok(report)
}
