//! In-process reference backend.
//!
//! Brute-force cosine search over a `BTreeMap` keyed by chunk id. Intended
//! for tests and small corpora; the trait impl is the reference for the
//! contract a production backend must honor (idempotent upsert, disjunctive
//! token match, stable scroll order).

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use super::{PointRecord, ScoredPoint, ScrollCursor, VectorStore};
use crate::types::RagError;

/// In-memory [`VectorStore`] backed by an id-ordered map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    points: RwLock<BTreeMap<u64, PointRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, points: Vec<PointRecord>) -> Result<(), RagError> {
        let mut guard = self.points.write();
        for point in points {
            guard.insert(point.id, point);
        }
        Ok(())
    }

    async fn match_any(
        &self,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, RagError> {
        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let guard = self.points.read();
        let mut hits = Vec::new();
        for point in guard.values() {
            let indexed: FxHashSet<&str> =
                point.payload.tokenized_text.split_whitespace().collect();
            if tokens.iter().any(|token| indexed.contains(token.as_str())) {
                // Presence-only match: this backend has no lexical scoring.
                hits.push(ScoredPoint {
                    id: point.id,
                    payload: point.payload.clone(),
                    score: None,
                });
                if hits.len() == limit {
                    break;
                }
            }
        }
        Ok(hits)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, RagError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let guard = self.points.read();
        let mut scored: Vec<ScoredPoint> = guard
            .values()
            .map(|point| ScoredPoint {
                id: point.id,
                payload: point.payload.clone(),
                score: Some(cosine_similarity(&point.vector, vector)),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn scroll(
        &self,
        cursor: Option<ScrollCursor>,
        limit: usize,
    ) -> Result<(Vec<PointRecord>, Option<ScrollCursor>), RagError> {
        let offset = cursor.map_or(0, |c| c.0 as usize);
        let guard = self.points.read();
        let page: Vec<PointRecord> = guard.values().skip(offset).take(limit).cloned().collect();
        let consumed = offset + page.len();
        // Offset cursors assume the id set is stable across the scan.
        let next = (consumed < guard.len()).then(|| ScrollCursor(consumed as u64));
        Ok((page, next))
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.points.read().len())
    }

    async fn clear(&self) -> Result<(), RagError> {
        self.points.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::PointPayload;
    use serde_json::Map;

    fn record(id: u64, text: &str, tokenized: &str, vector: Vec<f32>) -> PointRecord {
        PointRecord {
            id,
            vector,
            payload: PointPayload {
                text: text.to_owned(),
                tokenized_text: tokenized.to_owned(),
                metadata: Map::new(),
            },
        }
    }

    #[tokio::test]
    async fn upsert_by_id_overwrites_instead_of_duplicating() {
        let store = MemoryStore::new();
        store
            .upsert(vec![record(7, "old", "old", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(vec![record(7, "new", "new", vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let (page, _) = store.scroll(None, 10).await.unwrap();
        assert_eq!(page[0].payload.text, "new");
    }

    #[tokio::test]
    async fn match_any_is_disjunctive_and_presence_only() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                record(1, "alpha text", "alpha text", vec![1.0]),
                record(2, "beta text", "beta text", vec![1.0]),
                record(3, "gamma prose", "gamma prose", vec![1.0]),
            ])
            .await
            .unwrap();

        let hits = store
            .match_any(&["alpha".into(), "gamma".into()], 10)
            .await
            .unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(hits.iter().all(|h| h.score.is_none()));
    }

    #[tokio::test]
    async fn empty_token_list_matches_nothing() {
        let store = MemoryStore::new();
        store
            .upsert(vec![record(1, "anything", "anything", vec![1.0])])
            .await
            .unwrap();
        assert!(store.match_any(&[], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn vector_search_returns_nearest_first() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                record(1, "x", "x", vec![1.0, 0.0]),
                record(2, "y", "y", vec![0.0, 1.0]),
                record(3, "xy", "xy", vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[1].id, 3);
        assert!(hits[0].score.unwrap() > hits[1].score.unwrap());
    }

    #[tokio::test]
    async fn clear_removes_every_record() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                record(1, "one", "one", vec![1.0]),
                record(2, "two", "two", vec![1.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        let (page, next) = store.scroll(None, 10).await.unwrap();
        assert!(page.is_empty());
        assert!(next.is_none());
        assert!(store.match_any(&["one".into()], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scroll_visits_every_record_exactly_once() {
        let store = MemoryStore::new();
        let records: Vec<PointRecord> = (0..7)
            .map(|i| record(i, &format!("t{i}"), "t", vec![1.0]))
            .collect();
        store.upsert(records).await.unwrap();

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let (page, next) = store.scroll(cursor, 3).await.unwrap();
            seen.extend(page.into_iter().map(|p| p.id));
            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
        assert_eq!(seen, (0..7).collect::<Vec<u64>>());
    }
}
