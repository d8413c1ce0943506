//! In-process vector index with HNSW search
//!
//! Vectors live in a DashMap keyed by id. Uses instant-distance HNSW for
//! O(log n) search once the index is large enough, rebuilt lazily after writes.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use instant_distance::{Builder, HnswMap, Point, Search};
use parking_lot::RwLock;

use super::{IndexMatch, IndexedVector, VectorIndex};
use crate::embedding::cosine_similarity;
use crate::error::{Result, SearchError};

/// Below this many vectors queries use an exact linear scan
const HNSW_MIN_POINTS: usize = 256;

/// HNSW point wrapper for semantic search
#[derive(Clone)]
struct QuestionPoint(Vec<f32>);

impl Point for QuestionPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Cosine distance = 1 - similarity (HNSW finds minimum)
        1.0 - cosine_similarity(&self.0, &other.0)
    }
}

/// In-memory vector index
pub struct MemoryIndex {
    name: String,
    dimension: RwLock<Option<usize>>,
    vectors: DashMap<String, Vec<f32>>,
    hnsw: RwLock<Option<HnswMap<QuestionPoint, String>>>,
    /// Bumped on every write; a graph built from an older snapshot is dropped
    generation: AtomicU64,
    build_lock: tokio::sync::Mutex<()>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: RwLock::new(None),
            vectors: DashMap::new(),
            hnsw: RwLock::new(None),
            generation: AtomicU64::new(0),
            build_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn require_dimension(&self) -> Result<usize> {
        (*self.dimension.read())
            .ok_or_else(|| SearchError::index(format!("Index '{}' does not exist", self.name)))
    }

    /// Build the HNSW graph from the current vectors if it is missing
    async fn ensure_hnsw(&self) -> Result<()> {
        if self.hnsw.read().is_some() || self.vectors.len() < HNSW_MIN_POINTS {
            return Ok(());
        }

        let _guard = self.build_lock.lock().await;
        if self.hnsw.read().is_some() {
            return Ok(());
        }

        let generation = self.generation.load(Ordering::Acquire);
        let (ids, points) = self.snapshot();
        let count = ids.len();

        let hnsw = tokio::task::spawn_blocking(move || build_graph(points, ids))
            .await
            .map_err(|e| SearchError::index(format!("HNSW build task failed: {}", e)))?;

        if self.install_graph(hnsw, generation) {
            log::info!("Built HNSW graph for '{}' ({} vectors)", self.name, count);
        } else {
            log::debug!("Discarded stale HNSW graph for '{}'", self.name);
        }
        Ok(())
    }

    fn snapshot(&self) -> (Vec<String>, Vec<QuestionPoint>) {
        self.vectors
            .iter()
            .map(|entry| (entry.key().clone(), QuestionPoint(entry.value().clone())))
            .unzip()
    }

    /// Store a graph unless a write happened after its snapshot was taken
    fn install_graph(&self, hnsw: HnswMap<QuestionPoint, String>, generation: u64) -> bool {
        let mut slot = self.hnsw.write();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        *slot = Some(hnsw);
        true
    }

    /// Drop the graph and mark every in-flight build as stale
    fn invalidate_graph(&self) {
        let mut slot = self.hnsw.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        *slot = None;
    }

    /// Linear search fallback
    fn linear_search(&self, query: &[f32], top_k: usize) -> Vec<IndexMatch> {
        let mut results: Vec<IndexMatch> = self
            .vectors
            .iter()
            .map(|entry| IndexMatch {
                id: entry.key().clone(),
                score: cosine_similarity(query, entry.value()),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }
}

fn build_graph(points: Vec<QuestionPoint>, ids: Vec<String>) -> HnswMap<QuestionPoint, String> {
    Builder::default().ef_construction(100).build(points, ids)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.dimension.read().is_some())
    }

    async fn reset(&self, dimension: usize) -> Result<()> {
        self.vectors.clear();
        self.invalidate_graph();
        *self.dimension.write() = Some(dimension);

        log::info!("Created in-memory index '{}' ({}d)", self.name, dimension);
        Ok(())
    }

    async fn upsert(&self, vectors: Vec<IndexedVector>) -> Result<usize> {
        let dimension = self.require_dimension()?;

        if let Some(bad) = vectors.iter().find(|v| v.values.len() != dimension) {
            return Err(SearchError::DimensionMismatch {
                expected: dimension,
                actual: bad.values.len(),
            });
        }

        let count = vectors.len();
        for vector in vectors {
            self.vectors.insert(vector.id, vector.values);
        }

        // Graph is stale until the next query rebuilds it
        self.invalidate_graph();
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let dimension = self.require_dimension()?;
        if vector.len() != dimension {
            return Err(SearchError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        if top_k == 0 || self.vectors.is_empty() {
            return Ok(vec![]);
        }

        self.ensure_hnsw().await?;

        let index_guard = self.hnsw.read();
        let hnsw = match index_guard.as_ref() {
            Some(hnsw) => hnsw,
            None => return Ok(self.linear_search(vector, top_k)),
        };

        let query_point = QuestionPoint(vector.to_vec());
        let mut search = Search::default();
        let mut results = Vec::with_capacity(top_k);

        for candidate in hnsw.search(&query_point, &mut search) {
            results.push(IndexMatch {
                id: candidate.value.clone(),
                score: cosine_similarity(vector, &candidate.point.0),
            });

            if results.len() >= top_k {
                break;
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn index_with(vectors: Vec<(&str, Vec<f32>)>) -> MemoryIndex {
        let index = MemoryIndex::new("test");
        index.reset(3).await.unwrap();
        let vectors = vectors
            .into_iter()
            .map(|(id, values)| IndexedVector::new(id, values))
            .collect();
        index.upsert(vectors).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_query_ranks_by_cosine() {
        let index = index_with(vec![
            ("1", vec![1.0, 0.0, 0.0]),
            ("2", vec![0.7, 0.7, 0.0]),
            ("3", vec![0.0, 0.0, 1.0]),
        ])
        .await;

        let matches = index.query(&[1.0, 0.1, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(matches[0].score > matches[1].score);
        assert!(matches[0].score <= 1.0);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let index = index_with(vec![("1", vec![1.0, 0.0, 0.0])]).await;
        index
            .upsert(vec![IndexedVector::new("1", vec![0.0, 1.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(index.len(), 1);
        let matches = index.query(&[0.0, 1.0, 0.0], 5).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert!((matches[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let index = index_with(vec![]).await;

        let err = index
            .upsert(vec![IndexedVector::new("1", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));

        assert!(index.query(&[1.0, 0.0], 1).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_index_errors() {
        let index = MemoryIndex::new("missing");
        assert!(!index.exists().await.unwrap());
        assert!(index
            .upsert(vec![IndexedVector::new("1", vec![1.0])])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_empty_index_and_zero_top_k() {
        let index = index_with(vec![]).await;
        assert!(index.query(&[1.0, 0.0, 0.0], 5).await.unwrap().is_empty());

        let index = index_with(vec![("1", vec![1.0, 0.0, 0.0])]).await;
        assert!(index.query(&[1.0, 0.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_vectors() {
        let index = index_with(vec![("1", vec![1.0, 0.0, 0.0])]).await;
        index.reset(3).await.unwrap();
        assert!(index.is_empty());
        assert!(index.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_hnsw_finds_exact_vector() {
        let index = MemoryIndex::new("large");
        index.reset(3).await.unwrap();

        let vectors: Vec<IndexedVector> = (0..400)
            .map(|i| {
                let angle = i as f32 * 0.01;
                IndexedVector::new(i.to_string(), vec![angle.cos(), angle.sin(), 0.5])
            })
            .collect();
        index.upsert(vectors).await.unwrap();

        let angle = 123.0_f32 * 0.01;
        let matches = index
            .query(&[angle.cos(), angle.sin(), 0.5], 3)
            .await
            .unwrap();

        assert!(index.hnsw.read().is_some());
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].id, "123");
    }

    #[tokio::test]
    async fn test_graph_from_stale_snapshot_is_discarded() {
        let index = index_with(vec![
            ("1", vec![1.0, 0.0, 0.0]),
            ("2", vec![0.0, 1.0, 0.0]),
            ("3", vec![0.0, 0.0, 1.0]),
        ])
        .await;

        let generation = index.generation.load(Ordering::Acquire);
        let (ids, points) = index.snapshot();
        let stale = build_graph(points, ids);

        // A write lands while the graph is being built
        index
            .upsert(vec![IndexedVector::new("4", vec![1.0, 1.0, 0.0])])
            .await
            .unwrap();

        assert!(!index.install_graph(stale, generation));
        assert!(index.hnsw.read().is_none());

        let generation = index.generation.load(Ordering::Acquire);
        let (ids, points) = index.snapshot();
        assert!(index.install_graph(build_graph(points, ids), generation));
        assert!(index.hnsw.read().is_some());

        let matches = index.query(&[1.0, 1.0, 0.0], 1).await.unwrap();
        assert_eq!(matches[0].id, "4");
    }
}
