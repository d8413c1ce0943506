//! Vector embedding engine
//!
//! High-level API for generating and caching embeddings.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::TextEncoder;
use crate::error::{Result, SearchError};

const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Vector embedding engine with caching
///
/// Single-text lookups (search queries) go through a bounded LRU cache.
/// Batch embedding is the bulk ingestion path and is not cached.
pub struct VectorEngine {
    model: Arc<dyn TextEncoder>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    dimension: usize,
}

impl VectorEngine {
    /// Create a VectorEngine around a loaded model
    pub fn new(model: Arc<dyn TextEncoder>) -> Self {
        Self::with_cache_capacity(model, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a VectorEngine with a custom query cache size
    pub fn with_cache_capacity(model: Arc<dyn TextEncoder>, capacity: usize) -> Self {
        let dimension = model.dimension();
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        log::info!("VectorEngine ready ({}, {}d)", model.name(), dimension);

        Self {
            model,
            cache: Mutex::new(LruCache::new(capacity)),
            dimension,
        }
    }

    /// Generate embedding with caching
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lock().get(text) {
            return Ok(cached.clone());
        }

        let embedding = self
            .model
            .embed_batch(&[text])?
            .pop()
            .ok_or_else(|| SearchError::embedding("Model returned no vector"))?;

        self.cache.lock().put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    /// Batch embed without caching
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let embeddings = self.model.embed_batch(texts)?;
        if embeddings.len() != texts.len() {
            return Err(SearchError::embedding(format!(
                "Model returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Name of the underlying model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.cache.lock().len()
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
