//! Vector index backends
//!
//! `PineconeIndex` talks to the managed Pinecone service over REST,
//! `MemoryIndex` keeps vectors in-process behind an HNSW graph.

mod memory;
mod pinecone;

pub use memory::MemoryIndex;
pub use pinecone::{PineconeConfig, PineconeIndex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default number of vectors per upsert request
pub const DEFAULT_UPSERT_BATCH: usize = 100;

/// A vector to store, keyed by the question id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVector {
    pub id: String,
    pub values: Vec<f32>,
}

impl IndexedVector {
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }
}

/// A nearest-neighbour match, higher score is more similar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
}

/// Vector index operations used by the search service
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Index name used in logs
    fn name(&self) -> &str;

    /// Whether the index currently exists
    async fn exists(&self) -> Result<bool>;

    /// Drop the index if it exists and create it empty with `dimension`
    async fn reset(&self, dimension: usize) -> Result<()>;

    /// Insert or overwrite vectors by id, returns how many were written
    async fn upsert(&self, vectors: Vec<IndexedVector>) -> Result<usize>;

    /// Up to `top_k` matches, most similar first
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;
}

/// Upsert vectors in fixed-size batches
pub async fn upsert_in_batches(
    index: &dyn VectorIndex,
    vectors: Vec<IndexedVector>,
    batch_size: usize,
) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let total = vectors.len();
    let mut written = 0;
    let mut iter = vectors.into_iter().peekable();

    while iter.peek().is_some() {
        let batch: Vec<IndexedVector> = iter.by_ref().take(batch_size).collect();
        written += index.upsert(batch).await?;
    }

    log::debug!("Upserted {}/{} vectors into {}", written, total, index.name());
    Ok(written)
}
