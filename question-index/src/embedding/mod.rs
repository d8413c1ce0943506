//! Embedding module for semantic search
//!
//! GloVe average word embeddings (300d) by default, BGE-small through
//! fastembed as the ONNX alternative.

mod discovery;
mod download;
mod engine;
mod glove;
mod onnx;

pub use discovery::{find_glove_path, GLOVE_FILE_NAME};
pub use download::{default_models_dir, download_glove, GLOVE_ARCHIVE_URL};
pub use engine::{cosine_similarity, VectorEngine};
pub use glove::{GloveConfig, GloveEmbedding};
pub use onnx::FastEmbedding;

use crate::error::Result;

/// A text embedding model
pub trait TextEncoder: Send + Sync {
    /// Short model name used in logs
    fn name(&self) -> &str;

    /// Length of every produced vector
    fn dimension(&self) -> usize;

    /// Embed texts, one vector per input in input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}
