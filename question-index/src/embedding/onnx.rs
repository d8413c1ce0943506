//! ONNX sentence embeddings via fastembed (BGE-Small-EN-v1.5, 384d)

use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;

use super::TextEncoder;
use crate::error::{Result, SearchError};

/// BGE-small sentence embedding model
pub struct FastEmbedding {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    batch_size: usize,
}

impl FastEmbedding {
    /// Load BGE-Small-EN-v1.5, downloading it into `cache_dir` on first use
    pub fn new(cache_dir: Option<PathBuf>) -> Result<Self> {
        let mut options =
            InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        log::info!("Loading fastembed model BGE-Small-EN-v1.5");

        let model = TextEmbedding::try_new(options)
            .map_err(|e| SearchError::model(format!("Failed to load fastembed model: {}", e)))?;

        let sample = model
            .embed(vec!["test"], None)
            .map_err(|e| SearchError::model(format!("Failed to encode test string: {}", e)))?;
        let dimension = sample.first().map(Vec::len).unwrap_or_default();

        log::info!("Loaded fastembed model ({}d)", dimension);

        Ok(Self {
            model: Mutex::new(model),
            dimension,
            batch_size: 256,
        })
    }
}

impl TextEncoder for FastEmbedding {
    fn name(&self) -> &str {
        "bge-small"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        self.model
            .lock()
            .embed(texts.to_vec(), Some(self.batch_size))
            .map_err(|e| SearchError::embedding(format!("Failed to encode texts: {}", e)))
    }
}
