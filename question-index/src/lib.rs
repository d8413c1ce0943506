//! Question Index
//!
//! Dataset loading, text embeddings and vector index backends behind the
//! question similarity search service.
//!
//! ## Features
//!
//! - **Dataset** - Download and de-duplicate the Quora question pairs TSV
//! - **Static embeddings** - GloVe average word embeddings, or BGE-small via fastembed
//! - **Vector index** - Pinecone REST client, or an in-process HNSW index
//! - **Search** - Embed a query, rank neighbours, map ids back to questions
//!
//! ## Example
//!
//! ```ignore
//! use question_index::{GloveEmbedding, MemoryIndex, QuestionSearch, SearchConfig, VectorEngine};
//!
//! let engine = Arc::new(VectorEngine::new(Arc::new(GloveEmbedding::from_file(&path)?)));
//! let index = Arc::new(MemoryIndex::new("questions"));
//! index.reset(engine.dimension()).await?;
//! let search = QuestionSearch::new(engine, index, Arc::new(questions), SearchConfig::default());
//!
//! search.ingest().await?;
//! let hits = search.search("How do I learn Rust?", None).await?;
//! ```

pub mod dataset;
pub mod embedding;
pub mod error;
mod fetch;
pub mod index;
pub mod search;

// Re-exports for convenience
pub use dataset::{
    download_dataset, load_questions, read_questions, DatasetConfig, QuestionRecord, QuestionSet,
};
pub use embedding::{
    cosine_similarity, default_models_dir, download_glove, find_glove_path, FastEmbedding,
    GloveConfig, GloveEmbedding, TextEncoder, VectorEngine, GLOVE_ARCHIVE_URL, GLOVE_FILE_NAME,
};
pub use error::{Result, SearchError};
pub use index::{
    upsert_in_batches, IndexMatch, IndexedVector, MemoryIndex, PineconeConfig, PineconeIndex,
    VectorIndex, DEFAULT_UPSERT_BATCH,
};
pub use search::{QuestionSearch, SearchConfig, SearchHit, MAX_TOP_K};
