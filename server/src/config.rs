//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use question_index::dataset::DEFAULT_DATASET_URL;
use question_index::{DatasetConfig, PineconeConfig, SearchConfig, GLOVE_ARCHIVE_URL};

/// Vector index backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Managed Pinecone serverless index
    Pinecone,
    /// In-process HNSW index (nothing leaves the machine)
    Memory,
}

/// Embedding model
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    /// GloVe 6B 300d average word embeddings
    Glove,
    /// BGE-Small-EN-v1.5 through fastembed
    BgeSmall,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "question-search")]
#[command(about = "Question similarity search over a vector index")]
#[command(version)]
pub struct Args {
    /// Address the HTTP server listens on
    #[arg(long, env = "QUESTION_SEARCH_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Vector index backend
    #[arg(long, env = "QUESTION_SEARCH_BACKEND", value_enum, default_value_t = Backend::Pinecone)]
    pub backend: Backend,

    /// Name of the vector index
    #[arg(long, env = "PINECONE_INDEX_NAME", default_value = "question-answering-chatbot")]
    pub index_name: String,

    /// Pinecone API key (required for the pinecone backend)
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Pinecone control plane URL
    #[arg(long, env = "PINECONE_CONTROLLER_URL", default_value = "https://api.pinecone.io")]
    pub pinecone_controller_url: String,

    /// Serverless cloud for new indexes
    #[arg(long, default_value = "aws")]
    pub pinecone_cloud: String,

    /// Serverless region for new indexes
    #[arg(long, default_value = "us-east-1")]
    pub pinecone_region: String,

    /// Embedding model
    #[arg(long, env = "QUESTION_SEARCH_MODEL", value_enum, default_value_t = ModelKind::Glove)]
    pub model: ModelKind,

    /// Path to glove.6B.300d.txt (discovered when omitted)
    #[arg(long, env = "QUESTION_SEARCH_GLOVE_PATH")]
    pub glove_path: Option<PathBuf>,

    /// Directory for downloaded models (fastembed cache, GloVe vectors);
    /// GloVe defaults to ~/.question-search/models
    #[arg(long, env = "QUESTION_SEARCH_MODEL_CACHE")]
    pub model_cache: Option<PathBuf>,

    /// Archive the GloVe vectors are downloaded from when none are installed
    #[arg(long, env = "QUESTION_SEARCH_GLOVE_URL", default_value = GLOVE_ARCHIVE_URL)]
    pub glove_url: String,

    /// Fail instead of downloading missing GloVe vectors
    #[arg(long)]
    pub no_model_download: bool,

    /// Directory the dataset is downloaded into
    #[arg(long, env = "QUESTION_SEARCH_DATA_DIR", default_value = "tmp")]
    pub data_dir: PathBuf,

    /// Dataset URL
    #[arg(long, env = "QUESTION_SEARCH_DATASET_URL", default_value = DEFAULT_DATASET_URL)]
    pub dataset_url: String,

    /// Index at most this many questions
    #[arg(long, env = "QUESTION_SEARCH_MAX_ROWS")]
    pub max_rows: Option<usize>,

    /// Results per query when the request does not pass top_k
    #[arg(long, env = "QUESTION_SEARCH_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Vectors per upsert request
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Seed for the dataset shuffle
    #[arg(long, env = "QUESTION_SEARCH_SEED")]
    pub seed: Option<u64>,

    /// Keep an existing index instead of recreating and re-filling it
    #[arg(long)]
    pub reuse_index: bool,
}

impl Args {
    pub fn dataset_config(&self) -> DatasetConfig {
        DatasetConfig {
            url: self.dataset_url.clone(),
            data_dir: self.data_dir.clone(),
            max_rows: self.max_rows,
            shuffle_seed: self.seed,
            ..Default::default()
        }
    }

    pub fn pinecone_config(&self) -> PineconeConfig {
        PineconeConfig {
            api_key: self.pinecone_api_key.clone().unwrap_or_default(),
            index_name: self.index_name.clone(),
            controller_url: self.pinecone_controller_url.clone(),
            cloud: self.pinecone_cloud.clone(),
            region: self.pinecone_region.clone(),
            ..Default::default()
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            default_top_k: self.top_k,
            upsert_batch_size: self.batch_size,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["question-search", "--backend", "memory"]).unwrap();
        assert_eq!(args.backend, Backend::Memory);
        assert_eq!(args.model, ModelKind::Glove);
        assert_eq!(args.bind.port(), 5000);
        assert_eq!(args.index_name, "question-answering-chatbot");
        assert_eq!(args.top_k, 5);
        assert!(!args.reuse_index);
        assert!(!args.no_model_download);
        assert_eq!(args.glove_url, GLOVE_ARCHIVE_URL);

        let dataset = args.dataset_config();
        assert_eq!(dataset.url, DEFAULT_DATASET_URL);
        assert_eq!(dataset.file_path(), PathBuf::from("tmp/quora_duplicate_questions.tsv"));
    }

    #[test]
    fn test_flags_map_to_library_configs() {
        let args = Args::try_parse_from([
            "question-search",
            "--backend",
            "pinecone",
            "--pinecone-api-key",
            "secret",
            "--index-name",
            "quora",
            "--model",
            "bge-small",
            "--max-rows",
            "1000",
            "--seed",
            "9",
            "--top-k",
            "10",
            "--batch-size",
            "50",
            "--reuse-index",
        ])
        .unwrap();

        assert_eq!(args.model, ModelKind::BgeSmall);
        assert!(args.reuse_index);

        let pinecone = args.pinecone_config();
        assert_eq!(pinecone.api_key, "secret");
        assert_eq!(pinecone.index_name, "quora");
        assert_eq!(pinecone.metric, "cosine");

        let dataset = args.dataset_config();
        assert_eq!(dataset.max_rows, Some(1000));
        assert_eq!(dataset.shuffle_seed, Some(9));

        let search = args.search_config();
        assert_eq!(search.default_top_k, 10);
        assert_eq!(search.upsert_batch_size, 50);
    }

    #[test]
    fn test_invalid_backend_rejected() {
        assert!(Args::try_parse_from(["question-search", "--backend", "redis"]).is_err());
    }
}
