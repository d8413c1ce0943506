//! Startup pipeline
//!
//! Loads the embedding model, prepares the vector index, fetches the dataset
//! and fills the index before the HTTP server starts answering.

use std::path::PathBuf;
use std::sync::Arc;

use question_index::{
    default_models_dir, download_dataset, download_glove, find_glove_path, load_questions,
    FastEmbedding, GloveEmbedding, MemoryIndex, PineconeIndex, QuestionSearch, QuestionSet,
    TextEncoder, VectorEngine, VectorIndex,
};

use crate::config::{Args, Backend, ModelKind};
use crate::error::{ServerError, ServerResult};

/// Load the configured embedding model off the async runtime
pub async fn load_engine(args: &Args) -> ServerResult<Arc<VectorEngine>> {
    let encoder: Arc<dyn TextEncoder> = match args.model {
        ModelKind::Glove => {
            let path = resolve_glove_path(args).await?;
            let model =
                tokio::task::spawn_blocking(move || GloveEmbedding::from_file(&path)).await??;
            Arc::new(model)
        }
        ModelKind::BgeSmall => {
            let cache = args.model_cache.clone();
            let model = tokio::task::spawn_blocking(move || FastEmbedding::new(cache)).await??;
            Arc::new(model)
        }
    };

    Ok(Arc::new(VectorEngine::new(encoder)))
}

/// Locate the GloVe vectors, downloading them when none are installed
///
/// An explicit `--glove-path` or `--no-model-download` keeps the discovery error.
pub async fn resolve_glove_path(args: &Args) -> ServerResult<PathBuf> {
    let not_found = match find_glove_path(args.glove_path.as_deref(), &args.data_dir) {
        Ok(path) => return Ok(path),
        Err(e) => e,
    };

    if args.glove_path.is_some() || args.no_model_download {
        return Err(not_found.into());
    }
    let Some(models_dir) = args.model_cache.clone().or_else(default_models_dir) else {
        return Err(not_found.into());
    };

    tracing::info!("GloVe vectors not installed, fetching {}", args.glove_url);
    Ok(download_glove(&args.glove_url, &models_dir).await?)
}

/// Build the configured index backend
pub fn open_index(args: &Args) -> ServerResult<Arc<dyn VectorIndex>> {
    match args.backend {
        Backend::Memory => Ok(Arc::new(MemoryIndex::new(args.index_name.clone()))),
        Backend::Pinecone => {
            if args
                .pinecone_api_key
                .as_deref()
                .map_or(true, |key| key.trim().is_empty())
            {
                return Err(ServerError::Config(
                    "PINECONE_API_KEY is not set (use --backend memory to run without Pinecone)"
                        .to_string(),
                ));
            }
            Ok(Arc::new(PineconeIndex::new(args.pinecone_config())?))
        }
    }
}

/// Reset the index unless an existing one may be reused
///
/// Returns whether the index is empty and needs to be filled.
pub async fn prepare_index(
    index: &dyn VectorIndex,
    dimension: usize,
    reuse: bool,
) -> ServerResult<bool> {
    if reuse && index.exists().await? {
        tracing::info!("Reusing existing index '{}'", index.name());
        return Ok(false);
    }

    index.reset(dimension).await?;
    Ok(true)
}

/// Download (once) and load the question dataset
pub async fn load_dataset(args: &Args) -> ServerResult<Arc<QuestionSet>> {
    let config = args.dataset_config();
    let path = download_dataset(&config).await?;

    let questions = tokio::task::spawn_blocking(move || load_questions(&path, &config)).await??;
    if questions.is_empty() {
        return Err(ServerError::Config("Dataset contains no questions".to_string()));
    }

    Ok(Arc::new(questions))
}

/// Run the whole startup pipeline and return a ready search service
pub async fn build_search(args: &Args) -> ServerResult<Arc<QuestionSearch>> {
    let index = open_index(args)?;

    tracing::info!("Loading embedding model ({:?})", args.model);
    let engine = load_engine(args).await?;

    let needs_ingest = prepare_index(index.as_ref(), engine.dimension(), args.reuse_index).await?;

    let questions = load_dataset(args).await?;
    tracing::info!("Dataset ready: {} questions", questions.len());

    let search = QuestionSearch::new(engine, index, questions, args.search_config());
    if needs_ingest {
        let written = search.ingest().await?;
        tracing::info!("Index '{}' filled with {} vectors", search.index().name(), written);
    }

    Ok(Arc::new(search))
}
