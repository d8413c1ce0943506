//! Question similarity search
//!
//! Embeds the question set into the vector index and answers queries by
//! mapping the index's nearest neighbours back to question rows.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::dataset::QuestionSet;
use crate::embedding::VectorEngine;
use crate::error::{Result, SearchError};
use crate::index::{upsert_in_batches, IndexedVector, VectorIndex, DEFAULT_UPSERT_BATCH};

/// Upper bound for a single request's `top_k`
pub const MAX_TOP_K: usize = 100;

/// Search configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Results returned when the request does not ask for a count (default: 5)
    pub default_top_k: usize,
    /// Texts embedded per batch during ingestion (default: 1024)
    pub embed_batch_size: usize,
    /// Vectors per upsert request (default: 100)
    pub upsert_batch_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            embed_batch_size: 1024,
            upsert_batch_size: DEFAULT_UPSERT_BATCH,
        }
    }
}

/// A single search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Question id as stored in the index
    pub id: String,
    pub question: String,
    pub score: f32,
}

/// Question search service
pub struct QuestionSearch {
    engine: Arc<VectorEngine>,
    index: Arc<dyn VectorIndex>,
    questions: Arc<QuestionSet>,
    config: SearchConfig,
}

impl QuestionSearch {
    pub fn new(
        engine: Arc<VectorEngine>,
        index: Arc<dyn VectorIndex>,
        questions: Arc<QuestionSet>,
        config: SearchConfig,
    ) -> Self {
        Self {
            engine,
            index,
            questions,
            config,
        }
    }

    /// Embed every question and upsert the vectors into the index
    ///
    /// Embedding runs on the blocking pool one batch at a time.
    pub async fn ingest(&self) -> Result<usize> {
        let total = self.questions.len();
        let batch_size = self.config.embed_batch_size.max(1);
        let started = Instant::now();
        let mut written = 0;

        log::info!(
            "Embedding {} questions with {} into '{}'",
            total,
            self.engine.model_name(),
            self.index.name()
        );

        for start in (0..total).step_by(batch_size) {
            let end = (start + batch_size).min(total);
            let engine = self.engine.clone();
            let questions = self.questions.clone();

            let vectors = tokio::task::spawn_blocking(move || {
                let rows = &questions.records()[start..end];
                let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
                let embeddings = engine.embed_batch(&texts)?;
                Ok::<_, SearchError>(
                    rows.iter()
                        .zip(embeddings)
                        .map(|(row, values)| IndexedVector::new(row.id.to_string(), values))
                        .collect::<Vec<_>>(),
                )
            })
            .await
            .map_err(|e| SearchError::embedding(format!("Embedding task failed: {}", e)))??;

            written +=
                upsert_in_batches(self.index.as_ref(), vectors, self.config.upsert_batch_size)
                    .await?;

            log::info!("Indexed {}/{} questions", end, total);
        }

        log::info!(
            "Ingested {} vectors in {:.1}s",
            written,
            started.elapsed().as_secs_f32()
        );
        Ok(written)
    }

    /// Find the questions most similar to `question`
    ///
    /// `top_k` falls back to the configured default and is clamped to
    /// `1..=MAX_TOP_K`. An empty question returns no hits.
    pub async fn search(&self, question: &str, top_k: Option<usize>) -> Result<Vec<SearchHit>> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(vec![]);
        }

        let top_k = top_k
            .unwrap_or(self.config.default_top_k)
            .clamp(1, MAX_TOP_K);

        let engine = self.engine.clone();
        let text = question.to_string();
        let query_vector = tokio::task::spawn_blocking(move || engine.embed(&text))
            .await
            .map_err(|e| SearchError::embedding(format!("Embedding task failed: {}", e)))??;

        let matches = self.index.query(&query_vector, top_k).await?;

        let hits: Vec<SearchHit> = matches
            .into_iter()
            .filter_map(|m| match self.questions.get_str(&m.id) {
                Some(record) => Some(SearchHit {
                    id: m.id,
                    question: record.text.clone(),
                    score: m.score,
                }),
                None => {
                    log::debug!("Index returned unknown id {}", m.id);
                    None
                }
            })
            .collect();

        log::debug!("Query {:?} -> {} hits", question, hits.len());
        Ok(hits)
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::QuestionRecord;
    use crate::embedding::TextEncoder;
    use crate::index::{IndexMatch, MemoryIndex};
    use async_trait::async_trait;

    /// Maps a few keywords onto fixed axes
    struct KeywordEncoder;

    impl TextEncoder for KeywordEncoder {
        fn name(&self) -> &str {
            "keywords"
        }

        fn dimension(&self) -> usize {
            3
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    vec![
                        if text.contains("rust") { 1.0 } else { 0.0 },
                        if text.contains("python") { 1.0 } else { 0.0 },
                        0.1,
                    ]
                })
                .collect())
        }
    }

    fn questions() -> Arc<QuestionSet> {
        Arc::new(QuestionSet::from_records(
            vec![
                QuestionRecord::new(1, "How do I learn Rust?"),
                QuestionRecord::new(2, "Is Python good for beginners?"),
                QuestionRecord::new(3, "Rust or Python for scripting?"),
            ],
            Some(0),
            None,
        ))
    }

    async fn service(config: SearchConfig) -> QuestionSearch {
        let engine = Arc::new(VectorEngine::new(Arc::new(KeywordEncoder)));
        let index = Arc::new(MemoryIndex::new("test"));
        index.reset(engine.dimension()).await.unwrap();
        QuestionSearch::new(engine, index, questions(), config)
    }

    #[tokio::test]
    async fn test_ingest_and_search() {
        let search = service(SearchConfig {
            embed_batch_size: 2,
            upsert_batch_size: 1,
            ..Default::default()
        })
        .await;

        assert_eq!(search.ingest().await.unwrap(), 3);

        let hits = search.search("  learning rust  ", Some(2)).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[0].question, "How do I learn Rust?");
        assert_eq!(hits[1].id, "3");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_empty_question_returns_nothing() {
        let search = service(SearchConfig::default()).await;
        search.ingest().await.unwrap();
        assert!(search.search("   ", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_top_k_and_clamp() {
        let search = service(SearchConfig {
            default_top_k: 2,
            ..Default::default()
        })
        .await;
        search.ingest().await.unwrap();

        assert_eq!(search.search("rust", None).await.unwrap().len(), 2);
        assert_eq!(search.search("rust", Some(0)).await.unwrap().len(), 1);
        assert_eq!(search.search("rust", Some(10_000)).await.unwrap().len(), 3);
    }

    /// Returns a fixed match list regardless of the query
    struct FixedIndex(Vec<IndexMatch>);

    #[async_trait]
    impl VectorIndex for FixedIndex {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn exists(&self) -> Result<bool> {
            Ok(true)
        }

        async fn reset(&self, _dimension: usize) -> Result<()> {
            Ok(())
        }

        async fn upsert(&self, vectors: Vec<IndexedVector>) -> Result<usize> {
            Ok(vectors.len())
        }

        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<IndexMatch>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_unknown_ids_are_skipped() {
        let engine = Arc::new(VectorEngine::new(Arc::new(KeywordEncoder)));
        let index = Arc::new(FixedIndex(vec![
            IndexMatch {
                id: "99".to_string(),
                score: 0.9,
            },
            IndexMatch {
                id: "2".to_string(),
                score: 0.8,
            },
            IndexMatch {
                id: "garbage".to_string(),
                score: 0.7,
            },
        ]));
        let search = QuestionSearch::new(engine, index, questions(), SearchConfig::default());

        let hits = search.search("python", None).await.unwrap();
        assert_eq!(
            hits,
            vec![SearchHit {
                id: "2".to_string(),
                question: "Is Python good for beginners?".to_string(),
                score: 0.8,
            }]
        );
    }

    #[test]
    fn test_hit_serialization() {
        let hit = SearchHit {
            id: "42".to_string(),
            question: "Why?".to_string(),
            score: 0.5,
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "42", "question": "Why?", "score": 0.5})
        );
    }
}
