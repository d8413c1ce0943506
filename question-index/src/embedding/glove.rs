//! GloVe average word embeddings
//!
//! Static embeddings from a word-vector lookup table: a sentence vector is the
//! mean of the vectors of its known words (300d for glove.6B.300d).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::TextEncoder;
use crate::error::{Result, SearchError};

/// GloVe configuration
#[derive(Debug, Clone)]
pub struct GloveConfig {
    /// Lowercase tokens before lookup (default: true, GloVe 6B is uncased)
    pub lowercase: bool,
    /// Stop loading after this many words (default: all)
    pub max_words: Option<usize>,
}

impl Default for GloveConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            max_words: None,
        }
    }
}

/// Average-word-embedding model backed by a GloVe lookup table
pub struct GloveEmbedding {
    vectors: HashMap<String, Vec<f32>>,
    config: GloveConfig,
    dimension: usize,
}

impl GloveEmbedding {
    /// Load from a GloVe text file (`word v1 v2 ... vN` per line)
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_config(path, GloveConfig::default())
    }

    /// Load with custom configuration
    pub fn from_file_with_config(path: &Path, config: GloveConfig) -> Result<Self> {
        if !path.exists() {
            return Err(SearchError::model(format!(
                "GloVe vectors not found at: {}",
                path.display()
            )));
        }

        log::info!("Loading GloVe vectors from: {}", path.display());

        let file = File::open(path)?;
        let model = Self::from_reader(BufReader::new(file), config)?;

        log::info!(
            "Loaded GloVe ({}d, {} words)",
            model.dimension,
            model.vocabulary_size()
        );

        Ok(model)
    }

    /// Parse vectors from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R, config: GloveConfig) -> Result<Self> {
        let mut vectors = HashMap::new();
        let mut dimension = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            if config.max_words.is_some_and(|max| vectors.len() >= max) {
                break;
            }

            let line = line?;
            let mut parts = line.split(' ');
            let word = match parts.next() {
                Some(word) if !word.is_empty() => word,
                _ => continue,
            };

            let values = parts
                .filter(|p| !p.is_empty())
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| {
                    SearchError::model(format!("Invalid vector on line {}: {}", line_no + 1, e))
                })?;

            if dimension == 0 {
                dimension = values.len();
            } else if values.len() != dimension {
                return Err(SearchError::model(format!(
                    "Line {} has {} values, expected {}",
                    line_no + 1,
                    values.len(),
                    dimension
                )));
            }

            let key = if config.lowercase {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            vectors.entry(key).or_insert(values);
        }

        if dimension == 0 {
            return Err(SearchError::model("GloVe file contains no vectors"));
        }

        Ok(Self {
            vectors,
            config,
            dimension,
        })
    }

    /// Split text into lookup tokens
    ///
    /// Whitespace split, surrounding ASCII punctuation stripped.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|token| token.trim_matches(|c: char| c.is_ascii_punctuation()))
            .filter(|token| !token.is_empty())
            .map(|token| {
                if self.config.lowercase {
                    token.to_lowercase()
                } else {
                    token.to_string()
                }
            })
            .collect()
    }

    /// Embed a single text; unknown-only text yields the zero vector
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0_f32; self.dimension];
        let mut known = 0usize;

        for token in self.tokenize(text) {
            if let Some(vector) = self.vectors.get(&token) {
                for (acc, v) in sum.iter_mut().zip(vector) {
                    *acc += v;
                }
                known += 1;
            }
        }

        if known > 0 {
            let n = known as f32;
            sum.iter_mut().for_each(|x| *x /= n);
        }
        sum
    }

    /// Number of words in the lookup table
    pub fn vocabulary_size(&self) -> usize {
        self.vectors.len()
    }

    pub fn config(&self) -> &GloveConfig {
        &self.config
    }
}

impl TextEncoder for GloveEmbedding {
    fn name(&self) -> &str {
        "glove"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}
