//! Question dataset
//!
//! Downloads the Quora question pairs TSV once into a local data directory and
//! loads the `qid1` / `question1` columns into a de-duplicated, shuffled set.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use crate::error::{Result, SearchError};
use crate::fetch::{download_client, fetch_to};

/// Default location of the Quora duplicate questions dataset
pub const DEFAULT_DATASET_URL: &str = "https://qim.fs.quoracdn.net/quora_duplicate_questions.tsv";

const ID_COLUMN: &str = "qid1";
const TEXT_COLUMN: &str = "question1";

/// Dataset configuration
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Remote URL of the TSV file
    pub url: String,
    /// Local directory the file is cached in (default: `tmp`)
    pub data_dir: PathBuf,
    /// File name inside `data_dir`
    pub file_name: String,
    /// Keep at most this many rows after shuffling
    pub max_rows: Option<usize>,
    /// Seed for a reproducible shuffle; random when unset
    pub shuffle_seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATASET_URL.to_string(),
            data_dir: PathBuf::from("tmp"),
            file_name: "quora_duplicate_questions.tsv".to_string(),
            max_rows: None,
            shuffle_seed: None,
        }
    }
}

impl DatasetConfig {
    /// Full path of the cached dataset file
    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    fn partial_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.part", self.file_name))
    }
}

/// A single question row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: u64,
    pub text: String,
}

impl QuestionRecord {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// In-memory question collection
///
/// Each id maps to at most one row. Never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct QuestionSet {
    records: Vec<QuestionRecord>,
    by_id: HashMap<u64, usize>,
}

impl QuestionSet {
    /// Build the set: drop duplicate ids (first occurrence wins), shuffle,
    /// then truncate to `max_rows`.
    pub fn from_records(
        records: Vec<QuestionRecord>,
        shuffle_seed: Option<u64>,
        max_rows: Option<usize>,
    ) -> Self {
        let total = records.len();
        let mut seen = HashSet::with_capacity(total);
        let mut unique: Vec<QuestionRecord> = records
            .into_iter()
            .filter(|record| seen.insert(record.id))
            .collect();

        let duplicates = total - unique.len();
        if duplicates > 0 {
            log::debug!("Dropped {} duplicate question rows", duplicates);
        }

        match shuffle_seed {
            Some(seed) => unique.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => unique.shuffle(&mut rand::thread_rng()),
        }

        if let Some(limit) = max_rows {
            unique.truncate(limit);
        }

        let by_id = unique
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.id, pos))
            .collect();

        Self {
            records: unique,
            by_id,
        }
    }

    /// Look up a question by id
    pub fn get(&self, id: u64) -> Option<&QuestionRecord> {
        self.by_id.get(&id).map(|&pos| &self.records[pos])
    }

    /// Look up a question by the string id stored in the vector index
    pub fn get_str(&self, id: &str) -> Option<&QuestionRecord> {
        id.parse::<u64>().ok().and_then(|id| self.get(id))
    }

    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Download the dataset unless it is already cached
///
/// The body is streamed to `<file>.part` and renamed once complete, so an
/// interrupted download is never mistaken for the real file.
pub async fn download_dataset(config: &DatasetConfig) -> Result<PathBuf> {
    let target = config.file_path();
    if target.exists() {
        log::debug!("Dataset already available at: {}", target.display());
        return Ok(target);
    }

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let partial = config.partial_path();
    if partial.exists() {
        log::warn!("Found partial download, cleaning up...");
        tokio::fs::remove_file(&partial).await?;
    }

    log::info!("Downloading dataset from {}...", config.url);

    let client = download_client()?;
    match fetch_to(&client, &config.url, &partial).await {
        Ok(bytes) => {
            tokio::fs::rename(&partial, &target).await?;
            let size_mb = bytes as f64 / (1024.0 * 1024.0);
            log::info!("Dataset downloaded: {} ({:.1} MB)", target.display(), size_mb);
            Ok(target)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            Err(e)
        }
    }
}

/// Parse question rows from a tab-separated reader with a header row
///
/// Only `qid1` and `question1` are used; rows with an empty question are skipped.
pub fn read_questions<R: Read>(reader: R) -> Result<Vec<QuestionRecord>> {
    let mut tsv = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = tsv.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| SearchError::dataset(format!("Missing column '{}'", name)))
    };
    let id_col = column(ID_COLUMN)?;
    let text_col = column(TEXT_COLUMN)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in tsv.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let raw_id = row.get(id_col).unwrap_or_default().trim();
        let id = raw_id.parse::<u64>().map_err(|_| {
            SearchError::dataset(format!("Invalid {} '{}' on line {}", ID_COLUMN, raw_id, line))
        })?;

        match row.get(text_col).map(str::trim) {
            Some(text) if !text.is_empty() => records.push(QuestionRecord::new(id, text)),
            _ => {
                log::debug!("Skipping question {} on line {}: empty text", id, line);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} rows without question text", skipped);
    }

    Ok(records)
}

/// Read the cached dataset file and build the question set
pub fn load_questions(path: &Path, config: &DatasetConfig) -> Result<QuestionSet> {
    let file = File::open(path)?;
    let records = read_questions(BufReader::new(file))?;
    let set = QuestionSet::from_records(records, config.shuffle_seed, config.max_rows);

    log::info!("Loaded {} questions from {}", set.len(), path.display());
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "id\tqid1\tqid2\tquestion1\tquestion2\tis_duplicate\n\
        0\t1\t2\tWhat is the step by step guide to invest in share market?\tWhat is the step by step guide to invest in share market in india?\t0\n\
        1\t3\t4\tHow do I read and find my YouTube comments?\tHow can I see all my Youtube comments?\t1\n\
        2\t1\t6\tWhat is the step by step guide to invest in share market?\tHow to invest?\t0\n\
        3\t7\t8\t\tWhy is the sky blue?\t0\n\
        4\t9\t10\t\"Why do \"\"quotes\"\" survive?\"\tOther\t0\n";

    fn sample_records() -> Vec<QuestionRecord> {
        read_questions(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_read_questions_uses_header_columns() {
        let records = sample_records();
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 1, 9]);
        assert_eq!(
            records[1].text,
            "How do I read and find my YouTube comments?"
        );
        assert_eq!(records[3].text, "Why do \"quotes\" survive?");
    }

    #[test]
    fn test_read_questions_missing_column() {
        let result = read_questions("id\tquestion\n1\tHello\n".as_bytes());
        match result {
            Err(SearchError::Dataset(msg)) => assert!(msg.contains("qid1")),
            other => panic!("Expected dataset error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_questions_invalid_id() {
        let result = read_questions("qid1\tquestion1\nabc\tHello\n".as_bytes());
        match result {
            Err(SearchError::Dataset(msg)) => {
                assert!(msg.contains("abc"));
                assert!(msg.contains("line 2"));
            }
            other => panic!("Expected dataset error, got {:?}", other),
        }
    }

    #[test]
    fn test_question_set_drops_duplicate_ids() {
        let records = vec![
            QuestionRecord::new(1, "first"),
            QuestionRecord::new(2, "second"),
            QuestionRecord::new(1, "first again"),
        ];
        let set = QuestionSet::from_records(records, Some(7), None);

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).unwrap().text, "first");
        assert_eq!(set.get_str("2").unwrap().text, "second");
        assert!(set.get(3).is_none());
        assert!(set.get_str("not-a-number").is_none());
    }

    #[test]
    fn test_seeded_shuffle_is_deterministic_permutation() {
        let records: Vec<QuestionRecord> = (0..50)
            .map(|i| QuestionRecord::new(i, format!("question {}", i)))
            .collect();

        let a = QuestionSet::from_records(records.clone(), Some(42), None);
        let b = QuestionSet::from_records(records.clone(), Some(42), None);
        assert_eq!(a.records(), b.records());

        let mut ids: Vec<u64> = a.iter().map(|r| r.id).collect();
        assert_ne!(ids, (0..50).collect::<Vec<_>>());
        ids.sort_unstable();
        assert_eq!(ids, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_max_rows_applies_after_dedup() {
        let set = QuestionSet::from_records(sample_records(), Some(1), Some(2));
        assert_eq!(set.len(), 2);
        for record in set.iter() {
            assert_eq!(set.get(record.id), Some(record));
        }
    }

    #[test]
    fn test_load_questions_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.tsv");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = DatasetConfig {
            shuffle_seed: Some(3),
            ..Default::default()
        };
        let set = load_questions(&path, &config).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[tokio::test]
    async fn test_download_skips_cached_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig {
            url: "http://127.0.0.1:9/unreachable.tsv".to_string(),
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        std::fs::write(config.file_path(), SAMPLE).unwrap();

        let path = download_dataset(&config).await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), SAMPLE);
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/questions.tsv")
            .with_status(200)
            .with_body(SAMPLE)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig {
            url: format!("{}/questions.tsv", server.url()),
            data_dir: dir.path().join("nested"),
            ..Default::default()
        };

        let path = download_dataset(&config).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
        assert!(!config.partial_path().exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/questions.tsv")
            .with_status(503)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig {
            url: format!("{}/questions.tsv", server.url()),
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let err = download_dataset(&config).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(!config.file_path().exists());
        assert!(!config.partial_path().exists());
    }
}
