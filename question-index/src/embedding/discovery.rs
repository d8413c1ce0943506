//! Model path discovery utilities
//!
//! Finds the GloVe vectors file across the usual installation locations.

use super::download::default_models_dir;
use crate::error::{Result, SearchError};
use std::path::{Path, PathBuf};

/// File name of the 300d GloVe 6B vectors
pub const GLOVE_FILE_NAME: &str = "glove.6B.300d.txt";

/// Find the GloVe vectors file with priority:
/// 1. Explicit path (CLI flag)
/// 2. QUESTION_SEARCH_GLOVE_PATH environment variable
/// 3. Data directory (next to the downloaded dataset)
/// 4. User home directory (~/.question-search/models)
pub fn find_glove_path(explicit: Option<&Path>, data_dir: &Path) -> Result<PathBuf> {
    // Priority 1: explicit path
    if let Some(path) = explicit {
        if path.is_file() {
            log::info!("Using GloVe vectors: {}", path.display());
            return Ok(path.to_path_buf());
        }
        return Err(SearchError::model(format!(
            "GloVe vectors not found at: {}",
            path.display()
        )));
    }

    // Priority 2: environment variable
    if let Ok(env_path) = std::env::var("QUESTION_SEARCH_GLOVE_PATH") {
        let path = PathBuf::from(&env_path);
        if path.is_file() {
            log::info!("Using QUESTION_SEARCH_GLOVE_PATH: {}", path.display());
            return Ok(path);
        }
        log::warn!(
            "QUESTION_SEARCH_GLOVE_PATH set but file not found: {}",
            env_path
        );
    }

    // Priority 3: data directory
    let local = data_dir.join(GLOVE_FILE_NAME);
    if local.is_file() {
        log::info!("Using GloVe vectors from data dir: {}", local.display());
        return Ok(local);
    }

    // Priority 4: user home directory
    if let Some(models) = default_models_dir() {
        let user_path = models.join(GLOVE_FILE_NAME);
        if user_path.is_file() {
            log::info!("Using user GloVe vectors: {}", user_path.display());
            return Ok(user_path);
        }
    }

    Err(SearchError::model(format!(
        "GloVe vectors not found. Checked:\n\
         - QUESTION_SEARCH_GLOVE_PATH environment variable\n\
         - {}\n\
         - ~/.question-search/models/{}\n\
         \n\
         Enable the automatic download, or fetch glove.6B.zip from \
         https://nlp.stanford.edu/projects/glove/ and extract {}.",
        local.display(),
        GLOVE_FILE_NAME,
        GLOVE_FILE_NAME
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vectors.txt");
        std::fs::write(&file, "a 1.0\n").unwrap();

        let found = find_glove_path(Some(&file), Path::new("/nonexistent")).unwrap();
        assert_eq!(found, file);
    }

    #[test]
    fn test_explicit_missing_path_errors() {
        let result = find_glove_path(Some(Path::new("/nonexistent/vectors.txt")), Path::new("."));
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_data_dir_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(GLOVE_FILE_NAME);
        std::fs::write(&file, "a 1.0\n").unwrap();

        if std::env::var_os("QUESTION_SEARCH_GLOVE_PATH").is_some() {
            // The environment variable outranks the data directory
            return;
        }

        let found = find_glove_path(None, dir.path()).unwrap();
        assert_eq!(found, file);
    }
}
