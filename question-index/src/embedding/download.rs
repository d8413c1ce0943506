//! Auto-download of the GloVe vectors
//!
//! Fetches the `glove.6B.zip` archive on first start and extracts the 300d
//! table into the models directory (`~/.question-search/models/` by default).
//! Later starts find the extracted file and skip the network.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::discovery::GLOVE_FILE_NAME;
use crate::error::{Result, SearchError};
use crate::fetch::{download_client, fetch_to};

/// Stanford distribution of the GloVe 6B vectors
pub const GLOVE_ARCHIVE_URL: &str = "https://nlp.stanford.edu/data/glove.6B.zip";

const ARCHIVE_PART: &str = "glove.6B.zip.part";

/// `~/.question-search/models`
pub fn default_models_dir() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
    Some(PathBuf::from(home).join(".question-search").join("models"))
}

/// Ensure `glove.6B.300d.txt` exists in `target_dir`, downloading the archive if needed
pub async fn download_glove(archive_url: &str, target_dir: &Path) -> Result<PathBuf> {
    let target = target_dir.join(GLOVE_FILE_NAME);
    if target.is_file() {
        log::debug!("GloVe vectors already available at: {}", target.display());
        return Ok(target);
    }

    tokio::fs::create_dir_all(target_dir).await?;

    // Clean up partial downloads from a previous interrupted attempt
    let archive = target_dir.join(ARCHIVE_PART);
    if archive.exists() {
        log::warn!("Found partial GloVe download, cleaning up...");
        tokio::fs::remove_file(&archive).await?;
    }

    log::info!(
        "Downloading GloVe vectors from {} to {}...",
        archive_url,
        target_dir.display()
    );

    let result = fetch_and_extract(archive_url, &archive, &target).await;
    let _ = tokio::fs::remove_file(&archive).await;
    result?;

    log::info!("GloVe vectors ready at {}", target.display());
    Ok(target)
}

async fn fetch_and_extract(archive_url: &str, archive: &Path, target: &Path) -> Result<()> {
    let client = download_client()?;
    let bytes = fetch_to(&client, archive_url, archive).await?;
    log::info!(
        "GloVe archive downloaded ({:.1} MB), extracting {}",
        bytes as f64 / (1024.0 * 1024.0),
        GLOVE_FILE_NAME
    );

    let archive = archive.to_path_buf();
    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || extract_entry(&archive, GLOVE_FILE_NAME, &target))
        .await
        .map_err(|e| SearchError::model(format!("GloVe extraction task failed: {}", e)))?
}

/// Copy one archive entry to `dest` through a `.part` file
fn extract_entry(archive: &Path, entry: &str, dest: &Path) -> Result<()> {
    let reader = BufReader::new(File::open(archive)?);
    let mut zip = zip::ZipArchive::new(reader)
        .map_err(|e| SearchError::model(format!("Invalid GloVe archive: {}", e)))?;
    let mut source = zip
        .by_name(entry)
        .map_err(|e| SearchError::model(format!("{} missing from archive: {}", entry, e)))?;

    let partial = dest.with_file_name(format!("{}.part", entry));
    let copied = File::create(&partial).and_then(|file| {
        let mut out = BufWriter::new(file);
        std::io::copy(&mut source, &mut out)?;
        out.flush()
    });

    match copied {
        Ok(()) => {
            std::fs::rename(&partial, dest)?;
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            Err(e.into())
        }
    }
}
