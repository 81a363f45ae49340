//! Local dataset source.

use instructkit_core::{DatasetSource, Error, RawSplit, Result};
use instructkit_hub::read_jsonl_rows;
use std::path::{Path, PathBuf};

/// Reads splits from `<dir>/<split>.jsonl` files.
///
/// The repository id and cache directory passed to [`DatasetSource::fetch`]
/// are ignored; nothing is downloaded.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    dir: PathBuf,
}

impl JsonlSource {
    /// Create a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the split files are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `split`.
    pub fn split_path(&self, split: &str) -> PathBuf {
        self.dir.join(format!("{split}.jsonl"))
    }
}

impl DatasetSource for JsonlSource {
    fn fetch(&self, repo_id: &str, splits: &[String], _cache_dir: &Path) -> Result<Vec<RawSplit>> {
        splits
            .iter()
            .map(|split| {
                let path = self.split_path(split);
                if !path.is_file() {
                    return Err(Error::Dataset(format!(
                        "Split '{}' of {} not found at {}",
                        split,
                        repo_id,
                        path.display()
                    )));
                }
                let rows = read_jsonl_rows(&path)?;
                tracing::debug!(split = %split, path = %path.display(), rows = rows.len(), "Read local split");
                Ok(RawSplit::new(split.clone(), rows))
            })
            .collect()
    }
}
