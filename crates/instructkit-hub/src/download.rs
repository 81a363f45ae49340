//! Dataset downloading from HuggingFace Hub.

use crate::decode::read_rows;
use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use instructkit_core::{DatasetSource, Error, RawSplit, Result, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Revision HuggingFace publishes auto-converted Parquet files under.
const PARQUET_REVISION: &str = "refs/convert/parquet";

/// Extensions recognised as data files, in order of preference.
const DATA_EXTENSIONS: &[&str] = &[".parquet", ".jsonl", ".json"];

/// Fetches dataset splits from the HuggingFace Hub.
///
/// Files are downloaded into the `cache_dir` given to [`DatasetSource::fetch`].
/// The chosen files are recorded in a small manifest next to them, so a
/// second fetch into the same directory resolves entirely offline.
#[derive(Debug, Clone, Default)]
pub struct HubDatasetSource {
    /// Optional authentication token.
    pub token: Option<SecretString>,
    /// Optional revision/branch.
    pub revision: Option<String>,
    /// Show download progress bars.
    pub show_progress: bool,
}

impl HubDatasetSource {
    /// Create a source with no token on the default branch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authentication token.
    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        self.token = token;
        self
    }

    /// Set the revision/branch.
    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    /// Enable or disable progress bars.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Token sent to the Hub. Empty tokens are treated as absent.
    fn auth_token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|secret| !secret.is_empty())
            .map(SecretString::expose_secret)
    }

    fn build_api(&self, cache_dir: &Path) -> Result<Api> {
        let mut builder = ApiBuilder::new()
            .with_cache_dir(cache_dir.to_path_buf())
            .with_progress(self.show_progress);

        if let Some(token) = self.auth_token() {
            builder = builder.with_token(Some(token.to_string()));
        }

        builder.build().map_err(|e| Error::Hub(e.to_string()))
    }

    fn dataset_repo(&self, api: &Api, repo_id: &str, revision: Option<&str>) -> ApiRepo {
        match revision {
            Some(rev) => api.repo(Repo::with_revision(
                repo_id.to_string(),
                RepoType::Dataset,
                rev.to_string(),
            )),
            None => api.repo(Repo::new(repo_id.to_string(), RepoType::Dataset)),
        }
    }

    /// Download the data files of every requested split.
    pub fn download_split_files(
        &self,
        repo_id: &str,
        splits: &[String],
        cache_dir: &Path,
    ) -> Result<BTreeMap<String, Vec<PathBuf>>> {
        let api = self.build_api(cache_dir)?;
        let repo = self.dataset_repo(&api, repo_id, self.revision.as_deref());
        let siblings = list_files(&repo)?;

        let mut parquet_siblings: Option<Vec<String>> = None;
        let mut downloaded = BTreeMap::new();

        for split in splits {
            let mut chosen = select_split_files(&siblings, split, splits.len() == 1);
            let mut source_repo = &repo;

            let converted_repo;
            if chosen.is_empty() {
                tracing::debug!(split = %split, "No data files on main branch, trying Parquet conversion");
                converted_repo = self.dataset_repo(&api, repo_id, Some(PARQUET_REVISION));
                if parquet_siblings.is_none() {
                    parquet_siblings = Some(list_files(&converted_repo)?);
                }
                chosen = select_split_files(
                    parquet_siblings.as_deref().unwrap_or_default(),
                    split,
                    false,
                );
                source_repo = &converted_repo;
            }

            if chosen.is_empty() {
                return Err(Error::Hub(format!(
                    "No data files found for split '{}' in dataset '{}'",
                    split, repo_id
                )));
            }

            let mut paths = Vec::with_capacity(chosen.len());
            for filename in &chosen {
                tracing::info!(dataset = %repo_id, file = %filename, "Downloading");
                let path = source_repo
                    .get(filename)
                    .map_err(|e| Error::Hub(e.to_string()))?;
                paths.push(path);
            }
            downloaded.insert(split.clone(), paths);
        }

        Ok(downloaded)
    }
}

impl DatasetSource for HubDatasetSource {
    fn fetch(&self, repo_id: &str, splits: &[String], cache_dir: &Path) -> Result<Vec<RawSplit>> {
        let manifest_path = manifest_path(cache_dir, repo_id);

        let files = match Manifest::load(&manifest_path, repo_id, self.revision.as_deref()) {
            Some(manifest) if manifest.covers(splits) => {
                tracing::info!(
                    dataset = %repo_id,
                    cache = %cache_dir.display(),
                    "Using cached dataset files"
                );
                manifest.splits
            }
            _ => {
                std::fs::create_dir_all(cache_dir)?;
                let files = self.download_split_files(repo_id, splits, cache_dir)?;
                let manifest = Manifest {
                    repo_id: repo_id.to_string(),
                    revision: self.revision.clone(),
                    splits: files.clone(),
                };
                manifest.save(&manifest_path)?;
                files
            }
        };

        let mut result = Vec::with_capacity(splits.len());
        for split in splits {
            let mut rows = Vec::new();
            for path in files.get(split).map(Vec::as_slice).unwrap_or_default() {
                rows.extend(read_rows(path)?);
            }
            tracing::info!(dataset = %repo_id, split = %split, rows = rows.len(), "Loaded split");
            result.push(RawSplit::new(split.clone(), rows));
        }
        Ok(result)
    }
}

/// Record of the files previously downloaded for a dataset.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    repo_id: String,
    revision: Option<String>,
    splits: BTreeMap<String, Vec<PathBuf>>,
}

impl Manifest {
    fn load(path: &Path, repo_id: &str, revision: Option<&str>) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let manifest: Self = serde_json::from_str(&content).ok()?;
        (manifest.repo_id == repo_id && manifest.revision.as_deref() == revision)
            .then_some(manifest)
    }

    fn covers(&self, splits: &[String]) -> bool {
        splits.iter().all(|split| {
            self.splits
                .get(split)
                .is_some_and(|paths| !paths.is_empty() && paths.iter().all(|p| p.exists()))
        })
    }

    fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn manifest_path(cache_dir: &Path, repo_id: &str) -> PathBuf {
    cache_dir.join(format!("{}.manifest.json", sanitize_repo_id(repo_id)))
}

/// Sanitize a repo id for use in a filename (e.g. "org/name" -> "org_name").
pub fn sanitize_repo_id(id: &str) -> String {
    id.replace(['/', '\\'], "_")
}

fn list_files(repo: &ApiRepo) -> Result<Vec<String>> {
    let info = repo.info().map_err(|e| Error::Hub(e.to_string()))?;
    Ok(info.siblings.into_iter().map(|s| s.rfilename).collect())
}

/// Pick the data files of `split` from a repository listing.
///
/// A file belongs to a split when a directory in its path is named after the
/// split, or its file name starts with `<split>-` / `<split>.`. Parquet files
/// win over JSON files. When `sole_split` is set and nothing matches by name,
/// all JSON/JSONL data files are taken: single-file datasets are usually
/// published without split naming and loaded as `train`.
pub fn select_split_files(files: &[String], split: &str, sole_split: bool) -> Vec<String> {
    for ext in DATA_EXTENSIONS {
        let mut matched: Vec<String> = files
            .iter()
            .filter(|f| f.ends_with(ext) && belongs_to_split(f, split))
            .cloned()
            .collect();
        if !matched.is_empty() {
            matched.sort();
            return matched;
        }
    }

    if sole_split {
        let mut unnamed: Vec<String> = files
            .iter()
            .filter(|f| (f.ends_with(".jsonl") || f.ends_with(".json")) && !is_metadata_file(f))
            .cloned()
            .collect();
        unnamed.sort();
        return unnamed;
    }

    Vec::new()
}

fn belongs_to_split(path: &str, split: &str) -> bool {
    let mut components: Vec<&str> = path.split('/').collect();
    let file_name = components.pop().unwrap_or_default();

    components.iter().any(|dir| *dir == split)
        || file_name.starts_with(&format!("{split}-"))
        || file_name.starts_with(&format!("{split}."))
}

fn is_metadata_file(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.starts_with("dataset_info") || file_name == "config.json"
}
