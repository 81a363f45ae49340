//! Seams to external collaborators.

use crate::{RawSplit, Result};
use std::path::Path;

/// Something that can fetch the rows of a published dataset.
///
/// Implementations own download and caching. Fetching the same repository
/// into the same `cache_dir` twice should not download twice.
pub trait DatasetSource {
    /// Fetch `splits` of the dataset `repo_id`, caching files under `cache_dir`.
    ///
    /// Returns one [`RawSplit`] per requested split, in request order.
    fn fetch(&self, repo_id: &str, splits: &[String], cache_dir: &Path) -> Result<Vec<RawSplit>>;
}

impl<S: DatasetSource + ?Sized> DatasetSource for Box<S> {
    fn fetch(&self, repo_id: &str, splits: &[String], cache_dir: &Path) -> Result<Vec<RawSplit>> {
        (**self).fetch(repo_id, splits, cache_dir)
    }
}

impl<S: DatasetSource + ?Sized> DatasetSource for &S {
    fn fetch(&self, repo_id: &str, splits: &[String], cache_dir: &Path) -> Result<Vec<RawSplit>> {
        (**self).fetch(repo_id, splits, cache_dir)
    }
}
