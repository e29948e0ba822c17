pub mod git_backend;

use std::path::Path;

use crate::error::DataError;

pub use git_backend::GitVersionControl;

/// Version-control state lookup used to stamp transform records.
///
/// A path outside any repository is not an error: `current_hash` returns
/// `None` and `is_clean` returns true.
pub trait VersionControl: Send + Sync {
    /// Short commit id of HEAD for the repository containing `path`.
    fn current_hash(&self, path: &Path) -> Result<Option<String>, DataError>;

    /// Tracked files with uncommitted changes in the repository containing `path`.
    fn dirty_files(&self, path: &Path) -> Result<Vec<String>, DataError>;

    fn is_clean(&self, path: &Path) -> Result<bool, DataError> {
        Ok(self.dirty_files(path)?.is_empty())
    }

    /// Root of the repository containing `path`, for error messages.
    fn repository_root(&self, path: &Path) -> Option<std::path::PathBuf> {
        let _ = path;
        None
    }
}

/// A version-control state fixed at construction, for tests and for callers
/// that resolve repository state elsewhere.
#[derive(Debug, Clone, Default)]
pub struct FixedVcs {
    hash: Option<String>,
    dirty: Vec<String>,
}

impl FixedVcs {
    /// No repository at all.
    pub fn untracked() -> Self {
        Self::default()
    }

    /// A clean repository at `hash`.
    pub fn clean(hash: &str) -> Self {
        Self {
            hash: Some(hash.to_string()),
            dirty: Vec::new(),
        }
    }

    /// A repository at `hash` with uncommitted changes to `files`.
    pub fn dirty(hash: &str, files: &[&str]) -> Self {
        Self {
            hash: Some(hash.to_string()),
            dirty: files.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl VersionControl for FixedVcs {
    fn current_hash(&self, _path: &Path) -> Result<Option<String>, DataError> {
        Ok(self.hash.clone())
    }

    fn dirty_files(&self, _path: &Path) -> Result<Vec<String>, DataError> {
        Ok(self.dirty.clone())
    }
}
