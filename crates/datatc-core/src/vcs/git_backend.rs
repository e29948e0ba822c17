use std::path::{Path, PathBuf};

use git2::{ErrorCode, Repository, Status, StatusOptions};

use crate::error::DataError;

use super::VersionControl;

/// Repository state read through libgit2.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitVersionControl;

impl GitVersionControl {
    /// Discover the repository containing `path`, walking up parent directories.
    fn discover(path: &Path) -> Option<Repository> {
        let start = if path.is_file() {
            path.parent().unwrap_or(path)
        } else {
            path
        };
        match Repository::discover(start) {
            Ok(repo) => Some(repo),
            Err(e) => {
                tracing::debug!("No git repository for {}: {e}", path.display());
                None
            }
        }
    }
}

impl VersionControl for GitVersionControl {
    fn current_hash(&self, path: &Path) -> Result<Option<String>, DataError> {
        let Some(repo) = Self::discover(path) else {
            return Ok(None);
        };
        let head = match repo.head() {
            Ok(head) => head,
            // A fresh repository has no commit to point at yet
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };
        let commit = head.peel_to_commit()?;
        let short = commit.as_object().short_id()?;
        Ok(short.as_str().map(String::from))
    }

    fn dirty_files(&self, path: &Path) -> Result<Vec<String>, DataError> {
        let Some(repo) = Self::discover(path) else {
            return Ok(Vec::new());
        };
        if repo.is_bare() {
            return Ok(Vec::new());
        }
        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = repo.statuses(Some(&mut opts))?;
        let files = statuses
            .iter()
            .filter(|entry| entry.status() != Status::CURRENT)
            .filter_map(|entry| entry.path().map(String::from))
            .collect();
        Ok(files)
    }

    fn repository_root(&self, path: &Path) -> Option<PathBuf> {
        Self::discover(path).and_then(|repo| repo.workdir().map(Path::to_path_buf))
    }
}
