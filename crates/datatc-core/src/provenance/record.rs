use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::Data;
use crate::error::DataError;
use crate::kwargs::Kwargs;
use crate::vcs::VersionControl;

use super::transform::{Transform, TransformSource};

/// Repeatability token recorded when no commit can vouch for the code that ran.
pub const UNTRACKED: &str = "untracked";

/// One applied transformation step. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    pub index: usize,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub code: String,
    /// Defining location of the transform, `file:line`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default)]
    pub kwargs: Kwargs,
    pub git_hash: String,
}

impl TransformRecord {
    pub fn is_tracked(&self) -> bool {
        self.git_hash != UNTRACKED
    }

    /// Capture `transform`, check repository state, then apply it to `data`.
    ///
    /// Nothing is recorded unless the transform succeeds.
    pub fn execute(
        index: usize,
        data: &Data,
        transform: &dyn Transform,
        opts: &TransformOptions,
        vcs: &dyn VersionControl,
    ) -> Result<(Data, Self), DataError> {
        let source = transform
            .source()
            .ok_or_else(|| DataError::SourceUnavailable {
                name: transform.name().to_string(),
                reason: "no captured source; define it with `transform!` or attach one with `TransformFn::with_source`".into(),
            })?;
        let git_hash = repeatability_token(source, opts, vcs)?;

        let timestamp = Utc::now();
        let output = transform.apply(data, &opts.kwargs)?;
        tracing::debug!(
            "Applied transform '{}' as step {index} ({git_hash})",
            transform.name()
        );

        let record = Self {
            index,
            name: transform.name().to_string(),
            timestamp,
            tag: opts.tag.clone(),
            code: source.code.clone(),
            origin: Some(source.origin()),
            kwargs: opts.kwargs.clone(),
            git_hash,
        };
        Ok((output, record))
    }

    /// Key/value view used by `get_info`.
    pub fn info(&self) -> serde_json::Value {
        serde_json::json!({
            "index": self.index,
            "name": self.name,
            "timestamp": self.timestamp.to_rfc3339(),
            "tag": self.tag,
            "git_hash": self.git_hash,
            "kwargs": self.kwargs,
            "code": self.code,
        })
    }
}

/// Determine the repeatability token for a transform about to run.
fn repeatability_token(
    source: &TransformSource,
    opts: &TransformOptions,
    vcs: &dyn VersionControl,
) -> Result<String, DataError> {
    let Some(location) = opts
        .git_context
        .clone()
        .or_else(|| source.repo_hint.clone())
    else {
        return Ok(UNTRACKED.to_string());
    };
    // Checked before the hash so a repository without commits is still held
    // to `enforce_clean_git`.
    let dirty = vcs.dirty_files(&location)?;
    if !dirty.is_empty() {
        if opts.enforce_clean_git {
            return Err(DataError::DirtyRepository {
                repo: vcs.repository_root(&location).unwrap_or(location),
                files: dirty,
            });
        }
        tracing::warn!(
            "Recording transform as {UNTRACKED}: {} uncommitted change(s) under {}",
            dirty.len(),
            location.display()
        );
        return Ok(UNTRACKED.to_string());
    }

    match vcs.current_hash(&location)? {
        Some(hash) => Ok(hash),
        None => {
            tracing::debug!("{} has no commit to record", location.display());
            Ok(UNTRACKED.to_string())
        }
    }
}

/// Options for a single transform step.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub tag: Option<String>,
    pub enforce_clean_git: bool,
    /// Overrides the location used for the version-control lookup, for
    /// transforms defined outside the repository that should vouch for them.
    pub git_context: Option<PathBuf>,
    pub kwargs: Kwargs,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            tag: None,
            enforce_clean_git: true,
            git_context: None,
            kwargs: Kwargs::new(),
        }
    }
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn enforce_clean_git(mut self, enforce: bool) -> Self {
        self.enforce_clean_git = enforce;
        self
    }

    pub fn git_context(mut self, path: impl Into<PathBuf>) -> Self {
        self.git_context = Some(path.into());
        self
    }

    pub fn kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Add one keyword argument.
    pub fn arg(mut self, key: &str, value: impl serde::Serialize) -> Result<Self, DataError> {
        self.kwargs.insert(key, value)?;
        Ok(self)
    }
}
