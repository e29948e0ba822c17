use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("No entry matches '{hint}' in {dir}")]
    NotFound { hint: String, dir: PathBuf },

    #[error("More than one match for '{hint}': [{}]", matches.join(", "))]
    AmbiguousSelection { hint: String, matches: Vec<String> },

    #[error("Directory is empty: {0}")]
    EmptyDirectory(PathBuf),

    #[error("Format '{token}' is not supported. Supported formats: [{}]", supported.join(", "))]
    UnsupportedFormat {
        token: String,
        supported: Vec<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Uncommitted changes in {repo}: {}. Commit them or pass enforce_clean_git = false", files.join(", "))]
    DirtyRepository { repo: PathBuf, files: Vec<String> },

    #[error("Source unavailable for transform '{name}': {reason}")]
    SourceUnavailable { name: String, reason: String },

    #[error("Keyword argument '{key}' is not serializable: {reason}")]
    UnserializableArgument { key: String, reason: String },

    #[error("Transform functions were not loaded for step {index} ('{name}'); reload with load_function = true")]
    FunctionNotLoaded { index: usize, name: String },

    #[error("Invalid argument '{key}': {reason}")]
    InvalidArgument { key: String, reason: String },

    #[error("Transform '{name}' failed: {reason}")]
    Transform { name: String, reason: String },

    #[error("Invalid self-aware unit {path}: {reason}")]
    InvalidUnit { path: PathBuf, reason: String },

    #[error("Unsupported self-aware unit interface version {found} (known: {known:?})")]
    UnsupportedVersion { found: u32, known: Vec<u32> },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Shorthand for reporting a failure from inside a transform body.
    pub fn transform(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transform {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

