use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::data::Data;
use crate::error::DataError;
use crate::kwargs::Kwargs;

use super::codecs::{BytesCodec, JsonCodec, TextCodec};
use super::csv::CsvCodec;

/// A save/load pair bound to one file format.
///
/// `kwargs` are format-specific options handed over untouched by the registry.
pub trait Codec: Send + Sync {
    fn save(&self, data: &Data, path: &Path, kwargs: &Kwargs) -> Result<(), DataError>;
    fn load(&self, path: &Path, kwargs: &Kwargs) -> Result<Data, DataError>;
}

/// Maps extension tokens to codecs.
///
/// Owned by a `DataContext`; each test can build its own.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    codecs: BTreeMap<String, Arc<dyn Codec>>,
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in codecs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let text: Arc<dyn Codec> = Arc::new(TextCodec);
        for token in ["txt", "md", "sql", "log"] {
            registry.register_shared(token, Arc::clone(&text));
        }
        registry.register("json", JsonCodec);
        registry.register("csv", CsvCodec::new(','));
        registry.register("tsv", CsvCodec::new('\t'));
        registry.register("bin", BytesCodec);
        registry
    }

    /// Associate a codec with an extension token. A later call for the same
    /// token replaces the earlier codec.
    pub fn register(&mut self, token: &str, codec: impl Codec + 'static) -> &mut Self {
        self.register_shared(token, Arc::new(codec))
    }

    pub fn register_shared(&mut self, token: &str, codec: Arc<dyn Codec>) -> &mut Self {
        self.codecs.insert(normalize_token(token), codec);
        self
    }

    /// Registered tokens, sorted.
    pub fn registered(&self) -> Vec<String> {
        self.codecs.keys().cloned().collect()
    }

    pub fn supports(&self, token: &str) -> bool {
        self.codecs.contains_key(&normalize_token(token))
    }

    /// Exact-match lookup of a token, extension, or file name.
    pub fn resolve(&self, token_or_hint: &str) -> Result<Arc<dyn Codec>, DataError> {
        let token = normalize_token(token_or_hint);
        self.codecs
            .get(&token)
            .cloned()
            .ok_or_else(|| DataError::UnsupportedFormat {
                token,
                supported: self.registered(),
            })
    }

    /// Pick the codec for `path`, letting `hint` override its extension.
    pub fn resolve_for(&self, path: &Path, hint: Option<&str>) -> Result<Arc<dyn Codec>, DataError> {
        match hint {
            Some(hint) => {
                tracing::debug!("Using format hint '{hint}' for {}", path.display());
                self.resolve(hint)
            }
            None => self.resolve(&extension_token(path)),
        }
    }

    /// Write `data` to `path`, creating parent directories as needed.
    pub fn save(
        &self,
        data: &Data,
        path: &Path,
        hint: Option<&str>,
        kwargs: &Kwargs,
    ) -> Result<(), DataError> {
        let codec = self.resolve_for(path, hint)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        codec.save(data, path, kwargs)?;
        tracing::info!("Saved {}", path.display());
        Ok(())
    }

    pub fn load(&self, path: &Path, hint: Option<&str>, kwargs: &Kwargs) -> Result<Data, DataError> {
        let codec = self.resolve_for(path, hint)?;
        if !path.exists() {
            return Err(DataError::FileNotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Err(DataError::NotAFile(path.to_path_buf()));
        }
        tracing::debug!("Loading {}", path.display());
        codec.load(path, kwargs)
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.registered())
            .finish()
    }
}

/// Reduce a hint to a bare, lowercase extension token.
///
/// Accepts `"csv"`, `".csv"`, `"CSV"` and `"file.csv"` alike.
pub fn normalize_token(hint: &str) -> String {
    let token = match hint.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => hint,
    };
    token.trim().to_ascii_lowercase()
}

/// The extension token of a path, or "" if it has none.
pub fn extension_token(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(normalize_token)
        .unwrap_or_default()
}
