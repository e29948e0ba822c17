use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::DataError;

use super::record::TransformRecord;
use super::transform::Transform;

/// Turns a recorded step back into something callable.
///
/// Compiling arbitrary source at runtime is not available, so reconstruction is
/// an injected capability: a catalog of known transforms, a plugin host, or a
/// test double.
pub trait TransformLoader: Send + Sync {
    fn reconstruct(&self, record: &TransformRecord) -> Result<Arc<dyn Transform>, DataError>;
}

/// A loader that can reconstruct nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl TransformLoader for NoLoader {
    fn reconstruct(&self, record: &TransformRecord) -> Result<Arc<dyn Transform>, DataError> {
        Err(DataError::SourceUnavailable {
            name: record.name.clone(),
            reason: "no transform loader is configured".into(),
        })
    }
}

/// Known transforms, looked up by recorded name.
///
/// A catalog entry only matches a record when its source text is identical to
/// the recorded text, so a replay never runs code other than what was recorded.
#[derive(Clone, Default)]
pub struct TransformCatalog {
    entries: BTreeMap<String, Arc<dyn Transform>>,
}

impl TransformCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, transform: Arc<dyn Transform>) -> &mut Self {
        self.entries
            .insert(transform.name().to_string(), transform);
        self
    }

    pub fn with(mut self, transform: Arc<dyn Transform>) -> Self {
        self.register(transform);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TransformLoader for TransformCatalog {
    fn reconstruct(&self, record: &TransformRecord) -> Result<Arc<dyn Transform>, DataError> {
        let entry = self
            .entries
            .get(&record.name)
            .ok_or_else(|| DataError::SourceUnavailable {
                name: record.name.clone(),
                reason: "not present in the transform catalog".into(),
            })?;
        match entry.source() {
            Some(source) if source.code == record.code => Ok(Arc::clone(entry)),
            Some(_) => Err(DataError::SourceUnavailable {
                name: record.name.clone(),
                reason: "the catalog entry's source differs from the recorded source".into(),
            }),
            None => Err(DataError::SourceUnavailable {
                name: record.name.clone(),
                reason: "the catalog entry has no captured source".into(),
            }),
        }
    }
}

impl std::fmt::Debug for TransformCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformCatalog")
            .field("entries", &self.names())
            .finish()
    }
}
