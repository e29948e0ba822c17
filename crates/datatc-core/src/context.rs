use std::sync::Arc;

use crate::format::FormatRegistry;
use crate::provenance::{TransformCatalog, TransformLoader};
use crate::vcs::{GitVersionControl, VersionControl};

/// The collaborators a directory tree and its artifacts work with: format
/// codecs, version-control lookup, and transform reconstruction.
///
/// A root node owns one context and shares it with every node below it.
pub struct DataContext {
    formats: FormatRegistry,
    vcs: Box<dyn VersionControl>,
    loader: Box<dyn TransformLoader>,
}

impl Default for DataContext {
    fn default() -> Self {
        Self {
            formats: FormatRegistry::with_defaults(),
            vcs: Box::new(GitVersionControl),
            loader: Box::new(TransformCatalog::new()),
        }
    }
}

impl DataContext {
    /// Built-in codecs, git lookup, and an empty transform catalog.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_vcs(mut self, vcs: impl VersionControl + 'static) -> Self {
        self.vcs = Box::new(vcs);
        self
    }

    pub fn with_loader(mut self, loader: impl TransformLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn formats_mut(&mut self) -> &mut FormatRegistry {
        &mut self.formats
    }

    pub fn vcs(&self) -> &dyn VersionControl {
        self.vcs.as_ref()
    }

    pub fn loader(&self) -> &dyn TransformLoader {
        self.loader.as_ref()
    }
}

impl std::fmt::Debug for DataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataContext")
            .field("formats", &self.formats)
            .finish_non_exhaustive()
    }
}
