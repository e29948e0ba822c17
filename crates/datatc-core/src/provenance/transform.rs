use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::Data;
use crate::error::DataError;
use crate::kwargs::Kwargs;

/// Where a transform came from: its literal text and defining location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSource {
    pub code: String,
    pub file: String,
    pub line: u32,
    /// Directory used to look up version-control state for this transform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_hint: Option<PathBuf>,
}

impl TransformSource {
    pub fn new(code: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            code: code.into(),
            file: file.into(),
            line,
            repo_hint: None,
        }
    }

    pub fn with_repo_hint(mut self, dir: impl Into<PathBuf>) -> Self {
        self.repo_hint = Some(dir.into());
        self
    }

    /// `file:line`, as stored in transform records.
    pub fn origin(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// A data transformation that can be recorded and replayed.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    /// Captured source, or `None` when the transform was built without one.
    fn source(&self) -> Option<&TransformSource>;

    fn apply(&self, data: &Data, kwargs: &Kwargs) -> Result<Data, DataError>;
}

type TransformBody = dyn Fn(&Data, &Kwargs) -> Result<Data, DataError> + Send + Sync;

/// A transform backed by a function or closure.
#[derive(Clone)]
pub struct TransformFn {
    name: String,
    body: Arc<TransformBody>,
    source: Option<TransformSource>,
}

impl TransformFn {
    /// Wrap a closure. It has no captured source until `with_source` is called,
    /// so recording it fails with `SourceUnavailable`.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Data, &Kwargs) -> Result<Data, DataError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
            source: None,
        }
    }

    pub fn with_source(mut self, source: TransformSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn shared(self) -> Arc<dyn Transform> {
        Arc::new(self)
    }
}

impl Transform for TransformFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> Option<&TransformSource> {
        self.source.as_ref()
    }

    fn apply(&self, data: &Data, kwargs: &Kwargs) -> Result<Data, DataError> {
        (self.body)(data, kwargs)
    }
}

impl std::fmt::Debug for TransformFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformFn")
            .field("name", &self.name)
            .field("source", &self.source.as_ref().map(TransformSource::origin))
            .finish()
    }
}

/// Define a named transform whose body text and location are captured.
///
/// The generated function returns a shared `Transform`; the macro records the
/// body as written, the defining file and line, and the defining crate
/// directory for the version-control lookup.
///
/// ```
/// use datatc_core::provenance::Transform;
/// use datatc_core::{transform, Data, DataError};
///
/// transform! {
///     /// Upper-case a text payload.
///     pub fn shout(data, _kwargs) {
///         match data {
///             Data::Text(s) => Ok(Data::Text(s.to_uppercase())),
///             other => Err(DataError::transform("shout", format!("expected text, got {}", other.kind()))),
///         }
///     }
/// }
///
/// let t = shout();
/// assert_eq!(t.name(), "shout");
/// assert!(t.source().unwrap().code.contains("to_uppercase"));
/// ```
#[macro_export]
macro_rules! transform {
    ($(#[$meta:meta])* $vis:vis fn $name:ident($data:ident, $kwargs:ident) $body:block) => {
        $(#[$meta])*
        $vis fn $name() -> ::std::sync::Arc<dyn $crate::provenance::Transform> {
            $crate::provenance::TransformFn::new(
                stringify!($name),
                |$data: &$crate::Data,
                 $kwargs: &$crate::Kwargs|
                 -> ::std::result::Result<$crate::Data, $crate::DataError> { $body },
            )
            .with_source(
                $crate::provenance::TransformSource::new(
                    concat!(
                        "fn ",
                        stringify!($name),
                        "(",
                        stringify!($data),
                        ", ",
                        stringify!($kwargs),
                        ") ",
                        stringify!($body)
                    ),
                    file!(),
                    line!(),
                )
                .with_repo_hint(env!("CARGO_MANIFEST_DIR")),
            )
            .shared()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::transform! {
        fn append_bang(data, _kwargs) {
            let text = data.as_text().unwrap_or_default();
            Ok(Data::Text(format!("{text}!")))
        }
    }

    #[test]
    fn test_macro_captures_source() {
        let t = append_bang();
        assert_eq!(t.name(), "append_bang");
        let source = t.source().unwrap();
        assert!(source.code.starts_with("fn append_bang(data, _kwargs)"));
        assert!(source.code.contains("format!"));
        assert!(source.file.ends_with("transform.rs"));
        assert!(source.repo_hint.is_some());
        assert_eq!(
            t.apply(&Data::from("hi"), &Kwargs::new()).unwrap(),
            Data::from("hi!")
        );
    }

    #[test]
    fn test_closure_without_source() {
        let t = TransformFn::new("inline", |d, _| Ok(d.clone()));
        assert!(t.source().is_none());
        let t = t.with_source(TransformSource::new("|d, _| Ok(d.clone())", "notebook", 1));
        assert_eq!(t.source().unwrap().origin(), "notebook:1");
    }
}
