use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::DataContext;
use crate::data::Data;
use crate::error::DataError;
use crate::format::FormatRegistry;
use crate::kwargs::Kwargs;

use super::loader::TransformLoader;
use super::record::{TransformOptions, TransformRecord};
use super::transform::Transform;
use super::unit;

/// A data value bundled with the ordered history of transforms that produced it.
///
/// Transforming never mutates an artifact: it returns a new one carrying a copy
/// of this history plus one record.
#[derive(Clone)]
pub struct SelfAwareData {
    data: Data,
    history: Vec<TransformRecord>,
    // Parallel to `history`; `None` where callables were not loaded.
    functions: Vec<Option<Arc<dyn Transform>>>,
    source_file: Option<PathBuf>,
}

/// Options for loading a persisted self-aware unit.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Format token overriding the data file's extension.
    pub hint: Option<String>,
    /// Reconstruct callables for every step. Turn off to read data and
    /// metadata in an environment that lacks the transforms.
    pub load_function: bool,
    /// Passed through to the data codec.
    pub kwargs: Kwargs,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            hint: None,
            load_function: true,
            kwargs: Kwargs::new(),
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    pub fn load_function(mut self, load: bool) -> Self {
        self.load_function = load;
        self
    }

    pub fn kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = kwargs;
        self
    }
}

impl SelfAwareData {
    /// Wrap raw data with an empty history.
    pub fn new(data: impl Into<Data>) -> Self {
        Self {
            data: data.into(),
            history: Vec::new(),
            functions: Vec::new(),
            source_file: None,
        }
    }

    /// Load raw data from a file, remembering where it came from.
    pub fn from_file(
        path: &Path,
        formats: &FormatRegistry,
        hint: Option<&str>,
        kwargs: &Kwargs,
    ) -> Result<Self, DataError> {
        let data = formats.load(path, hint, kwargs)?;
        Ok(Self {
            source_file: Some(path.to_path_buf()),
            ..Self::new(data)
        })
    }

    /// Assemble an artifact from persisted parts.
    pub(crate) fn from_parts(
        data: Data,
        history: Vec<TransformRecord>,
        functions: Vec<Option<Arc<dyn Transform>>>,
        source_file: Option<PathBuf>,
    ) -> Self {
        debug_assert_eq!(history.len(), functions.len());
        Self {
            data,
            history,
            functions,
            source_file,
        }
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn into_data(self) -> Data {
        self.data
    }

    pub fn history(&self) -> &[TransformRecord] {
        &self.history
    }

    pub fn latest_record(&self) -> Option<&TransformRecord> {
        self.history.last()
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Number of recorded steps; 0 means raw data.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Whether every step holds a callable, i.e. `rerun` can work.
    pub fn functions_loaded(&self) -> bool {
        self.functions.iter().all(Option::is_some)
    }

    /// Apply `transform` to this artifact's data, returning a new artifact whose
    /// history is this one's plus the new step.
    pub fn transform(
        &self,
        ctx: &DataContext,
        transform: Arc<dyn Transform>,
        opts: &TransformOptions,
    ) -> Result<Self, DataError> {
        let (data, record) = TransformRecord::execute(
            self.history.len(),
            &self.data,
            transform.as_ref(),
            opts,
            ctx.vcs(),
        )?;

        let mut history = self.history.clone();
        history.push(record);
        let mut functions = self.functions.clone();
        functions.push(Some(transform));

        Ok(Self {
            data,
            history,
            functions,
            source_file: self.source_file.clone(),
        })
    }

    /// Replay the full history on `input` with the callables this artifact holds,
    /// using each step's recorded keyword arguments.
    pub fn rerun(&self, input: &Data) -> Result<Data, DataError> {
        let mut functions = Vec::with_capacity(self.functions.len());
        for (record, function) in self.history.iter().zip(&self.functions) {
            let function = function.as_ref().ok_or_else(|| DataError::FunctionNotLoaded {
                index: record.index,
                name: record.name.clone(),
            })?;
            functions.push(Arc::clone(function));
        }
        self.replay(input, &functions)
    }

    /// Reconstruct every step from its recorded source through `loader`, then
    /// replay the history on `input`.
    pub fn rerun_reloaded(
        &self,
        input: &Data,
        loader: &dyn TransformLoader,
    ) -> Result<Data, DataError> {
        let functions = self
            .history
            .iter()
            .map(|record| loader.reconstruct(record))
            .collect::<Result<Vec<_>, _>>()?;
        self.replay(input, &functions)
    }

    fn replay(&self, input: &Data, functions: &[Arc<dyn Transform>]) -> Result<Data, DataError> {
        let mut data = input.clone();
        for (record, function) in self.history.iter().zip(functions) {
            tracing::debug!("Replaying step {} ('{}')", record.index, record.name);
            data = function.apply(&data, &record.kwargs)?;
        }
        Ok(data)
    }

    /// Machine-readable history: one object per step, preceded by a `load`
    /// entry when the raw data came from a file.
    pub fn get_info(&self) -> serde_json::Value {
        info_steps(self.source_file.as_deref(), &self.history)
    }

    /// Human-readable history: timestamp, tag, repeatability token and code of every step.
    pub fn view_steps(&self) -> String {
        render_steps(self.source_file.as_deref(), &self.history)
    }

    pub fn print_steps(&self) {
        print!("{}", self.view_steps());
    }

    /// Persist as a self-aware unit next to `path`. The file name's stem becomes
    /// the tag and its extension picks the data codec. Returns the unit directory.
    pub fn save(&self, ctx: &DataContext, path: &Path, kwargs: &Kwargs) -> Result<PathBuf, DataError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DataError::InvalidArgument {
                key: "path".into(),
                reason: format!("no file name in {}", path.display()),
            })?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        unit::save_unit(self, parent, file_name, ctx.formats(), kwargs)
    }

    /// Load a persisted self-aware unit directory.
    pub fn load(ctx: &DataContext, path: &Path, opts: &LoadOptions) -> Result<Self, DataError> {
        unit::load_unit(path, ctx.formats(), ctx.loader(), opts)
    }
}

impl std::fmt::Debug for SelfAwareData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfAwareData")
            .field("data", &self.data.kind())
            .field("history", &self.history)
            .field("functions_loaded", &self.functions_loaded())
            .field("source_file", &self.source_file)
            .finish()
    }
}

pub(crate) fn info_steps(
    source_file: Option<&Path>,
    history: &[TransformRecord],
) -> serde_json::Value {
    let load = source_file.map(|path| {
        serde_json::json!({
            "step": "load",
            "file_path": path.display().to_string(),
        })
    });
    serde_json::Value::Array(
        load.into_iter()
            .chain(history.iter().map(TransformRecord::info))
            .collect(),
    )
}

pub(crate) fn render_steps(source_file: Option<&Path>, history: &[TransformRecord]) -> String {
    let mut out = String::new();
    if let Some(path) = source_file {
        out.push_str(&format!("Loaded from {}\n\n", path.display()));
    }
    if history.is_empty() {
        out.push_str("No transform steps (raw data).\n");
        return out;
    }
    for record in history {
        out.push_str(&format!("Step {}", record.index));
        if let Some(tag) = &record.tag {
            out.push_str(&format!(" [{tag}]"));
        }
        out.push_str(&format!(
            "  {}  {}\n",
            record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            record.git_hash
        ));
        out.push_str(&"-".repeat(80));
        out.push('\n');
        out.push_str(&record.code);
        out.push('\n');
        if !record.kwargs.is_empty() {
            out.push_str(&format!(
                "kwargs: {}\n",
                serde_json::to_string(&record.kwargs).unwrap_or_default()
            ));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::loader::TransformCatalog;
    use crate::provenance::record::UNTRACKED;
    use crate::vcs::FixedVcs;

    crate::transform! {
        fn add_one(data, _kwargs) {
            let n = data.as_json().and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(Data::Json((n + 1).into()))
        }
    }

    crate::transform! {
        fn multiply(data, kwargs) {
            let factor: i64 = kwargs.get("factor")?;
            let n = data.as_json().and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(Data::Json((n * factor).into()))
        }
    }

    fn ctx() -> DataContext {
        DataContext::new().with_vcs(FixedVcs::clean("abc1234"))
    }

    fn num(n: i64) -> Data {
        Data::Json(n.into())
    }

    #[test]
    fn test_transform_appends_without_mutating() {
        let ctx = ctx();
        let raw = SelfAwareData::new(num(3));
        let step1 = raw
            .transform(&ctx, add_one(), &TransformOptions::new())
            .unwrap();

        assert_eq!(step1.data(), &num(4));
        assert_eq!(step1.len(), raw.len() + 1);
        assert_eq!(raw.data(), &num(3));
        assert!(raw.is_empty());
        assert_eq!(step1.history()[0].git_hash, "abc1234");
    }

    #[test]
    fn test_branching_histories_are_independent() {
        let ctx = ctx();
        let base = SelfAwareData::new(num(1))
            .transform(&ctx, add_one(), &TransformOptions::new())
            .unwrap();
        let a = base
            .transform(&ctx, add_one(), &TransformOptions::new().tag("a"))
            .unwrap();
        let b = base
            .transform(
                &ctx,
                multiply(),
                &TransformOptions::new().tag("b").arg("factor", 10).unwrap(),
            )
            .unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(a.history()[1].name, "add_one");
        assert_eq!(b.history()[1].name, "multiply");
        assert_eq!(b.data(), &num(20));
    }

    #[test]
    fn test_rerun_replays_history_with_kwargs() {
        let ctx = ctx();
        let built = SelfAwareData::new(num(2))
            .transform(&ctx, add_one(), &TransformOptions::new())
            .unwrap()
            .transform(
                &ctx,
                multiply(),
                &TransformOptions::new().arg("factor", 3).unwrap(),
            )
            .unwrap();
        assert_eq!(built.data(), &num(9));
        assert_eq!(built.rerun(&num(5)).unwrap(), num(18));
    }

    #[test]
    fn test_rerun_of_raw_data_is_identity() {
        assert_eq!(SelfAwareData::new(num(5)).rerun(&num(7)).unwrap(), num(7));
    }

    #[test]
    fn test_rerun_reloaded_uses_loader() {
        let ctx = ctx();
        let built = SelfAwareData::new(num(2))
            .transform(&ctx, add_one(), &TransformOptions::new())
            .unwrap();
        let catalog = TransformCatalog::new().with(add_one());
        assert_eq!(built.rerun_reloaded(&num(10), &catalog).unwrap(), num(11));

        let err = built
            .rerun_reloaded(&num(10), &TransformCatalog::new())
            .unwrap_err();
        assert!(matches!(err, DataError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_functions_not_loaded() {
        let ctx = ctx();
        let built = SelfAwareData::new(num(2))
            .transform(&ctx, add_one(), &TransformOptions::new())
            .unwrap();
        let stripped = SelfAwareData::from_parts(
            built.data().clone(),
            built.history().to_vec(),
            vec![None],
            None,
        );
        assert!(!stripped.functions_loaded());
        let err = stripped.rerun(&num(1)).unwrap_err();
        assert!(matches!(err, DataError::FunctionNotLoaded { index: 0, .. }));
    }

    #[test]
    fn test_dirty_repository_leaves_no_record() {
        let ctx = DataContext::new().with_vcs(FixedVcs::dirty("abc1234", &["src/lib.rs"]));
        let raw = SelfAwareData::new(num(1));
        let err = raw
            .transform(&ctx, add_one(), &TransformOptions::new())
            .unwrap_err();
        assert!(matches!(err, DataError::DirtyRepository { .. }));
        assert!(raw.is_empty());

        let allowed = raw
            .transform(&ctx, add_one(), &TransformOptions::new().enforce_clean_git(false))
            .unwrap();
        assert_eq!(allowed.history()[0].git_hash, UNTRACKED);
    }

    #[test]
    fn test_get_info_and_view_steps() {
        let ctx = ctx();
        let built = SelfAwareData::new(num(2))
            .transform(&ctx, add_one(), &TransformOptions::new().tag("step_1"))
            .unwrap()
            .transform(
                &ctx,
                multiply(),
                &TransformOptions::new().tag("step_2").arg("factor", 2).unwrap(),
            )
            .unwrap();

        let info = built.get_info();
        let steps = info.as_array().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0]["tag"], "step_1");
        assert_eq!(steps[0]["kwargs"], serde_json::json!({}));
        assert_eq!(steps[1]["kwargs"], serde_json::json!({"factor": 2}));
        for key in ["timestamp", "git_hash", "tag", "kwargs", "code"] {
            assert!(steps[1].get(key).is_some(), "missing {key}");
        }

        let text = built.view_steps();
        assert!(text.contains("Step 0 [step_1]"));
        assert!(text.contains("Step 1 [step_2]"));
        assert!(text.contains("abc1234"));
        assert!(text.contains("fn multiply(data, kwargs)"));
    }
}
