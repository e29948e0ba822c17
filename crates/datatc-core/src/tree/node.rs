use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::config::ProjectResolver;
use crate::context::DataContext;
use crate::data::Data;
use crate::error::DataError;
use crate::format::extension_token;
use crate::kwargs::Kwargs;
use crate::provenance::{
    is_unit_dir, LoadOptions, SelfAwareData, Transform, TransformOptions, UnitInfo,
};

use super::listing::Listing;
use super::select::{date_token, match_names, NameMatch};

/// Entries never shown or navigated.
const IGNORED: &[&str] = &[".git", ".DS_Store", "__pycache__"];

/// Directories below the listed one with more entries than this are summarized.
const SUMMARY_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    /// A persisted self-aware unit.
    SelfAware,
}

impl NodeKind {
    fn of(path: &Path) -> Option<Self> {
        if path.is_dir() {
            if is_unit_dir(path) {
                Some(Self::SelfAware)
            } else {
                Some(Self::Directory)
            }
        } else if path.is_file() {
            Some(Self::File)
        } else {
            None
        }
    }
}

/// Result of loading a node.
#[derive(Debug, Clone)]
pub enum Loaded {
    Raw(Data),
    SelfAware(SelfAwareData),
}

impl Loaded {
    pub fn data(&self) -> &Data {
        match self {
            Loaded::Raw(data) => data,
            Loaded::SelfAware(artifact) => artifact.data(),
        }
    }

    pub fn into_data(self) -> Data {
        match self {
            Loaded::Raw(data) => data,
            Loaded::SelfAware(artifact) => artifact.into_data(),
        }
    }

    pub fn into_self_aware(self) -> Option<SelfAwareData> {
        match self {
            Loaded::Raw(_) => None,
            Loaded::SelfAware(artifact) => Some(artifact),
        }
    }
}

/// A lazily enumerated view of one path in a data directory tree.
///
/// Children are read from disk the first time they are needed and cached for
/// the life of the node; call [`DirectoryNode::refresh`] to see later changes.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    path: PathBuf,
    name: String,
    kind: NodeKind,
    root: PathBuf,
    parent: Option<PathBuf>,
    ctx: Arc<DataContext>,
    children: OnceCell<Vec<DirectoryNode>>,
}

impl DirectoryNode {
    /// Open `path` as the root of a tree.
    pub fn open(path: impl Into<PathBuf>, ctx: Arc<DataContext>) -> Result<Self, DataError> {
        let path = path.into();
        let kind = NodeKind::of(&path).ok_or_else(|| DataError::FileNotFound(path.clone()))?;
        Ok(Self {
            name: display_name(&path),
            root: path.clone(),
            path,
            kind,
            parent: None,
            ctx,
            children: OnceCell::new(),
        })
    }

    /// Open the root directory of a registered project.
    pub fn open_project(
        name: &str,
        projects: &dyn ProjectResolver,
        ctx: Arc<DataContext>,
    ) -> Result<Self, DataError> {
        let root = projects.resolve(name)?;
        tracing::debug!("Project '{name}' resolved to {}", root.display());
        Self::open(root, ctx)
    }

    fn child(&self, path: PathBuf, kind: NodeKind) -> Self {
        Self {
            name: display_name(&path),
            root: self.root.clone(),
            path,
            kind,
            parent: Some(self.path.clone()),
            ctx: Arc::clone(&self.ctx),
            children: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_self_aware(&self) -> bool {
        self.kind == NodeKind::SelfAware
    }

    pub fn parent_path(&self) -> Option<&Path> {
        self.parent.as_deref()
    }

    pub fn context(&self) -> &Arc<DataContext> {
        &self.ctx
    }

    /// Children sorted by name, enumerated on first call.
    pub fn children(&self) -> Result<&[DirectoryNode], DataError> {
        if self.is_file() {
            return Err(DataError::NotADirectory(self.path.clone()));
        }
        if let Some(children) = self.children.get() {
            return Ok(children);
        }
        let scanned = self.scan()?;
        Ok(self.children.get_or_init(|| scanned))
    }

    fn scan(&self) -> Result<Vec<DirectoryNode>, DataError> {
        let mut children = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("Skipping non UTF-8 entry {}", path.display());
                continue;
            };
            if IGNORED.contains(&name.as_str()) {
                continue;
            }
            match NodeKind::of(&path) {
                Some(kind) => children.push(self.child(path, kind)),
                None => tracing::warn!("Skipping {}: not a file or directory", path.display()),
            }
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    /// The child named `name`, or failing that the only child whose name
    /// contains it (ignoring case).
    pub fn get(&self, name: &str) -> Result<&DirectoryNode, DataError> {
        self.pick(name)
    }

    /// Select a child by partial name. Chain calls to narrow further.
    pub fn select(&self, hint: &str) -> Result<&DirectoryNode, DataError> {
        self.pick(hint)
    }

    fn pick(&self, hint: &str) -> Result<&DirectoryNode, DataError> {
        let children = self.children()?;
        match match_names(children.iter().map(DirectoryNode::name), hint) {
            NameMatch::Exact(i) | NameMatch::Unique(i) => Ok(&children[i]),
            NameMatch::None => Err(DataError::NotFound {
                hint: hint.to_string(),
                dir: self.path.clone(),
            }),
            NameMatch::Many(candidates) => Err(DataError::AmbiguousSelection {
                hint: hint.to_string(),
                matches: candidates
                    .iter()
                    .map(|&i| children[i].name.clone())
                    .collect(),
            }),
        }
    }

    /// The most recent child: the greatest date embedded in a name, or the
    /// newest modification time when no name carries a date.
    pub fn latest(&self) -> Result<&DirectoryNode, DataError> {
        let children = self.children()?;
        if children.is_empty() {
            return Err(DataError::EmptyDirectory(self.path.clone()));
        }

        let dated = children
            .iter()
            .filter_map(|c| date_token(&c.name).map(|d| (d, c)))
            .max_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.name.cmp(&b.name)));
        if let Some((date, child)) = dated {
            tracing::debug!("Latest in {} is {} ({date})", self.path.display(), child.name);
            return Ok(child);
        }

        tracing::debug!(
            "No dated names in {}; ranking by modification time",
            self.path.display()
        );
        children
            .iter()
            .map(|c| (modified(&c.path), c))
            .max_by(|(ta, a), (tb, b)| ta.cmp(tb).then_with(|| a.name.cmp(&b.name)))
            .map(|(_, child)| child)
            .ok_or_else(|| DataError::EmptyDirectory(self.path.clone()))
    }

    /// Data type of this node: the file extension, the stored format of a
    /// self-aware unit, or for a directory the shared type of its children
    /// (`"mixed"` when they differ, `"empty"` when there are none).
    pub fn data_type(&self) -> Result<String, DataError> {
        match self.kind {
            NodeKind::File => Ok(extension_token(&self.path)),
            NodeKind::SelfAware => Ok(UnitInfo::read(&self.path)?.data_type()),
            NodeKind::Directory => {
                let mut shared: Option<String> = None;
                for child in self.children()? {
                    let kind = child.data_type()?;
                    match &shared {
                        None => shared = Some(kind),
                        Some(existing) if *existing == kind => {}
                        Some(_) => return Ok("mixed".to_string()),
                    }
                }
                Ok(shared.unwrap_or_else(|| "empty".to_string()))
            }
        }
    }

    /// Render the subtree. In summary mode, directories below this one with
    /// more than a few entries collapse to a single "N <type> items" line.
    pub fn ls(&self, full: bool) -> Result<Listing, DataError> {
        self.listing(full, true)
    }

    fn listing(&self, full: bool, top: bool) -> Result<Listing, DataError> {
        match self.kind {
            NodeKind::File => Ok(Listing::leaf(self.name.clone())),
            NodeKind::SelfAware => Ok(Listing::leaf(self.unit_label())),
            NodeKind::Directory => {
                let children = self.children()?;
                if !full && !top && children.len() > SUMMARY_THRESHOLD {
                    let kind = self.data_type().unwrap_or_else(|e| {
                        tracing::warn!("Could not type {}: {e}", self.path.display());
                        "mixed".to_string()
                    });
                    let summary = format!("{} {kind} items", children.len());
                    return Ok(Listing::dir(self.name.clone(), vec![Listing::leaf(summary)]));
                }

                let mut entries = Vec::with_capacity(children.len());
                for child in children.iter().filter(|c| c.kind == NodeKind::Directory) {
                    entries.push(child.listing(full, false)?);
                }
                for child in children.iter().filter(|c| c.kind != NodeKind::Directory) {
                    entries.push(child.listing(full, false)?);
                }
                Ok(Listing::dir(self.name.clone(), entries))
            }
        }
    }

    fn unit_label(&self) -> String {
        let info = match UnitInfo::read(&self.path) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Could not read unit {}: {e}", self.path.display());
                return self.name.clone();
            }
        };
        let stem = info.tag().unwrap_or("untagged");
        let mut label = format!("{stem}.{}", info.data_type());
        if let Some(record) = info.latest_record() {
            label.push_str(&format!(
                " [{} {}]",
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.git_hash
            ));
        }
        label
    }

    /// Load this node: raw data for a file, a self-aware artifact for a unit.
    pub fn load(&self, opts: &LoadOptions) -> Result<Loaded, DataError> {
        match self.kind {
            NodeKind::File => {
                let data = self
                    .ctx
                    .formats()
                    .load(&self.path, opts.hint.as_deref(), &opts.kwargs)?;
                Ok(Loaded::Raw(data))
            }
            NodeKind::SelfAware => Ok(Loaded::SelfAware(SelfAwareData::load(
                &self.ctx, &self.path, opts,
            )?)),
            NodeKind::Directory => Err(DataError::NotAFile(self.path.clone())),
        }
    }

    /// Write `data` as `file_name` in this directory. Returns the written path.
    pub fn save(&self, data: &Data, file_name: &str, kwargs: &Kwargs) -> Result<PathBuf, DataError> {
        let path = self.target(file_name)?;
        self.ctx.formats().save(data, &path, None, kwargs)?;
        Ok(path)
    }

    /// Apply `transform` to `data` and persist the result, with its history,
    /// as a self-aware unit tagged by `file_name`. Returns the unit directory.
    pub fn save_transformed(
        &self,
        data: &Data,
        file_name: &str,
        transform: Arc<dyn Transform>,
        opts: &TransformOptions,
        kwargs: &Kwargs,
    ) -> Result<PathBuf, DataError> {
        let artifact = SelfAwareData::new(data.clone()).transform(&self.ctx, transform, opts)?;
        self.save_artifact(&artifact, file_name, kwargs)
    }

    /// Persist an existing artifact as a unit in this directory.
    pub fn save_artifact(
        &self,
        artifact: &SelfAwareData,
        file_name: &str,
        kwargs: &Kwargs,
    ) -> Result<PathBuf, DataError> {
        let path = self.target(file_name)?;
        artifact.save(&self.ctx, &path, kwargs)
    }

    fn target(&self, file_name: &str) -> Result<PathBuf, DataError> {
        if self.kind != NodeKind::Directory {
            return Err(DataError::NotADirectory(self.path.clone()));
        }
        Ok(self.path.join(file_name))
    }

    /// Every path below this node whose name contains `hint`, ignoring case.
    pub fn find(&self, hint: &str) -> Result<Vec<PathBuf>, DataError> {
        if self.is_file() {
            return Err(DataError::NotADirectory(self.path.clone()));
        }
        let needle = hint.to_lowercase();
        let mut found = Vec::new();
        let walker = WalkDir::new(&self.path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.file_name()
                    .to_str()
                    .map_or(true, |n| !IGNORED.contains(&n))
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.to_lowercase().contains(&needle));
            if matches {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    }

    /// A fresh node over the same path, re-reading children on next access.
    pub fn refresh(&self) -> Result<Self, DataError> {
        let kind =
            NodeKind::of(&self.path).ok_or_else(|| DataError::FileNotFound(self.path.clone()))?;
        Ok(Self {
            kind,
            children: OnceCell::new(),
            ..self.clone()
        })
    }

    /// Display path from the tree root, e.g. `sales > extracts > a.csv`.
    pub fn breadcrumb(&self) -> String {
        let mut parts = vec![display_name(&self.root)];
        if let Ok(rel) = self.path.strip_prefix(&self.root) {
            parts.extend(
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned()),
            );
        }
        parts.join(" > ")
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
