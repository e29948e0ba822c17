//! On-disk layout of a persisted self-aware unit.
//!
//! ```text
//! sad_dir__2024-05-01_13-45-10__cleaned/
//!     data.csv
//!     provenance.json
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::data::Data;
use crate::error::DataError;
use crate::format::{extension_token, FormatRegistry};
use crate::kwargs::Kwargs;

use super::artifact::{info_steps, render_steps, LoadOptions, SelfAwareData};
use super::loader::TransformLoader;
use super::record::TransformRecord;

pub const UNIT_PREFIX: &str = "sad_dir";
pub const DELIMITER: &str = "__";
pub const PROVENANCE_FILE: &str = "provenance.json";
pub const DATA_STEM: &str = "data";
pub const INTERFACE_VERSION: u32 = 1;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const KNOWN_VERSIONS: &[u32] = &[INTERFACE_VERSION];

/// Contents of `provenance.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub interface_version: u32,
    pub data_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sha256: Option<String>,
    /// File the raw data was read from before the first step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub transform_steps: Vec<TransformRecord>,
}

/// The parsed directory name of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitName {
    pub timestamp: NaiveDateTime,
    pub tag: Option<String>,
}

impl UnitName {
    /// A name stamped with the current time.
    pub fn generate(tag: Option<&str>) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            // Second precision, as encoded in the directory name.
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            tag: tag.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }

    /// Parse `sad_dir__<timestamp>[__<tag>]`. Returns `None` for other names.
    pub fn parse(dir_name: &str) -> Option<Self> {
        let rest = dir_name.strip_prefix(UNIT_PREFIX)?.strip_prefix(DELIMITER)?;
        let (stamp, tag) = match rest.split_once(DELIMITER) {
            Some((stamp, tag)) => (stamp, Some(tag.to_string())),
            None => (rest, None),
        };
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            timestamp,
            tag: tag.filter(|t| !t.is_empty()),
        })
    }

    pub fn to_dir_name(&self) -> String {
        let stamp = self.timestamp.format(TIMESTAMP_FORMAT);
        match &self.tag {
            Some(tag) => format!("{UNIT_PREFIX}{DELIMITER}{stamp}{DELIMITER}{tag}"),
            None => format!("{UNIT_PREFIX}{DELIMITER}{stamp}"),
        }
    }
}

/// Whether `path` looks like a persisted unit: a directory with the unit
/// prefix that holds a provenance file.
pub fn is_unit_dir(path: &Path) -> bool {
    let named = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(&format!("{UNIT_PREFIX}{DELIMITER}")));
    named && path.join(PROVENANCE_FILE).is_file()
}

/// Metadata of a persisted unit, read without touching the data file.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub path: PathBuf,
    pub name: Option<UnitName>,
    pub provenance: Provenance,
}

impl UnitInfo {
    pub fn read(path: &Path) -> Result<Self, DataError> {
        if !path.exists() {
            return Err(DataError::FileNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(DataError::NotADirectory(path.to_path_buf()));
        }
        let provenance_path = path.join(PROVENANCE_FILE);
        if !provenance_path.is_file() {
            return Err(DataError::InvalidUnit {
                path: path.to_path_buf(),
                reason: format!("missing {PROVENANCE_FILE}"),
            });
        }

        let raw = fs::read_to_string(&provenance_path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let version = value
            .get("interface_version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| DataError::InvalidUnit {
                path: path.to_path_buf(),
                reason: "no interface_version".into(),
            })?;
        if !KNOWN_VERSIONS.iter().any(|&v| u64::from(v) == version) {
            return Err(DataError::UnsupportedVersion {
                found: u32::try_from(version).unwrap_or(u32::MAX),
                known: KNOWN_VERSIONS.to_vec(),
            });
        }
        let provenance: Provenance = serde_json::from_value(value)?;
        if !is_plain_file_name(&provenance.data_file) {
            return Err(DataError::InvalidUnit {
                path: path.to_path_buf(),
                reason: format!("data_file {:?} is not a file inside the unit", provenance.data_file),
            });
        }

        for (position, record) in provenance.transform_steps.iter().enumerate() {
            if record.index != position {
                return Err(DataError::InvalidUnit {
                    path: path.to_path_buf(),
                    reason: format!(
                        "step at position {position} is recorded as index {}",
                        record.index
                    ),
                });
            }
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(UnitName::parse);
        Ok(Self {
            path: path.to_path_buf(),
            name,
            provenance,
        })
    }

    pub fn data_path(&self) -> PathBuf {
        self.path.join(&self.provenance.data_file)
    }

    /// Extension token of the stored data file.
    pub fn data_type(&self) -> String {
        extension_token(Path::new(&self.provenance.data_file))
    }

    pub fn latest_record(&self) -> Option<&TransformRecord> {
        self.provenance.transform_steps.last()
    }

    pub fn tag(&self) -> Option<&str> {
        self.name.as_ref().and_then(|n| n.tag.as_deref())
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.provenance.source_file.as_deref().map(Path::new)
    }

    /// Machine-readable history, shaped like `SelfAwareData::get_info`.
    pub fn get_info(&self) -> serde_json::Value {
        info_steps(self.source_file(), &self.provenance.transform_steps)
    }

    /// Human-readable history, rendered as `SelfAwareData::view_steps` does.
    pub fn view_steps(&self) -> String {
        render_steps(self.source_file(), &self.provenance.transform_steps)
    }
}

// A single normal component: no separators, no `..`, not absolute.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Removes a unit directory that was not completed.
struct PartialUnit {
    dir: PathBuf,
    complete: bool,
}

impl Drop for PartialUnit {
    fn drop(&mut self) {
        if self.complete {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            tracing::warn!("Could not remove partial unit {}: {e}", self.dir.display());
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Write `artifact` as a unit under `parent`. `file_name` supplies the tag
/// (its stem) and the data format (its extension).
pub(crate) fn save_unit(
    artifact: &SelfAwareData,
    parent: &Path,
    file_name: &str,
    formats: &FormatRegistry,
    kwargs: &Kwargs,
) -> Result<PathBuf, DataError> {
    let file = Path::new(file_name);
    let ext = extension_token(file);
    let codec = formats.resolve(&ext)?;
    let tag = file.file_stem().and_then(|s| s.to_str());

    let unit_name = UnitName::generate(tag);
    let unit_dir = parent.join(unit_name.to_dir_name());
    fs::create_dir_all(parent)?;
    fs::create_dir(&unit_dir)?;
    let mut guard = PartialUnit {
        dir: unit_dir.clone(),
        complete: false,
    };

    let data_file = format!("{DATA_STEM}.{ext}");
    let data_path = unit_dir.join(&data_file);
    codec.save(artifact.data(), &data_path, kwargs)?;

    let provenance = Provenance {
        interface_version: INTERFACE_VERSION,
        data_sha256: Some(sha256_hex(&fs::read(&data_path)?)),
        data_file,
        source_file: artifact.source_file().map(|p| p.display().to_string()),
        transform_steps: artifact.history().to_vec(),
    };
    let json = serde_json::to_string_pretty(&provenance)?;
    fs::write(unit_dir.join(PROVENANCE_FILE), json)?;
    guard.complete = true;

    tracing::info!(
        "Saved self-aware unit {} ({} step(s))",
        unit_dir.display(),
        artifact.len()
    );
    Ok(unit_dir)
}

/// Read a unit back into an artifact.
pub(crate) fn load_unit(
    path: &Path,
    formats: &FormatRegistry,
    loader: &dyn TransformLoader,
    opts: &LoadOptions,
) -> Result<SelfAwareData, DataError> {
    let info = UnitInfo::read(path)?;
    let data_path = info.data_path();
    if !data_path.is_file() {
        return Err(DataError::InvalidUnit {
            path: path.to_path_buf(),
            reason: format!("missing data file {}", info.provenance.data_file),
        });
    }

    if let Some(expected) = &info.provenance.data_sha256 {
        let actual = sha256_hex(&fs::read(&data_path)?);
        if &actual != expected {
            tracing::warn!(
                "Data file {} changed since it was saved (sha256 {actual}, recorded {expected})",
                data_path.display()
            );
        }
    }

    let data: Data = formats.load(&data_path, opts.hint.as_deref(), &opts.kwargs)?;

    let source_file = info.provenance.source_file.map(PathBuf::from);
    let steps = info.provenance.transform_steps;
    let functions = if opts.load_function {
        steps
            .iter()
            .map(|record| loader.reconstruct(record).map(Some))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![None; steps.len()]
    };

    tracing::debug!("Loaded self-aware unit {} ({} step(s))", path.display(), steps.len());
    Ok(SelfAwareData::from_parts(data, steps, functions, source_file))
}
