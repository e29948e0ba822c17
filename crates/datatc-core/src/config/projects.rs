use std::collections::BTreeMap;
use std::fs;
use std::io::{Read as _, Seek, SeekFrom, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Environment variable overriding the registry file location.
pub const REGISTRY_ENV: &str = "DATATC_REGISTRY";

const REGISTRY_DIR: &str = "datatc";
const REGISTRY_FILE: &str = "projects.json";

/// Maps a project name to the root directory of its data.
pub trait ProjectResolver {
    fn resolve(&self, name: &str) -> Result<PathBuf, DataError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    projects: BTreeMap<String, PathBuf>,
}

/// The per-user project registry, stored as JSON.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    path: PathBuf,
}

impl ProjectRegistry {
    /// Use the registry file at `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `$DATATC_REGISTRY`, or `<config dir>/datatc/projects.json`.
    pub fn open_default() -> Result<Self, DataError> {
        if let Some(path) = std::env::var_os(REGISTRY_ENV).filter(|p| !p.is_empty()) {
            return Ok(Self::open(PathBuf::from(path)));
        }
        let dir = dirs::config_dir()
            .ok_or_else(|| DataError::Config("could not determine the user config directory".into()))?;
        Ok(Self::open(dir.join(REGISTRY_DIR).join(REGISTRY_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register (or re-point) `name` at an existing directory.
    pub fn register(&self, name: &str, dir: &Path) -> Result<PathBuf, DataError> {
        if name.trim().is_empty() {
            return Err(DataError::InvalidArgument {
                key: "name".into(),
                reason: "project name is empty".into(),
            });
        }
        if !dir.exists() {
            return Err(DataError::FileNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(DataError::NotADirectory(dir.to_path_buf()));
        }
        let root = dir.canonicalize()?;
        self.update(|file| {
            file.projects.insert(name.to_string(), root.clone());
        })?;
        tracing::info!("Registered project '{name}' at {}", root.display());
        Ok(root)
    }

    /// Forget `name`, returning the path it pointed at.
    pub fn remove(&self, name: &str) -> Result<PathBuf, DataError> {
        let mut removed = None;
        self.update(|file| removed = file.projects.remove(name))?;
        let root = removed.ok_or_else(|| self.not_found(name))?;
        tracing::info!("Removed project '{name}'");
        Ok(root)
    }

    /// Registered projects, sorted by name.
    pub fn list(&self) -> Result<Vec<(String, PathBuf)>, DataError> {
        Ok(self.read()?.projects.into_iter().collect())
    }

    fn not_found(&self, name: &str) -> DataError {
        DataError::NotFound {
            hint: name.to_string(),
            dir: self.path.clone(),
        }
    }

    fn read(&self) -> Result<RegistryFile, DataError> {
        let file = match fs::OpenOptions::new().read(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RegistryFile::default())
            }
            Err(e) => return Err(e.into()),
        };
        fs2::FileExt::lock_shared(&file)?;
        let mut data = String::new();
        (&file).read_to_string(&mut data)?;
        fs2::FileExt::unlock(&file)?;
        self.parse(&data)
    }

    fn parse(&self, data: &str) -> Result<RegistryFile, DataError> {
        if data.trim().is_empty() {
            return Ok(RegistryFile::default());
        }
        serde_json::from_str(data).map_err(|e| {
            DataError::Config(format!("could not parse {}: {e}", self.path.display()))
        })
    }

    /// Read, modify and write the registry under one exclusive lock.
    fn update(&self, apply: impl FnOnce(&mut RegistryFile)) -> Result<(), DataError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        fs2::FileExt::lock_exclusive(&file)?;

        let mut data = String::new();
        (&file).read_to_string(&mut data)?;
        let mut current = self.parse(&data)?;
        apply(&mut current);

        let json = serde_json::to_string_pretty(&current)?;
        file.set_len(0)?;
        (&file).seek(SeekFrom::Start(0))?;
        (&file).write_all(json.as_bytes())?;
        fs2::FileExt::unlock(&file)?;
        Ok(())
    }
}

impl ProjectResolver for ProjectRegistry {
    /// Look up a registered name. A hint that is itself an existing directory
    /// resolves to that directory.
    fn resolve(&self, name: &str) -> Result<PathBuf, DataError> {
        if let Some(root) = self.read()?.projects.remove(name) {
            return Ok(root);
        }
        let as_path = Path::new(name);
        if as_path.is_dir() {
            tracing::debug!("'{name}' is not a registered project; using it as a path");
            return Ok(as_path.to_path_buf());
        }
        Err(self.not_found(name))
    }
}

impl ProjectResolver for BTreeMap<String, PathBuf> {
    fn resolve(&self, name: &str) -> Result<PathBuf, DataError> {
        self.get(name).cloned().ok_or_else(|| DataError::NotFound {
            hint: name.to_string(),
            dir: PathBuf::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(tmp: &TempDir) -> ProjectRegistry {
        ProjectRegistry::open(tmp.path().join("config").join("projects.json"))
    }

    #[test]
    fn test_register_resolve_remove() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        let reg = registry(&tmp);

        let root = reg.register("sales", &data).unwrap();
        assert_eq!(root, data.canonicalize().unwrap());
        assert_eq!(reg.resolve("sales").unwrap(), root);

        let listed = reg.list().unwrap();
        assert_eq!(listed, vec![("sales".to_string(), root.clone())]);

        assert_eq!(reg.remove("sales").unwrap(), root);
        assert!(matches!(
            reg.resolve("sales").unwrap_err(),
            DataError::NotFound { .. }
        ));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp);
        assert!(reg.list().unwrap().is_empty());
        assert!(matches!(
            reg.remove("nope").unwrap_err(),
            DataError::NotFound { .. }
        ));
    }

    #[test]
    fn test_register_requires_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let reg = registry(&tmp);

        assert!(matches!(
            reg.register("p", &file).unwrap_err(),
            DataError::NotADirectory(_)
        ));
        assert!(matches!(
            reg.register("p", &tmp.path().join("missing")).unwrap_err(),
            DataError::FileNotFound(_)
        ));
    }

    #[test]
    fn test_reregister_overwrites_and_list_is_sorted() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        let reg = registry(&tmp);

        reg.register("zeta", &a).unwrap();
        reg.register("alpha", &a).unwrap();
        reg.register("zeta", &b).unwrap();

        let names: Vec<_> = reg.list().unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(reg.resolve("zeta").unwrap(), b.canonicalize().unwrap());
    }

    #[test]
    fn test_directory_hint_resolves_to_itself() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp);
        let hint = tmp.path().to_str().unwrap();
        assert_eq!(reg.resolve(hint).unwrap(), tmp.path());
    }

    #[test]
    fn test_corrupt_registry_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp);
        fs::create_dir_all(reg.path().parent().unwrap()).unwrap();
        fs::write(reg.path(), "not json").unwrap();
        assert!(matches!(reg.list().unwrap_err(), DataError::Config(_)));
    }
}
