//! Feature record storage
//!
//! A feature path resolves, in order, to:
//! 1. the path itself as a file
//! 2. the path with the record extension appended
//! 3. `index.<ext>` inside the path as a directory
//!
//! The first existing candidate wins.

use super::{from_yaml, to_yaml, FeatureAddress, FeatureRecord, LanguageProfile};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Load/save access to feature records
pub trait FeatureStore: Send + Sync {
    /// Resolve an address to a file handle
    fn resolve(&self, address: &FeatureAddress) -> Result<PathBuf>;

    /// Parse the record behind a handle
    fn load(&self, handle: &Path) -> Result<FeatureRecord>;

    /// Write a record back with the stable key order
    fn save(&self, handle: &Path, record: &FeatureRecord) -> Result<()>;

    /// Current raw text behind a handle, if any
    fn read_raw(&self, handle: &Path) -> Result<Option<String>>;

    /// Load the language profile for a language id
    fn language(&self, id: &str) -> Result<LanguageProfile>;

    /// Resolve and load in one step
    fn open(&self, address: &FeatureAddress) -> Result<(PathBuf, FeatureRecord)> {
        let handle = self.resolve(address)?;
        let record = self.load(&handle)?;
        Ok((handle, record))
    }
}

/// Candidate files for a feature path, in resolution order
fn candidates(root: &Path, address: &FeatureAddress, extension: &str) -> [PathBuf; 3] {
    let mut base = root.join(&address.language);
    for segment in address.segments() {
        base.push(segment);
    }

    let mut with_ext = OsString::from(base.as_os_str());
    with_ext.push(".");
    with_ext.push(extension);

    let index = base.join(format!("index.{}", extension));

    [base, PathBuf::from(with_ext), index]
}

fn language_index(root: &Path, id: &str, extension: &str) -> PathBuf {
    root.join(id).join(format!("index.{}", extension))
}

fn decode_language(text: &str, path: &Path) -> Result<LanguageProfile> {
    serde_yaml::from_str(text).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Feature store over a directory tree (`<root>/<language>/...`)
pub struct FsFeatureStore {
    root: PathBuf,
    extension: String,
}

impl FsFeatureStore {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FeatureStore for FsFeatureStore {
    fn resolve(&self, address: &FeatureAddress) -> Result<PathBuf> {
        let [direct, with_ext, index] = candidates(&self.root, address, &self.extension);

        if direct.is_file() {
            return Ok(direct);
        }
        if with_ext.is_file() {
            return Ok(with_ext);
        }
        if index.is_file() {
            return Ok(index);
        }

        Err(Error::NotFound(address.to_string()))
    }

    fn load(&self, handle: &Path) -> Result<FeatureRecord> {
        let text = std::fs::read_to_string(handle).map_err(|e| Error::io(handle, e))?;
        from_yaml(&text, handle)
    }

    fn save(&self, handle: &Path, record: &FeatureRecord) -> Result<()> {
        let content = to_yaml(record)?;

        if let Some(parent) = handle.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(handle, content).map_err(|e| Error::io(handle, e))?;

        Ok(())
    }

    fn read_raw(&self, handle: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(handle) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(handle, e)),
        }
    }

    fn language(&self, id: &str) -> Result<LanguageProfile> {
        let path = language_index(&self.root, id, &self.extension);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("{}:", id))
            } else {
                Error::io(&path, e)
            }
        })?;
        decode_language(&text, &path)
    }
}

/// In-memory feature store keyed by virtual file paths
///
/// Follows the same resolution rules as [`FsFeatureStore`].
pub struct MemoryFeatureStore {
    root: PathBuf,
    extension: String,
    files: Mutex<BTreeMap<PathBuf, String>>,
    saves: AtomicUsize,
}

impl MemoryFeatureStore {
    pub fn new(extension: &str) -> Self {
        Self {
            root: PathBuf::from("/features"),
            extension: extension.trim_start_matches('.').to_string(),
            files: Mutex::new(BTreeMap::new()),
            saves: AtomicUsize::new(0),
        }
    }

    /// Add a file relative to the virtual root, e.g. `kotlin/loop/index.yaml`
    pub fn insert(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        self.lock().insert(path.clone(), content.to_string());
        path
    }

    /// Raw content of a file relative to the virtual root
    pub fn get(&self, relative: &str) -> Option<String> {
        self.lock().get(&self.root.join(relative)).cloned()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryFeatureStore {
    fn default() -> Self {
        Self::new("yaml")
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn resolve(&self, address: &FeatureAddress) -> Result<PathBuf> {
        let files = self.lock();
        candidates(&self.root, address, &self.extension)
            .into_iter()
            .find(|candidate| files.contains_key(candidate))
            .ok_or_else(|| Error::NotFound(address.to_string()))
    }

    fn load(&self, handle: &Path) -> Result<FeatureRecord> {
        let text = self
            .lock()
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::NotFound(handle.display().to_string()))?;
        from_yaml(&text, handle)
    }

    fn save(&self, handle: &Path, record: &FeatureRecord) -> Result<()> {
        let content = to_yaml(record)?;
        self.lock().insert(handle.to_path_buf(), content);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_raw(&self, handle: &Path) -> Result<Option<String>> {
        Ok(self.lock().get(handle).cloned())
    }

    fn language(&self, id: &str) -> Result<LanguageProfile> {
        let path = language_index(&self.root, id, &self.extension);
        let text = self
            .lock()
            .get(&path)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{}:", id)))?;
        decode_language(&text, &path)
    }
}
