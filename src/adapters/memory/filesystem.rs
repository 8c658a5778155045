//! Map-backed filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::ports::filesystem::{FileSystem, FsResult};

/// In-memory filesystem keyed by full path.
///
/// Directories are implicit: a path "exists" as a directory when any file
/// lives beneath it. Clones share the same file map.
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the paths of every stored file.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().expect("fs lock poisoned").keys().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> FsResult<String> {
        let files = self.files.lock().expect("fs lock poisoned");
        files.get(path).cloned().ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> FsResult<()> {
        let mut files = self.files.lock().expect("fs lock poisoned");
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn append(&self, path: &Path, contents: &str) -> FsResult<()> {
        let mut files = self.files.lock().expect("fs lock poisoned");
        files.entry(path.to_path_buf()).or_default().push_str(contents);
        Ok(())
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        let mut files = self.files.lock().expect("fs lock poisoned");
        files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().expect("fs lock poisoned");
        files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn list_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        let files = self.files.lock().expect("fs lock poisoned");
        let names = files
            .keys()
            .filter(|k| k.parent() == Some(path))
            .filter_map(|k| k.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        Ok(names)
    }
}
