//! Task store: the persistence layer for every document the core owns.
//!
//! The store is the only component that touches disk, and it does so
//! through the `FileSystem` port. Directory layout:
//!
//! ```text
//! <root>/
//!   ├── tasks.json          live collection
//!   ├── history.jsonl       append-only audit trail
//!   ├── deleted/<id>.json   soft-deleted task backups
//!   └── archives/<id>.json  snapshots
//! ```
//!
//! Mutations of the live collection go through [`TaskStore::mutate`],
//! which serializes the read-modify-write cycle behind a mutex shared by
//! every store over the same root in this process. Reads load a fresh
//! snapshot and never take the lock.

mod history;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::model::{Archive, DeletedTaskRecord, TaskCollection};

pub use history::HistoryQuery;

const TASKS_FILE: &str = "tasks.json";
const DELETED_DIR: &str = "deleted";
const ARCHIVES_DIR: &str = "archives";
const MAX_ID_LEN: usize = 128;

static WRITE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Returns the write lock for `root`, creating it on first use.
fn write_lock_for(root: &Path) -> Arc<Mutex<()>> {
    let key = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let mut locks = WRITE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key).or_default())
}

/// Checks that `id` is safe to use as a record key and file stem.
///
/// # Errors
///
/// Returns `InvalidInput` unless the id is 1 to 128 ASCII alphanumerics,
/// `-` or `_`.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidInput("id must not be empty".to_string()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(Error::InvalidInput(format!("id exceeds {MAX_ID_LEN} characters")));
    }
    if let Some(bad) = id.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_')) {
        return Err(Error::InvalidInput(format!("id '{id}' contains invalid character '{bad}'")));
    }
    Ok(())
}

/// Persistence layer for the live collection and its side channels.
pub struct TaskStore<'a> {
    ctx: &'a ServiceContext,
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl<'a> TaskStore<'a> {
    /// Creates a new store rooted at the given path.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, root: &Path) -> Self {
        Self { ctx, root: root.to_path_buf(), write_lock: write_lock_for(root) }
    }

    /// Current time from the clock port.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.ctx.clock.now()
    }

    /// Fresh identifier from the id port.
    #[must_use]
    pub fn generate_id(&self) -> String {
        self.ctx.id_gen.generate_id()
    }

    /// Loads a snapshot of the live collection. A missing file is an empty
    /// collection.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the file cannot be read or parsed.
    pub fn load(&self) -> Result<TaskCollection> {
        self.load_with_raw().map(|(collection, _)| collection)
    }

    /// Loads the live collection together with its task records as untyped
    /// JSON, index-aligned, from a single read of the document.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the file cannot be read or parsed.
    pub fn load_with_raw(&self) -> Result<(TaskCollection, Vec<serde_json::Value>)> {
        let path = self.root.join(TASKS_FILE);
        if !self.ctx.fs.exists(&path) {
            return Ok((TaskCollection::default(), Vec::new()));
        }
        let doc: serde_json::Value = self.read_json(&path)?;
        let raw = match doc.get("tasks") {
            Some(serde_json::Value::Array(items)) => items.clone(),
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(Error::Persistence(format!("{TASKS_FILE}: 'tasks' is not an array")));
            }
        };
        let collection: TaskCollection = serde_json::from_value(doc)
            .map_err(|e| Error::Persistence(format!("Failed to parse {}: {e}", path.display())))?;
        debug!(tasks = collection.tasks.len(), "loaded task collection");
        Ok((collection, raw))
    }

    /// Runs `f` against the live collection under the write lock and saves
    /// the result if `f` succeeded and changed anything.
    ///
    /// `f` must not call `mutate` itself.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or `Persistence` if loading or saving fails.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut TaskCollection) -> Result<T>) -> Result<T> {
        self.mutate_with_raw(|collection, _| f(collection))
    }

    /// Like [`TaskStore::mutate`], also handing `f` the untyped task
    /// records read in the same load.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or `Persistence` if loading or saving fails.
    pub fn mutate_with_raw<T>(
        &self,
        f: impl FnOnce(&mut TaskCollection, &[serde_json::Value]) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (original, raw) = self.load_with_raw()?;
        let mut working = original.clone();
        let value = f(&mut working, &raw)?;
        if working != original {
            self.write_json(&self.root.join(TASKS_FILE), &working)?;
        }
        Ok(value)
    }

    /// Writes a deleted-task record, replacing any earlier one for the same id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed id or `Persistence` on write failure.
    pub fn save_deleted(&self, record: &DeletedTaskRecord) -> Result<()> {
        let path = self.record_path(DELETED_DIR, &record.task.id)?;
        self.write_json(&path, record)
    }

    /// Loads the deleted-task record for `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed id or `Persistence` on read failure.
    pub fn load_deleted(&self, id: &str) -> Result<Option<DeletedTaskRecord>> {
        let path = self.record_path(DELETED_DIR, id)?;
        if !self.ctx.fs.exists(&path) {
            return Ok(None);
        }
        self.read_json(&path).map(Some)
    }

    /// Removes the deleted-task record for `id`. Returns `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed id or `Persistence` on failure.
    pub fn remove_deleted(&self, id: &str) -> Result<bool> {
        let path = self.record_path(DELETED_DIR, id)?;
        if !self.ctx.fs.exists(&path) {
            return Ok(false);
        }
        self.ctx
            .fs
            .remove(&path)
            .map_err(|e| Error::Persistence(format!("Failed to remove {}: {e}", path.display())))?;
        Ok(true)
    }

    /// Loads every deleted-task record. Unreadable files are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the directory cannot be listed.
    pub fn deleted_records(&self) -> Result<Vec<DeletedTaskRecord>> {
        self.read_dir_json(DELETED_DIR)
    }

    /// Writes an archive. Archives are never rewritten once created.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if an archive with the same id exists,
    /// `InvalidInput` for a malformed id, or `Persistence` on write failure.
    pub fn save_archive(&self, archive: &Archive) -> Result<()> {
        let path = self.record_path(ARCHIVES_DIR, &archive.id)?;
        if self.ctx.fs.exists(&path) {
            return Err(Error::InvalidState(format!("archive {} already exists", archive.id)));
        }
        self.write_json(&path, archive)
    }

    /// Loads the archive with the given id, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed id or `Persistence` on read failure.
    pub fn load_archive(&self, id: &str) -> Result<Option<Archive>> {
        let path = self.record_path(ARCHIVES_DIR, id)?;
        if !self.ctx.fs.exists(&path) {
            return Ok(None);
        }
        self.read_json(&path).map(Some)
    }

    /// Loads every archive. Unreadable files are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the directory cannot be listed.
    pub fn archives(&self) -> Result<Vec<Archive>> {
        self.read_dir_json(ARCHIVES_DIR)
    }

    fn record_path(&self, dir: &str, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(dir).join(format!("{id}.json")))
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let contents = self
            .ctx
            .fs
            .read_to_string(path)
            .map_err(|e| Error::Persistence(format!("Failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::Persistence(format!("Failed to parse {}: {e}", path.display())))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| Error::Persistence(format!("Failed to serialize {}: {e}", path.display())))?;
        self.ctx
            .fs
            .write(path, &json)
            .map_err(|e| Error::Persistence(format!("Failed to write {}: {e}", path.display())))
    }

    fn read_dir_json<T: DeserializeOwned>(&self, dir: &str) -> Result<Vec<T>> {
        let dir_path = self.root.join(dir);
        if !self.ctx.fs.exists(&dir_path) {
            return Ok(Vec::new());
        }
        let names = self
            .ctx
            .fs
            .list_dir(&dir_path)
            .map_err(|e| Error::Persistence(format!("Failed to list {}: {e}", dir_path.display())))?;

        let mut items = Vec::new();
        for name in names.iter().filter(|n| n.ends_with(".json")) {
            match self.read_json(&dir_path.join(name)) {
                Ok(item) => items.push(item),
                Err(e) => warn!(file = %name, error = %e, "skipping unreadable record"),
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{ManualClock, MemoryFileSystem};
    use crate::model::{StatusCounts, Task};
    use crate::ports::FileSystem;

    fn sample_task(id: &str) -> Task {
        Task::new(id, &format!("Task {id}"), "do the thing", Utc::now())
    }

    #[test]
    fn empty_store_loads_empty_collection() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));

        assert_eq!(store.load().unwrap(), TaskCollection::default());
        assert!(store.load_with_raw().unwrap().1.is_empty());
        assert!(store.deleted_records().unwrap().is_empty());
        assert!(store.archives().unwrap().is_empty());
    }

    #[test]
    fn mutate_persists_changes() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));

        store
            .mutate(|c| {
                c.tasks.push(sample_task("a"));
                Ok(())
            })
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].id, "a");
    }

    #[test]
    fn failed_mutation_writes_nothing() {
        let fs = MemoryFileSystem::new();
        let ctx = ServiceContext::with_memory(ManualClock::default(), fs.clone());
        let store = TaskStore::new(&ctx, Path::new("/store"));

        let result: Result<()> = store.mutate(|c| {
            c.tasks.push(sample_task("a"));
            Err(Error::InvalidInput("nope".to_string()))
        });

        assert!(result.is_err());
        assert!(fs.paths().is_empty());
    }

    #[test]
    fn unchanged_mutation_skips_write() {
        let fs = MemoryFileSystem::new();
        let ctx = ServiceContext::with_memory(ManualClock::default(), fs.clone());
        let store = TaskStore::new(&ctx, Path::new("/store"));

        store.mutate(|c| Ok(c.tasks.len())).unwrap();

        assert!(fs.paths().is_empty());
    }

    #[test]
    fn stores_over_one_root_share_a_write_lock() {
        let ctx = ServiceContext::in_memory();
        let first = TaskStore::new(&ctx, Path::new("/shared-root"));
        let second = TaskStore::new(&ctx, Path::new("/shared-root"));
        let other = TaskStore::new(&ctx, Path::new("/other-root"));

        assert!(Arc::ptr_eq(&first.write_lock, &second.write_lock));
        assert!(!Arc::ptr_eq(&first.write_lock, &other.write_lock));
    }

    #[test]
    fn null_fields_load_as_defaults_with_raw_view() {
        let fs = MemoryFileSystem::new();
        fs.write(
            Path::new("/store/tasks.json"),
            r#"{"initialRequest": null, "tasks": [{"id": "a", "name": null, "status": null, "updatedAt": null}]}"#,
        )
        .unwrap();
        let ctx = ServiceContext::with_memory(ManualClock::default(), fs);
        let store = TaskStore::new(&ctx, Path::new("/store"));

        let (collection, raw) = store.load_with_raw().unwrap();
        assert_eq!(collection.initial_request, "");
        assert_eq!(collection.tasks[0].id, "a");
        assert_eq!(collection.tasks[0].name, "");
        assert_eq!(raw.len(), 1);
        assert!(raw[0]["name"].is_null());
    }

    #[test]
    fn corrupt_document_is_persistence_error() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("/store/tasks.json"), "{not json").unwrap();
        let ctx = ServiceContext::with_memory(ManualClock::default(), fs);
        let store = TaskStore::new(&ctx, Path::new("/store"));

        let err = store.load().unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn deleted_record_round_trips_and_removes() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let record = DeletedTaskRecord { task: sample_task("gone"), deleted_at: Utc::now() };

        store.save_deleted(&record).unwrap();
        assert_eq!(store.load_deleted("gone").unwrap(), Some(record));
        assert!(store.remove_deleted("gone").unwrap());
        assert!(!store.remove_deleted("gone").unwrap());
        assert_eq!(store.load_deleted("gone").unwrap(), None);
    }

    #[test]
    fn archives_are_write_once() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let archive = Archive {
            id: "arc-1".to_string(),
            created_at: Utc::now(),
            description: "before refactor".to_string(),
            tasks: vec![],
            initial_request: String::new(),
            stats: StatusCounts::default(),
        };

        store.save_archive(&archive).unwrap();
        assert!(matches!(store.save_archive(&archive), Err(Error::InvalidState(_))));
        assert_eq!(store.archives().unwrap(), vec![archive]);
    }

    #[test]
    fn path_traversal_ids_are_rejected() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));

        assert!(matches!(store.load_deleted("../tasks"), Err(Error::InvalidInput(_))));
        assert!(matches!(store.load_archive(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn validate_id_accepts_uuid_and_slug() {
        assert!(validate_id("3f2b8c1e-0d4a-4c7e-9a55-1b2c3d4e5f60").is_ok());
        assert!(validate_id("task_0001").is_ok());
        assert!(validate_id("has space").is_err());
        assert!(validate_id(&"x".repeat(129)).is_err());
    }
}
