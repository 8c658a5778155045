//! Soft delete and recovery.
//!
//! Deleting a task always writes a `DeletedTaskRecord` before the task
//! leaves the live collection. Records are removed only by a successful
//! recovery or an explicit purge. Recovery does not re-check dependency
//! integrity; run an audit for that.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, RecordKind, Result};
use crate::model::{DeletedTaskRecord, HistoryOperation, Task};
use crate::store::{validate_id, TaskStore};

/// How to bring a deleted task back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverOptions {
    /// Reuse the original id; when `false` the task gets a fresh one.
    pub preserve_id: bool,
}

impl Default for RecoverOptions {
    fn default() -> Self {
        Self { preserve_id: true }
    }
}

fn deleted_not_found(id: &str) -> Error {
    Error::NotFound { kind: RecordKind::DeletedTask, id: id.to_string() }
}

/// Soft-deletes task `id`, returning the backup record.
///
/// # Errors
///
/// Returns `InvalidInput` for a malformed id, `NotFound` if the task is
/// not live, or `Persistence` if the backup or collection cannot be written.
pub fn delete_task(store: &TaskStore<'_>, id: &str) -> Result<DeletedTaskRecord> {
    validate_id(id)?;
    let deleted_at = store.now();

    let record = store.mutate(|collection| {
        let position =
            collection.tasks.iter().position(|t| t.id == id).ok_or_else(|| Error::task_not_found(id))?;
        let record = DeletedTaskRecord { task: collection.tasks[position].clone(), deleted_at };
        store.save_deleted(&record)?;
        collection.tasks.remove(position);
        Ok(record)
    })?;

    info!(task_id = %id, "task soft-deleted");
    store.record(HistoryOperation::Deleted, &record.task, "");
    Ok(record)
}

/// Lists deleted-task records, newest first.
///
/// Only records deleted at or after `since` are returned, at most
/// `limit` of them, and never more than `config.deleted_page_size`.
///
/// # Errors
///
/// Returns `Persistence` if the backup store cannot be read.
pub fn list_deleted(
    store: &TaskStore<'_>,
    config: &Config,
    since: Option<DateTime<Utc>>,
    limit: Option<usize>,
) -> Result<Vec<DeletedTaskRecord>> {
    let mut records = store.deleted_records()?;
    if let Some(since) = since {
        records.retain(|r| r.deleted_at >= since);
    }
    records.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then_with(|| a.task.id.cmp(&b.task.id)));
    records.truncate(limit.unwrap_or(config.deleted_page_size).min(config.deleted_page_size));
    Ok(records)
}

/// Moves a deleted task back into the live collection.
///
/// # Errors
///
/// Returns `InvalidInput` for a malformed id, `NotFound` if no backup
/// exists, `InvalidState` if the id is live again and `preserve_id` is set,
/// or `Persistence` on storage failure.
pub fn recover_task(store: &TaskStore<'_>, id: &str, options: RecoverOptions) -> Result<Task> {
    validate_id(id)?;
    let record = store.load_deleted(id)?.ok_or_else(|| deleted_not_found(id))?;
    let new_id = if options.preserve_id { id.to_string() } else { store.generate_id() };
    let now = store.now();

    let task = store.mutate(|collection| {
        if collection.contains(&new_id) {
            return Err(Error::InvalidState(format!(
                "task id {new_id} is already live; recover with a fresh id instead"
            )));
        }
        let mut task = record.task;
        task.id = new_id;
        task.updated_at = now.max(task.created_at);
        collection.tasks.push(task.clone());
        Ok(task)
    })?;

    if let Err(e) = store.remove_deleted(id) {
        warn!(task_id = %id, error = %e, "recovered task but could not remove its backup");
    }
    info!(task_id = %task.id, original_id = %id, "task recovered");
    store.record(HistoryOperation::Recovered, &task, format!("deleted id {id}"));
    Ok(task)
}

/// Permanently removes the backup for `id`.
///
/// # Errors
///
/// Returns `InvalidInput` for a malformed id, `NotFound` if no backup
/// exists, or `Persistence` on failure.
pub fn purge_deleted(store: &TaskStore<'_>, id: &str) -> Result<()> {
    validate_id(id)?;
    if !store.remove_deleted(id)? {
        return Err(deleted_not_found(id));
    }
    info!(task_id = %id, "deleted task purged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::Duration;

    use super::*;
    use crate::adapters::memory::{ManualClock, MemoryFileSystem};
    use crate::context::ServiceContext;
    use crate::lifecycle::{create_task, NewTask};
    use crate::ports::Clock;

    fn setup() -> (ServiceContext, ManualClock) {
        let clock = ManualClock::default();
        (ServiceContext::with_memory(clock.clone(), MemoryFileSystem::new()), clock)
    }

    fn add(store: &TaskStore<'_>, name: &str) -> Task {
        create_task(
            store,
            NewTask {
                name: name.to_string(),
                description: "something to do".to_string(),
                notes: Some("keep me".to_string()),
                ..NewTask::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn delete_then_recover_restores_equal_task() {
        let (ctx, clock) = setup();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let original = add(&store, "fragile");

        clock.advance(Duration::minutes(1));
        let record = delete_task(&store, &original.id).unwrap();
        assert_eq!(record.task, original);
        assert!(store.load().unwrap().tasks.is_empty());

        clock.advance(Duration::minutes(1));
        let mut recovered = recover_task(&store, &original.id, RecoverOptions::default()).unwrap();
        assert!(recovered.updated_at > original.updated_at);
        recovered.updated_at = original.updated_at;
        assert_eq!(recovered, original);
        assert!(store.load_deleted(&original.id).unwrap().is_none());
    }

    #[test]
    fn recover_unknown_is_not_found_and_malformed_is_invalid() {
        let (ctx, _) = setup();
        let store = TaskStore::new(&ctx, Path::new("/store"));

        let missing = recover_task(&store, "task-9999", RecoverOptions::default()).unwrap_err();
        assert!(matches!(missing, Error::NotFound { kind: RecordKind::DeletedTask, .. }));
        let malformed = recover_task(&store, "../etc", RecoverOptions::default()).unwrap_err();
        assert!(matches!(malformed, Error::InvalidInput(_)));
    }

    #[test]
    fn recover_with_fresh_id() {
        let (ctx, _) = setup();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let t = add(&store, "t");
        delete_task(&store, &t.id).unwrap();

        let recovered = recover_task(&store, &t.id, RecoverOptions { preserve_id: false }).unwrap();
        assert_ne!(recovered.id, t.id);
        assert!(store.load().unwrap().contains(&recovered.id));
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let (ctx, _) = setup();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        assert!(matches!(delete_task(&store, "nope"), Err(Error::NotFound { .. })));
        assert!(store.deleted_records().unwrap().is_empty());
    }

    #[test]
    fn listing_respects_since_and_page_cap() {
        let (ctx, clock) = setup();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let config = Config { deleted_page_size: 2, ..Config::default() };

        let ids: Vec<String> = (0..4).map(|i| add(&store, &format!("t{i}")).id).collect();
        let mut cutoff = clock.now();
        for (i, id) in ids.iter().enumerate() {
            clock.advance(Duration::minutes(1));
            if i == 2 {
                cutoff = clock.now();
            }
            delete_task(&store, id).unwrap();
        }

        let page = list_deleted(&store, &config, None, Some(10)).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].task.id, ids[3]);

        let recent = list_deleted(&store, &Config::default(), Some(cutoff), None).unwrap();
        let recent_ids: Vec<&str> = recent.iter().map(|r| r.task.id.as_str()).collect();
        assert_eq!(recent_ids, vec![ids[3].as_str(), ids[2].as_str()]);
    }

    #[test]
    fn purge_removes_backup_for_good() {
        let (ctx, _) = setup();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let t = add(&store, "t");
        delete_task(&store, &t.id).unwrap();

        purge_deleted(&store, &t.id).unwrap();
        assert!(matches!(purge_deleted(&store, &t.id), Err(Error::NotFound { .. })));
        assert!(matches!(
            recover_task(&store, &t.id, RecoverOptions::default()),
            Err(Error::NotFound { .. })
        ));
    }
}
