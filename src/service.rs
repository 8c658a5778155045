//! The store's public operations in one place.
//!
//! `TaskService` is what collaborators (the CLI, a dashboard backend, a
//! tool server) call. It owns the store and configuration and forwards to
//! the component modules.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::archive::{self, ArchiveListing, RestoreOptions, RestoreReport};
use crate::audit::{self, AuditOptions, SyncReport};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::graph::{self, ExecutionCheck};
use crate::lifecycle::{self, NewTask, StartOutcome, TaskUpdate, VerifyOutcome};
use crate::model::{
    Archive, ArchiveMeta, CompletionFields, DeletedTaskRecord, HistoryEntry, Task, TaskStatus,
};
use crate::recovery::{self, RecoverOptions};
use crate::store::{HistoryQuery, TaskStore};

/// Filter for listing live tasks. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Only tasks with this status.
    pub status: Option<TaskStatus>,
    /// Case-insensitive substring of the name or description.
    pub query: Option<String>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        match self.query.as_deref().map(str::to_lowercase) {
            Some(q) if !q.is_empty() => {
                task.name.to_lowercase().contains(&q) || task.description.to_lowercase().contains(&q)
            }
            _ => true,
        }
    }
}

/// Entry point for every store operation.
pub struct TaskService<'a> {
    store: TaskStore<'a>,
    config: Config,
}

impl<'a> TaskService<'a> {
    /// Creates a service over the store at `config.store_dir`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, config: Config) -> Self {
        let store = TaskStore::new(ctx, &config.store_dir);
        Self { store, config }
    }

    /// Creates a service rooted at `root` with default settings.
    #[must_use]
    pub fn at(ctx: &'a ServiceContext, root: &Path) -> Self {
        Self::new(ctx, Config { store_dir: root.to_path_buf(), ..Config::default() })
    }

    /// Looks up a live task.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no live task has `id`, or `Persistence`.
    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.store.load()?.get(id).cloned().ok_or_else(|| Error::task_not_found(id))
    }

    /// Lists live tasks matching `filter`, in collection order.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the collection cannot be read.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let tasks: Vec<Task> =
            self.store.load()?.tasks.into_iter().filter(|t| filter.matches(t)).collect();
        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    /// Reports whether task `id` may start.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or `Persistence`.
    pub fn can_execute(&self, id: &str) -> Result<ExecutionCheck> {
        graph::check_dependencies(&self.store.load()?, id)
    }

    /// Pending tasks whose dependencies are all completed.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the collection cannot be read.
    pub fn ready_tasks(&self) -> Result<Vec<Task>> {
        let collection = self.store.load()?;
        Ok(graph::ready_tasks(&collection).into_iter().cloned().collect())
    }

    /// Adds a task. See [`lifecycle::create_task`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` or `Persistence`.
    pub fn create_task(&self, new: NewTask) -> Result<Task> {
        lifecycle::create_task(&self.store, new)
    }

    /// Edits a task. See [`lifecycle::update_task`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidInput`, `InvalidState` or `Persistence`.
    pub fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task> {
        lifecycle::update_task(&self.store, id, update)
    }

    /// Starts a task. See [`lifecycle::start_execution`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Blocked` or `Persistence`.
    pub fn start_execution(&self, id: &str) -> Result<StartOutcome> {
        lifecycle::start_execution(&self.store, id)
    }

    /// Verifies a task and completes it if the score passes.
    /// See [`lifecycle::verify_task`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput`, `NotFound`, `InvalidState` or `Persistence`.
    pub fn verify_and_maybe_complete(
        &self,
        id: &str,
        summary: &str,
        score: u8,
        fields: Option<CompletionFields>,
    ) -> Result<VerifyOutcome> {
        lifecycle::verify_task(&self.store, &self.config, id, summary, score, fields)
    }

    /// Soft-deletes a task.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput`, `NotFound` or `Persistence`.
    pub fn delete_task(&self, id: &str) -> Result<DeletedTaskRecord> {
        recovery::delete_task(&self.store, id)
    }

    /// Lists deleted-task backups, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backups cannot be read.
    pub fn list_deleted(
        &self,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<DeletedTaskRecord>> {
        recovery::list_deleted(&self.store, &self.config, since, limit)
    }

    /// Brings a deleted task back.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput`, `NotFound`, `InvalidState` or `Persistence`.
    pub fn recover_task(&self, id: &str, options: RecoverOptions) -> Result<Task> {
        recovery::recover_task(&self.store, id, options)
    }

    /// Permanently removes a deleted-task backup.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput`, `NotFound` or `Persistence`.
    pub fn purge_deleted(&self, id: &str) -> Result<()> {
        recovery::purge_deleted(&self.store, id)
    }

    /// Snapshots the live collection.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on storage failure.
    pub fn create_archive(&self, description: &str) -> Result<ArchiveMeta> {
        archive::create_archive(&self.store, description)
    }

    /// Lists archive metadata.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on storage failure.
    pub fn list_archives(&self, filter: Option<&str>) -> Result<ArchiveListing> {
        archive::list_archives(&self.store, filter)
    }

    /// Loads a full archive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput`, `NotFound` or `Persistence`.
    pub fn get_archive(&self, id: &str) -> Result<Archive> {
        archive::get_archive(&self.store, id)
    }

    /// Restores an archive into the live collection.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `ConflictRequiresConfirmation` or `Persistence`.
    pub fn restore_from_archive(&self, id: &str, options: RestoreOptions) -> Result<RestoreReport> {
        archive::restore_from_archive(&self.store, id, options)
    }

    /// Audits the live collection, repairing what `options` allow.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on storage failure.
    pub fn audit_consistency(&self, options: AuditOptions) -> Result<SyncReport> {
        audit::audit_consistency(&self.store, options)
    }

    /// Reads the history log, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the log cannot be read.
    pub fn get_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryEntry>> {
        self.store.read_history(query, self.config.history_limit)
    }

    /// Replaces the stored initial planning request.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on storage failure.
    pub fn set_initial_request(&self, text: &str) -> Result<()> {
        self.store.mutate(|collection| {
            collection.initial_request = text.to_string();
            Ok(())
        })?;
        info!(chars = text.chars().count(), "initial request updated");
        Ok(())
    }

    /// Returns the stored initial planning request (empty if unset).
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the collection cannot be read.
    pub fn get_initial_request(&self) -> Result<String> {
        Ok(self.store.load()?.initial_request)
    }
}
