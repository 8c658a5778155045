//! Archive manager: named snapshots of the whole collection.
//!
//! Archives are written once and never modified. Restoring either merges
//! archived tasks into the live set (live tasks win on id clashes) or
//! replaces the live set outright. A replace does not snapshot the live
//! set first; callers wanting a safety net create an archive beforehand.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::audit::{self, Severity};
use crate::error::{Error, RecordKind, Result};
use crate::model::{Archive, ArchiveMeta, HistoryOperation, StatusCounts, Task};
use crate::store::TaskStore;

/// Archive metadata plus how many archives matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveListing {
    /// Matching archives, newest first.
    pub archives: Vec<ArchiveMeta>,
    /// Archives in the store.
    pub total: usize,
    /// Archives that matched the filter.
    pub filtered: usize,
}

/// How to restore an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Union with the live set instead of replacing it.
    pub merge: bool,
    /// Keep archived ids; when `false` every restored task gets a new id
    /// and dependency references inside the archive are rewritten.
    pub preserve_ids: bool,
    /// Proceed even if the archive itself has critical issues; repeated
    /// ids inside the archive are then dropped, keeping the first.
    pub force: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self { merge: true, preserve_ids: true, force: false }
    }
}

/// A task id rewritten during restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRemap {
    /// Id in the archive.
    pub from: String,
    /// Id in the live collection.
    pub to: String,
}

/// What a restore changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    /// Archive that was restored.
    pub archive_id: String,
    /// Whether the restore merged or replaced.
    pub merged: bool,
    /// Tasks actually written to the live collection.
    pub restored_count: usize,
    /// Archived ids skipped because a live task already had them.
    pub skipped_ids: Vec<String>,
    /// Remapped ids that still clashed with a live task; those tasks were skipped.
    pub conflicts: Vec<String>,
    /// Id rewrites applied when `preserve_ids` was off.
    pub remapped: Vec<IdRemap>,
}

/// Snapshots the live collection under `description`.
///
/// # Errors
///
/// Returns `Persistence` if the collection cannot be read or the archive
/// cannot be written.
pub fn create_archive(store: &TaskStore<'_>, description: &str) -> Result<ArchiveMeta> {
    let collection = store.load()?;
    let archive = Archive {
        id: store.generate_id(),
        created_at: store.now(),
        description: description.trim().to_string(),
        stats: StatusCounts::of(&collection.tasks),
        tasks: collection.tasks,
        initial_request: collection.initial_request,
    };
    store.save_archive(&archive)?;
    info!(archive_id = %archive.id, tasks = archive.stats.total, "archive created");
    Ok(archive.meta())
}

/// Lists archives, optionally keeping only those whose description or
/// file name contains `filter` (case-insensitive).
///
/// # Errors
///
/// Returns `Persistence` if the archive directory cannot be listed.
pub fn list_archives(store: &TaskStore<'_>, filter: Option<&str>) -> Result<ArchiveListing> {
    let mut metas: Vec<ArchiveMeta> = store.archives()?.iter().map(Archive::meta).collect();
    let total = metas.len();

    if let Some(needle) = filter.map(str::to_lowercase).filter(|n| !n.is_empty()) {
        metas.retain(|m| {
            m.description.to_lowercase().contains(&needle)
                || m.file_name.to_lowercase().contains(&needle)
        });
    }
    metas.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    Ok(ArchiveListing { filtered: metas.len(), total, archives: metas })
}

/// Loads a full archive.
///
/// # Errors
///
/// Returns `InvalidInput` for a malformed id, `NotFound` if no such
/// archive exists, or `Persistence` on read failure.
pub fn get_archive(store: &TaskStore<'_>, id: &str) -> Result<Archive> {
    store
        .load_archive(id)?
        .ok_or_else(|| Error::NotFound { kind: RecordKind::Archive, id: id.to_string() })
}

/// Restores archive `id` into the live collection.
///
/// # Errors
///
/// Returns `NotFound` for an unknown archive, `ConflictRequiresConfirmation`
/// if the archive has critical issues and `force` is off, or `Persistence`
/// on storage failure.
pub fn restore_from_archive(
    store: &TaskStore<'_>,
    id: &str,
    options: RestoreOptions,
) -> Result<RestoreReport> {
    let archive = get_archive(store, id)?;

    let critical = audit::scan(&archive.tasks, None)
        .iter()
        .filter(|i| i.severity == Severity::Critical)
        .count();
    if critical > 0 && !options.force {
        return Err(Error::ConflictRequiresConfirmation { critical });
    }

    let mut tasks = first_of_each_id(archive.tasks);
    let remapped = if options.preserve_ids { Vec::new() } else { remap_ids(store, &mut tasks) };

    let mut report = RestoreReport {
        archive_id: archive.id.clone(),
        merged: options.merge,
        restored_count: 0,
        skipped_ids: Vec::new(),
        conflicts: Vec::new(),
        remapped,
    };

    let restored = store.mutate(|collection| {
        if !options.merge {
            collection.tasks.clone_from(&tasks);
            collection.initial_request.clone_from(&archive.initial_request);
            return Ok(tasks.clone());
        }

        let mut live: HashSet<String> = collection.tasks.iter().map(|t| t.id.clone()).collect();
        let mut added = Vec::new();
        for task in &tasks {
            if live.contains(&task.id) {
                if options.preserve_ids {
                    report.skipped_ids.push(task.id.clone());
                } else {
                    report.conflicts.push(task.id.clone());
                }
                continue;
            }
            live.insert(task.id.clone());
            collection.tasks.push(task.clone());
            added.push(task.clone());
        }
        if collection.initial_request.is_empty() {
            collection.initial_request.clone_from(&archive.initial_request);
        }
        Ok(added)
    })?;

    report.restored_count = restored.len();
    for task in &restored {
        store.record(HistoryOperation::Restored, task, format!("from archive {}", archive.id));
    }
    if !report.conflicts.is_empty() {
        warn!(archive_id = %archive.id, conflicts = ?report.conflicts, "remapped ids clashed with live tasks");
    }
    info!(
        archive_id = %archive.id,
        merged = options.merge,
        restored = report.restored_count,
        skipped = report.skipped_ids.len(),
        "archive restored"
    );
    Ok(report)
}

fn first_of_each_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks.into_iter().filter(|t| seen.insert(t.id.clone())).collect()
}

/// Gives every task a fresh id and rewrites references between them.
fn remap_ids(store: &TaskStore<'_>, tasks: &mut [Task]) -> Vec<IdRemap> {
    let mapping: HashMap<String, String> =
        tasks.iter().map(|t| (t.id.clone(), store.generate_id())).collect();
    let mut remapped = Vec::with_capacity(tasks.len());
    for task in tasks.iter_mut() {
        if let Some(new_id) = mapping.get(&task.id) {
            remapped.push(IdRemap { from: task.id.clone(), to: new_id.clone() });
            task.id.clone_from(new_id);
        }
        for dep in &mut task.dependencies {
            if let Some(new_dep) = mapping.get(dep.as_str()) {
                dep.clone_from(new_dep);
            }
        }
    }
    remapped
}
