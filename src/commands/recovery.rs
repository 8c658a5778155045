//! Soft-delete commands: `delete`, `deleted`, `recover` and `purge`.

use crate::error::Result;
use crate::model::DeletedTaskRecord;
use crate::recovery::RecoverOptions;
use crate::service::TaskService;

use super::truncate;

/// Execute `delete`.
///
/// # Errors
///
/// Returns the store error if the task cannot be deleted.
pub fn delete(service: &TaskService<'_>, id: &str) -> Result<()> {
    let record = service.delete_task(id)?;
    println!("Deleted task {} ({}). Recover it with `taskledger recover {}`.", id, record.task.name, id);
    Ok(())
}

/// Execute `deleted`.
///
/// # Errors
///
/// Returns the store error if backups cannot be read.
pub fn list(service: &TaskService<'_>, limit: Option<usize>) -> Result<()> {
    let records = service.list_deleted(None, limit)?;
    if records.is_empty() {
        println!("No deleted tasks.");
        return Ok(());
    }
    for line in render_records(&records) {
        println!("{line}");
    }
    Ok(())
}

/// Execute `recover`.
///
/// # Errors
///
/// Returns the store error if the task cannot be recovered.
pub fn recover(service: &TaskService<'_>, id: &str, new_id: bool) -> Result<()> {
    let task = service.recover_task(id, RecoverOptions { preserve_id: !new_id })?;
    if task.id == id {
        println!("Recovered task {id}.");
    } else {
        println!("Recovered task {id} as {}.", task.id);
    }
    Ok(())
}

/// Execute `purge`.
///
/// # Errors
///
/// Returns `NotFound` if there is no backup for `id`.
pub fn purge(service: &TaskService<'_>, id: &str) -> Result<()> {
    service.purge_deleted(id)?;
    println!("Purged deleted task {id}.");
    Ok(())
}

fn render_records(records: &[DeletedTaskRecord]) -> Vec<String> {
    let id_width = records.iter().map(|r| r.task.id.len()).max().unwrap_or(2).max(2);
    records
        .iter()
        .map(|r| {
            format!(
                "{:<id_width$}  {}  {:<11}  {}",
                r.task.id,
                r.deleted_at.format("%Y-%m-%d %H:%M"),
                r.task.status.as_str(),
                truncate(&r.task.name, 40),
            )
        })
        .collect()
}
