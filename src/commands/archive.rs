//! `taskledger archive` commands.

use crate::archive::{RestoreOptions, RestoreReport};
use crate::error::Result;
use crate::model::ArchiveMeta;
use crate::service::TaskService;

/// Execute `archive create`.
///
/// # Errors
///
/// Returns the store error if the snapshot cannot be written.
pub fn create(service: &TaskService<'_>, description: &str) -> Result<()> {
    let meta = service.create_archive(description)?;
    println!("Created archive {} with {} task(s).", meta.id, meta.stats.total);
    Ok(())
}

/// Execute `archive list`.
///
/// # Errors
///
/// Returns the store error if archives cannot be listed.
pub fn list(service: &TaskService<'_>, filter: Option<&str>) -> Result<()> {
    let listing = service.list_archives(filter)?;
    if listing.archives.is_empty() {
        println!("No archives found.");
        return Ok(());
    }
    for line in render_archives(&listing.archives) {
        println!("{line}");
    }
    if listing.filtered == listing.total {
        println!("\n{} archive(s).", listing.total);
    } else {
        println!("\n{} of {} archive(s) match.", listing.filtered, listing.total);
    }
    Ok(())
}

/// Execute `archive restore`.
///
/// # Errors
///
/// Returns `ConflictRequiresConfirmation` if the archive has critical
/// issues and `force` is off, or another store error.
pub fn restore(
    service: &TaskService<'_>,
    id: &str,
    replace: bool,
    remap_ids: bool,
    force: bool,
) -> Result<()> {
    let options = RestoreOptions { merge: !replace, preserve_ids: !remap_ids, force };
    let report = service.restore_from_archive(id, options)?;
    for line in render_report(&report) {
        println!("{line}");
    }
    Ok(())
}

fn render_archives(archives: &[ArchiveMeta]) -> Vec<String> {
    let id_width = archives.iter().map(|a| a.id.len()).max().unwrap_or(2).max(2);
    archives
        .iter()
        .map(|a| {
            let description = if a.description.is_empty() { "(no description)" } else { a.description.as_str() };
            format!(
                "{:<id_width$}  {}  {:>3} task(s)  {description}",
                a.id,
                a.created_at.format("%Y-%m-%d %H:%M"),
                a.stats.total,
            )
        })
        .collect()
}

fn render_report(report: &RestoreReport) -> Vec<String> {
    let mode = if report.merged { "merged" } else { "replaced" };
    let mut lines = vec![format!(
        "Restored {} task(s) from archive {} ({mode}).",
        report.restored_count, report.archive_id
    )];
    if !report.skipped_ids.is_empty() {
        lines.push(format!("Skipped (already live): {}", report.skipped_ids.join(", ")));
    }
    if !report.conflicts.is_empty() {
        lines.push(format!("Conflicts: {}", report.conflicts.join(", ")));
    }
    for remap in &report.remapped {
        lines.push(format!("  {} -> {}", remap.from, remap.to));
    }
    lines
}
