//! Task commands: `add`, `update`, `list`, `show`, `ready`, `start`,
//! `verify` and `request`.

use std::fmt::Write as _;

use crate::cli::{AddArgs, UpdateArgs};
use crate::error::Result;
use crate::lifecycle::{NewTask, TaskUpdate, VerifyOutcome};
use crate::model::{StatusCounts, Task, TaskStatus};
use crate::service::{TaskFilter, TaskService};

use super::truncate;

const NAME_WIDTH: usize = 40;

/// Execute `add`.
///
/// # Errors
///
/// Returns the store error if the task cannot be created.
pub fn add(service: &TaskService<'_>, args: &AddArgs) -> Result<()> {
    let task = service.create_task(NewTask {
        name: args.name.clone(),
        description: args.description.clone(),
        notes: args.notes.clone(),
        dependencies: args.dependencies.clone(),
        implementation_guide: args.guide.clone(),
        verification_criteria: args.criteria.clone(),
        agent: args.agent.clone(),
        ..NewTask::default()
    })?;
    println!("Created task {} ({})", task.id, task.name);
    Ok(())
}

/// Execute `update`.
///
/// # Errors
///
/// Returns the store error if the task cannot be edited.
pub fn update(service: &TaskService<'_>, args: &UpdateArgs) -> Result<()> {
    let dependencies = if args.no_deps {
        Some(Vec::new())
    } else if args.dependencies.is_empty() {
        None
    } else {
        Some(args.dependencies.clone())
    };
    let task = service.update_task(
        &args.id,
        TaskUpdate {
            name: args.name.clone(),
            description: args.description.clone(),
            notes: args.notes.clone(),
            dependencies,
            agent: args.agent.clone(),
            ..TaskUpdate::default()
        },
    )?;
    println!("Updated task {}", task.id);
    Ok(())
}

/// Execute `list`.
///
/// # Errors
///
/// Returns the store error if the collection cannot be read.
pub fn list(service: &TaskService<'_>, status: Option<TaskStatus>, query: Option<&str>) -> Result<()> {
    let filter = TaskFilter { status, query: query.map(str::to_string) };
    let tasks = service.list_tasks(&filter)?;
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    print!("{}", render_table(&tasks));
    println!("\n{}", render_counts(&StatusCounts::of(&tasks)));
    Ok(())
}

/// Execute `show`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id.
pub fn show(service: &TaskService<'_>, id: &str) -> Result<()> {
    let task = service.get_task(id)?;
    print!("{}", render_task(&task));
    Ok(())
}

/// Execute `ready`.
///
/// # Errors
///
/// Returns the store error if the collection cannot be read.
pub fn ready(service: &TaskService<'_>) -> Result<()> {
    let tasks = service.ready_tasks()?;
    if tasks.is_empty() {
        println!("No tasks are ready to start.");
    } else {
        print!("{}", render_table(&tasks));
    }
    Ok(())
}

/// Execute `start`.
///
/// # Errors
///
/// Returns `Blocked` if dependencies are incomplete, or another store error.
pub fn start(service: &TaskService<'_>, id: &str) -> Result<()> {
    let outcome = service.start_execution(id)?;
    println!("{}", outcome.message());
    Ok(())
}

/// Execute `verify`.
///
/// A score below the threshold is reported, not treated as an error.
///
/// # Errors
///
/// Returns the store error if verification is rejected.
pub fn verify(service: &TaskService<'_>, id: &str, score: u8, summary: &str) -> Result<()> {
    match service.verify_and_maybe_complete(id, summary, score, None)? {
        VerifyOutcome::Completed(task) => {
            println!("Task {} is COMPLETED (score {score}).", task.id);
        }
        VerifyOutcome::NeedsWork { task, score, threshold, .. } => {
            println!(
                "Task {} scored {score}, below the threshold of {threshold}; it stays {}.",
                task.id, task.status
            );
            println!("Address the gaps and verify again.");
        }
    }
    Ok(())
}

/// Execute `request`: print the initial request, or replace it.
///
/// # Errors
///
/// Returns the store error if the collection cannot be read or written.
pub fn request(service: &TaskService<'_>, text: Option<&str>) -> Result<()> {
    if let Some(text) = text {
        service.set_initial_request(text)?;
        println!("Initial request updated.");
        return Ok(());
    }
    let current = service.get_initial_request()?;
    if current.is_empty() {
        println!("No initial request recorded.");
    } else {
        println!("{current}");
    }
    Ok(())
}

fn render_table(tasks: &[Task]) -> String {
    let rows: Vec<(&str, &str, String, String)> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.status.as_str(), truncate(&t.name, NAME_WIDTH), t.dependencies.join(",")))
        .collect();

    let id_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(2).max(2);
    let status_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(6).max(6);
    let name_width = rows.iter().map(|r| r.2.chars().count()).max().unwrap_or(4).max(4);

    let mut out = String::new();
    let _ = writeln!(out, "{:<id_width$}  {:<status_width$}  {:<name_width$}  DEPENDS ON", "ID", "STATUS", "NAME");
    let _ = writeln!(out, "{:-<id_width$}  {:-<status_width$}  {:-<name_width$}  ----------", "", "", "");
    for (id, status, name, deps) in &rows {
        let deps = if deps.is_empty() { "-" } else { deps.as_str() };
        let _ = writeln!(out, "{id:<id_width$}  {status:<status_width$}  {name:<name_width$}  {deps}");
    }
    out
}

fn render_counts(counts: &StatusCounts) -> String {
    format!(
        "{} task(s): {} pending, {} in progress, {} completed.",
        counts.total, counts.pending, counts.in_progress, counts.completed
    )
}

fn render_task(task: &Task) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Task: {}", task.id);
    let _ = writeln!(out, "Name: {}", task.name);
    let _ = writeln!(out, "Status: {}", task.status);
    let _ = writeln!(out, "Created: {}", task.created_at.to_rfc3339());
    let _ = writeln!(out, "Updated: {}", task.updated_at.to_rfc3339());
    if let Some(done) = task.completed_at {
        let _ = writeln!(out, "Completed: {}", done.to_rfc3339());
    }
    if !task.dependencies.is_empty() {
        let _ = writeln!(out, "Dependencies: {}", task.dependencies.join(", "));
    }
    if let Some(agent) = &task.agent {
        let _ = writeln!(out, "Agent: {agent}");
    }
    let _ = writeln!(out, "\nDescription:\n  {}", task.description);
    if let Some(notes) = &task.notes {
        let _ = writeln!(out, "\nNotes:\n  {notes}");
    }
    if let Some(guide) = &task.implementation_guide {
        let _ = writeln!(out, "\nImplementation guide:\n  {guide}");
    }
    if let Some(criteria) = &task.verification_criteria {
        let _ = writeln!(out, "\nVerification criteria:\n  {criteria}");
    }
    if !task.related_files.is_empty() {
        let _ = writeln!(out, "\nRelated files:");
        for file in &task.related_files {
            let _ = writeln!(out, "  - {} [{:?}] {}", file.path, file.file_type, file.description);
        }
    }
    if let Some(summary) = &task.summary {
        let _ = writeln!(out, "\nSummary:\n  {summary}");
    }
    if let Some(details) = &task.completion_details {
        let _ = writeln!(out, "\nVerification score: {}", details.verification_score);
        let sections = [
            ("Key accomplishments", &details.key_accomplishments),
            ("Implementation details", &details.implementation_details),
            ("Technical challenges", &details.technical_challenges),
        ];
        for (title, items) in sections {
            let _ = writeln!(out, "{title}:");
            for item in items {
                let _ = writeln!(out, "  - {item}");
            }
        }
    }
    out
}
