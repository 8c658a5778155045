//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use crate::model::{HistoryOperation, TaskStatus};

/// Top-level CLI parser for `taskledger`.
#[derive(Debug, Parser)]
#[command(name = "taskledger", version, about = "Track agent tasks, dependencies and verification")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a pending task.
    Add(AddArgs),
    /// Edit a task that is not yet completed.
    Update(UpdateArgs),
    /// List live tasks.
    List {
        /// Only show tasks with this status (pending, in_progress, completed).
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Case-insensitive text to match in the name or description.
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Show one task in full.
    Show {
        /// Task id.
        id: String,
    },
    /// List pending tasks whose dependencies are all completed.
    Ready,
    /// Mark a task as in progress.
    Start {
        /// Task id.
        id: String,
    },
    /// Submit a task for verification; completes it if the score passes.
    Verify {
        /// Task id.
        id: String,
        /// Verification score, 0 to 100.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        score: u8,
        /// Summary of the work done.
        #[arg(long)]
        summary: String,
    },
    /// Soft-delete a task, keeping a recoverable backup.
    Delete {
        /// Task id.
        id: String,
    },
    /// List soft-deleted tasks, newest first.
    Deleted {
        /// Maximum number of records to show.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Bring a soft-deleted task back.
    Recover {
        /// Task id.
        id: String,
        /// Give the recovered task a fresh id.
        #[arg(long)]
        new_id: bool,
    },
    /// Permanently remove a soft-deleted task's backup.
    Purge {
        /// Task id.
        id: String,
    },
    /// Create, list and restore archive snapshots.
    Archive {
        /// Archive action.
        #[command(subcommand)]
        action: ArchiveCommand,
    },
    /// Check the task collection for consistency issues.
    Audit {
        /// Report issues without repairing anything.
        #[arg(long)]
        check: bool,
        /// Apply repairs even when critical issues are present.
        #[arg(long)]
        force: bool,
    },
    /// Show the operation history, newest first.
    History {
        /// Only entries for this task.
        #[arg(long)]
        task: Option<String>,
        /// Only entries of this operation.
        #[arg(long)]
        operation: Option<HistoryOperation>,
        /// Maximum number of entries to show.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the initial planning request, or replace it when TEXT is given.
    Request {
        /// New request text.
        text: Option<String>,
    },
}

/// Arguments for `taskledger add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Short task title.
    pub name: String,
    /// What needs to be done.
    #[arg(long, short)]
    pub description: String,
    /// Id of a task that must complete first. Repeatable.
    #[arg(long = "dep")]
    pub dependencies: Vec<String>,
    /// Free-form notes.
    #[arg(long)]
    pub notes: Option<String>,
    /// How to approach the work.
    #[arg(long)]
    pub guide: Option<String>,
    /// How the work will be judged.
    #[arg(long)]
    pub criteria: Option<String>,
    /// Agent assigned to the task.
    #[arg(long)]
    pub agent: Option<String>,
}

/// Arguments for `taskledger update`.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Task id.
    pub id: String,
    /// New title.
    #[arg(long)]
    pub name: Option<String>,
    /// New description.
    #[arg(long, short)]
    pub description: Option<String>,
    /// Replacement dependency list. Repeatable.
    #[arg(long = "dep", conflicts_with = "no_deps")]
    pub dependencies: Vec<String>,
    /// Clear all dependencies.
    #[arg(long)]
    pub no_deps: bool,
    /// New notes.
    #[arg(long)]
    pub notes: Option<String>,
    /// New agent assignment.
    #[arg(long)]
    pub agent: Option<String>,
}

/// `taskledger archive` actions.
#[derive(Debug, Subcommand)]
pub enum ArchiveCommand {
    /// Snapshot the current task collection.
    Create {
        /// Description stored with the archive.
        #[arg(default_value = "")]
        description: String,
    },
    /// List archives, newest first.
    List {
        /// Case-insensitive text to match in the description.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Restore an archive into the live collection.
    Restore {
        /// Archive id.
        id: String,
        /// Replace the live collection instead of merging into it.
        #[arg(long)]
        replace: bool,
        /// Give restored tasks fresh ids.
        #[arg(long)]
        remap_ids: bool,
        /// Restore even when the archive has critical issues.
        #[arg(long)]
        force: bool,
    },
}
