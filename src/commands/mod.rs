//! Command dispatch and handlers.

pub mod archive;
pub mod audit;
pub mod history;
pub mod recovery;
pub mod tasks;

use tracing::debug;

use crate::cli::{ArchiveCommand, Command};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::service::TaskService;

/// Dispatch a parsed command to its handler.
///
/// The store directory comes from `TASKLEDGER_STORE` (default `.taskledger`).
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the handler fails.
pub fn dispatch(command: &Command) -> std::result::Result<(), String> {
    let ctx = ServiceContext::live();
    let config = Config::load(ctx.fs.as_ref()).map_err(|e| e.to_string())?;
    debug!(store = %config.store_dir.display(), "dispatching command");
    let service = TaskService::new(&ctx, config);
    dispatch_with_service(command, &service).map_err(|e| e.to_string())
}

/// Dispatch a command against an existing service.
///
/// # Errors
///
/// Returns the handler's error.
pub fn dispatch_with_service(command: &Command, service: &TaskService<'_>) -> Result<()> {
    match command {
        Command::Add(args) => tasks::add(service, args),
        Command::Update(args) => tasks::update(service, args),
        Command::List { status, query } => tasks::list(service, *status, query.as_deref()),
        Command::Show { id } => tasks::show(service, id),
        Command::Ready => tasks::ready(service),
        Command::Start { id } => tasks::start(service, id),
        Command::Verify { id, score, summary } => tasks::verify(service, id, *score, summary),
        Command::Request { text } => tasks::request(service, text.as_deref()),
        Command::Delete { id } => recovery::delete(service, id),
        Command::Deleted { limit } => recovery::list(service, *limit),
        Command::Recover { id, new_id } => recovery::recover(service, id, *new_id),
        Command::Purge { id } => recovery::purge(service, id),
        Command::Archive { action } => match action {
            ArchiveCommand::Create { description } => archive::create(service, description),
            ArchiveCommand::List { filter } => archive::list(service, filter.as_deref()),
            ArchiveCommand::Restore { id, replace, remap_ids, force } => {
                archive::restore(service, id, *replace, *remap_ids, *force)
            }
        },
        Command::Audit { check, force } => audit::run(service, *check, *force),
        Command::History { task, operation, limit } => {
            history::run(service, task.as_deref(), *operation, *limit)
        }
    }
}

/// Shortens `text` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
