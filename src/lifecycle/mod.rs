//! Task state machine: creation, edits, start and verification.
//!
//! ```text
//! PENDING ──start──▶ IN_PROGRESS ──verify(score ≥ threshold)──▶ COMPLETED
//! ```
//!
//! There is no way back from `IN_PROGRESS` or `COMPLETED` through these
//! operations. Starting a task that already left `PENDING` is a reported
//! no-op, not an error.

pub mod summary;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph;
use crate::model::{
    dedup_ids, CompletionDetails, CompletionFields, HistoryOperation, RelatedFile, Task,
    TaskCollection, TaskStatus,
};
use crate::store::TaskStore;

/// Input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Short title; required.
    pub name: String,
    /// What needs to be done; required.
    pub description: String,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Ids of prerequisite tasks.
    pub dependencies: Vec<String>,
    /// Files involved.
    pub related_files: Vec<RelatedFile>,
    /// How to approach the work.
    pub implementation_guide: Option<String>,
    /// How the work will be judged.
    pub verification_criteria: Option<String>,
    /// Assigned agent.
    pub agent: Option<String>,
}

/// Fields to change on an existing task. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New title.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New notes.
    pub notes: Option<String>,
    /// Replacement dependency list.
    pub dependencies: Option<Vec<String>>,
    /// Replacement related files.
    pub related_files: Option<Vec<RelatedFile>>,
    /// New implementation guide.
    pub implementation_guide: Option<String>,
    /// New verification criteria.
    pub verification_criteria: Option<String>,
    /// New agent.
    pub agent: Option<String>,
}

impl TaskUpdate {
    fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_some()),
            ("description", self.description.is_some()),
            ("notes", self.notes.is_some()),
            ("dependencies", self.dependencies.is_some()),
            ("relatedFiles", self.related_files.is_some()),
            ("implementationGuide", self.implementation_guide.is_some()),
            ("verificationCriteria", self.verification_criteria.is_some()),
            ("agent", self.agent.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Result of asking a task to start.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// The task moved to `IN_PROGRESS`.
    Started(Task),
    /// The task was already running; nothing changed.
    AlreadyInProgress(Task),
    /// The task was already finished; nothing changed.
    AlreadyCompleted(Task),
}

impl StartOutcome {
    /// The task as it stands after the call.
    #[must_use]
    pub fn task(&self) -> &Task {
        match self {
            Self::Started(t) | Self::AlreadyInProgress(t) | Self::AlreadyCompleted(t) => t,
        }
    }

    /// `true` if the call changed the task's status.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    /// One-line description for the caller.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Started(t) => format!("Task {} is now IN_PROGRESS", t.id),
            Self::AlreadyInProgress(t) => format!("Task {} is already IN_PROGRESS; nothing to do", t.id),
            Self::AlreadyCompleted(t) => format!("Task {} is already COMPLETED; nothing to do", t.id),
        }
    }
}

/// Result of submitting a task for verification.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// The score met the threshold and the task is `COMPLETED`.
    Completed(Task),
    /// The score fell short; the task is unchanged.
    NeedsWork {
        /// The unchanged task.
        task: Task,
        /// Score that was submitted.
        score: u8,
        /// Threshold the score had to meet.
        threshold: u8,
        /// The submitted summary, returned as feedback.
        feedback: String,
    },
}

impl VerifyOutcome {
    /// The task as it stands after the call.
    #[must_use]
    pub fn task(&self) -> &Task {
        match self {
            Self::Completed(t) | Self::NeedsWork { task: t, .. } => t,
        }
    }
}

/// Creates a new `PENDING` task.
///
/// # Errors
///
/// Returns `InvalidInput` if the name or description is blank, or
/// `Persistence` if the store cannot be updated.
pub fn create_task(store: &TaskStore<'_>, new: NewTask) -> Result<Task> {
    let name = required(&new.name, "name")?;
    let description = required(&new.description, "description")?;
    let id = store.generate_id();
    let now = store.now();

    let task = store.mutate(|collection| {
        if collection.contains(&id) {
            return Err(Error::InvalidState(format!("generated id {id} is already in use")));
        }
        let mut task = Task::new(&id, &name, &description, now);
        task.notes = new.notes;
        task.dependencies = dedup_ids(new.dependencies);
        task.related_files = new.related_files;
        task.implementation_guide = new.implementation_guide;
        task.verification_criteria = new.verification_criteria;
        task.agent = new.agent;
        warn_unknown_dependencies(collection, &task);
        collection.tasks.push(task.clone());
        Ok(task)
    })?;

    info!(task_id = %task.id, name = %task.name, "task created");
    store.record(HistoryOperation::Created, &task, "");
    Ok(task)
}

/// Edits a task that has not been completed.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id, `InvalidState` for a completed
/// task, `InvalidInput` for a blank name/description or a self-dependency,
/// or `Persistence` on storage failure.
pub fn update_task(store: &TaskStore<'_>, id: &str, update: TaskUpdate) -> Result<Task> {
    let changed = update.changed_fields();
    if changed.is_empty() {
        return Err(Error::InvalidInput("no fields to update".to_string()));
    }
    let name = update.name.as_deref().map(|n| required(n, "name")).transpose()?;
    let description =
        update.description.as_deref().map(|d| required(d, "description")).transpose()?;
    if update.dependencies.as_ref().is_some_and(|deps| deps.iter().any(|d| d == id)) {
        return Err(Error::InvalidInput(format!("task {id} cannot depend on itself")));
    }
    let now = store.now();

    let task = store.mutate(|collection| {
        let task = collection.get_mut(id).ok_or_else(|| Error::task_not_found(id))?;
        if task.status == TaskStatus::Completed {
            return Err(Error::InvalidState(format!("task {id} is COMPLETED and cannot be edited")));
        }
        if let Some(name) = name {
            task.name = name;
        }
        if let Some(description) = description {
            task.description = description;
        }
        if let Some(notes) = update.notes {
            task.notes = Some(notes);
        }
        if let Some(deps) = update.dependencies {
            task.dependencies = dedup_ids(deps);
        }
        if let Some(files) = update.related_files {
            task.related_files = files;
        }
        if let Some(guide) = update.implementation_guide {
            task.implementation_guide = Some(guide);
        }
        if let Some(criteria) = update.verification_criteria {
            task.verification_criteria = Some(criteria);
        }
        if let Some(agent) = update.agent {
            task.agent = Some(agent);
        }
        task.updated_at = now;
        let task = task.clone();
        warn_unknown_dependencies(collection, &task);
        Ok(task)
    })?;

    info!(task_id = %task.id, fields = ?changed, "task updated");
    store.record(HistoryOperation::Updated, &task, format!("changed: {}", changed.join(", ")));
    Ok(task)
}

/// Moves a `PENDING` task to `IN_PROGRESS` if its dependencies are done.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id, `Blocked` if a dependency is not
/// `COMPLETED`, or `Persistence` on storage failure.
pub fn start_execution(store: &TaskStore<'_>, id: &str) -> Result<StartOutcome> {
    let now = store.now();
    let outcome = store.mutate(|collection| {
        let check = graph::check_dependencies(collection, id)?;
        let task = collection.get_mut(id).ok_or_else(|| Error::task_not_found(id))?;
        match task.status {
            TaskStatus::InProgress => return Ok(StartOutcome::AlreadyInProgress(task.clone())),
            TaskStatus::Completed => return Ok(StartOutcome::AlreadyCompleted(task.clone())),
            TaskStatus::Pending => {}
        }
        if !check.can_execute {
            return Err(Error::Blocked { task_id: id.to_string(), blocked_by: check.blocked_by });
        }
        task.status = TaskStatus::InProgress;
        task.updated_at = now;
        Ok(StartOutcome::Started(task.clone()))
    })?;

    if let StartOutcome::Started(task) = &outcome {
        info!(task_id = %task.id, "task started");
        store.record(HistoryOperation::Started, task, "");
    }
    Ok(outcome)
}

/// Submits an `IN_PROGRESS` task for verification.
///
/// A score at or above `config.completion_threshold` completes the task
/// and fills in its completion details; a lower score changes nothing and
/// hands the summary back as feedback.
///
/// # Errors
///
/// Returns `InvalidInput` for a score above 100 or a summary shorter than
/// `config.min_summary_len`, `NotFound` for an unknown id, `InvalidState`
/// unless the task is `IN_PROGRESS`, or `Persistence` on storage failure.
pub fn verify_task(
    store: &TaskStore<'_>,
    config: &Config,
    id: &str,
    summary: &str,
    score: u8,
    fields: Option<CompletionFields>,
) -> Result<VerifyOutcome> {
    if score > 100 {
        return Err(Error::InvalidInput(format!("score must be within 0..=100, got {score}")));
    }
    let summary = summary.trim();
    let length = summary.chars().count();
    if length < config.min_summary_len {
        return Err(Error::InvalidInput(format!(
            "summary must be at least {} characters, got {length}",
            config.min_summary_len
        )));
    }
    let threshold = config.completion_threshold;
    let now = store.now();

    let outcome = store.mutate(|collection| {
        let task = collection.get_mut(id).ok_or_else(|| Error::task_not_found(id))?;
        if task.status != TaskStatus::InProgress {
            return Err(Error::InvalidState(format!(
                "task {id} is {}; only IN_PROGRESS tasks can be verified",
                task.status
            )));
        }
        if score < threshold {
            return Ok(VerifyOutcome::NeedsWork {
                task: task.clone(),
                score,
                threshold,
                feedback: summary.to_string(),
            });
        }
        let details = completion_details(summary, score, fields.unwrap_or_default(), now);
        task.status = TaskStatus::Completed;
        task.completed_at = Some(details.completed_at);
        task.summary = Some(summary.to_string());
        task.completion_details = Some(details);
        task.updated_at = now;
        Ok(VerifyOutcome::Completed(task.clone()))
    })?;

    match &outcome {
        VerifyOutcome::Completed(task) => {
            info!(task_id = %task.id, score, "task completed");
            store.record(HistoryOperation::Completed, task, format!("verification score {score}"));
        }
        VerifyOutcome::NeedsWork { task, .. } => {
            info!(task_id = %task.id, score, threshold, "verification below threshold");
        }
    }
    Ok(outcome)
}

/// Builds completion details from caller fields, filling gaps from the
/// summary text. List fields are never empty.
#[must_use]
pub fn completion_details(
    summary: &str,
    score: u8,
    fields: CompletionFields,
    now: DateTime<Utc>,
) -> CompletionDetails {
    let parsed = summary::parse_summary(summary);
    CompletionDetails {
        key_accomplishments: supplied_or(fields.key_accomplishments, parsed.key_accomplishments),
        implementation_details: supplied_or(
            fields.implementation_details,
            parsed.implementation_details,
        ),
        technical_challenges: supplied_or(fields.technical_challenges, parsed.technical_challenges),
        verification_score: score,
        completed_at: fields.completed_at.unwrap_or(now),
        extra: fields.extra,
    }
}

fn supplied_or(supplied: Option<Vec<String>>, derived: Vec<String>) -> Vec<String> {
    match supplied {
        Some(items) if items.iter().any(|i| !i.trim().is_empty()) => {
            items.into_iter().filter(|i| !i.trim().is_empty()).collect()
        }
        _ => derived,
    }
}

fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn warn_unknown_dependencies(collection: &TaskCollection, task: &Task) {
    for dep in task.dependencies.iter().filter(|d| !collection.contains(d)) {
        warn!(task_id = %task.id, dependency = %dep, "dependency does not resolve to a live task");
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::context::ServiceContext;
    use crate::model::HistoryOperation;
    use crate::store::HistoryQuery;

    const GOOD_SUMMARY: &str = "Implemented the login form with validation and tests.";

    fn new_task(name: &str, deps: &[&str]) -> NewTask {
        NewTask {
            name: name.to_string(),
            description: format!("{name} description"),
            dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
            ..NewTask::default()
        }
    }

    #[test]
    fn create_assigns_id_and_dedups_dependencies() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let a = create_task(&store, new_task("a", &[])).unwrap();
        let b = create_task(&store, new_task("b", &[&a.id, &a.id])).unwrap();

        assert_eq!(a.id, "task-0001");
        assert_eq!(a.status, TaskStatus::Pending);
        assert_eq!(b.dependencies, vec![a.id.clone()]);
        assert_eq!(store.load().unwrap().tasks.len(), 2);
    }

    #[test]
    fn create_rejects_blank_name() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let err = create_task(&store, new_task("  ", &[])).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn example_scenario_pending_to_completed() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let config = Config::default();
        let t1 = create_task(&store, new_task("T1", &[])).unwrap();

        let started = start_execution(&store, &t1.id).unwrap();
        assert_eq!(started.task().status, TaskStatus::InProgress);

        let outcome = verify_task(&store, &config, &t1.id, GOOD_SUMMARY, 85, None).unwrap();
        let VerifyOutcome::Completed(done) = outcome else { panic!("expected completion") };
        assert_eq!(done.status, TaskStatus::Completed);
        let details = done.completion_details.unwrap();
        assert_eq!(details.verification_score, 85);
        assert_eq!(done.summary.as_deref(), Some(GOOD_SUMMARY));
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn start_is_idempotent_without_extra_history() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let t = create_task(&store, new_task("t", &[])).unwrap();

        assert!(start_execution(&store, &t.id).unwrap().changed());
        let second = start_execution(&store, &t.id).unwrap();
        let third = start_execution(&store, &t.id).unwrap();
        assert!(matches!(second, StartOutcome::AlreadyInProgress(_)));
        assert!(matches!(third, StartOutcome::AlreadyInProgress(_)));

        let started = HistoryQuery {
            operation: Some(HistoryOperation::Started),
            ..HistoryQuery::default()
        };
        assert_eq!(store.read_history(&started, 100).unwrap().len(), 1);
    }

    #[test]
    fn start_blocked_names_dependencies() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let a = create_task(&store, new_task("a", &[])).unwrap();
        let b = create_task(&store, new_task("b", &[&a.id])).unwrap();

        let err = start_execution(&store, &b.id).unwrap_err();
        assert_eq!(err, Error::Blocked { task_id: b.id.clone(), blocked_by: vec![a.id.clone()] });
        assert_eq!(store.load().unwrap().get(&b.id).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn completed_task_start_is_noop() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let t = create_task(&store, new_task("t", &[])).unwrap();
        start_execution(&store, &t.id).unwrap();
        verify_task(&store, &Config::default(), &t.id, GOOD_SUMMARY, 100, None).unwrap();

        let outcome = start_execution(&store, &t.id).unwrap();
        assert!(matches!(outcome, StartOutcome::AlreadyCompleted(_)));
        assert!(outcome.message().contains("already COMPLETED"));
    }

    #[test]
    fn completion_gate_at_threshold() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let config = Config::default();

        for score in [0_u8, 50, 79, 80, 81, 100] {
            let t = create_task(&store, new_task("t", &[])).unwrap();
            start_execution(&store, &t.id).unwrap();
            let outcome = verify_task(&store, &config, &t.id, GOOD_SUMMARY, score, None).unwrap();
            let stored = store.load().unwrap().get(&t.id).cloned().unwrap();
            if score >= 80 {
                assert!(matches!(outcome, VerifyOutcome::Completed(_)), "score {score}");
                assert_eq!(stored.status, TaskStatus::Completed);
            } else {
                assert!(matches!(outcome, VerifyOutcome::NeedsWork { .. }), "score {score}");
                assert_eq!(stored.status, TaskStatus::InProgress);
                assert_eq!(stored.summary, None);
            }
        }
    }

    #[test]
    fn verify_validates_input_and_state() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let config = Config::default();
        let t = create_task(&store, new_task("t", &[])).unwrap();

        let short = verify_task(&store, &config, &t.id, "done", 90, None).unwrap_err();
        assert!(matches!(short, Error::InvalidInput(_)));
        let range = verify_task(&store, &config, &t.id, GOOD_SUMMARY, 101, None).unwrap_err();
        assert!(matches!(range, Error::InvalidInput(_)));
        let pending = verify_task(&store, &config, &t.id, GOOD_SUMMARY, 90, None).unwrap_err();
        assert!(matches!(pending, Error::InvalidState(_)));
        let missing = verify_task(&store, &config, "nope", GOOD_SUMMARY, 90, None).unwrap_err();
        assert!(matches!(missing, Error::NotFound { .. }));
    }

    #[test]
    fn supplied_fields_win_and_gaps_are_derived() {
        let now = Utc::now();
        let fields = CompletionFields {
            key_accomplishments: Some(vec!["Shipped login".to_string()]),
            implementation_details: Some(vec![]),
            extra: Some(serde_json::json!({"reviewer": "ci"})),
            ..CompletionFields::default()
        };
        let summary = "Done.\nChallenges:\n- flaky browser tests\n";

        let details = completion_details(summary, 92, fields, now);
        assert_eq!(details.key_accomplishments, vec!["Shipped login"]);
        assert_eq!(details.implementation_details, vec![summary::DEFAULT_IMPLEMENTATION]);
        assert_eq!(details.technical_challenges, vec!["flaky browser tests"]);
        assert_eq!(details.verification_score, 92);
        assert_eq!(details.completed_at, now);
        assert_eq!(details.extra, Some(serde_json::json!({"reviewer": "ci"})));
    }

    #[test]
    fn update_edits_fields_and_guards_state() {
        let ctx = ServiceContext::in_memory();
        let store = TaskStore::new(&ctx, Path::new("/store"));
        let t = create_task(&store, new_task("t", &[])).unwrap();

        let updated = update_task(
            &store,
            &t.id,
            TaskUpdate { name: Some("renamed".to_string()), ..TaskUpdate::default() },
        )
        .unwrap();
        assert_eq!(updated.name, "renamed");

        let self_dep = TaskUpdate { dependencies: Some(vec![t.id.clone()]), ..TaskUpdate::default() };
        assert!(matches!(update_task(&store, &t.id, self_dep), Err(Error::InvalidInput(_))));
        assert!(matches!(
            update_task(&store, &t.id, TaskUpdate::default()),
            Err(Error::InvalidInput(_))
        ));

        start_execution(&store, &t.id).unwrap();
        verify_task(&store, &Config::default(), &t.id, GOOD_SUMMARY, 80, None).unwrap();
        let late = TaskUpdate { notes: Some("too late".to_string()), ..TaskUpdate::default() };
        assert!(matches!(update_task(&store, &t.id, late), Err(Error::InvalidState(_))));
    }
}
