//! Action applier.
//!
//! # Invariants
//! - Groups run in plan order; actions within a group run in plan order.
//! - A filesystem failure skips the rest of its group only. The divergence
//!   persists, so the next pass retries it.
//! - A store failure stops the pass: later groups are not applied.
//! - `SyncRecordTimestamp` writes only when the file mtime differs from the
//!   value the store held at snapshot time.

use crate::model::note::NoteId;
use crate::reconcile::plan::{ActionGroup, ReconcilePlan, SyncAction};
use crate::store::{NoteStore, StoreError};
use crate::tree::{NoteTree, TreeError};
use log::{debug, error, warn};
use serde::Serialize;

/// Counters for one apply run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    pub files_created: usize,
    pub files_written: usize,
    pub files_removed: usize,
    pub files_relocated: usize,
    pub store_content_updates: usize,
    pub store_timestamp_updates: usize,
    /// Groups abandoned after a filesystem error.
    pub failed: Vec<GroupFailure>,
}

impl ApplyReport {
    /// Total mutations performed against either store.
    pub fn mutation_count(&self) -> usize {
        self.files_created
            + self.files_written
            + self.files_removed
            + self.files_relocated
            + self.store_content_updates
            + self.store_timestamp_updates
    }
}

/// One group abandoned mid-way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFailure {
    pub note_id: NoteId,
    /// Kind of the action that failed.
    pub action: &'static str,
    pub error: String,
}

enum ActionError {
    Tree(TreeError),
    Store(StoreError),
}

impl From<TreeError> for ActionError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<StoreError> for ActionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Applies `plan` against both stores.
///
/// # Errors
/// - Returns the first `StoreError`; groups after it are not applied.
pub fn apply_plan<S: NoteStore + ?Sized>(
    plan: &ReconcilePlan,
    store: &S,
    tree: &NoteTree,
) -> Result<ApplyReport, StoreError> {
    let mut report = ApplyReport::default();
    for group in &plan.groups {
        apply_group(group, store, tree, &mut report)?;
    }
    Ok(report)
}

fn apply_group<S: NoteStore + ?Sized>(
    group: &ActionGroup,
    store: &S,
    tree: &NoteTree,
    report: &mut ApplyReport,
) -> Result<(), StoreError> {
    for action in &group.actions {
        match apply_action(group.note_id, action, store, tree, report) {
            Ok(()) => {}
            Err(ActionError::Tree(err)) => {
                warn!(
                    "event=apply_group module=reconcile status=skip note_id={} action={} error={}",
                    group.note_id,
                    action.kind(),
                    err
                );
                report.failed.push(GroupFailure {
                    note_id: group.note_id,
                    action: action.kind(),
                    error: err.to_string(),
                });
                return Ok(());
            }
            Err(ActionError::Store(err)) => {
                error!(
                    "event=apply_group module=reconcile status=error note_id={} action={} error={}",
                    group.note_id,
                    action.kind(),
                    err
                );
                return Err(err);
            }
        }
    }
    debug!(
        "event=apply_group module=reconcile status=ok note_id={} actions={}",
        group.note_id,
        group.actions.len()
    );
    Ok(())
}

fn apply_action<S: NoteStore + ?Sized>(
    note_id: NoteId,
    action: &SyncAction,
    store: &S,
    tree: &NoteTree,
    report: &mut ApplyReport,
) -> Result<(), ActionError> {
    match action {
        SyncAction::DeleteFile { path } => {
            if tree.remove_note(path)? {
                report.files_removed += 1;
            }
        }
        SyncAction::CreateFile { path, content } => {
            tree.create_note(path, content)?;
            report.files_created += 1;
        }
        SyncAction::RelocateFile { from, to } => {
            tree.relocate_note(from, to)?;
            report.files_relocated += 1;
        }
        SyncAction::WriteStoreContentToFile { path, content } => {
            tree.write_note(path, content)?;
            report.files_written += 1;
        }
        SyncAction::WriteFileContentToStore { content } => {
            store.update_content(note_id, content)?;
            report.store_content_updates += 1;
        }
        SyncAction::SyncRecordTimestamp { path, recorded } => {
            let modified_at = tree.modified_at(path)?;
            if modified_at != *recorded {
                store.update_modified_at(note_id, modified_at)?;
                report.store_timestamp_updates += 1;
            }
        }
    }
    Ok(())
}
