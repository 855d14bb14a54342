//! Pure reconciliation planner.
//!
//! Conflicts are resolved last-writer-wins on a single timestamp comparison.
//! Equal timestamps produce no content action, which keeps a pass over
//! unchanged stores free of writes.
//!
//! An identity whose file could not be read is held for the pass, never
//! treated as missing.

use crate::model::note::{FileRecord, NoteId, NoteRecord, StoreSnapshot};
use crate::model::timestamp::StoreTime;
use crate::tree::TreeSnapshot;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::PathBuf;

/// One step against either store. Paths are relative to the export root.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    /// Note is trashed in the store; remove its file.
    DeleteFile { path: PathBuf },
    /// Note has no file yet; export the store body.
    CreateFile { path: PathBuf, content: String },
    /// File sits under a stale folder or name.
    RelocateFile { from: PathBuf, to: PathBuf },
    /// Store is newer; overwrite the file body.
    WriteStoreContentToFile { path: PathBuf, content: String },
    /// File is newer; overwrite the store body.
    WriteFileContentToStore { content: String },
    /// Push the file's mtime into the store. `recorded` is the store value
    /// seen at snapshot time.
    SyncRecordTimestamp { path: PathBuf, recorded: StoreTime },
}

impl SyncAction {
    /// Stable short name used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeleteFile { .. } => "delete_file",
            Self::CreateFile { .. } => "create_file",
            Self::RelocateFile { .. } => "relocate_file",
            Self::WriteStoreContentToFile { .. } => "write_store_content_to_file",
            Self::WriteFileContentToStore { .. } => "write_file_content_to_store",
            Self::SyncRecordTimestamp { .. } => "sync_record_timestamp",
        }
    }
}

/// Ordered actions for one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionGroup {
    pub note_id: NoteId,
    pub actions: Vec<SyncAction>,
}

/// Full output of one planning step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcilePlan {
    /// One group per identity that needs work, in ascending identity order.
    pub groups: Vec<ActionGroup>,
    /// Identities found only in the tree. Reported, never touched.
    pub untracked: Vec<NoteId>,
    /// Store identities left alone this pass because the tree view of them
    /// is unreliable.
    pub held: Vec<NoteId>,
}

impl ReconcilePlan {
    pub fn action_count(&self) -> usize {
        self.groups.iter().map(|group| group.actions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Matches both snapshots by identity and classifies each store note.
pub fn reconcile(store: &StoreSnapshot, tree: &TreeSnapshot) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    for note in store.values() {
        let file = tree.files.get(&note.note_id);
        if is_held(note, file, tree) {
            plan.held.push(note.note_id);
            continue;
        }
        let actions = classify(note, file);
        if !actions.is_empty() {
            plan.groups.push(ActionGroup {
                note_id: note.note_id,
                actions,
            });
        }
    }

    plan.untracked = tree
        .files
        .keys()
        .filter(|note_id| !store.contains_key(note_id))
        .copied()
        .collect();
    plan
}

fn is_held(note: &NoteRecord, file: Option<&FileRecord>, tree: &TreeSnapshot) -> bool {
    if tree.unreadable.contains(&note.note_id) {
        return true;
    }
    // With a directory unlisted, a live note missing from the snapshot may
    // still have a file on disk.
    file.is_none() && !note.trashed && tree.partial
}

fn classify(note: &NoteRecord, file: Option<&FileRecord>) -> Vec<SyncAction> {
    let target = note.relative_path();
    match (note.trashed, file) {
        (true, None) => Vec::new(),
        (true, Some(file)) => vec![SyncAction::DeleteFile {
            path: file.relative_path(),
        }],
        (false, None) => vec![
            SyncAction::CreateFile {
                path: target.clone(),
                content: note.content.clone(),
            },
            SyncAction::SyncRecordTimestamp {
                path: target,
                recorded: note.modified_at,
            },
        ],
        (false, Some(file)) => {
            let mut actions = Vec::new();
            let current = file.relative_path();
            if current != target {
                actions.push(SyncAction::RelocateFile {
                    from: current,
                    to: target.clone(),
                });
            }
            match note.modified_at.partial_cmp(&file.modified_at) {
                Some(Ordering::Greater) => actions.push(SyncAction::WriteStoreContentToFile {
                    path: target.clone(),
                    content: note.content.clone(),
                }),
                Some(Ordering::Less) => actions.push(SyncAction::WriteFileContentToStore {
                    content: file.content.clone(),
                }),
                Some(Ordering::Equal) | None => {}
            }
            actions.push(SyncAction::SyncRecordTimestamp {
                path: target,
                recorded: note.modified_at,
            });
            actions
        }
    }
}
